// Live chart instances keyed by container id
use crate::domain::chart::ChartSpec;
use crate::domain::theme::ResolvedTheme;
use crate::domain::view::{el, View};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// What happens to an existing chart when its container is rendered again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPolicy {
    /// Keep the instance and replace its options
    UpdateInPlace,
    /// Destroy the instance and create a new one
    Recreate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Created,
    Updated,
    Recreated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartHandle {
    pub container: String,
    pub instance: u64,
    /// Bumped on every option replacement of the same instance
    pub revision: u64,
    pub policy: RenderPolicy,
    pub spec: ChartSpec,
    /// Options baked with the theme active at the last (re)render
    pub options: Value,
}

#[cfg(test)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub live: usize,
    pub created: u64,
    pub destroyed: u64,
}

struct RegistryState {
    charts: BTreeMap<String, ChartHandle>,
    next_instance: u64,
    created: u64,
    destroyed: u64,
    theme: ResolvedTheme,
    animations: bool,
}

#[derive(Clone)]
pub struct ChartRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl ChartRegistry {
    pub fn new(theme: ResolvedTheme, animations: bool) -> Self {
        Self {
            state: Arc::new(RwLock::new(RegistryState {
                charts: BTreeMap::new(),
                next_instance: 1,
                created: 0,
                destroyed: 0,
                theme,
                animations,
            })),
        }
    }

    /// Creates the chart for `container` or applies `policy` to the existing one
    pub async fn render(&self, container: &str, spec: ChartSpec, policy: RenderPolicy) -> RenderOutcome {
        let mut state = self.state.write().await;
        let options = spec.to_options(state.theme, state.animations);

        if let Some(handle) = state.charts.get_mut(container) {
            if policy == RenderPolicy::UpdateInPlace {
                handle.revision += 1;
                handle.policy = policy;
                handle.spec = spec;
                handle.options = options;
                return RenderOutcome::Updated;
            }
        }

        let outcome = if state.charts.remove(container).is_some() {
            state.destroyed += 1;
            RenderOutcome::Recreated
        } else {
            RenderOutcome::Created
        };

        let instance = state.next_instance;
        state.next_instance += 1;
        state.created += 1;
        state.charts.insert(
            container.to_string(),
            ChartHandle {
                container: container.to_string(),
                instance,
                revision: 0,
                policy,
                spec,
                options,
            },
        );
        tracing::debug!(
            "{:?} chart {} as instance {} ({} created, {} destroyed)",
            outcome,
            container,
            instance,
            state.created,
            state.destroyed
        );
        outcome
    }

    /// Re-bakes every live chart's options for the new theme
    pub async fn refresh_all(&self, theme: ResolvedTheme) -> usize {
        let mut state = self.state.write().await;
        state.theme = theme;
        Self::rebake(&mut state)
    }

    pub async fn set_animations(&self, enabled: bool) -> usize {
        let mut state = self.state.write().await;
        state.animations = enabled;
        Self::rebake(&mut state)
    }

    fn rebake(state: &mut RegistryState) -> usize {
        let (theme, animations) = (state.theme, state.animations);
        for handle in state.charts.values_mut() {
            handle.options = handle.spec.to_options(theme, animations);
            handle.revision += 1;
        }
        tracing::debug!("Refreshed {} charts for {} theme", state.charts.len(), theme.mode());
        state.charts.len()
    }

    #[cfg(test)]
    pub async fn theme(&self) -> ResolvedTheme {
        self.state.read().await.theme
    }

    pub async fn get(&self, container: &str) -> Option<ChartHandle> {
        self.state.read().await.charts.get(container).cloned()
    }

    #[cfg(test)]
    pub async fn stats(&self) -> RegistryStats {
        let state = self.state.read().await;
        RegistryStats {
            live: state.charts.len(),
            created: state.created,
            destroyed: state.destroyed,
        }
    }

    /// View slot for `container`: the chart if one exists, a placeholder otherwise
    pub async fn slot(&self, container: &str) -> View {
        match self.get(container).await {
            Some(handle) => View::chart_slot(container, handle.spec.kind(), &handle.options),
            None => el("div")
                .id(container)
                .class("chart-container chart-loading")
                .into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chart::{BarChart, LineChart, Series};

    fn bar(values: Vec<f64>) -> ChartSpec {
        ChartSpec::Bar(BarChart {
            series: vec![Series::new("Ventas", values)],
            ..BarChart::default()
        })
    }

    #[tokio::test]
    async fn test_update_in_place_keeps_instance() {
        let registry = ChartRegistry::new(ResolvedTheme::Light, true);
        assert_eq!(
            registry.render("a", bar(vec![1.0]), RenderPolicy::UpdateInPlace).await,
            RenderOutcome::Created
        );
        let first = registry.get("a").await.unwrap();
        assert_eq!(
            registry.render("a", bar(vec![2.0]), RenderPolicy::UpdateInPlace).await,
            RenderOutcome::Updated
        );
        let second = registry.get("a").await.unwrap();
        assert_eq!(first.instance, second.instance);
        assert_eq!(second.revision, first.revision + 1);
        assert_eq!(second.options["series"][0]["data"][0], 2.0);
        assert_eq!(registry.stats().await.destroyed, 0);
    }

    #[tokio::test]
    async fn test_recreate_destroys_previous_instance() {
        let registry = ChartRegistry::new(ResolvedTheme::Light, true);
        registry.render("b", bar(vec![1.0]), RenderPolicy::Recreate).await;
        let first = registry.get("b").await.unwrap();
        assert_eq!(
            registry.render("b", bar(vec![1.0]), RenderPolicy::Recreate).await,
            RenderOutcome::Recreated
        );
        let second = registry.get("b").await.unwrap();
        assert_ne!(first.instance, second.instance);
        assert_eq!(
            registry.stats().await,
            RegistryStats {
                live: 1,
                created: 2,
                destroyed: 1
            }
        );
    }

    #[tokio::test]
    async fn test_refresh_all_rebakes_theme() {
        let registry = ChartRegistry::new(ResolvedTheme::Light, true);
        registry.render("a", bar(vec![]), RenderPolicy::UpdateInPlace).await;
        registry
            .render("b", ChartSpec::Line(LineChart::default()), RenderPolicy::Recreate)
            .await;

        assert_eq!(registry.refresh_all(ResolvedTheme::Dark).await, 2);
        for container in ["a", "b"] {
            let handle = registry.get(container).await.unwrap();
            assert_eq!(handle.options["theme"]["mode"], "dark");
            assert_eq!(handle.revision, 1);
        }
        assert_eq!(registry.stats().await.created, 2);
    }

    #[tokio::test]
    async fn test_slot_placeholder_until_rendered() {
        let registry = ChartRegistry::new(ResolvedTheme::Light, false);
        let html = registry.slot("trend").await.render();
        assert!(html.contains("chart-loading"));
        registry.render("trend", bar(vec![]), RenderPolicy::UpdateInPlace).await;
        let html = registry.slot("trend").await.render();
        assert!(html.contains("data-chart-options"));
    }
}
