// Settings section - theme buttons, chart preferences and report export
use crate::application::key_value_store::{KeyValueStore, KEY_DEFAULT_CHART_TYPE, KEY_ENABLE_ANIMATIONS, KEY_THEME};
use crate::application::section::{
    unsupported, FilterError, LoadContext, SectionController, SectionCore, SectionDeps, SectionFilter,
};
use crate::domain::analytics::InvalidOption;
use crate::domain::components::{card, col, row};
use crate::domain::date_range::DateRange;
use crate::domain::page::Page;
use crate::domain::theme::ThemePreference;
use crate::domain::view::{el, Element, View};
use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const REPORT_EXPORT_PATH: &str = "/api/reports/export";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChartType {
    #[default]
    Bar,
    Line,
    Pie,
}

impl ChartType {
    pub const ALL: [ChartType; 3] = [ChartType::Bar, ChartType::Line, ChartType::Pie];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Pie => "pie",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChartType::Bar => "Barras",
            ChartType::Line => "Líneas",
            ChartType::Pie => "Circular",
        }
    }
}

impl FromStr for ChartType {
    type Err = InvalidOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| InvalidOption {
                kind: "chart type",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartPreferences {
    pub default_chart_type: ChartType,
    pub enable_animations: bool,
}

impl Default for ChartPreferences {
    fn default() -> Self {
        Self {
            default_chart_type: ChartType::Bar,
            enable_animations: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Sales,
    Customers,
    Inventory,
    Reviews,
}

impl ReportKind {
    pub const ALL: [ReportKind; 4] = [
        ReportKind::Sales,
        ReportKind::Customers,
        ReportKind::Inventory,
        ReportKind::Reviews,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Sales => "sales",
            ReportKind::Customers => "customers",
            ReportKind::Inventory => "inventory",
            ReportKind::Reviews => "reviews",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportKind::Sales => "Ventas",
            ReportKind::Customers => "Clientes",
            ReportKind::Inventory => "Inventario",
            ReportKind::Reviews => "Reviews",
        }
    }
}

impl FromStr for ReportKind {
    type Err = InvalidOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| InvalidOption {
                kind: "report type",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Pdf,
    Excel,
    Csv,
}

impl ReportFormat {
    pub const ALL: [ReportFormat; 3] = [ReportFormat::Pdf, ReportFormat::Excel, ReportFormat::Csv];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "pdf",
            ReportFormat::Excel => "excel",
            ReportFormat::Csv => "csv",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "PDF",
            ReportFormat::Excel => "Excel",
            ReportFormat::Csv => "CSV",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = InvalidOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| InvalidOption {
                kind: "report format",
                value: s.to_string(),
            })
    }
}

/// Query of the backend report download over `range`
pub fn report_query(kind: ReportKind, format: ReportFormat, range: &DateRange) -> Vec<(String, String)> {
    let mut query = vec![
        ("type".to_string(), kind.as_str().to_string()),
        ("format".to_string(), format.as_str().to_string()),
    ];
    query.extend(range.query_pairs());
    query
}

fn labelled_select<T: Copy>(
    id: &str,
    name: &str,
    options: &[T],
    value: fn(&T) -> &'static str,
    label: fn(&T) -> &'static str,
    selected: Option<T>,
) -> Element
where
    T: PartialEq,
{
    el("select")
        .id(id)
        .attr("name", name)
        .class("form-select")
        .children(options.iter().map(|option| {
            el("option")
                .attr("value", value(option))
                .flag("selected", selected == Some(*option))
                .text(label(option))
        }))
}

pub struct SettingsSection {
    core: SectionCore,
    store: Arc<dyn KeyValueStore>,
    preferences: Mutex<ChartPreferences>,
}

impl SettingsSection {
    pub fn new(deps: SectionDeps, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            core: SectionCore::new(deps),
            store,
            preferences: Mutex::new(ChartPreferences::default()),
        }
    }

    /// Reads the persisted chart preferences; unreadable values fall back to
    /// the defaults. The animation flag is pushed into every chart.
    pub async fn load_preferences(&self) -> ChartPreferences {
        let default_chart_type = match self.store.get(KEY_DEFAULT_CHART_TYPE).await {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!("Ignoring persisted chart type: {}", e);
                ChartType::default()
            }),
            None => ChartType::default(),
        };
        let enable_animations = self.store.get(KEY_ENABLE_ANIMATIONS).await.as_deref() != Some("false");
        let preferences = ChartPreferences {
            default_chart_type,
            enable_animations,
        };

        *self.preferences.lock().await = preferences;
        self.core.deps.charts.set_animations(enable_animations).await;
        preferences
    }

    pub async fn save_preferences(&self, preferences: ChartPreferences) {
        *self.preferences.lock().await = preferences;
        let animations = if preferences.enable_animations { "true" } else { "false" };
        for (key, value) in [
            (KEY_DEFAULT_CHART_TYPE, preferences.default_chart_type.as_str()),
            (KEY_ENABLE_ANIMATIONS, animations),
        ] {
            if let Err(e) = self.store.set(key, value).await {
                tracing::error!("Failed to persist {}: {}", key, e);
            }
        }
        let refreshed = self.core.deps.charts.set_animations(preferences.enable_animations).await;
        tracing::info!(
            "Chart preferences saved ({}, animations {}), {} charts refreshed",
            preferences.default_chart_type.as_str(),
            animations,
            refreshed
        );
    }

    pub async fn preferences(&self) -> ChartPreferences {
        *self.preferences.lock().await
    }
}

#[async_trait]
impl SectionController for SettingsSection {
    fn page(&self) -> Page {
        Page::Settings
    }

    fn core(&self) -> &SectionCore {
        &self.core
    }

    async fn build(&self) {
        self.load_preferences().await;
    }

    /// Nothing to fetch
    async fn load_data(&self, _ctx: &LoadContext) {}

    async fn apply_filter(&self, filter: SectionFilter, _ctx: &LoadContext) -> Result<(), FilterError> {
        Err(unsupported(self.page(), &filter))
    }

    async fn render(&self) -> View {
        let preferences = self.preferences().await;
        let theme = self
            .store
            .get(KEY_THEME)
            .await
            .and_then(|raw| raw.parse::<ThemePreference>().ok())
            .unwrap_or_default();

        let theme_buttons = el("div").class("d-flex gap-2").children(
            [
                (ThemePreference::Light, "sun", "Claro"),
                (ThemePreference::Dark, "moon", "Oscuro"),
                (ThemePreference::Auto, "magic", "Auto"),
            ]
            .into_iter()
            .map(|(option, icon, label)| {
                let class = if option == theme {
                    "btn btn-outline-primary theme-button active"
                } else {
                    "btn btn-outline-primary theme-button"
                };
                el("form")
                    .attr("method", "post")
                    .attr("action", format!("/theme/{}", option.as_str()))
                    .class("d-inline")
                    .child(
                        el("button")
                            .attr("type", "submit")
                            .class(class)
                            .attr("data-theme", option.as_str())
                            .child(el("i").class(format!("fas fa-{}", icon)))
                            .text(format!(" {}", label)),
                    )
            }),
        );

        let display = el("form")
            .attr("method", "post")
            .attr("action", "/settings/charts")
            .child(
                el("div")
                    .class("mb-3")
                    .child(el("label").class("form-label").text("Gráficos predeterminados"))
                    .child(labelled_select(
                        "default-chart-type",
                        "default_chart_type",
                        &ChartType::ALL,
                        ChartType::as_str,
                        ChartType::label,
                        Some(preferences.default_chart_type),
                    )),
            )
            .child(
                el("div")
                    .class("mb-3 form-check")
                    .child(
                        el("input")
                            .attr("type", "checkbox")
                            .class("form-check-input")
                            .id("enable-animations")
                            .attr("name", "enable_animations")
                            .attr("value", "true")
                            .flag("checked", preferences.enable_animations),
                    )
                    .child(
                        el("label")
                            .class("form-check-label")
                            .attr("for", "enable-animations")
                            .text("Habilitar animaciones"),
                    ),
            )
            .child(
                el("button")
                    .attr("type", "submit")
                    .class("btn btn-primary")
                    .text("Guardar Configuración"),
            );

        let export = el("form")
            .attr("method", "get")
            .attr("action", "/reports/export")
            .attr("target", "_blank")
            .child(
                el("div")
                    .class("mb-3")
                    .child(el("label").class("form-label").text("Tipo de reporte"))
                    .child(labelled_select(
                        "report-type",
                        "type",
                        &ReportKind::ALL,
                        ReportKind::as_str,
                        ReportKind::label,
                        None,
                    )),
            )
            .child(
                el("div")
                    .class("mb-3")
                    .child(el("label").class("form-label").text("Formato"))
                    .child(labelled_select(
                        "report-format",
                        "format",
                        &ReportFormat::ALL,
                        ReportFormat::as_str,
                        ReportFormat::label,
                        None,
                    )),
            )
            .child(
                el("div").class("d-grid").child(
                    el("button")
                        .attr("type", "submit")
                        .class("btn btn-primary")
                        .id("generate-report-btn")
                        .text("Generar Reporte"),
                ),
            );

        el("div")
            .child(row(vec![
                col(
                    "col-md-6",
                    card(
                        "Preferencias de Visualización",
                        None,
                        el("div")
                            .child(
                                el("div")
                                    .class("mb-3")
                                    .child(el("label").class("form-label").text("Tema"))
                                    .child(theme_buttons),
                            )
                            .child(display),
                    ),
                ),
                col("col-md-6", card("Exportar Datos", None, export)),
            ]))
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::analytics_api::encode_target;
    use crate::application::analytics_api::testing::StubApi;
    use crate::application::section::testing::{ctx, deps};
    use crate::application::chart_registry::RenderPolicy;
    use crate::application::sections::dashboard;
    use crate::domain::chart::{BarChart, ChartSpec};
    use crate::infrastructure::file_store::MemoryStore;

    fn section(store: Arc<MemoryStore>) -> SettingsSection {
        SettingsSection::new(deps(Arc::new(StubApi::new())), store)
    }

    #[test]
    fn test_report_query() {
        let query = report_query(ReportKind::Inventory, ReportFormat::Csv, &ctx().range);
        assert_eq!(
            encode_target(REPORT_EXPORT_PATH, &query),
            "/api/reports/export?type=inventory&format=csv&start_date=2024-01-01&end_date=2024-01-31"
        );
        assert_eq!("excel".parse::<ReportFormat>(), Ok(ReportFormat::Excel));
        assert!("xml".parse::<ReportFormat>().is_err());
        assert!("returns".parse::<ReportKind>().is_err());
    }

    #[tokio::test]
    async fn test_preferences_default_and_persist() {
        let store = Arc::new(MemoryStore::new());
        let settings = section(store.clone());
        assert_eq!(settings.load_preferences().await, ChartPreferences::default());

        settings
            .save_preferences(ChartPreferences {
                default_chart_type: ChartType::Pie,
                enable_animations: false,
            })
            .await;
        assert_eq!(store.get(KEY_DEFAULT_CHART_TYPE).await.as_deref(), Some("pie"));
        assert_eq!(store.get(KEY_ENABLE_ANIMATIONS).await.as_deref(), Some("false"));

        let reloaded = section(store);
        let preferences = reloaded.load_preferences().await;
        assert_eq!(preferences.default_chart_type, ChartType::Pie);
        assert!(!preferences.enable_animations);
    }

    #[tokio::test]
    async fn test_malformed_chart_type_falls_back() {
        let store = Arc::new(MemoryStore::new());
        store.set(KEY_DEFAULT_CHART_TYPE, "donut").await.unwrap();
        let settings = section(store);
        assert_eq!(settings.load_preferences().await.default_chart_type, ChartType::Bar);
    }

    #[tokio::test]
    async fn test_animation_flag_reaches_charts() {
        let settings = section(Arc::new(MemoryStore::new()));
        let charts = settings.core.deps.charts.clone();
        charts
            .render(
                dashboard::TOP_PRODUCTS_CHART,
                ChartSpec::Bar(BarChart::default()),
                RenderPolicy::UpdateInPlace,
            )
            .await;

        settings
            .save_preferences(ChartPreferences {
                default_chart_type: ChartType::Line,
                enable_animations: false,
            })
            .await;
        let handle = charts.get(dashboard::TOP_PRODUCTS_CHART).await.unwrap();
        assert_eq!(handle.options["chart"]["animations"]["enabled"], false);
    }

    #[tokio::test]
    async fn test_render_marks_active_theme_and_rejects_filters() {
        let store = Arc::new(MemoryStore::new());
        store.set(KEY_THEME, "dark").await.unwrap();
        let settings = section(store);
        settings.show_page(&ctx()).await;

        let html = settings.render().await.render();
        assert!(html.contains("btn btn-outline-primary theme-button active\" data-theme=\"dark\""));
        assert!(html.contains("<option value=\"bar\" selected=\"selected\">Barras</option>"));
        assert!(html.contains("id=\"enable-animations\""));

        let err = settings
            .apply_filter(SectionFilter::Supplier("sup1".to_string()), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, FilterError::Unsupported { page: Page::Settings, .. }));
    }
}
