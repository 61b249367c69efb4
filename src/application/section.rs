// Shared section lifecycle: build once, load many, discard stale responses
use crate::application::analytics_api::{AnalyticsApi, ApiError};
use crate::application::chart_registry::ChartRegistry;
use crate::application::notifications::NotificationCenter;
use crate::domain::analytics::{
    DemographicView, InvalidOption, ModelKind, SentimentFilter, StockCategory, TrendInterval,
};
use crate::domain::date_range::DateRange;
use crate::domain::page::Page;
use crate::domain::view::View;
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Shared inputs of a data load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadContext {
    pub range: DateRange,
}

/// Scoped filter that reloads a single widget of a section
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionFilter {
    TrendInterval(TrendInterval),
    Demographic(DemographicView),
    ReviewProduct(Option<String>),
    ReviewCategory(Option<String>),
    ReviewSentiment(SentimentFilter),
    Customer(Option<u32>),
    Model(ModelKind),
    StockCategory(Option<StockCategory>),
    Supplier(String),
    DiscountProduct(String),
    InventorySearch(String),
    InventoryPage(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("section {page} has no filter named {field}")]
    Unsupported { page: Page, field: String },
    #[error(transparent)]
    InvalidValue(#[from] InvalidOption),
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl SectionFilter {
    /// Maps a submitted `field=value` pair of `page` to a filter
    pub fn parse(page: Page, field: &str, value: &str) -> Result<Self, FilterError> {
        let invalid = |kind: &'static str| InvalidOption {
            kind,
            value: value.to_string(),
        };
        let filter = match (page, field) {
            (Page::Dashboard, "interval") => SectionFilter::TrendInterval(value.parse()?),
            (Page::Customer, "demographic") => SectionFilter::Demographic(value.parse()?),
            (Page::Reviews, "product") => SectionFilter::ReviewProduct(optional(value)),
            (Page::Reviews, "category") => SectionFilter::ReviewCategory(optional(value)),
            (Page::Reviews, "sentiment") => SectionFilter::ReviewSentiment(value.parse()?),
            (Page::Ml, "customer") => SectionFilter::Customer(match optional(value) {
                Some(id) => Some(id.parse().map_err(|_| invalid("customer"))?),
                None => None,
            }),
            (Page::Ml, "model") => SectionFilter::Model(ModelKind::parse_or_all(value)),
            (Page::Inventory, "category") => SectionFilter::StockCategory(match optional(value) {
                Some(category) => Some(category.parse()?),
                None => None,
            }),
            (Page::Inventory, "supplier") => SectionFilter::Supplier(value.trim().to_string()),
            (Page::Inventory, "product") => SectionFilter::DiscountProduct(value.trim().to_string()),
            (Page::Inventory, "search") => SectionFilter::InventorySearch(value.to_string()),
            (Page::Inventory, "page") => {
                SectionFilter::InventoryPage(value.parse().map_err(|_| invalid("page"))?)
            }
            _ => {
                return Err(FilterError::Unsupported {
                    page,
                    field: field.to_string(),
                });
            }
        };
        Ok(filter)
    }
}

/// Proof that a widget request was issued at a given generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub widget: &'static str,
    pub generation: u64,
}

/// Monotonic request generation per widget. A response may only be applied
/// while its ticket is still the latest one issued for that widget.
#[derive(Debug, Default)]
pub struct RequestGenerations {
    current: HashMap<&'static str, u64>,
}

impl RequestGenerations {
    pub fn issue(&mut self, widget: &'static str) -> Ticket {
        let generation = self.current.entry(widget).or_insert(0);
        *generation += 1;
        Ticket {
            widget,
            generation: *generation,
        }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.current.get(ticket.widget) == Some(&ticket.generation)
    }

    /// Returns whether the ticket is current, logging when it is not
    pub fn accept(&self, ticket: &Ticket) -> bool {
        let current = self.is_current(ticket);
        if !current {
            tracing::debug!(
                "Discarding stale response for {} (generation {})",
                ticket.widget,
                ticket.generation
            );
        }
        current
    }
}

#[cfg(test)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionLifecycle {
    pub dom_built: bool,
    pub load_count: u32,
}

/// Collaborators every section works with
#[derive(Clone)]
pub struct SectionDeps {
    pub api: Arc<dyn AnalyticsApi>,
    pub charts: ChartRegistry,
    pub notifications: NotificationCenter,
}

pub struct SectionCore {
    pub deps: SectionDeps,
    built: OnceCell<()>,
    visits: AtomicU32,
}

impl SectionCore {
    pub fn new(deps: SectionDeps) -> Self {
        Self {
            deps,
            built: OnceCell::new(),
            visits: AtomicU32::new(0),
        }
    }

    /// Runs `build` on the first call only. Concurrent callers wait until
    /// that first build has finished.
    async fn ensure_built<F, Fut>(&self, build: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()>,
    {
        self.built.get_or_init(build).await;
    }

    fn record_visit(&self) -> u32 {
        self.visits.fetch_add(1, Ordering::Relaxed) + 1
    }

    #[cfg(test)]
    pub fn lifecycle(&self) -> SectionLifecycle {
        SectionLifecycle {
            dom_built: self.built.initialized(),
            load_count: self.visits.load(Ordering::Relaxed),
        }
    }
}

/// Resolves a widget request, substituting fallback data on any failure
pub async fn fetch_or_fallback<T, Fut, F>(widget: &str, request: Fut, fallback: F) -> T
where
    Fut: Future<Output = Result<T, ApiError>>,
    F: FnOnce() -> T,
{
    match request.await {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!("{} unavailable, showing sample data: {}", widget, e);
            fallback()
        }
    }
}

#[async_trait]
pub trait SectionController: Send + Sync {
    fn page(&self) -> Page;

    fn core(&self) -> &SectionCore;

    /// One-time setup of the section skeleton (static selectors, option lists)
    async fn build(&self);

    /// Fans out every widget request of the section
    async fn load_data(&self, ctx: &LoadContext);

    async fn apply_filter(&self, filter: SectionFilter, ctx: &LoadContext) -> Result<(), FilterError>;

    async fn render(&self) -> View;

    /// Activates the section: builds it on first visit, then always reloads
    async fn show_page(&self, ctx: &LoadContext) {
        let visit = self.core().record_visit();
        self.core()
            .ensure_built(move || async move {
                tracing::debug!("Building {} section", self.page());
                self.build().await;
            })
            .await;
        tracing::debug!("Loading {} section (visit {})", self.page(), visit);
        self.load_data(ctx).await;
    }
}

pub fn unsupported(page: Page, filter: &SectionFilter) -> FilterError {
    FilterError::Unsupported {
        page,
        field: format!("{:?}", filter),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generations_track_latest_ticket() {
        let mut generations = RequestGenerations::default();
        let first = generations.issue("trend");
        let other = generations.issue("summary");
        assert!(generations.is_current(&first));

        let second = generations.issue("trend");
        assert!(!generations.is_current(&first));
        assert!(generations.accept(&second));
        assert!(generations.is_current(&other));
    }

    #[test]
    fn test_filter_parsing() {
        assert_eq!(
            SectionFilter::parse(Page::Dashboard, "interval", "week"),
            Ok(SectionFilter::TrendInterval(TrendInterval::Week))
        );
        assert_eq!(
            SectionFilter::parse(Page::Inventory, "category", ""),
            Ok(SectionFilter::StockCategory(None))
        );
        assert_eq!(
            SectionFilter::parse(Page::Ml, "model", "nonsense"),
            Ok(SectionFilter::Model(ModelKind::All))
        );
        assert!(matches!(
            SectionFilter::parse(Page::Ml, "customer", "abc"),
            Err(FilterError::InvalidValue(_))
        ));
        assert!(matches!(
            SectionFilter::parse(Page::Settings, "interval", "day"),
            Err(FilterError::Unsupported { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_or_fallback() {
        let live = fetch_or_fallback("summary", async { Ok::<_, ApiError>(1) }, || 2).await;
        assert_eq!(live, 1);
        let fallback = fetch_or_fallback(
            "summary",
            async {
                Err::<i32, _>(ApiError::Status {
                    url: "/x".into(),
                    status: 500,
                })
            },
            || 2,
        )
        .await;
        assert_eq!(fallback, 2);
    }
}
