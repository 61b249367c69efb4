// Dashboard section - summary metrics, sales trend, top products, heatmap
use crate::application::chart_registry::RenderPolicy;
use crate::application::section::{
    fetch_or_fallback, unsupported, FilterError, LoadContext, RequestGenerations, SectionController,
    SectionCore, SectionDeps, SectionFilter, Ticket,
};
use crate::domain::analytics::{
    Activity, DashboardSummary, HeatPoint, LocationHeatmap, SalesTrend, TopProduct, TrendInterval,
};
use crate::domain::chart::{Axis, BarChart, ChartSpec, HeatmapChart, LineChart, Palette, Series};
use crate::domain::components::{card, col, metric, row, toggle_group};
use crate::domain::format::{day_month, format_fixed, format_locale};
use crate::domain::page::Page;
use crate::domain::view::{el, View};
use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Mutex;

pub const TREND_CHART: &str = "sales-trend-chart";
pub const TOP_PRODUCTS_CHART: &str = "top-products-chart";
pub const HEATMAP: &str = "location-heatmap";

const SUMMARY: &str = "summary";
const TREND: &str = "sales-trend";
const TOP_PRODUCTS: &str = "top-products";
const LOCATIONS: &str = "locations";

pub fn trend_chart(data: &SalesTrend) -> ChartSpec {
    ChartSpec::Line(LineChart {
        categories: data.dates.clone(),
        series: vec![Series::new("Ventas", data.values.clone())],
        area: true,
        colors: Palette::fixed(&["#4e73df"]),
        y_axis: Axis::titled("Ventas"),
    })
}

pub fn top_products_chart(products: &[TopProduct]) -> ChartSpec {
    ChartSpec::Bar(BarChart {
        categories: products.iter().map(|p| p.name.clone()).collect(),
        series: vec![Series::new(
            "Unidades vendidas",
            products.iter().map(|p| p.quantity).collect(),
        )],
        horizontal: true,
        colors: Palette::fixed(&["#36b9cc"]),
        ..BarChart::default()
    })
}

pub fn heatmap_chart(data: &LocationHeatmap) -> ChartSpec {
    ChartSpec::Heatmap(HeatmapChart {
        points: data.locations.clone(),
        max: 100.0,
        radius: 20,
    })
}

pub fn sample_summary() -> DashboardSummary {
    DashboardSummary {
        total_sales: 1258.0,
        conversion_rate: 3.45,
        total_revenue: 157895.50,
        available_stock: 5642.0,
        top_products: sample_top_products(),
        recent_activity: sample_activity(),
    }
}

pub fn sample_top_products() -> Vec<TopProduct> {
    [
        ("Smartphone XYZ", 125.0),
        ("Auriculares ABC", 98.0),
        ("Laptop Pro", 76.0),
        ("Smartwatch Y23", 62.0),
        ("Tablet Ultra", 45.0),
    ]
    .into_iter()
    .map(|(name, quantity)| TopProduct {
        name: name.to_string(),
        quantity,
    })
    .collect()
}

pub fn sample_activity() -> Vec<Activity> {
    [
        ("sale", "shopping-cart", "Nueva venta: Smartphone XYZ", "Hace 5 minutos"),
        ("user", "user", "Nuevo cliente registrado: María López", "Hace 15 minutos"),
        ("review", "star", "Nueva reseña: Tablet ABC (5 estrellas)", "Hace 32 minutos"),
        ("alert", "exclamation-triangle", "Alerta de stock bajo: Auriculares QWE", "Hace 45 minutos"),
    ]
    .into_iter()
    .map(|(kind, icon, text, time)| Activity {
        kind: kind.to_string(),
        icon: icon.to_string(),
        text: text.to_string(),
        time: time.to_string(),
    })
    .collect()
}

/// 31 daily points ending on `today`, values in 10..100
pub fn sample_trend(today: NaiveDate) -> SalesTrend {
    let (dates, values) = (0..=30u64)
        .rev()
        .map(|days_back| {
            let date = today.checked_sub_days(Days::new(days_back)).unwrap_or(today);
            let value = 10 + (days_back * 37 + 11) % 90;
            (day_month(date), value as f64)
        })
        .unzip();
    SalesTrend { dates, values }
}

/// 50 points spread over the 0..100 grid
pub fn sample_locations() -> LocationHeatmap {
    LocationHeatmap {
        locations: (0..50u32)
            .map(|i| HeatPoint {
                x: f64::from((i * 53 + 7) % 100),
                y: f64::from((i * 29 + 13) % 100),
                value: f64::from((i * 41 + 3) % 100),
            })
            .collect(),
    }
}

enum Update {
    Summary(Ticket, DashboardSummary),
    Trend(Ticket, SalesTrend),
    TopProducts(Ticket, Vec<TopProduct>),
    Locations(Ticket, LocationHeatmap),
}

#[derive(Default)]
struct DashboardState {
    generations: RequestGenerations,
    interval: TrendInterval,
    summary: Option<DashboardSummary>,
    activities: Vec<Activity>,
}

pub struct DashboardSection {
    core: SectionCore,
    state: Mutex<DashboardState>,
}

impl DashboardSection {
    pub fn new(deps: SectionDeps) -> Self {
        Self {
            core: SectionCore::new(deps),
            state: Mutex::new(DashboardState::default()),
        }
    }

    fn trend_request(&self, ticket: Ticket, ctx: &LoadContext, interval: TrendInterval) -> BoxFuture<'_, Update> {
        let api = &self.core.deps.api;
        let range = ctx.range;
        Box::pin(async move {
            let trend = fetch_or_fallback(
                "sales trend",
                api.sales_trends(&range, interval),
                || sample_trend(Utc::now().date_naive()),
            )
            .await;
            Update::Trend(ticket, trend)
        })
    }

    async fn apply(&self, update: Update) {
        let charts = &self.core.deps.charts;
        let mut state = self.state.lock().await;
        match update {
            Update::Summary(ticket, summary) => {
                if !state.generations.accept(&ticket) {
                    return;
                }
                state.activities = if summary.recent_activity.is_empty() {
                    sample_activity()
                } else {
                    summary.recent_activity.clone()
                };
                state.summary = Some(summary);
            }
            Update::Trend(ticket, trend) => {
                if state.generations.accept(&ticket) {
                    charts
                        .render(TREND_CHART, trend_chart(&trend), RenderPolicy::UpdateInPlace)
                        .await;
                }
            }
            Update::TopProducts(ticket, products) => {
                if state.generations.accept(&ticket) {
                    charts
                        .render(TOP_PRODUCTS_CHART, top_products_chart(&products), RenderPolicy::UpdateInPlace)
                        .await;
                }
            }
            Update::Locations(ticket, locations) => {
                if state.generations.accept(&ticket) {
                    charts
                        .render(HEATMAP, heatmap_chart(&locations), RenderPolicy::UpdateInPlace)
                        .await;
                }
            }
        }
    }

    async fn drain(&self, mut pending: FuturesUnordered<BoxFuture<'_, Update>>) {
        while let Some(update) = pending.next().await {
            self.apply(update).await;
        }
    }
}

#[async_trait]
impl SectionController for DashboardSection {
    fn page(&self) -> Page {
        Page::Dashboard
    }

    fn core(&self) -> &SectionCore {
        &self.core
    }

    async fn build(&self) {}

    async fn load_data(&self, ctx: &LoadContext) {
        let (summary_ticket, trend_ticket, top_ticket, locations_ticket, interval) = {
            let mut state = self.state.lock().await;
            (
                state.generations.issue(SUMMARY),
                state.generations.issue(TREND),
                state.generations.issue(TOP_PRODUCTS),
                state.generations.issue(LOCATIONS),
                state.interval,
            )
        };

        let api = &self.core.deps.api;
        let range = ctx.range;
        let pending: FuturesUnordered<BoxFuture<'_, Update>> = FuturesUnordered::new();
        pending.push(Box::pin(async move {
            let summary =
                fetch_or_fallback("dashboard summary", api.dashboard_summary(&range), sample_summary).await;
            Update::Summary(summary_ticket, summary)
        }));
        pending.push(self.trend_request(trend_ticket, ctx, interval));
        pending.push(Box::pin(async move {
            let products = fetch_or_fallback(
                "top products",
                async { api.dashboard_summary(&range).await.map(|s| s.top_products) },
                sample_top_products,
            )
            .await;
            Update::TopProducts(top_ticket, products)
        }));
        pending.push(Box::pin(async move {
            let locations =
                fetch_or_fallback("location heatmap", api.location_heatmap(), sample_locations).await;
            Update::Locations(locations_ticket, locations)
        }));
        self.drain(pending).await;
    }

    async fn apply_filter(&self, filter: SectionFilter, ctx: &LoadContext) -> Result<(), FilterError> {
        let SectionFilter::TrendInterval(interval) = filter else {
            return Err(unsupported(self.page(), &filter));
        };
        let ticket = {
            let mut state = self.state.lock().await;
            state.interval = interval;
            state.generations.issue(TREND)
        };
        let pending = FuturesUnordered::new();
        pending.push(self.trend_request(ticket, ctx, interval));
        self.drain(pending).await;
        Ok(())
    }

    async fn render(&self) -> View {
        let charts = &self.core.deps.charts;
        let (summary, activities, interval) = {
            let state = self.state.lock().await;
            (state.summary.clone(), state.activities.clone(), state.interval)
        };

        let value = |f: fn(&DashboardSummary) -> String| {
            summary.as_ref().map(f).unwrap_or_else(|| "--".to_string())
        };
        let metrics = row(vec![
            col(
                "col-md-3",
                metric("total-sales", "Ventas Totales", &value(|s| format_locale(s.total_sales)), "shopping-cart"),
            ),
            col(
                "col-md-3",
                metric(
                    "conversion-rate",
                    "Tasa de Conversión",
                    &value(|s| format!("{}%", format_fixed(s.conversion_rate, 2))),
                    "percentage",
                ),
            ),
            col(
                "col-md-3",
                metric(
                    "total-revenue",
                    "Ingresos Totales",
                    &value(|s| format!("${}", format_locale(s.total_revenue))),
                    "dollar-sign",
                ),
            ),
            col(
                "col-md-3",
                metric("available-stock", "Stock Disponible", &value(|s| format_locale(s.available_stock)), "boxes"),
            ),
        ]);

        let interval_buttons = toggle_group(
            "/pages/dashboard/filter",
            "interval",
            &[("day", "Día"), ("week", "Semana"), ("month", "Mes")],
            interval.as_str(),
        );

        let activity_list = el("ul").id("recent-activity").class("activity-list").children(
            activities.iter().map(|activity| {
                el("li")
                    .class("activity-item")
                    .child(
                        el("div")
                            .class("activity-icon")
                            .child(el("i").class(format!("fas fa-{}", activity.icon))),
                    )
                    .child(
                        el("div")
                            .class("activity-content")
                            .child(el("p").class("activity-text").text(activity.text.clone()))
                            .child(el("p").class("activity-time").text(activity.time.clone())),
                    )
            }),
        );

        el("div")
            .child(metrics)
            .child(row(vec![
                col(
                    "col-lg-8",
                    card("Tendencia de Ventas", Some(interval_buttons.into()), charts.slot(TREND_CHART).await),
                ),
                col(
                    "col-lg-4",
                    card("Productos Más Vendidos", None, charts.slot(TOP_PRODUCTS_CHART).await),
                ),
            ]))
            .child(row(vec![
                col("col-lg-8", card("Ventas por Ubicación", None, charts.slot(HEATMAP).await)),
                col("col-lg-4", card("Actividad Reciente", None, activity_list)),
            ]))
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::analytics_api::testing::StubApi;
    use crate::application::section::testing::{ctx, deps, text_of};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_summary_failure_renders_sample_figures() {
        let api = Arc::new(StubApi::new());
        let section = DashboardSection::new(deps(api.clone()));
        section.show_page(&ctx()).await;

        let view = section.render().await;
        assert_eq!(text_of(&view, "total-sales"), "1258");
        assert_eq!(text_of(&view, "conversion-rate"), "3.45%");
        assert_eq!(text_of(&view, "total-revenue"), "$157.895,5");
        assert_eq!(text_of(&view, "available-stock"), "5642");
        assert!(view.render().contains("Alerta de stock bajo: Auriculares QWE"));

        let charts = &section.core.deps.charts;
        assert_eq!(charts.get(TREND_CHART).await.unwrap().spec.point_count(), 31);
        assert_eq!(charts.get(HEATMAP).await.unwrap().spec.point_count(), 50);
        assert_eq!(charts.get(TOP_PRODUCTS_CHART).await.unwrap().spec.point_count(), 5);
    }

    #[tokio::test]
    async fn test_live_summary_and_scoped_interval_filter() {
        let api = Arc::new(
            StubApi::new()
                .with(
                    "/api/dashboard/summary",
                    json!({
                        "total_sales": 20500, "conversion_rate": 2.5, "total_revenue": 1000.25, "available_stock": 12,
                        "top_products": [{"name": "Monitor", "quantity": 3}],
                        "recent_activity": [{"type": "sale", "icon": "shopping-cart", "text": "Venta: Monitor", "time": "Hace 1 minuto"}]
                    }),
                )
                .with("/api/dashboard/sales_trends", json!({"dates": ["01/01"], "values": [5]}))
                .with("/api/dashboard/location_heatmap", json!({"locations": []})),
        );
        let section = DashboardSection::new(deps(api.clone()));
        section.show_page(&ctx()).await;

        let view = section.render().await;
        assert_eq!(text_of(&view, "total-sales"), "20.500");
        assert!(view.render().contains("Venta: Monitor"));
        assert_eq!(
            section.core.deps.charts.get(HEATMAP).await.unwrap().spec.point_count(),
            0
        );

        let before = api.request_count();
        section
            .apply_filter(SectionFilter::TrendInterval(TrendInterval::Week), &ctx())
            .await
            .unwrap();
        let targets = api.targets();
        assert_eq!(targets.len(), before + 1);
        assert!(targets[before].ends_with("interval=week"));
    }

    #[tokio::test]
    async fn test_show_page_builds_once() {
        let section = DashboardSection::new(deps(Arc::new(StubApi::new())));
        section.show_page(&ctx()).await;
        section.show_page(&ctx()).await;
        let lifecycle = section.core.lifecycle();
        assert_eq!(lifecycle.load_count, 2);
        assert!(lifecycle.dom_built);
    }

    #[test]
    fn test_sample_trend_is_deterministic() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let trend = sample_trend(today);
        assert_eq!(trend.dates.len(), 31);
        assert_eq!(trend.dates.first().map(String::as_str), Some("01/03"));
        assert_eq!(trend.dates.last().map(String::as_str), Some("31/03"));
        assert!(trend.values.iter().all(|v| (10.0..100.0).contains(v)));
        assert_eq!(trend, sample_trend(today));
    }
}
