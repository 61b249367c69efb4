// Customer behavior section - cart abandonment, demographics, purchase patterns
use crate::application::chart_registry::RenderPolicy;
use crate::application::section::{
    fetch_or_fallback, unsupported, FilterError, LoadContext, RequestGenerations, SectionController,
    SectionCore, SectionDeps, SectionFilter, Ticket,
};
use crate::domain::analytics::{
    AbandonedProduct, AbandonmentTimeline, AgeGroup, CartAbandonment, DemographicView, Demographics,
    GenderGroup, LocationGroup, ProductPair, PurchaseFrequency,
};
use crate::domain::chart::{BarChart, ChartSpec, LineChart, Palette, PieChart, RadarChart, Series};
use crate::domain::components::{card, col, row, toggle_group};
use crate::domain::format::format_trimmed;
use crate::domain::page::Page;
use crate::domain::view::{el, View};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Mutex;

pub const ABANDONMENT_CHART: &str = "cart-abandonment-chart";
pub const ABANDONED_PRODUCTS_CHART: &str = "abandoned-products-chart";
pub const DEMOGRAPHICS_CHART: &str = "demographics-chart";
pub const PATTERNS_CHART: &str = "purchase-patterns-chart";
pub const FREQUENCY_CHART: &str = "purchase-frequency-chart";

const ABANDONMENT: &str = "abandonment";
const ABANDONED_PRODUCTS: &str = "abandoned-products";
const DEMOGRAPHICS: &str = "demographics";
const PATTERNS: &str = "patterns";
const FREQUENCY: &str = "frequency";

pub fn abandonment_chart(timeline: &AbandonmentTimeline) -> ChartSpec {
    ChartSpec::Line(LineChart {
        categories: timeline.dates.clone(),
        series: vec![Series::new("Tasa de Abandono", timeline.rates.clone())],
        colors: Palette::fixed(&["#e74a3b"]),
        ..LineChart::default()
    })
}

pub fn abandoned_products_chart(products: &[AbandonedProduct]) -> ChartSpec {
    ChartSpec::Bar(BarChart {
        categories: products.iter().map(|p| p.product_name.clone()).collect(),
        series: vec![Series::new("Abandonos", products.iter().map(|p| p.count).collect())],
        horizontal: true,
        colors: Palette::fixed(&["#f6c23e"]),
        ..BarChart::default()
    })
}

pub fn demographics_chart(data: &Demographics, view: DemographicView) -> ChartSpec {
    match view {
        DemographicView::Age => ChartSpec::Bar(BarChart {
            categories: data.age.iter().map(|g| g.group.clone()).collect(),
            series: vec![Series::new("Clientes", data.age.iter().map(|g| g.count).collect())],
            colors: Palette::fixed(&["#4e73df"]),
            ..BarChart::default()
        }),
        DemographicView::Gender => ChartSpec::Pie(PieChart {
            labels: data.gender.iter().map(|g| g.gender.clone()).collect(),
            values: data.gender.iter().map(|g| g.count).collect(),
            donut: false,
            colors: Palette::fixed(&["#4e73df", "#f6c23e", "#36b9cc"]),
        }),
        DemographicView::Location => ChartSpec::Bar(BarChart {
            categories: data.location.iter().map(|l| l.location.clone()).collect(),
            series: vec![Series::new("Clientes", data.location.iter().map(|l| l.count).collect())],
            colors: Palette::fixed(&["#1cc88a"]),
            ..BarChart::default()
        }),
    }
}

pub fn patterns_chart(pairs: &[ProductPair]) -> ChartSpec {
    ChartSpec::Radar(RadarChart {
        categories: pairs.iter().map(|p| p.product_pair.clone()).collect(),
        series: vec![Series::new(
            "Frecuencia de compra conjunta",
            pairs.iter().map(|p| p.frequency).collect(),
        )],
        colors: Palette::fixed(&["#1cc88a"]),
        ..RadarChart::default()
    })
}

pub fn frequency_chart(frequency: &PurchaseFrequency) -> ChartSpec {
    ChartSpec::Line(LineChart {
        categories: frequency.periods.clone(),
        series: vec![Series::new("Frecuencia", frequency.counts.clone())],
        colors: Palette::fixed(&["#36b9cc"]),
        ..LineChart::default()
    })
}

pub fn sample_abandonment() -> CartAbandonment {
    CartAbandonment {
        rate: 67.8,
        avg_time: 12.5,
        timeline: AbandonmentTimeline {
            dates: ["01/02", "02/02", "03/02", "04/02", "05/02", "06/02", "07/02"]
                .map(String::from)
                .to_vec(),
            rates: vec![65.2, 68.7, 64.3, 67.5, 70.1, 66.8, 67.8],
        },
        top_abandoned_products: sample_abandoned_products(),
    }
}

pub fn sample_abandoned_products() -> Vec<AbandonedProduct> {
    [
        ("Smartphone XYZ", 156.0),
        ("Auriculares Wireless", 127.0),
        ("Tablet Ultra", 98.0),
        ("Smartwatch Pro", 87.0),
        ("Laptop Gaming", 76.0),
    ]
    .into_iter()
    .map(|(name, count)| AbandonedProduct {
        product_name: name.to_string(),
        count,
    })
    .collect()
}

pub fn sample_demographics() -> Demographics {
    Demographics {
        age: [
            ("18-24", 246.0),
            ("25-34", 385.0),
            ("35-44", 327.0),
            ("45-54", 173.0),
            ("55-64", 98.0),
            ("65+", 42.0),
        ]
        .into_iter()
        .map(|(group, count)| AgeGroup {
            group: group.to_string(),
            count,
        })
        .collect(),
        gender: [("Masculino", 560.0), ("Femenino", 632.0), ("Otro", 79.0)]
            .into_iter()
            .map(|(gender, count)| GenderGroup {
                gender: gender.to_string(),
                count,
            })
            .collect(),
        location: [
            ("Madrid", 245.0),
            ("Barcelona", 217.0),
            ("Valencia", 178.0),
            ("Sevilla", 142.0),
            ("Bilbao", 126.0),
            ("Otros", 363.0),
        ]
        .into_iter()
        .map(|(location, count)| LocationGroup {
            location: location.to_string(),
            count,
        })
        .collect(),
    }
}

pub fn sample_pairs() -> Vec<ProductPair> {
    [
        ("Smartphone + Funda", 87.0),
        ("Laptop + Mouse", 73.0),
        ("Cámara + SD Card", 65.0),
        ("Tablet + Teclado", 58.0),
        ("TV + Soundbar", 52.0),
        ("Consola + Juego", 48.0),
    ]
    .into_iter()
    .map(|(pair, frequency)| ProductPair {
        product_pair: pair.to_string(),
        frequency,
    })
    .collect()
}

pub fn sample_frequency() -> PurchaseFrequency {
    PurchaseFrequency {
        periods: ["Lun", "Mar", "Mié", "Jue", "Vie", "Sáb", "Dom"].map(String::from).to_vec(),
        counts: vec![32.0, 45.0, 38.0, 41.0, 53.0, 68.0, 49.0],
    }
}

enum Update {
    Abandonment(Ticket, CartAbandonment),
    AbandonedProducts(Ticket, Vec<AbandonedProduct>),
    Demographics(Ticket, DemographicView, Demographics),
    Patterns(Ticket, Vec<ProductPair>),
    Frequency(Ticket, PurchaseFrequency),
}

#[derive(Default)]
struct CustomerState {
    generations: RequestGenerations,
    demographic: DemographicView,
    abandonment_rate: Option<f64>,
    abandonment_time: Option<f64>,
}

pub struct CustomerSection {
    core: SectionCore,
    state: Mutex<CustomerState>,
}

impl CustomerSection {
    pub fn new(deps: SectionDeps) -> Self {
        Self {
            core: SectionCore::new(deps),
            state: Mutex::new(CustomerState::default()),
        }
    }

    fn demographics_request(&self, ticket: Ticket, view: DemographicView) -> BoxFuture<'_, Update> {
        let api = &self.core.deps.api;
        Box::pin(async move {
            let data = fetch_or_fallback("demographics", api.demographics(), sample_demographics).await;
            Update::Demographics(ticket, view, data)
        })
    }

    async fn apply(&self, update: Update) {
        let charts = &self.core.deps.charts;
        let policy = RenderPolicy::UpdateInPlace;
        let mut state = self.state.lock().await;
        match update {
            Update::Abandonment(ticket, data) => {
                if state.generations.accept(&ticket) {
                    state.abandonment_rate = Some(data.rate);
                    state.abandonment_time = Some(data.avg_time);
                    charts.render(ABANDONMENT_CHART, abandonment_chart(&data.timeline), policy).await;
                }
            }
            Update::AbandonedProducts(ticket, products) => {
                if state.generations.accept(&ticket) {
                    charts
                        .render(ABANDONED_PRODUCTS_CHART, abandoned_products_chart(&products), policy)
                        .await;
                }
            }
            Update::Demographics(ticket, view, data) => {
                if state.generations.accept(&ticket) {
                    charts.render(DEMOGRAPHICS_CHART, demographics_chart(&data, view), policy).await;
                }
            }
            Update::Patterns(ticket, pairs) => {
                if state.generations.accept(&ticket) {
                    charts.render(PATTERNS_CHART, patterns_chart(&pairs), policy).await;
                }
            }
            Update::Frequency(ticket, frequency) => {
                if state.generations.accept(&ticket) {
                    charts.render(FREQUENCY_CHART, frequency_chart(&frequency), policy).await;
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
impl SectionController for CustomerSection {
    fn page(&self) -> Page {
        Page::Customer
    }

    fn core(&self) -> &SectionCore {
        &self.core
    }

    async fn build(&self) {}

    async fn load_data(&self, _ctx: &LoadContext) {
        let (tickets, view) = {
            let mut state = self.state.lock().await;
            let tickets = [ABANDONMENT, ABANDONED_PRODUCTS, DEMOGRAPHICS, PATTERNS, FREQUENCY]
                .map(|widget| state.generations.issue(widget));
            (tickets, state.demographic)
        };
        let [abandonment, products, demographics, patterns, frequency] = tickets;

        let api = &self.core.deps.api;
        let pending: FuturesUnordered<BoxFuture<'_, Update>> = FuturesUnordered::new();
        pending.push(Box::pin(async move {
            let data = fetch_or_fallback("cart abandonment", api.cart_abandonment(), sample_abandonment).await;
            Update::Abandonment(abandonment, data)
        }));
        pending.push(Box::pin(async move {
            let data = fetch_or_fallback(
                "abandoned products",
                async { api.cart_abandonment().await.map(|d| d.top_abandoned_products) },
                sample_abandoned_products,
            )
            .await;
            Update::AbandonedProducts(products, data)
        }));
        pending.push(self.demographics_request(demographics, view));
        pending.push(Box::pin(async move {
            let data = fetch_or_fallback(
                "purchase patterns",
                async { api.purchase_patterns().await.map(|d| d.related_products) },
                sample_pairs,
            )
            .await;
            Update::Patterns(patterns, data)
        }));
        pending.push(Box::pin(async move {
            let data = fetch_or_fallback(
                "purchase frequency",
                async { api.purchase_patterns().await.map(|d| d.frequency) },
                sample_frequency,
            )
            .await;
            Update::Frequency(frequency, data)
        }));
        self.drain(pending).await;
    }

    async fn apply_filter(&self, filter: SectionFilter, _ctx: &LoadContext) -> Result<(), FilterError> {
        let SectionFilter::Demographic(view) = filter else {
            return Err(unsupported(self.page(), &filter));
        };
        let ticket = {
            let mut state = self.state.lock().await;
            state.demographic = view;
            state.generations.issue(DEMOGRAPHICS)
        };
        let pending = FuturesUnordered::new();
        pending.push(self.demographics_request(ticket, view));
        self.drain(pending).await;
        Ok(())
    }

    async fn render(&self) -> View {
        let charts = &self.core.deps.charts;
        let (rate, time, demographic) = {
            let state = self.state.lock().await;
            (state.abandonment_rate, state.abandonment_time, state.demographic)
        };
        let rate = rate.map_or("0%".to_string(), |r| format!("{}%", format_trimmed(r, 2)));
        let time = time.map_or("0 min".to_string(), |t| format!("{} min", format_trimmed(t, 2)));

        let abandonment_metrics = row(vec![
            col(
                "col-md-6",
                el("div")
                    .class("metric-card")
                    .child(el("h6").text("Tasa de Abandono"))
                    .child(el("p").class("metric-value").id("cart-abandonment-rate").text(rate)),
            ),
            col(
                "col-md-6",
                el("div")
                    .class("metric-card")
                    .child(el("h6").text("Tiempo Promedio"))
                    .child(el("p").class("metric-value").id("cart-abandonment-time").text(time)),
            ),
        ]);

        let demographic_buttons = toggle_group(
            "/pages/customer/filter",
            "demographic",
            &[("age", "Edad"), ("gender", "Género"), ("location", "Ubicación")],
            demographic.as_str(),
        );

        el("div")
            .child(row(vec![
                col(
                    "col-md-6",
                    card(
                        "Abandono de Carrito",
                        None,
                        el("div").child(abandonment_metrics).child(charts.slot(ABANDONMENT_CHART).await),
                    ),
                ),
                col(
                    "col-md-6",
                    card("Productos Más Abandonados", None, charts.slot(ABANDONED_PRODUCTS_CHART).await),
                ),
            ]))
            .child(row(vec![col(
                "col-md-12",
                card(
                    "Demografía de Clientes",
                    Some(demographic_buttons.into()),
                    charts.slot(DEMOGRAPHICS_CHART).await,
                ),
            )]))
            .child(row(vec![
                col("col-md-6", card("Patrones de Compra", None, charts.slot(PATTERNS_CHART).await)),
                col("col-md-6", card("Frecuencia de Compra", None, charts.slot(FREQUENCY_CHART).await)),
            ]))
            .into()
    }
}
