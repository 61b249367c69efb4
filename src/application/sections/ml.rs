// Machine learning section - segments, abandonment prediction, recommendations, model health
use crate::application::chart_registry::RenderPolicy;
use crate::application::section::{
    fetch_or_fallback, unsupported, FilterError, LoadContext, RequestGenerations, SectionController,
    SectionCore, SectionDeps, SectionFilter, Ticket,
};
use crate::domain::analytics::{
    AbandonmentPrediction, Customer, CustomerSegment, Factor, ModelKind, ModelMetrics, ModelPerformance,
    PerformancePoint, PredictionScore, Recommendation, SentimentBreakdown, SentimentTrend,
};
use crate::domain::chart::{Axis, BarChart, ChartSpec, LineChart, Palette, PieChart, Series};
use crate::domain::components::{card, col, row, select_form};
use crate::domain::format::{format_fixed, format_trimmed};
use crate::domain::page::Page;
use crate::domain::view::{el, Element, View};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Mutex;

pub const SEGMENTS_CHART: &str = "customer-segments-chart";
pub const FACTORS_CHART: &str = "abandonment-factors-chart";
pub const SENTIMENT_CHART: &str = "sentiment-analysis-chart";
pub const SENTIMENT_TRENDS_CHART: &str = "sentiment-trends-chart";
pub const PERFORMANCE_CHART: &str = "model-performance-chart";

const SEGMENTS: &str = "segments";
const PREDICTION: &str = "prediction";
const SENTIMENT: &str = "sentiment";
const RECOMMENDATIONS: &str = "recommendations";

/// Session the abandonment model scores
const CURRENT_SESSION: &str = "current";
const SENTIMENT_COLORS: [&str; 3] = ["#1cc88a", "#f6c23e", "#e74a3b"];

pub fn segments_chart(segments: &[CustomerSegment]) -> ChartSpec {
    ChartSpec::Pie(PieChart {
        labels: segments.iter().map(|s| s.name.clone()).collect(),
        values: segments.iter().map(|s| s.count).collect(),
        donut: false,
        colors: Palette::fixed(&["#4e73df", "#1cc88a", "#36b9cc", "#f6c23e", "#e74a3b"]),
    })
}

pub fn factors_chart(factors: &[Factor]) -> ChartSpec {
    ChartSpec::Bar(BarChart {
        categories: factors.iter().map(|f| f.name.clone()).collect(),
        series: vec![Series::new("Influencia", factors.iter().map(|f| f.weight).collect())],
        horizontal: true,
        colors: Palette::fixed(&["#f6c23e"]),
        ..BarChart::default()
    })
}

pub fn sentiment_donut(data: &SentimentBreakdown) -> ChartSpec {
    ChartSpec::Pie(PieChart {
        labels: ["Positivo", "Neutral", "Negativo"].map(String::from).to_vec(),
        values: vec![data.positive, data.neutral, data.negative],
        donut: true,
        colors: Palette::fixed(&SENTIMENT_COLORS),
    })
}

pub fn sentiment_trends_chart(trends: &[SentimentTrend]) -> ChartSpec {
    let series = |name: &str, pick: fn(&SentimentTrend) -> f64| Series::new(name, trends.iter().map(pick).collect());
    ChartSpec::Line(LineChart {
        categories: trends.iter().map(|t| t.period.clone()).collect(),
        series: vec![
            series("Positivo", |t| t.positive),
            series("Neutral", |t| t.neutral),
            series("Negativo", |t| t.negative),
        ],
        colors: Palette::fixed(&SENTIMENT_COLORS),
        ..LineChart::default()
    })
}

pub fn performance_chart(history: &[PerformancePoint]) -> ChartSpec {
    let series =
        |name: &str, pick: fn(&PerformancePoint) -> f64| Series::new(name, history.iter().map(pick).collect());
    ChartSpec::Line(LineChart {
        categories: history.iter().map(|h| h.date.clone()).collect(),
        series: vec![
            series("Precisión", |h| h.precision),
            series("Recall", |h| h.recall),
            series("F1-Score", |h| h.f1),
        ],
        colors: Palette::fixed(&["#4e73df", "#1cc88a", "#f6c23e"]),
        y_axis: Axis::range(0.0, 100.0),
        ..LineChart::default()
    })
}

fn recommendation_card(product: &Recommendation) -> Element {
    col(
        "col-md-4 mb-3",
        el("div").class("card h-100").child(
            el("div")
                .class("card-body")
                .child(el("h6").class("card-title").text(product.name.clone()))
                .child(el("p").class("card-text text-muted").text(product.category.clone()))
                .child(
                    el("p")
                        .class("text-primary font-weight-bold")
                        .text(format!("${}", format_fixed(product.price, 2))),
                )
                .child(
                    el("div").class("d-flex align-items-center").child(
                        el("div").class("recommendation-score").child(
                            el("span")
                                .class("badge bg-success")
                                .text(format!("{}% match", format_trimmed(product.score, 2))),
                        ),
                    ),
                ),
        ),
    )
}

fn info(message: &str) -> Element {
    el("div").class("alert alert-info").text(message)
}

pub fn sample_segments() -> Vec<CustomerSegment> {
    [
        ("Compradores frecuentes", 842.0),
        ("Compradores ocasionales", 1253.0),
        ("Nuevos clientes", 753.0),
        ("Clientes inactivos", 486.0),
        ("Clientes potenciales", 324.0),
    ]
    .into_iter()
    .map(|(name, count)| CustomerSegment {
        name: name.to_string(),
        count,
    })
    .collect()
}

pub fn sample_prediction() -> AbandonmentPrediction {
    AbandonmentPrediction {
        prediction: PredictionScore {
            probability: 67.5,
            is_likely_to_abandon: true,
        },
        model_metrics: ModelMetrics {
            accuracy: 83.2,
            precision: 79.1,
            recall: 76.5,
        },
        factors: [
            ("Precio elevado", 8.7),
            ("Tiempo en carrito", 7.2),
            ("Dispositivo móvil", 5.8),
            ("Historial de abandono", 4.9),
            ("Hora del día", 3.6),
        ]
        .into_iter()
        .map(|(name, weight)| Factor {
            name: name.to_string(),
            weight,
        })
        .collect(),
    }
}

pub fn sample_sentiment() -> SentimentBreakdown {
    SentimentBreakdown {
        positive: 62.0,
        neutral: 28.0,
        negative: 10.0,
        trends: [
            ("Ene", 58.0, 32.0, 10.0),
            ("Feb", 60.0, 30.0, 10.0),
            ("Mar", 57.0, 31.0, 12.0),
            ("Abr", 61.0, 29.0, 10.0),
            ("May", 65.0, 27.0, 8.0),
            ("Jun", 62.0, 28.0, 10.0),
        ]
        .into_iter()
        .map(|(period, positive, neutral, negative)| SentimentTrend {
            period: period.to_string(),
            positive,
            neutral,
            negative,
        })
        .collect(),
    }
}

/// Customers offered in the recommendation selector
pub fn sample_customers() -> Vec<Customer> {
    [
        (1, "Juan Pérez"),
        (2, "María García"),
        (3, "Carlos López"),
        (4, "Ana Martínez"),
        (5, "Roberto Fernández"),
    ]
    .into_iter()
    .map(|(id, name)| Customer {
        id,
        name: name.to_string(),
    })
    .collect()
}

pub fn sample_recommendations() -> Vec<Recommendation> {
    [
        (101, "Smartphone XYZ", "Electrónica", 599.99, 95.0),
        (203, "Auriculares Bluetooth", "Accesorios", 79.99, 92.0),
        (308, "Smartwatch Sport", "Wearables", 199.99, 87.0),
        (415, "Funda Protectora", "Accesorios", 24.99, 85.0),
        (502, "Cargador Inalámbrico", "Accesorios", 39.99, 82.0),
        (609, "Tablet Ultra", "Electrónica", 349.99, 78.0),
    ]
    .into_iter()
    .map(|(id, name, category, price, score)| Recommendation {
        id,
        name: name.to_string(),
        category: category.to_string(),
        price,
        score,
    })
    .collect()
}

type PerformanceRow = (&'static str, f64, f64, f64);

fn performance(summary: (f64, f64, f64), history: [PerformanceRow; 6]) -> ModelPerformance {
    ModelPerformance {
        precision: summary.0,
        recall: summary.1,
        f1: summary.2,
        history: history
            .into_iter()
            .map(|(date, precision, recall, f1)| PerformancePoint {
                date: date.to_string(),
                precision,
                recall,
                f1,
            })
            .collect(),
    }
}

/// Model health figures; there is no backend endpoint for them
pub fn sample_model_performance(kind: ModelKind) -> ModelPerformance {
    match kind {
        ModelKind::All => performance(
            (81.5, 78.3, 79.9),
            [
                ("Ene", 78.1, 75.2, 76.6),
                ("Feb", 79.3, 76.1, 77.7),
                ("Mar", 80.2, 77.5, 78.8),
                ("Abr", 80.9, 77.8, 79.3),
                ("May", 81.3, 78.0, 79.6),
                ("Jun", 81.5, 78.3, 79.9),
            ],
        ),
        ModelKind::Segment => performance(
            (85.2, 82.1, 83.6),
            [
                ("Ene", 81.3, 79.2, 80.2),
                ("Feb", 82.5, 80.0, 81.2),
                ("Mar", 83.4, 80.8, 82.1),
                ("Abr", 84.2, 81.3, 82.7),
                ("May", 84.8, 81.8, 83.3),
                ("Jun", 85.2, 82.1, 83.6),
            ],
        ),
        ModelKind::Abandonment => performance(
            (79.1, 76.5, 77.8),
            [
                ("Ene", 75.3, 72.1, 73.7),
                ("Feb", 76.5, 73.2, 74.8),
                ("Mar", 77.4, 74.3, 75.8),
                ("Abr", 78.2, 75.1, 76.6),
                ("May", 78.7, 76.0, 77.3),
                ("Jun", 79.1, 76.5, 77.8),
            ],
        ),
        ModelKind::Recommendation => performance(
            (83.7, 80.2, 81.9),
            [
                ("Ene", 79.2, 76.3, 77.7),
                ("Feb", 80.5, 77.5, 79.0),
                ("Mar", 81.8, 78.4, 80.1),
                ("Abr", 82.6, 79.0, 80.8),
                ("May", 83.2, 79.8, 81.5),
                ("Jun", 83.7, 80.2, 81.9),
            ],
        ),
        ModelKind::Sentiment => performance(
            (78.3, 74.8, 76.5),
            [
                ("Ene", 73.5, 70.8, 72.1),
                ("Feb", 74.8, 71.5, 73.1),
                ("Mar", 75.9, 72.4, 74.1),
                ("Abr", 76.7, 73.2, 74.9),
                ("May", 77.5, 74.1, 75.7),
                ("Jun", 78.3, 74.8, 76.5),
            ],
        ),
    }
}

enum Update {
    Segments(Ticket, Vec<CustomerSegment>),
    Prediction(Ticket, AbandonmentPrediction),
    Sentiment(Ticket, SentimentBreakdown),
    Recommendations(Ticket, Vec<Recommendation>),
}

#[derive(Default)]
struct MlState {
    generations: RequestGenerations,
    customer: Option<u32>,
    model: ModelKind,
    prediction: Option<PredictionScore>,
    accuracy: Option<f64>,
    recommendations: Option<Vec<Recommendation>>,
    performance: Option<ModelPerformance>,
}

pub struct MlSection {
    core: SectionCore,
    state: Mutex<MlState>,
}

impl MlSection {
    pub fn new(deps: SectionDeps) -> Self {
        Self {
            core: SectionCore::new(deps),
            state: Mutex::new(MlState::default()),
        }
    }

    fn recommendations_request(&self, ticket: Ticket, customer: u32) -> BoxFuture<'_, Update> {
        let api = &self.core.deps.api;
        Box::pin(async move {
            let data = fetch_or_fallback(
                "product recommendations",
                api.product_recommendations(customer),
                sample_recommendations,
            )
            .await;
            Update::Recommendations(ticket, data)
        })
    }

    /// Model health is local sample data, rendered without a request
    async fn show_model_performance(&self, state: &mut MlState) {
        let performance = sample_model_performance(state.model);
        self.core
            .deps
            .charts
            .render(PERFORMANCE_CHART, performance_chart(&performance.history), RenderPolicy::Recreate)
            .await;
        state.performance = Some(performance);
    }

    async fn apply(&self, update: Update) {
        let charts = &self.core.deps.charts;
        let policy = RenderPolicy::Recreate;
        let mut state = self.state.lock().await;
        match update {
            Update::Segments(ticket, segments) => {
                if state.generations.accept(&ticket) {
                    charts.render(SEGMENTS_CHART, segments_chart(&segments), policy).await;
                }
            }
            Update::Prediction(ticket, data) => {
                if state.generations.accept(&ticket) {
                    charts.render(FACTORS_CHART, factors_chart(&data.factors), policy).await;
                    state.prediction = Some(data.prediction);
                    state.accuracy = Some(data.model_metrics.accuracy);
                }
            }
            Update::Sentiment(ticket, data) => {
                if state.generations.accept(&ticket) {
                    charts.render(SENTIMENT_CHART, sentiment_donut(&data), policy).await;
                    charts
                        .render(SENTIMENT_TRENDS_CHART, sentiment_trends_chart(&data.trends), policy)
                        .await;
                }
            }
            Update::Recommendations(ticket, data) => {
                if state.generations.accept(&ticket) {
                    state.recommendations = Some(data);
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
impl SectionController for MlSection {
    fn page(&self) -> Page {
        Page::Ml
    }

    fn core(&self) -> &SectionCore {
        &self.core
    }

    async fn build(&self) {}

    async fn load_data(&self, _ctx: &LoadContext) {
        let (segments, prediction, sentiment, recommendations) = {
            let mut state = self.state.lock().await;
            self.show_model_performance(&mut state).await;
            let recommendations = match state.customer {
                Some(customer) => Some((state.generations.issue(RECOMMENDATIONS), customer)),
                None => None,
            };
            (
                state.generations.issue(SEGMENTS),
                state.generations.issue(PREDICTION),
                state.generations.issue(SENTIMENT),
                recommendations,
            )
        };

        let api = &self.core.deps.api;
        let pending: FuturesUnordered<BoxFuture<'_, Update>> = FuturesUnordered::new();
        pending.push(Box::pin(async move {
            let data = fetch_or_fallback("customer segments", api.customer_segments(), sample_segments).await;
            Update::Segments(segments, data)
        }));
        pending.push(Box::pin(async move {
            let data = fetch_or_fallback(
                "abandonment prediction",
                api.abandonment_prediction(CURRENT_SESSION),
                sample_prediction,
            )
            .await;
            Update::Prediction(prediction, data)
        }));
        pending.push(Box::pin(async move {
            let data = fetch_or_fallback("sentiment analysis", api.review_sentiment(None), sample_sentiment).await;
            Update::Sentiment(sentiment, data)
        }));
        if let Some((ticket, customer)) = recommendations {
            pending.push(self.recommendations_request(ticket, customer));
        }
        self.drain(pending).await;
    }

    async fn apply_filter(&self, filter: SectionFilter, _ctx: &LoadContext) -> Result<(), FilterError> {
        let mut state = self.state.lock().await;
        match filter {
            SectionFilter::Customer(customer) => {
                state.customer = customer;
                let ticket = state.generations.issue(RECOMMENDATIONS);
                let Some(customer) = customer else {
                    state.recommendations = None;
                    return Ok(());
                };
                drop(state);
                let pending = FuturesUnordered::new();
                pending.push(self.recommendations_request(ticket, customer));
                self.drain(pending).await;
            }
            SectionFilter::Model(model) => {
                state.model = model;
                self.show_model_performance(&mut state).await;
            }
            other => return Err(unsupported(self.page(), &other)),
        }
        Ok(())
    }

    async fn render(&self) -> View {
        let charts = &self.core.deps.charts;
        let state = self.state.lock().await;

        let percent = |value: Option<f64>| value.map_or("0%".to_string(), |v| format!("{}%", format_trimmed(v, 2)));
        let value_card = |class: &str, label: &str, id: &str, value: String| {
            el("div")
                .class(format!("metric-card {}", class).trim_end().to_string())
                .child(el("h6").text(label))
                .child(el("p").class("metric-value").id(id).text(value))
        };

        let prediction_metrics = row(vec![
            col(
                "col-md-6",
                value_card(
                    "alert-warning",
                    "Tasa de Abandono Predicha",
                    "predicted-abandonment-rate",
                    percent(state.prediction.as_ref().map(|p| p.probability)),
                ),
            ),
            col(
                "col-md-6",
                value_card("alert-success", "Precisión del Modelo", "model-accuracy", percent(state.accuracy)),
            ),
        ]);

        let customer_options: Vec<(String, String)> =
            std::iter::once((String::new(), "Seleccionar cliente".to_string()))
                .chain(sample_customers().into_iter().map(|c| (c.id.to_string(), c.name)))
                .collect();
        let selected_customer = state.customer.map(|c| c.to_string()).unwrap_or_default();
        let customer_selector = select_form(
            "/pages/ml/filter",
            "customer",
            "customer-selector",
            &customer_options,
            &selected_customer,
        );

        let recommendations: Element = match (&state.customer, &state.recommendations) {
            (None, _) | (_, None) => info("Seleccione un cliente para ver recomendaciones personalizadas"),
            (Some(_), Some(products)) if products.is_empty() => {
                info("No hay recomendaciones disponibles para este cliente")
            }
            (Some(_), Some(products)) => row(products.iter().map(recommendation_card).collect()),
        };

        let model_options: Vec<(String, String)> = ModelKind::ALL
            .into_iter()
            .map(|kind| (kind.as_str().to_string(), kind.label().to_string()))
            .collect();
        let model_selector = select_form(
            "/pages/ml/filter",
            "model",
            "model-selector",
            &model_options,
            state.model.as_str(),
        );

        let performance = state.performance.as_ref();
        let model_metrics = row(vec![
            col(
                "col-md-4",
                value_card("", "Precisión", "model-precision", percent(performance.map(|p| p.precision))),
            ),
            col("col-md-4", value_card("", "Recall", "model-recall", percent(performance.map(|p| p.recall)))),
            col("col-md-4", value_card("", "F1-Score", "model-f1", percent(performance.map(|p| p.f1)))),
        ]);

        el("div")
            .child(row(vec![
                col(
                    "col-md-6",
                    card("Segmentación de Clientes", None, charts.slot(SEGMENTS_CHART).await),
                ),
                col(
                    "col-md-6",
                    card(
                        "Predicción de Abandono de Carrito",
                        None,
                        el("div").child(prediction_metrics).child(charts.slot(FACTORS_CHART).await),
                    ),
                ),
            ]))
            .child(row(vec![
                col(
                    "col-md-8",
                    card(
                        "Recomendaciones Personalizadas",
                        Some(customer_selector.into()),
                        el("div").id("recommendations-container").child(recommendations),
                    ),
                ),
                col(
                    "col-md-4",
                    card(
                        "Análisis de Sentimientos",
                        None,
                        el("div").child(charts.slot(SENTIMENT_CHART).await).child(
                            el("div")
                                .class("mt-3")
                                .child(el("h6").text("Tendencias de Sentimiento"))
                                .child(charts.slot(SENTIMENT_TRENDS_CHART).await),
                        ),
                    ),
                ),
            ]))
            .child(row(vec![col(
                "col-md-12",
                card(
                    "Rendimiento de Modelos ML",
                    Some(model_selector.into()),
                    el("div")
                        .child(model_metrics)
                        .child(el("div").class("mt-3").child(charts.slot(PERFORMANCE_CHART).await)),
                ),
            )]))
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

    fn recommendations_html(view: &View) -> String {
        view.find_by_id("recommendations-container")
            .map(|e| View::Element(e.clone()).render())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_fallbacks_and_model_performance() {
        let api = Arc::new(StubApi::new());
        let section = MlSection::new(deps(api.clone()));
        section.show_page(&ctx()).await;

        let view = section.render().await;
        assert_eq!(text_of(&view, "predicted-abandonment-rate"), "67.5%");
        assert_eq!(text_of(&view, "model-accuracy"), "83.2%");
        assert_eq!(text_of(&view, "model-precision"), "81.5%");
        assert_eq!(text_of(&view, "model-f1"), "79.9%");
        assert!(recommendations_html(&view).contains("Seleccione un cliente"));

        // No customer selected: no recommendation request
        assert!(!api.targets().iter().any(|t| t.contains("product_recommendations")));
        assert!(api.targets().contains(&"/api/ml/cart_abandonment_prediction?session_id=current".to_string()));

        let charts = &section.core.deps.charts;
        assert_eq!(charts.get(SENTIMENT_CHART).await.unwrap().spec.kind(), "donut");
        assert_eq!(charts.get(SENTIMENT_TRENDS_CHART).await.unwrap().spec.point_count(), 18);
        assert_eq!(charts.get(SEGMENTS_CHART).await.unwrap().spec.point_count(), 5);
    }

    #[tokio::test]
    async fn test_model_switch_recreates_performance_chart() {
        let section = MlSection::new(deps(Arc::new(StubApi::new())));
        section.show_page(&ctx()).await;
        let before = section.core.deps.charts.get(PERFORMANCE_CHART).await.unwrap().instance;

        section
            .apply_filter(SectionFilter::Model(ModelKind::Segment), &ctx())
            .await
            .unwrap();

        let after = section.core.deps.charts.get(PERFORMANCE_CHART).await.unwrap();
        assert_ne!(before, after.instance);
        assert_eq!(text_of(&section.render().await, "model-precision"), "85.2%");
    }

    #[tokio::test]
    async fn test_customer_selection_loads_recommendations() {
        let api = Arc::new(StubApi::new().with(
            "/api/ml/product_recommendations?customer_id=2",
            json!([{"id": 7, "name": "Teclado", "category": "Accesorios", "price": 45.5, "score": 91}]),
        ));
        let section = MlSection::new(deps(api));
        section.show_page(&ctx()).await;

        section.apply_filter(SectionFilter::Customer(Some(2)), &ctx()).await.unwrap();
        let html = recommendations_html(&section.render().await);
        assert!(html.contains("Teclado"));
        assert!(html.contains("$45.50"));
        assert!(html.contains("91% match"));

        section.apply_filter(SectionFilter::Customer(Some(3)), &ctx()).await.unwrap();
        let html = recommendations_html(&section.render().await);
        assert!(html.contains("Cargador Inalámbrico"));
    }

    #[tokio::test]
    async fn test_empty_recommendations_message() {
        let api = Arc::new(StubApi::new().with("/api/ml/product_recommendations", json!([])));
        let section = MlSection::new(deps(api));
        section.apply_filter(SectionFilter::Customer(Some(1)), &ctx()).await.unwrap();
        assert!(recommendations_html(&section.render().await)
            .contains("No hay recomendaciones disponibles para este cliente"));
    }

    #[test]
    fn test_every_model_has_six_months() {
        for kind in ModelKind::ALL {
            assert_eq!(sample_model_performance(kind).history.len(), 6);
        }
    }
}
