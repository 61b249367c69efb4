// Reviews section - sentiment, scores, topics and the recent review table
use crate::application::chart_registry::RenderPolicy;
use crate::application::section::{
    fetch_or_fallback, unsupported, FilterError, LoadContext, RequestGenerations, SectionController,
    SectionCore, SectionDeps, SectionFilter, Ticket,
};
use crate::domain::analytics::{
    Keyword, ProductOption, ProductScore, RecentReviews, Review, ReviewScores, ReviewTopics, Sentiment,
    SentimentBreakdown, SentimentFilter, Topic,
};
use crate::domain::chart::{Axis, BarChart, ChartSpec, LineChart, Palette, Series};
use crate::domain::components::{card, col, message_row, row, select_form, stars, table};
use crate::domain::format::{format_date, format_fixed, truncate, DateStyle};
use crate::domain::page::Page;
use crate::domain::view::{el, Element, View};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Mutex;

pub const SENTIMENT_CHART: &str = "sentiment-chart";
pub const SCORES_CHART: &str = "scores-chart";
pub const TOPICS_CHART: &str = "topics-chart";

const SENTIMENT: &str = "sentiment";
const SCORES: &str = "scores";
const TOPICS: &str = "topics";
const RECENT: &str = "recent";

const SENTIMENT_COLORS: [&str; 3] = ["#4caf50", "#9e9e9e", "#f44336"];
const REVIEW_COLUMNS: [&str; 5] = ["Producto", "Puntaje", "Comentario", "Sentimiento", "Fecha"];
const CONTENT_PREVIEW: usize = 100;

pub fn sentiment_chart(data: &SentimentBreakdown) -> ChartSpec {
    ChartSpec::Bar(BarChart {
        categories: ["Positivo", "Neutro", "Negativo"].map(String::from).to_vec(),
        series: vec![Series::new("Porcentaje", vec![data.positive, data.neutral, data.negative])],
        distributed: true,
        colors: Palette::fixed(&SENTIMENT_COLORS),
        y_axis: Axis {
            max: Some(100.0),
            ..Axis::default()
        },
        ..BarChart::default()
    })
}

pub fn scores_chart(scores: &[ProductScore]) -> ChartSpec {
    ChartSpec::Line(LineChart {
        categories: scores.iter().map(|s| s.label().to_string()).collect(),
        series: vec![Series::new("Puntaje promedio", scores.iter().map(|s| s.score).collect())],
        colors: Palette::fixed(&["#ffc107"]),
        y_axis: Axis::range(0.0, 5.0),
        ..LineChart::default()
    })
}

pub fn topics_chart(topics: &[Topic]) -> ChartSpec {
    let series = |name: &str, pick: fn(&Topic) -> f64| Series::new(name, topics.iter().map(pick).collect());
    ChartSpec::Bar(BarChart {
        categories: topics.iter().map(|t| t.name.clone()).collect(),
        series: vec![
            series("Menciones positivas", |t| t.positive),
            series("Menciones neutras", |t| t.neutral),
            series("Menciones negativas", |t| t.negative),
        ],
        stacked: true,
        colors: Palette::fixed(&SENTIMENT_COLORS),
        ..BarChart::default()
    })
}

/// Keyword cloud sized by frequency and tinted by sentiment
pub fn keyword_cloud(keywords: &[Keyword]) -> Element {
    el("div").id("keywords-cloud").class("chart-container").children(keywords.iter().map(|keyword| {
        el("span")
            .class(format!("keyword-item keyword-{}", keyword.sentiment))
            .attr("style", format!("font-size: {}px", keyword.font_size()))
            .text(keyword.word.clone())
    }))
}

fn review_row(review: &Review) -> Element {
    el("tr")
        .child(el("td").text(review.product_name.clone()))
        .child(el("td").child(stars(review.score)))
        .child(el("td").text(truncate(&review.content, CONTENT_PREVIEW)))
        .child(
            el("td")
                .class(review.sentiment.css_class())
                .text(review.sentiment.label()),
        )
        .child(el("td").text(format_date(review.at.naive_utc(), DateStyle::DateTime)))
}

pub fn sample_sentiment() -> SentimentBreakdown {
    SentimentBreakdown {
        positive: 65.2,
        neutral: 25.3,
        negative: 9.5,
        trends: Vec::new(),
    }
}

pub fn sample_scores() -> ReviewScores {
    ReviewScores {
        average: 4.2,
        scores: [
            ("Smartphone XYZ", 4.5),
            ("Laptop ABC", 4.2),
            ("Tablet 123", 3.8),
            ("Smartwatch Pro", 4.0),
            ("Auriculares Premium", 4.7),
        ]
        .into_iter()
        .map(|(name, score)| ProductScore {
            product_name: Some(name.to_string()),
            category: None,
            score,
        })
        .collect(),
    }
}

pub fn sample_topics() -> ReviewTopics {
    ReviewTopics {
        topics: [
            ("Calidad", 120.0, 30.0, 15.0),
            ("Precio", 80.0, 40.0, 50.0),
            ("Batería", 60.0, 35.0, 45.0),
            ("Servicio", 90.0, 25.0, 20.0),
            ("Envío", 70.0, 30.0, 25.0),
        ]
        .into_iter()
        .map(|(name, positive, neutral, negative)| Topic {
            name: name.to_string(),
            positive,
            neutral,
            negative,
        })
        .collect(),
        keywords: [
            ("excelente", Sentiment::Positive, 12.0),
            ("bueno", Sentiment::Positive, 10.0),
            ("calidad", Sentiment::Positive, 8.0),
            ("precio", Sentiment::Neutral, 7.0),
            ("rápido", Sentiment::Positive, 5.0),
            ("defectuoso", Sentiment::Negative, 4.0),
            ("lento", Sentiment::Negative, 3.0),
            ("caro", Sentiment::Negative, 6.0),
            ("duradero", Sentiment::Positive, 4.0),
            ("normal", Sentiment::Neutral, 3.0),
        ]
        .into_iter()
        .map(|(word, sentiment, frequency)| Keyword {
            word: word.to_string(),
            sentiment,
            frequency,
        })
        .collect(),
    }
}

/// Five reviews spread over the last three hours, narrowed to `filter`
pub fn sample_reviews(now: DateTime<Utc>, filter: SentimentFilter) -> RecentReviews {
    let reviews = [
        (
            "Smartphone XYZ",
            4.5,
            "Excelente teléfono, muy rápido y con una batería que dura todo el día. La cámara es increíble.",
            Sentiment::Positive,
            30,
        ),
        (
            "Laptop ABC",
            2.0,
            "Muy lenta y se calienta demasiado. No recomiendo esta compra.",
            Sentiment::Negative,
            60,
        ),
        (
            "Tablet 123",
            3.5,
            "Funciona bien para el uso diario, pero nada del otro mundo.",
            Sentiment::Neutral,
            90,
        ),
        (
            "Auriculares Premium",
            5.0,
            "¡Increíble calidad de sonido! Sin duda los mejores auriculares que he tenido.",
            Sentiment::Positive,
            120,
        ),
        (
            "Smartwatch Pro",
            1.5,
            "Pésima duración de batería y el GPS nunca funciona bien. Una completa pérdida de dinero.",
            Sentiment::Negative,
            180,
        ),
    ]
    .into_iter()
    .filter(|(_, _, _, sentiment, _)| filter.matches(*sentiment))
    .map(|(product, score, content, sentiment, minutes_ago)| Review {
        product_name: product.to_string(),
        score,
        sentiment,
        content: content.to_string(),
        at: now - Duration::minutes(minutes_ago),
    })
    .collect();
    RecentReviews { reviews }
}

enum Update {
    Sentiment(Ticket, SentimentBreakdown),
    Scores(Ticket, ReviewScores),
    Topics(Ticket, ReviewTopics),
    Recent(Ticket, RecentReviews),
}

#[derive(Default)]
struct ReviewsState {
    generations: RequestGenerations,
    product: Option<String>,
    category: Option<String>,
    sentiment_filter: SentimentFilter,
    product_options: Vec<ProductOption>,
    category_options: Vec<String>,
    breakdown: Option<SentimentBreakdown>,
    average: Option<f64>,
    keywords: Vec<Keyword>,
    reviews: Option<Vec<Review>>,
}

pub struct ReviewsSection {
    core: SectionCore,
    state: Mutex<ReviewsState>,
}

impl ReviewsSection {
    pub fn new(deps: SectionDeps) -> Self {
        Self {
            core: SectionCore::new(deps),
            state: Mutex::new(ReviewsState::default()),
        }
    }

    fn sentiment_request(&self, ticket: Ticket, product: Option<String>) -> BoxFuture<'_, Update> {
        let api = &self.core.deps.api;
        Box::pin(async move {
            let data =
                fetch_or_fallback("review sentiment", api.review_sentiment(product.as_deref()), sample_sentiment)
                    .await;
            Update::Sentiment(ticket, data)
        })
    }

    fn scores_request(&self, ticket: Ticket, category: Option<String>) -> BoxFuture<'_, Update> {
        let api = &self.core.deps.api;
        Box::pin(async move {
            let data =
                fetch_or_fallback("review scores", api.review_scores(category.as_deref()), sample_scores).await;
            Update::Scores(ticket, data)
        })
    }

    fn recent_request(&self, ticket: Ticket, filter: SentimentFilter) -> BoxFuture<'_, Update> {
        let api = &self.core.deps.api;
        Box::pin(async move {
            let data = fetch_or_fallback("recent reviews", api.recent_reviews(filter), || {
                sample_reviews(Utc::now(), filter)
            })
            .await;
            Update::Recent(ticket, data)
        })
    }

    async fn apply(&self, update: Update) {
        let charts = &self.core.deps.charts;
        let policy = RenderPolicy::Recreate;
        let mut state = self.state.lock().await;
        match update {
            Update::Sentiment(ticket, data) => {
                if state.generations.accept(&ticket) {
                    charts.render(SENTIMENT_CHART, sentiment_chart(&data), policy).await;
                    state.breakdown = Some(data);
                }
            }
            Update::Scores(ticket, data) => {
                if state.generations.accept(&ticket) {
                    charts.render(SCORES_CHART, scores_chart(&data.scores), policy).await;
                    state.average = Some(data.average);
                }
            }
            Update::Topics(ticket, data) => {
                if state.generations.accept(&ticket) {
                    charts.render(TOPICS_CHART, topics_chart(&data.topics), policy).await;
                    state.keywords = data.keywords;
                }
            }
            Update::Recent(ticket, data) => {
                if state.generations.accept(&ticket) {
                    state.reviews = Some(data.reviews);
                }
            }
        }
    }

    async fn drain(&self, mut pending: FuturesUnordered<BoxFuture<'_, Update>>) {
        while let Some(update) = pending.next().await {
            self.apply(update).await;
        }
    }

    async fn reload_one(&self, request: BoxFuture<'_, Update>) {
        let pending = FuturesUnordered::new();
        pending.push(request);
        self.drain(pending).await;
    }
}

#[async_trait]
impl SectionController for ReviewsSection {
    fn page(&self) -> Page {
        Page::Reviews
    }

    fn core(&self) -> &SectionCore {
        &self.core
    }

    /// Filter options are fetched once; a failure leaves the selectors with
    /// their catch-all entry only
    async fn build(&self) {
        let api = &self.core.deps.api;
        let (products, categories) = tokio::join!(api.review_products(), api.review_categories());
        let mut state = self.state.lock().await;
        match products {
            Ok(products) => state.product_options = products.products,
            Err(e) => tracing::warn!("Review product options unavailable: {}", e),
        }
        match categories {
            Ok(categories) => state.category_options = categories.categories,
            Err(e) => tracing::warn!("Review category options unavailable: {}", e),
        }
    }

    async fn load_data(&self, _ctx: &LoadContext) {
        let (tickets, product, category, filter) = {
            let mut state = self.state.lock().await;
            let tickets = [SENTIMENT, SCORES, TOPICS, RECENT].map(|widget| state.generations.issue(widget));
            (tickets, state.product.clone(), state.category.clone(), state.sentiment_filter)
        };
        let [sentiment, scores, topics, recent] = tickets;

        let api = &self.core.deps.api;
        let pending: FuturesUnordered<BoxFuture<'_, Update>> = FuturesUnordered::new();
        pending.push(self.sentiment_request(sentiment, product));
        pending.push(self.scores_request(scores, category));
        pending.push(Box::pin(async move {
            let data = fetch_or_fallback("review topics", api.review_topics(), sample_topics).await;
            Update::Topics(topics, data)
        }));
        pending.push(self.recent_request(recent, filter));
        self.drain(pending).await;
    }

    async fn apply_filter(&self, filter: SectionFilter, _ctx: &LoadContext) -> Result<(), FilterError> {
        let mut state = self.state.lock().await;
        match filter {
            SectionFilter::ReviewProduct(product) => {
                state.product = product.clone();
                let ticket = state.generations.issue(SENTIMENT);
                drop(state);
                self.reload_one(self.sentiment_request(ticket, product)).await;
            }
            SectionFilter::ReviewCategory(category) => {
                state.category = category.clone();
                let ticket = state.generations.issue(SCORES);
                drop(state);
                self.reload_one(self.scores_request(ticket, category)).await;
            }
            SectionFilter::ReviewSentiment(sentiment) => {
                state.sentiment_filter = sentiment;
                let ticket = state.generations.issue(RECENT);
                drop(state);
                self.reload_one(self.recent_request(ticket, sentiment)).await;
            }
            other => return Err(unsupported(self.page(), &other)),
        }
        Ok(())
    }

    async fn render(&self) -> View {
        let charts = &self.core.deps.charts;
        let state = self.state.lock().await;

        let percent = |pick: fn(&SentimentBreakdown) -> f64| {
            state
                .breakdown
                .as_ref()
                .map_or("0%".to_string(), |b| format!("{}%", format_fixed(pick(b), 1)))
        };
        let sentiment_metric = |class: &str, label: &str, id: &str, value: String| {
            col(
                "col-md-4",
                el("div")
                    .class(format!("metric-card sentiment-{}", class))
                    .child(el("h6").text(label))
                    .child(el("p").class("metric-value").id(id).text(value)),
            )
        };
        let sentiment_metrics = row(vec![
            sentiment_metric("positive", "Positivos", "positive-sentiment", percent(|b| b.positive)),
            sentiment_metric("neutral", "Neutros", "neutral-sentiment", percent(|b| b.neutral)),
            sentiment_metric("negative", "Negativos", "negative-sentiment", percent(|b| b.negative)),
        ]);

        let average = format_fixed(state.average.unwrap_or(0.0), 1);
        let average_metric = el("div")
            .class("metric-card")
            .child(el("h6").text("Promedio General"))
            .child(
                el("p")
                    .class("metric-value")
                    .id("average-score")
                    .text(format!("{} ", average))
                    .child(el("i").class("fas fa-star")),
            );

        let product_options: Vec<(String, String)> = std::iter::once((String::new(), "Todos los productos".to_string()))
            .chain(state.product_options.iter().map(|p| (p.value(), p.name.clone())))
            .collect();
        let category_options: Vec<(String, String)> =
            std::iter::once((String::new(), "Todas las categorías".to_string()))
                .chain(state.category_options.iter().map(|c| (c.clone(), c.clone())))
                .collect();
        let sentiment_options: Vec<(String, String)> = [
            ("all", "Todos los sentimientos"),
            ("positive", "Positivos"),
            ("neutral", "Neutros"),
            ("negative", "Negativos"),
        ]
        .into_iter()
        .map(|(value, label)| (value.to_string(), label.to_string()))
        .collect();

        let action = "/pages/reviews/filter";
        let product_filter = select_form(
            action,
            "product",
            "sentiment-product-filter",
            &product_options,
            state.product.as_deref().unwrap_or_default(),
        );
        let category_filter = select_form(
            action,
            "category",
            "score-category-filter",
            &category_options,
            state.category.as_deref().unwrap_or_default(),
        );
        let sentiment_filter = select_form(
            action,
            "sentiment",
            "review-sentiment-filter",
            &sentiment_options,
            state.sentiment_filter.as_str(),
        );

        let rows = match &state.reviews {
            Some(reviews) if !reviews.is_empty() => reviews.iter().map(review_row).collect(),
            Some(_) => vec![message_row(REVIEW_COLUMNS.len(), "No hay reviews disponibles")],
            None => Vec::new(),
        };

        el("div")
            .child(row(vec![
                col(
                    "col-md-6",
                    card(
                        "Análisis de Sentimiento",
                        Some(product_filter.into()),
                        el("div").child(sentiment_metrics).child(charts.slot(SENTIMENT_CHART).await),
                    ),
                ),
                col(
                    "col-md-6",
                    card(
                        "Puntaje Promedio",
                        Some(category_filter.into()),
                        el("div")
                            .child(row(vec![col("col-md-12", average_metric)]))
                            .child(charts.slot(SCORES_CHART).await),
                    ),
                ),
            ]))
            .child(row(vec![
                col("col-md-8", card("Temas Mencionados", None, charts.slot(TOPICS_CHART).await)),
                col("col-md-4", card("Palabras Clave", None, keyword_cloud(&state.keywords))),
            ]))
            .child(row(vec![col(
                "col-md-12",
                card(
                    "Reviews Recientes",
                    Some(sentiment_filter.into()),
                    table(&REVIEW_COLUMNS, "reviews-table-body", rows),
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
    use std::time::Duration as StdDuration;

    fn table_html(view: &View) -> String {
        view.find_by_id("reviews-table-body")
            .map(|e| View::Element(e.clone()).render())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_fallbacks_render_literal_figures() {
        let section = ReviewsSection::new(deps(Arc::new(StubApi::new())));
        section.show_page(&ctx()).await;

        let view = section.render().await;
        assert_eq!(text_of(&view, "positive-sentiment"), "65.2%");
        assert_eq!(text_of(&view, "neutral-sentiment"), "25.3%");
        assert_eq!(text_of(&view, "negative-sentiment"), "9.5%");
        assert_eq!(text_of(&view, "average-score"), "4.2 ");

        let html = view.render();
        assert!(html.contains("font-size: 72px"));
        assert!(html.contains("keyword-item keyword-negative"));
        assert_eq!(table_html(&view).matches("<tr>").count(), 5);

        let charts = &section.core.deps.charts;
        assert_eq!(charts.get(TOPICS_CHART).await.unwrap().spec.point_count(), 15);
        assert_eq!(charts.get(SCORES_CHART).await.unwrap().policy, RenderPolicy::Recreate);
    }

    #[tokio::test]
    async fn test_filter_options_loaded_once() {
        let api = Arc::new(
            StubApi::new()
                .with("/api/reviews/sentiment?products=true", json!({"products": [{"id": 3, "name": "Tablet 123"}]}))
                .with("/api/reviews/scores?categories=true", json!({"categories": ["Audio"]})),
        );
        let section = ReviewsSection::new(deps(api.clone()));
        section.show_page(&ctx()).await;
        section.show_page(&ctx()).await;

        let option_requests = api
            .targets()
            .iter()
            .filter(|t| t.ends_with("products=true") || t.ends_with("categories=true"))
            .count();
        assert_eq!(option_requests, 2);

        let html = section.render().await.render();
        assert!(html.contains("<option value=\"3\">Tablet 123</option>"));
        assert!(html.contains("<option value=\"Audio\">Audio</option>"));
    }

    #[tokio::test]
    async fn test_concurrent_visit_waits_for_filter_options() {
        let api = Arc::new(
            StubApi::new()
                .with("/api/reviews/sentiment?products=true", json!({"products": [{"id": 3, "name": "Tablet 123"}]}))
                .with("/api/reviews/scores?categories=true", json!({"categories": ["Audio"]})),
        );
        api.delay("/api/reviews/sentiment?products=true", StdDuration::from_millis(200));
        let section = ReviewsSection::new(deps(api.clone()));

        let first_ctx = ctx();
        let second = async {
            tokio::time::sleep(StdDuration::from_millis(10)).await;
            section.show_page(&ctx()).await;
            section.render().await.render()
        };
        let (_, html) = tokio::join!(section.show_page(&first_ctx), second);

        assert!(html.contains("<option value=\"3\">Tablet 123</option>"));
        let option_requests = api.targets().iter().filter(|t| t.ends_with("products=true")).count();
        assert_eq!(option_requests, 1);
        assert_eq!(section.core.lifecycle().load_count, 2);
    }

    #[tokio::test]
    async fn test_sentiment_filter_narrows_fallback_reviews() {
        let section = ReviewsSection::new(deps(Arc::new(StubApi::new())));
        section.show_page(&ctx()).await;
        section
            .apply_filter(SectionFilter::ReviewSentiment(SentimentFilter(Some(Sentiment::Negative))), &ctx())
            .await
            .unwrap();

        let table = table_html(&section.render().await);
        assert_eq!(table.matches("<tr>").count(), 2);
        assert!(table.contains("Laptop ABC"));
        assert!(!table.contains("Tablet 123"));
        assert!(table.contains("text-danger"));
    }

    #[tokio::test]
    async fn test_empty_live_reviews_show_message() {
        let api = Arc::new(StubApi::new().with("/api/reviews/recent", json!({"reviews": []})));
        let section = ReviewsSection::new(deps(api));
        section.show_page(&ctx()).await;
        assert!(table_html(&section.render().await).contains("No hay reviews disponibles"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_review_response_is_discarded() {
        let api = Arc::new(
            StubApi::new()
                .with(
                    "/api/reviews/recent",
                    json!({"reviews": [{
                        "product_name": "Producto Lento", "score": 4, "sentiment": "positive",
                        "content": "Llegó tarde", "at": "2024-01-10T10:00:00Z"
                    }]}),
                )
                .with(
                    "/api/reviews/recent?sentiment=negative",
                    json!({"reviews": [{
                        "product_name": "Producto Rápido", "score": 1, "sentiment": "negative",
                        "content": "Roto", "at": "2024-01-10T11:00:00Z"
                    }]}),
                ),
        );
        api.delay("/api/reviews/recent", StdDuration::from_millis(500));
        api.delay("/api/reviews/recent?sentiment=negative", StdDuration::ZERO);
        let section = ReviewsSection::new(deps(api));

        let filter = async {
            tokio::time::sleep(StdDuration::from_millis(10)).await;
            section
                .apply_filter(SectionFilter::ReviewSentiment(SentimentFilter(Some(Sentiment::Negative))), &ctx())
                .await
        };
        let load_ctx = ctx();
        let (_, filtered) = tokio::join!(section.load_data(&load_ctx), filter);
        filtered.unwrap();

        let table = table_html(&section.render().await);
        assert!(table.contains("Producto Rápido"));
        assert!(!table.contains("Producto Lento"));
    }

    #[test]
    fn test_long_content_is_truncated() {
        let review = Review {
            product_name: "Laptop".to_string(),
            score: 3.0,
            sentiment: Sentiment::Neutral,
            content: "a".repeat(150),
            at: Utc::now(),
        };
        let html = View::from(review_row(&review)).render();
        assert!(html.contains(&format!("{}...", "a".repeat(100))));
        assert!(html.contains("text-secondary"));
    }
}
