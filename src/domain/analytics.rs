// Response shapes of the analytics backend
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct InvalidOption {
    pub kind: &'static str,
    pub value: String,
}

impl InvalidOption {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

// Dashboard

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_sales: f64,
    pub conversion_rate: f64,
    pub total_revenue: f64,
    pub available_stock: f64,
    #[serde(default)]
    pub top_products: Vec<TopProduct>,
    #[serde(default)]
    pub recent_activity: Vec<Activity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopProduct {
    pub name: String,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub icon: String,
    pub text: String,
    pub time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesTrend {
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendInterval {
    #[default]
    Day,
    Week,
    Month,
}

impl TrendInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendInterval::Day => "day",
            TrendInterval::Week => "week",
            TrendInterval::Month => "month",
        }
    }
}

impl FromStr for TrendInterval {
    type Err = InvalidOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(TrendInterval::Day),
            "week" => Ok(TrendInterval::Week),
            "month" => Ok(TrendInterval::Month),
            other => Err(InvalidOption::new("interval", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationHeatmap {
    #[serde(default)]
    pub locations: Vec<HeatPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatPoint {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

// Customer behavior

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartAbandonment {
    pub rate: f64,
    pub avg_time: f64,
    #[serde(default)]
    pub timeline: AbandonmentTimeline,
    #[serde(default)]
    pub top_abandoned_products: Vec<AbandonedProduct>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AbandonmentTimeline {
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub rates: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbandonedProduct {
    pub product_name: String,
    pub count: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Demographics {
    #[serde(default)]
    pub age: Vec<AgeGroup>,
    #[serde(default)]
    pub gender: Vec<GenderGroup>,
    #[serde(default)]
    pub location: Vec<LocationGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeGroup {
    pub group: String,
    pub count: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenderGroup {
    pub gender: String,
    pub count: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationGroup {
    pub location: String,
    pub count: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DemographicView {
    #[default]
    Age,
    Gender,
    Location,
}

impl DemographicView {
    pub fn as_str(&self) -> &'static str {
        match self {
            DemographicView::Age => "age",
            DemographicView::Gender => "gender",
            DemographicView::Location => "location",
        }
    }
}

impl FromStr for DemographicView {
    type Err = InvalidOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "age" => Ok(DemographicView::Age),
            "gender" => Ok(DemographicView::Gender),
            "location" => Ok(DemographicView::Location),
            other => Err(InvalidOption::new("demographic view", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PurchasePatterns {
    #[serde(default)]
    pub related_products: Vec<ProductPair>,
    #[serde(default)]
    pub frequency: PurchaseFrequency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPair {
    pub product_pair: String,
    pub frequency: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PurchaseFrequency {
    #[serde(default)]
    pub periods: Vec<String>,
    #[serde(default)]
    pub counts: Vec<f64>,
}

// Reviews

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positivo",
            Sentiment::Neutral => "Neutro",
            Sentiment::Negative => "Negativo",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            Sentiment::Positive => "text-success",
            Sentiment::Neutral => "text-secondary",
            Sentiment::Negative => "text-danger",
        }
    }
}

impl FromStr for Sentiment {
    type Err = InvalidOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(Sentiment::Positive),
            "neutral" => Ok(Sentiment::Neutral),
            "negative" => Ok(Sentiment::Negative),
            other => Err(InvalidOption::new("sentiment", other)),
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review table filter; `None` shows every sentiment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentimentFilter(pub Option<Sentiment>);

impl SentimentFilter {
    pub fn matches(&self, sentiment: Sentiment) -> bool {
        self.0.is_none_or(|s| s == sentiment)
    }

    pub fn as_str(&self) -> &'static str {
        self.0.map(|s| s.as_str()).unwrap_or("all")
    }
}

impl FromStr for SentimentFilter {
    type Err = InvalidOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "all" => Ok(SentimentFilter(None)),
            other => other.parse().map(|s| SentimentFilter(Some(s))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentBreakdown {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
    #[serde(default)]
    pub trends: Vec<SentimentTrend>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentTrend {
    pub period: String,
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewScores {
    pub average: f64,
    #[serde(default)]
    pub scores: Vec<ProductScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductScore {
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub score: f64,
}

impl ProductScore {
    pub fn label(&self) -> &str {
        self.product_name
            .as_deref()
            .or(self.category.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewTopics {
    #[serde(default)]
    pub topics: Vec<Topic>,
    #[serde(default)]
    pub keywords: Vec<Keyword>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub word: String,
    pub sentiment: Sentiment,
    pub frequency: f64,
}

impl Keyword {
    /// Cloud font size in pixels
    pub fn font_size(&self) -> f64 {
        12.0 + self.frequency * 5.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecentReviews {
    #[serde(default)]
    pub reviews: Vec<Review>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub product_name: String,
    pub score: f64,
    pub sentiment: Sentiment,
    pub content: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    pub id: serde_json::Value,
    pub name: String,
}

impl ProductOption {
    /// Option value as sent back in the `product_id` query parameter
    pub fn value(&self) -> String {
        match &self.id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewProducts {
    #[serde(default)]
    pub products: Vec<ProductOption>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewCategories {
    #[serde(default)]
    pub categories: Vec<String>,
}

// Machine learning

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSegment {
    pub name: String,
    pub count: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbandonmentPrediction {
    pub prediction: PredictionScore,
    pub model_metrics: ModelMetrics,
    #[serde(default)]
    pub factors: Vec<Factor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionScore {
    pub probability: f64,
    #[serde(default)]
    pub is_likely_to_abandon: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub accuracy: f64,
    #[serde(default)]
    pub precision: f64,
    #[serde(default)]
    pub recall: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub name: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: u32,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModelKind {
    #[default]
    All,
    Segment,
    Abandonment,
    Recommendation,
    Sentiment,
}

impl ModelKind {
    pub const ALL: [ModelKind; 5] = [
        ModelKind::All,
        ModelKind::Segment,
        ModelKind::Abandonment,
        ModelKind::Recommendation,
        ModelKind::Sentiment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::All => "all",
            ModelKind::Segment => "segment",
            ModelKind::Abandonment => "abandonment",
            ModelKind::Recommendation => "recommendation",
            ModelKind::Sentiment => "sentiment",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ModelKind::All => "Todos los modelos",
            ModelKind::Segment => "Segmentación",
            ModelKind::Abandonment => "Abandono de carrito",
            ModelKind::Recommendation => "Recomendaciones",
            ModelKind::Sentiment => "Sentimiento",
        }
    }

    /// Unknown model names select the aggregate view
    pub fn parse_or_all(s: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPerformance {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub history: Vec<PerformancePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformancePoint {
    pub date: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

// Inventory

/// Whole numbers are written back as integers, the way the backend sent them
fn serialize_quantity<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockItem {
    pub product_id: serde_json::Value,
    pub product_name: String,
    pub category: String,
    #[serde(alias = "stock", serialize_with = "serialize_quantity")]
    pub stock_level: f64,
    #[serde(default, serialize_with = "serialize_quantity")]
    pub threshold: f64,
    #[serde(default, serialize_with = "serialize_quantity")]
    pub price: f64,
    #[serde(default, serialize_with = "serialize_quantity")]
    pub discount: f64,
    #[serde(default)]
    pub supplier_name: String,
    #[serde(default)]
    pub supplier_id: String,
}

impl StockItem {
    pub fn product_id_text(&self) -> String {
        match &self.product_id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_below_threshold(&self) -> bool {
        self.stock_level < self.threshold
    }

    /// Case-insensitive match on name or category, substring match on id
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.product_name.to_lowercase().contains(&term)
            || self.category.to_lowercase().contains(&term)
            || self.product_id_text().contains(&term)
    }
}

/// `/api/inventory/stock` answers either a bare list or a paged envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StockListing {
    Items(Vec<StockItem>),
    Paged { items: Vec<StockItem>, total: usize },
}

impl StockListing {
    pub fn into_items(self) -> Vec<StockItem> {
        match self {
            StockListing::Items(items) => items,
            StockListing::Paged { items, .. } => items,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockCategory {
    Electronics,
    Clothing,
    Home,
    Beauty,
}

impl StockCategory {
    pub const ALL: [StockCategory; 4] = [
        StockCategory::Electronics,
        StockCategory::Clothing,
        StockCategory::Home,
        StockCategory::Beauty,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StockCategory::Electronics => "electronics",
            StockCategory::Clothing => "clothing",
            StockCategory::Home => "home",
            StockCategory::Beauty => "beauty",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StockCategory::Electronics => "Electrónica",
            StockCategory::Clothing => "Ropa",
            StockCategory::Home => "Hogar",
            StockCategory::Beauty => "Belleza",
        }
    }
}

impl FromStr for StockCategory {
    type Err = InvalidOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| InvalidOption::new("category", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockAlert {
    pub product_id: serde_json::Value,
    pub product_name: String,
    pub category: String,
    pub stock_level: f64,
}

impl StockAlert {
    pub fn is_critical(&self) -> bool {
        self.stock_level < 5.0
    }

    pub fn product_id_text(&self) -> String {
        match &self.product_id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupplierPerformance {
    #[serde(default)]
    pub delivery_times: Vec<f64>,
    #[serde(default)]
    pub quality_scores: Vec<f64>,
    #[serde(default)]
    pub completeness: Vec<f64>,
    #[serde(default)]
    pub months: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscountImpact {
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub sales: Vec<f64>,
    #[serde(default)]
    pub discounts: Vec<f64>,
}

/// Static option used by the supplier and product selectors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedOption {
    pub id: &'static str,
    pub name: &'static str,
}
