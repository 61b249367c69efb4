// Port to the analytics REST backend
use crate::domain::analytics::{
    AbandonmentPrediction, CartAbandonment, CustomerSegment, DashboardSummary, Demographics,
    DiscountImpact, LocationHeatmap, PurchasePatterns, RecentReviews, Recommendation,
    ReviewCategories, ReviewProducts, ReviewScores, ReviewTopics, SalesTrend, SentimentBreakdown,
    SentimentFilter, StockAlert, StockCategory, StockItem, StockListing, SupplierPerformance,
    TrendInterval,
};
use crate::domain::date_range::DateRange;
use crate::domain::session::Session;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },
    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: &str) -> Self {
        Self {
            method: Method::Get,
            path: path.to_string(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: &str, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.to_string(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query.push((name.to_string(), value.into()));
        self
    }

    pub fn range(mut self, range: &DateRange) -> Self {
        self.query.extend(range.query_pairs());
        self
    }

    /// Path plus encoded query string, e.g. `/api/reviews/recent?sentiment=negative`
    pub fn path_and_query(&self) -> String {
        encode_target(&self.path, &self.query)
    }
}

pub fn encode_target(path: &str, query: &[(String, String)]) -> String {
    if query.is_empty() {
        return path.to_string();
    }
    let pairs: Vec<String> = query
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect();
    format!("{}?{}", path, pairs.join("&"))
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(default)]
    pub user: Option<Session>,
}

#[derive(Debug, Clone, Deserialize)]
struct PermissionsResponse {
    #[serde(default)]
    permissions: Vec<String>,
}

fn decode<T: DeserializeOwned>(request: &ApiRequest, value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode {
        url: request.path_and_query(),
        message: e.to_string(),
    })
}

#[async_trait]
pub trait AnalyticsApi: Send + Sync {
    /// Issue one request; any non-2xx answer is an error
    async fn send(&self, request: &ApiRequest) -> Result<Value, ApiError>;

    /// Absolute URL of a backend resource (used for downloads the browser
    /// fetches itself)
    fn url_for(&self, path: &str, query: &[(String, String)]) -> String;

    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let request = ApiRequest::post(
            "/api/users/login",
            json!({ "username": username, "password": password }),
        );
        let value = self.send(&request).await?;
        decode(&request, value)
    }

    async fn permissions(&self, user_id: u64) -> Result<Vec<String>, ApiError> {
        let request = ApiRequest::get("/api/users/permissions").param("user_id", user_id.to_string());
        let value = self.send(&request).await?;
        decode::<PermissionsResponse>(&request, value).map(|r| r.permissions)
    }

    async fn dashboard_summary(&self, range: &DateRange) -> Result<DashboardSummary, ApiError> {
        let request = ApiRequest::get("/api/dashboard/summary").range(range);
        let value = self.send(&request).await?;
        decode(&request, value)
    }

    async fn sales_trends(
        &self,
        range: &DateRange,
        interval: TrendInterval,
    ) -> Result<SalesTrend, ApiError> {
        let request = ApiRequest::get("/api/dashboard/sales_trends")
            .range(range)
            .param("interval", interval.as_str());
        let value = self.send(&request).await?;
        decode(&request, value)
    }

    async fn location_heatmap(&self) -> Result<LocationHeatmap, ApiError> {
        let request = ApiRequest::get("/api/dashboard/location_heatmap");
        let value = self.send(&request).await?;
        decode(&request, value)
    }

    async fn cart_abandonment(&self) -> Result<CartAbandonment, ApiError> {
        let request = ApiRequest::get("/api/customer/cart_abandonment");
        let value = self.send(&request).await?;
        decode(&request, value)
    }

    async fn demographics(&self) -> Result<Demographics, ApiError> {
        let request = ApiRequest::get("/api/customer/demographics");
        let value = self.send(&request).await?;
        decode(&request, value)
    }

    async fn purchase_patterns(&self) -> Result<PurchasePatterns, ApiError> {
        let request = ApiRequest::get("/api/customer/purchase_patterns");
        let value = self.send(&request).await?;
        decode(&request, value)
    }

    async fn review_products(&self) -> Result<ReviewProducts, ApiError> {
        let request = ApiRequest::get("/api/reviews/sentiment").param("products", "true");
        let value = self.send(&request).await?;
        decode(&request, value)
    }

    async fn review_categories(&self) -> Result<ReviewCategories, ApiError> {
        let request = ApiRequest::get("/api/reviews/scores").param("categories", "true");
        let value = self.send(&request).await?;
        decode(&request, value)
    }

    async fn review_sentiment(&self, product_id: Option<&str>) -> Result<SentimentBreakdown, ApiError> {
        let mut request = ApiRequest::get("/api/reviews/sentiment");
        if let Some(id) = product_id {
            request = request.param("product_id", id);
        }
        let value = self.send(&request).await?;
        decode(&request, value)
    }

    async fn review_scores(&self, category: Option<&str>) -> Result<ReviewScores, ApiError> {
        let mut request = ApiRequest::get("/api/reviews/scores");
        if let Some(category) = category {
            request = request.param("category", category);
        }
        let value = self.send(&request).await?;
        decode(&request, value)
    }

    async fn review_topics(&self) -> Result<ReviewTopics, ApiError> {
        let request = ApiRequest::get("/api/reviews/topics");
        let value = self.send(&request).await?;
        decode(&request, value)
    }

    async fn recent_reviews(&self, filter: SentimentFilter) -> Result<RecentReviews, ApiError> {
        let mut request = ApiRequest::get("/api/reviews/recent");
        if let Some(sentiment) = filter.0 {
            request = request.param("sentiment", sentiment.as_str());
        }
        let value = self.send(&request).await?;
        decode(&request, value)
    }

    async fn customer_segments(&self) -> Result<Vec<CustomerSegment>, ApiError> {
        let request = ApiRequest::get("/api/ml/customer_segments");
        let value = self.send(&request).await?;
        decode(&request, value)
    }

    async fn abandonment_prediction(&self, session_id: &str) -> Result<AbandonmentPrediction, ApiError> {
        let request = ApiRequest::get("/api/ml/cart_abandonment_prediction").param("session_id", session_id);
        let value = self.send(&request).await?;
        decode(&request, value)
    }

    async fn product_recommendations(&self, customer_id: u32) -> Result<Vec<Recommendation>, ApiError> {
        let request = ApiRequest::get("/api/ml/product_recommendations")
            .param("customer_id", customer_id.to_string());
        let value = self.send(&request).await?;
        decode(&request, value)
    }

    async fn inventory_stock(&self, category: Option<StockCategory>) -> Result<Vec<StockItem>, ApiError> {
        let mut request = ApiRequest::get("/api/inventory/stock");
        if let Some(category) = category {
            request = request.param("category", category.as_str());
        }
        let value = self.send(&request).await?;
        decode::<StockListing>(&request, value).map(StockListing::into_items)
    }

    async fn inventory_alerts(&self) -> Result<Vec<StockAlert>, ApiError> {
        let request = ApiRequest::get("/api/inventory/alerts");
        let value = self.send(&request).await?;
        decode(&request, value)
    }

    async fn supplier_performance(&self, supplier_id: &str) -> Result<SupplierPerformance, ApiError> {
        let request = ApiRequest::get("/api/inventory/supplier_performance").param("supplier_id", supplier_id);
        let value = self.send(&request).await?;
        decode(&request, value)
    }

    async fn discount_impact(&self, product_id: &str) -> Result<DiscountImpact, ApiError> {
        let request = ApiRequest::get("/api/inventory/discount_impact").param("product_id", product_id);
        let value = self.send(&request).await?;
        decode(&request, value)
    }
}

#[cfg(test)]
pub mod testing {
    //! Canned-response backend for tests
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Answers from canned JSON keyed by `path?query` or bare path. Unknown
    /// targets behave like an unreachable backend.
    #[derive(Default)]
    pub struct StubApi {
        responses: Mutex<HashMap<String, Value>>,
        delays: Mutex<HashMap<String, Duration>>,
        requests: Mutex<Vec<ApiRequest>>,
    }

    impl StubApi {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(self, target: &str, body: Value) -> Self {
            self.respond(target, body);
            self
        }

        pub fn respond(&self, target: &str, body: Value) {
            self.responses.lock().unwrap().insert(target.to_string(), body);
        }

        pub fn delay(&self, target: &str, delay: Duration) {
            self.delays.lock().unwrap().insert(target.to_string(), delay);
        }

        pub fn requests(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn targets(&self) -> Vec<String> {
            self.requests().iter().map(ApiRequest::path_and_query).collect()
        }

        fn lookup<T: Clone>(map: &Mutex<HashMap<String, T>>, request: &ApiRequest) -> Option<T> {
            let map = map.lock().unwrap();
            map.get(&request.path_and_query())
                .or_else(|| map.get(&request.path))
                .cloned()
        }
    }

    #[async_trait]
    impl AnalyticsApi for StubApi {
        async fn send(&self, request: &ApiRequest) -> Result<Value, ApiError> {
            self.requests.lock().unwrap().push(request.clone());
            let response = Self::lookup(&self.responses, request);
            if let Some(delay) = Self::lookup(&self.delays, request) {
                tokio::time::sleep(delay).await;
            }
            response.ok_or_else(|| ApiError::Network {
                url: request.path_and_query(),
                message: "connection refused".to_string(),
            })
        }

        fn url_for(&self, path: &str, query: &[(String, String)]) -> String {
            format!("http://backend{}", encode_target(path, query))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::StubApi;
    use super::*;

    #[test]
    fn test_path_and_query_encoding() {
        let request = ApiRequest::get("/api/reviews/scores").param("category", "Audio & Video");
        assert_eq!(request.path_and_query(), "/api/reviews/scores?category=Audio%20%26%20Video");
        assert_eq!(ApiRequest::get("/api/ml/customer_segments").path_and_query(), "/api/ml/customer_segments");
    }

    #[tokio::test]
    async fn test_typed_calls_decode_and_record() {
        let api = StubApi::new().with(
            "/api/users/permissions?user_id=7",
            json!({ "permissions": ["view_dashboard"] }),
        );
        let permissions = api.permissions(7).await.unwrap();
        assert_eq!(permissions, vec!["view_dashboard".to_string()]);
        assert_eq!(api.targets(), vec!["/api/users/permissions?user_id=7".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_target_is_network_error() {
        let api = StubApi::new();
        let err = api.location_heatmap().await.unwrap_err();
        assert!(matches!(err, ApiError::Network { .. }));
    }

    #[tokio::test]
    async fn test_bad_shape_is_decode_error() {
        let api = StubApi::new().with("/api/inventory/alerts", json!({ "unexpected": true }));
        let err = api.inventory_alerts().await.unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }
}
