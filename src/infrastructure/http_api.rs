// Analytics backend over HTTP
use crate::application::analytics_api::{encode_target, AnalyticsApi, ApiError, ApiRequest, Method};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpAnalyticsApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAnalyticsApi {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AnalyticsApi for HttpAnalyticsApi {
    async fn send(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        let url = self.url_for(&request.path, &request.query);
        let builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let response = builder
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ApiError::Network {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                url,
                status: status.as_u16(),
            });
        }

        response.json::<Value>().await.map_err(|e| ApiError::Decode {
            url,
            message: e.to_string(),
        })
    }

    fn url_for(&self, path: &str, query: &[(String, String)]) -> String {
        format!("{}{}", self.base_url, encode_target(path, query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn api(base_url: &str) -> HttpAnalyticsApi {
        HttpAnalyticsApi::new(base_url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_get_decodes_json() {
        let router = Router::new().route(
            "/api/inventory/alerts",
            get(|| async {
                Json(json!([{ "product_id": 7, "product_name": "Laptop Ultra", "category": "electronics", "stock_level": 3 }]))
            }),
        );
        let api = api(&serve(router).await);

        let alerts = api.inventory_alerts().await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].is_critical());
    }

    #[tokio::test]
    async fn test_post_sends_body() {
        let router = Router::new().route(
            "/api/users/login",
            post(|Json(body): Json<Value>| async move {
                let ok = body["username"] == "ana" && body["password"] == "pw";
                Json(json!({ "success": ok }))
            }),
        );
        let api = api(&serve(router).await);

        assert!(api.login("ana", "pw").await.unwrap().success);
        assert!(!api.login("ana", "nope").await.unwrap().success);
    }

    #[tokio::test]
    async fn test_non_2xx_is_error() {
        let router = Router::new().route(
            "/api/dashboard/location_heatmap",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let api = api(&serve(router).await);

        let err = api.location_heatmap().await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = api(&base_url).customer_segments().await.unwrap_err();
        assert!(matches!(err, ApiError::Network { .. }));
    }

    #[test]
    fn test_url_for_joins_base() {
        let api = api("http://localhost:5000/");
        assert_eq!(
            api.url_for("/api/ml/product_recommendations", &[("customer_id".to_string(), "3".to_string())]),
            "http://localhost:5000/api/ml/product_recommendations?customer_id=3"
        );
    }
}
