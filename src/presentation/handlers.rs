// HTTP request handlers
use crate::application::app_shell::{NavigationError, ShellError};
use crate::application::sections::settings::{ChartPreferences, ChartType, ReportFormat, ReportKind};
use crate::domain::page::Page;
use crate::domain::theme::ThemePreference;
use crate::infrastructure::csv_export::{export_to_csv, CsvError};
use crate::presentation::app_state::AppState;
use crate::presentation::layout::{render_document, stylesheet};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct DateForm {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Deserialize)]
pub struct ChartSettingsForm {
    pub default_chart_type: String,
    /// Checkbox: present only when ticked
    pub enable_animations: Option<String>,
}

#[derive(Deserialize)]
pub struct ReportQuery {
    #[serde(rename = "type")]
    pub kind: String,
    pub format: String,
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/", get(index))
        .route("/assets/css/:name", get(styles))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/pages/:page", get(show_page))
        .route("/pages/:page/filter", post(apply_filter))
        .route("/filters/date", post(apply_date_filter))
        .route("/theme/toggle", post(toggle_theme))
        .route("/theme/:theme", post(set_theme))
        .route("/sidebar/toggle", post(toggle_sidebar))
        .route("/settings/charts", post(save_chart_settings))
        .route("/notifications/:id/close", post(close_notification))
        .route("/inventory/restock/:product_id", post(restock))
        .route("/inventory/export.csv", get(export_inventory))
        .route("/charts/:container", get(chart_options))
        .route("/reports/export", get(export_report))
        .with_state(state)
}

async fn document(state: &AppState, status: StatusCode, alert: Option<&str>) -> Response {
    match render_document(&state.shell.render().await, alert) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Failed to render page: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn back_home() -> Response {
    Redirect::to("/").into_response()
}

async fn navigation_failure(state: &AppState, error: NavigationError) -> Response {
    match error {
        NavigationError::NotAuthenticated => back_home(),
        NavigationError::Forbidden(_) => document(state, StatusCode::FORBIDDEN, None).await,
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn styles(Path(name): Path<String>) -> Response {
    match stylesheet(&name) {
        Some(css) => ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], css).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Renders the shell and the active page
pub async fn index(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    // Client hint sent by browsers that were asked for it
    if let Some(scheme) = headers
        .get("sec-ch-prefers-color-scheme")
        .and_then(|v| v.to_str().ok())
    {
        state.shell.set_system_preference(scheme == "dark").await;
    }
    document(&state, StatusCode::OK, None).await
}

pub async fn login(State(state): State<Arc<AppState>>, Form(form): Form<LoginForm>) -> Response {
    if let Err(e) = state.shell.login(&form.username, &form.password).await {
        tracing::info!("Login for {} rejected: {}", form.username, e);
    }
    back_home()
}

pub async fn logout(State(state): State<Arc<AppState>>) -> Response {
    state.shell.logout().await;
    back_home()
}

pub async fn show_page(Path(page): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    let Ok(page) = page.parse::<Page>() else {
        return (StatusCode::NOT_FOUND, "unknown page").into_response();
    };
    match state.shell.navigate_to_page(page).await {
        Ok(_) => document(&state, StatusCode::OK, None).await,
        Err(e) => navigation_failure(&state, e).await,
    }
}

pub async fn apply_filter(
    Path(page): Path<String>,
    State(state): State<Arc<AppState>>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    let Ok(page) = page.parse::<Page>() else {
        return (StatusCode::NOT_FOUND, "unknown page").into_response();
    };
    let Some((field, value)) = fields.into_iter().next() else {
        return (StatusCode::UNPROCESSABLE_ENTITY, "missing filter").into_response();
    };
    match state.shell.apply_filter(page, &field, &value).await {
        Ok(()) => back_home(),
        Err(ShellError::Navigation(e)) => navigation_failure(&state, e).await,
        Err(ShellError::Filter(e)) => {
            tracing::warn!("Rejected filter {}={} on {}: {}", field, value, page, e);
            (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response()
        }
    }
}

pub async fn apply_date_filter(State(state): State<Arc<AppState>>, Form(form): Form<DateForm>) -> Response {
    if state.shell.current_user().await.is_none() {
        return back_home();
    }
    match state
        .shell
        .apply_date_filter(form.start_date.as_deref(), form.end_date.as_deref())
        .await
    {
        Ok(_) => back_home(),
        Err(e) => {
            let message = e.to_string();
            document(&state, StatusCode::UNPROCESSABLE_ENTITY, Some(&message)).await
        }
    }
}

pub async fn toggle_theme(State(state): State<Arc<AppState>>) -> Response {
    state.shell.toggle_dark_mode().await;
    back_home()
}

pub async fn set_theme(Path(theme): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    match theme.parse::<ThemePreference>() {
        Ok(theme) => {
            state.shell.set_theme(theme).await;
            back_home()
        }
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    }
}

pub async fn toggle_sidebar(State(state): State<Arc<AppState>>) -> Response {
    state.shell.toggle_sidebar().await;
    back_home()
}

pub async fn save_chart_settings(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ChartSettingsForm>,
) -> Response {
    let default_chart_type = match form.default_chart_type.parse::<ChartType>() {
        Ok(chart_type) => chart_type,
        Err(e) => return (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response(),
    };
    let preferences = ChartPreferences {
        default_chart_type,
        enable_animations: form.enable_animations.is_some(),
    };
    match state.shell.save_chart_preferences(preferences).await {
        Ok(()) => back_home(),
        Err(e) => navigation_failure(&state, e).await,
    }
}

pub async fn close_notification(Path(id): Path<u64>, State(state): State<Arc<AppState>>) -> Response {
    state.shell.close_notification(id).await;
    back_home()
}

pub async fn restock(Path(product_id): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    match state.shell.restock(&product_id).await {
        Ok(_) => back_home(),
        Err(e) => navigation_failure(&state, e).await,
    }
}

/// Current themed options of one chart
pub async fn chart_options(Path(container): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    match state.shell.chart_options(&container).await {
        Some(options) => Json(options).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub async fn export_report(Query(query): Query<ReportQuery>, State(state): State<Arc<AppState>>) -> Response {
    let (kind, format) = match (query.kind.parse::<ReportKind>(), query.format.parse::<ReportFormat>()) {
        (Ok(kind), Ok(format)) => (kind, format),
        (Err(e), _) | (_, Err(e)) => return (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response(),
    };
    match state.shell.report_url(kind, format).await {
        Ok(url) => Redirect::temporary(&url).into_response(),
        Err(e) => navigation_failure(&state, e).await,
    }
}

/// Downloads the inventory list currently held by the inventory page
pub async fn export_inventory(State(state): State<Arc<AppState>>) -> Response {
    let items = match state.shell.inventory_items().await {
        Ok(items) => items,
        Err(e) => return navigation_failure(&state, e).await,
    };
    let rows: Vec<serde_json::Value> = match items.iter().map(serde_json::to_value).collect() {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("Failed to serialize inventory: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    match export_to_csv(&rows) {
        Ok(csv) => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"inventario.csv\""),
            ],
            csv,
        )
            .into_response(),
        Err(CsvError::Empty) => (StatusCode::NOT_FOUND, "No data to export").into_response(),
        Err(e) => {
            tracing::error!("Inventory export failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::analytics_api::testing::StubApi;
    use crate::application::app_shell::{AppShell, ShellOptions};
    use crate::infrastructure::file_store::MemoryStore;
    use serde_json::json;
    use std::time::Duration;

    async fn serve(api: StubApi) -> (String, reqwest::Client) {
        let shell = AppShell::new(
            Arc::new(api),
            Arc::new(MemoryStore::new()),
            ShellOptions {
                offline_demo: true,
                toast_duration: Duration::from_millis(3000),
                search_debounce: Duration::from_millis(300),
                default_range_days: 30,
            },
        );
        let router = routes(Arc::new(AppState { shell }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();
        (format!("http://{}", addr), client)
    }

    async fn log_in(base: &str, client: &reqwest::Client) {
        let response = client
            .post(format!("{}/login", base))
            .form(&[("username", "alice"), ("password", "x")])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_health_and_login_gate() {
        let (base, client) = serve(StubApi::new()).await;
        let health = client.get(format!("{}/healthz", base)).send().await.unwrap();
        assert_eq!(health.text().await.unwrap(), "ok");

        let page = client.get(format!("{}/", base)).send().await.unwrap().text().await.unwrap();
        assert!(page.contains("id=\"login-container\""));

        let gated = client.get(format!("{}/pages/ml", base)).send().await.unwrap();
        assert_eq!(gated.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_navigation_and_unknown_page() {
        let (base, client) = serve(StubApi::new()).await;
        log_in(&base, &client).await;

        let page = client.get(format!("{}/pages/customer", base)).send().await.unwrap();
        assert_eq!(page.status(), StatusCode::OK);
        let html = page.text().await.unwrap();
        assert!(html.contains("Comportamiento del Cliente"));
        assert!(html.contains("67.8%"));

        let missing = client.get(format!("{}/pages/orders", base)).send().await.unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_date_filter_is_blocking_alert() {
        let (base, client) = serve(StubApi::new()).await;
        log_in(&base, &client).await;

        let response = client
            .post(format!("{}/filters/date", base))
            .form(&[("start_date", "2024-02-01"), ("end_date", "2024-01-01")])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response
            .text()
            .await
            .unwrap()
            .contains("alert(\"La fecha de inicio debe ser anterior a la fecha de fin\")"));
    }

    #[tokio::test]
    async fn test_chart_options_and_filters() {
        let (base, client) = serve(StubApi::new()).await;
        log_in(&base, &client).await;

        let options: serde_json::Value = client
            .get(format!("{}/charts/top-products-chart", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(options["chart"]["type"], "bar");
        let missing = client.get(format!("{}/charts/nope", base)).send().await.unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let accepted = client
            .post(format!("{}/pages/dashboard/filter", base))
            .form(&[("interval", "month")])
            .send()
            .await
            .unwrap();
        assert_eq!(accepted.status(), StatusCode::SEE_OTHER);
        let rejected = client
            .post(format!("{}/pages/dashboard/filter", base))
            .form(&[("interval", "year")])
            .send()
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_inventory_csv_and_report_redirect() {
        let api = StubApi::new().with(
            "/api/inventory/stock",
            json!([{ "product_id": 1, "product_name": "Laptop, Ultra", "category": "electronics", "stock_level": 3 }]),
        );
        let (base, client) = serve(api).await;
        log_in(&base, &client).await;
        client.get(format!("{}/pages/inventory", base)).send().await.unwrap();

        let csv = client.get(format!("{}/inventory/export.csv", base)).send().await.unwrap();
        assert_eq!(csv.headers()[header::CONTENT_TYPE], "text/csv; charset=utf-8");
        let body = csv.text().await.unwrap();
        assert!(body.starts_with("product_id,product_name,category,stock_level"));
        assert!(body.contains("1,\"Laptop, Ultra\",electronics,3,"));

        let report = client
            .get(format!("{}/reports/export?type=sales&format=csv", base))
            .send()
            .await
            .unwrap();
        assert_eq!(report.status(), StatusCode::TEMPORARY_REDIRECT);
        let location = report.headers()[header::LOCATION].to_str().unwrap().to_string();
        assert!(location.starts_with("http://backend/api/reports/export?type=sales&format=csv&start_date="));
    }
}
