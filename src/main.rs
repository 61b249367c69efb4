// Main entry point - Dependency injection and server setup
use std::{net::SocketAddr, sync::Arc};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use storefront_insights::application::app_shell::AppShell;
use storefront_insights::infrastructure::config::load_settings;
use storefront_insights::infrastructure::file_store::JsonFileStore;
use storefront_insights::infrastructure::http_api::HttpAnalyticsApi;
use storefront_insights::presentation::app_state::AppState;
use storefront_insights::presentation::handlers::routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("storefront_insights=info,tower_http=info")),
        )
        .init();

    // Load configuration
    let settings = load_settings()?;

    // Backend client and client-side state (infrastructure layer)
    let api = Arc::new(HttpAnalyticsApi::new(&settings.api.base_url, settings.api_timeout())?);
    let store = Arc::new(JsonFileStore::open(&settings.storage.path).await);

    if settings.auth.offline_demo {
        tracing::warn!("Offline demo mode enabled: logins fall back to a demo identity when the backend is down");
    }

    // Application shell restores the persisted session and theme
    let shell = AppShell::new(api, store, settings.shell_options());
    shell.bootstrap().await;

    let state = Arc::new(AppState { shell });

    // Build router (presentation layer)
    let router = routes(state)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = settings.server.bind_addr.parse()?;
    tracing::info!("Starting storefront-insights on {} (backend {})", addr, settings.api.base_url);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
