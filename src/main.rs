use anyhow::Context;
use rust_credit_api::config::Config;
use rust_credit_api::handlers::AppState;
use rust_credit_api::router;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the credit report analysis service.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - IP allowlist and rate limiting for the analysis routes.
///
/// It then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_credit_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    let app_state = Arc::new(AppState::new(config.clone()));

    // Health check bypasses rate limiting and the allowlist
    let protected_routes =
        router::rate_limited(router::protected_routes(&app_state), config.trust_proxy)?;
    let app = router::app(app_state, protected_routes);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Server listening on {}", addr);

    // Peer addresses feed the IP allowlist and the rate limiter
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
