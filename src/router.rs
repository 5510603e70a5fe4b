use crate::call_logger::sanitize_url;
use crate::handlers::{self, AppState};
use crate::ip_allowlist::enforce_ip_allowlist;
use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, Request},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder,
    key_extractor::{PeerIpKeyExtractor, SmartIpKeyExtractor},
    GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Seconds after which one request of the quota is replenished.
pub const RATE_LIMIT_REPLENISH_SECS: u64 = 10;
/// Requests a single client may send back to back.
pub const RATE_LIMIT_BURST: u32 = 20;

/// Routes that sit behind the IP allowlist and the body size limit.
///
/// Returned without state so the caller can add further layers (the
/// server adds per-IP rate limiting) before handing it to [`app`].
pub fn protected_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/v1/credit-reports/payment-statuses",
            post(handlers::analyze_payment_statuses),
        )
        .layer(
            ServiceBuilder::new()
                // IP allowlist runs first so rejected clients never send a body
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    enforce_ip_allowlist,
                ))
                // Replace axum's 2MB default with the configured ceiling
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(state.config.max_body_bytes)),
        )
}

/// Adds per-client rate limiting to `routes`.
///
/// Clients are keyed by socket peer address. Forwarding headers are only
/// honored when `trust_proxy` is set, matching the IP allowlist.
pub fn rate_limited(
    routes: Router<Arc<AppState>>,
    trust_proxy: bool,
) -> anyhow::Result<Router<Arc<AppState>>> {
    let routes = if trust_proxy {
        let governor_conf = GovernorConfigBuilder::default()
            .per_second(RATE_LIMIT_REPLENISH_SECS)
            .burst_size(RATE_LIMIT_BURST)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .context("invalid rate limiter configuration")?;
        routes.layer(GovernorLayer {
            config: Arc::new(governor_conf),
        })
    } else {
        let governor_conf = GovernorConfigBuilder::default()
            .per_second(RATE_LIMIT_REPLENISH_SECS)
            .burst_size(RATE_LIMIT_BURST)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .context("invalid rate limiter configuration")?;
        routes.layer(GovernorLayer {
            config: Arc::new(governor_conf),
        })
    };
    Ok(routes)
}

/// Builds the final application: health check (unrestricted) merged with
/// the protected routes, plus tracing and CORS.
pub fn app(state: Arc<AppState>, protected: Router<Arc<AppState>>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .merge(protected)
        .with_state(state)
        .layer(
            // Span fields end up on every log line, so the query is sanitized
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::debug_span!(
                    "request",
                    method = %request.method(),
                    uri = %sanitize_url(&request.uri().to_string()),
                    version = ?request.version(),
                )
            }),
        )
        .layer(CorsLayer::permissive())
}
