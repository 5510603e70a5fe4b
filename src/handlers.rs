use crate::call_logger::{fingerprint, ApiCallLog};
use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::ip_allowlist::IpAllowlist;
use crate::payment_status::{classify_document, AggregationResult};
use crate::report::PaymentStatusReport;
use axum::{
    body::Bytes,
    http::{Method, StatusCode, Uri},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Instant;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Networks allowed to call protected routes.
    pub ip_allowlist: IpAllowlist,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let ip_allowlist = IpAllowlist::new(config.ip_allowlist.clone(), config.trust_proxy);
        Self {
            config,
            ip_allowlist,
        }
    }
}

/// Body returned by the payment-status analysis endpoint.
#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub request_id: Uuid,
    /// Short SHA-256 of the submitted document, for correlating logs.
    pub document_fingerprint: String,
    pub generated_at: DateTime<Utc>,
    pub aggregation: AggregationResult,
    pub report: PaymentStatusReport,
}

/// Health check endpoint.
///
/// Returns the service status, version, and health information.
pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-credit-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /api/v1/credit-reports/payment-statuses
///
/// Classifies the monthly pay statuses of the submitted TrueLink credit
/// report and returns both the raw counts and the rendered report.
/// Parsing and classification run on the blocking pool since reports can
/// be several megabytes.
///
/// A report without any payment records is still a 200: the percentage is
/// `null` and the reason is listed in `report.warnings`.
///
/// # Errors
///
/// * `AppError::BadRequest` - the body is not JSON.
/// * `AppError::UnprocessableEntity` - the trade-line partition path is missing.
/// * `AppError::WithContext` - the analysis task itself failed.
pub async fn analyze_payment_statuses(
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Result<Json<AnalysisResponse>, AppError> {
    let started = Instant::now();
    let request_id = Uuid::new_v4();
    let document_fingerprint = fingerprint(&body);
    let call = ApiCallLog::new(request_id, method.as_str(), &uri.to_string());

    tracing::info!(
        %request_id,
        document_fingerprint = %document_fingerprint,
        bytes = body.len(),
        "Analyzing credit report payment statuses"
    );

    let outcome = tokio::task::spawn_blocking(move || analyze_body(&body))
        .await
        .context("analyzing credit report")
        .and_then(|analysis| analysis);

    let (document, aggregation) = match outcome {
        Ok(analysis) => analysis,
        Err(e) => {
            call.with_status(e.status_code().as_u16(), started.elapsed())
                .with_error(&e, started.elapsed())
                .emit();
            return Err(e);
        }
    };

    let report = PaymentStatusReport::from_aggregation(&aggregation);
    for warning in &report.warnings {
        tracing::warn!(%request_id, "{}", warning);
    }

    let call = if tracing::enabled!(tracing::Level::DEBUG) {
        call.with_request_body(&document)
    } else {
        call
    };
    call.with_status(StatusCode::OK.as_u16(), started.elapsed())
        .with_response_body(&json!({
            "total_records": report.total_records,
            "total_payments": report.total_payments,
            "on_time_payments": report.on_time_payments,
            "on_time_percentage": report.on_time_percentage,
        }))
        .emit();

    Ok(Json(AnalysisResponse {
        request_id,
        document_fingerprint,
        generated_at: Utc::now(),
        aggregation,
        report,
    }))
}

/// Parses and classifies a request body.
fn analyze_body(body: &[u8]) -> Result<(Value, AggregationResult), AppError> {
    let document = serde_json::from_slice::<Value>(body)?;
    let aggregation = classify_document(&document)?;
    Ok((document, aggregation))
}
