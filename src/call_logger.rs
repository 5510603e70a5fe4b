/// Structured logging of API calls with sensitive data removed.
///
/// Credit reports and bureau requests carry SSNs, account numbers and
/// credentials. Nothing from a request or response body reaches the logs
/// without going through [`sanitize_value`] first.
///
/// Redacted strings are replaced with a short SHA-256 fingerprint so the
/// same value can be correlated across log lines without being revealed.
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Keys whose values are never logged, compared after lowercasing and
/// dropping `_` and `-`.
const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "passwd",
    "token",
    "accesstoken",
    "refreshtoken",
    "secret",
    "clientsecret",
    "authorization",
    "apikey",
    "ssn",
    "socialsecuritynumber",
    "taxid",
    "dob",
    "dateofbirth",
    "birthdate",
    "accountnumber",
    "cardnumber",
    "routingnumber",
];

pub const REDACTED: &str = "[REDACTED]";

fn ssn_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b\d{3}-?\d{2}-?(\d{4})\b").expect("SSN pattern is a valid regex")
    })
}

fn bearer_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(bearer|basic)\s+[A-Za-z0-9\-._~+/]+=*")
            .expect("credential pattern is a valid regex")
    })
}

/// Whether values stored under `key` must be redacted.
pub fn is_sensitive_key(key: &str) -> bool {
    let normalized: String = key
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect();
    SENSITIVE_KEYS.contains(&normalized.as_str())
}

/// Short, stable SHA-256 fingerprint of a value (first 12 hex chars).
pub fn fingerprint(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(12);
    digest
}

/// Masks SSN-like numbers (keeping the last four digits) and HTTP
/// credentials inside free text.
pub fn sanitize_text(text: &str) -> String {
    let masked = ssn_pattern().replace_all(text, "***-**-$1");
    bearer_pattern()
        .replace_all(&masked, format!("$1 {}", REDACTED).as_str())
        .into_owned()
}

/// Returns a copy of `value` safe to write to logs.
pub fn sanitize_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sanitized: Map<String, Value> = map
                .iter()
                .map(|(key, v)| {
                    let v = if is_sensitive_key(key) {
                        redact(v)
                    } else {
                        sanitize_value(v)
                    };
                    (key.clone(), v)
                })
                .collect();
            Value::Object(sanitized)
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize_value).collect()),
        Value::String(s) => Value::String(sanitize_text(s)),
        other => other.clone(),
    }
}

fn redact(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::String(s) => Value::String(format!("{}:{}", REDACTED, fingerprint(s.as_bytes()))),
        other => Value::String(format!(
            "{}:{}",
            REDACTED,
            fingerprint(other.to_string().as_bytes())
        )),
    }
}

/// Base used to resolve path-only request targets such as `/path?query`.
const RELATIVE_BASE: &str = "http://relative.invalid/";

/// Redacts credentials and sensitive query parameters in a URL.
///
/// Absolute URLs keep their full form. Path-only targets (what a server
/// sees in its request line) come back as path and query only.
/// Unparseable input is treated as free text.
pub fn sanitize_url(raw: &str) -> String {
    let (mut url, relative) = match Url::parse(raw) {
        Ok(url) => (url, false),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            match Url::parse(RELATIVE_BASE).and_then(|base| base.join(raw)) {
                Ok(url) => (url, true),
                Err(_) => return sanitize_text(raw),
            }
        }
        Err(_) => return sanitize_text(raw),
    };

    if url.password().is_some() {
        let _ = url.set_password(Some(REDACTED));
    }

    if url.query().is_some() {
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| {
                let v = if is_sensitive_key(&k) {
                    REDACTED.to_string()
                } else {
                    sanitize_text(&v)
                };
                (k.into_owned(), v)
            })
            .collect();
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }

    if !relative {
        return url.to_string();
    }
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

/// One API call, ready to be logged.
#[derive(Debug, Clone, Serialize)]
pub struct ApiCallLog {
    pub request_id: Uuid,
    pub method: String,
    /// Already sanitized.
    pub url: String,
    /// `None` when no response was received.
    pub status: Option<u16>,
    pub duration_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ApiCallLog {
    pub fn new(request_id: Uuid, method: &str, url: &str) -> Self {
        Self {
            request_id,
            method: method.to_uppercase(),
            url: sanitize_url(url),
            status: None,
            duration_ms: 0,
            request_body: None,
            response_body: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_status(mut self, status: u16, elapsed: Duration) -> Self {
        self.status = Some(status);
        self.duration_ms = elapsed.as_millis();
        self
    }

    pub fn with_request_body(mut self, body: &Value) -> Self {
        self.request_body = Some(sanitize_value(body));
        self
    }

    pub fn with_response_body(mut self, body: &Value) -> Self {
        self.response_body = Some(sanitize_value(body));
        self
    }

    pub fn with_error(mut self, error: impl std::fmt::Display, elapsed: Duration) -> Self {
        self.error = Some(sanitize_text(&error.to_string()));
        self.duration_ms = elapsed.as_millis();
        self
    }

    /// Emits the record as a structured `tracing` event.
    ///
    /// Success is logged at `info`, client errors at `warn`, server errors
    /// and calls without a response at `error`.
    pub fn emit(&self) {
        let payload = serde_json::to_string(self).unwrap_or_default();
        match self.status {
            Some(status) if status < 400 => tracing::info!(
                request_id = %self.request_id,
                method = %self.method,
                url = %self.url,
                status,
                duration_ms = self.duration_ms as u64,
                "API call: {}",
                payload
            ),
            Some(status) if status < 500 => tracing::warn!(
                request_id = %self.request_id,
                method = %self.method,
                url = %self.url,
                status,
                duration_ms = self.duration_ms as u64,
                "API call failed: {}",
                payload
            ),
            _ => tracing::error!(
                request_id = %self.request_id,
                method = %self.method,
                url = %self.url,
                duration_ms = self.duration_ms as u64,
                "API call error: {}",
                payload
            ),
        }
    }
}
