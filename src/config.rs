use ipnet::IpNet;
use std::net::IpAddr;
use std::path::PathBuf;

/// Default request body ceiling: credit reports are large but bounded.
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Default location of the credit report read by the analyzer CLI.
pub const DEFAULT_CREDIT_REPORT_PATH: &str = "credit-report.json";

/// Configuration of the HTTP analysis service.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Networks allowed to call protected routes. Empty disables the check.
    pub ip_allowlist: Vec<IpNet>,
    /// Take the client address from `X-Forwarded-For` instead of the socket.
    pub trust_proxy: bool,
    pub max_body_bytes: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            ip_allowlist: parse_ip_allowlist(
                &std::env::var("IP_ALLOWLIST").unwrap_or_default(),
            )?,
            trust_proxy: parse_bool(
                "TRUST_PROXY",
                &std::env::var("TRUST_PROXY").unwrap_or_default(),
            )?,
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|s| {
                    s.trim()
                        .parse::<usize>()
                        .map_err(|_| anyhow::anyhow!("MAX_BODY_BYTES must be a positive integer"))
                        .and_then(|n| {
                            if n == 0 {
                                anyhow::bail!("MAX_BODY_BYTES cannot be zero");
                            }
                            Ok(n)
                        })
                })
                .transpose()?
                .unwrap_or(DEFAULT_MAX_BODY_BYTES),
        };

        // Log successful configuration load
        tracing::debug!("Server Port: {}", config.port);
        if config.ip_allowlist.is_empty() {
            tracing::warn!("IP_ALLOWLIST not set - all client addresses are allowed");
        } else {
            tracing::info!(
                "IP allowlist configured with {} entr{}",
                config.ip_allowlist.len(),
                if config.ip_allowlist.len() == 1 { "y" } else { "ies" }
            );
        }
        if config.trust_proxy {
            tracing::info!("Trusting X-Forwarded-For for client addresses");
        }
        tracing::debug!("Max body bytes: {}", config.max_body_bytes);

        Ok(config)
    }
}

/// Configuration of the one-shot analyzer CLI.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub credit_report_path: PathBuf,
}

impl AnalyzerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let credit_report_path = match std::env::var("CREDIT_REPORT_PATH") {
            Ok(path) if path.trim().is_empty() => {
                anyhow::bail!("CREDIT_REPORT_PATH cannot be empty")
            }
            Ok(path) => PathBuf::from(path.trim()),
            Err(_) => PathBuf::from(DEFAULT_CREDIT_REPORT_PATH),
        };

        tracing::debug!("Credit report path: {}", credit_report_path.display());

        Ok(Self { credit_report_path })
    }
}

/// Parses a comma-separated list of IP addresses and CIDR ranges.
///
/// A bare address is treated as a single-host network.
pub fn parse_ip_allowlist(raw: &str) -> anyhow::Result<Vec<IpNet>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse::<IpNet>()
                .or_else(|_| entry.parse::<IpAddr>().map(IpNet::from))
                .map_err(|_| {
                    anyhow::anyhow!(
                        "IP_ALLOWLIST entry '{}' is not a valid IP address or CIDR range",
                        entry
                    )
                })
        })
        .collect()
}

fn parse_bool(name: &str, raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" => Ok(false),
        "1" | "true" | "yes" => Ok(true),
        other => anyhow::bail!("{} must be true or false, got '{}'", name, other),
    }
}
