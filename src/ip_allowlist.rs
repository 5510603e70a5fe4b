//! IP allowlist for protected routes.
//!
//! Clients are matched against configured networks. The client address is
//! the socket peer, or the first `X-Forwarded-For` hop when the service is
//! configured to trust its proxy. An empty allowlist lets everyone through.

use crate::errors::AppError;
use crate::handlers::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use ipnet::IpNet;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

/// Networks allowed to reach protected routes.
#[derive(Debug, Clone, Default)]
pub struct IpAllowlist {
    networks: Vec<IpNet>,
    trust_proxy: bool,
}

impl IpAllowlist {
    pub fn new(networks: Vec<IpNet>, trust_proxy: bool) -> Self {
        Self {
            networks,
            trust_proxy,
        }
    }

    /// Whether the allowlist restricts anything at all.
    pub fn is_enabled(&self) -> bool {
        !self.networks.is_empty()
    }

    pub fn is_allowed(&self, ip: IpAddr) -> bool {
        if !self.is_enabled() {
            return true;
        }
        let ip = normalize(ip);
        self.networks.iter().any(|net| net.contains(&ip))
    }

    /// Resolves the client address for a request.
    ///
    /// Returns `None` when neither a trusted forwarded address nor the peer
    /// address is available.
    pub fn client_ip(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<IpAddr> {
        if self.trust_proxy {
            if let Some(ip) = forwarded_for(headers) {
                return Some(normalize(ip));
            }
        }
        peer.map(|addr| normalize(addr.ip()))
    }
}

/// First hop of `X-Forwarded-For`, which is the original client.
fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    let raw = headers.get("x-forwarded-for")?.to_str().ok()?;
    let first = raw.split(',').next()?.trim();
    first
        .parse::<IpAddr>()
        .ok()
        .or_else(|| first.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}

/// Maps IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) back to IPv4.
fn normalize(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
        IpAddr::V4(_) => ip,
    }
}

/// Middleware rejecting clients outside the configured allowlist with 403.
pub async fn enforce_ip_allowlist(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let allowlist = &state.ip_allowlist;
    if !allowlist.is_enabled() {
        return Ok(next.run(request).await);
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    match allowlist.client_ip(request.headers(), peer) {
        Some(ip) if allowlist.is_allowed(ip) => Ok(next.run(request).await),
        Some(ip) => Err(AppError::Forbidden(format!(
            "client {} is not in the IP allowlist ({} {})",
            ip,
            request.method(),
            request.uri().path()
        ))),
        None => Err(AppError::Forbidden(format!(
            "could not determine client address ({} {})",
            request.method(),
            request.uri().path()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn allowlist(entries: &[&str], trust_proxy: bool) -> IpAllowlist {
        let raw = entries.join(",");
        IpAllowlist::new(
            crate::config::parse_ip_allowlist(&raw).unwrap(),
            trust_proxy,
        )
    }

    #[test]
    fn test_empty_allowlist_allows_everyone() {
        let list = IpAllowlist::default();
        assert!(!list.is_enabled());
        assert!(list.is_allowed("8.8.8.8".parse().unwrap()));
    }

    #[test]
    fn test_cidr_and_single_host() {
        let list = allowlist(&["10.0.0.0/8", "203.0.113.7"], false);

        assert!(list.is_allowed("10.42.0.1".parse().unwrap()));
        assert!(list.is_allowed("203.0.113.7".parse().unwrap()));
        assert!(!list.is_allowed("203.0.113.8".parse().unwrap()));
        assert!(!list.is_allowed("8.8.8.8".parse().unwrap()));
    }

    #[test]
    fn test_ipv4_mapped_ipv6_matches_ipv4_entry() {
        let list = allowlist(&["127.0.0.1"], false);
        assert!(list.is_allowed("::ffff:127.0.0.1".parse().unwrap()));
    }

    #[test]
    fn test_forwarded_for_ignored_without_trust() {
        let list = allowlist(&["10.0.0.0/8"], false);
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.1.1.1"));
        let peer: SocketAddr = "192.0.2.10:5000".parse().unwrap();

        assert_eq!(
            list.client_ip(&headers, Some(peer)),
            Some("192.0.2.10".parse().unwrap())
        );
    }

    #[test]
    fn test_forwarded_for_first_hop_when_trusted() {
        let list = allowlist(&["10.0.0.0/8"], true);
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("10.1.1.1, 172.16.0.5"),
        );

        assert_eq!(
            list.client_ip(&headers, None),
            Some("10.1.1.1".parse().unwrap())
        );
    }

    #[test]
    fn test_unparseable_forwarded_for_falls_back_to_peer() {
        let list = allowlist(&["10.0.0.0/8"], true);
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("unknown"));
        let peer: SocketAddr = "10.9.9.9:443".parse().unwrap();

        assert_eq!(
            list.client_ip(&headers, Some(peer)),
            Some("10.9.9.9".parse().unwrap())
        );
        assert_eq!(list.client_ip(&headers, None), None);
    }
}
