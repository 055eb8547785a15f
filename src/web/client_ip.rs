use std::convert::Infallible;
use std::net::SocketAddr;

use axum::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;

pub const FORWARDED_CLIENT_IP: &str = "forwarded-client-ip";
const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

fn first_hop(value: &str) -> &str {
    value.split(',').next().unwrap_or(value)
}

/// Resolves the originating client address.
///
/// Precedence: `Forwarded-Client-IP` (only when `prefer_forwarded_client_header`
/// is set, returned verbatim), then the first entry of `X-Forwarded-For`, then the
/// first entry of `X-Real-Ip`, then the peer address. Entries are not trimmed.
pub fn resolve_client_ip(
    headers: &HeaderMap,
    remote_addr: Option<SocketAddr>,
    prefer_forwarded_client_header: bool,
) -> String {
    if prefer_forwarded_client_header {
        if let Some(ip) = header_str(headers, FORWARDED_CLIENT_IP) {
            return ip.to_string();
        }
    }

    if let Some(forwarded_for) = header_str(headers, X_FORWARDED_FOR) {
        return first_hop(forwarded_for).to_string();
    }

    if let Some(real_ip) = header_str(headers, X_REAL_IP) {
        return first_hop(real_ip).to_string();
    }

    remote_addr
        .map(|addr| addr.ip().to_string())
        .unwrap_or_default()
}

/// Both resolutions of the caller's address for one inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp {
    /// What gets forwarded upstream in `Forwarded-Client-IP`.
    pub forwarded: String,
    /// Proxy-header view of the caller, used for request logs.
    pub peer: String,
}

impl ClientIp {
    pub fn from_parts(headers: &HeaderMap, remote_addr: Option<SocketAddr>) -> Self {
        Self {
            forwarded: resolve_client_ip(headers, remote_addr, true),
            peer: resolve_client_ip(headers, remote_addr, false),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Absent when the router is not served with connect info, as in tests.
        let remote_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self::from_parts(&parts.headers, remote_addr))
    }
}
