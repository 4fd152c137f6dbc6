//! Client address used to key authentication lockouts.
//!
//! `x-real-ip` and `x-forwarded-for` are client-controlled unless a reverse
//! proxy overwrites them, so they are only read when
//! `server.trust_proxy_headers` is set. Requests with no usable address share
//! the `unknown` bucket.
use crate::AppState;
use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

/// Key used when no address is known
pub const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddr(pub String);

/// Resolve the client address.
///
/// With `trust_proxy_headers`, `x-real-ip` then the first `x-forwarded-for`
/// entry win over the peer address; otherwise only the peer address counts.
pub fn client_addr(parts: &Parts, trust_proxy_headers: bool) -> ClientAddr {
    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());
    let forwarded = || {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        header("x-real-ip").or_else(|| header("x-forwarded-for"))
    };

    let resolved = if trust_proxy_headers {
        forwarded().or(peer)
    } else {
        peer
    };
    ClientAddr(resolved.unwrap_or_else(|| UNKNOWN_CLIENT.to_string()))
}

impl FromRequestParts<Arc<AppState>> for ClientAddr {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(client_addr(parts, state.settings.server.trust_proxy_headers))
    }
}
