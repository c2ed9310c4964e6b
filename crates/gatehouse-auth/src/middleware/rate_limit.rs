//! Rate-limit middleware.
//!
//! Keys each request by client address: `X-Real-IP`, then the first
//! `X-Forwarded-For` entry, then the peer address from `ConnectInfo`.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::auth::GateState;

const X_REAL_IP: &str = "x-real-ip";
const X_FORWARDED_FOR: &str = "x-forwarded-for";
const UNKNOWN_CLIENT: &str = "unknown";

/// Rejects requests over the per-client budget with 429 and `Retry-After`.
///
/// ```ignore
/// let app = Router::new()
///     .route("/v1/posts", get(list_posts))
///     .layer(axum::middleware::from_fn_with_state(state.clone(), rate_limit))
///     .with_state(state);
/// ```
pub async fn rate_limit(State(state): State<GateState>, request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(request.headers(), peer);

    match state.gate.admit(&key) {
        Ok(()) => next.run(request).await,
        Err(rejection) => rejection.into_response(),
    }
}

/// Derives the rate-limit key for a request.
#[must_use]
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    if let Some(real_ip) = header(X_REAL_IP) {
        return real_ip.to_string();
    }

    if let Some(forwarded) = header(X_FORWARDED_FOR)
        && let Some(first) = forwarded.split(',').map(str::trim).find(|s| !s.is_empty())
    {
        return first.to_string();
    }

    peer.map_or_else(|| UNKNOWN_CLIENT.to_string(), |addr| addr.ip().to_string())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn peer() -> Option<SocketAddr> {
        Some("192.0.2.7:55000".parse().unwrap())
    }

    #[test]
    fn test_real_ip_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(X_REAL_IP, HeaderValue::from_static("203.0.113.9"));
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("198.51.100.1"));
        assert_eq!(client_key(&headers, peer()), "203.0.113.9");
    }

    #[test]
    fn test_first_forwarded_for_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            X_FORWARDED_FOR,
            HeaderValue::from_static(" 198.51.100.1 , 10.0.0.1"),
        );
        assert_eq!(client_key(&headers, peer()), "198.51.100.1");
    }

    #[test]
    fn test_peer_address_fallback() {
        assert_eq!(client_key(&HeaderMap::new(), peer()), "192.0.2.7");
        assert_eq!(client_key(&HeaderMap::new(), None), "unknown");
    }
}
