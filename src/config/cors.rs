use axum::http::{header, request::Parts, HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

const LOOPBACK_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "[::1]"];

const PREFLIGHT_MAX_AGE_SECS: u64 = 86400;

/// Loopback origins on any port are always accepted, `extra_origins` on top.
pub fn create_cors_layer(extra_origins: &[String]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allowed_origins(extra_origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .expose_headers([header::CONTENT_LENGTH, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(PREFLIGHT_MAX_AGE_SECS))
}

fn allowed_origins(extra_origins: &[String]) -> AllowOrigin {
    let extras: Vec<HeaderValue> = extra_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => {
                tracing::debug!("CORS: Allowing origin: {}", origin);
                Some(value)
            }
            Err(e) => {
                tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    tracing::info!(
        "CORS: Loopback origins plus {} configured origin(s)",
        extras.len()
    );

    AllowOrigin::predicate(move |origin: &HeaderValue, _parts: &Parts| {
        extras.contains(origin) || origin.to_str().map(is_loopback_origin).unwrap_or(false)
    })
}

pub fn is_loopback_origin(origin: &str) -> bool {
    let Some(authority) = origin
        .strip_prefix("http://")
        .or_else(|| origin.strip_prefix("https://"))
    else {
        return false;
    };

    LOOPBACK_HOSTS.iter().any(|host| match authority.strip_prefix(host) {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix(':')
            .is_some_and(|port| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())),
        None => false,
    })
}
