use axum::http::{request::Parts, HeaderValue};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use url::Url;

const LOOPBACK_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "::1"];

/// Builds the CORS layer for the configured origin list.
///
/// An empty list allows any origin. Requests without an `Origin` header are
/// never affected.
pub fn cors_layer(allowed_origins: &[String], production: bool) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed = allowed_origins.to_vec();
    layer.allow_origin(AllowOrigin::predicate(
        move |origin: &HeaderValue, _parts: &Parts| {
            origin
                .to_str()
                .map(|origin| origin_allowed(&allowed, origin, production))
                .unwrap_or(false)
        },
    ))
}

/// Whether `origin` passes the allow list
pub fn origin_allowed(allowed: &[String], origin: &str, production: bool) -> bool {
    if origin == "null" && !production {
        return true;
    }
    allowed
        .iter()
        .any(|entry| entry == "*" || entry == origin || origins_match(entry, origin))
}

fn origins_match(allowed: &str, requested: &str) -> bool {
    match (Url::parse(allowed), Url::parse(requested)) {
        (Ok(a), Ok(r)) => {
            a.scheme() == r.scheme()
                && a.port_or_known_default() == r.port_or_known_default()
                && hosts_equivalent(a.host_str(), r.host_str())
        }
        _ => allowed == requested,
    }
}

fn hosts_equivalent(a: Option<&str>, b: Option<&str>) -> bool {
    let normalize = |h: Option<&str>| {
        h.unwrap_or_default()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_ascii_lowercase()
    };
    let (a, b) = (normalize(a), normalize(b));
    let loopback = |h: &str| LOOPBACK_HOSTS.contains(&h);
    (loopback(&a) && loopback(&b)) || a == b
}
