//! Page cache middleware.
//!
//! Serves stored copies of `GET` responses until their TTL runs out. Only
//! `200 OK` responses that do not set cookies are stored.

use std::sync::Arc;

use axum::{
    body::{Body, HttpBody},
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::counter;
use tracing::{debug, instrument, warn};

use super::{
    PageCacheConfig,
    keys::PageKey,
    store::{CachedResponse, Lookup, PageStore},
};

pub const METRIC_PAGE_CACHE_HIT: &str = "postboard_page_cache_hit_total";
pub const METRIC_PAGE_CACHE_MISS: &str = "postboard_page_cache_miss_total";
pub const METRIC_PAGE_CACHE_EVICT: &str = "postboard_page_cache_evict_total";

/// Shared cache state for middleware.
#[derive(Clone)]
pub struct PageCacheState {
    pub config: PageCacheConfig,
    pub store: Arc<PageStore>,
}

impl PageCacheState {
    pub fn new(config: PageCacheConfig) -> Self {
        let store = Arc::new(PageStore::new(&config));
        Self { config, store }
    }
}

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn page_cache_layer(
    State(cache): State<PageCacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.config.enabled || request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = PageKey::from_request(request.uri(), request.headers());

    match cache.store.get(&key) {
        Lookup::Hit(cached) => {
            counter!(METRIC_PAGE_CACHE_HIT).increment(1);
            debug!(cache = "page", outcome = "hit", "serving cached page");
            return build_response(cached);
        }
        Lookup::Miss | Lookup::Expired => {
            counter!(METRIC_PAGE_CACHE_MISS).increment(1);
            debug!(cache = "page", outcome = "miss", "rendering page");
        }
    }

    let response = next.run(request).await;
    if response.status() != StatusCode::OK || response.headers().contains_key(header::SET_COOKIE)
    {
        return response;
    }
    if !fits_in_cache(&response, cache.config.body_limit_bytes) {
        debug!(cache = "page", outcome = "bypass", "page too large or unsized; not stored");
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, cache.config.body_limit_bytes).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(cache = "page", error = %err, "failed to buffer page for caching");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let cached = CachedResponse {
        status: parts.status.as_u16(),
        headers: parts
            .headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect(),
        body: bytes.clone(),
    };

    if cache.store.set(key, cached).is_some() {
        counter!(METRIC_PAGE_CACHE_EVICT).increment(1);
    }

    Response::from_parts(parts, Body::from(bytes))
}

/// Only bodies with an exact, known length within `limit` are buffered.
fn fits_in_cache(response: &Response, limit: usize) -> bool {
    let hint = response.body().size_hint();
    match hint.exact() {
        Some(len) => usize::try_from(len).is_ok_and(|len| len <= limit),
        None => false,
    }
}

fn build_response(cached: CachedResponse) -> Response {
    let mut builder = Response::builder().status(cached.status);

    for (name, value) in cached.headers {
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, header_value);
        }
    }

    builder
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
