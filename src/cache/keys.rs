use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use axum::http::{HeaderMap, Uri, header};

/// Identity of a cached page: path and raw query, varied on the `Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub path: String,
    pub query: String,
    pub vary: u64,
}

impl PageKey {
    pub fn from_request(uri: &Uri, headers: &HeaderMap) -> Self {
        let mut hasher = DefaultHasher::new();
        for value in headers.get_all(header::COOKIE) {
            value.as_bytes().hash(&mut hasher);
        }
        Self {
            path: uri.path().to_string(),
            query: uri.query().unwrap_or("").to_string(),
            vary: hasher.finish(),
        }
    }
}
