//! Page cache for rendered public pages.
//!
//! Responses are stored for a fixed time-to-live and never invalidated by
//! writes: a new post shows up on a cached page only once the entry expires.
//!
//! ```toml
//! [cache]
//! enabled = true
//! ttl_seconds = 20
//! capacity = 256
//! ```

mod config;
mod keys;
mod lock;
mod middleware;
mod store;

pub use config::PageCacheConfig;
pub use keys::PageKey;
pub use middleware::{
    METRIC_PAGE_CACHE_EVICT, METRIC_PAGE_CACHE_HIT, METRIC_PAGE_CACHE_MISS, PageCacheState,
    page_cache_layer,
};
pub use store::{CachedResponse, Lookup, PageStore};
