//! TTL-bounded LRU storage for rendered responses.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use bytes::Bytes;
use lru::LruCache;

use super::config::PageCacheConfig;
use super::keys::PageKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// Cached HTTP response.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

struct Entry {
    response: CachedResponse,
    expires_at: Instant,
}

/// What a lookup found.
#[derive(Debug)]
pub enum Lookup {
    Hit(CachedResponse),
    Miss,
    /// An entry existed but its TTL had passed; it has been dropped.
    Expired,
}

pub struct PageStore {
    ttl: Duration,
    entries: RwLock<LruCache<PageKey, Entry>>,
}

impl PageStore {
    pub fn new(config: &PageCacheConfig) -> Self {
        Self {
            ttl: config.ttl,
            entries: RwLock::new(LruCache::new(config.capacity_non_zero())),
        }
    }

    pub fn get(&self, key: &PageKey) -> Lookup {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&self, key: &PageKey, now: Instant) -> Lookup {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Lookup::Hit(entry.response.clone()),
            Some(_) => {
                entries.pop(key);
                Lookup::Expired
            }
            None => Lookup::Miss,
        }
    }

    /// Stores a response; returns the key evicted to make room, if any.
    pub fn set(&self, key: PageKey, response: CachedResponse) -> Option<PageKey> {
        self.set_at(key, response, Instant::now())
    }

    pub fn set_at(&self, key: PageKey, response: CachedResponse, now: Instant) -> Option<PageKey> {
        let entry = Entry {
            response,
            expires_at: now + self.ttl,
        };
        rw_write(&self.entries, SOURCE, "set")
            .push(key.clone(), entry)
            .and_then(|(evicted, _)| (evicted != key).then_some(evicted))
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
