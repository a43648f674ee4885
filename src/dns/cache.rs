//! PTR lookup cache

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry {
    hostname: String,
    inserted_at: Instant,
}

/// TTL cache of PTR hostnames keyed by address
#[derive(Debug)]
pub struct PtrCache {
    entries: HashMap<IpAddr, CacheEntry>,
    ttl: Duration,
}

impl PtrCache {
    /// Create a cache whose entries live for `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Cached hostname for `ip`, if present and fresh
    pub fn get(&self, ip: &IpAddr) -> Option<String> {
        self.entries
            .get(ip)
            .filter(|entry| entry.inserted_at.elapsed() < self.ttl)
            .map(|entry| entry.hostname.clone())
    }

    /// Remember `hostname` for `ip`
    pub fn insert(&mut self, ip: IpAddr, hostname: String) {
        self.entries.insert(
            ip,
            CacheEntry {
                hostname,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Number of entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop entries older than the TTL
    pub fn evict_expired(&mut self) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| entry.inserted_at.elapsed() < ttl);
    }
}

impl Default for PtrCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(
            crate::config::defaults::DEFAULT_RDNS_CACHE_TTL_SECS,
        ))
    }
}
