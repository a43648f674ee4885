//! ASN lookup cache keyed by announced prefix

use super::whois::IspRecord;
use ipnet::IpNet;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};

/// Thread-safe cache of ownership records by CIDR prefix
///
/// Every address inside a cached prefix hits the same entry.
#[derive(Debug, Clone, Default)]
pub struct AsnCache {
    cache: Arc<Mutex<HashMap<IpNet, IspRecord>>>,
}

impl AsnCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for `ip`, rewritten to describe that address
    pub fn get(&self, ip: &IpAddr) -> Option<IspRecord> {
        let cache = self.cache.lock().expect("mutex poisoned");
        cache
            .iter()
            .filter(|(prefix, _)| prefix.contains(ip))
            .max_by_key(|(prefix, _)| prefix.prefix_len())
            .map(|(_, record)| IspRecord {
                ip: ip.to_string(),
                ..record.clone()
            })
    }

    /// Cache `record` under its BGP prefix
    ///
    /// Records without a parseable prefix are not cached.
    pub fn insert(&self, record: &IspRecord) -> bool {
        let Ok(prefix) = record.bgp_prefix.parse::<IpNet>() else {
            return false;
        };
        let mut cache = self.cache.lock().expect("mutex poisoned");
        cache.insert(prefix.trunc(), record.clone());
        true
    }

    /// Get the number of entries in the cache
    pub fn len(&self) -> usize {
        self.cache.lock().expect("mutex poisoned").len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.cache.lock().expect("mutex poisoned").is_empty()
    }

    /// Clear all entries from the cache
    pub fn clear(&self) {
        self.cache.lock().expect("mutex poisoned").clear();
    }
}
