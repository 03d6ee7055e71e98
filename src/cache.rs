//! # Route-Keyed Caches
//!
//! Process-lifetime caches keyed by stable route identity.
//!
//! The congestion segmenter decodes per-edge annotations once per route and
//! reuses them across every overlay refresh; the decoded data lives in a
//! [`RouteCache`] owned by (and injected into) the segmenter instance rather
//! than in process-wide static state. Explicit ownership ties the cache lifetime
//! to one navigation session, and lets tests instantiate independent segmenters.
//!
//! Route identity must be a stable identifier assigned by the route planner, not
//! a hash of mutable route content. Reusing an identifier for a logically
//! different route is a caller bug this cache cannot detect.

use std::collections::HashMap;

/// A keyed cache from stable route identity to an arbitrary per-route value.
///
/// Entries persist until explicitly removed or [`clear`](Self::clear)ed at the
/// end of a navigation session.
#[derive(Debug, Clone)]
pub struct RouteCache<V> {
    entries: HashMap<u64, V>,
}

impl<V> RouteCache<V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Store a value for a route, replacing any previous entry.
    pub fn insert(&mut self, route_id: u64, value: V) {
        self.entries.insert(route_id, value);
    }

    pub fn get(&self, route_id: u64) -> Option<&V> {
        self.entries.get(&route_id)
    }

    pub fn contains(&self, route_id: u64) -> bool {
        self.entries.contains_key(&route_id)
    }

    pub fn remove(&mut self, route_id: u64) -> Option<V> {
        self.entries.remove(&route_id)
    }

    /// Drop every entry. Called when navigation ends.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for RouteCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
