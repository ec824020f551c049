// src/dedup.rs
//! Remembers which listings were already reported.
//!
//! Keys are the raw identity strings. The default store only grows; a bounded
//! store with least-recently-seen eviction can be swapped in through config.

use std::collections::{HashMap, HashSet, VecDeque};

use metrics::gauge;

use crate::source::CandidateRecord;

pub trait SeenStore: Send + Sync {
    /// Record `identity`; returns true when it had not been seen before.
    fn insert(&mut self, identity: &str) -> bool;
    fn contains(&self, identity: &str) -> bool;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Unbounded set; identities are never removed.
#[derive(Debug, Default)]
pub struct InMemorySeenStore {
    seen: HashSet<String>,
}

impl InMemorySeenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SeenStore for InMemorySeenStore {
    fn insert(&mut self, identity: &str) -> bool {
        if self.seen.contains(identity) {
            return false;
        }
        self.seen.insert(identity.to_string())
    }

    fn contains(&self, identity: &str) -> bool {
        self.seen.contains(identity)
    }

    fn len(&self) -> usize {
        self.seen.len()
    }
}

/// Capacity-bounded store evicting the least recently seen identity.
///
/// Every sighting (new or repeated) refreshes recency. `order` may hold stale
/// entries for refreshed identities; they are skipped on eviction and dropped
/// when the queue is compacted.
#[derive(Debug)]
pub struct BoundedSeenStore {
    cap: usize,
    tick: u64,
    last_seen: HashMap<String, u64>,
    order: VecDeque<(u64, String)>,
}

impl BoundedSeenStore {
    /// `cap` of 0 is treated as 1.
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            cap,
            tick: 0,
            last_seen: HashMap::with_capacity(cap.min(100_000)),
            order: VecDeque::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    fn evict_over_capacity(&mut self) {
        while self.last_seen.len() > self.cap {
            let Some((t, id)) = self.order.pop_front() else {
                break;
            };
            if self.last_seen.get(&id) == Some(&t) {
                self.last_seen.remove(&id);
            }
        }
    }

    fn compact(&mut self) {
        if self.order.len() <= self.cap.saturating_mul(2) {
            return;
        }
        let last_seen = &self.last_seen;
        self.order.retain(|(t, id)| last_seen.get(id) == Some(t));
    }
}

impl SeenStore for BoundedSeenStore {
    fn insert(&mut self, identity: &str) -> bool {
        self.tick += 1;
        let fresh = self
            .last_seen
            .insert(identity.to_string(), self.tick)
            .is_none();
        self.order.push_back((self.tick, identity.to_string()));
        self.evict_over_capacity();
        self.compact();
        fresh
    }

    fn contains(&self, identity: &str) -> bool {
        self.last_seen.contains_key(identity)
    }

    fn len(&self) -> usize {
        self.last_seen.len()
    }
}

/// Decides, per candidate, whether it is new.
pub struct Deduplicator {
    store: Box<dyn SeenStore>,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new(Box::new(InMemorySeenStore::new()))
    }
}

impl Deduplicator {
    pub fn new(store: Box<dyn SeenStore>) -> Self {
        Self { store }
    }

    /// Marks `identity` seen; true when this is its first sighting.
    ///
    /// Per-item form of [`Self::filter_new`]. The poller calls it item by
    /// item so that broken listings share the same seen set.
    pub fn mark_new(&mut self, identity: &str) -> bool {
        let fresh = self.store.insert(identity);
        gauge!("watcher_seen_identities").set(self.store.len() as f64);
        fresh
    }

    /// Keep only unseen candidates, in input order, and remember them.
    /// Batch form for callers holding plain candidates.
    pub fn filter_new(&mut self, candidates: Vec<CandidateRecord>) -> Vec<CandidateRecord> {
        candidates
            .into_iter()
            .filter(|c| self.mark_new(&c.identity))
            .collect()
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.store.contains(identity)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
