use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::models::{ArpFrame, StoreKey, TrafficClass};

/// Deduplicating table of ARP observations keyed by (sender IP, target IP).
///
/// The first frame stored under a key is kept. Later frames for the same key
/// are handed back to the caller as a collision and never replace the entry.
#[derive(Debug, Default)]
pub struct ArpStore {
    entries: RwLock<HashMap<StoreKey, Arc<ArpFrame>>>,
}

impl ArpStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `frame` if its key is free. On a collision the frame already
    /// stored is returned and `frame` is discarded.
    pub fn put(&self, frame: ArpFrame) -> Option<Arc<ArpFrame>> {
        let key = frame.key();
        let mut entries = self.entries.write();

        if let Some(existing) = entries.get(&key) {
            return Some(Arc::clone(existing));
        }
        entries.insert(key, Arc::new(frame));
        None
    }

    pub fn get(&self, key: &StoreKey) -> Option<Arc<ArpFrame>> {
        self.entries.read().get(key).cloned()
    }

    /// Copy of every entry, detached from the lock.
    pub fn snapshot(&self) -> HashMap<StoreKey, Arc<ArpFrame>> {
        self.entries.read().clone()
    }

    /// All frames, newest observation first.
    pub fn sorted(&self) -> Vec<Arc<ArpFrame>> {
        let mut frames: Vec<_> = self.entries.read().values().cloned().collect();
        frames.sort_by(|a, b| {
            b.observed_at()
                .cmp(&a.observed_at())
                .then_with(|| a.key().cmp(&b.key()))
        });
        frames
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The three per-class stores shared by every Watcher.
#[derive(Debug, Default)]
pub struct ArpTables {
    requests: ArpStore,
    replies: ArpStore,
    gratuitous: ArpStore,
}

impl ArpTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, class: TrafficClass) -> &ArpStore {
        match class {
            TrafficClass::Request => &self.requests,
            TrafficClass::Reply => &self.replies,
            TrafficClass::GratuitousRequest => &self.gratuitous,
        }
    }

    pub fn requests(&self) -> &ArpStore {
        &self.requests
    }

    pub fn replies(&self) -> &ArpStore {
        &self.replies
    }

    pub fn gratuitous(&self) -> &ArpStore {
        &self.gratuitous
    }
}
