//! Per-profile cache of rendered watchlists.
//!
//! Owned by the caller (normally [`CardWatch`](crate::CardWatch)), never
//! ambient module state. Writers invalidate explicitly; entries also expire
//! after a fixed TTL.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config;
use crate::models::CardView;

struct Entry {
    stored_at: Instant,
    views: Vec<CardView>,
}

/// Watchlist views keyed by profile name.
pub struct ViewCache {
    /// How long an entry stays fresh.
    pub ttl: Duration,
    entries: HashMap<String, Entry>,
}

impl Default for ViewCache {
    fn default() -> Self {
        Self::new(config::DEFAULT_CACHE_TTL)
    }
}

impl ViewCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Fresh views for `profile`, if any. Expired entries are dropped.
    pub fn get(&mut self, profile: &str) -> Option<Vec<CardView>> {
        let expired = match self.entries.get(profile) {
            None => return None,
            Some(entry) => entry.stored_at.elapsed() >= self.ttl,
        };
        if expired {
            debug!(profile, "watchlist cache entry expired");
            self.entries.remove(profile);
            return None;
        }
        self.entries.get(profile).map(|e| e.views.clone())
    }

    pub fn put(&mut self, profile: &str, views: Vec<CardView>) {
        self.entries.insert(
            profile.to_string(),
            Entry {
                stored_at: Instant::now(),
                views,
            },
        );
    }

    pub fn invalidate(&mut self, profile: &str) {
        self.entries.remove(profile);
    }

    /// Drop every entry. Cards are shared between profiles, so any card
    /// write can change several watchlists.
    pub fn invalidate_all(&mut self) {
        if !self.entries.is_empty() {
            debug!(entries = self.entries.len(), "watchlist cache cleared");
        }
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
