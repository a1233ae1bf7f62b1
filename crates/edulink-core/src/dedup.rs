//! Cross-run deduplication of reported events.
//!
//! Every behaviour and achievement ID that has ever been surfaced as "new" is
//! kept in one of two persisted sets. A pass loads both sets, filters each API
//! response through them, and writes them back when the pass ends.
//!
//! `DedupTracker` is a scope guard: it persists on `persist()` or, failing
//! that, on drop. An early return or a panic in the middle of a pass still
//! flushes every ID classified so far, so nothing is reported twice.
//!
//! Only one pass may own the sets for a given cache at a time. `persist()`
//! rewrites whole sets, so two concurrent passes would lose each other's IDs.

use std::collections::HashSet;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::cache::{Cache, CacheError};
use crate::models::Event;

pub const SEEN_BEHAVIOUR_KEY: &str = "alreadySeenBehaviourIDs";
pub const SEEN_ACHIEVEMENT_KEY: &str = "alreadySeenAchievementIDs";

/// Dedup state is meant to outlive any deployment; 100 years stands in for "forever".
const SEEN_IDS_TTL_DAYS: i64 = 365 * 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Behaviour,
    Achievement,
}

impl EventKind {
    pub fn cache_key(&self) -> &'static str {
        match self {
            EventKind::Behaviour => SEEN_BEHAVIOUR_KEY,
            EventKind::Achievement => SEEN_ACHIEVEMENT_KEY,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Behaviour => write!(f, "behaviour"),
            EventKind::Achievement => write!(f, "achievement"),
        }
    }
}

/// Ordered set of event IDs. Stored in the cache as a plain JSON array.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct SeenIds {
    ids: Vec<String>,
    index: HashSet<String>,
}

impl From<Vec<String>> for SeenIds {
    fn from(ids: Vec<String>) -> Self {
        let mut seen = SeenIds::default();
        for id in ids {
            seen.insert(id);
        }
        seen
    }
}

impl From<SeenIds> for Vec<String> {
    fn from(seen: SeenIds) -> Self {
        seen.ids
    }
}

impl PartialEq for SeenIds {
    fn eq(&self, other: &Self) -> bool {
        self.ids == other.ids
    }
}

impl Eq for SeenIds {}

impl SeenIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read one set from the cache. A missing key is an empty set; so is an
    /// unreadable one, after a warning, because losing the set must never
    /// stop a pass.
    pub fn load(cache: &Cache, kind: EventKind) -> Self {
        match cache.get::<SeenIds>(kind.cache_key()) {
            Ok(Some(seen)) => seen,
            Ok(None) => {
                debug!(%kind, "No dedup state yet, starting empty");
                SeenIds::new()
            }
            Err(e) => {
                warn!(%kind, error = %e, "Failed to load dedup state, starting empty");
                SeenIds::new()
            }
        }
    }

    pub fn store(&self, cache: &Cache, kind: EventKind) -> Result<(), CacheError> {
        cache.set(
            kind.cache_key(),
            &self.ids,
            Some(Duration::days(SEEN_IDS_TTL_DAYS)),
        )
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    /// Returns false if the ID was already present.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.index.contains(&id) {
            return false;
        }
        self.index.insert(id.clone());
        self.ids.push(id);
        true
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.ids
    }
}

/// Keep events whose ID is not in `seen`, recording each survivor.
/// Survivors keep the order the API returned them in.
pub fn filter_new<E: Event>(events: Vec<E>, seen: &mut SeenIds) -> Vec<E> {
    events
        .into_iter()
        .filter(|event| seen.insert(event.id()))
        .collect()
}

/// Owns the dedup state for the duration of one pass.
pub struct DedupTracker {
    cache: Cache,
    behaviour: SeenIds,
    achievement: SeenIds,
    persisted: bool,
}

impl DedupTracker {
    /// Load both sets. Call this first thing in a pass: from here on the
    /// state is flushed on every exit path.
    pub fn load(cache: &Cache) -> Self {
        let behaviour = SeenIds::load(cache, EventKind::Behaviour);
        let achievement = SeenIds::load(cache, EventKind::Achievement);
        info!(
            behaviour = behaviour.len(),
            achievement = achievement.len(),
            "Loaded already-seen event IDs"
        );

        Self {
            cache: cache.clone(),
            behaviour,
            achievement,
            persisted: false,
        }
    }

    pub fn seen(&self, kind: EventKind) -> &SeenIds {
        match kind {
            EventKind::Behaviour => &self.behaviour,
            EventKind::Achievement => &self.achievement,
        }
    }

    fn seen_mut(&mut self, kind: EventKind) -> &mut SeenIds {
        match kind {
            EventKind::Behaviour => &mut self.behaviour,
            EventKind::Achievement => &mut self.achievement,
        }
    }

    /// Filter events into the pass-wide set for their kind.
    pub fn filter_new<E: Event>(&mut self, events: Vec<E>) -> Vec<E> {
        let total = events.len();
        let fresh = filter_new(events, self.seen_mut(E::KIND));
        debug!(kind = %E::KIND, total, new = fresh.len(), "Filtered events");
        fresh
    }

    /// Write both sets back. Consumes the tracker so it happens once.
    pub fn persist(mut self) -> Result<(), CacheError> {
        self.flush()
    }

    fn flush(&mut self) -> Result<(), CacheError> {
        self.persisted = true;

        // Attempt both writes even if the first one fails
        let behaviour = self.behaviour.store(&self.cache, EventKind::Behaviour);
        let achievement = self.achievement.store(&self.cache, EventKind::Achievement);

        info!(
            behaviour = self.behaviour.len(),
            achievement = self.achievement.len(),
            "Persisted already-seen event IDs"
        );
        behaviour.and(achievement)
    }
}

impl Drop for DedupTracker {
    fn drop(&mut self) {
        if self.persisted {
            return;
        }
        if let Err(e) = self.flush() {
            error!(error = %e, "Failed to persist dedup state on unwind");
        }
    }
}
