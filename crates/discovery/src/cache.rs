//! Per-label TTL cache owned by the Discovery Directory
//!
//! Each label gets its own async mutex ("slot"). A resolver holds the slot
//! for the whole check-query-store sequence, so concurrent refreshes of one
//! label collapse into a single backend query while other labels proceed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use contracts::{ConsumerRecord, Label};
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Resolved consumers of one label
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub label: Label,
    pub records: Arc<[ConsumerRecord]>,
    pub inserted_at: Instant,
}

impl CacheEntry {
    pub fn new(label: Label, records: Arc<[ConsumerRecord]>) -> Self {
        Self {
            label,
            records,
            inserted_at: Instant::now(),
        }
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.inserted_at)
    }

    /// Valid as a cache hit
    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        self.age(now) < ttl
    }

    /// Still usable in place of a failing backend
    pub fn is_within_grace(&self, now: Instant, ttl: Duration, grace: Duration) -> bool {
        self.age(now) < ttl.saturating_add(grace)
    }
}

pub(crate) type Slot = Arc<Mutex<Option<CacheEntry>>>;

#[derive(Default)]
pub(crate) struct DiscoveryCache {
    slots: Mutex<HashMap<Label, Slot>>,
}

impl DiscoveryCache {
    /// Slot for `label`, created empty on first use
    pub(crate) async fn slot(&self, label: &Label) -> Slot {
        let mut slots = self.slots.lock().await;
        Arc::clone(slots.entry(label.clone()).or_default())
    }

    pub(crate) async fn existing_slot(&self, label: &str) -> Option<Slot> {
        self.slots.lock().await.get(label).cloned()
    }

    pub(crate) async fn all_slots(&self) -> Vec<Slot> {
        self.slots.lock().await.values().cloned().collect()
    }

    /// Drop the slot of `label` if it is empty and nobody else holds it.
    ///
    /// Handles are only handed out under the map lock, so a strong count of
    /// one cannot grow while the lock is held.
    pub(crate) async fn prune(&self, label: &str) -> bool {
        let mut slots = self.slots.lock().await;
        let removable = slots.get(label).is_some_and(|slot| {
            Arc::strong_count(slot) == 1 && slot.try_lock().is_ok_and(|entry| entry.is_none())
        });
        if removable {
            slots.remove(label);
        }
        removable
    }

    /// Forget every slot
    pub(crate) async fn remove_all(&self) {
        self.slots.lock().await.clear();
    }

    pub(crate) async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }
}
