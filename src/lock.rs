//! Per-voyage exclusive access.
//!
//! sled has no row locks, so admission decisions for one voyage are serialized
//! through a process wide registry holding one mutex per voyage id. Slots are
//! created on first use and dropped again once nobody holds or waits on them.
//! Different voyages never contend with each other.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};
use tracing::debug;

use crate::error::{BookingError, Result};

type Slot = Arc<Mutex<()>>;

#[derive(Debug, Default)]
pub struct VoyageLocks {
    slots: Mutex<HashMap<String, Slot>>,
}

/// Exclusive access to one voyage, released on drop.
pub struct VoyageGuard<'a> {
    registry: &'a VoyageLocks,
    voyage_id: String,
    held: Option<ArcMutexGuard<RawMutex, ()>>,
}

impl VoyageLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks up to `wait` for the voyage; a timeout is reported as retryable.
    pub fn acquire(&self, voyage_id: &str, wait: Duration) -> Result<VoyageGuard<'_>> {
        let slot = {
            let mut slots = self.slots.lock();
            slots.entry(voyage_id.to_string()).or_default().clone()
        };

        let held = slot.try_lock_arc_for(wait);
        drop(slot);

        match held {
            Some(held) => {
                debug!(voyage_id, "voyage lock acquired");
                Ok(VoyageGuard {
                    registry: self,
                    voyage_id: voyage_id.to_string(),
                    held: Some(held),
                })
            }
            None => {
                self.prune(voyage_id);
                Err(BookingError::LockTimeout {
                    voyage_id: voyage_id.to_string(),
                    waited: wait,
                })
            }
        }
    }

    /// Number of voyages currently held or waited on.
    pub fn active(&self) -> usize {
        self.slots.lock().len()
    }

    // slots are only cloned under the registry lock, so a count of one here
    // means no holder and no waiter can appear before the removal
    fn prune(&self, voyage_id: &str) {
        let mut slots = self.slots.lock();
        if slots
            .get(voyage_id)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(voyage_id);
        }
    }
}

impl VoyageGuard<'_> {
    pub fn voyage_id(&self) -> &str {
        &self.voyage_id
    }
}

impl Drop for VoyageGuard<'_> {
    fn drop(&mut self) {
        drop(self.held.take());
        self.registry.prune(&self.voyage_id);
        debug!(voyage_id = %self.voyage_id, "voyage lock released");
    }
}
