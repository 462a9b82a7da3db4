//! Write serialization for the product table.
//!
//! Two levels:
//! - a gate (`RwLock<()>`): single-record writers hold it shared, bulk writers
//!   hold it exclusively, so a bulk write never interleaves with a record write
//! - one async mutex per record id, held for the whole read-modify-write of a
//!   single record; the slot is forgotten when its last holder or waiter
//!   releases it, so the table only tracks ids with a write in flight
//!
//! Readers take neither; they go straight to the repository.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use stockroom_core::ProductId;

type Slots = Arc<Mutex<HashMap<ProductId, Slot>>>;

/// One id's mutex plus the number of live leases on it.
#[derive(Debug, Default)]
struct Slot {
    mutex: Arc<AsyncMutex<()>>,
    leases: usize,
}

/// Held while writing one record.
#[derive(Debug)]
pub struct RecordGuard {
    // Drop order: record lock, then the slot lease, then the gate.
    _record: OwnedMutexGuard<()>,
    _lease: SlotLease,
    _gate: OwnedRwLockReadGuard<()>,
}

/// A handle on one id's mutex. When the last lease on an id goes away (guard
/// released or waiter cancelled) the slot is removed from the table.
#[derive(Debug)]
struct SlotLease {
    id: ProductId,
    slots: Slots,
    mutex: Arc<AsyncMutex<()>>,
}

impl Drop for SlotLease {
    fn drop(&mut self) {
        let mut slots = lock_slots(&self.slots);
        if let Some(slot) = slots.get_mut(&self.id) {
            slot.leases -= 1;
            if slot.leases == 0 {
                slots.remove(&self.id);
            }
        }
    }
}

/// Held while inserting (no existing record can be affected).
#[derive(Debug)]
pub struct SharedGuard {
    _gate: OwnedRwLockReadGuard<()>,
}

/// Held while writing an arbitrary set of records.
#[derive(Debug)]
pub struct BulkGuard {
    _gate: OwnedRwLockWriteGuard<()>,
}

#[derive(Debug, Default)]
pub struct RecordLocks {
    gate: Arc<RwLock<()>>,
    slots: Slots,
}

impl RecordLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn shared(&self) -> SharedGuard {
        SharedGuard {
            _gate: self.gate.clone().read_owned().await,
        }
    }

    pub async fn record(&self, id: ProductId) -> RecordGuard {
        let gate = self.gate.clone().read_owned().await;
        let lease = self.lease(id);
        let record = lease.mutex.clone().lock_owned().await;
        RecordGuard {
            _record: record,
            _lease: lease,
            _gate: gate,
        }
    }

    pub async fn bulk(&self) -> BulkGuard {
        BulkGuard {
            _gate: self.gate.clone().write_owned().await,
        }
    }

    /// Ids with a record write held or waiting.
    pub fn tracked(&self) -> usize {
        lock_slots(&self.slots).len()
    }

    fn lease(&self, id: ProductId) -> SlotLease {
        let mut slots = lock_slots(&self.slots);
        let slot = slots.entry(id).or_default();
        slot.leases += 1;
        SlotLease {
            id,
            slots: self.slots.clone(),
            mutex: slot.mutex.clone(),
        }
    }
}

fn lock_slots(slots: &Slots) -> MutexGuard<'_, HashMap<ProductId, Slot>> {
    // The map only holds mutex handles; a panic elsewhere cannot corrupt it.
    slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_record_is_exclusive() {
        let locks = Arc::new(RecordLocks::new());
        let id = ProductId::from_raw(1);

        let held = locks.record(id).await;
        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move { locks.record(id).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(held);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn different_records_do_not_block_each_other() {
        let locks = RecordLocks::new();
        let _a = locks.record(ProductId::from_raw(1)).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.record(ProductId::from_raw(2))).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn bulk_waits_for_record_writers() {
        let locks = Arc::new(RecordLocks::new());
        let held = locks.record(ProductId::from_raw(1)).await;

        let bulk = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.bulk().await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!bulk.is_finished());

        drop(held);
        tokio::time::timeout(Duration::from_secs(1), bulk).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn released_slots_are_forgotten() {
        let locks = RecordLocks::new();
        drop(locks.record(ProductId::from_raw(1)).await);
        let held = locks.record(ProductId::from_raw(2)).await;
        assert_eq!(locks.tracked(), 1);

        drop(held);
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn slot_survives_while_a_waiter_is_queued() {
        let locks = Arc::new(RecordLocks::new());
        let id = ProductId::from_raw(9);

        let held = locks.record(id).await;
        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.record(id).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(held);
        assert_eq!(locks.tracked(), 1);

        tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn cancelled_waiter_does_not_leak_its_slot() {
        let locks = RecordLocks::new();
        let id = ProductId::from_raw(4);

        let held = locks.record(id).await;
        let gave_up = tokio::time::timeout(Duration::from_millis(20), locks.record(id)).await;
        assert!(gave_up.is_err());

        drop(held);
        assert_eq!(locks.tracked(), 0);
    }
}
