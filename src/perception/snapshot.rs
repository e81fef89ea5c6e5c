//! Latest-wins landmark slot
//!
//! A single-slot overwrite buffer between the frame loop (producer) and the
//! poll timer (consumer). Writes replace the whole reference; readers get the
//! newest snapshot or nothing. Each producer writes under an epoch obtained
//! from [`SnapshotSlot::begin`]; [`SnapshotSlot::close`] retires the epoch so
//! a write that lands after cancellation is dropped.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::types::LandmarkSnapshot;

/// Producer token for [`SnapshotSlot::publish`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Epoch(u64);

#[derive(Debug, Default)]
struct SlotInner {
    latest: Option<Arc<LandmarkSnapshot>>,
    epoch: u64,
    open: bool,
}

#[derive(Debug, Default)]
pub struct SnapshotSlot {
    inner: Mutex<SlotInner>,
}

impl SnapshotSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SlotInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Open a fresh epoch for a new producer, retiring any previous one
    pub fn begin(&self) -> Epoch {
        let mut inner = self.lock();
        inner.epoch += 1;
        inner.open = true;
        inner.latest = None;
        Epoch(inner.epoch)
    }

    /// Replace the current snapshot; `None` records "no hand in frame"
    ///
    /// Returns `false` when `epoch` has been retired and nothing was written.
    pub fn publish(&self, epoch: Epoch, snapshot: Option<LandmarkSnapshot>) -> bool {
        let mut inner = self.lock();
        if !inner.open || inner.epoch != epoch.0 {
            return false;
        }
        inner.latest = snapshot.map(Arc::new);
        true
    }

    /// Retire the current epoch and drop the held snapshot
    pub fn close(&self) {
        let mut inner = self.lock();
        inner.epoch += 1;
        inner.open = false;
        inner.latest = None;
    }

    pub fn latest(&self) -> Option<Arc<LandmarkSnapshot>> {
        self.lock().latest.clone()
    }
}
