//! Thread-safe hand-off between watcher threads and the idle consumer.
//!
//! Watcher callbacks call [`WatcherEventQueue::enqueue`] and
//! [`WatcherEventQueue::on_overflow`] from any thread. The single consumer
//! drains records and parks its in-progress [`DiskMerger`] in the same
//! shared state, so an overflow can discard a merge atomically with the
//! pending records.

use super::events::{ChangeRecord, RawEvent};
use crate::sync::merger::DiskMerger;
use crate::types::WatcherId;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Host callback that schedules an idle tick.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct QueueState {
    records: VecDeque<ChangeRecord>,
    merger: Option<DiskMerger>,
    epoch: u64,
    closed: bool,
    stats: QueueStats,
}

/// Counters for status reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub enqueued: u64,
    pub dropped_path_too_long: u64,
    pub dropped_during_rescan: u64,
    pub overflows: u64,
}

pub struct WatcherEventQueue {
    state: Mutex<QueueState>,
    idle_triggered: AtomicBool,
    waker: Mutex<Option<Waker>>,
    capacity: usize,
    max_path_len: usize,
}

impl std::fmt::Debug for WatcherEventQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherEventQueue")
            .field("pending", &self.len())
            .field("capacity", &self.capacity)
            .field("max_path_len", &self.max_path_len)
            .finish()
    }
}

impl WatcherEventQueue {
    pub fn new(capacity: usize, max_path_len: usize) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            idle_triggered: AtomicBool::new(false),
            waker: Mutex::new(None),
            capacity: capacity.max(1),
            max_path_len,
        }
    }

    /// Install the callback invoked by the first enqueue after each idle tick.
    pub fn set_waker(&self, waker: Waker) {
        *self.waker.lock() = Some(waker);
    }

    /// Record one raw notification.
    pub fn enqueue(&self, event: RawEvent) {
        let records = event.into_records();
        let overflowed = {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            if state.records.front().is_some_and(ChangeRecord::is_full_rescan) {
                trace!("full rescan pending, dropping event");
                state.stats.dropped_during_rescan += records.len() as u64;
                return;
            }

            let mut overflowed = false;
            for record in records {
                if record.path_len() > self.max_path_len {
                    debug!(path = %record.path.display(), "path too long, dropping event");
                    state.stats.dropped_path_too_long += 1;
                    continue;
                }
                if state.records.len() >= self.capacity {
                    warn!(capacity = self.capacity, "watcher queue full");
                    Self::overflow_locked(&mut state, None);
                    overflowed = true;
                    break;
                }
                trace!(kind = ?record.kind, path = %record.path.display(), "enqueued");
                state.records.push_back(record);
                state.stats.enqueued += 1;
            }
            overflowed
        };
        if overflowed {
            warn!("queue overflow, full rescan scheduled");
        }
        self.trigger_idle();
    }

    /// Drop everything pending, including any in-progress merge, and
    /// schedule one full rescan.
    pub fn on_overflow(&self, watcher: Option<WatcherId>) {
        {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            Self::overflow_locked(&mut state, watcher);
        }
        match watcher {
            Some(id) => warn!(watcher = %id, "watcher overflow, full rescan scheduled"),
            None => warn!("watcher overflow, full rescan scheduled"),
        }
        self.trigger_idle();
    }

    fn overflow_locked(state: &mut QueueState, watcher: Option<WatcherId>) {
        state.records.clear();
        state.merger = None;
        state.epoch = state.epoch.wrapping_add(1);
        state.stats.overflows += 1;
        state.records.push_back(ChangeRecord::full_rescan(watcher));
    }

    pub fn dequeue_one(&self) -> Option<ChangeRecord> {
        self.state.lock().records.pop_front()
    }

    /// Dequeue together with the epoch it was dequeued under.
    pub(crate) fn dequeue_with_epoch(&self) -> Option<(ChangeRecord, u64)> {
        let mut state = self.state.lock();
        let epoch = state.epoch;
        state.records.pop_front().map(|record| (record, epoch))
    }

    /// Check the in-progress merger out for one unit of work.
    pub(crate) fn take_merger(&self) -> Option<(DiskMerger, u64)> {
        let mut state = self.state.lock();
        let epoch = state.epoch;
        state.merger.take().map(|merger| (merger, epoch))
    }

    /// Put a merger back unless an overflow or close happened since `epoch`.
    pub(crate) fn restore_merger(&self, merger: DiskMerger, epoch: u64) -> bool {
        let mut state = self.state.lock();
        if state.closed || state.epoch != epoch || state.merger.is_some() {
            debug!("discarding stale merger");
            return false;
        }
        state.merger = Some(merger);
        true
    }

    pub(crate) fn discard_merger(&self) -> bool {
        self.state.lock().merger.take().is_some()
    }

    pub fn has_merger(&self) -> bool {
        self.state.lock().merger.is_some()
    }

    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().records.is_empty()
    }

    /// True when neither records nor a merge are pending.
    pub fn is_idle(&self) -> bool {
        let state = self.state.lock();
        state.records.is_empty() && state.merger.is_none()
    }

    pub fn epoch(&self) -> u64 {
        self.state.lock().epoch
    }

    pub fn stats(&self) -> QueueStats {
        self.state.lock().stats
    }

    /// Stop accepting work and drop whatever is pending.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.records.clear();
        state.merger = None;
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Re-arm the trigger; called at the start of every idle tick.
    pub(crate) fn reset_idle_trigger(&self) {
        self.idle_triggered.store(false, Ordering::Release);
    }

    fn trigger_idle(&self) {
        if self.idle_triggered.swap(true, Ordering::AcqRel) {
            return;
        }
        let waker = self.waker.lock().clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}
