//! Cooperative driver for merges and queued changes.

use super::apply::apply_record;
use super::Reconciler;
use crate::watch::WatcherEventQueue;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, trace};

/// What one idle tick accomplished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IdleOutcome {
    /// Merge steps plus records applied.
    pub units: usize,
    pub records_applied: usize,
    pub frames_merged: usize,
    pub merges_completed: usize,
    /// The host or queue was closed; nothing further will run.
    pub closed: bool,
    /// Records or a merge are still pending.
    pub work_remaining: bool,
}

impl IdleOutcome {
    pub(crate) fn absorb(&mut self, other: IdleOutcome) {
        self.units += other.units;
        self.records_applied += other.records_applied;
        self.frames_merged += other.frames_merged;
        self.merges_completed += other.merges_completed;
        self.closed |= other.closed;
        self.work_remaining = other.work_remaining;
    }
}

/// Runs bounded units of work on the consumer thread.
///
/// A unit is either one directory level of the in-progress merge or one
/// queued record. Merges take priority over the queue.
#[derive(Debug)]
pub struct IdleScheduler {
    queue: Arc<WatcherEventQueue>,
    ticks: u64,
}

impl IdleScheduler {
    pub fn new(queue: Arc<WatcherEventQueue>) -> Self {
        Self { queue, ticks: 0 }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run units until `continue_idle` returns false or no work is left.
    pub fn on_idle(
        &mut self,
        cx: &mut Reconciler<'_>,
        mut continue_idle: impl FnMut() -> bool,
    ) -> IdleOutcome {
        self.ticks += 1;
        self.queue.reset_idle_trigger();
        let mut outcome = IdleOutcome::default();

        loop {
            if cx.host.is_closed() || self.queue.is_closed() {
                if self.queue.discard_merger() {
                    debug!("closed, merge abandoned");
                }
                outcome.closed = true;
                return outcome;
            }

            if let Some((mut merger, epoch)) = self.queue.take_merger() {
                outcome.units += 1;
                if merger.continue_merge(cx) {
                    outcome.frames_merged += 1;
                    self.queue.restore_merger(merger, epoch);
                } else {
                    outcome.merges_completed += 1;
                }
            } else if let Some((record, epoch)) = self.queue.dequeue_with_epoch() {
                outcome.units += 1;
                outcome.records_applied += 1;
                if let Some(merger) = apply_record(cx, record) {
                    trace!(origin = ?merger.origin(), "merge scheduled");
                    self.queue.restore_merger(merger, epoch);
                }
            } else {
                break;
            }

            if !continue_idle() {
                break;
            }
        }

        outcome.work_remaining = !self.queue.is_idle();
        outcome
    }
}
