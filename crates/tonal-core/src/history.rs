//! Undo/redo history over immutable adjustment snapshots.
//!
//! Continuous edits (slider drags, curve point drags) arrive far faster than
//! a user would want to undo them. [`HistoryManager::record`] holds the
//! latest value as *pending* and only commits it once the debounce window
//! has elapsed with no newer value; intermediate values in a burst are
//! discarded. Discrete actions use [`HistoryManager::record_immediate`].
//!
//! The manager is a synchronous state machine. Time is injected through the
//! `*_at` methods; a runtime driver (see `tonal-render`) owns the actual
//! timer and calls back with the [`PendingTicket`] it was armed with.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::transform::params::AdjustmentParameters;

/// Default number of snapshots kept.
pub const DEFAULT_CAPACITY: usize = 50;

/// Default quiet period before a pending edit is committed.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Identifies one scheduled pending commit. A newer `record` invalidates
/// every earlier ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTicket(u64);

#[derive(Debug, Clone)]
struct PendingCommit {
    value: AdjustmentParameters,
    deadline: Instant,
    ticket: PendingTicket,
}

/// Capped undo/redo stack plus a single debounced pending value.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    entries: VecDeque<AdjustmentParameters>,
    /// Index of the current snapshot; `None` while empty.
    cursor: Option<usize>,
    capacity: usize,
    debounce: Duration,
    pending: Option<PendingCommit>,
    next_ticket: u64,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_DEBOUNCE)
    }
}

impl HistoryManager {
    /// Empty history. A capacity of zero is treated as one.
    pub fn new(capacity: usize, debounce: Duration) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.max(1)),
            cursor: None,
            capacity: capacity.max(1),
            debounce,
            pending: None,
            next_ticket: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Snapshot at the cursor.
    pub fn current(&self) -> Option<&AdjustmentParameters> {
        self.cursor.and_then(|i| self.entries.get(i))
    }

    pub fn entries(&self) -> impl Iterator<Item = &AdjustmentParameters> {
        self.entries.iter()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending value becomes due, if there is one.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor.is_some_and(|c| c > 0)
    }

    pub fn can_redo(&self) -> bool {
        match self.cursor {
            Some(c) => c + 1 < self.entries.len(),
            None => !self.entries.is_empty(),
        }
    }

    /// Record a continuous edit, debounced against the wall clock.
    pub fn record(&mut self, value: AdjustmentParameters) -> Option<PendingTicket> {
        self.record_at(value, Instant::now())
    }

    /// Record a continuous edit observed at `now`.
    ///
    /// A value equal to the current snapshot is a no-op and drops any
    /// pending value, since the burst returned to where it started.
    /// Otherwise the value replaces any pending one and the debounce window
    /// restarts. Returns the ticket a timer should commit with.
    pub fn record_at(&mut self, value: AdjustmentParameters, now: Instant) -> Option<PendingTicket> {
        if self.current() == Some(&value) {
            self.pending = None;
            return None;
        }
        let ticket = PendingTicket(self.next_ticket);
        self.next_ticket += 1;
        self.pending = Some(PendingCommit {
            value,
            deadline: now + self.debounce,
            ticket,
        });
        Some(ticket)
    }

    /// Commit a discrete edit synchronously, cancelling any pending value.
    pub fn record_immediate(&mut self, value: AdjustmentParameters) {
        self.pending = None;
        self.commit(value);
    }

    /// Commit the pending value if its deadline has passed by `now`.
    pub fn poll_at(&mut self, now: Instant) -> bool {
        match &self.pending {
            Some(p) if p.deadline <= now => self.flush(),
            _ => false,
        }
    }

    /// Commit the pending value if its deadline has passed.
    pub fn poll(&mut self) -> bool {
        self.poll_at(Instant::now())
    }

    /// Commit the pending value if it is still the one `ticket` was issued for.
    pub fn commit_ticket(&mut self, ticket: PendingTicket) -> bool {
        match &self.pending {
            Some(p) if p.ticket == ticket => self.flush(),
            _ => false,
        }
    }

    /// Commit any pending value now. Safe to call with nothing pending.
    pub fn flush(&mut self) -> bool {
        match self.pending.take() {
            Some(p) => {
                self.commit(p.value);
                true
            }
            None => false,
        }
    }

    fn commit(&mut self, value: AdjustmentParameters) {
        // Drop the redo tail.
        let keep = self.cursor.map_or(0, |c| c + 1);
        self.entries.truncate(keep);

        self.entries.push_back(value);
        if self.entries.len() > self.capacity {
            self.entries.pop_front();
            tracing::trace!("history full, evicted oldest snapshot");
        }
        self.cursor = Some(self.entries.len() - 1);
        tracing::debug!("history commit, {} snapshots", self.entries.len());
    }

    /// Step back one snapshot. Returns `None` at the oldest snapshot.
    pub fn undo(&mut self) -> Option<AdjustmentParameters> {
        self.flush();
        let target = self.cursor?.checked_sub(1)?;
        self.cursor = Some(target);
        self.entries.get(target).cloned()
    }

    /// Step forward one snapshot. Returns `None` at the newest snapshot.
    pub fn redo(&mut self) -> Option<AdjustmentParameters> {
        self.flush();
        let target = self.cursor.map_or(0, |c| c + 1);
        let value = self.entries.get(target).cloned()?;
        self.cursor = Some(target);
        Some(value)
    }

    /// Move the cursor directly. Returns `None` if `index` is out of range.
    pub fn jump_to(&mut self, index: usize) -> Option<AdjustmentParameters> {
        self.flush();
        let value = self.entries.get(index).cloned()?;
        self.cursor = Some(index);
        Some(value)
    }

    /// Forget every snapshot and any pending value.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
        self.pending = None;
    }
}
