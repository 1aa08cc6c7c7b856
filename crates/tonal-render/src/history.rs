//! Timer-driven wrapper around [`HistoryManager`].
//!
//! Each `record` aborts the outstanding timer and arms a new one; when it
//! fires it commits with the ticket it was armed with, so a timer that was
//! already past its sleep when aborted cannot commit a superseded value.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tonal_core::history::HistoryManager;
use tonal_core::transform::params::AdjustmentParameters;

pub struct DebouncedHistory {
    inner: Arc<Mutex<HistoryManager>>,
    timer: Mutex<Option<JoinHandle<()>>>,
    runtime: Handle,
}

impl DebouncedHistory {
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new(capacity: usize, debounce: Duration) -> Self {
        Self::with_handle(HistoryManager::new(capacity, debounce), Handle::current())
    }

    pub fn with_handle(manager: HistoryManager, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(Mutex::new(manager)),
            timer: Mutex::new(None),
            runtime,
        }
    }

    /// Abort the outstanding timer and run `f` on the manager while the timer
    /// slot stays locked, so no concurrent `record` can arm a timer in between.
    fn with_timer_cancelled<R>(&self, f: impl FnOnce(&mut HistoryManager) -> R) -> R {
        let mut timer = self.timer.lock();
        if let Some(outstanding) = timer.take() {
            outstanding.abort();
        }
        f(&mut self.inner.lock())
    }

    /// Record a continuous edit; it commits after the debounce window if no
    /// newer value arrives first.
    pub fn record(&self, value: AdjustmentParameters) {
        // Lock order is timer slot, then manager. Issuing the ticket and
        // storing its timer happen under one timer lock.
        let mut timer = self.timer.lock();
        if let Some(outstanding) = timer.take() {
            outstanding.abort();
        }
        let (ticket, debounce) = {
            let mut history = self.inner.lock();
            (history.record(value), history.debounce())
        };
        let Some(ticket) = ticket else {
            return;
        };

        let inner = Arc::clone(&self.inner);
        *timer = Some(self.runtime.spawn(async move {
            tokio::time::sleep(debounce).await;
            if inner.lock().commit_ticket(ticket) {
                tracing::debug!("debounced edit committed");
            }
        }));
    }

    /// Commit a discrete edit now, dropping any pending value.
    pub fn record_immediate(&self, value: AdjustmentParameters) {
        self.with_timer_cancelled(|history| history.record_immediate(value));
    }

    /// Commit any pending value now.
    pub fn flush(&self) -> bool {
        self.with_timer_cancelled(HistoryManager::flush)
    }

    pub fn undo(&self) -> Option<AdjustmentParameters> {
        self.with_timer_cancelled(HistoryManager::undo)
    }

    pub fn redo(&self) -> Option<AdjustmentParameters> {
        self.with_timer_cancelled(HistoryManager::redo)
    }

    pub fn jump_to(&self, index: usize) -> Option<AdjustmentParameters> {
        self.with_timer_cancelled(|history| history.jump_to(index))
    }

    pub fn can_undo(&self) -> bool {
        self.inner.lock().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.inner.lock().can_redo()
    }

    pub fn has_pending(&self) -> bool {
        self.inner.lock().has_pending()
    }

    pub fn current(&self) -> Option<AdjustmentParameters> {
        self.inner.lock().current().cloned()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.inner.lock().cursor()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Copy of every committed snapshot, oldest first.
    pub fn snapshots(&self) -> Vec<AdjustmentParameters> {
        self.inner.lock().entries().cloned().collect()
    }
}

impl Drop for DebouncedHistory {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.get_mut().take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEBOUNCE: Duration = Duration::from_millis(300);

    fn edit(exposure: f32) -> AdjustmentParameters {
        AdjustmentParameters {
            exposure,
            ..Default::default()
        }
    }

    fn seeded() -> DebouncedHistory {
        let history = DebouncedHistory::new(50, DEBOUNCE);
        history.record_immediate(AdjustmentParameters::default());
        history
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_commits_last_value_after_quiet_period() {
        let history = seeded();
        for i in 1..=10 {
            history.record(edit(i as f32));
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(history.len(), 1, "committed inside the window");

        tokio::time::sleep(DEBOUNCE).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history.current(), Some(edit(10.0)));
        assert!(!history.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_edits_commit_separately() {
        let history = seeded();
        history.record(edit(1.0));
        tokio::time::sleep(DEBOUNCE * 2).await;
        history.record(edit(2.0));
        tokio::time::sleep(DEBOUNCE * 2).await;
        assert_eq!(history.snapshots(), vec![AdjustmentParameters::default(), edit(1.0), edit(2.0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_immediate_cancels_timer() {
        let history = seeded();
        history.record(edit(1.0));
        history.record_immediate(edit(2.0));
        tokio::time::sleep(DEBOUNCE * 2).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history.current(), Some(edit(2.0)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_commits_without_waiting() {
        let history = seeded();
        history.record(edit(1.0));
        assert!(history.flush());
        assert!(!history.flush());
        assert_eq!(history.current(), Some(edit(1.0)));
        tokio::time::sleep(DEBOUNCE * 2).await;
        assert_eq!(history.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_records_leave_nothing_pending() {
        let history = Arc::new(DebouncedHistory::new(50, Duration::from_millis(20)));
        history.record_immediate(AdjustmentParameters::default());

        let writers: Vec<_> = (0..4)
            .map(|writer| {
                let history = Arc::clone(&history);
                tokio::task::spawn_blocking(move || {
                    for i in 1..=200 {
                        history.record(edit((writer * 1000 + i) as f32));
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap();
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!history.has_pending(), "latest edit never committed");
        assert!(history.len() >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_undo_commits_pending_then_steps_back() {
        let history = seeded();
        history.record(edit(1.0));
        assert_eq!(history.undo(), Some(AdjustmentParameters::default()));
        assert!(history.can_redo());
        assert_eq!(history.redo(), Some(edit(1.0)));
        assert_eq!(history.jump_to(0), Some(AdjustmentParameters::default()));
        assert_eq!(history.cursor(), Some(0));
    }
}
