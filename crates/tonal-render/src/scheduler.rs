//! Coalescing render loop over a one-value mailbox.
//!
//! Producers overwrite a single pending slot; one consumer task drains it.
//! At most one render runs at a time, intermediate values are dropped, and
//! the newest value is always rendered once the current render finishes.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::time::Instant;
use tonal_core::transform::params::AdjustmentParameters;

use crate::renderer::RenderTarget;

/// Counters reported by [`RenderScheduler::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub completed: u64,
    pub failed: u64,
}

#[derive(Default)]
struct Slot {
    pending: Option<AdjustmentParameters>,
    running: bool,
    last_completed: Option<Instant>,
    stats: RenderStats,
}

struct Shared {
    slot: Mutex<Slot>,
    target: Arc<dyn RenderTarget>,
    throttle: Duration,
    runtime: Handle,
    idle: Notify,
}

/// Single-consumer render scheduler. Cloning shares the same slot.
#[derive(Clone)]
pub struct RenderScheduler {
    shared: Arc<Shared>,
}

impl RenderScheduler {
    /// Scheduler spawning onto the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new(target: Arc<dyn RenderTarget>, throttle: Duration) -> Self {
        Self::with_handle(target, throttle, Handle::current())
    }

    /// Scheduler spawning onto `runtime`. A zero `throttle` disables throttling.
    pub fn with_handle(target: Arc<dyn RenderTarget>, throttle: Duration, runtime: Handle) -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot::default()),
                target,
                throttle,
                runtime,
                idle: Notify::new(),
            }),
        }
    }

    pub fn throttle(&self) -> Duration {
        self.shared.throttle
    }

    /// Replace the pending value and start the consumer if it is not running.
    pub fn enqueue(&self, params: AdjustmentParameters) {
        let mut slot = self.shared.slot.lock();
        if slot.pending.replace(params).is_some() {
            tracing::trace!("render coalesced");
        }
        if !slot.running {
            slot.running = true;
            drop(slot);
            tracing::debug!("render loop started");
            self.shared.runtime.spawn(run_loop(Arc::clone(&self.shared)));
        }
    }

    /// Drop the pending value. A render already in flight is unaffected.
    /// Returns whether anything was pending.
    pub fn cancel_pending(&self) -> bool {
        self.shared.slot.lock().pending.take().is_some()
    }

    pub fn has_pending(&self) -> bool {
        self.shared.slot.lock().pending.is_some()
    }

    /// True when nothing is pending and no render is in flight.
    pub fn is_idle(&self) -> bool {
        let slot = self.shared.slot.lock();
        !slot.running && slot.pending.is_none()
    }

    /// Wait until the loop has drained the slot and exited.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent exit is not missed.
            notified.as_mut().enable();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    /// Number of renders that finished successfully.
    pub fn render_count(&self) -> u64 {
        self.shared.slot.lock().stats.completed
    }

    pub fn stats(&self) -> RenderStats {
        self.shared.slot.lock().stats
    }
}

async fn run_loop(shared: Arc<Shared>) {
    loop {
        // Sleep before taking so the value rendered is the freshest one.
        let wait = {
            let slot = shared.slot.lock();
            slot.last_completed
                .map(|t| (t + shared.throttle).saturating_duration_since(Instant::now()))
        };
        if let Some(wait) = wait
            && !wait.is_zero()
        {
            tokio::time::sleep(wait).await;
        }

        let next = {
            let mut slot = shared.slot.lock();
            match slot.pending.take() {
                Some(params) => params,
                None => {
                    slot.running = false;
                    drop(slot);
                    tracing::debug!("render loop idle");
                    shared.idle.notify_waiters();
                    return;
                }
            }
        };

        // The future is built inside its own task so a target that panics,
        // while building it or while polling it, surfaces as a JoinError.
        let target = Arc::clone(&shared.target);
        let render = shared.runtime.spawn(async move { target.render(next).await });
        let outcome = match render.await {
            Ok(result) => result,
            Err(e) => Err(e.into()),
        };

        let mut slot = shared.slot.lock();
        slot.last_completed = Some(Instant::now());
        match outcome {
            Ok(()) => slot.stats.completed += 1,
            Err(e) => {
                slot.stats.failed += 1;
                tracing::warn!("render failed: {e}");
            }
        }
    }
}
