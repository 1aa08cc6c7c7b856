//! One image's editing session: the current value, its history and its
//! render scheduler.
//!
//! Every change flows the same way: a new [`AdjustmentParameters`] value is
//! recorded in history and enqueued for rendering. Continuous edits are
//! debounced into history; discrete actions (presets, calibrations, undo)
//! are committed at once.

use std::sync::Arc;

use tonal_core::grading::levels::{AutoLevels, LevelSamples, apply_three_point};
use tonal_core::grading::white_balance::{apply_white_balance, auto_white_balance};
use tonal_core::scopes::Sampler;
use tonal_core::transform::params::AdjustmentParameters;

use crate::config::EngineConfig;
use crate::history::DebouncedHistory;
use crate::renderer::RenderTarget;
use crate::scheduler::RenderScheduler;

pub struct EditSession {
    current: AdjustmentParameters,
    history: DebouncedHistory,
    scheduler: RenderScheduler,
    config: EngineConfig,
}

impl EditSession {
    /// Start a session at `initial`, committing it as the first snapshot and
    /// rendering it.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn open(initial: AdjustmentParameters, config: EngineConfig, target: Arc<dyn RenderTarget>) -> Self {
        let history = DebouncedHistory::new(config.history_capacity, config.debounce());
        let scheduler = RenderScheduler::new(target, config.throttle_interval());
        history.record_immediate(initial.clone());
        scheduler.enqueue(initial.clone());
        tracing::info!(
            "edit session opened, history capacity {}, {} fps cap",
            config.history_capacity,
            config.max_fps
        );
        Self {
            current: initial,
            history,
            scheduler,
            config,
        }
    }

    pub fn current(&self) -> &AdjustmentParameters {
        &self.current
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn history(&self) -> &DebouncedHistory {
        &self.history
    }

    pub fn scheduler(&self) -> &RenderScheduler {
        &self.scheduler
    }

    /// A continuous edit. Equal values are ignored.
    pub fn edit(&mut self, value: AdjustmentParameters) {
        if value == self.current {
            return;
        }
        self.current = value;
        self.history.record(self.current.clone());
        self.scheduler.enqueue(self.current.clone());
    }

    /// A continuous edit expressed as a change to the current value.
    pub fn edit_with(&mut self, change: impl FnOnce(&mut AdjustmentParameters)) {
        let mut next = self.current.clone();
        change(&mut next);
        self.edit(next);
    }

    /// A discrete replacement of the whole value, committed immediately.
    pub fn apply_preset(&mut self, value: AdjustmentParameters) {
        if value == self.current {
            return;
        }
        self.commit_discrete(value);
    }

    fn commit_discrete(&mut self, value: AdjustmentParameters) {
        self.current = value;
        self.history.record_immediate(self.current.clone());
        self.scheduler.enqueue(self.current.clone());
    }

    /// Gray-world white balance from `sampler`. Returns whether anything changed.
    pub fn auto_white_balance(&mut self, sampler: &impl Sampler) -> bool {
        let Some(estimate) = auto_white_balance(sampler) else {
            return false;
        };
        self.apply_calibration(apply_white_balance(&self.current, &estimate))
    }

    /// Histogram auto-levels at the configured clip percentage.
    pub fn auto_levels(&mut self, sampler: &impl Sampler) -> bool {
        let levels = AutoLevels::new(self.config.auto_levels_clip_percent);
        self.apply_calibration(levels.apply(&self.current, sampler))
    }

    /// Three-point leveling from user-picked samples.
    pub fn three_point(&mut self, samples: &LevelSamples) -> bool {
        self.apply_calibration(apply_three_point(&self.current, samples))
    }

    fn apply_calibration(&mut self, value: AdjustmentParameters) -> bool {
        if value == self.current {
            return false;
        }
        self.commit_discrete(value);
        true
    }

    pub fn can_undo(&self) -> bool {
        // A pending edit would be committed first, so it counts.
        self.history.can_undo() || self.history.has_pending()
    }

    pub fn can_redo(&self) -> bool {
        !self.history.has_pending() && self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        let restored = self.history.undo();
        self.restore(restored)
    }

    pub fn redo(&mut self) -> bool {
        let restored = self.history.redo();
        self.restore(restored)
    }

    pub fn jump_to(&mut self, index: usize) -> bool {
        let restored = self.history.jump_to(index);
        self.restore(restored)
    }

    fn restore(&mut self, restored: Option<AdjustmentParameters>) -> bool {
        match restored {
            Some(value) => {
                self.current = value;
                self.scheduler.enqueue(self.current.clone());
                true
            }
            None => false,
        }
    }

    /// Commit pending history, drop any queued render, and return the final
    /// value. A render already in flight is left to finish.
    pub fn close(self) -> AdjustmentParameters {
        self.history.flush();
        self.scheduler.cancel_pending();
        tracing::info!("edit session closed, {} snapshots", self.history.len());
        self.current
    }
}
