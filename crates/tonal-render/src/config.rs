//! Runtime configuration for an editing session.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tonal_core::grading::levels::DEFAULT_CLIP_PERCENT;
use tonal_core::history::{DEFAULT_CAPACITY, DEFAULT_DEBOUNCE};

/// Default render rate cap.
const DEFAULT_MAX_FPS: u32 = 30;
/// Default grid size for the composite curve cube.
const DEFAULT_CUBE_DIMENSION: u32 = 64;

/// Tunables shared by history, calibration and the render scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Snapshots kept in undo history.
    pub history_capacity: usize,
    /// Quiet period before a continuous edit is committed to history.
    pub debounce_ms: u64,
    /// Render rate cap. 0 disables throttling.
    pub max_fps: u32,
    /// Grid size of the composite RGB curve cube.
    pub cube_dimension: u32,
    /// Default auto-levels clipping, in percent.
    pub auto_levels_clip_percent: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_CAPACITY,
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            max_fps: DEFAULT_MAX_FPS,
            cube_dimension: DEFAULT_CUBE_DIMENSION,
            auto_levels_clip_percent: DEFAULT_CLIP_PERCENT,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `TONAL_*` environment variables.
    ///
    /// Unset or unparsable variables keep the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            history_capacity: env_or("TONAL_HISTORY_CAPACITY", defaults.history_capacity),
            debounce_ms: env_or("TONAL_DEBOUNCE_MS", defaults.debounce_ms),
            max_fps: env_or("TONAL_MAX_FPS", defaults.max_fps),
            cube_dimension: env_or("TONAL_CUBE_DIMENSION", defaults.cube_dimension),
            ..defaults
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Minimum gap after a render completes before the next starts; zero when
    /// throttling is off.
    pub fn throttle_interval(&self) -> Duration {
        if self.max_fps == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(1.0 / self.max_fps as f64)
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.history_capacity, 50);
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!(config.cube_dimension, 64);
    }

    #[test]
    fn test_throttle_interval() {
        let config = EngineConfig { max_fps: 50, ..Default::default() };
        assert_eq!(config.throttle_interval(), Duration::from_millis(20));
        let unthrottled = EngineConfig { max_fps: 0, ..Default::default() };
        assert_eq!(unthrottled.throttle_interval(), Duration::ZERO);
    }

    #[test]
    fn test_env_override_missing_keeps_default() {
        assert_eq!(env_or("TONAL_TEST_UNSET_VARIABLE", 7u32), 7);
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"max_fps": 60}"#).unwrap();
        assert_eq!(config.max_fps, 60);
        assert_eq!(config.history_capacity, 50);
    }
}
