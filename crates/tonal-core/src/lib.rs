//! Tonal Core: domain layer for non-destructive photo adjustments.
//!
//! This crate contains the curve engine, calibration heuristics, edit
//! history, LUT parsing and image statistics. No compositor or runtime
//! dependencies.

pub mod grading;
pub mod history;
pub mod image;
pub mod scopes;
pub mod transform;

// Re-exports for convenience.
pub use grading::channel::{CurveChannel, CurveKind, CurvePoint, PointId};
pub use grading::curves::{ToneLut, generate};
pub use history::HistoryManager;
pub use image::SampleImage;
pub use transform::lut::{Lut3D, LutError};
pub use transform::params::{AdjustmentParameters, LutColorSpace, LutReference};
