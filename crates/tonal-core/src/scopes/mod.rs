//! Image statistics: per-channel histograms and the sampling capability
//! that calibration reads from.

pub mod histogram;
pub mod sampler;

pub use histogram::ChannelHistogram;
pub use sampler::{ImageSampler, Region, Sampler};
