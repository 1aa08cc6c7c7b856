//! Per-channel RGB histogram computation.

use serde::{Deserialize, Serialize};

use crate::image::SampleImage;

/// Number of bins per channel.
pub const BIN_COUNT: usize = 256;

/// Histogram data for R, G and B channels (256 bins each).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelHistogram {
    /// Bin counts for `[R, G, B]`. Each `Vec` has 256 entries.
    pub bins: [Vec<u32>; 3],
    /// Number of pixels counted (the same for every channel).
    pub total: u64,
}

impl Default for ChannelHistogram {
    fn default() -> Self {
        Self {
            bins: std::array::from_fn(|_| vec![0; BIN_COUNT]),
            total: 0,
        }
    }
}

impl ChannelHistogram {
    /// Count one RGB sample. Values are clamped to `[0, 1]`.
    pub fn add(&mut self, rgb: [f32; 3]) {
        for (bins, v) in self.bins.iter_mut().zip(rgb) {
            bins[bin_index(v)] += 1;
        }
        self.total += 1;
    }

    /// Mean normalized value per channel, from bin centers.
    pub fn mean(&self) -> [f32; 3] {
        if self.total == 0 {
            return [0.0; 3];
        }
        let mut out = [0.0_f32; 3];
        for (c, bins) in self.bins.iter().enumerate() {
            let sum: f64 = bins
                .iter()
                .enumerate()
                .map(|(i, &n)| i as f64 * n as f64)
                .sum();
            out[c] = (sum / self.total as f64 / (BIN_COUNT - 1) as f64) as f32;
        }
        out
    }

    /// Peak bin value across all channels (for normalization).
    pub fn peak(&self) -> u32 {
        self.bins
            .iter()
            .flat_map(|b| b.iter().copied())
            .max()
            .unwrap_or(0)
    }
}

fn bin_index(v: f32) -> usize {
    let v = if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
    ((v * (BIN_COUNT - 1) as f32).round() as usize).min(BIN_COUNT - 1)
}

/// Compute the histogram of an image, visiting every `stride`-th pixel
/// along each axis.
pub fn compute(image: &SampleImage, stride: u32) -> ChannelHistogram {
    let mut hist = ChannelHistogram::default();
    if image.is_empty() {
        return hist;
    }
    for px in image.strided(stride) {
        hist.add([px[0], px[1], px[2]]);
    }
    hist
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_image_fills_single_bin() {
        let img = SampleImage::uniform(4, 4, [0.0, 0.5, 1.0]);
        let hist = compute(&img, 1);
        assert_eq!(hist.total, 16);
        assert_eq!(hist.bins[0][0], 16);
        assert_eq!(hist.bins[1][128], 16);
        assert_eq!(hist.bins[2][255], 16);
        assert_eq!(hist.peak(), 16);
    }

    #[test]
    fn test_mean_of_uniform_image() {
        let img = SampleImage::uniform(3, 3, [0.2, 0.4, 0.6]);
        let mean = compute(&img, 1).mean();
        for (c, expected) in [0.2, 0.4, 0.6].into_iter().enumerate() {
            assert!((mean[c] - expected).abs() < 0.003, "channel {c}: {}", mean[c]);
        }
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let mut hist = ChannelHistogram::default();
        hist.add([-1.0, 2.0, f32::NAN]);
        assert_eq!(hist.bins[0][0], 1);
        assert_eq!(hist.bins[1][255], 1);
        assert_eq!(hist.bins[2][0], 1);
    }

    #[test]
    fn test_empty_image_gives_empty_histogram() {
        let img = SampleImage { width: 0, height: 0, pixels: vec![] };
        assert_eq!(compute(&img, 1).total, 0);
    }
}
