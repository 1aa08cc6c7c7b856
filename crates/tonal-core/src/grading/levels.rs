//! Three-point level calibration and histogram auto-levels.
//!
//! Black, gray and white reference samples become per-channel curve points
//! on the Red, Green and Blue curves. Because each single-channel curve only
//! touches its own component, per-channel casts are corrected without
//! disturbing the composite tone curve.

use crate::grading::channel::CurveKind;
use crate::scopes::histogram::{BIN_COUNT, ChannelHistogram};
use crate::scopes::sampler::Sampler;
use crate::transform::params::AdjustmentParameters;

/// Allowed black point range per channel.
const BLACK_MIN: f32 = 0.001;
const BLACK_MAX: f32 = 0.7;

/// White point upper bound and minimum gap above black.
const WHITE_MAX: f32 = 0.99;
const WHITE_MIN_GAP: f32 = 0.05;

/// Sampled black-to-white range below which calibration is skipped.
const MIN_DYNAMIC_RANGE: f32 = 0.02;

/// Gray luminance floor and the per-channel floor relative to it.
const GRAY_LUMINANCE_FLOOR: f32 = 0.01;
const GRAY_CHANNEL_FLOOR: f32 = 0.1;

/// Limits on the gray-point correction factor.
const CORRECTION_MIN: f32 = 0.5;
const CORRECTION_MAX: f32 = 2.0;

/// Default and maximum auto-levels clipping, in percent of pixels.
pub const DEFAULT_CLIP_PERCENT: f32 = 0.1;
pub const MAX_CLIP_PERCENT: f32 = 5.0;

const RGB_CURVES: [CurveKind; 3] = [CurveKind::Red, CurveKind::Green, CurveKind::Blue];

/// User-sampled reference colors in linear RGB.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LevelSamples {
    pub black: Option<[f32; 3]>,
    pub gray: Option<[f32; 3]>,
    pub white: Option<[f32; 3]>,
}

/// `(input, output)` curve points for the Red, Green and Blue curves.
pub type ChannelPoints = [Vec<(f32, f32)>; 3];

/// Derive per-channel curve points from reference samples.
///
/// A missing black sample means black at 0, a missing white sample means
/// white at 1. Returns `None` (no calibration) when nothing was sampled,
/// when any channel has less than 0.02 between its sampled black and white,
/// or when the gray sample is too dark or too bright to be a reference.
///
/// # Algorithm
/// 1. Clamp black to `[0.001, 0.7]`, white to `[black + 0.05, 0.99]`
/// 2. Without gray: `(black_c, 0)` and `(white_c, 1)`
/// 3. With gray: `grayLum = max(mean(gray), 0.01)`,
///    `ratio_c = max(gray_c, 0.1·grayLum) / grayLum`,
///    `corr_c = clamp(mean(ratio) / ratio_c, 0.5, 2)`,
///    then `(black_c, 0·corr_c)` and `(white_c, 1·corr_c)`
pub fn three_point_points(samples: &LevelSamples) -> Option<ChannelPoints> {
    if samples.black.is_none() && samples.gray.is_none() && samples.white.is_none() {
        return None;
    }

    let raw_black = samples.black.unwrap_or([0.0; 3]);
    let raw_white = samples.white.unwrap_or([1.0; 3]);
    if (0..3).any(|c| raw_white[c] - raw_black[c] < MIN_DYNAMIC_RANGE) {
        tracing::debug!("level calibration skipped: insufficient dynamic range");
        return None;
    }

    let black = raw_black.map(|b| b.clamp(BLACK_MIN, BLACK_MAX));
    let mut white = [0.0_f32; 3];
    for c in 0..3 {
        white[c] = raw_white[c].clamp(black[c] + WHITE_MIN_GAP, WHITE_MAX);
    }

    let correction = match samples.gray {
        None => [1.0_f32; 3],
        Some(gray) => gray_correction(gray)?,
    };

    Some(std::array::from_fn(|c| {
        vec![
            (black[c], 0.0 * correction[c]),
            (white[c], 1.0 * correction[c]),
        ]
    }))
}

/// Per-channel correction factors that pull a gray sample toward neutral.
fn gray_correction(gray: [f32; 3]) -> Option<[f32; 3]> {
    let raw_luminance = (gray[0] + gray[1] + gray[2]) / 3.0;
    if !(GRAY_LUMINANCE_FLOOR..=WHITE_MAX).contains(&raw_luminance) {
        tracing::debug!("gray point skipped: sample luminance {raw_luminance:.4}");
        return None;
    }
    let luminance = raw_luminance.max(GRAY_LUMINANCE_FLOOR);

    let ratios = gray.map(|g| g.max(GRAY_CHANNEL_FLOOR * luminance) / luminance);
    let avg = (ratios[0] + ratios[1] + ratios[2]) / 3.0;
    Some(ratios.map(|r| (avg / r).clamp(CORRECTION_MIN, CORRECTION_MAX)))
}

/// Replace the Red, Green and Blue curves with calibration points.
///
/// Returns the parameters unchanged when calibration is degenerate.
pub fn apply_three_point(
    params: &AdjustmentParameters,
    samples: &LevelSamples,
) -> AdjustmentParameters {
    let Some(points) = three_point_points(samples) else {
        return params.clone();
    };
    apply_channel_points(params, &points)
}

fn apply_channel_points(params: &AdjustmentParameters, points: &ChannelPoints) -> AdjustmentParameters {
    let mut out = params.clone();
    for (kind, channel_points) in RGB_CURVES.into_iter().zip(points) {
        let curve = out.curve_mut(kind);
        curve.clear();
        for &(input, output) in channel_points {
            curve.add_point(input, output);
        }
    }
    out
}

/// Histogram-driven black and white points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoLevels {
    /// Percent of pixels allowed to clip at each end, `0..=5`.
    pub clip_percent: f32,
}

impl Default for AutoLevels {
    fn default() -> Self {
        Self {
            clip_percent: DEFAULT_CLIP_PERCENT,
        }
    }
}

impl AutoLevels {
    pub fn new(clip_percent: f32) -> Self {
        Self {
            clip_percent: clip_percent.clamp(0.0, MAX_CLIP_PERCENT),
        }
    }

    /// Per-channel `(black, white)` points, normalized to `[0, 1]`.
    ///
    /// The black point is the lowest bin whose cumulative count from the
    /// dark end reaches the clip threshold; the white point mirrors it from
    /// the bright end. The threshold is at least one pixel. Returns `None`
    /// for an empty histogram.
    pub fn black_white(&self, histogram: &ChannelHistogram) -> Option<([f32; 3], [f32; 3])> {
        if histogram.total == 0 {
            return None;
        }
        let fraction = self.clip_percent.clamp(0.0, MAX_CLIP_PERCENT) as f64 / 100.0;
        let threshold = (fraction * histogram.total as f64).max(1.0);
        let scale = (BIN_COUNT - 1) as f32;

        let mut black = [0.0_f32; 3];
        let mut white = [1.0_f32; 3];
        for (c, bins) in histogram.bins.iter().enumerate() {
            black[c] = cumulative_index(bins.iter().enumerate(), threshold).unwrap_or(0) as f32 / scale;
            white[c] = cumulative_index(bins.iter().enumerate().rev(), threshold)
                .unwrap_or(BIN_COUNT - 1) as f32
                / scale;
        }
        Some((black, white))
    }

    /// Curve points from a histogram, via three-point leveling without gray.
    pub fn points(&self, histogram: &ChannelHistogram) -> Option<ChannelPoints> {
        let (black, white) = self.black_white(histogram)?;
        three_point_points(&LevelSamples {
            black: Some(black),
            gray: None,
            white: Some(white),
        })
    }

    /// Apply auto-levels to `params` using the sampler's histogram.
    ///
    /// Returns the parameters unchanged when the image is degenerate.
    pub fn apply(&self, params: &AdjustmentParameters, sampler: &impl Sampler) -> AdjustmentParameters {
        match self.points(&sampler.histogram()) {
            Some(points) => apply_channel_points(params, &points),
            None => {
                tracing::debug!("auto levels skipped");
                params.clone()
            }
        }
    }
}

fn cumulative_index<'a>(
    bins: impl Iterator<Item = (usize, &'a u32)>,
    threshold: f64,
) -> Option<usize> {
    let mut cumulative = 0u64;
    for (i, &count) in bins {
        cumulative += count as u64;
        if cumulative as f64 >= threshold {
            return Some(i);
        }
    }
    None
}
