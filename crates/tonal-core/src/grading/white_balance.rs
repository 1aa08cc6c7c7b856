//! Automatic and manual white balance.
//!
//! Auto white balance uses the gray-world assumption: the average color
//! of a natural scene should be neutral gray. The correction is expressed
//! as temperature/tint slider values so it lands in the same place a
//! manual adjustment would, and those sliders convert back into per-channel
//! gains at render time.

use crate::scopes::sampler::Sampler;
use crate::transform::params::{AdjustmentParameters, NEUTRAL_TEMPERATURE};

/// Temperature slider bounds in Kelvin.
pub const TEMPERATURE_MIN: f32 = 2000.0;
pub const TEMPERATURE_MAX: f32 = 25000.0;

/// Tint slider bound (symmetric).
pub const TINT_LIMIT: f32 = 150.0;

/// Floor for channel means, avoids dividing by an empty channel.
const MIN_CHANNEL_MEAN: f64 = 0.001;

/// Empirical exponent mapping the blue/red gain ratio to Kelvin.
const GRAY_WORLD_TEMPERATURE_EXPONENT: f64 = -0.8;

/// Empirical exponent mapping the temperature ratio to a channel gain.
const GAIN_EXPONENT: f64 = 0.6;

/// Green gain change per 100 units of tint.
const TINT_GREEN_SCALE: f64 = 0.3;

/// Mean luminance outside this range is too dark or too bright to judge.
const MIN_SAMPLE_LUMINANCE: f32 = 0.01;
const MAX_SAMPLE_LUMINANCE: f32 = 0.99;

/// Result of a gray-world white balance estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhiteBalanceEstimate {
    /// Neutralizing gains normalized so green is 1.
    pub gains: [f32; 3],
    /// Temperature slider value in Kelvin.
    pub temperature: f32,
    /// Tint slider value.
    pub tint: f32,
}

/// Gray-world estimate from per-channel means.
///
/// # Algorithm
/// 1. `gray = mean(avgR, avgG, avgB)`
/// 2. `k_c = gray / max(avg_c, 0.001)`
/// 3. Normalize to green: `nR = kR / kG`, `nB = kB / kG`
/// 4. `temperature = 6500 · (nB / nR)^-0.8`, clamped to 2000..25000
/// 5. `tint = −(kG − 1) · 100`, clamped to ±150
pub fn gray_world(means: [f32; 3]) -> WhiteBalanceEstimate {
    let avg = means.map(|m| (m as f64).max(MIN_CHANNEL_MEAN));
    let gray = (means[0] as f64 + means[1] as f64 + means[2] as f64) / 3.0;

    let k = avg.map(|a| gray / a);
    let n_r = k[0] / k[1];
    let n_b = k[2] / k[1];

    let ratio = n_b / n_r;
    let temperature = (NEUTRAL_TEMPERATURE as f64 * ratio.powf(GRAY_WORLD_TEMPERATURE_EXPONENT))
        as f32;
    let tint = (-(k[1] - 1.0) * 100.0) as f32;

    WhiteBalanceEstimate {
        gains: [n_r as f32, 1.0, n_b as f32],
        temperature: temperature.clamp(TEMPERATURE_MIN, TEMPERATURE_MAX),
        tint: tint.clamp(-TINT_LIMIT, TINT_LIMIT),
    }
}

/// Gray-world estimate over a whole image.
///
/// Returns `None` when the image is too dark or too bright for the
/// gray-world assumption to mean anything.
pub fn auto_white_balance(sampler: &impl Sampler) -> Option<WhiteBalanceEstimate> {
    let means = sampler.mean();
    let luminance = (means[0] + means[1] + means[2]) / 3.0;
    if !(MIN_SAMPLE_LUMINANCE..=MAX_SAMPLE_LUMINANCE).contains(&luminance) {
        tracing::debug!("auto white balance skipped: mean luminance {luminance:.4}");
        return None;
    }
    let estimate = gray_world(means);
    tracing::debug!(
        "auto white balance: {:.0}K tint {:.1}",
        estimate.temperature,
        estimate.tint
    );
    Some(estimate)
}

/// Write an estimate into the temperature and tint sliders.
pub fn apply_white_balance(
    params: &AdjustmentParameters,
    estimate: &WhiteBalanceEstimate,
) -> AdjustmentParameters {
    AdjustmentParameters {
        temperature: estimate.temperature,
        tint: estimate.tint,
        ..params.clone()
    }
}

/// Convert temperature/tint sliders into per-channel RGB gains.
///
/// ```text
/// ratio = temperature / 6500
/// ratio < 1:  r = 1,            b = ratio^-0.6
/// otherwise:  r = ratio^0.6,    b = 1
/// g = 1 − (tint / 100) · 0.3
/// ```
/// The gains are divided by their maximum so no channel exceeds 1.
/// 6500K with zero tint gives `[1, 1, 1]`.
pub fn channel_gains(temperature: f32, tint: f32) -> [f32; 3] {
    let ratio = temperature.max(1.0) as f64 / NEUTRAL_TEMPERATURE as f64;
    let (r, b) = if ratio < 1.0 {
        (1.0, ratio.powf(-GAIN_EXPONENT))
    } else {
        (ratio.powf(GAIN_EXPONENT), 1.0)
    };
    let g = 1.0 - (tint as f64 / 100.0) * TINT_GREEN_SCALE;

    let max = r.max(g).max(b);
    if max <= 0.0 {
        return [1.0; 3];
    }
    [(r / max) as f32, (g / max) as f32, (b / max) as f32]
}

/// True when gains are close enough to `[1, 1, 1]` to skip.
pub fn is_neutral(gains: [f32; 3]) -> bool {
    gains.iter().all(|g| (g - 1.0).abs() < 1e-6)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::SampleImage;
    use crate::scopes::sampler::ImageSampler;

    const EPSILON: f32 = 1e-4;

    #[test]
    fn test_gray_world_on_neutral_means() {
        let est = gray_world([0.5, 0.5, 0.5]);
        for g in est.gains {
            assert!((g - 1.0).abs() < EPSILON, "gain should be 1: {g}");
        }
        assert!((est.temperature - 6500.0).abs() < 1.0, "{}", est.temperature);
        assert!(est.tint.abs() < EPSILON, "{}", est.tint);
    }

    #[test]
    fn test_auto_white_balance_uniform_gray_image() {
        let img = SampleImage::uniform(16, 16, [0.42, 0.42, 0.42]);
        let est = auto_white_balance(&ImageSampler::new(&img)).unwrap();
        assert!((est.temperature - 6500.0).abs() < 1.0);
        assert!(est.tint.abs() < EPSILON);
        assert_eq!(est.gains.map(|g| (g * 1000.0).round()), [1000.0; 3]);
    }

    #[test]
    fn test_warm_cast_estimates_lower_temperature() {
        let est = gray_world([0.7, 0.5, 0.3]);
        assert!(est.temperature < 6500.0, "{}", est.temperature);
        assert!(est.gains[2] > est.gains[0], "blue gain should exceed red");
    }

    #[test]
    fn test_green_cast_estimates_positive_tint() {
        let est = gray_world([0.5, 0.7, 0.5]);
        assert!(est.tint > 0.0, "{}", est.tint);
    }

    #[test]
    fn test_temperature_is_clamped() {
        let est = gray_world([0.001, 0.5, 1.0]);
        assert!(est.temperature >= TEMPERATURE_MIN);
        let est = gray_world([1.0, 0.5, 0.001]);
        assert!(est.temperature <= TEMPERATURE_MAX);
    }

    #[test]
    fn test_auto_white_balance_skips_black_image() {
        let img = SampleImage::uniform(8, 8, [0.0, 0.0, 0.0]);
        assert!(auto_white_balance(&ImageSampler::new(&img)).is_none());
    }

    #[test]
    fn test_channel_gains_neutral_is_unity() {
        assert!(is_neutral(channel_gains(6500.0, 0.0)));
    }

    #[test]
    fn test_channel_gains_warm_setting_reduces_blue() {
        let gains = channel_gains(9000.0, 0.0);
        assert!((gains[0] - 1.0).abs() < EPSILON);
        assert!(gains[2] < 1.0);
        assert!(gains.iter().all(|&g| g <= 1.0));
    }

    #[test]
    fn test_channel_gains_cool_setting_reduces_red() {
        let gains = channel_gains(4000.0, 0.0);
        assert!((gains[2] - 1.0).abs() < EPSILON);
        assert!(gains[0] < 1.0);
    }

    #[test]
    fn test_channel_gains_tint_moves_green() {
        let magenta = channel_gains(6500.0, 50.0);
        assert!(magenta[1] < 1.0);
        let green = channel_gains(6500.0, -50.0);
        assert!((green[1] - 1.0).abs() < EPSILON);
        assert!(green[0] < 1.0 && green[2] < 1.0);
    }

    #[test]
    fn test_apply_white_balance_sets_sliders_only() {
        let params = AdjustmentParameters { exposure: 0.3, ..Default::default() };
        let est = gray_world([0.6, 0.5, 0.4]);
        let out = apply_white_balance(&params, &est);
        assert_eq!(out.temperature, est.temperature);
        assert_eq!(out.tint, est.tint);
        assert_eq!(out.exposure, 0.3);
    }
}
