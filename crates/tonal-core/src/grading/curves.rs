//! Spline-based curve evaluation and 1D LUT baking.
//!
//! Fits a natural cubic spline through a channel's control points plus
//! synthetic anchors at `(0, 0)` and `(1, 1)`, then samples it into a
//! 256-entry transfer function.
//!
//! # Algorithm
//! Natural cubic spline (second derivative zero at both ends). For knots
//! `x_0 < … < x_n` with segment widths `h_i = x_{i+1} − x_i`, the second
//! derivative coefficients `c_i` solve a tridiagonal system (Thomas
//! algorithm). Each segment then evaluates
//! ```text
//! S_i(x) = a_i + b_i·dx + c_i·dx² + d_i·dx³,   dx = x − x_i
//! ```
//! Inputs outside `[x_0, x_n]` take the boundary knot's output.
//!
//! # Complexity
//! - Fit: O(N)
//! - Evaluate: O(log N) binary search + O(1) polynomial
//! - Bake to 1D LUT: O(N + size × log N)

use crate::grading::channel::CurveChannel;

/// Number of samples in a baked transfer function.
pub const LUT_SIZE: usize = 256;

/// Knots closer than this on the input axis are collapsed into one.
const KNOT_EPSILON: f64 = 1e-6;

/// A 256-entry transfer function mapping normalized input to output.
pub type ToneLut = [f32; LUT_SIZE];

/// A fitted natural cubic spline.
///
/// Coefficients are stored per segment; evaluation is allocation-free.
#[derive(Debug, Clone)]
pub struct NaturalSpline {
    xs: Vec<f64>,
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
    d: Vec<f64>,
}

impl NaturalSpline {
    /// Fit a spline through `knots`, which must be sorted by x.
    ///
    /// Knots sharing an x-coordinate (within a tiny epsilon) are collapsed,
    /// keeping the later one. Returns `None` with fewer than 2 distinct knots.
    pub fn fit(knots: &[(f64, f64)]) -> Option<Self> {
        let mut xs: Vec<f64> = Vec::with_capacity(knots.len());
        let mut ys: Vec<f64> = Vec::with_capacity(knots.len());
        for &(x, y) in knots {
            match xs.last() {
                Some(&last) if (x - last).abs() < KNOT_EPSILON => {
                    if let Some(prev) = ys.last_mut() {
                        *prev = y;
                    }
                }
                _ => {
                    xs.push(x);
                    ys.push(y);
                }
            }
        }

        if xs.len() < 2 {
            return None;
        }

        let n = xs.len() - 1;
        let h: Vec<f64> = (0..n).map(|i| xs[i + 1] - xs[i]).collect();

        let mut alpha = vec![0.0_f64; n + 1];
        for i in 1..n {
            alpha[i] = 3.0 / h[i] * (ys[i + 1] - ys[i]) - 3.0 / h[i - 1] * (ys[i] - ys[i - 1]);
        }

        // Forward elimination
        let mut l = vec![1.0_f64; n + 1];
        let mut mu = vec![0.0_f64; n + 1];
        let mut z = vec![0.0_f64; n + 1];
        for i in 1..n {
            l[i] = 2.0 * (xs[i + 1] - xs[i - 1]) - h[i - 1] * mu[i - 1];
            mu[i] = h[i] / l[i];
            z[i] = (alpha[i] - h[i - 1] * z[i - 1]) / l[i];
        }

        // Back substitution
        let mut c = vec![0.0_f64; n + 1];
        let mut b = vec![0.0_f64; n];
        let mut d = vec![0.0_f64; n];
        for j in (0..n).rev() {
            c[j] = z[j] - mu[j] * c[j + 1];
            b[j] = (ys[j + 1] - ys[j]) / h[j] - h[j] * (c[j + 1] + 2.0 * c[j]) / 3.0;
            d[j] = (c[j + 1] - c[j]) / (3.0 * h[j]);
        }

        Some(Self {
            xs,
            a: ys,
            b,
            c,
            d,
        })
    }

    /// Evaluate the spline at `x`, with flat extrapolation past the end knots.
    pub fn evaluate(&self, x: f64) -> f64 {
        let last = self.xs.len() - 1;
        if x <= self.xs[0] {
            return self.a[0];
        }
        if x >= self.xs[last] {
            return self.a[last];
        }

        // Binary search for the segment containing x
        let mut lo = 0;
        let mut hi = last;
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if self.xs[mid] <= x {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        let dx = x - self.xs[lo];
        self.a[lo] + self.b[lo] * dx + self.c[lo] * dx * dx + self.d[lo] * dx * dx * dx
    }
}

/// The exact identity ramp, `out[i] = i / 255`.
pub fn identity_lut() -> ToneLut {
    std::array::from_fn(|i| i as f32 / (LUT_SIZE - 1) as f32)
}

/// Knot list for a channel: its points plus `(0, 0)` and `(1, 1)` anchors.
///
/// An anchor is omitted when the channel already has a point at that end.
fn knots_with_anchors(channel: &CurveChannel) -> Vec<(f64, f64)> {
    let mut knots: Vec<(f64, f64)> = channel
        .points()
        .iter()
        .map(|p| (p.input as f64, p.output as f64))
        .collect();

    if knots.first().is_none_or(|&(x, _)| x > KNOT_EPSILON) {
        knots.insert(0, (0.0, 0.0));
    }
    if knots.last().is_none_or(|&(x, _)| x < 1.0 - KNOT_EPSILON) {
        knots.push((1.0, 1.0));
    }
    knots.sort_by(|a, b| a.0.total_cmp(&b.0));
    knots
}

/// Bake a curve channel into a 256-entry transfer function.
///
/// An empty channel produces the exact identity ramp. All outputs are
/// clamped to `[0, 1]`. Never fails: degenerate knot sets fall back to
/// identity.
pub fn generate(channel: &CurveChannel) -> ToneLut {
    if channel.is_empty() {
        return identity_lut();
    }

    let Some(spline) = NaturalSpline::fit(&knots_with_anchors(channel)) else {
        return identity_lut();
    };

    std::array::from_fn(|i| {
        let x = i as f64 / (LUT_SIZE - 1) as f64;
        spline.evaluate(x).clamp(0.0, 1.0) as f32
    })
}

/// Bake `(input, output)` control points into a 1D LUT of arbitrary size.
///
/// Uses the same anchoring and clamping as [`generate`].
pub fn bake_curve_to_1d_lut(control_points: &[[f32; 2]], size: usize) -> Vec<f32> {
    let identity = || {
        (0..size)
            .map(|i| i as f32 / (size - 1).max(1) as f32)
            .collect()
    };
    if control_points.is_empty() || size == 0 {
        return identity();
    }

    let channel = CurveChannel::from(control_points.to_vec());
    let Some(spline) = NaturalSpline::fit(&knots_with_anchors(&channel)) else {
        return identity();
    };

    (0..size)
        .map(|i| {
            let x = i as f64 / (size - 1).max(1) as f64;
            spline.evaluate(x).clamp(0.0, 1.0) as f32
        })
        .collect()
}

/// Look up `x ∈ [0, 1]` in a baked transfer function with linear interpolation.
pub fn sample_lut(lut: &ToneLut, x: f32) -> f32 {
    let pos = x.clamp(0.0, 1.0) * (LUT_SIZE - 1) as f32;
    let i = pos.floor() as usize;
    if i >= LUT_SIZE - 1 {
        return lut[LUT_SIZE - 1];
    }
    let t = pos - i as f32;
    lut[i] + (lut[i + 1] - lut[i]) * t
}

/// True when every entry is within `tolerance` of the identity ramp.
pub fn is_identity(lut: &ToneLut, tolerance: f32) -> bool {
    lut.iter()
        .enumerate()
        .all(|(i, &v)| (v - i as f32 / (LUT_SIZE - 1) as f32).abs() <= tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_generate_empty_channel_is_exact_identity() {
        let lut = generate(&CurveChannel::new());
        for (i, v) in lut.iter().enumerate() {
            assert!(
                (v - i as f32 / 255.0).abs() < EPSILON,
                "entry {i}: {v} vs {}",
                i as f32 / 255.0
            );
        }
    }

    #[test]
    fn test_spline_reproduces_control_points() {
        let knots = [(0.0, 0.0), (0.25, 0.4), (0.6, 0.55), (1.0, 1.0)];
        let spline = NaturalSpline::fit(&knots).unwrap();
        for (x, y) in knots {
            assert!(
                (spline.evaluate(x) - y).abs() < 1e-9,
                "knot ({x}, {y}) evaluated to {}",
                spline.evaluate(x)
            );
        }
    }

    #[test]
    fn test_generate_hits_control_points_on_grid() {
        // Inputs on exact sample positions so the LUT entry is the knot value.
        let ch = CurveChannel::from_pairs([(64.0 / 255.0, 0.4), (192.0 / 255.0, 0.7)]);
        let lut = generate(&ch);
        assert!((lut[64] - 0.4).abs() < 1e-4, "lut[64] = {}", lut[64]);
        assert!((lut[192] - 0.7).abs() < 1e-4, "lut[192] = {}", lut[192]);
        assert!(lut[0].abs() < EPSILON);
        assert!((lut[255] - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_midpoint_on_diagonal_stays_identity() {
        let ch = CurveChannel::from_pairs([(0.5, 0.5)]);
        let lut = generate(&ch);
        assert!(is_identity(&lut, 1e-4));
    }

    #[test]
    fn test_outputs_clamped_to_unit_range() {
        let ch = CurveChannel::from_pairs([(0.1, 1.0), (0.2, 0.0), (0.3, 1.0)]);
        let lut = generate(&ch);
        assert!(lut.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_point_at_zero_replaces_anchor() {
        let ch = CurveChannel::from_pairs([(0.0, 0.2)]);
        let lut = generate(&ch);
        assert!((lut[0] - 0.2).abs() < EPSILON);
        assert!((lut[255] - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_flat_extrapolation_outside_knots() {
        let spline = NaturalSpline::fit(&[(0.2, 0.3), (0.8, 0.9)]).unwrap();
        assert!((spline.evaluate(0.0) - 0.3).abs() < 1e-12);
        assert!((spline.evaluate(1.0) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_fit_fewer_than_two_knots_is_none() {
        assert!(NaturalSpline::fit(&[]).is_none());
        assert!(NaturalSpline::fit(&[(0.5, 0.5)]).is_none());
        assert!(NaturalSpline::fit(&[(0.5, 0.2), (0.5, 0.7)]).is_none());
    }

    #[test]
    fn test_bake_curve_to_1d_lut_identity() {
        let lut = bake_curve_to_1d_lut(&[], 256);
        assert_eq!(lut.len(), 256);
        assert!((lut[0] - 0.0).abs() < EPSILON);
        assert!((lut[255] - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_sample_lut_interpolates() {
        let lut = identity_lut();
        assert!((sample_lut(&lut, 0.5) - 0.5).abs() < EPSILON);
        assert!((sample_lut(&lut, 1.0) - 1.0).abs() < EPSILON);
        assert!(sample_lut(&lut, -1.0).abs() < EPSILON);
    }
}
