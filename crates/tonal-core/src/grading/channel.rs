//! Editable curve channels: sparse control points owned by one channel.
//!
//! A channel keeps its points strictly sorted by input with no two points
//! sharing an input. Point ids are handles for interactive dragging only;
//! they are never serialized and never take part in equality.

use serde::{Deserialize, Serialize};

/// Inputs closer than this are treated as the same point on insert.
pub const MERGE_TOLERANCE: f32 = 0.01;

/// Stable per-channel handle for a control point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointId(pub u32);

/// A single control point. Both coordinates are normalized to `[0, 1]`.
#[derive(Debug, Clone, Copy)]
pub struct CurvePoint {
    pub id: PointId,
    pub input: f32,
    pub output: f32,
}

/// Identifies one of the five curve channels of an adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurveKind {
    /// Composite curve applied identically to R, G and B.
    Rgb,
    Red,
    Green,
    Blue,
    Luminance,
}

impl CurveKind {
    /// Application order used by the renderer.
    pub const ALL: [CurveKind; 5] = [
        CurveKind::Rgb,
        CurveKind::Red,
        CurveKind::Green,
        CurveKind::Blue,
        CurveKind::Luminance,
    ];

    /// Human-readable label for UI menus.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Rgb => "RGB",
            Self::Red => "Red",
            Self::Green => "Green",
            Self::Blue => "Blue",
            Self::Luminance => "Luminance",
        }
    }
}

/// An ordered set of control points for one curve.
///
/// Serialized as an array of `[input, output]` pairs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<[f32; 2]>", into = "Vec<[f32; 2]>")]
pub struct CurveChannel {
    points: Vec<CurvePoint>,
    next_id: u32,
}

impl CurveChannel {
    /// Empty channel (identity curve).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a channel from `(input, output)` pairs.
    ///
    /// Unlike [`add_point`](Self::add_point) no merge tolerance applies, so
    /// closely spaced points survive a serialization round trip. A later
    /// pair on the same input replaces an earlier one.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (f32, f32)>) -> Self {
        let mut channel = Self::new();
        for (input, output) in pairs {
            let input = clamp_unit(input);
            let output = clamp_unit(output);
            match channel
                .points
                .iter_mut()
                .find(|p| same_input(p.input, input))
            {
                Some(existing) => existing.output = output,
                None => {
                    let id = PointId(channel.next_id);
                    channel.next_id += 1;
                    channel.points.push(CurvePoint { id, input, output });
                }
            }
        }
        channel.points.sort_by(|a, b| a.input.total_cmp(&b.input));
        channel
    }

    /// Control points, sorted by input.
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Control points as `(input, output)` pairs, sorted by input.
    pub fn pairs(&self) -> Vec<(f32, f32)> {
        self.points.iter().map(|p| (p.input, p.output)).collect()
    }

    pub fn point(&self, id: PointId) -> Option<&CurvePoint> {
        self.points.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Add a control point, clamping both coordinates to `[0, 1]`.
    ///
    /// If an existing point lies within [`MERGE_TOLERANCE`] of `input`, the
    /// nearest such point is moved to the new coordinates and keeps its id.
    /// Otherwise a new point is inserted. Returns the id of the point.
    pub fn add_point(&mut self, input: f32, output: f32) -> PointId {
        let input = clamp_unit(input);
        let output = clamp_unit(output);

        let nearest = self
            .points
            .iter_mut()
            .filter(|p| (p.input - input).abs() < MERGE_TOLERANCE)
            .min_by(|a, b| {
                (a.input - input)
                    .abs()
                    .total_cmp(&(b.input - input).abs())
            });

        let id = match nearest {
            Some(existing) => {
                existing.input = input;
                existing.output = output;
                existing.id
            }
            None => {
                let id = PointId(self.next_id);
                self.next_id += 1;
                self.points.push(CurvePoint { id, input, output });
                id
            }
        };

        self.normalize(id);
        id
    }

    /// Move a point. `None` leaves that coordinate untouched.
    ///
    /// Returns `false` if no point has the given id.
    pub fn update_point(&mut self, id: PointId, input: Option<f32>, output: Option<f32>) -> bool {
        let Some(point) = self.points.iter_mut().find(|p| p.id == id) else {
            return false;
        };
        if let Some(output) = output {
            point.output = clamp_unit(output);
        }
        if let Some(input) = input {
            point.input = clamp_unit(input);
            self.normalize(id);
        }
        true
    }

    /// Remove a point. Returns the removed point, if any.
    pub fn remove_point(&mut self, id: PointId) -> Option<CurvePoint> {
        let index = self.points.iter().position(|p| p.id == id)?;
        Some(self.points.remove(index))
    }

    /// Re-sort by input and drop any other point sitting on the same input
    /// as `keep`.
    fn normalize(&mut self, keep: PointId) {
        self.points.sort_by(|a, b| a.input.total_cmp(&b.input));
        let Some(kept_input) = self.point(keep).map(|p| p.input) else {
            return;
        };
        self.points
            .retain(|p| p.id == keep || !same_input(p.input, kept_input));
    }
}

impl PartialEq for CurveChannel {
    fn eq(&self, other: &Self) -> bool {
        self.points.len() == other.points.len()
            && self
                .points
                .iter()
                .zip(&other.points)
                .all(|(a, b)| a.input == b.input && a.output == b.output)
    }
}

impl From<Vec<[f32; 2]>> for CurveChannel {
    fn from(pairs: Vec<[f32; 2]>) -> Self {
        Self::from_pairs(pairs.into_iter().map(|[input, output]| (input, output)))
    }
}

impl From<CurveChannel> for Vec<[f32; 2]> {
    fn from(channel: CurveChannel) -> Self {
        channel.points.iter().map(|p| [p.input, p.output]).collect()
    }
}

fn same_input(a: f32, b: f32) -> bool {
    (a - b).abs() <= f32::EPSILON
}

fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}
