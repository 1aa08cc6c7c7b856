//! Central parameter struct that defines one edit state of an image.
//!
//! `AdjustmentParameters` is a plain value: every tool produces a new value,
//! history stores snapshots of it, and the renderer consumes it. A default
//! instance is the identity edit.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::grading::channel::{CurveChannel, CurveKind};

/// Neutral white balance temperature in Kelvin.
pub const NEUTRAL_TEMPERATURE: f32 = 6500.0;

/// Declared encoding of an external LUT's input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LutColorSpace {
    /// sRGB-encoded input.
    #[default]
    Srgb,
    /// Scene-linear input.
    Linear,
    /// Log-encoded input.
    Log,
}

impl LutColorSpace {
    /// Human-readable label for UI menus.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Srgb => "sRGB",
            Self::Linear => "Linear",
            Self::Log => "Log",
        }
    }
}

/// Reference to an externally authored 3D LUT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LutReference {
    /// File path of the `.cube`, `.3dl` or raw LUT.
    #[serde(rename = "lut_path")]
    pub path: PathBuf,
    /// Blend amount. 0.0 = no effect, 1.0 = full LUT.
    #[serde(rename = "lut_alpha")]
    pub alpha: f32,
    /// Encoding the LUT expects its input in.
    #[serde(rename = "lut_color_space", default)]
    pub color_space: LutColorSpace,
}

impl LutReference {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            alpha: 1.0,
            color_space: LutColorSpace::default(),
        }
    }
}

/// Every tool writes here; history snapshots it; the renderer reads it.
///
/// Serialized as a flat, field-named structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentParameters {
    // Tone
    /// Exposure in stops. 0.0 = neutral.
    pub exposure: f32,
    /// Contrast. 0.0 = neutral, range −100..100.
    pub contrast: f32,
    /// Highlight recovery. 0.0 = neutral.
    pub highlights: f32,
    /// Shadow recovery. 0.0 = neutral.
    pub shadows: f32,
    /// White point shift. 0.0 = neutral.
    pub whites: f32,
    /// Black point shift. 0.0 = neutral.
    pub blacks: f32,

    // Color
    /// Saturation. 0.0 = neutral, range −100..100.
    pub saturation: f32,
    /// Vibrance. 0.0 = neutral.
    pub vibrance: f32,
    /// White balance temperature in Kelvin. 6500 = neutral.
    pub temperature: f32,
    /// Green–magenta tint. 0.0 = neutral, range −150..150.
    pub tint: f32,

    // Detail and effects
    pub sharpness: f32,
    pub clarity: f32,
    pub dehaze: f32,
    pub vignette: f32,
    pub grain: f32,
    pub noise_reduction: f32,

    // Geometry
    /// Clockwise quarter turns, 0..=3.
    pub rotation: u8,
    /// Fine rotation in degrees.
    pub straighten: f32,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,

    // Curves
    /// Composite curve applied identically to R, G and B.
    pub curve_rgb: CurveChannel,
    pub curve_red: CurveChannel,
    pub curve_green: CurveChannel,
    pub curve_blue: CurveChannel,
    pub curve_luminance: CurveChannel,

    /// Optional external LUT, flattened into `lut_*` fields.
    #[serde(flatten)]
    pub lut: Option<LutReference>,
}

impl Default for AdjustmentParameters {
    /// Produces an identity (no-op) edit; the image passes through unchanged.
    fn default() -> Self {
        Self {
            exposure: 0.0,
            contrast: 0.0,
            highlights: 0.0,
            shadows: 0.0,
            whites: 0.0,
            blacks: 0.0,
            saturation: 0.0,
            vibrance: 0.0,
            temperature: NEUTRAL_TEMPERATURE,
            tint: 0.0,
            sharpness: 0.0,
            clarity: 0.0,
            dehaze: 0.0,
            vignette: 0.0,
            grain: 0.0,
            noise_reduction: 0.0,
            rotation: 0,
            straighten: 0.0,
            flip_horizontal: false,
            flip_vertical: false,
            curve_rgb: CurveChannel::new(),
            curve_red: CurveChannel::new(),
            curve_green: CurveChannel::new(),
            curve_blue: CurveChannel::new(),
            curve_luminance: CurveChannel::new(),
            lut: None,
        }
    }
}

impl AdjustmentParameters {
    pub fn curve(&self, kind: CurveKind) -> &CurveChannel {
        match kind {
            CurveKind::Rgb => &self.curve_rgb,
            CurveKind::Red => &self.curve_red,
            CurveKind::Green => &self.curve_green,
            CurveKind::Blue => &self.curve_blue,
            CurveKind::Luminance => &self.curve_luminance,
        }
    }

    pub fn curve_mut(&mut self, kind: CurveKind) -> &mut CurveChannel {
        match kind {
            CurveKind::Rgb => &mut self.curve_rgb,
            CurveKind::Red => &mut self.curve_red,
            CurveKind::Green => &mut self.curve_green,
            CurveKind::Blue => &mut self.curve_blue,
            CurveKind::Luminance => &mut self.curve_luminance,
        }
    }

    /// True when this edit produces no visual change.
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    pub fn has_curves(&self) -> bool {
        CurveKind::ALL.iter().any(|&k| !self.curve(k).is_empty())
    }

    pub fn reset_curves(&mut self) {
        for kind in CurveKind::ALL {
            self.curve_mut(kind).clear();
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_edit() -> AdjustmentParameters {
        let mut params = AdjustmentParameters {
            exposure: 0.7,
            contrast: 12.5,
            temperature: 5200.0,
            tint: -8.0,
            rotation: 1,
            flip_vertical: true,
            lut: Some(LutReference {
                path: PathBuf::from("/looks/film.cube"),
                alpha: 0.65,
                color_space: LutColorSpace::Log,
            }),
            ..Default::default()
        };
        params.curve_rgb.add_point(0.25, 0.2);
        params.curve_rgb.add_point(0.75, 0.8);
        params.curve_blue.add_point(0.5, 0.45);
        params
    }

    #[test]
    fn test_default_is_identity() {
        assert!(AdjustmentParameters::default().is_identity());
        assert!(!AdjustmentParameters::default().has_curves());
    }

    #[test]
    fn test_edit_is_not_identity() {
        assert!(!sample_edit().is_identity());
        assert!(sample_edit().has_curves());
    }

    #[test]
    fn test_json_roundtrip_preserves_value() {
        let params = sample_edit();
        let json = params.to_json().unwrap();
        let back = AdjustmentParameters::from_json(&json).unwrap();
        assert_eq!(back, params);
    }

    #[test]
    fn test_json_roundtrip_keeps_points_dragged_close() {
        let mut params = AdjustmentParameters::default();
        params.curve_red.add_point(0.2, 0.1);
        let dragged = params.curve_red.add_point(0.5, 0.9);
        assert!(params.curve_red.update_point(dragged, Some(0.205), None));
        assert_eq!(params.curve_red.len(), 2);

        let back = AdjustmentParameters::from_json(&params.to_json().unwrap()).unwrap();
        assert_eq!(back.curve_red.pairs(), vec![(0.2, 0.1), (0.205, 0.9)]);
        assert_eq!(back, params);
    }

    #[test]
    fn test_json_is_flat_and_field_named() {
        let json: serde_json::Value = serde_json::from_str(&sample_edit().to_json().unwrap()).unwrap();
        assert_eq!(json["lut_path"], "/looks/film.cube");
        assert_eq!(json["lut_color_space"], "Log");
        assert_eq!(json["curve_blue"][0][0], 0.5);
        assert!(json.get("lut").is_none());
    }

    #[test]
    fn test_json_without_lut_decodes_to_none() {
        let json = AdjustmentParameters::default().to_json().unwrap();
        let back = AdjustmentParameters::from_json(&json).unwrap();
        assert!(back.lut.is_none());
        assert!(back.is_identity());
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let back = AdjustmentParameters::from_json(r#"{"exposure": 1.5}"#).unwrap();
        assert_eq!(back.exposure, 1.5);
        assert_eq!(back.temperature, NEUTRAL_TEMPERATURE);
    }

    #[test]
    fn test_reset_curves() {
        let mut params = sample_edit();
        params.reset_curves();
        assert!(!params.has_curves());
    }
}
