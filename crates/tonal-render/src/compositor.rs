//! The pixel compositing capability this crate drives but does not implement.
//!
//! A backend (Core Image, a GPU pipeline, a CPU reference) implements
//! [`Compositor`]; every operation consumes an input buffer and returns a new
//! one, so a render is a straight chain from [`Compositor::source`].

use tonal_core::grading::channel::CurveKind;
use tonal_core::grading::curves::ToneLut;
use tonal_core::transform::params::{AdjustmentParameters, LutColorSpace};

use crate::error::CompositorError;

/// Slider values the compositor applies directly.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicAdjustments {
    pub exposure: f32,
    pub contrast: f32,
    pub highlights: f32,
    pub shadows: f32,
    pub whites: f32,
    pub blacks: f32,
    pub saturation: f32,
    pub vibrance: f32,
    pub sharpness: f32,
    pub clarity: f32,
    pub dehaze: f32,
    pub vignette: f32,
    pub grain: f32,
    pub noise_reduction: f32,
    pub rotation: u8,
    pub straighten: f32,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

impl BasicAdjustments {
    pub fn from_params(params: &AdjustmentParameters) -> Self {
        Self {
            exposure: params.exposure,
            contrast: params.contrast,
            highlights: params.highlights,
            shadows: params.shadows,
            whites: params.whites,
            blacks: params.blacks,
            saturation: params.saturation,
            vibrance: params.vibrance,
            sharpness: params.sharpness,
            clarity: params.clarity,
            dehaze: params.dehaze,
            vignette: params.vignette,
            grain: params.grain,
            noise_reduction: params.noise_reduction,
            rotation: params.rotation % 4,
            straighten: params.straighten,
            flip_horizontal: params.flip_horizontal,
            flip_vertical: params.flip_vertical,
        }
    }

    /// True when every slider sits at its neutral value.
    pub fn is_identity(&self) -> bool {
        *self == Self::from_params(&AdjustmentParameters::default())
    }
}

/// External image compositing backend.
pub trait Compositor: Send + Sync + 'static {
    type Buffer: Send + 'static;

    /// The unedited image for the current session.
    fn source(&self) -> Result<Self::Buffer, CompositorError>;

    /// Multiply R, G and B by per-channel gains.
    fn apply_channel_gains(
        &self,
        input: Self::Buffer,
        gains: [f32; 3],
    ) -> Result<Self::Buffer, CompositorError>;

    /// Apply the slider-driven adjustments.
    fn apply_basic(
        &self,
        input: Self::Buffer,
        adjustments: &BasicAdjustments,
    ) -> Result<Self::Buffer, CompositorError>;

    /// Apply a 3D color cube given as flattened RGBA floats, red fastest.
    fn apply_color_cube(
        &self,
        input: Self::Buffer,
        dimension: u32,
        data: &[f32],
    ) -> Result<Self::Buffer, CompositorError>;

    /// Apply a 256-entry transfer function to one channel.
    fn apply_tone_curve(
        &self,
        input: Self::Buffer,
        lut: &ToneLut,
        channel: CurveKind,
    ) -> Result<Self::Buffer, CompositorError>;

    /// Apply an external LUT that expects input in `color_space`.
    ///
    /// Backends that manage encodings override this; the default treats the
    /// LUT as a plain color cube.
    fn apply_external_lut(
        &self,
        input: Self::Buffer,
        dimension: u32,
        data: &[f32],
        color_space: LutColorSpace,
    ) -> Result<Self::Buffer, CompositorError> {
        let _ = color_space;
        self.apply_color_cube(input, dimension, data)
    }
}
