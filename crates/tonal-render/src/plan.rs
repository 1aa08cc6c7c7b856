//! Turns an adjustment value into an ordered list of compositor operations.
//!
//! Order is fixed: white balance gains, basic sliders, the composite RGB
//! cube, then the Red, Green, Blue and Luminance curves, then the external
//! LUT. Composite and per-channel curves compound simply by being applied
//! in that sequence. Identity steps are left out.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tonal_core::grading::channel::CurveKind;
use tonal_core::grading::curves::{ToneLut, generate};
use tonal_core::grading::white_balance::{channel_gains, is_neutral};
use tonal_core::transform::lut::Lut3D;
use tonal_core::transform::params::{AdjustmentParameters, LutReference};

use crate::compositor::{BasicAdjustments, Compositor};
use crate::error::RenderError;

/// One compositor operation.
#[derive(Debug, Clone)]
pub enum RenderStep {
    ChannelGains([f32; 3]),
    Basic(BasicAdjustments),
    /// Composite RGB curve, applied identically to all three components.
    CompositeCube(Arc<Lut3D>),
    ToneCurve { channel: CurveKind, lut: Box<ToneLut> },
    ExternalLut(LutReference),
}

/// The ordered operations for one render.
#[derive(Debug, Clone, Default)]
pub struct RenderPlan {
    pub steps: Vec<RenderStep>,
}

impl RenderPlan {
    /// Build the plan for `params`, baking curves as it goes.
    pub fn build(params: &AdjustmentParameters, cube_dimension: u32) -> Self {
        let mut steps = Vec::new();

        let gains = channel_gains(params.temperature, params.tint);
        if !is_neutral(gains) {
            steps.push(RenderStep::ChannelGains(gains));
        }

        let basic = BasicAdjustments::from_params(params);
        if !basic.is_identity() {
            steps.push(RenderStep::Basic(basic));
        }

        for kind in CurveKind::ALL {
            let channel = params.curve(kind);
            if channel.is_empty() {
                continue;
            }
            let lut = generate(channel);
            steps.push(match kind {
                CurveKind::Rgb => {
                    RenderStep::CompositeCube(Arc::new(Lut3D::from_tone_curve(&lut, cube_dimension)))
                }
                channel => RenderStep::ToneCurve {
                    channel,
                    lut: Box::new(lut),
                },
            });
        }

        if let Some(lut) = &params.lut
            && lut.alpha > 0.0
        {
            steps.push(RenderStep::ExternalLut(lut.clone()));
        }

        Self { steps }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step against `compositor`, starting from its source image.
    ///
    /// An external LUT that cannot be loaded is skipped.
    pub fn execute<C: Compositor>(
        &self,
        compositor: &C,
        luts: &LutCache,
    ) -> Result<C::Buffer, RenderError> {
        let mut buffer = compositor.source()?;
        for step in &self.steps {
            buffer = match step {
                RenderStep::ChannelGains(gains) => compositor.apply_channel_gains(buffer, *gains)?,
                RenderStep::Basic(basic) => compositor.apply_basic(buffer, basic)?,
                RenderStep::CompositeCube(cube) => {
                    compositor.apply_color_cube(buffer, cube.size, cube.as_floats())?
                }
                RenderStep::ToneCurve { channel, lut } => {
                    compositor.apply_tone_curve(buffer, lut, *channel)?
                }
                RenderStep::ExternalLut(reference) => match luts.get(&reference.path) {
                    Some(lut) => {
                        let blended = lut.blend_with_identity(reference.alpha);
                        compositor.apply_external_lut(
                            buffer,
                            blended.size,
                            blended.as_floats(),
                            reference.color_space,
                        )?
                    }
                    None => buffer,
                },
            };
        }
        Ok(buffer)
    }
}

/// Holds a single entry: the last requested path and its loaded LUT, or the
/// failed load. Requesting a different path replaces the entry, so switching
/// back reloads from disk.
#[derive(Default)]
pub struct LutCache {
    entry: Mutex<Option<(PathBuf, Option<Arc<Lut3D>>)>>,
}

impl LutCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The LUT at `path`, or `None` if it cannot be loaded.
    pub fn get(&self, path: &Path) -> Option<Arc<Lut3D>> {
        let mut entry = self.entry.lock();
        if let Some((cached, lut)) = entry.as_ref()
            && cached == path
        {
            return lut.clone();
        }
        let lut = Lut3D::load_or_none(path).map(Arc::new);
        *entry = Some((path.to_path_buf(), lut.clone()));
        lut
    }

    /// Drop the cached entry, forcing the next `get` to reload.
    pub fn invalidate(&self) {
        *self.entry.lock() = None;
    }
}
