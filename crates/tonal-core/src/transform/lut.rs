//! 3D LUT baking, application, and LUT file I/O.
//!
//! One type serves both purposes a color cube has here: carrying the
//! composite RGB curve (applied identically to R, G and B) and carrying an
//! externally authored LUT loaded from `.cube`, `.3dl` or raw float files.
//!
//! Entries are stored with red varying fastest, then green, then blue.

use std::fmt::Write as _;
use std::path::Path;

use crate::grading::curves::{ToneLut, sample_lut};

/// Grid sizes accepted for headerless binary LUTs.
const RAW_CANDIDATE_SIZES: [u32; 5] = [16, 17, 32, 33, 64];

/// Largest grid size accepted from any file header.
const MAX_LUT_SIZE: u32 = 256;

/// Errors produced while reading a LUT file.
#[derive(Debug, thiserror::Error)]
pub enum LutError {
    #[error("failed to read LUT file: {0}")]
    Io(#[from] std::io::Error),
    #[error("missing LUT size header")]
    MissingHeader,
    #[error("invalid LUT size header: {0}")]
    InvalidHeader(String),
    #[error("invalid number on line {line}: {text}")]
    InvalidNumber { line: usize, text: String },
    #[error("expected {expected} samples, found {found}")]
    SampleCount { expected: usize, found: usize },
    #[error("cannot infer LUT dimension from {0} bytes")]
    UnknownDimension(usize),
    #[error("unsupported LUT format: {0}")]
    Unsupported(String),
}

/// A 3D lookup table for color transform application.
///
/// The LUT maps input RGB values to output RGB values using trilinear
/// interpolation. Typical sizes are 33³ or 64³ entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut3D {
    /// Grid size per axis.
    pub size: u32,
    /// LUT entries as RGBA values. Length = size³.
    pub data: Vec<[f32; 4]>,
    /// Minimum domain values per channel.
    pub domain_min: [f32; 3],
    /// Maximum domain values per channel.
    pub domain_max: [f32; 3],
}

impl Lut3D {
    /// Identity cube of the given grid size (clamped to at least 2).
    pub fn identity(size: u32) -> Self {
        Self::from_fn(size, |rgb| rgb)
    }

    /// Build a cube by evaluating `f` at every grid coordinate.
    pub fn from_fn(size: u32, mut f: impl FnMut([f32; 3]) -> [f32; 3]) -> Self {
        let size = size.max(2);
        let n = size as usize;
        let scale = 1.0 / (size - 1) as f32;
        let mut data = Vec::with_capacity(n * n * n);
        for b in 0..n {
            for g in 0..n {
                for r in 0..n {
                    let out = f([r as f32 * scale, g as f32 * scale, b as f32 * scale]);
                    data.push([out[0], out[1], out[2], 1.0]);
                }
            }
        }
        Self {
            size,
            data,
            domain_min: [0.0; 3],
            domain_max: [1.0; 3],
        }
    }

    /// Bake a composite tone curve into a cube.
    ///
    /// Every grid point `(r, g, b)` maps to `(curve(r), curve(g), curve(b))`,
    /// so the curve acts on all three components simultaneously rather than
    /// on a derived luminance.
    pub fn from_tone_curve(curve: &ToneLut, size: u32) -> Self {
        Self::from_fn(size, |[r, g, b]| {
            [sample_lut(curve, r), sample_lut(curve, g), sample_lut(curve, b)]
        })
    }

    /// Mix this cube with the identity: `alpha = 0` is identity, `1` is unchanged.
    pub fn blend_with_identity(&self, alpha: f32) -> Self {
        let alpha = alpha.clamp(0.0, 1.0);
        let n = (self.size as usize).max(1);
        let scale = 1.0 / (self.size.max(2) - 1) as f32;
        let data = self
            .data
            .iter()
            .enumerate()
            .map(|(i, px)| {
                let grid = [
                    (i % n) as f32 * scale,
                    ((i / n) % n) as f32 * scale,
                    (i / (n * n)) as f32 * scale,
                ];
                let mut out = [0.0_f32, 0.0, 0.0, 1.0];
                for c in 0..3 {
                    out[c] = grid[c] + (px[c] - grid[c]) * alpha;
                }
                out
            })
            .collect();
        Self {
            size: self.size,
            data,
            domain_min: self.domain_min,
            domain_max: self.domain_max,
        }
    }

    /// Flattened RGBA floats, the layout a compositor cube filter consumes.
    pub fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.data)
    }

    /// True when `size` is at least 2 and `data` holds exactly `size³` entries.
    pub fn is_well_formed(&self) -> bool {
        let n = self.size as usize;
        self.size >= 2 && n.checked_pow(3) == Some(self.data.len())
    }

    /// Apply this LUT to an RGB pixel using trilinear interpolation.
    ///
    /// A cube that is not [well formed](Self::is_well_formed) passes the
    /// pixel through unchanged.
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        if !self.is_well_formed() {
            return rgb;
        }
        let n = self.size as usize;
        let max = (self.size - 1) as f32;

        let mut base = [0usize; 3];
        let mut frac = [0.0_f32; 3];
        for c in 0..3 {
            let range = (self.domain_max[c] - self.domain_min[c]).max(1e-10);
            let t = ((rgb[c] - self.domain_min[c]) / range).clamp(0.0, 1.0) * max;
            let i = (t.floor() as usize).min(n - 2);
            base[c] = i;
            frac[c] = t - i as f32;
        }

        let at = |r: usize, g: usize, b: usize| self.data[r + g * n + b * n * n];

        let mut out = [0.0_f32; 3];
        for (corner, weight) in (0..8).map(|k| {
            let dr = k & 1;
            let dg = (k >> 1) & 1;
            let db = (k >> 2) & 1;
            let w = (if dr == 1 { frac[0] } else { 1.0 - frac[0] })
                * (if dg == 1 { frac[1] } else { 1.0 - frac[1] })
                * (if db == 1 { frac[2] } else { 1.0 - frac[2] });
            (at(base[0] + dr, base[1] + dg, base[2] + db), w)
        }) {
            for c in 0..3 {
                out[c] += corner[c] * weight;
            }
        }
        out
    }

    /// Load a LUT, choosing the parser from the file extension.
    ///
    /// `.cube` and `.3dl` are parsed as text; anything else as raw floats.
    pub fn load(path: &Path) -> Result<Self, LutError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("cube") => Self::parse_cube(&std::fs::read_to_string(path)?),
            Some("3dl") => Self::parse_3dl(&std::fs::read_to_string(path)?),
            _ => Self::parse_raw(&std::fs::read(path)?),
        }
    }

    /// Load a LUT, reporting any failure as "no LUT loaded".
    pub fn load_or_none(path: &Path) -> Option<Self> {
        match Self::load(path) {
            Ok(lut) => {
                tracing::debug!("loaded {}³ LUT from {}", lut.size, path.display());
                Some(lut)
            }
            Err(e) => {
                tracing::warn!("failed to load LUT {}: {e}", path.display());
                None
            }
        }
    }

    /// Parse Resolve/Adobe `.cube` text.
    pub fn parse_cube(text: &str) -> Result<Self, LutError> {
        let mut size: Option<u32> = None;
        let mut domain_min = [0.0_f32; 3];
        let mut domain_max = [1.0_f32; 3];
        let mut data = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let Some(first) = fields.next() else {
                continue;
            };
            match first {
                "TITLE" => {}
                "LUT_1D_SIZE" => {
                    return Err(LutError::Unsupported("1D .cube".to_string()));
                }
                "LUT_3D_SIZE" => {
                    let value = fields.next().unwrap_or_default();
                    size = Some(parse_size(value)?);
                }
                "DOMAIN_MIN" => domain_min = parse_triplet(fields, line_no, line)?,
                "DOMAIN_MAX" => domain_max = parse_triplet(fields, line_no, line)?,
                "LUT_3D_INPUT_RANGE" => {
                    let bounds: Vec<f32> = fields.filter_map(|f| f.parse().ok()).collect();
                    let [lo, hi] = bounds[..] else {
                        return Err(LutError::InvalidHeader(line.to_string()));
                    };
                    domain_min = [lo; 3];
                    domain_max = [hi; 3];
                }
                _ => {
                    let rgb = parse_triplet(line.split_whitespace(), line_no, line)?;
                    data.push([rgb[0], rgb[1], rgb[2], 1.0]);
                }
            }
        }

        let size = size.ok_or(LutError::MissingHeader)?;
        check_count(size, data.len())?;
        Ok(Self {
            size,
            data,
            domain_min,
            domain_max,
        })
    }

    /// Parse Autodesk/Lustre `.3dl` text.
    ///
    /// The `Mesh <bits> <depth>` header gives a grid of `2^bits + 1`. Lines
    /// with other than three values (the input shaper) are skipped. Integer
    /// samples are normalized by the largest value present. Samples are
    /// stored blue-fastest in the file and reordered to red-fastest.
    pub fn parse_3dl(text: &str) -> Result<Self, LutError> {
        let mut size: Option<u32> = None;
        let mut samples: Vec<[u32; 3]> = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields[0].eq_ignore_ascii_case("mesh") {
                let bits: u32 = fields
                    .get(1)
                    .and_then(|s| s.parse().ok())
                    .filter(|b| (1..=8).contains(b))
                    .ok_or_else(|| LutError::InvalidHeader(line.to_string()))?;
                size = Some((1 << bits) + 1);
                continue;
            }
            if fields.len() != 3 {
                continue;
            }
            let mut triplet = [0u32; 3];
            for (slot, field) in triplet.iter_mut().zip(&fields) {
                *slot = field.parse().map_err(|_| LutError::InvalidNumber {
                    line: line_no,
                    text: line.to_string(),
                })?;
            }
            samples.push(triplet);
        }

        let size = size.ok_or(LutError::MissingHeader)?;
        check_count(size, samples.len())?;

        let max = samples.iter().flatten().copied().max().unwrap_or(0).max(1) as f32;
        let n = size as usize;
        let mut data = vec![[0.0_f32, 0.0, 0.0, 1.0]; n * n * n];
        for (file_idx, s) in samples.iter().enumerate() {
            let r = file_idx / (n * n);
            let g = (file_idx / n) % n;
            let b = file_idx % n;
            data[r + g * n + b * n * n] = [s[0] as f32 / max, s[1] as f32 / max, s[2] as f32 / max, 1.0];
        }

        Ok(Self {
            size,
            data,
            domain_min: [0.0; 3],
            domain_max: [1.0; 3],
        })
    }

    /// Parse a headerless little-endian `f32` RGB (or RGBA) cube.
    ///
    /// The grid size is inferred from the byte length against the common
    /// sizes 16, 17, 32, 33 and 64.
    pub fn parse_raw(bytes: &[u8]) -> Result<Self, LutError> {
        let channels = RAW_CANDIDATE_SIZES
            .iter()
            .flat_map(|&n| [(n, 3usize), (n, 4usize)])
            .find(|&(n, ch)| (n as usize).pow(3) * ch * 4 == bytes.len());

        let Some((size, channels)) = channels else {
            return Err(LutError::UnknownDimension(bytes.len()));
        };

        let floats: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        let data = floats
            .chunks_exact(channels)
            .map(|px| [px[0], px[1], px[2], 1.0])
            .collect();

        Ok(Self {
            size,
            data,
            domain_min: [0.0; 3],
            domain_max: [1.0; 3],
        })
    }

    /// Serialize as `.cube` text.
    pub fn to_cube_string(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "LUT_3D_SIZE {}", self.size);
        let [a, b, c] = self.domain_min;
        let _ = writeln!(out, "DOMAIN_MIN {a:.6} {b:.6} {c:.6}");
        let [a, b, c] = self.domain_max;
        let _ = writeln!(out, "DOMAIN_MAX {a:.6} {b:.6} {c:.6}");
        for px in &self.data {
            let _ = writeln!(out, "{:.6} {:.6} {:.6}", px[0], px[1], px[2]);
        }
        out
    }

    /// Save this 3D LUT to a `.cube` file.
    pub fn save_cube(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.to_cube_string())
    }
}

fn parse_size(value: &str) -> Result<u32, LutError> {
    value
        .parse::<u32>()
        .ok()
        .filter(|n| (2..=MAX_LUT_SIZE).contains(n))
        .ok_or_else(|| LutError::InvalidHeader(value.to_string()))
}

fn parse_triplet<'a>(
    fields: impl Iterator<Item = &'a str>,
    line: usize,
    text: &str,
) -> Result<[f32; 3], LutError> {
    let invalid = || LutError::InvalidNumber {
        line,
        text: text.to_string(),
    };
    let values: Vec<f32> = fields
        .map(|f| f.parse::<f32>().map_err(|_| invalid()))
        .collect::<Result<_, _>>()?;
    match values.as_slice() {
        [r, g, b] => Ok([*r, *g, *b]),
        _ => Err(invalid()),
    }
}

fn check_count(size: u32, found: usize) -> Result<(), LutError> {
    let expected = (size as usize).pow(3);
    if found != expected {
        return Err(LutError::SampleCount { expected, found });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::curves::identity_lut;

    const EPSILON: f32 = 1e-5;

    fn identity_cube_text(size: u32) -> String {
        Lut3D::identity(size).to_cube_string()
    }

    #[test]
    fn test_identity_apply_is_passthrough() {
        let lut = Lut3D::identity(17);
        let rgb = [0.2, 0.55, 0.9];
        let out = lut.apply(rgb);
        for c in 0..3 {
            assert!((out[c] - rgb[c]).abs() < 1e-4, "channel {c}: {}", out[c]);
        }
    }

    #[test]
    fn test_malformed_cube_passes_pixels_through() {
        let rgb = [0.2, 0.55, 0.9];
        let degenerate = Lut3D {
            size: 1,
            data: vec![[1.0, 0.0, 0.0, 1.0]],
            domain_min: [0.0; 3],
            domain_max: [1.0; 3],
        };
        assert!(!degenerate.is_well_formed());
        assert_eq!(degenerate.apply(rgb), rgb);

        let mut short = Lut3D::identity(4);
        short.data.truncate(10);
        assert!(!short.is_well_formed());
        assert_eq!(short.apply(rgb), rgb);
        assert_eq!(short.blend_with_identity(0.5).data.len(), 10);

        let empty = Lut3D { size: 0, data: Vec::new(), ..degenerate };
        assert_eq!(empty.apply(rgb), rgb);
        assert!(empty.blend_with_identity(0.5).data.is_empty());
    }

    #[test]
    fn test_red_varies_fastest() {
        let lut = Lut3D::identity(4);
        assert!((lut.data[1][0] - 1.0 / 3.0).abs() < EPSILON);
        assert!(lut.data[1][1].abs() < EPSILON);
        assert!((lut.data[4][1] - 1.0 / 3.0).abs() < EPSILON);
        assert!((lut.data[16][2] - 1.0 / 3.0).abs() < EPSILON);
    }

    #[test]
    fn test_tone_curve_cube_applies_per_component() {
        let mut curve = identity_lut();
        for v in curve.iter_mut() {
            *v = 1.0 - *v;
        }
        let lut = Lut3D::from_tone_curve(&curve, 8);
        let out = lut.apply([0.0, 1.0, 0.0]);
        assert!((out[0] - 1.0).abs() < 1e-4);
        assert!(out[1].abs() < 1e-4);
        assert!((out[2] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_as_floats_is_flattened_rgba() {
        let lut = Lut3D::identity(2);
        let floats = lut.as_floats();
        assert_eq!(floats.len(), 8 * 4);
        assert_eq!(&floats[4..8], &[1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_blend_zero_alpha_is_identity() {
        let inverted = Lut3D::from_fn(5, |[r, g, b]| [1.0 - r, 1.0 - g, 1.0 - b]);
        assert_eq!(inverted.blend_with_identity(0.0), Lut3D::identity(5));
        assert_eq!(inverted.blend_with_identity(1.0), inverted);
    }

    #[test]
    fn test_parse_cube_roundtrip_identity() {
        let lut = Lut3D::parse_cube(&identity_cube_text(5)).unwrap();
        assert_eq!(lut.size, 5);
        assert_eq!(lut.data.len(), 125);
    }

    #[test]
    fn test_parse_cube_with_comments_and_title() {
        let text = "# made by hand\nTITLE \"test\"\nLUT_3D_SIZE 2\n\
            0 0 0\n1 0 0\n0 1 0\n1 1 0\n0 0 1\n1 0 1\n0 1 1\n1 1 1\n";
        let lut = Lut3D::parse_cube(text).unwrap();
        assert_eq!(lut.size, 2);
        assert_eq!(lut.data[7], [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_parse_cube_wrong_sample_count_fails() {
        let text = "LUT_3D_SIZE 2\n0 0 0\n1 1 1\n";
        assert!(matches!(
            Lut3D::parse_cube(text),
            Err(LutError::SampleCount { expected: 8, found: 2 })
        ));
    }

    #[test]
    fn test_parse_cube_missing_header_fails() {
        assert!(matches!(
            Lut3D::parse_cube("0 0 0\n"),
            Err(LutError::MissingHeader)
        ));
    }

    #[test]
    fn test_parse_3dl_normalizes_and_reorders() {
        // Mesh 2 → 5³ grid, blue varying fastest in the file.
        let mut text = String::from("Mesh 2 12\n0 1023 2047 3071 4095\n");
        for r in 0..5u32 {
            for g in 0..5u32 {
                for b in 0..5u32 {
                    text.push_str(&format!("{} {} {}\n", r * 1000, g * 1000, b * 1000));
                }
            }
        }
        let lut = Lut3D::parse_3dl(&text).unwrap();
        assert_eq!(lut.size, 5);
        // Grid (r=1, g=0, b=0) sits at index 1 in red-fastest order.
        assert!((lut.data[1][0] - 0.25).abs() < EPSILON);
        assert!(lut.data[1][2].abs() < EPSILON);
        // Grid (r=0, g=0, b=1) sits at index 25.
        assert!((lut.data[25][2] - 0.25).abs() < EPSILON);
        assert!(lut.data[25][0].abs() < EPSILON);
        assert!((lut.data[124][0] - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_parse_3dl_without_mesh_fails() {
        assert!(matches!(
            Lut3D::parse_3dl("0 0 0\n"),
            Err(LutError::MissingHeader)
        ));
    }

    #[test]
    fn test_parse_raw_infers_dimension() {
        let lut = Lut3D::identity(16);
        let bytes: Vec<u8> = lut
            .data
            .iter()
            .flat_map(|px| px[..3].iter().flat_map(|v| v.to_le_bytes()))
            .collect();
        let parsed = Lut3D::parse_raw(&bytes).unwrap();
        assert_eq!(parsed.size, 16);
        assert_eq!(parsed, lut);
    }

    #[test]
    fn test_parse_raw_unknown_length_fails() {
        assert!(matches!(
            Lut3D::parse_raw(&[0u8; 100]),
            Err(LutError::UnknownDimension(100))
        ));
    }

    #[test]
    fn test_load_or_none_missing_file() {
        assert!(Lut3D::load_or_none(Path::new("/nonexistent/look.cube")).is_none());
    }
}
