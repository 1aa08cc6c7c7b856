//! In-memory image used for statistics sampling.

/// Longest edge, in pixels, visited when computing whole-image statistics.
pub const MAX_ANALYSIS_EDGE: u32 = 2048;

/// Linear RGBA f32 image, row-major.
#[derive(Debug, Clone)]
pub struct SampleImage {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Pixel data in RGBA f32 linear format.
    pub pixels: Vec<[f32; 4]>,
}

impl SampleImage {
    /// Uniformly colored image, mostly useful for tests and calibration targets.
    pub fn uniform(width: u32, height: u32, rgb: [f32; 3]) -> Self {
        Self {
            width,
            height,
            pixels: vec![[rgb[0], rgb[1], rgb[2], 1.0]; width as usize * height as usize],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }

    /// The pixel at `(x, y)`, or `None` outside the image or past the end
    /// of a short `pixels` buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y as usize * self.width as usize + x as usize).copied()
    }

    /// Pixel stride that keeps the visited long edge at or under `max_edge`.
    pub fn analysis_stride(&self, max_edge: u32) -> u32 {
        let long_edge = self.width.max(self.height);
        long_edge.div_ceil(max_edge.max(1)).max(1)
    }

    /// Iterate pixels on a regular grid of the given stride. Grid positions
    /// past the end of `pixels` are skipped.
    pub fn strided(&self, stride: u32) -> impl Iterator<Item = [f32; 4]> + '_ {
        let stride = stride.max(1) as usize;
        let width = self.width as usize;
        (0..self.height as usize)
            .step_by(stride)
            .flat_map(move |y| {
                (0..width)
                    .step_by(stride)
                    .filter_map(move |x| self.pixels.get(y * width + x).copied())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_image_uses_unit_stride() {
        let img = SampleImage::uniform(640, 480, [0.5; 3]);
        assert_eq!(img.analysis_stride(MAX_ANALYSIS_EDGE), 1);
        assert_eq!(img.strided(1).count(), 640 * 480);
    }

    #[test]
    fn test_large_image_is_downsampled() {
        let img = SampleImage::uniform(4100, 10, [0.5; 3]);
        let stride = img.analysis_stride(MAX_ANALYSIS_EDGE);
        assert_eq!(stride, 3);
        assert!(img.width.div_ceil(stride) <= MAX_ANALYSIS_EDGE);
    }

    #[test]
    fn test_pixel_outside_image_is_none() {
        let img = SampleImage::uniform(3, 2, [0.5; 3]);
        assert_eq!(img.pixel(2, 1), Some([0.5, 0.5, 0.5, 1.0]));
        assert_eq!(img.pixel(3, 0), None);
        assert_eq!(img.pixel(0, 2), None);
        assert_eq!(img.pixel(u32::MAX, u32::MAX), None);
    }

    #[test]
    fn test_short_pixel_buffer_does_not_panic() {
        let img = SampleImage {
            width: 4,
            height: 4,
            pixels: vec![[1.0; 4]; 5],
        };
        assert_eq!(img.pixel(0, 1), Some([1.0; 4]));
        assert_eq!(img.pixel(1, 1), None);
        assert_eq!(img.strided(1).count(), 5);
    }
}
