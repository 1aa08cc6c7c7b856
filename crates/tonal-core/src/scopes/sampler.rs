//! Sampling capability consumed by calibration.
//!
//! Calibration never touches pixels directly: it asks a [`Sampler`] for
//! region averages and histograms. A compositor backend can implement this
//! on the GPU; [`ImageSampler`] is the CPU reference over a [`SampleImage`].

use crate::image::{MAX_ANALYSIS_EDGE, SampleImage};
use crate::scopes::histogram::{self, ChannelHistogram};

/// A rectangular pixel region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// A square of side `2 * radius + 1` centered on `(x, y)`, saturating at
    /// `u32::MAX`.
    pub fn around(x: u32, y: u32, radius: u32) -> Self {
        let side = radius.saturating_mul(2).saturating_add(1);
        Self {
            x: x.saturating_sub(radius),
            y: y.saturating_sub(radius),
            width: side,
            height: side,
        }
    }
}

/// Image statistics used by white balance and level calibration.
pub trait Sampler {
    /// Average linear RGB over a region. Regions are clipped to the image.
    fn region_average(&self, region: Region) -> [f32; 3];

    /// 256-bin per-channel histogram over the (possibly downsampled) image.
    fn histogram(&self) -> ChannelHistogram;

    /// Average linear RGB over the (possibly downsampled) image.
    fn mean(&self) -> [f32; 3];
}

/// CPU sampler over an in-memory image.
pub struct ImageSampler<'a> {
    image: &'a SampleImage,
    stride: u32,
}

impl<'a> ImageSampler<'a> {
    /// Sampler that visits at most [`MAX_ANALYSIS_EDGE`] pixels along the long edge.
    pub fn new(image: &'a SampleImage) -> Self {
        Self {
            image,
            stride: image.analysis_stride(MAX_ANALYSIS_EDGE),
        }
    }

    /// Sampler that visits every pixel.
    pub fn full_resolution(image: &'a SampleImage) -> Self {
        Self { image, stride: 1 }
    }
}

impl Sampler for ImageSampler<'_> {
    fn region_average(&self, region: Region) -> [f32; 3] {
        let img = self.image;
        if img.is_empty() {
            return [0.0; 3];
        }
        let x0 = region.x.min(img.width);
        let y0 = region.y.min(img.height);
        let x1 = region.x.saturating_add(region.width).min(img.width);
        let y1 = region.y.saturating_add(region.height).min(img.height);

        let mut sum = [0.0_f64; 3];
        let mut count = 0u64;
        for y in y0..y1 {
            for x in x0..x1 {
                let Some(px) = img.pixel(x, y) else {
                    continue;
                };
                for c in 0..3 {
                    sum[c] += px[c] as f64;
                }
                count += 1;
            }
        }
        if count == 0 {
            return [0.0; 3];
        }
        sum.map(|s| (s / count as f64) as f32)
    }

    fn histogram(&self) -> ChannelHistogram {
        histogram::compute(self.image, self.stride)
    }

    fn mean(&self) -> [f32; 3] {
        let mut sum = [0.0_f64; 3];
        let mut count = 0u64;
        for px in self.image.strided(self.stride) {
            for c in 0..3 {
                sum[c] += px[c] as f64;
            }
            count += 1;
        }
        if count == 0 {
            return [0.0; 3];
        }
        sum.map(|s| (s / count as f64) as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_image() -> SampleImage {
        // Left half black, right half white.
        let mut pixels = Vec::new();
        for _y in 0..4 {
            for x in 0..8 {
                let v = if x < 4 { 0.0 } else { 1.0 };
                pixels.push([v, v, v, 1.0]);
            }
        }
        SampleImage { width: 8, height: 4, pixels }
    }

    #[test]
    fn test_region_average_over_one_half() {
        let img = split_image();
        let sampler = ImageSampler::new(&img);
        let dark = sampler.region_average(Region { x: 0, y: 0, width: 4, height: 4 });
        let bright = sampler.region_average(Region { x: 4, y: 0, width: 4, height: 4 });
        assert_eq!(dark, [0.0; 3]);
        assert_eq!(bright, [1.0; 3]);
    }

    #[test]
    fn test_region_is_clipped_to_image() {
        let img = split_image();
        let sampler = ImageSampler::new(&img);
        let avg = sampler.region_average(Region::around(7, 3, 5));
        // Columns 2..8 survive clipping: two black, four white.
        assert!((avg[0] - 2.0 / 3.0).abs() < 1e-6, "clipped region average: {}", avg[0]);
        let outside = sampler.region_average(Region { x: 100, y: 100, width: 3, height: 3 });
        assert_eq!(outside, [0.0; 3]);
    }

    #[test]
    fn test_huge_radius_saturates_to_whole_image() {
        let region = Region::around(3, 2, u32::MAX);
        assert_eq!((region.x, region.y), (0, 0));
        assert_eq!(region.width, u32::MAX);
        let img = split_image();
        let avg = ImageSampler::new(&img).region_average(region);
        assert!((avg[0] - 0.5).abs() < 1e-6, "whole-image average: {}", avg[0]);
    }

    #[test]
    fn test_mean_and_histogram_agree() {
        let img = split_image();
        let sampler = ImageSampler::full_resolution(&img);
        let mean = sampler.mean();
        let hist_mean = sampler.histogram().mean();
        for c in 0..3 {
            assert!((mean[c] - 0.5).abs() < 1e-6);
            assert!((hist_mean[c] - 0.5).abs() < 1e-6);
        }
    }
}
