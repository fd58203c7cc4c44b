// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster enhancement pipeline — mode normalization, denoising, and adaptive
// binarization of page images ahead of recognition.
//
// The chain is an ordered list of stages, each tagged with its outcome. A
// stage that cannot process the current image is skipped and the chain
// resumes from the last successful image, so the enhancer always returns
// *some* image. Recognition quality may degrade; the page is never lost.

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage, RgbaImage};
use imageproc::filter::median_filter;
use tracing::{debug, instrument, warn};

use crate::image::PageImage;

/// One step of the enhancement chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnhancementStage {
    /// Collapse alpha/exotic colour modes to flat grayscale or RGB.
    NormalizeMode,
    /// Median filtering to suppress speckle while keeping stroke edges.
    Denoise,
    /// Local-mean adaptive binarization.
    Threshold,
}

impl std::fmt::Display for EnhancementStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NormalizeMode => "normalize-mode",
            Self::Denoise => "denoise",
            Self::Threshold => "threshold",
        };
        f.write_str(name)
    }
}

/// Outcome of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    Applied,
    Skipped { reason: String },
}

/// What happened to each stage, in chain order.
#[derive(Debug, Clone)]
pub struct EnhancementReport {
    pub stages: Vec<(EnhancementStage, StageStatus)>,
}

impl EnhancementReport {
    /// True when any stage was skipped — the image handed to recognition is
    /// not fully enhanced.
    pub fn is_degraded(&self) -> bool {
        self.stages
            .iter()
            .any(|(_, status)| matches!(status, StageStatus::Skipped { .. }))
    }
}

/// The enhancer's output: the best image it could produce plus the stage
/// report.
#[derive(Debug)]
pub struct EnhancedPage {
    pub image: PageImage,
    pub report: EnhancementReport,
}

/// Normalizes and enhances page images for recognition.
///
/// Total over all supported colour modes: enhancement never fails a page,
/// it only degrades.
pub struct RasterEnhancer {
    /// Neighbourhood radius for the local-mean threshold.
    block_radius: u32,
    /// Constant subtracted from the local mean before comparing.
    threshold_offset: i32,
    /// Median filter radius.
    denoise_radius: u32,
}

impl Default for RasterEnhancer {
    fn default() -> Self {
        Self {
            block_radius: 15,
            threshold_offset: 10,
            denoise_radius: 1,
        }
    }
}

impl RasterEnhancer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the full chain, producing a new image and a per-stage report.
    #[instrument(skip_all, fields(
        width = page.width(),
        height = page.height(),
        mode = page.color_mode(),
    ))]
    pub fn enhance(&self, page: &PageImage) -> EnhancedPage {
        let mut current = page.as_dynamic().clone();
        let mut stages = Vec::with_capacity(3);

        for stage in [
            EnhancementStage::NormalizeMode,
            EnhancementStage::Denoise,
            EnhancementStage::Threshold,
        ] {
            let outcome = match stage {
                EnhancementStage::NormalizeMode => self.normalize_mode(&current),
                EnhancementStage::Denoise => self.denoise(&current),
                EnhancementStage::Threshold => self.threshold(&current),
            };
            match outcome {
                Ok(next) => {
                    current = next;
                    stages.push((stage, StageStatus::Applied));
                }
                Err(reason) => {
                    warn!(%stage, %reason, "enhancement stage skipped");
                    stages.push((stage, StageStatus::Skipped { reason }));
                }
            }
        }

        let report = EnhancementReport { stages };
        debug!(degraded = report.is_degraded(), "enhancement chain complete");
        EnhancedPage {
            image: PageImage::from_dynamic(current),
            report,
        }
    }

    /// Flatten the colour mode: composite alpha over opaque white, convert
    /// anything exotic to 8-bit RGB.
    fn normalize_mode(&self, image: &DynamicImage) -> Result<DynamicImage, String> {
        if image.width() == 0 || image.height() == 0 {
            return Err("image has a zero dimension".to_string());
        }
        match image {
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => Ok(image.clone()),
            DynamicImage::ImageLumaA8(img) => {
                let flat = GrayImage::from_fn(img.width(), img.height(), |x, y| {
                    let [v, a] = img.get_pixel(x, y).0;
                    Luma([blend_over_white(v, a)])
                });
                Ok(DynamicImage::ImageLuma8(flat))
            }
            DynamicImage::ImageRgba8(img) => {
                Ok(DynamicImage::ImageRgb8(composite_over_white(img)))
            }
            other if other.color().has_alpha() => {
                // 16-bit / float alpha formats: reduce to rgba8 first.
                Ok(DynamicImage::ImageRgb8(composite_over_white(
                    &other.to_rgba8(),
                )))
            }
            other => Ok(DynamicImage::ImageRgb8(other.to_rgb8())),
        }
    }

    fn denoise(&self, image: &DynamicImage) -> Result<DynamicImage, String> {
        let gray = image.to_luma8();
        let (width, height) = gray.dimensions();
        if width <= self.denoise_radius * 2 || height <= self.denoise_radius * 2 {
            return Err(format!("{}x{} too small for median filter", width, height));
        }
        let filtered = median_filter(&gray, self.denoise_radius, self.denoise_radius);
        Ok(DynamicImage::ImageLuma8(filtered))
    }

    /// Adaptive binarization: for each pixel the threshold is the mean
    /// intensity of its `block_radius` neighbourhood minus a constant
    /// offset, computed over an integral image.
    fn threshold(&self, image: &DynamicImage) -> Result<DynamicImage, String> {
        let gray = image.to_luma8();
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Err("image has a zero dimension".to_string());
        }

        let integral = integral_image(&gray);
        let mut output = GrayImage::new(width, height);

        for y in 0..height {
            for x in 0..width {
                let mean = region_mean(&integral, width, height, x, y, self.block_radius);
                let threshold = (mean as i32 - self.threshold_offset).clamp(0, 255) as u8;
                let value = if gray.get_pixel(x, y).0[0] < threshold {
                    0u8
                } else {
                    255u8
                };
                output.put_pixel(x, y, Luma([value]));
            }
        }

        Ok(DynamicImage::ImageLuma8(output))
    }
}

fn blend_over_white(value: u8, alpha: u8) -> u8 {
    let a = alpha as u16;
    ((value as u16 * a + 255 * (255 - a)) / 255) as u8
}

fn composite_over_white(img: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let [r, g, b, a] = img.get_pixel(x, y).0;
        Rgb([
            blend_over_white(r, a),
            blend_over_white(g, a),
            blend_over_white(b, a),
        ])
    })
}

/// Summed-area table with a zero-padded border: entry
/// `(y + 1) * (width + 1) + (x + 1)` holds the sum of all pixels in
/// `[0..=x, 0..=y]`.
fn integral_image(gray: &GrayImage) -> Vec<u64> {
    let (width, height) = gray.dimensions();
    let stride = (width + 1) as usize;
    let mut table = vec![0u64; stride * (height + 1) as usize];

    for y in 0..height {
        let mut row_sum = 0u64;
        for x in 0..width {
            row_sum += gray.get_pixel(x, y).0[0] as u64;
            let idx = (y + 1) as usize * stride + (x + 1) as usize;
            table[idx] = row_sum + table[idx - stride];
        }
    }
    table
}

/// Mean pixel value in the square neighbourhood of (cx, cy), clamped to the
/// image bounds.
fn region_mean(
    integral: &[u64],
    width: u32,
    height: u32,
    cx: u32,
    cy: u32,
    radius: u32,
) -> f64 {
    let stride = (width + 1) as usize;
    let x1 = cx.saturating_sub(radius) as usize;
    let y1 = cy.saturating_sub(radius) as usize;
    let x2 = ((cx + radius + 1) as usize).min(width as usize);
    let y2 = ((cy + radius + 1) as usize).min(height as usize);

    let area = ((x2 - x1) * (y2 - y1)) as f64;
    if area == 0.0 {
        return 128.0;
    }

    let sum = integral[y2 * stride + x2] as f64 - integral[y1 * stride + x2] as f64
        - integral[y2 * stride + x1] as f64
        + integral[y1 * stride + x1] as f64;
    sum / area
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{LumaA, Rgba};

    fn enhancer() -> RasterEnhancer {
        RasterEnhancer::new()
    }

    /// A gray page with a dark square of "ink" in the middle.
    fn inked_gray(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            if (10..30).contains(&x) && (10..30).contains(&y) {
                Luma([20u8])
            } else {
                Luma([230u8])
            }
        })
    }

    #[test]
    fn full_chain_applies_on_plain_rgb() {
        let rgb = DynamicImage::ImageLuma8(inked_gray(64, 64)).to_rgb8();
        let page = PageImage::from_dynamic(DynamicImage::ImageRgb8(rgb));

        let enhanced = enhancer().enhance(&page);
        assert!(!enhanced.report.is_degraded());
        assert_eq!(enhanced.report.stages.len(), 3);
        for (_, status) in &enhanced.report.stages {
            assert_eq!(*status, StageStatus::Applied);
        }

        // Thresholding leaves a bilevel image.
        let out = enhanced.image.as_dynamic().to_luma8();
        assert!(out.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        // Ink stays ink, background stays background.
        assert_eq!(out.get_pixel(20, 20).0[0], 0);
        assert_eq!(out.get_pixel(50, 50).0[0], 255);
    }

    #[test]
    fn transparent_rgba_composites_like_flattened_rgb() {
        // Dark ink over a fully transparent background...
        let rgba = RgbaImage::from_fn(64, 64, |x, y| {
            if (10..30).contains(&x) && (10..30).contains(&y) {
                Rgba([20, 20, 20, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        // ...versus the same ink over opaque white.
        let rgb = RgbImage::from_fn(64, 64, |x, y| {
            if (10..30).contains(&x) && (10..30).contains(&y) {
                Rgb([20, 20, 20])
            } else {
                Rgb([255, 255, 255])
            }
        });

        let from_rgba = enhancer().enhance(&PageImage::from_dynamic(DynamicImage::ImageRgba8(rgba)));
        let from_rgb = enhancer().enhance(&PageImage::from_dynamic(DynamicImage::ImageRgb8(rgb)));

        assert!(!from_rgba.report.is_degraded());
        assert_eq!(
            from_rgba.image.as_dynamic().to_luma8().as_raw(),
            from_rgb.image.as_dynamic().to_luma8().as_raw(),
        );
    }

    #[test]
    fn luma_alpha_flattens_to_gray() {
        let img = image::GrayAlphaImage::from_pixel(16, 16, LumaA([40u8, 0u8]));
        let page = PageImage::from_dynamic(DynamicImage::ImageLumaA8(img));

        let enhanced = enhancer().enhance(&page);
        // Fully transparent pixels become white, so the threshold output is
        // all background.
        let out = enhanced.image.as_dynamic().to_luma8();
        assert!(out.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn zero_dimension_image_degrades_but_returns() {
        let page = PageImage::from_dynamic(DynamicImage::ImageLuma8(GrayImage::new(0, 0)));
        let enhanced = enhancer().enhance(&page);

        assert!(enhanced.report.is_degraded());
        for (_, status) in &enhanced.report.stages {
            assert!(matches!(status, StageStatus::Skipped { .. }));
        }
        assert_eq!(enhanced.image.width(), 0);
    }

    #[test]
    fn tiny_image_skips_denoise_only() {
        let page = PageImage::from_dynamic(DynamicImage::ImageLuma8(GrayImage::from_pixel(
            2,
            2,
            Luma([100u8]),
        )));
        let enhanced = enhancer().enhance(&page);

        let statuses: Vec<_> = enhanced
            .report
            .stages
            .iter()
            .map(|(stage, status)| (*stage, matches!(status, StageStatus::Applied)))
            .collect();
        assert_eq!(statuses[0], (EnhancementStage::NormalizeMode, true));
        assert_eq!(statuses[1], (EnhancementStage::Denoise, false));
        assert_eq!(statuses[2], (EnhancementStage::Threshold, true));
        assert!(enhanced.report.is_degraded());
    }

    #[test]
    fn uniform_gray_thresholds_to_blank_white() {
        let page = PageImage::from_dynamic(DynamicImage::ImageLuma8(GrayImage::from_pixel(
            32,
            32,
            Luma([200u8]),
        )));
        let enhanced = enhancer().enhance(&page);
        let out = enhanced.image.as_dynamic().to_luma8();
        assert!(out.pixels().all(|p| p.0[0] == 255));
    }
}
