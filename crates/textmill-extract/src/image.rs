// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page image — the raster representation of one page (or one whole-image
// upload) handed between the rasterizer, the enhancer, and the OCR adapter.

use image::DynamicImage;
use textmill_core::error::ExtractError;
use tracing::debug;

/// A decoded raster image for one page.
///
/// Wraps `image::DynamicImage`: pixel data, colour mode, and dimensions.
/// Enhancement stages never mutate a `PageImage` in place — each stage
/// produces a new one.
#[derive(Clone)]
pub struct PageImage {
    image: DynamicImage,
}

impl PageImage {
    /// Decode an uploaded image from raw encoded bytes (PNG, JPEG, TIFF).
    pub fn from_bytes(data: &[u8]) -> Result<Self, ExtractError> {
        let image = image::load_from_memory(data)
            .map_err(|err| ExtractError::ImageError(format!("failed to decode image: {}", err)))?;
        debug!(
            width = image.width(),
            height = image.height(),
            mode = Self::mode_name(&image),
            "image decoded from bytes"
        );
        Ok(Self { image })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Name of the colour mode, for logs and diagnostics.
    pub fn color_mode(&self) -> &'static str {
        Self::mode_name(&self.image)
    }

    /// Whether the pixel format carries an alpha channel.
    pub fn has_alpha(&self) -> bool {
        self.image.color().has_alpha()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    fn mode_name(image: &DynamicImage) -> &'static str {
        match image {
            DynamicImage::ImageLuma8(_) => "luma8",
            DynamicImage::ImageLumaA8(_) => "luma-alpha8",
            DynamicImage::ImageRgb8(_) => "rgb8",
            DynamicImage::ImageRgba8(_) => "rgba8",
            DynamicImage::ImageLuma16(_) => "luma16",
            DynamicImage::ImageLumaA16(_) => "luma-alpha16",
            DynamicImage::ImageRgb16(_) => "rgb16",
            DynamicImage::ImageRgba16(_) => "rgba16",
            DynamicImage::ImageRgb32F(_) => "rgb32f",
            DynamicImage::ImageRgba32F(_) => "rgba32f",
            _ => "other",
        }
    }
}

impl std::fmt::Debug for PageImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("mode", &self.color_mode())
            .finish()
    }
}
