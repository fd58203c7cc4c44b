// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page rasterization — converts one PDF page into a raster image for the
// OCR path.
//
// Scanned documents embed each page as a full-page image XObject. The
// rasterizer walks the page's resource dictionary (honouring /Resources
// inheritance), decodes the largest image stream it can, and scales the
// result to the configured render density using the page's MediaBox.
// Vector-only pages have nothing to decode and fail per-page; the caller
// records the failure and continues with the remaining pages.

use image::{DynamicImage, GrayImage, RgbImage, imageops::FilterType};
use lopdf::{Dictionary, Document, Object, ObjectId};
use textmill_core::config::ExtractionConfig;
use textmill_core::error::PageFailure;
use tracing::{debug, instrument, trace};

use super::source::PdfSource;
use crate::image::PageImage;

/// One PDF point is 1/72 inch.
const POINTS_PER_INCH: f32 = 72.0;

/// Fallback page size (US Letter, points) when no MediaBox is present.
const DEFAULT_MEDIA_BOX: (f32, f32) = (612.0, 792.0);

/// Rasterizes single PDF pages at a fixed target density.
pub struct PageRasterizer {
    dpi: u32,
}

impl PageRasterizer {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            dpi: config.raster_dpi,
        }
    }

    /// Produce a raster image for one page (1-indexed).
    ///
    /// The decoded image is scaled to the target density implied by the
    /// page MediaBox, but never upscaled — a low-resolution embedded scan
    /// gains nothing from interpolation.
    #[instrument(skip(self, source), fields(page_number, dpi = self.dpi))]
    pub fn rasterize(
        &self,
        source: &PdfSource,
        page_number: u32,
    ) -> Result<PageImage, PageFailure> {
        let doc = source.document();
        let pages = doc.get_pages();
        let page_id = *pages.get(&page_number).ok_or_else(|| PageFailure::Rasterization {
            detail: format!("page {} not in page tree", page_number),
        })?;

        let candidates = page_image_candidates(doc, page_id);
        debug!(count = candidates.len(), "image candidates decoded");

        let best = candidates
            .into_iter()
            .max_by_key(|img| u64::from(img.width()) * u64::from(img.height()))
            .ok_or_else(|| PageFailure::Rasterization {
                detail: format!("no decodable image stream on page {}", page_number),
            })?;

        let (media_w, media_h) = media_box(doc, page_id).unwrap_or(DEFAULT_MEDIA_BOX);
        let target_w = (media_w / POINTS_PER_INCH * self.dpi as f32).round().max(1.0);
        let target_h = (media_h / POINTS_PER_INCH * self.dpi as f32).round().max(1.0);

        let scale = (target_w / best.width() as f32)
            .min(target_h / best.height() as f32)
            .min(1.0);

        let image = if scale < 1.0 {
            let w = ((best.width() as f32 * scale).round() as u32).max(1);
            let h = ((best.height() as f32 * scale).round() as u32).max(1);
            debug!(from_w = best.width(), from_h = best.height(), w, h, "downscaling to density");
            best.resize_exact(w, h, FilterType::Lanczos3)
        } else {
            best
        };

        Ok(PageImage::from_dynamic(image))
    }
}

/// Decode every image XObject reachable from the page's resources.
fn page_image_candidates(doc: &Document, page_id: ObjectId) -> Vec<DynamicImage> {
    let mut found = Vec::new();

    let Some(resources) = page_resources(doc, page_id) else {
        return found;
    };
    let Ok(xobjects) = resources.get(b"XObject") else {
        return found;
    };
    let Ok((_, Object::Dictionary(xobj_dict))) = doc.dereference(xobjects) else {
        return found;
    };

    for (_name, entry) in xobj_dict.iter() {
        if let Ok((_, obj)) = doc.dereference(entry)
            && let Some(img) = decode_image_object(obj)
        {
            found.push(img);
        }
    }
    found
}

/// Resolve the page's resource dictionary, walking /Parent links for
/// inherited resources.
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<Dictionary> {
    let mut node_id = page_id;
    loop {
        let Ok(Object::Dictionary(dict)) = doc.get_object(node_id) else {
            return None;
        };
        if let Ok(resources) = dict.get(b"Resources")
            && let Ok((_, Object::Dictionary(res))) = doc.dereference(resources)
        {
            return Some(res.clone());
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => node_id = *parent,
            _ => return None,
        }
    }
}

/// Decode a single image XObject stream, if its encoding is supported.
fn decode_image_object(obj: &Object) -> Option<DynamicImage> {
    let Object::Stream(stream) = obj else {
        return None;
    };
    let dict = &stream.dict;
    if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
        return None;
    }

    let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
    let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;
    trace!(width, height, "image XObject found");

    match primary_filter(dict) {
        Some(b"DCTDecode") => {
            // JPEG data: the stream content is the compressed file itself.
            return image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg)
                .ok();
        }
        Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
            trace!("unsupported image compression");
            return None;
        }
        // Flate and friends are handled by decompressed_content below.
        _ => {}
    }

    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);
    if bits != 8 {
        trace!(bits, "unsupported bits per component");
        return None;
    }

    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|o| match o {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
            _ => None,
        })
        .unwrap_or(b"DeviceRGB");

    match color_space {
        b"DeviceGray" | b"CalGray" | b"G" => {
            let expected = (width * height) as usize;
            if data.len() < expected {
                return None;
            }
            GrayImage::from_raw(width, height, data[..expected].to_vec())
                .map(DynamicImage::ImageLuma8)
        }
        b"DeviceRGB" | b"CalRGB" | b"RGB" => {
            let expected = (width * height * 3) as usize;
            if data.len() < expected {
                return None;
            }
            RgbImage::from_raw(width, height, data[..expected].to_vec())
                .map(DynamicImage::ImageRgb8)
        }
        other => {
            trace!(color_space = %String::from_utf8_lossy(other), "unsupported colour space");
            None
        }
    }
}

/// The first entry of the stream's /Filter, if any.
fn primary_filter(dict: &Dictionary) -> Option<&[u8]> {
    match dict.get(b"Filter").ok()? {
        Object::Name(name) => Some(name.as_slice()),
        Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
        _ => None,
    }
}

/// The page MediaBox (width, height) in points, walking /Parent links for
/// inherited boxes.
fn media_box(doc: &Document, page_id: ObjectId) -> Option<(f32, f32)> {
    let mut node_id = page_id;
    loop {
        let Ok(Object::Dictionary(dict)) = doc.get_object(node_id) else {
            return None;
        };
        if let Ok(mbox) = dict.get(b"MediaBox")
            && let Ok((_, Object::Array(values))) = doc.dereference(mbox)
            && values.len() == 4
        {
            let nums: Vec<f32> = values.iter().filter_map(number).collect();
            if nums.len() == 4 {
                return Some(((nums[2] - nums[0]).abs(), (nums[3] - nums[1]).abs()));
            }
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => node_id = *parent,
            _ => return None,
        }
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}
