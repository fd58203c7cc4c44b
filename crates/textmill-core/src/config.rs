// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extraction pipeline configuration.

use serde::{Deserialize, Serialize};

/// Tunables for one extraction pipeline instance.
///
/// Threaded into the pipeline's constructor and read-only afterwards —
/// nothing here is ambient process state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Maximum number of leading pages the classifier samples.
    pub sample_pages: usize,
    /// Minimum aggregate non-whitespace characters across the sampled pages
    /// for a PDF to count as digitally text-bearing.
    pub digital_text_threshold: usize,
    /// Render density for scanned-page rasterization, in dots per inch.
    /// 300 DPI balances recognition accuracy against processing time.
    pub raster_dpi: u32,
    /// Recognition results with fewer non-whitespace characters than this
    /// trigger one retry against the unenhanced page image.
    pub min_recognition_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            sample_pages: 5,
            digital_text_threshold: 50,
            raster_dpi: 300,
            min_recognition_chars: 3,
        }
    }
}

/// How much detail the OCR adapter reports per page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputDetail {
    /// Plain text only.
    TextOnly,
    /// Text plus token records (text, region, confidence).
    Tokens,
}

/// Recognition options consumed by the OCR adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrOptions {
    /// Target languages for recognition, as ISO 639 codes. Hints the engine
    /// at the character sets to expect.
    pub languages: Vec<String>,
    pub detail: OutputDetail,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            languages: vec!["eng".to_string()],
            detail: OutputDetail::TextOnly,
        }
    }
}
