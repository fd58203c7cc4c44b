// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document classification — decides whether a PDF carries a usable digital
// text layer or must be treated as a scanned document.

use textmill_core::config::ExtractionConfig;
use textmill_core::types::{ClassificationVerdict, DocumentClass};
use tracing::{debug, info, instrument};

use super::source::PdfSource;

/// Classifies a PDF as digitally text-bearing or scanned.
///
/// The signal is the aggregate count of extractable non-whitespace
/// characters across a bounded sample of leading pages. Scanned documents
/// typically extract nothing at all; digital documents cross the threshold
/// within a page or two.
pub struct DocumentClassifier {
    sample_pages: usize,
    digital_text_threshold: usize,
}

impl DocumentClassifier {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            sample_pages: config.sample_pages,
            digital_text_threshold: config.digital_text_threshold,
        }
    }

    /// Inspect the document and return a verdict. Read-only.
    ///
    /// Zero-page documents classify as digital: there is nothing to
    /// rasterize and the result is legitimately empty. Sampling stops early
    /// once the threshold is crossed.
    #[instrument(skip_all, fields(pages = source.page_count()))]
    pub fn classify(&self, source: &PdfSource) -> ClassificationVerdict {
        let total = source.page_count() as usize;
        if total == 0 {
            info!("zero-page document, classifying as digital");
            return ClassificationVerdict {
                class: DocumentClass::Digital,
                sampled_pages: 0,
                text_chars: 0,
            };
        }

        let sample = self.sample_pages.min(total);
        let mut text_chars = 0usize;
        let mut sampled = 0usize;

        for page_number in 1..=sample as u32 {
            sampled += 1;
            // A page whose text layer cannot be read contributes nothing.
            let text = source.page_text(page_number).unwrap_or_default();
            text_chars += text.chars().filter(|c| !c.is_whitespace()).count();
            debug!(page_number, text_chars, "sampled page text layer");
            if text_chars >= self.digital_text_threshold {
                break;
            }
        }

        let class = if text_chars >= self.digital_text_threshold {
            DocumentClass::Digital
        } else {
            DocumentClass::Scanned
        };
        info!(?class, sampled, text_chars, "document classified");

        ClassificationVerdict {
            class,
            sampled_pages: sampled,
            text_chars,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::{digital_pdf, scanned_pdf};
    use image::{GrayImage, Luma};

    fn classifier(sample_pages: usize, threshold: usize) -> DocumentClassifier {
        DocumentClassifier::new(&ExtractionConfig {
            sample_pages,
            digital_text_threshold: threshold,
            ..ExtractionConfig::default()
        })
    }

    #[test]
    fn text_bearing_pdf_is_digital() {
        let bytes = digital_pdf(&["This page carries a perfectly ordinary digital text layer."]);
        let source = PdfSource::from_bytes(&bytes).unwrap();

        let verdict = classifier(5, 20).classify(&source);
        assert_eq!(verdict.class, DocumentClass::Digital);
        assert!(verdict.text_chars >= 20);
    }

    #[test]
    fn image_only_pdf_is_scanned() {
        let img = GrayImage::from_pixel(40, 40, Luma([90u8]));
        let bytes = scanned_pdf(&[Some(&img), Some(&img)]);
        let source = PdfSource::from_bytes(&bytes).unwrap();

        let verdict = classifier(5, 20).classify(&source);
        assert_eq!(verdict.class, DocumentClass::Scanned);
        assert_eq!(verdict.text_chars, 0);
        assert_eq!(verdict.sampled_pages, 2);
    }

    #[test]
    fn zero_page_pdf_is_digital() {
        let bytes = digital_pdf(&[]);
        let source = PdfSource::from_bytes(&bytes).unwrap();

        let verdict = classifier(5, 20).classify(&source);
        assert_eq!(verdict.class, DocumentClass::Digital);
        assert_eq!(verdict.sampled_pages, 0);
    }

    #[test]
    fn threshold_is_a_boundary_not_a_constant() {
        // "tenchars!!" extracts exactly 10 non-whitespace characters.
        let bytes = digital_pdf(&["tenchars!!"]);
        let source = PdfSource::from_bytes(&bytes).unwrap();

        let at = classifier(5, 10).classify(&source);
        assert_eq!(at.class, DocumentClass::Digital);

        let above = classifier(5, 11).classify(&source);
        assert_eq!(above.class, DocumentClass::Scanned);
    }

    #[test]
    fn sampling_is_bounded_to_leading_pages() {
        // Text only on page 3, but the sample stops at page 2.
        let img = GrayImage::from_pixel(10, 10, Luma([0u8]));
        let mut doc_pages: Vec<Option<&GrayImage>> = vec![None, None];
        doc_pages.push(Some(&img));
        let bytes = scanned_pdf(&doc_pages);
        let source = PdfSource::from_bytes(&bytes).unwrap();

        let verdict = classifier(2, 1).classify(&source);
        assert_eq!(verdict.sampled_pages, 2);
        assert_eq!(verdict.class, DocumentClass::Scanned);
    }
}
