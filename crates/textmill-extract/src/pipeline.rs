// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extraction pipeline — routes each document through the digital or OCR
// path and assembles the unified result.
//
// Per document the flow is:
//   Received → Classified → DigitalExtraction          (digital PDFs)
//   Received → Classified → Rasterizing → Enhancing →
//              Recognizing                             (scanned PDFs, per page)
//   Received → Enhancing → Recognizing                 (plain images)
//
// Pages are processed strictly in order, each as an independent unit: a
// page that fails keeps its slot with empty text and a failure note. Only
// an unreadable document or a missing recognition engine fails the run.

use textmill_core::config::ExtractionConfig;
use textmill_core::error::{ExtractError, PageFailure, Result};
use textmill_core::types::{
    DocumentClass, DocumentMetadata, ExtractedPage, ExtractionResult, MediaKind, SourceDocument,
};
use tracing::{debug, info, instrument, warn};

use crate::enhance::RasterEnhancer;
use crate::image::PageImage;
use crate::ocr::{OcrAdapter, RecognizedPage};
use crate::pdf::{DocumentClassifier, PageRasterizer, PdfSource};

/// States of one extraction run, carried in tracing events and failure
/// context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    Classified,
    DigitalExtraction,
    Rasterizing,
    Enhancing,
    Recognizing,
    Assembled,
    Done,
    Failed,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Classified => "classified",
            Self::DigitalExtraction => "digital-extraction",
            Self::Rasterizing => "rasterizing",
            Self::Enhancing => "enhancing",
            Self::Recognizing => "recognizing",
            Self::Assembled => "assembled",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Orchestrates classification, rasterization, enhancement, and
/// recognition for one document at a time.
///
/// Processing is sequential and page-ordered: each page fully completes
/// before the next begins, and the engine is never invoked re-entrantly.
pub struct ExtractionPipeline {
    config: ExtractionConfig,
    classifier: DocumentClassifier,
    rasterizer: PageRasterizer,
    enhancer: RasterEnhancer,
    ocr: OcrAdapter,
}

impl ExtractionPipeline {
    pub fn new(config: ExtractionConfig, ocr: OcrAdapter) -> Self {
        let classifier = DocumentClassifier::new(&config);
        let rasterizer = PageRasterizer::new(&config);
        Self {
            config,
            classifier,
            rasterizer,
            enhancer: RasterEnhancer::new(),
            ocr,
        }
    }

    /// Run the full extraction for one document.
    #[instrument(skip(self, document), fields(
        document_id = %document.id,
        media = ?document.media,
        name = %document.name,
    ))]
    pub fn extract(&self, document: &SourceDocument) -> Result<ExtractionResult> {
        info!(
            stage = %PipelineStage::Received,
            digest = document.digest(),
            "extraction started"
        );

        let outcome = match document.media {
            MediaKind::Pdf => self.extract_pdf(document),
            _ => self.extract_raster(document),
        };

        match &outcome {
            Ok(result) => info!(
                stage = %PipelineStage::Done,
                pages = result.pages.len(),
                degraded = result.degraded_pages().count(),
                "extraction complete"
            ),
            Err(err) => warn!(stage = %PipelineStage::Failed, %err, "extraction failed"),
        }
        outcome
    }

    fn extract_pdf(&self, document: &SourceDocument) -> Result<ExtractionResult> {
        let source = PdfSource::from_bytes(document.bytes())?;
        let verdict = self.classifier.classify(&source);
        info!(stage = %PipelineStage::Classified, class = ?verdict.class, "verdict reached");

        let metadata = source.metadata();
        let page_count = source.page_count();
        let mut pages = Vec::with_capacity(page_count as usize);

        match verdict.class {
            DocumentClass::Digital => {
                for page_number in 1..=page_count {
                    pages.push(self.digital_page(&source, page_number));
                }
            }
            DocumentClass::Scanned => {
                for page_number in 1..=page_count {
                    pages.push(self.scanned_page(&source, page_number)?);
                }
            }
        }

        Ok(ExtractionResult {
            document_id: document.id,
            source_digest: document.digest().to_string(),
            verdict: Some(verdict),
            metadata,
            pages,
        })
    }

    /// Direct text-layer read for one page of a digital PDF.
    fn digital_page(&self, source: &PdfSource, page_number: u32) -> ExtractedPage {
        let index = page_number - 1;
        debug!(stage = %PipelineStage::DigitalExtraction, page_number, "reading text layer");
        match source.page_text(page_number) {
            Ok(text) => ExtractedPage {
                index,
                text: text.trim_end().to_string(),
                tokens: None,
                failure: None,
            },
            Err(failure) => {
                warn!(page_number, %failure, "text layer unreadable, recording empty page");
                ExtractedPage::failed(index, failure)
            }
        }
    }

    /// Rasterize → enhance → recognize for one page of a scanned PDF.
    ///
    /// Rasterization failures are absorbed here; only a fatal engine error
    /// propagates.
    fn scanned_page(&self, source: &PdfSource, page_number: u32) -> Result<ExtractedPage> {
        let index = page_number - 1;
        debug!(stage = %PipelineStage::Rasterizing, page_number, "rasterizing page");

        let original = match self.rasterizer.rasterize(source, page_number) {
            Ok(image) => image,
            Err(failure) => {
                warn!(page_number, %failure, "rasterization failed, recording empty page");
                return Ok(ExtractedPage::failed(index, failure));
            }
        };

        self.recognize_page(index, &original)
    }

    /// Enhance then recognize, retrying once on the unenhanced image when
    /// recognition of the enhanced one comes back empty or fails.
    ///
    /// The fallback is per page: enhancement occasionally destroys faint
    /// strokes that the engine can still read in the original.
    fn recognize_page(&self, index: u32, original: &PageImage) -> Result<ExtractedPage> {
        debug!(stage = %PipelineStage::Enhancing, page = index, "enhancing page image");
        let enhanced = self.enhancer.enhance(original);
        if enhanced.report.is_degraded() {
            debug!(page = index, "enhancement degraded, continuing with last good image");
        }

        debug!(stage = %PipelineStage::Recognizing, page = index, "recognizing page");
        match self.ocr.recognize(&enhanced.image) {
            Ok(recognized)
                if recognized.meaningful_chars() >= self.config.min_recognition_chars =>
            {
                Ok(page_from(index, recognized))
            }
            Ok(sparse) => {
                debug!(
                    page = index,
                    chars = sparse.meaningful_chars(),
                    "near-empty recognition, retrying on original image"
                );
                match self.ocr.recognize(original) {
                    Ok(retry) if retry.meaningful_chars() > sparse.meaningful_chars() => {
                        Ok(page_from(index, retry))
                    }
                    Ok(_) => Ok(page_from(index, sparse)),
                    Err(err) if is_fatal(&err) => Err(err),
                    Err(err) => {
                        debug!(page = index, %err, "retry failed, keeping first result");
                        Ok(page_from(index, sparse))
                    }
                }
            }
            Err(err) if is_fatal(&err) => Err(err),
            Err(err) => {
                warn!(page = index, %err, "recognition failed on enhanced image, retrying on original");
                match self.ocr.recognize(original) {
                    Ok(recognized) => Ok(page_from(index, recognized)),
                    Err(retry_err) if is_fatal(&retry_err) => Err(retry_err),
                    Err(retry_err) => Ok(ExtractedPage::failed(
                        index,
                        PageFailure::Recognition {
                            detail: retry_err.to_string(),
                        },
                    )),
                }
            }
        }
    }

    /// Plain image path: decode, enhance, recognize. No classification, no
    /// rasterization.
    fn extract_raster(&self, document: &SourceDocument) -> Result<ExtractionResult> {
        let original = PageImage::from_bytes(document.bytes()).map_err(|err| {
            ExtractError::DocumentUnreadable(format!(
                "failed to decode {} image: {}",
                document.media.mime_type(),
                err
            ))
        })?;

        let page = self.recognize_page(0, &original)?;

        Ok(ExtractionResult {
            document_id: document.id,
            source_digest: document.digest().to_string(),
            verdict: None,
            metadata: DocumentMetadata {
                page_count: 1,
                ..DocumentMetadata::default()
            },
            pages: vec![page],
        })
    }
}

fn page_from(index: u32, recognized: RecognizedPage) -> ExtractedPage {
    ExtractedPage {
        index,
        text: recognized.text,
        tokens: recognized.tokens,
        failure: None,
    }
}

/// Document-level errors that must abort the run instead of degrading it.
fn is_fatal(err: &ExtractError) -> bool {
    matches!(
        err,
        ExtractError::EngineUnavailable(_) | ExtractError::DocumentUnreadable(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::RecognitionBackend;
    use crate::pdf::fixtures::{digital_pdf, scanned_pdf, scanned_single};
    use image::{DynamicImage, GrayImage, Luma};
    use std::cell::Cell;
    use std::collections::BTreeSet;
    use std::io::Cursor;
    use std::rc::Rc;
    use textmill_core::config::OcrOptions;

    /// Backend driven by a closure, with a call counter.
    struct ClosureBackend<F> {
        calls: Rc<Cell<usize>>,
        f: F,
    }

    impl<F> RecognitionBackend for ClosureBackend<F>
    where
        F: Fn(&PageImage) -> std::result::Result<RecognizedPage, ExtractError>,
    {
        fn recognize(
            &self,
            page: &PageImage,
            _options: &OcrOptions,
        ) -> std::result::Result<RecognizedPage, ExtractError> {
            self.calls.set(self.calls.get() + 1);
            (self.f)(page)
        }
    }

    fn pipeline_with<F>(f: F) -> (ExtractionPipeline, Rc<Cell<usize>>)
    where
        F: Fn(&PageImage) -> std::result::Result<RecognizedPage, ExtractError> + 'static,
    {
        let calls = Rc::new(Cell::new(0));
        let backend = ClosureBackend {
            calls: Rc::clone(&calls),
            f,
        };
        let adapter = OcrAdapter::new(Box::new(backend), OcrOptions::default());
        (
            ExtractionPipeline::new(ExtractionConfig::default(), adapter),
            calls,
        )
    }

    fn text_page(text: &str) -> RecognizedPage {
        RecognizedPage {
            text: text.to_string(),
            tokens: None,
        }
    }

    /// Number of distinct gray levels — lets stubs tell a thresholded
    /// (bilevel) image from the original.
    fn distinct_levels(page: &PageImage) -> usize {
        let mut seen = BTreeSet::new();
        for pixel in page.as_dynamic().to_luma8().pixels() {
            seen.insert(pixel.0[0]);
        }
        seen.len()
    }

    fn gradient(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| Luma([((x * 2 + y) % 200) as u8]))
    }

    fn source(name: &str, media: MediaKind, bytes: Vec<u8>) -> SourceDocument {
        SourceDocument::new(name, media, bytes)
    }

    #[test]
    fn digital_pdf_never_touches_the_engine() {
        let bytes = digital_pdf(&[
            "The quick brown fox jumps over the lazy dog near the riverbank every morning.",
            "A second page with its own digital text layer for good measure.",
        ]);
        let (pipeline, calls) = pipeline_with(|_| Ok(text_page("should never happen")));

        let result = pipeline
            .extract(&source("report.pdf", MediaKind::Pdf, bytes))
            .unwrap();

        assert_eq!(calls.get(), 0);
        assert_eq!(result.verdict.unwrap().class, DocumentClass::Digital);
        assert_eq!(result.pages.len(), 2);
        assert!(result.pages[0].text.contains("quick brown fox"));
        assert!(result.pages[1].text.contains("second page"));
        assert!(result.pages.iter().all(|p| p.failure.is_none()));
        assert_eq!(result.metadata.page_count, 2);
    }

    #[test]
    fn scanned_pdf_recognizes_every_page_in_order() {
        let img = gradient(48, 48);
        let bytes = scanned_pdf(&[Some(&img), Some(&img)]);
        let (pipeline, calls) = pipeline_with(|_| Ok(text_page("recognized page text")));

        let result = pipeline
            .extract(&source("scan.pdf", MediaKind::Pdf, bytes))
            .unwrap();

        assert_eq!(result.verdict.unwrap().class, DocumentClass::Scanned);
        assert_eq!(result.pages.len(), 2);
        assert_eq!(calls.get(), 2);
        for (i, page) in result.pages.iter().enumerate() {
            assert_eq!(page.index, i as u32);
            assert_eq!(page.text, "recognized page text");
            assert!(page.failure.is_none());
        }
    }

    #[test]
    fn failed_page_keeps_its_slot_with_a_note() {
        let img = gradient(48, 48);
        let bytes = scanned_pdf(&[Some(&img), None, Some(&img)]);
        let (pipeline, _) = pipeline_with(|_| Ok(text_page("page text")));

        let result = pipeline
            .extract(&source("scan.pdf", MediaKind::Pdf, bytes))
            .unwrap();

        assert_eq!(result.pages.len(), 3);
        assert_eq!(result.pages[0].text, "page text");
        assert!(result.pages[0].failure.is_none());

        assert!(result.pages[1].text.is_empty());
        assert!(matches!(
            result.pages[1].failure,
            Some(PageFailure::Rasterization { .. })
        ));

        assert_eq!(result.pages[2].text, "page text");
        assert_eq!(result.degraded_pages().count(), 1);
    }

    #[test]
    fn blank_enhancement_falls_back_to_original_image() {
        // The stub reads nothing from bilevel (thresholded) images but
        // recognizes the tonal original.
        let img = gradient(64, 64);
        let bytes = scanned_single(&img, 612, 792);
        let (pipeline, calls) = pipeline_with(|page| {
            if distinct_levels(page) > 2 {
                Ok(text_page("ORIGINAL IMAGE TEXT"))
            } else {
                Ok(text_page(""))
            }
        });

        let result = pipeline
            .extract(&source("faint.pdf", MediaKind::Pdf, bytes))
            .unwrap();

        assert_eq!(calls.get(), 2, "one attempt on enhanced, one on original");
        assert_eq!(result.pages[0].text, "ORIGINAL IMAGE TEXT");
        assert!(result.pages[0].failure.is_none());
    }

    #[test]
    fn empty_after_retry_is_accepted_without_a_note() {
        let img = gradient(48, 48);
        let bytes = scanned_single(&img, 612, 792);
        let (pipeline, calls) = pipeline_with(|_| Ok(text_page("")));

        let result = pipeline
            .extract(&source("blank.pdf", MediaKind::Pdf, bytes))
            .unwrap();

        assert_eq!(calls.get(), 2);
        assert!(result.pages[0].text.is_empty());
        // A legitimately blank page is not a failure.
        assert!(result.pages[0].failure.is_none());
    }

    #[test]
    fn recognition_errors_become_page_notes() {
        let img = gradient(48, 48);
        let bytes = scanned_single(&img, 612, 792);
        let (pipeline, _) = pipeline_with(|_| {
            Err(ExtractError::ImageError("engine choked on input".into()))
        });

        let result = pipeline
            .extract(&source("bad.pdf", MediaKind::Pdf, bytes))
            .unwrap();

        assert!(matches!(
            result.pages[0].failure,
            Some(PageFailure::Recognition { .. })
        ));
    }

    #[test]
    fn missing_engine_is_fatal() {
        let img = gradient(48, 48);
        let bytes = scanned_single(&img, 612, 792);
        let (pipeline, _) =
            pipeline_with(|_| Err(ExtractError::EngineUnavailable("models missing".into())));

        let err = pipeline
            .extract(&source("scan.pdf", MediaKind::Pdf, bytes))
            .unwrap_err();
        assert!(matches!(err, ExtractError::EngineUnavailable(_)));
    }

    #[test]
    fn plain_image_skips_classification() {
        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(gradient(40, 40))
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let (pipeline, calls) = pipeline_with(|_| Ok(text_page("image text")));

        let result = pipeline
            .extract(&source("photo.png", MediaKind::Png, bytes))
            .unwrap();

        assert!(result.verdict.is_none());
        assert_eq!(result.pages.len(), 1);
        assert_eq!(result.pages[0].text, "image text");
        assert_eq!(result.metadata.page_count, 1);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn undecodable_image_is_unreadable() {
        let (pipeline, _) = pipeline_with(|_| Ok(text_page("unused")));
        let err = pipeline
            .extract(&source("junk.png", MediaKind::Png, b"not an image".to_vec()))
            .unwrap_err();
        assert!(matches!(err, ExtractError::DocumentUnreadable(_)));
    }

    #[test]
    fn corrupt_pdf_is_unreadable() {
        let (pipeline, _) = pipeline_with(|_| Ok(text_page("unused")));
        let err = pipeline
            .extract(&source("junk.pdf", MediaKind::Pdf, b"%PDF-garbage".to_vec()))
            .unwrap_err();
        assert!(matches!(err, ExtractError::DocumentUnreadable(_)));
    }

    #[test]
    fn zero_page_pdf_yields_empty_digital_result() {
        let bytes = digital_pdf(&[]);
        let (pipeline, calls) = pipeline_with(|_| Ok(text_page("unused")));

        let result = pipeline
            .extract(&source("empty.pdf", MediaKind::Pdf, bytes))
            .unwrap();

        assert_eq!(calls.get(), 0);
        assert_eq!(result.verdict.unwrap().class, DocumentClass::Digital);
        assert!(result.pages.is_empty());
        assert_eq!(result.metadata.page_count, 0);
    }

    #[test]
    fn extraction_is_idempotent_over_the_same_bytes() {
        let img = gradient(48, 48);
        let bytes = scanned_pdf(&[Some(&img), Some(&img)]);
        let (pipeline, _) = pipeline_with(|page| {
            Ok(text_page(&format!(
                "levels:{}",
                distinct_levels(page).min(3)
            )))
        });

        let doc_a = source("same.pdf", MediaKind::Pdf, bytes.clone());
        let doc_b = source("same.pdf", MediaKind::Pdf, bytes);
        let first = pipeline.extract(&doc_a).unwrap();
        let second = pipeline.extract(&doc_b).unwrap();

        assert_eq!(first.source_digest, second.source_digest);
        assert_eq!(first.pages.len(), second.pages.len());
        for (a, b) in first.pages.iter().zip(second.pages.iter()) {
            assert_eq!(a.text, b.text);
        }
    }
}
