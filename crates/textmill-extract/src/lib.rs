// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// textmill-extract — Document text extraction for Textmill.
//
// Routes PDFs and raster images through the appropriate extraction path:
// digital PDFs get a direct text-layer read, scanned PDFs are rasterized
// page by page, enhanced, and recognized, and plain images go straight to
// enhancement and recognition. Results assemble into plain text and a
// structured XML representation.

pub mod assemble;
pub mod enhance;
pub mod image;
pub mod ocr;
pub mod pdf;
pub mod pipeline;

// Re-export the primary structs so callers can use `textmill_extract::ExtractionPipeline` etc.
pub use assemble::OutputAssembler;
pub use enhance::{EnhancedPage, EnhancementReport, EnhancementStage, RasterEnhancer, StageStatus};
pub use image::PageImage;
pub use ocr::{OcrAdapter, OcrModelConfig, OcrsBackend, RecognitionBackend, RecognizedPage};
pub use pdf::{DocumentClassifier, PageRasterizer, PdfSource};
pub use pipeline::{ExtractionPipeline, PipelineStage};
