// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR adapter — wraps a text-recognition backend behind a narrow trait so
// the pipeline (and its tests) are independent of the engine.

pub mod engine;

pub use engine::{OcrModelConfig, OcrsBackend};

use textmill_core::config::OcrOptions;
use textmill_core::error::ExtractError;
use textmill_core::types::Token;
use tracing::{debug, instrument};

use crate::image::PageImage;

/// The recognition output for one page image.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedPage {
    pub text: String,
    /// Token records in reading order, when the backend produced them.
    pub tokens: Option<Vec<Token>>,
}

impl RecognizedPage {
    /// Count of non-whitespace characters — the "did we actually read
    /// anything" signal used by the pipeline's fallback policy.
    pub fn meaningful_chars(&self) -> usize {
        self.text.chars().filter(|c| !c.is_whitespace()).count()
    }
}

/// A text-recognition engine.
///
/// Implementations map an image to recognized text. Construction-time
/// problems (missing models) surface as `ExtractError::EngineUnavailable`
/// from the implementation's constructor; errors from `recognize` other
/// than `EngineUnavailable` are treated as per-page recognition failures
/// by the caller.
pub trait RecognitionBackend {
    fn recognize(
        &self,
        page: &PageImage,
        options: &OcrOptions,
    ) -> Result<RecognizedPage, ExtractError>;
}

/// Drives a recognition backend with fixed, constructor-threaded options.
pub struct OcrAdapter {
    backend: Box<dyn RecognitionBackend>,
    options: OcrOptions,
}

impl OcrAdapter {
    pub fn new(backend: Box<dyn RecognitionBackend>, options: OcrOptions) -> Self {
        Self { backend, options }
    }

    /// Construct an adapter backed by the bundled `ocrs` engine.
    ///
    /// Fails with `EngineUnavailable` when the model files are missing.
    pub fn with_engine(models: OcrModelConfig, options: OcrOptions) -> Result<Self, ExtractError> {
        let backend = OcrsBackend::new(models)?;
        Ok(Self::new(Box::new(backend), options))
    }

    pub fn options(&self) -> &OcrOptions {
        &self.options
    }

    /// Recognize one page image.
    #[instrument(skip_all, fields(width = page.width(), height = page.height()))]
    pub fn recognize(&self, page: &PageImage) -> Result<RecognizedPage, ExtractError> {
        let recognized = self.backend.recognize(page, &self.options)?;
        debug!(
            chars = recognized.meaningful_chars(),
            tokens = recognized.tokens.as_ref().map_or(0, Vec::len),
            "page recognized"
        );
        Ok(recognized)
    }
}
