// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Production recognition backend using the `ocrs` crate, a pure-Rust OCR
// engine backed by neural network models executed via `rten`.
//
// # Model Setup
//
// The engine requires two model files:
//
// - **Detection model** (`text-detection.rten`) — locates text regions.
// - **Recognition model** (`text-recognition.rten`) — decodes characters.
//
// Models can be obtained by running the `ocrs-cli` tool once:
//   ```sh
//   cargo install ocrs-cli
//   ocrs some-image.png  # downloads models to ~/.cache/ocrs/
//   ```
//
// The default cache directory is `$XDG_CACHE_HOME/ocrs` (typically
// `~/.cache/ocrs`). Missing models are an `EngineUnavailable` error at
// construction — never discovered mid-document.

use std::path::{Path, PathBuf};

use ocrs::{ImageSource, OcrEngine, OcrEngineParams, OcrInput};
use rten::Model;
use textmill_core::config::{OcrOptions, OutputDetail};
use textmill_core::error::ExtractError;
use textmill_core::types::{Region, Token};
use tracing::{debug, info, instrument};

use super::{RecognitionBackend, RecognizedPage};
use crate::image::PageImage;

/// Well-known filenames for the detection and recognition models.
const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// Default directory for cached OCR model files.
///
/// Follows the XDG Base Directory specification: `$XDG_CACHE_HOME/ocrs`,
/// falling back to `~/.cache/ocrs` when `XDG_CACHE_HOME` is unset.
fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Locations of the recognition engine's model files.
#[derive(Debug, Clone)]
pub struct OcrModelConfig {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl Default for OcrModelConfig {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrModelConfig {
    /// Expect `text-detection.rten` and `text-recognition.rten` inside `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    pub fn from_paths(
        detection_model: impl Into<PathBuf>,
        recognition_model: impl Into<PathBuf>,
    ) -> Self {
        Self {
            detection_model_path: detection_model.into(),
            recognition_model_path: recognition_model.into(),
        }
    }

    /// Verify that both model files exist.
    pub fn validate(&self) -> Result<(), ExtractError> {
        if !self.detection_model_path.exists() {
            return Err(ExtractError::EngineUnavailable(format!(
                "detection model not found at {}; run `ocrs-cli` once to download models",
                self.detection_model_path.display()
            )));
        }
        if !self.recognition_model_path.exists() {
            return Err(ExtractError::EngineUnavailable(format!(
                "recognition model not found at {}; run `ocrs-cli` once to download models",
                self.recognition_model_path.display()
            )));
        }
        Ok(())
    }
}

/// Recognition backend driving the `ocrs` engine.
///
/// Model loading is the expensive step — construct once, reuse per page.
/// The `ocrs`/`rten` crates must be compiled in release mode for realistic
/// throughput; debug builds are 10-100x slower.
pub struct OcrsBackend {
    engine: OcrEngine,
}

impl OcrsBackend {
    /// Load models and initialise the engine.
    #[instrument(skip_all, fields(
        detection = %config.detection_model_path.display(),
        recognition = %config.recognition_model_path.display(),
    ))]
    pub fn new(config: OcrModelConfig) -> Result<Self, ExtractError> {
        config.validate()?;

        info!("loading OCR detection model");
        let detection_model = Model::load_file(&config.detection_model_path).map_err(|err| {
            ExtractError::EngineUnavailable(format!(
                "failed to load detection model from {}: {}",
                config.detection_model_path.display(),
                err
            ))
        })?;

        info!("loading OCR recognition model");
        let recognition_model =
            Model::load_file(&config.recognition_model_path).map_err(|err| {
                ExtractError::EngineUnavailable(format!(
                    "failed to load recognition model from {}: {}",
                    config.recognition_model_path.display(),
                    err
                ))
            })?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| {
            ExtractError::EngineUnavailable(format!("failed to initialise OCR engine: {}", err))
        })?;

        info!("OCR engine initialised");
        Ok(Self { engine })
    }

    fn prepare(&self, page: &PageImage) -> Result<OcrInput, ExtractError> {
        // ocrs expects RGB8.
        let rgb = page.as_dynamic().to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            ExtractError::ImageError(format!(
                "failed to create image source ({}x{}): {}",
                width, height, err
            ))
        })?;

        self.engine
            .prepare_input(source)
            .map_err(|err| ExtractError::ImageError(format!("OCR preprocessing failed: {}", err)))
    }

    fn recognize_text_only(&self, input: &OcrInput) -> Result<RecognizedPage, ExtractError> {
        let text = self
            .engine
            .get_text(input)
            .map_err(|err| ExtractError::ImageError(format!("text recognition failed: {}", err)))?;

        debug!(chars = text.len(), "plain-text recognition complete");
        Ok(RecognizedPage { text, tokens: None })
    }

    fn recognize_with_tokens(&self, input: &OcrInput) -> Result<RecognizedPage, ExtractError> {
        let word_rects = self
            .engine
            .detect_words(input)
            .map_err(|err| ExtractError::ImageError(format!("word detection failed: {}", err)))?;
        debug!(words = word_rects.len(), "words detected");

        let line_rects = self.engine.find_text_lines(input, &word_rects);
        let line_texts = self
            .engine
            .recognize_text(input, &line_rects)
            .map_err(|err| ExtractError::ImageError(format!("line recognition failed: {}", err)))?;

        let mut lines = Vec::with_capacity(line_texts.len());
        let mut tokens = Vec::with_capacity(line_texts.len());

        for (rects, recognized) in line_rects.iter().zip(line_texts.iter()) {
            let Some(line) = recognized else { continue };
            let text = line.to_string();
            if text.trim().is_empty() {
                continue;
            }
            if let Some(region) = union_region(rects) {
                tokens.push(Token {
                    text: text.clone(),
                    region,
                    // ocrs does not expose per-line confidences.
                    confidence: None,
                });
            }
            lines.push(text);
        }

        debug!(lines = lines.len(), "token recognition complete");
        Ok(RecognizedPage {
            text: lines.join("\n"),
            tokens: Some(tokens),
        })
    }
}

impl RecognitionBackend for OcrsBackend {
    fn recognize(
        &self,
        page: &PageImage,
        options: &OcrOptions,
    ) -> Result<RecognizedPage, ExtractError> {
        debug!(languages = ?options.languages, "starting recognition");
        let input = self.prepare(page)?;
        match options.detail {
            OutputDetail::TextOnly => self.recognize_text_only(&input),
            OutputDetail::Tokens => self.recognize_with_tokens(&input),
        }
    }
}

/// Axis-aligned union of the word rectangles making up one text line.
fn union_region(rects: &[rten_imageproc::RotatedRect]) -> Option<Region> {
    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;

    for rect in rects {
        for corner in rect.corners() {
            min_x = min_x.min(corner.x);
            min_y = min_y.min(corner.y);
            max_x = max_x.max(corner.x);
            max_y = max_y.max(corner.y);
        }
    }

    if min_x.is_finite() && min_y.is_finite() {
        Some(Region {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        })
    } else {
        None
    }
}
