// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Textmill.
//
// Two layers: `ExtractError` is fatal and document-level — it aborts the
// whole extraction and escapes to the caller. `PageFailure` is page-level —
// it is absorbed by the pipeline and recorded inline on the affected
// `ExtractedPage`, never propagated.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for all Textmill operations.
///
/// Every variant here is terminal for the document being processed.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The document container cannot be parsed at all (corrupt bytes,
    /// password-protected PDF, undecodable image).
    #[error("document unreadable: {0}")]
    DocumentUnreadable(String),

    /// The recognition engine cannot be invoked — missing or corrupt model
    /// files. No OCR fallback exists, so this is always surfaced.
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("unsupported media kind: {0}")]
    UnsupportedMedia(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("markup assembly failed: {0}")]
    Markup(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A page-level failure, recorded on the page record it affected.
///
/// Pages that fail keep their slot in the result (with empty text) so the
/// page sequence always matches the source document.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum PageFailure {
    /// The page could not be converted to a raster image.
    #[error("rasterization failed: {detail}")]
    Rasterization { detail: String },

    /// The recognition engine failed on this page's image.
    #[error("recognition failed: {detail}")]
    Recognition { detail: String },

    /// The digital text layer of this page could not be read.
    #[error("text layer unreadable: {detail}")]
    TextLayer { detail: String },
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ExtractError>;
