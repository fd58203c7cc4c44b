// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Textmill extraction engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::PageFailure;

/// Unique identifier for one uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declared media kind of an uploaded document.
///
/// Routing is driven by this declaration alone — file names are display
/// metadata and never influence processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Pdf,
    Png,
    Jpeg,
    Tiff,
}

impl MediaKind {
    /// MIME type string for this media kind.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Tiff => "image/tiff",
        }
    }

    /// Resolve a declared MIME type to a media kind.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.to_ascii_lowercase().as_str() {
            "application/pdf" => Some(Self::Pdf),
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    /// Whether this kind is a raster image (processed without a PDF parse).
    pub fn is_raster(&self) -> bool {
        !matches!(self, Self::Pdf)
    }
}

/// One uploaded artifact: raw bytes, declared media kind, display name.
///
/// Immutable once constructed. Owned by the pipeline invocation processing
/// it and discarded after extraction completes.
#[derive(Clone)]
pub struct SourceDocument {
    pub id: DocumentId,
    /// Display name only — never used for routing decisions.
    pub name: String,
    pub media: MediaKind,
    bytes: Vec<u8>,
    /// SHA-256 hex digest of the document bytes.
    digest: String,
}

impl SourceDocument {
    /// Take ownership of an upload's bytes, computing its content digest.
    pub fn new(name: impl Into<String>, media: MediaKind, bytes: Vec<u8>) -> Self {
        let digest = hex::encode(Sha256::digest(&bytes));
        Self {
            id: DocumentId::new(),
            name: name.into(),
            media,
            bytes,
            digest,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// SHA-256 hex digest of the document bytes.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

impl std::fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDocument")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("media", &self.media)
            .field("bytes_len", &self.bytes.len())
            .field("digest", &self.digest)
            .finish()
    }
}

/// How a PDF document will be extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentClass {
    /// A machine-readable text layer is present — extract it directly.
    Digital,
    /// Pages are effectively raster images — rasterize and recognize.
    Scanned,
}

/// The classifier's decision for a document, with the signal behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationVerdict {
    pub class: DocumentClass,
    /// How many leading pages were sampled.
    pub sampled_pages: usize,
    /// Aggregate non-whitespace characters extracted across the sample.
    pub text_chars: usize,
}

/// Axis-aligned region of a page image, in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A recognized unit of text with its spatial region and, when the engine
/// provides one, a confidence score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub region: Region,
    pub confidence: Option<f32>,
}

/// The text extracted from one page, in source page order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedPage {
    /// Zero-based page index matching the source ordering.
    pub index: u32,
    pub text: String,
    /// Token-level detail, present when requested from the OCR path.
    pub tokens: Option<Vec<Token>>,
    /// Set when this page's extraction failed and an empty-text placeholder
    /// was recorded instead.
    pub failure: Option<PageFailure>,
}

impl ExtractedPage {
    /// An empty placeholder for a page that failed extraction.
    pub fn failed(index: u32, failure: PageFailure) -> Self {
        Self {
            index,
            text: String::new(),
            tokens: None,
            failure: Some(failure),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.failure.is_some()
    }
}

/// Document-level descriptive fields, sourced from PDF embedded metadata.
///
/// Plain images carry only the page count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub page_count: u32,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

/// The unified output of one extraction run.
///
/// Invariant: `pages.len()` equals the source document's page count (1 for
/// plain images). Failed pages hold empty text and a failure note rather
/// than being dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub document_id: DocumentId,
    /// SHA-256 hex digest of the source bytes (idempotence diagnostics).
    pub source_digest: String,
    /// Absent for plain images, which skip classification.
    pub verdict: Option<ClassificationVerdict>,
    pub metadata: DocumentMetadata,
    pub pages: Vec<ExtractedPage>,
}

impl ExtractionResult {
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Pages that recorded a failure note.
    pub fn degraded_pages(&self) -> impl Iterator<Item = &ExtractedPage> {
        self.pages.iter().filter(|p| p.is_degraded())
    }
}
