// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF source — open and inspect an uploaded PDF document using the `lopdf`
// crate: page count, per-page text-layer extraction, and embedded metadata.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use lopdf::{Document, Object};
use textmill_core::error::{ExtractError, PageFailure};
use textmill_core::types::DocumentMetadata;
use tracing::{debug, instrument, warn};

/// A parsed PDF document under inspection.
///
/// Wraps `lopdf::Document` read-only: nothing here mutates the document.
pub struct PdfSource {
    document: Document,
}

impl PdfSource {
    /// Parse a PDF from raw bytes.
    ///
    /// Office scanners frequently produce PDFs "encrypted" with a blank
    /// owner password; those are decrypted transparently. Anything else
    /// that cannot be parsed or decrypted is a document-level failure.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, ExtractError> {
        let mut document = Document::load_mem(data).map_err(|err| {
            ExtractError::DocumentUnreadable(format!("failed to parse PDF: {}", err))
        })?;

        if document.is_encrypted() {
            document.decrypt("").map_err(|_| {
                ExtractError::DocumentUnreadable("PDF is password-protected".to_string())
            })?;
            debug!("decrypted PDF with empty password");
        }

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    /// Extract the digital text layer of one page (1-indexed).
    pub fn page_text(&self, page_number: u32) -> Result<String, PageFailure> {
        self.document
            .extract_text(&[page_number])
            .map_err(|err| PageFailure::TextLayer {
                detail: format!("page {}: {}", page_number, err),
            })
    }

    /// Document-level metadata from the trailer's Info dictionary.
    ///
    /// Fields that are absent or unparseable stay `None` — metadata never
    /// fails extraction.
    pub fn metadata(&self) -> DocumentMetadata {
        let mut metadata = DocumentMetadata {
            page_count: self.page_count(),
            ..DocumentMetadata::default()
        };

        let info = match self
            .document
            .trailer
            .get(b"Info")
            .and_then(|obj| self.document.dereference(obj))
            .and_then(|(_, obj)| obj.as_dict())
        {
            Ok(dict) => dict,
            Err(_) => return metadata,
        };

        metadata.title = info.get(b"Title").ok().and_then(|o| self.text_string(o));
        metadata.author = info.get(b"Author").ok().and_then(|o| self.text_string(o));
        metadata.created = info
            .get(b"CreationDate")
            .ok()
            .and_then(|o| self.text_string(o))
            .and_then(|s| parse_pdf_date(&s));
        metadata.modified = info
            .get(b"ModDate")
            .ok()
            .and_then(|o| self.text_string(o))
            .and_then(|s| parse_pdf_date(&s));

        metadata
    }

    pub(crate) fn document(&self) -> &Document {
        &self.document
    }

    /// Decode a PDF text string object (resolving references), handling the
    /// UTF-16BE byte-order-mark form.
    fn text_string(&self, obj: &Object) -> Option<String> {
        let resolved = match obj {
            Object::Reference(id) => self.document.get_object(*id).ok()?,
            other => other,
        };
        match resolved {
            Object::String(bytes, _) => Some(decode_text_string(bytes)),
            _ => None,
        }
    }
}

/// Decode PDF string bytes: UTF-16BE when BOM-prefixed, PDFDocEncoding
/// (treated as Latin-1) otherwise.
fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

/// Parse a PDF date string (`D:YYYYMMDDHHmmSS` with optional `Z` or
/// `±HH'mm'` offset; trailing components may be omitted) into UTC.
fn parse_pdf_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.strip_prefix("D:").unwrap_or(raw);

    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        warn!(raw, "unparseable PDF date");
        return None;
    }

    let component = |start: usize, len: usize, default: u32| -> u32 {
        digits
            .get(start..start + len)
            .and_then(|part| part.parse().ok())
            .unwrap_or(default)
    };

    let year: i32 = digits.get(0..4)?.parse().ok()?;
    let month = component(4, 2, 1);
    let day = component(6, 2, 1);
    let hour = component(8, 2, 0);
    let minute = component(10, 2, 0);
    let second = component(12, 2, 0);

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;

    // Offset suffix: "Z", or "+HH'mm'" / "-HH'mm'" (minutes optional).
    let rest = &s[digits.len()..];
    let offset_seconds = match rest.chars().next() {
        Some('+') | Some('-') => {
            let sign = if rest.starts_with('-') { -1i32 } else { 1 };
            let tail: String = rest[1..].chars().filter(|c| c.is_ascii_digit()).collect();
            let hours: i32 = tail.get(0..2).and_then(|p| p.parse().ok()).unwrap_or(0);
            let minutes: i32 = tail.get(2..4).and_then(|p| p.parse().ok()).unwrap_or(0);
            sign * (hours * 3600 + minutes * 60)
        }
        _ => 0,
    };

    let offset = FixedOffset::east_opt(offset_seconds)?;
    Some(
        naive
            .and_local_timezone(offset)
            .single()?
            .with_timezone(&Utc),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::{digital_pdf, pdf_with_info};
    use chrono::Timelike;

    #[test]
    fn garbage_bytes_are_unreadable() {
        let err = PdfSource::from_bytes(b"not a pdf at all").unwrap_err();
        assert!(matches!(err, ExtractError::DocumentUnreadable(_)));
    }

    #[test]
    fn page_count_and_text_layer() {
        let bytes = digital_pdf(&["Hello threshold world", "Second page content"]);
        let source = PdfSource::from_bytes(&bytes).unwrap();
        assert_eq!(source.page_count(), 2);

        let text = source.page_text(1).unwrap();
        assert!(text.contains("Hello"), "got: {text:?}");
        let text = source.page_text(2).unwrap();
        assert!(text.contains("Second"), "got: {text:?}");
    }

    #[test]
    fn metadata_from_info_dictionary() {
        let bytes = pdf_with_info("Quarterly Report", "A. Author", "D:20240102030405Z");
        let source = PdfSource::from_bytes(&bytes).unwrap();
        let metadata = source.metadata();

        assert_eq!(metadata.title.as_deref(), Some("Quarterly Report"));
        assert_eq!(metadata.author.as_deref(), Some("A. Author"));
        assert_eq!(metadata.page_count, 1);
        let created = metadata.created.unwrap();
        assert_eq!(created.hour(), 3);
        assert!(metadata.modified.is_none());
    }

    #[test]
    fn metadata_defaults_without_info() {
        let bytes = digital_pdf(&["anything"]);
        let source = PdfSource::from_bytes(&bytes).unwrap();
        let metadata = source.metadata();
        assert!(metadata.title.is_none());
        assert!(metadata.author.is_none());
        assert!(metadata.created.is_none());
        assert_eq!(metadata.page_count, 1);
    }

    #[test]
    fn pdf_date_offset_and_truncated_forms() {
        let full = parse_pdf_date("D:20240102120000+02'00'").unwrap();
        assert_eq!(full.hour(), 10); // 12:00 at +02:00 is 10:00 UTC

        let short = parse_pdf_date("D:2024").unwrap();
        assert_eq!(short.to_rfc3339(), "2024-01-01T00:00:00+00:00");

        assert!(parse_pdf_date("D:xx").is_none());
    }

    #[test]
    fn utf16_string_decoding() {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in "Résumé".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(decode_text_string(&bytes), "Résumé");
        assert_eq!(decode_text_string(b"plain"), "plain");
    }
}
