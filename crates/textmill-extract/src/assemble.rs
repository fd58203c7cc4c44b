// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output assembly — renders an extraction result as a plain-text download
// and as a structured XML document.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Cursor;
use textmill_core::error::ExtractError;
use textmill_core::types::ExtractionResult;
use tracing::{debug, instrument};

use crate::pipeline::PipelineStage;

/// Renders extraction results into the two downloadable representations.
///
/// Pure functions over the result — no failure modes beyond propagating a
/// writer error, which upstream invariants should make unreachable.
pub struct OutputAssembler;

impl OutputAssembler {
    /// Flat concatenation of page texts in page order, blank-line
    /// separated.
    pub fn plain_text(result: &ExtractionResult) -> String {
        result
            .pages
            .iter()
            .map(|page| page.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Structured XML markup: a `<document>` root wrapping a `<metadata>`
    /// block (fields omitted when unknown) and one `<page>` element per
    /// page, in page order. Reserved characters in text content and
    /// attributes are escaped by the writer.
    ///
    /// Pages that recorded a failure carry a `degraded` attribute with the
    /// failure note.
    #[instrument(skip_all, fields(pages = result.pages.len()))]
    pub fn to_xml(result: &ExtractionResult) -> Result<Vec<u8>, ExtractError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(markup_err)?;
        writer
            .write_event(Event::Start(BytesStart::new("document")))
            .map_err(markup_err)?;

        writer
            .write_event(Event::Start(BytesStart::new("metadata")))
            .map_err(markup_err)?;
        if let Some(title) = &result.metadata.title {
            text_element(&mut writer, "title", title)?;
        }
        if let Some(author) = &result.metadata.author {
            text_element(&mut writer, "author", author)?;
        }
        text_element(
            &mut writer,
            "pageCount",
            &result.metadata.page_count.to_string(),
        )?;
        if let Some(created) = &result.metadata.created {
            text_element(&mut writer, "created", &created.to_rfc3339())?;
        }
        if let Some(modified) = &result.metadata.modified {
            text_element(&mut writer, "modified", &modified.to_rfc3339())?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("metadata")))
            .map_err(markup_err)?;

        for page in &result.pages {
            let mut start = BytesStart::new("page");
            start.push_attribute(("index", page.index.to_string().as_str()));
            if let Some(failure) = &page.failure {
                start.push_attribute(("degraded", failure.to_string().as_str()));
            }
            writer
                .write_event(Event::Start(start))
                .map_err(markup_err)?;
            writer
                .write_event(Event::Text(BytesText::new(&page.text)))
                .map_err(markup_err)?;
            writer
                .write_event(Event::End(BytesEnd::new("page")))
                .map_err(markup_err)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("document")))
            .map_err(markup_err)?;

        let bytes = writer.into_inner().into_inner();
        debug!(stage = %PipelineStage::Assembled, bytes = bytes.len(), "markup assembled");
        Ok(bytes)
    }
}

fn text_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    content: &str,
) -> Result<(), ExtractError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(markup_err)?;
    writer
        .write_event(Event::Text(BytesText::new(content)))
        .map_err(markup_err)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(markup_err)?;
    Ok(())
}

fn markup_err(err: impl std::fmt::Display) -> ExtractError {
    ExtractError::Markup(err.to_string())
}
