// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the interface layer.
//
// Every fatal extraction error is mapped to plain English with a clear
// suggestion. The severity levels drive UI presentation.

use crate::error::ExtractError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// May succeed on a straight retry.
    Transient,
    /// User must do something (install models, fix the file).
    ActionRequired,
    /// Cannot be fixed by retrying or user action — bad file, wrong format.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether the system should auto-retry.
    pub retriable: bool,
    /// Severity level (drives icon/colour in UI).
    pub severity: Severity,
}

/// Convert an `ExtractError` into a `HumanError` for display.
pub fn humanize_error(err: &ExtractError) -> HumanError {
    match err {
        ExtractError::DocumentUnreadable(_) => HumanError {
            message: "We couldn't read this document.".into(),
            suggestion: "The file may be damaged or password-protected. Try opening it on \
                         your computer to check it works, or upload a different copy."
                .into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        ExtractError::EngineUnavailable(detail) => HumanError {
            message: "Text recognition isn't set up on this system.".into(),
            suggestion: format!(
                "The recognition models need to be installed before scanned documents \
                 can be processed. ({detail})"
            ),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ExtractError::UnsupportedMedia(detail) => HumanError {
            message: "This type of file isn't supported.".into(),
            suggestion: format!(
                "Try saving the document as a PDF, PNG, or JPEG first. (File type: {detail})"
            ),
            retriable: false,
            severity: Severity::Permanent,
        },

        ExtractError::ImageError(_) => HumanError {
            message: "There's a problem with this image.".into(),
            suggestion: "The image may be damaged or in an unusual format. Try saving it \
                         as a JPEG or PNG first."
                .into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        ExtractError::Markup(_) => HumanError {
            message: "The app had an internal data problem.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ExtractError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Try choosing the file \
                                 again."
                        .into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, your device's storage \
                                 may be full."
                        .into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreadable_document_is_permanent() {
        let human = humanize_error(&ExtractError::DocumentUnreadable("bad xref".into()));
        assert_eq!(human.severity, Severity::Permanent);
        assert!(!human.retriable);
    }

    #[test]
    fn missing_engine_is_action_required() {
        let human = humanize_error(&ExtractError::EngineUnavailable(
            "detection model not found".into(),
        ));
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.suggestion.contains("detection model not found"));
    }

    #[test]
    fn file_not_found_is_action_required() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let human = humanize_error(&ExtractError::Io(io));
        assert_eq!(human.severity, Severity::ActionRequired);
    }
}
