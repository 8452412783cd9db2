//! Error types for the md2epub library.
//!
//! Every failure in the conversion pipeline is expressed as one
//! [`Md2EpubError`]. Each stage converts its local failures (I/O errors,
//! process exit codes, archive parse errors) into the matching variant, so
//! nothing leaves [`crate::convert::convert`] unclassified.
//!
//! Callers that need a coarse category (for instance to pick an HTTP status)
//! use [`Md2EpubError::kind`], which maps the variants onto the stable
//! [`ErrorKind`] taxonomy.
//!
//! Metadata that cannot be found in the rendered book is *not* an error; it
//! is recorded in [`crate::output::MetadataCheck`] instead.

use std::fmt;
use thiserror::Error;

/// All errors returned by the md2epub library.
#[derive(Debug, Error)]
pub enum Md2EpubError {
    // ── Request errors ────────────────────────────────────────────────────
    /// A required field was absent from the request body.
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    /// A required field was present but had the wrong JSON type.
    #[error("Invalid field: {field} must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },

    /// The shared secret was missing or did not match.
    #[error("Authentication required")]
    AuthRequired,

    // ── Converter errors ──────────────────────────────────────────────────
    /// The converter exited with a non-zero status.
    ///
    /// `detail` holds the captured standard error, trimmed, or a short
    /// description of the exit status when the converter printed nothing.
    #[error("Conversion failed: {detail}")]
    ConverterFailed { code: Option<i32>, detail: String },

    /// The converter did not exit within the configured wall-clock bound.
    #[error("Conversion timed out after {secs}s")]
    ConverterTimeout { secs: u64 },

    /// The converter binary could not be started at all.
    #[error("Converter '{program}' could not be started: {reason}")]
    ConverterUnavailable { program: String, reason: String },

    // ── Artifact errors ───────────────────────────────────────────────────
    /// The converter reported success but wrote no output file.
    #[error("Conversion failed: no output file was produced")]
    NoOutputProduced,

    /// The output file exists but has zero bytes.
    #[error("Conversion failed: output file is empty")]
    EmptyOutput,

    /// The output file is not a readable ZIP container.
    #[error("Conversion failed: output is not a valid EPUB archive ({detail})")]
    CorruptOutput { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Filesystem failure inside the working area.
    #[error("I/O error while {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of [`Md2EpubError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or incomplete request (400).
    Validation,
    /// Missing or wrong credential (401).
    Auth,
    /// The converter failed, timed out, or could not be started (500).
    ConverterFailed,
    /// No artifact was written (500).
    NoOutputProduced,
    /// A zero-byte artifact was written (500).
    EmptyOutput,
    /// The artifact is structurally invalid (500).
    CorruptOutput,
    /// Any other fault (500).
    Internal,
}

impl ErrorKind {
    /// The HTTP status code this kind is reported with.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::Auth => 401,
            ErrorKind::ConverterFailed
            | ErrorKind::NoOutputProduced
            | ErrorKind::EmptyOutput
            | ErrorKind::CorruptOutput
            | ErrorKind::Internal => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Auth => "auth",
            ErrorKind::ConverterFailed => "converter_failed",
            ErrorKind::NoOutputProduced => "no_output_produced",
            ErrorKind::EmptyOutput => "empty_output",
            ErrorKind::CorruptOutput => "corrupt_output",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

impl Md2EpubError {
    /// Wrap an I/O error with a short description of what was being done.
    pub fn io(context: &'static str, source: std::io::Error) -> Self {
        Md2EpubError::Io { context, source }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Md2EpubError::MissingField { .. } | Md2EpubError::InvalidField { .. } => {
                ErrorKind::Validation
            }
            Md2EpubError::AuthRequired => ErrorKind::Auth,
            Md2EpubError::ConverterFailed { .. }
            | Md2EpubError::ConverterTimeout { .. }
            | Md2EpubError::ConverterUnavailable { .. } => ErrorKind::ConverterFailed,
            Md2EpubError::NoOutputProduced => ErrorKind::NoOutputProduced,
            Md2EpubError::EmptyOutput => ErrorKind::EmptyOutput,
            Md2EpubError::CorruptOutput { .. } => ErrorKind::CorruptOutput,
            Md2EpubError::Io { .. }
            | Md2EpubError::InvalidConfig(_)
            | Md2EpubError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// The message shown to remote callers.
    ///
    /// Internal faults and spawn failures carry filesystem paths and OS error
    /// text in their `Display` output; those details go to the log only.
    pub fn public_message(&self) -> String {
        match self {
            Md2EpubError::ConverterUnavailable { .. } => {
                "Conversion failed: converter is not available".to_string()
            }
            Md2EpubError::Io { .. }
            | Md2EpubError::InvalidConfig(_)
            | Md2EpubError::Internal(_) => {
                "An internal error occurred during conversion".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_display() {
        let e = Md2EpubError::MissingField { field: "markdown" };
        assert_eq!(e.to_string(), "Missing required field: markdown");
        assert_eq!(e.status_code(), 400);
    }

    #[test]
    fn converter_failed_display() {
        let e = Md2EpubError::ConverterFailed {
            code: Some(1),
            detail: "pandoc: unknown option".into(),
        };
        assert_eq!(e.to_string(), "Conversion failed: pandoc: unknown option");
        assert_eq!(e.public_message(), e.to_string());
        assert_eq!(e.kind(), ErrorKind::ConverterFailed);
    }

    #[test]
    fn timeout_is_a_converter_failure() {
        let e = Md2EpubError::ConverterTimeout { secs: 30 };
        assert!(e.to_string().contains("30s"));
        assert_eq!(e.kind(), ErrorKind::ConverterFailed);
        assert_eq!(e.status_code(), 500);
    }

    #[test]
    fn io_error_hides_details_from_callers() {
        let e = Md2EpubError::io(
            "writing /tmp/md2epub-abc/input.md",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(e.to_string().contains("/tmp/md2epub-abc"));
        assert!(!e.public_message().contains("/tmp"));
        assert_eq!(e.kind(), ErrorKind::Internal);
    }

    #[test]
    fn unavailable_converter_hides_program_path() {
        let e = Md2EpubError::ConverterUnavailable {
            program: "/opt/pandoc/bin/pandoc".into(),
            reason: "No such file or directory".into(),
        };
        assert!(!e.public_message().contains("/opt"));
    }

    #[test]
    fn auth_status_code() {
        assert_eq!(Md2EpubError::AuthRequired.status_code(), 401);
        assert_eq!(
            Md2EpubError::AuthRequired.public_message(),
            "Authentication required"
        );
    }

    #[test]
    fn artifact_errors_are_distinct_kinds() {
        assert_eq!(Md2EpubError::NoOutputProduced.kind(), ErrorKind::NoOutputProduced);
        assert_eq!(Md2EpubError::EmptyOutput.kind(), ErrorKind::EmptyOutput);
        let corrupt = Md2EpubError::CorruptOutput {
            detail: "missing central directory".into(),
        };
        assert_eq!(corrupt.kind(), ErrorKind::CorruptOutput);
        assert_eq!(corrupt.kind().to_string(), "corrupt_output");
    }
}
