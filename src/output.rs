//! Output types: the converted book plus per-conversion statistics.

use serde::{Deserialize, Serialize};

/// MIME type of every artifact produced by the service.
pub const EPUB_MIME_TYPE: &str = "application/epub+zip";

/// File name suggested to clients in `Content-Disposition`.
pub const EPUB_FILE_NAME: &str = "book.epub";

/// A verified EPUB, held entirely in memory.
///
/// The bytes are read before the working area is removed, so the artifact
/// has no tie to the filesystem once returned.
#[derive(Debug, Clone)]
pub struct EpubArtifact {
    /// The complete EPUB file.
    pub bytes: Vec<u8>,
    /// Always [`EPUB_MIME_TYPE`].
    pub mime_type: &'static str,
    /// Always [`EPUB_FILE_NAME`].
    pub file_name: &'static str,
    /// Measurements collected along the pipeline.
    pub stats: ConversionStats,
}

impl EpubArtifact {
    pub(crate) fn new(bytes: Vec<u8>, stats: ConversionStats) -> Self {
        Self {
            bytes,
            mime_type: EPUB_MIME_TYPE,
            file_name: EPUB_FILE_NAME,
            stats,
        }
    }

    /// Size of the artifact in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// `true` for a zero-byte artifact. Never the case for a verified book.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Statistics for one conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Byte length of the Markdown as received.
    pub input_bytes: usize,
    /// Byte length after normalisation.
    pub normalized_bytes: usize,
    /// Byte length of the EPUB.
    pub output_bytes: usize,
    /// Number of entries in the EPUB's ZIP directory.
    pub archive_entries: usize,
    /// Whether the archive starts with the `mimetype` entry EPUB readers expect.
    pub has_epub_mimetype: bool,
    /// Wall-clock time spent inside the converter, in milliseconds.
    pub converter_duration_ms: u64,
    /// Wall-clock time for the whole pipeline, in milliseconds.
    pub total_duration_ms: u64,
    /// Outcome of the advisory title/author check.
    pub metadata_check: MetadataCheck,
}

/// Result of looking for the requested title and author in the rendered book.
///
/// A miss is diagnostic only: converters may abbreviate or restyle metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataCheck {
    /// `false` when the check was disabled or the inspection run failed.
    pub performed: bool,
    pub title_found: bool,
    pub author_found: bool,
}

impl MetadataCheck {
    /// A check that did not run.
    pub fn skipped() -> Self {
        Self::default()
    }

    /// `true` when the check ran and found both values.
    pub fn is_complete(&self) -> bool {
        self.performed && self.title_found && self.author_found
    }
}
