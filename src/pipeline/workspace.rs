//! Request-scoped working area.
//!
//! pandoc reads and writes files, so each conversion gets its own temporary
//! directory holding the Markdown input, the metadata document and the EPUB.
//! The directory is a [`TempDir`]: it is removed when the [`WorkingArea`] is
//! dropped, whichever way the pipeline exits (early return, `?`, panic).

use crate::error::Md2EpubError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

const INPUT_FILE: &str = "input.md";
const METADATA_FILE: &str = "metadata.yaml";
const OUTPUT_FILE: &str = "book.epub";

/// A temporary directory owned by exactly one in-flight conversion.
#[derive(Debug)]
pub struct WorkingArea {
    dir: TempDir,
}

impl WorkingArea {
    /// Create a fresh directory under the system temp dir.
    pub fn create() -> Result<Self, Md2EpubError> {
        let dir = tempfile::Builder::new()
            .prefix("md2epub-")
            .tempdir()
            .map_err(|e| Md2EpubError::io("creating working area", e))?;
        debug!("Created working area {}", dir.path().display());
        Ok(Self { dir })
    }

    /// Root of the working area.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the normalised Markdown is written.
    pub fn input_path(&self) -> PathBuf {
        self.dir.path().join(INPUT_FILE)
    }

    /// Where the YAML metadata document is written.
    pub fn metadata_path(&self) -> PathBuf {
        self.dir.path().join(METADATA_FILE)
    }

    /// Where the converter is told to write the EPUB.
    pub fn output_path(&self) -> PathBuf {
        self.dir.path().join(OUTPUT_FILE)
    }

    pub async fn write_input(&self, markdown: &str) -> Result<(), Md2EpubError> {
        tokio::fs::write(self.input_path(), markdown)
            .await
            .map_err(|e| Md2EpubError::io("writing Markdown input", e))
    }

    pub async fn write_metadata(&self, document: &str) -> Result<(), Md2EpubError> {
        tokio::fs::write(self.metadata_path(), document)
            .await
            .map_err(|e| Md2EpubError::io("writing metadata document", e))
    }

    /// Remove the directory now, logging instead of failing if removal fails.
    ///
    /// Dropping the value removes it too but swallows errors silently.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!("Removed working area {}", path.display()),
            Err(e) => warn!("Failed to remove working area {}: {}", path.display(), e),
        }
    }
}
