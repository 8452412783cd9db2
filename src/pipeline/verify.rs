//! Artifact verification.
//!
//! A zero exit status from the converter does not guarantee a usable book:
//! the output file can be missing, empty or truncated. [`verify_artifact`]
//! checks the file in three fatal steps (exists, non-empty, parses as a ZIP
//! container with at least one entry) and reads it into memory. An archive
//! with an empty central directory cannot hold a book, so it counts as
//! corrupt. The `mimetype` entry that EPUB
//! readers expect first in the archive is recorded but never fatal.
//!
//! [`inspect_metadata`] is the optional fourth step: it asks the converter to
//! read the book back as plain text and looks for the title and author.
//! Its outcome is diagnostic only.

use crate::error::Md2EpubError;
use crate::output::{MetadataCheck, EPUB_MIME_TYPE};
use crate::pipeline::invoke::{inspection_args, Converter};
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::{debug, warn};
use zip::ZipArchive;

/// Name of the uncompressed first entry in a well-formed EPUB.
const MIMETYPE_ENTRY: &str = "mimetype";

/// The verified book, read into memory.
#[derive(Debug, Clone)]
pub struct VerifiedArtifact {
    pub bytes: Vec<u8>,
    /// Number of entries in the ZIP central directory.
    pub entries: usize,
    /// `true` when the first entry is `mimetype` holding `application/epub+zip`.
    pub has_epub_mimetype: bool,
}

/// Check the file at `path` and return its contents.
///
/// # Errors
/// - [`Md2EpubError::NoOutputProduced`] when nothing exists at `path`
/// - [`Md2EpubError::EmptyOutput`] for a zero-byte file
/// - [`Md2EpubError::CorruptOutput`] when the bytes are not a readable ZIP
pub async fn verify_artifact(path: &Path) -> Result<VerifiedArtifact, Md2EpubError> {
    let meta = match tokio::fs::metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Md2EpubError::NoOutputProduced)
        }
        Err(e) => return Err(Md2EpubError::io("inspecting converter output", e)),
    };
    if !meta.is_file() {
        return Err(Md2EpubError::NoOutputProduced);
    }
    if meta.len() == 0 {
        return Err(Md2EpubError::EmptyOutput);
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Md2EpubError::io("reading converter output", e))?;
    if bytes.is_empty() {
        return Err(Md2EpubError::EmptyOutput);
    }

    let (entries, has_epub_mimetype) = inspect_container(&bytes)?;
    if !has_epub_mimetype {
        warn!("EPUB archive does not start with a '{MIMETYPE_ENTRY}' entry");
    }
    debug!("Verified EPUB: {} bytes, {} entries", bytes.len(), entries);

    Ok(VerifiedArtifact {
        bytes,
        entries,
        has_epub_mimetype,
    })
}

/// Parse the ZIP directory and walk every entry header.
fn inspect_container(bytes: &[u8]) -> Result<(usize, bool), Md2EpubError> {
    let corrupt = |e: zip::result::ZipError| Md2EpubError::CorruptOutput {
        detail: e.to_string(),
    };

    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(corrupt)?;
    let entries = archive.len();
    if entries == 0 {
        return Err(Md2EpubError::CorruptOutput {
            detail: "archive has no entries".into(),
        });
    }

    for i in 0..entries {
        archive.by_index(i).map_err(corrupt)?;
    }

    let has_mimetype = match archive.by_index(0) {
        Ok(mut first) if first.name() == MIMETYPE_ENTRY => {
            let mut content = String::new();
            first.read_to_string(&mut content).is_ok() && content.trim() == EPUB_MIME_TYPE
        }
        _ => false,
    };

    Ok((entries, has_mimetype))
}

/// Read the book back through the converter and look for title and author.
///
/// Never fails: an inspection run that errors or exits non-zero yields a
/// check with `performed == false`. Matching ignores case and treats any run
/// of whitespace as a single space.
pub async fn inspect_metadata(
    converter: &dyn Converter,
    epub: &Path,
    title: &str,
    author: &str,
) -> MetadataCheck {
    let args = inspection_args(epub);
    let output = match converter.run(&args).await {
        Ok(output) if output.success() => output,
        Ok(output) => {
            warn!(
                "Metadata inspection exited with {:?}: {}",
                output.exit_code,
                output.stderr_lossy().trim()
            );
            return MetadataCheck::skipped();
        }
        Err(e) => {
            warn!("Metadata inspection could not run: {}", e);
            return MetadataCheck::skipped();
        }
    };

    let text = fold(&output.stdout_lossy());
    let check = MetadataCheck {
        performed: true,
        title_found: contains_folded(&text, title),
        author_found: contains_folded(&text, author),
    };

    if !check.title_found {
        warn!("Title {:?} not found in rendered book", title);
    }
    if !check.author_found {
        warn!("Author {:?} not found in rendered book", author);
    }
    check
}

fn contains_folded(haystack: &str, needle: &str) -> bool {
    let needle = fold(needle);
    needle.is_empty() || haystack.contains(&needle)
}

/// Lowercase and collapse whitespace runs to one space.
fn fold(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::invoke::ConverterOutput;
    use futures::future::BoxFuture;
    use std::ffi::OsString;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    fn epub_bytes(first: &str) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        zip.start_file(first, stored).unwrap();
        zip.write_all(EPUB_MIME_TYPE.as_bytes()).unwrap();
        zip.start_file("EPUB/content.opf", stored).unwrap();
        zip.write_all(b"<package/>").unwrap();
        zip.finish().unwrap().into_inner()
    }

    struct Reader(ConverterOutput);

    impl Converter for Reader {
        fn name(&self) -> &str {
            "reader"
        }

        fn run<'a>(
            &'a self,
            _args: &'a [OsString],
        ) -> BoxFuture<'a, Result<ConverterOutput, Md2EpubError>> {
            let output = self.0.clone();
            Box::pin(async move { Ok(output) })
        }
    }

    fn reader(stdout: &str) -> Reader {
        Reader(ConverterOutput {
            exit_code: Some(0),
            stdout: stdout.as_bytes().to_vec(),
            stderr: Vec::new(),
        })
    }

    #[tokio::test]
    async fn missing_file_is_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let err = verify_artifact(&dir.path().join("book.epub")).await.unwrap_err();
        assert!(matches!(err, Md2EpubError::NoOutputProduced));
    }

    #[tokio::test]
    async fn zero_bytes_is_empty_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.epub");
        std::fs::write(&path, b"").unwrap();
        let err = verify_artifact(&path).await.unwrap_err();
        assert!(matches!(err, Md2EpubError::EmptyOutput));
    }

    #[tokio::test]
    async fn garbage_is_corrupt_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.epub");
        std::fs::write(&path, b"this is not a zip file at all").unwrap();
        let err = verify_artifact(&path).await.unwrap_err();
        assert!(matches!(err, Md2EpubError::CorruptOutput { .. }));
    }

    #[tokio::test]
    async fn truncated_archive_is_corrupt_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.epub");
        let bytes = epub_bytes(MIMETYPE_ENTRY);
        std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();
        tokio_test::assert_err!(verify_artifact(&path).await);
    }

    #[tokio::test]
    async fn archive_without_entries_is_corrupt_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.epub");
        let empty = ZipWriter::new(Cursor::new(Vec::new()))
            .finish()
            .unwrap()
            .into_inner();
        assert!(!empty.is_empty());
        std::fs::write(&path, &empty).unwrap();

        match verify_artifact(&path).await {
            Err(Md2EpubError::CorruptOutput { detail }) => {
                assert_eq!(detail, "archive has no entries")
            }
            other => panic!("expected CorruptOutput, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn valid_archive_is_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.epub");
        let bytes = epub_bytes(MIMETYPE_ENTRY);
        std::fs::write(&path, &bytes).unwrap();

        let verified = verify_artifact(&path).await.unwrap();
        assert_eq!(verified.bytes, bytes);
        assert_eq!(verified.entries, 2);
        assert!(verified.has_epub_mimetype);
    }

    #[tokio::test]
    async fn missing_mimetype_entry_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.epub");
        std::fs::write(&path, epub_bytes("META-INF/container.xml")).unwrap();

        let verified = verify_artifact(&path).await.unwrap();
        assert!(!verified.has_epub_mimetype);
    }

    #[tokio::test]
    async fn metadata_found_ignoring_case_and_spacing() {
        let conv = reader("MY   Book\n\nJane\nDoe\n\nChapter one");
        let check = inspect_metadata(&conv, Path::new("b.epub"), "My Book", "Jane Doe").await;
        assert!(check.is_complete());
    }

    #[tokio::test]
    async fn metadata_miss_is_reported_not_raised() {
        let conv = reader("Something else entirely");
        let check = inspect_metadata(&conv, Path::new("b.epub"), "Title", "Author").await;
        assert!(check.performed);
        assert!(!check.title_found);
        assert!(!check.author_found);
    }

    #[tokio::test]
    async fn failed_inspection_is_skipped() {
        let conv = Reader(ConverterOutput {
            exit_code: Some(2),
            stdout: Vec::new(),
            stderr: b"cannot read".to_vec(),
        });
        let check = inspect_metadata(&conv, Path::new("b.epub"), "T", "A").await;
        assert_eq!(check, MetadataCheck::skipped());
    }
}
