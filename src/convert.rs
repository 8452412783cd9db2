//! Conversion entry points: the pipeline orchestrator.
//!
//! A conversion walks a fixed sequence of stages and stops at the first
//! failure:
//!
//! ```text
//! Validating → Normalizing → BuildingMetadata → Invoking → Verifying → Succeeded
//!      └────────────┴──────────────┴──────────────┴───────────┴─────▶ Failed(kind)
//! ```
//!
//! The working area is created before the first file is written and removed
//! when the pipeline returns, on every path. A successful artifact is read
//! fully into memory first, so nothing returned refers to the filesystem.

use crate::config::ServiceConfig;
use crate::error::{ErrorKind, Md2EpubError};
use crate::output::{ConversionStats, EpubArtifact, MetadataCheck};
use crate::pipeline::{invoke, metadata, normalize, verify, workspace::WorkingArea};
use crate::request::ConversionRequest;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique id used to correlate log lines of one conversion.
pub fn next_request_id() -> u64 {
    NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)
}

/// Where a conversion currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Normalizing,
    BuildingMetadata,
    Invoking,
    Verifying,
    Succeeded,
    Failed(ErrorKind),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Validating => f.write_str("validating"),
            Stage::Normalizing => f.write_str("normalizing"),
            Stage::BuildingMetadata => f.write_str("building_metadata"),
            Stage::Invoking => f.write_str("invoking"),
            Stage::Verifying => f.write_str("verifying"),
            Stage::Succeeded => f.write_str("succeeded"),
            Stage::Failed(kind) => write!(f, "failed({kind})"),
        }
    }
}

/// Stage bookkeeping for one conversion.
struct Progress {
    stage: Stage,
}

impl Progress {
    fn new() -> Self {
        Self {
            stage: Stage::Validating,
        }
    }

    fn advance(&mut self, next: Stage) {
        debug!(from = %self.stage, to = %next, "stage transition");
        self.stage = next;
    }

    fn finish<T>(&mut self, result: Result<T, Md2EpubError>) -> Result<T, Md2EpubError> {
        match &result {
            Ok(_) => self.advance(Stage::Succeeded),
            Err(e) => {
                let failed_in = self.stage;
                self.advance(Stage::Failed(e.kind()));
                warn!(stage = %failed_in, kind = %e.kind(), "conversion failed: {}", e);
            }
        }
        result
    }
}

/// Convert a raw JSON request body into an EPUB.
///
/// This is what `POST /convert` calls: the body is validated here, so a
/// request without `markdown` fails before any file is written or any
/// process is started.
pub async fn convert_json(
    body: &[u8],
    config: &ServiceConfig,
) -> Result<EpubArtifact, Md2EpubError> {
    let id = next_request_id();
    let span = info_span!("conversion", request_id = id);
    async move {
        let mut progress = Progress::new();
        let request = match ConversionRequest::from_json_slice(body) {
            Ok(r) => r,
            Err(e) => return progress.finish(Err(e)),
        };
        let result = run_stages(&request, config, &mut progress).await;
        progress.finish(result)
    }
    .instrument(span)
    .await
}

/// Convert an already-validated request into an EPUB.
///
/// # Errors
/// Returns `Err(Md2EpubError)` when the converter fails, times out or
/// cannot be started, or when its output is missing, empty or not a ZIP
/// container. A title or author missing from the rendered book is *not* an
/// error; see [`ConversionStats::metadata_check`].
pub async fn convert(
    request: &ConversionRequest,
    config: &ServiceConfig,
) -> Result<EpubArtifact, Md2EpubError> {
    let id = next_request_id();
    let span = info_span!("conversion", request_id = id);
    async move {
        let mut progress = Progress::new();
        let result = run_stages(request, config, &mut progress).await;
        progress.finish(result)
    }
    .instrument(span)
    .await
}

/// Convert and write the EPUB to `output_path`.
///
/// Uses atomic write (temp file + rename) so a failed run never leaves a
/// partial book behind.
pub async fn convert_to_file(
    request: &ConversionRequest,
    output_path: impl AsRef<Path>,
    config: &ServiceConfig,
) -> Result<ConversionStats, Md2EpubError> {
    let artifact = convert(request, config).await?;
    let path = output_path.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Md2EpubError::io("creating output directory", e))?;
    }

    let tmp_path = path.with_extension("epub.tmp");
    tokio::fs::write(&tmp_path, &artifact.bytes)
        .await
        .map_err(|e| Md2EpubError::io("writing EPUB file", e))?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
            warn!("Failed to remove {}: {}", tmp_path.display(), cleanup);
        }
        return Err(Md2EpubError::io("renaming EPUB file into place", e));
    }

    info!("Wrote {} ({} bytes)", path.display(), artifact.len());
    Ok(artifact.stats)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    request: &ConversionRequest,
    config: &ServiceConfig,
) -> Result<EpubArtifact, Md2EpubError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Md2EpubError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(convert(request, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run_stages(
    request: &ConversionRequest,
    config: &ServiceConfig,
    progress: &mut Progress,
) -> Result<EpubArtifact, Md2EpubError> {
    let total_start = Instant::now();
    info!(
        "Converting {} bytes of Markdown (title {:?})",
        request.markdown.len(),
        request.title
    );

    let area = WorkingArea::create()?;

    // ── Step 1: Normalise text ───────────────────────────────────────────
    progress.advance(Stage::Normalizing);
    let normalized = normalize::normalize_markdown(&request.markdown);
    area.write_input(&normalized).await?;

    // ── Step 2: Metadata document ────────────────────────────────────────
    progress.advance(Stage::BuildingMetadata);
    let fields = metadata::MetadataFields::new(&request.title, &request.author, &config.metadata);
    let document = metadata::build_metadata_document(&fields, config.whitespace);
    area.write_metadata(&document).await?;

    // ── Step 3: Run the converter ────────────────────────────────────────
    progress.advance(Stage::Invoking);
    let converter = invoke::resolve_converter(config);
    let converter_duration = invoke::run_conversion(&*converter, &area, config.toc_depth).await?;

    // ── Step 4: Verify the artifact ──────────────────────────────────────
    progress.advance(Stage::Verifying);
    let verified = verify::verify_artifact(&area.output_path()).await?;
    let metadata_check = if config.verify_metadata {
        verify::inspect_metadata(
            &*converter,
            &area.output_path(),
            &request.title,
            &request.author,
        )
        .await
    } else {
        MetadataCheck::skipped()
    };

    area.close();

    let stats = ConversionStats {
        input_bytes: request.markdown.len(),
        normalized_bytes: normalized.len(),
        output_bytes: verified.bytes.len(),
        archive_entries: verified.entries,
        has_epub_mimetype: verified.has_epub_mimetype,
        converter_duration_ms: converter_duration.as_millis() as u64,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        metadata_check,
    };

    info!(
        "Conversion complete: {} bytes, {} entries, {}ms total",
        stats.output_bytes, stats.archive_entries, stats.total_duration_ms
    );

    Ok(EpubArtifact::new(verified.bytes, stats))
}
