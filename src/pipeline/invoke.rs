//! Converter invocation: build pandoc's argument list and run it.
//!
//! The converter sits behind the [`Converter`] trait so the pipeline can be
//! driven by something other than a real pandoc binary (tests, sandboxed
//! wrappers). [`PandocConverter`] is the production implementation.
//!
//! ## No retries
//!
//! A conversion that fails once fails the same way again for the same input;
//! the captured standard error is returned to the caller instead.
//!
//! ## Timeout
//!
//! Every run is bounded by the configured wall-clock timeout. The child is
//! spawned with `kill_on_drop`, so when the timeout future wins (or the
//! request future is dropped) the process is killed rather than leaked.

use crate::config::ServiceConfig;
use crate::error::Md2EpubError;
use crate::pipeline::workspace::WorkingArea;
use futures::future::BoxFuture;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

/// pandoc reader used for the request text.
pub const SOURCE_FORMAT: &str = "markdown";

/// pandoc writer for the artifact. Fixed: EPUB is the only output format.
pub const TARGET_FORMAT: &str = "epub3";

/// Captured result of one converter run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConverterOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ConverterOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Something that runs pandoc-compatible command lines.
///
/// Implementations receive the full argument list (without the program
/// name) and return once the run has finished. Non-zero exits are reported
/// through [`ConverterOutput::exit_code`], not as `Err`; `Err` is reserved
/// for runs that could not happen or did not finish.
pub trait Converter: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    fn run<'a>(&'a self, args: &'a [OsString]) -> BoxFuture<'a, Result<ConverterOutput, Md2EpubError>>;
}

/// Runs the pandoc executable as a child process.
#[derive(Debug, Clone)]
pub struct PandocConverter {
    program: PathBuf,
    timeout: Duration,
}

impl PandocConverter {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    async fn run_process(&self, args: &[OsString]) -> Result<ConverterOutput, Md2EpubError> {
        let child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Md2EpubError::ConverterUnavailable {
                program: self.program.display().to_string(),
                reason: e.to_string(),
            })?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(ConverterOutput {
                exit_code: output.status.code(),
                stdout: output.stdout,
                stderr: output.stderr,
            }),
            Ok(Err(e)) => Err(Md2EpubError::io("waiting for converter", e)),
            Err(_) => {
                warn!(
                    "Converter {} exceeded {}s, killing it",
                    self.program.display(),
                    self.timeout.as_secs()
                );
                Err(Md2EpubError::ConverterTimeout {
                    secs: self.timeout.as_secs(),
                })
            }
        }
    }
}

impl Converter for PandocConverter {
    fn name(&self) -> &str {
        "pandoc"
    }

    fn run<'a>(&'a self, args: &'a [OsString]) -> BoxFuture<'a, Result<ConverterOutput, Md2EpubError>> {
        Box::pin(self.run_process(args))
    }
}

/// Pick the converter for a config: the injected one, else pandoc on `pandoc_path`.
pub fn resolve_converter(config: &ServiceConfig) -> Arc<dyn Converter> {
    match config.converter {
        Some(ref converter) => Arc::clone(converter),
        None => Arc::new(PandocConverter::new(
            config.pandoc_path.clone(),
            config.converter_timeout(),
        )),
    }
}

/// Argument list for converting the working area's Markdown into an EPUB.
///
/// Layout: source, `-o` destination, `-f`/`-t` formats, metadata file, then
/// the fixed formatting flags (table of contents down to `toc_depth`, no
/// wrapping, tabs preserved, no heading shift).
pub fn conversion_args(area: &WorkingArea, toc_depth: u8) -> Vec<OsString> {
    let mut metadata_arg = OsString::from("--metadata-file=");
    metadata_arg.push(area.metadata_path());

    vec![
        area.input_path().into_os_string(),
        "-o".into(),
        area.output_path().into_os_string(),
        "-f".into(),
        SOURCE_FORMAT.into(),
        "-t".into(),
        TARGET_FORMAT.into(),
        metadata_arg,
        "--toc".into(),
        format!("--toc-depth={toc_depth}").into(),
        "--wrap=none".into(),
        "--preserve-tabs".into(),
        "--shift-heading-level-by=0".into(),
    ]
}

/// Argument list for reading an EPUB back as plain text, title block included.
pub fn inspection_args(epub: &Path) -> Vec<OsString> {
    vec![
        epub.as_os_str().to_os_string(),
        "-f".into(),
        "epub".into(),
        "-t".into(),
        "plain".into(),
        "--standalone".into(),
        "--wrap=none".into(),
    ]
}

/// Run the conversion and map a non-zero exit onto [`Md2EpubError::ConverterFailed`].
///
/// Returns the converter's wall-clock duration on success.
pub async fn run_conversion(
    converter: &dyn Converter,
    area: &WorkingArea,
    toc_depth: u8,
) -> Result<Duration, Md2EpubError> {
    let args = conversion_args(area, toc_depth);
    debug!("Invoking {} with {} arguments", converter.name(), args.len());

    let start = Instant::now();
    let output = converter.run(&args).await?;
    let elapsed = start.elapsed();

    if !output.success() {
        let stderr = output.stderr_lossy();
        let stderr = stderr.trim();
        let detail = if stderr.is_empty() {
            match output.exit_code {
                Some(code) => format!("converter exited with status {code}"),
                None => "converter was terminated by a signal".to_string(),
            }
        } else {
            stderr.to_string()
        };
        warn!(
            "{} failed after {}ms (exit {:?}): {}",
            converter.name(),
            elapsed.as_millis(),
            output.exit_code,
            detail
        );
        return Err(Md2EpubError::ConverterFailed {
            code: output.exit_code,
            detail,
        });
    }

    if !output.stderr.is_empty() {
        debug!("{} warnings: {}", converter.name(), output.stderr_lossy().trim());
    }
    debug!("{} finished in {}ms", converter.name(), elapsed.as_millis());
    Ok(elapsed)
}
