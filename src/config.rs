//! Configuration types for the Markdown-to-EPUB service.
//!
//! All process-wide settings live in one [`ServiceConfig`], built once at
//! startup via [`ServiceConfigBuilder`] and shared read-only (behind an
//! `Arc`) by every request. Nothing in the pipeline reads the environment
//! directly; the binary maps environment variables onto the builder.

use crate::error::Md2EpubError;
use crate::pipeline::invoke::Converter;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default wall-clock bound for a single converter run.
pub const DEFAULT_CONVERTER_TIMEOUT_SECS: u64 = 120;

/// Default request body limit (10 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Service configuration.
///
/// Built via [`ServiceConfig::builder()`] or using
/// [`ServiceConfig::default()`].
///
/// # Example
/// ```rust
/// use md2epub::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .port(8088)
///     .auth_token("s3cret")
///     .toc_depth(2)
///     .build()
///     .unwrap();
/// assert!(config.auth_required());
/// ```
#[derive(Clone)]
pub struct ServiceConfig {
    /// Listen address. Default: `0.0.0.0`.
    pub host: String,

    /// Listen port. Default: 5000.
    pub port: u16,

    /// Debug mode: raises the default log level to `debug`. Default: false.
    pub debug: bool,

    /// Shared secret for `POST /convert`. `None` disables authentication.
    pub auth_token: Option<String>,

    /// Metadata values injected into every book besides title and author.
    pub metadata: MetadataDefaults,

    /// How line breaks and tabs inside metadata values are written.
    pub whitespace: WhitespacePolicy,

    /// Path or name of the pandoc executable. Default: `pandoc`.
    pub pandoc_path: PathBuf,

    /// Wall-clock bound for each converter run, in seconds. Default: 120.
    ///
    /// A hung converter would otherwise hold its request forever; on expiry
    /// the child process is killed and the request fails.
    pub converter_timeout_secs: u64,

    /// Deepest heading level listed in the table of contents (1–6). Default: 3.
    pub toc_depth: u8,

    /// Re-read the produced book and look for title and author. Default: true.
    ///
    /// The check is advisory: a miss is logged, never returned as an error.
    pub verify_metadata: bool,

    /// Directory holding `index.html` and `openapi.yaml`. Default: `static`.
    pub static_dir: PathBuf,

    /// Largest accepted request body in bytes. Default: 10 MiB.
    pub max_body_bytes: usize,

    /// Pre-constructed converter. Takes precedence over `pandoc_path`.
    pub converter: Option<Arc<dyn Converter>>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            debug: false,
            auth_token: None,
            metadata: MetadataDefaults::default(),
            whitespace: WhitespacePolicy::default(),
            pandoc_path: PathBuf::from("pandoc"),
            converter_timeout_secs: DEFAULT_CONVERTER_TIMEOUT_SECS,
            toc_depth: 3,
            verify_metadata: true,
            static_dir: PathBuf::from("static"),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            converter: None,
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("debug", &self.debug)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("metadata", &self.metadata)
            .field("whitespace", &self.whitespace)
            .field("pandoc_path", &self.pandoc_path)
            .field("converter_timeout_secs", &self.converter_timeout_secs)
            .field("toc_depth", &self.toc_depth)
            .field("verify_metadata", &self.verify_metadata)
            .field("static_dir", &self.static_dir)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("converter", &self.converter.as_ref().map(|c| c.name().to_string()))
            .finish()
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }

    /// `true` when a shared secret is configured.
    pub fn auth_required(&self) -> bool {
        self.auth_token.is_some()
    }

    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The converter timeout as a [`Duration`].
    pub fn converter_timeout(&self) -> Duration {
        Duration::from_secs(self.converter_timeout_secs)
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn debug(mut self, v: bool) -> Self {
        self.config.debug = v;
        self
    }

    /// Set the shared secret. An empty string disables authentication.
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.config.auth_token = if token.is_empty() { None } else { Some(token) };
        self
    }

    pub fn metadata(mut self, defaults: MetadataDefaults) -> Self {
        self.config.metadata = defaults;
        self
    }

    pub fn whitespace(mut self, policy: WhitespacePolicy) -> Self {
        self.config.whitespace = policy;
        self
    }

    pub fn pandoc_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pandoc_path = path.into();
        self
    }

    pub fn converter_timeout_secs(mut self, secs: u64) -> Self {
        self.config.converter_timeout_secs = secs.max(1);
        self
    }

    pub fn toc_depth(mut self, depth: u8) -> Self {
        self.config.toc_depth = depth.clamp(1, 6);
        self
    }

    pub fn verify_metadata(mut self, v: bool) -> Self {
        self.config.verify_metadata = v;
        self
    }

    pub fn static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.static_dir = dir.into();
        self
    }

    pub fn max_body_bytes(mut self, n: usize) -> Self {
        self.config.max_body_bytes = n;
        self
    }

    pub fn converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.config.converter = Some(converter);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, Md2EpubError> {
        let c = &self.config;
        if c.host.trim().is_empty() {
            return Err(Md2EpubError::InvalidConfig("host must not be empty".into()));
        }
        if !(1..=6).contains(&c.toc_depth) {
            return Err(Md2EpubError::InvalidConfig(format!(
                "TOC depth must be 1–6, got {}",
                c.toc_depth
            )));
        }
        if c.converter_timeout_secs == 0 {
            return Err(Md2EpubError::InvalidConfig(
                "Converter timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_body_bytes == 0 {
            return Err(Md2EpubError::InvalidConfig(
                "Maximum body size must be > 0".into(),
            ));
        }
        if c.pandoc_path.as_os_str().is_empty() && c.converter.is_none() {
            return Err(Md2EpubError::InvalidConfig(
                "pandoc path must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Metadata defaults ────────────────────────────────────────────────────

/// Process-wide metadata values, constant for the lifetime of the service.
///
/// Empty values are left out of the metadata document entirely so pandoc
/// applies its own defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataDefaults {
    /// Publication date, written verbatim (e.g. `2024-05-01`).
    pub date: String,
    /// BCP 47 language tag. Default: `en-US`.
    pub language: String,
    /// Copyright statement.
    pub rights: String,
    /// Publisher name.
    pub publisher: String,
}

impl Default for MetadataDefaults {
    fn default() -> Self {
        Self {
            date: String::new(),
            language: "en-US".to_string(),
            rights: String::new(),
            publisher: String::new(),
        }
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How embedded line breaks and tabs in metadata values are written.
///
/// Each metadata field occupies exactly one line of the document either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WhitespacePolicy {
    /// Replace each newline, carriage return, CRLF pair or tab with one space. (default)
    #[default]
    Flatten,
    /// Keep them, written as the YAML escapes `\n`, `\r` and `\t`.
    Preserve,
}
