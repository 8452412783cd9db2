//! # md2epub
//!
//! Convert Markdown documents into EPUB e-books with pandoc, as a library or
//! as a small authenticated HTTP service.
//!
//! ## Pipeline Overview
//!
//! ```text
//! JSON body / ConversionRequest
//!  │
//!  ├─ 1. Validate   `markdown` required, title/author fall back to defaults
//!  ├─ 2. Normalise  escaped newlines, line endings, glued headings and lists
//!  ├─ 3. Metadata   escaped YAML document (title, author, date, lang, …)
//!  ├─ 4. Convert    pandoc → EPUB 3 in a per-request temp dir, with timeout
//!  ├─ 5. Verify     exists, non-empty, readable ZIP; title/author look-up
//!  └─ 6. Output     EPUB bytes in memory + ConversionStats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use md2epub::{convert, ConversionRequest, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::default();
//!     let request = ConversionRequest::new("# Hello\nWorld")
//!         .with_title("Greetings")
//!         .with_author("Jane Doe");
//!     let book = convert(&request, &config).await?;
//!     std::fs::write("book.epub", &book.bytes)?;
//!     eprintln!("{} bytes, {} entries", book.len(), book.stats.archive_entries);
//!     Ok(())
//! }
//! ```
//!
//! ## Serving over HTTP
//!
//! ```rust,no_run
//! use md2epub::{server, ServiceConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServiceConfig::builder().auth_token("s3cret").build()?;
//! server::serve(config).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `md2epub` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when embedding only the library or the router:
//! ```toml
//! md2epub = { version = "0.3", default-features = false }
//! ```
//!
//! ## Requirements
//!
//! pandoc must be installed and on `PATH` (or configured with
//! [`ServiceConfigBuilder::pandoc_path`]). Any pandoc-compatible program can
//! be plugged in through the [`Converter`] trait.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod request;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{MetadataDefaults, ServiceConfig, ServiceConfigBuilder, WhitespacePolicy};
pub use convert::{convert, convert_json, convert_sync, convert_to_file, Stage};
pub use error::{ErrorKind, Md2EpubError};
pub use output::{ConversionStats, EpubArtifact, MetadataCheck, EPUB_MIME_TYPE};
pub use pipeline::invoke::{Converter, ConverterOutput, PandocConverter};
pub use request::ConversionRequest;
