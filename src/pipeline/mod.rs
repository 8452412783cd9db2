//! Pipeline stages for Markdown-to-EPUB conversion.
//!
//! Each submodule implements exactly one step, and only [`invoke`] and
//! [`verify`] touch the external converter.
//!
//! ## Data Flow
//!
//! ```text
//! normalize ──▶ metadata ──▶ workspace ──▶ invoke ──▶ verify
//! (text)        (YAML)       (temp dir)    (pandoc)   (ZIP check)
//! ```
//!
//! 1. [`normalize`]: repair escaped newlines, line endings and glued
//!    block markers so pandoc sees the intended structure
//! 2. [`metadata`]: render title, author and defaults as an escaped YAML
//!    metadata document
//! 3. [`workspace`]: per-request temporary directory, removed on drop
//! 4. [`invoke`]: run the converter with a fixed argument list under a
//!    wall-clock timeout
//! 5. [`verify`]: confirm the output is a non-empty ZIP container and
//!    optionally look for the metadata in the rendered book

pub mod invoke;
pub mod metadata;
pub mod normalize;
pub mod verify;
pub mod workspace;
