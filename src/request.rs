//! Conversion requests and their validation.
//!
//! The JSON body is parsed leniently: only `markdown` is required, and
//! `title`/`author` of the wrong type fall back to their defaults instead of
//! failing the request.

use crate::error::Md2EpubError;
use serde::Serialize;
use serde_json::Value;

/// Title used when the request has none (or a non-string one).
pub const DEFAULT_TITLE: &str = "Untitled";

/// Author used when the request has none (or a non-string one).
pub const DEFAULT_AUTHOR: &str = "Unknown Author";

/// A validated request to convert Markdown into an EPUB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionRequest {
    /// Markdown source. May be empty or whitespace-only.
    pub markdown: String,
    pub title: String,
    pub author: String,
}

impl ConversionRequest {
    /// Request with default title and author.
    pub fn new(markdown: impl Into<String>) -> Self {
        Self {
            markdown: markdown.into(),
            title: DEFAULT_TITLE.to_string(),
            author: DEFAULT_AUTHOR.to_string(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Parse a raw request body.
    ///
    /// A body that is empty, not JSON, or not a JSON object is treated as a
    /// request without `markdown`.
    pub fn from_json_slice(body: &[u8]) -> Result<Self, Md2EpubError> {
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => Self::from_value(&value),
            Err(_) => Err(Md2EpubError::MissingField { field: "markdown" }),
        }
    }

    /// Validate an already-parsed JSON value.
    pub fn from_value(value: &Value) -> Result<Self, Md2EpubError> {
        let Some(object) = value.as_object() else {
            return Err(Md2EpubError::MissingField { field: "markdown" });
        };

        let markdown = match object.get("markdown") {
            None => return Err(Md2EpubError::MissingField { field: "markdown" }),
            Some(Value::String(s)) => s.clone(),
            Some(_) => {
                return Err(Md2EpubError::InvalidField {
                    field: "markdown",
                    expected: "a string",
                })
            }
        };

        Ok(Self {
            markdown,
            title: string_or(object.get("title"), DEFAULT_TITLE),
            author: string_or(object.get("author"), DEFAULT_AUTHOR),
        })
    }
}

fn string_or(value: Option<&Value>, default: &str) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        _ => default.to_string(),
    }
}
