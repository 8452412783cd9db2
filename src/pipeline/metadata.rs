//! Metadata document: title, author and service defaults as a pandoc YAML block.
//!
//! pandoc reads book metadata from a YAML file passed with
//! `--metadata-file`. Title and author come straight from the request body,
//! so every value is written as a YAML double-quoted scalar with the
//! characters that could end the scalar (or the line it sits on) escaped.
//! The escaping is total: there is no input for which it fails, and no
//! value can add a key or close the block early.
//!
//! ```text
//! ---
//! title: "A \"quoted\" title: part 1"
//! author: "Jane Doe"
//! lang: "en-US"
//! ...
//! ```

use crate::config::{MetadataDefaults, WhitespacePolicy};
use std::fmt::Write as _;

/// Opening marker of the YAML block.
pub const DOCUMENT_START: &str = "---";

/// Closing marker of the YAML block.
pub const DOCUMENT_END: &str = "...";

/// The metadata fields written for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataFields {
    pub title: String,
    pub author: String,
    pub date: String,
    pub language: String,
    pub rights: String,
    pub publisher: String,
}

impl MetadataFields {
    /// Combine request values with the process-wide defaults.
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        defaults: &MetadataDefaults,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            date: defaults.date.clone(),
            language: defaults.language.clone(),
            rights: defaults.rights.clone(),
            publisher: defaults.publisher.clone(),
        }
    }

    /// `(key, value)` pairs in document order, using pandoc's key names.
    fn entries(&self) -> [(&'static str, &str); 6] {
        [
            ("title", &self.title),
            ("author", &self.author),
            ("date", &self.date),
            ("lang", &self.language),
            ("rights", &self.rights),
            ("publisher", &self.publisher),
        ]
    }
}

/// Render the YAML metadata document.
///
/// Title and author are always written, even when empty; the other fields
/// are skipped when empty so pandoc falls back to its own defaults.
pub fn build_metadata_document(fields: &MetadataFields, policy: WhitespacePolicy) -> String {
    let mut doc = String::with_capacity(128 + fields.title.len() + fields.author.len());
    doc.push_str(DOCUMENT_START);
    doc.push('\n');

    for (key, value) in fields.entries() {
        let always = key == "title" || key == "author";
        if !always && value.is_empty() {
            continue;
        }
        doc.push_str(key);
        doc.push_str(": \"");
        doc.push_str(&escape_yaml_value(value, policy));
        doc.push_str("\"\n");
    }

    doc.push_str(DOCUMENT_END);
    doc.push('\n');
    doc
}

/// Escape `value` for use between the quotes of a YAML double-quoted scalar.
///
/// - `"` and `\` are backslash-escaped
/// - newlines, carriage returns (CRLF counts once) and tabs become one space
///   under [`WhitespacePolicy::Flatten`], or `\n` / `\r` / `\t` under
///   [`WhitespacePolicy::Preserve`]
/// - other control characters, U+2028, U+2029 and U+FEFF become `\uXXXX`
/// - everything else, including `:`, `#`, `{`, `[`, `'` and `|`, is literal;
///   inside double quotes these carry no meaning
pub fn escape_yaml_value(value: &str, policy: WhitespacePolicy) -> String {
    let mut out = String::with_capacity(value.len() + 8);
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\r' | '\n' | '\t' if policy == WhitespacePolicy::Flatten => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push(' ');
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() || matches!(c, '\u{2028}' | '\u{2029}' | '\u{FEFF}') => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }

    out
}
