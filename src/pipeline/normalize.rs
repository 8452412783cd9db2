//! Text normalisation: make loosely formatted Markdown parse the way it looks.
//!
//! Clients often send Markdown that renders fine in a chat window but not in
//! pandoc: newlines escaped as the two characters `\` `n` somewhere in
//! transport, Windows line endings, or headings and list items glued to the
//! preceding paragraph. pandoc's block parser then treats `# Title` or
//! `- item` as inline paragraph text.
//!
//! ## Rule Order
//!
//! Line endings are canonicalised first so the escaped-newline and
//! line-based rules only ever see `\n`. Blank-line insertion runs before the
//! collapse pass, which therefore also absorbs any surplus it creates.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all normalisation rules to raw request text.
///
/// Rules (applied in order):
/// 1. Canonicalise line endings (CRLF, lone CR → LF)
/// 2. Expand literal `\n` sequences into a real paragraph break
/// 3. Put a blank line before headings and list items that follow text
/// 4. Collapse runs of three or more blank lines to a single blank line
///
/// Empty and whitespace-only input is returned unchanged; pandoc still gets
/// invoked and produces a minimal book. The function is idempotent.
pub fn normalize_markdown(input: &str) -> String {
    if input.trim().is_empty() {
        return input.to_string();
    }

    let s = normalise_line_endings(input);
    let s = expand_escaped_newlines(&s);
    let s = separate_block_markers(&s);
    collapse_blank_lines(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Expand escaped newlines ──────────────────────────────────────────

fn expand_escaped_newlines(input: &str) -> String {
    input.replace("\\n", "\n\n")
}

// ── Rule 3: Blank line before headings and list items ────────────────────────

/// ATX heading (`#`..`######` then whitespace or end of line), bullet marker
/// (`-`, `*`, `+`) or ordered marker (`1.`, `1)`) after at most three spaces.
/// Four spaces of indentation make an indented code block, which is left alone.
static RE_BLOCK_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^ {0,3}(?:#{1,6}(?:[ \t]|$)|[-*+][ \t]|[0-9]{1,9}[.)][ \t])").unwrap()
});

static RE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ {0,3}(```|~~~)").unwrap());

fn separate_block_markers(input: &str) -> String {
    let mut out: Vec<&str> = Vec::with_capacity(input.len() / 16 + 1);
    let mut fence: Option<&str> = None;

    for line in input.split('\n') {
        if let Some(caps) = RE_FENCE.captures(line) {
            let marker = caps.get(1).map_or("", |m| m.as_str());
            match fence {
                None => fence = Some(marker),
                Some(open) if open == marker => fence = None,
                Some(_) => {}
            }
        } else if fence.is_none() && RE_BLOCK_MARKER.is_match(line) {
            if let Some(prev) = out.last() {
                if !is_blank(prev) {
                    out.push("");
                }
            }
        }
        out.push(line);
    }

    out.join("\n")
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

fn collapse_blank_lines(input: &str) -> String {
    let lines: Vec<&str> = input.split('\n').collect();
    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        if !is_blank(lines[i]) {
            out.push(lines[i]);
            i += 1;
            continue;
        }

        let run_end = lines[i..]
            .iter()
            .position(|l| !is_blank(l))
            .map_or(lines.len(), |offset| i + offset);

        if run_end - i >= 3 {
            out.push("");
        } else {
            out.extend_from_slice(&lines[i..run_end]);
        }
        i = run_end;
    }

    out.join("\n")
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

// ── Tests ────────────────────────────────────────────────────────────────────
