//! Artifact parsing from raw backend output.
//!
//! The backend is asked to answer in the form:
//!
//! ```text
//! FILE_PATH: the/suggested/path.ext
//! ---CONTENT---
//! <body>
//! ```
//!
//! Neither marker is guaranteed. A response without them is treated as
//! content with no known path; parsing never fails.

use regex::Regex;
use std::sync::LazyLock;

/// Separator between the header and the body.
pub const CONTENT_SEPARATOR: &str = "---CONTENT---";

static FILE_PATH_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"FILE_PATH:[ \t]*([^\r\n]*)").unwrap());

/// A declared path and body extracted from one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArtifact {
    pub path: Option<String>,
    pub content: String,
}

impl ParsedArtifact {
    /// Content as written to disk: a single line break directly after the
    /// separator belongs to the marker line, not to the body.
    pub fn body(&self) -> &str {
        self.content
            .strip_prefix("\r\n")
            .or_else(|| self.content.strip_prefix('\n'))
            .unwrap_or(&self.content)
    }
}

/// Parse a raw backend response into a declared path and content.
///
/// - `path` is the trimmed remainder of the first `FILE_PATH:` line, or
///   `None` when there is no such line or it is blank.
/// - `content` is everything after the first `---CONTENT---`, or the whole
///   input when the separator is absent.
pub fn parse(raw: &str) -> ParsedArtifact {
    ParsedArtifact {
        path: extract_path(raw),
        content: extract_content(raw).to_string(),
    }
}

pub fn extract_path(raw: &str) -> Option<String> {
    FILE_PATH_REGEX
        .captures(raw)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim())
        .filter(|path| !path.is_empty())
        .map(str::to_string)
}

pub fn extract_content(raw: &str) -> &str {
    match raw.split_once(CONTENT_SEPARATOR) {
        Some((_, content)) => content,
        None => raw,
    }
}
