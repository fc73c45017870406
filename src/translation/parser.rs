//! Lenient parser for numbered-list model output.
//!
//! The model is asked to answer with one `"<n>. <text>"` line per source
//! string. Anything that does not fit the pattern is dropped, not retried;
//! the result records which positions were recovered so the caller can
//! re-run only what is missing.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;

static NUMBERED_LINE_REGEX: OnceLock<Regex> = OnceLock::new();

/// Positions recovered from one response. Keys are zero-based positions in
/// the batch that was sent (the prompt numbers them from 1).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedList {
    pub items: BTreeMap<usize, String>,
    /// Zero-based positions with no usable line.
    pub missing: Vec<usize>,
    /// Non-blank lines that were ignored (wrong shape, out of range, duplicate).
    pub dropped_lines: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("model response was empty")]
    Empty,

    #[error("model response contained no numbered lines ({dropped_lines} lines ignored)")]
    NoNumberedLines { dropped_lines: usize },
}

/// Parse a numbered list expected to hold `expected` items.
pub fn parse_numbered_list(text: &str, expected: usize) -> Result<ParsedList, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let regex = NUMBERED_LINE_REGEX
        .get_or_init(|| Regex::new(r"^\s*(\d+)\s*[.)]\s*(.*?)\s*$").expect("static numbered-line pattern"));

    let mut items = BTreeMap::new();
    let mut dropped_lines = 0;

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let Some(caps) = regex.captures(line) else {
            dropped_lines += 1;
            continue;
        };

        let position = caps
            .get(1)
            .and_then(|m| m.as_str().parse::<usize>().ok())
            .filter(|n| (1..=expected).contains(n))
            .map(|n| n - 1);
        let value = caps.get(2).map(|m| clean_value(m.as_str())).unwrap_or_default();

        match position {
            Some(index) if !value.is_empty() && !items.contains_key(&index) => {
                items.insert(index, value);
            }
            _ => dropped_lines += 1,
        }
    }

    if items.is_empty() {
        return Err(ParseError::NoNumberedLines { dropped_lines });
    }

    let missing = (0..expected).filter(|i| !items.contains_key(i)).collect();
    Ok(ParsedList {
        items,
        missing,
        dropped_lines,
    })
}

/// Escape a source string so it occupies exactly one prompt line.
pub fn escape_line(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', "\\n")
}

/// Undo [`escape_line`] and strip quotes the model sometimes wraps around
/// an answer.
fn clean_value(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = if trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('“') && trimmed.ends_with('”')))
    {
        let first = trimmed.chars().next().map_or(0, char::len_utf8);
        let last = trimmed.chars().last().map_or(0, char::len_utf8);
        &trimmed[first..trimmed.len() - last]
    } else {
        trimmed
    };
    unquoted.replace("\\n", "\n")
}
