//! Tokenizer for BrainVoyager text headers.
//!
//! Text formats (FMR, DMR, VOI, POI, PRT, SDM, ROI, TRF, FBR) share one
//! grammar: `Key: value` lines, blank lines between sections, double-quoted
//! string values and space-separated numeric lists. The desktop application
//! added optional keys over the years, so parsing is permissive: callers
//! skip keys they do not recognize instead of erroring.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// A text header file, loaded once and indexed by line.
///
/// Continuation values (transformation matrices, gradient tables, slice
/// timing tables) live on the lines following their announcing key, so the
/// document keeps every non-empty line in order and lets parsers look ahead.
#[derive(Debug, Clone)]
pub struct TextDocument {
    lines: Vec<String>,
}

impl TextDocument {
    /// Load a document, keeping only non-empty trimmed lines.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(Self::from_str_content(&raw))
    }

    pub fn from_str_content(content: &str) -> Self {
        let lines = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(ToOwned::to_owned)
            .collect();
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, index: usize) -> Result<&str> {
        self.lines
            .get(index)
            .map(String::as_str)
            .ok_or(Error::TruncatedInput)
    }
}

/// Split a `Key: value` line on the first colon. Returns `None` for lines
/// without a colon (continuation rows, bare coordinate lines).
pub fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    Some((key.trim(), value.trim()))
}

/// Strip one pair of surrounding double quotes, if present.
pub fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

pub fn parse_int(token: &str) -> Result<i64> {
    token
        .trim()
        .parse::<i64>()
        .map_err(|_| Error::Decode(format!("malformed integer token '{token}'")))
}

pub fn parse_f32(token: &str) -> Result<f32> {
    token
        .trim()
        .parse::<f32>()
        .map_err(|_| Error::Decode(format!("malformed float token '{token}'")))
}

pub fn parse_f64(token: &str) -> Result<f64> {
    token
        .trim()
        .parse::<f64>()
        .map_err(|_| Error::Decode(format!("malformed float token '{token}'")))
}

/// Parse a whitespace-separated integer list (colors, voxel coordinates).
pub fn parse_int_list(value: &str) -> Result<Vec<i64>> {
    value.split_whitespace().map(parse_int).collect()
}

/// Parse a whitespace-separated float list (matrix rows, gradient rows).
pub fn parse_f32_list(value: &str) -> Result<Vec<f32>> {
    value.split_whitespace().map(parse_f32).collect()
}

/// True when the line starts with a numeric token, i.e. it is a data row
/// (coordinate triplet, matrix row) rather than a `Key: value` entry.
pub fn is_numeric_row(line: &str) -> bool {
    line.split_whitespace().next().is_some_and(|tok| {
        let tok = tok.strip_prefix('-').unwrap_or(tok);
        !tok.is_empty() && tok.chars().all(|c| c.is_ascii_digit() || c == '.')
    })
}
