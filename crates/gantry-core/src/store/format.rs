//! Flat `key = value` record codec.
//!
//! Two variants cover the two on-disk formats the core deals with:
//!
//! - the *escaped* variant used for job records, where every value is quoted
//!   and escaped so arbitrary content round-trips byte-for-byte through
//!   parse → format → parse;
//! - the *plain* variant used for worker-written report files, which is
//!   lenient (unknown line shapes are skipped) and leaves values verbatim.
//!
//! Keys are plain tokens: they must not contain `=` or leading/trailing
//! whitespace, which every producer in this system honours.

use thiserror::Error;

/// A malformed record line.
#[derive(Debug, Error)]
#[error("line {line}: {reason}")]
pub struct FormatError {
    pub line: usize,
    pub reason: String,
}

/// Render key/value pairs as escaped record lines.
pub fn format_escaped<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut out = String::new();
    for (key, value) in pairs {
        out.push_str(key);
        out.push_str(" = ");
        out.push_str(&escape(value));
        out.push('\n');
    }
    out
}

/// Parse escaped record lines, rejecting anything malformed.
pub fn parse_escaped(input: &str) -> Result<Vec<(String, String)>, FormatError> {
    let mut pairs = Vec::new();
    for (idx, raw) in input.lines().enumerate() {
        let line = idx + 1;
        if raw.trim().is_empty() {
            continue;
        }
        let Some((key, value)) = raw.split_once('=') else {
            return Err(FormatError {
                line,
                reason: "missing '=' separator".to_string(),
            });
        };
        let value = value.trim();
        let value = if value.starts_with('"') {
            unescape(value, line)?
        } else {
            value.to_string()
        };
        pairs.push((key.trim().to_string(), value));
    }
    Ok(pairs)
}

/// Parse plain record lines; blank lines and lines without `=` are skipped,
/// values are kept verbatim apart from surrounding whitespace.
pub fn parse_plain(input: &str) -> Vec<(String, String)> {
    input
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn unescape(quoted: &str, line: usize) -> Result<String, FormatError> {
    let inner = quoted
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .ok_or_else(|| FormatError {
            line,
            reason: "unterminated quoted value".to_string(),
        })?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            other => {
                return Err(FormatError {
                    line,
                    reason: format!("invalid escape sequence '\\{}'", other.unwrap_or(' ')),
                });
            }
        }
    }
    Ok(out)
}
