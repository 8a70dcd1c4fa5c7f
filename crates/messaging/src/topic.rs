//! Topic canonicalization shared by the HTTP and MQTT adapters.
//!
//! Wire paths look like `/projects/<id>/messages[/<subtopic...>][?query]`.
//! The subtopic is unescaped, its separators normalized to `.`, empty
//! segments dropped and wildcard-bearing segments rejected, so that every
//! spelling of one destination yields the same canonical subtopic.

use std::sync::LazyLock;

use regex::Regex;

use conduit_core::{Error, Result};

/// Project IDs are restricted to ASCII word characters and `-`.
static TOPIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/?projects/([A-Za-z0-9_\-]+)/messages(/[^?]*)?(\?.*)?$")
        .unwrap_or_else(|e| panic!("topic grammar does not compile: {e}"))
});

const SEPARATOR: char = '.';
const SINGLE_LEVEL_WILDCARD: char = '*';
const MULTI_LEVEL_WILDCARD: char = '>';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub project_id: String,
    /// Canonical dot-separated path, empty when the topic has none.
    pub subtopic: String,
}

/// Parse an HTTP path or MQTT topic into its canonical form.
///
/// Fails with `MalformedData` when the string does not follow the grammar and
/// with `MalformedSubtopic` when the subtopic cannot be canonicalized.
pub fn parse_topic(path: &str) -> Result<Topic> {
    let caps = TOPIC_RE.captures(path).ok_or(Error::MalformedData)?;

    let project_id = caps
        .get(1)
        .map(|m| m.as_str().to_string())
        .ok_or(Error::MalformedData)?;
    let raw = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

    Ok(Topic {
        project_id,
        subtopic: parse_subtopic(raw)?,
    })
}

/// Canonicalize a raw subtopic.
///
/// Single-character wildcard segments pass through; only multi-character
/// segments containing a wildcard are rejected.
pub fn parse_subtopic(raw: &str) -> Result<String> {
    if raw.is_empty() {
        return Ok(String::new());
    }

    let unescaped = query_unescape(raw)?.replace('/', ".");

    let mut segments = Vec::new();
    for segment in unescaped.split(SEPARATOR).filter(|s| !s.is_empty()) {
        if segment.len() > 1
            && segment.contains([SINGLE_LEVEL_WILDCARD, MULTI_LEVEL_WILDCARD])
        {
            return Err(Error::MalformedSubtopic);
        }
        segments.push(segment);
    }

    Ok(segments.join("."))
}

/// Rebuild the wire-format topic for a project and canonical subtopic.
pub fn to_wire_topic(project_id: &str, subtopic: &str) -> String {
    if subtopic.is_empty() {
        format!("projects/{project_id}/messages")
    } else {
        format!("projects/{project_id}/messages/{}", subtopic.replace('.', "/"))
    }
}

/// Query-string unescaping: `+` is a space and every `%` must introduce two
/// hex digits.
fn query_unescape(raw: &str) -> Result<String> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return Err(Error::MalformedSubtopic);
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    urlencoding::decode(&raw.replace('+', " "))
        .map(|s| s.into_owned())
        .map_err(|_| Error::MalformedSubtopic)
}
