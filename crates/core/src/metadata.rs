//! Free-form metadata attached to things and projects.

use serde_json::{Map, Value};

/// Arbitrary JSON object describing a thing or project.
pub type Metadata = Map<String, Value>;

/// Whether `haystack` contains every entry of `needle`.
///
/// Nested objects are compared recursively; any other value must be equal.
/// An empty `needle` is contained in everything.
pub fn contains(haystack: &Metadata, needle: &Metadata) -> bool {
    needle.iter().all(|(k, want)| match haystack.get(k) {
        Some(Value::Object(have)) => match want {
            Value::Object(want) => contains(have, want),
            _ => false,
        },
        Some(have) => have == want,
        None => false,
    })
}
