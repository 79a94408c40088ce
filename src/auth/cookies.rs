//! Session-seed cookie parsing and reassembly.
//!
//! The backend issues the session seed as a raw `Set-Cookie`-style header
//! string (`name1=value1; name2=value2; ...`). This module parses that string
//! into a key/value mapping and renders it back into a `Cookie` request
//! header. Parsing is total: any input string, however malformed, produces a
//! mapping rather than an error.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A parsed session-seed cookie: a mapping from cookie name to value.
///
/// Values are opaque and sensitive. The `Debug` impl redacts them to prevent
/// accidental logging of session material.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeedCookie {
    // A segment without `=` is kept as a key with no value (`None`).
    entries: BTreeMap<String, Option<String>>,
}

impl SeedCookie {
    /// Parses a raw cookie header string into a mapping.
    ///
    /// Segments are split on `"; "`, each segment on the first `"="`. Later
    /// duplicates overwrite earlier ones. A segment without `"="` yields a
    /// key with an absent value. The empty string yields an empty mapping.
    /// This function never fails; malformed segments simply produce
    /// nonsensical but harmless entries.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let mut entries = BTreeMap::new();
        if input.is_empty() {
            return Self { entries };
        }

        for segment in input.split("; ") {
            match segment.split_once('=') {
                Some((name, value)) => {
                    entries.insert(name.to_string(), Some(value.to_string()));
                }
                None => {
                    entries.insert(segment.to_string(), None);
                }
            }
        }

        Self { entries }
    }

    /// Returns the value for a cookie name, if present with a value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).and_then(Option::as_deref)
    }

    /// Returns true when the mapping holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of entries in the mapping.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Renders the mapping as a `Cookie` request header value.
    ///
    /// Entries with a value render as `name=value`; entries without one
    /// render as the bare name. Entries are joined with `"; "`.
    #[must_use]
    pub fn header_value(&self) -> String {
        self.entries
            .iter()
            .map(|(name, value)| match value {
                Some(value) => format!("{name}={value}"),
                None => name.clone(),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// Custom Debug impl that redacts cookie values.
impl fmt::Debug for SeedCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in &self.entries {
            match value {
                Some(_) => map.entry(name, &"[REDACTED]"),
                None => map.entry(name, &Option::<&str>::None),
            };
        }
        map.finish()
    }
}
