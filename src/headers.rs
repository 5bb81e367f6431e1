//! Case-normalized header map with a reserved-prefix check at ingress.

use indexmap::IndexMap;

/// Keys beginning with these prefixes are reserved for framework use and
/// must be rejected from user input at ingress.
const RESERVED_PREFIXES: &[&str] = &["_", "$rpc$-", "rpc-"];

/// A string -> string map, case-insensitive on comparison but preserving
/// the original case of the first insert for transports that need it on
/// the wire. Duplicate inserts replace rather than accumulate.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    // keyed by lower-cased header name; value is (original-case name, value)
    entries: IndexMap<String, (String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Headers {
            entries: IndexMap::new(),
        }
    }

    /// Returns `true` if `key` is reserved for framework use and must not
    /// be set by user code.
    pub fn is_reserved(key: &str) -> bool {
        let lower = key.to_ascii_lowercase();
        RESERVED_PREFIXES.iter().any(|p| lower.starts_with(p))
    }

    /// Insert a header, replacing any existing value under the
    /// case-insensitive key. Returns an error if `key` is reserved.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> crate::Result<()> {
        let key = key.into();
        if Self::is_reserved(&key) {
            return Err(crate::Error::invalid_argument(format!(
                "header key {:?} is reserved for framework use",
                key
            )));
        }
        self.insert_unchecked(key, value);
        Ok(())
    }

    /// Insert without the reserved-key check; used internally by
    /// transports to set framework headers.
    pub(crate) fn insert_unchecked(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let lower = key.to_ascii_lowercase();
        self.entries.insert(lower, (key, value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_ascii_lowercase())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries
            .shift_remove(&key.to_ascii_lowercase())
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in insertion order, yielding the original-case key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.values().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for Headers {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert_unchecked(k, v);
        }
        headers
    }
}
