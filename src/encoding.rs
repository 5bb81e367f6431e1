//! Opaque, canonical encoding tags.
//!
//! The router treats these as opaque; only handlers interpret the body
//! bytes. Interned as a small `Encoding` newtype over a static str so
//! comparisons are cheap and the canonical tags are self-documenting,
//! while still allowing transport-defined extensions via `Encoding::new`.

use std::borrow::Cow;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Encoding(Cow<'static, str>);

impl Encoding {
    pub const RAW: Encoding = Encoding(Cow::Borrowed("raw"));
    pub const JSON: Encoding = Encoding(Cow::Borrowed("json"));
    pub const PROTO: Encoding = Encoding(Cow::Borrowed("proto"));
    pub const THRIFT: Encoding = Encoding(Cow::Borrowed("thrift"));

    /// Register a transport-defined extension tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Encoding(Cow::Owned(tag.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Encoding {
    fn from(s: &str) -> Self {
        match s {
            "raw" => Encoding::RAW,
            "json" => Encoding::JSON,
            "proto" => Encoding::PROTO,
            "thrift" => Encoding::THRIFT,
            other => Encoding::new(other.to_string()),
        }
    }
}
