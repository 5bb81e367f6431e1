//! The single-consumer readable body shared by `Request` and `Response`.
//!
//! The core does not need chunked streaming here — that contract lives
//! in [`crate::stream`] for bidirectional streaming calls. A unary or
//! oneway body is a single opaque buffer that must be read exactly once;
//! a transport that needs to retry re-materializes the body itself
//! before resending.

use bytes::Bytes;

use crate::error::Error;

/// A readable-once byte body.
#[derive(Debug)]
pub struct Body {
    inner: Option<Bytes>,
}

impl Body {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Body {
            inner: Some(bytes.into()),
        }
    }

    pub fn empty() -> Self {
        Body {
            inner: Some(Bytes::new()),
        }
    }

    /// Consume the body, returning its bytes. Fails if the body has
    /// already been consumed — callers that need to read twice (e.g. a
    /// retrying outbound middleware) must materialize and clone before
    /// the first read.
    pub fn read_to_end(&mut self) -> crate::Result<Bytes> {
        self.inner
            .take()
            .ok_or_else(|| Error::internal("body already consumed"))
    }

    pub fn is_consumed(&self) -> bool {
        self.inner.is_none()
    }

    pub fn len(&self) -> usize {
        self.inner.as_ref().map(Bytes::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Clone for Body {
    /// Clones the *unconsumed* bytes if present; cloning a consumed body
    /// yields another consumed body. `Bytes` clones are cheap (refcounted),
    /// which is what lets an outbound middleware snapshot a body before
    /// the first send for retry purposes.
    fn clone(&self) -> Self {
        Body {
            inner: self.inner.clone(),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(v: Vec<u8>) -> Self {
        Body::new(v)
    }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Self {
        Body::new(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_to_end_consumes_once() {
        let mut body = Body::new(&b"hello"[..]);
        assert_eq!(body.read_to_end().unwrap(), Bytes::from_static(b"hello"));
        assert!(body.read_to_end().is_err());
    }

    #[test]
    fn empty_body_roundtrips() {
        let mut body = Body::empty();
        assert_eq!(body.read_to_end().unwrap().len(), 0);
    }
}
