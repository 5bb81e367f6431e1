//! A single message on a bidirectional stream.

use bytes::Bytes;

/// One frame sent or received on a [`super::ClientStream`] /
/// [`super::ServerStream`]. Unlike [`crate::Body`], a `StreamMessage` is
/// not itself forward-only — it is a complete, already-materialized
/// chunk; forward-only delivery is a property of the stream as a whole
/// (one message at a time, in send order), not of an individual message.
#[derive(Debug, Clone)]
pub struct StreamMessage {
    body: Bytes,
}

impl StreamMessage {
    pub fn new(body: impl Into<Bytes>) -> Self {
        StreamMessage { body: body.into() }
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }
}

impl From<&'static [u8]> for StreamMessage {
    fn from(b: &'static [u8]) -> Self {
        StreamMessage::new(b)
    }
}

impl From<Vec<u8>> for StreamMessage {
    fn from(b: Vec<u8>) -> Self {
        StreamMessage::new(b)
    }
}

impl From<&str> for StreamMessage {
    fn from(s: &str) -> Self {
        StreamMessage::new(Bytes::copy_from_slice(s.as_bytes()))
    }
}
