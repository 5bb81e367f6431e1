//! Immutable open-time and first-response-frame metadata carried on a
//! [`super::ClientStream`] / [`super::ServerStream`].

use crate::encoding::Encoding;
use crate::headers::Headers;

/// Metadata fixed at the moment a stream is opened; never mutated for
/// the lifetime of the stream.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub caller: String,
    pub callee: String,
    pub procedure: String,
    pub encoding: Encoding,
    pub headers: Headers,
}

/// Metadata available on the client side once the server's first frame
/// has arrived.
#[derive(Debug, Clone, Default)]
pub struct ResponseMeta {
    pub headers: Headers,
}
