//! The in-memory request abstraction every transport adapts to.

use crate::body::Body;
use crate::encoding::Encoding;
use crate::headers::Headers;

/// An inbound or outbound unary/oneway/stream-open request.
///
/// `Request` is immutable by convention: middleware that needs to
/// "transform" one constructs a new value via [`Request::builder`] rather
/// than mutating in place.
#[derive(Debug)]
pub struct Request {
    caller: String,
    callee: String,
    procedure: String,
    encoding: Encoding,
    headers: Headers,
    body: Body,
    routing_key: Option<String>,
    shard_key: Option<String>,
    routing_delegate: Option<String>,
    caller_procedure: String,
}

/// Builder for [`Request`].
#[derive(Debug, Default)]
pub struct Builder {
    caller: String,
    callee: String,
    procedure: String,
    encoding: Option<Encoding>,
    headers: Headers,
    routing_key: Option<String>,
    shard_key: Option<String>,
    routing_delegate: Option<String>,
    caller_procedure: String,
}

impl Request {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn caller(&self) -> &str {
        &self.caller
    }

    pub fn callee(&self) -> &str {
        &self.callee
    }

    pub fn procedure(&self) -> &str {
        &self.procedure
    }

    pub fn encoding(&self) -> &Encoding {
        &self.encoding
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    pub fn routing_key(&self) -> Option<&str> {
        self.routing_key.as_deref()
    }

    pub fn shard_key(&self) -> Option<&str> {
        self.shard_key.as_deref()
    }

    pub fn routing_delegate(&self) -> Option<&str> {
        self.routing_delegate.as_deref()
    }

    /// Provenance tag: the procedure that issued this request as an
    /// outbound call, if known. Defaults to empty.
    pub fn caller_procedure(&self) -> &str {
        &self.caller_procedure
    }
}

impl Builder {
    pub fn caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = caller.into();
        self
    }

    pub fn callee(mut self, callee: impl Into<String>) -> Self {
        self.callee = callee.into();
        self
    }

    pub fn procedure(mut self, procedure: impl Into<String>) -> Self {
        self.procedure = procedure.into();
        self
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> crate::Result<Self> {
        self.headers.insert(key, value)?;
        Ok(self)
    }

    pub fn routing_key(mut self, key: impl Into<String>) -> Self {
        self.routing_key = Some(key.into());
        self
    }

    pub fn shard_key(mut self, key: impl Into<String>) -> Self {
        self.shard_key = Some(key.into());
        self
    }

    pub fn routing_delegate(mut self, delegate: impl Into<String>) -> Self {
        self.routing_delegate = Some(delegate.into());
        self
    }

    pub fn caller_procedure(mut self, procedure: impl Into<String>) -> Self {
        self.caller_procedure = procedure.into();
        self
    }

    pub fn body(self, body: impl Into<Body>) -> crate::Result<Request> {
        let encoding = self
            .encoding
            .ok_or_else(|| crate::Error::invalid_argument("request is missing an encoding"))?;
        if self.procedure.is_empty() {
            return Err(crate::Error::invalid_argument("request is missing a procedure name"));
        }
        Ok(Request {
            caller: self.caller,
            callee: self.callee,
            procedure: self.procedure,
            encoding,
            headers: self.headers,
            body: body.into(),
            routing_key: self.routing_key,
            shard_key: self.shard_key,
            routing_delegate: self.routing_delegate,
            caller_procedure: self.caller_procedure,
        })
    }
}
