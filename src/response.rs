//! The in-memory response abstraction.

use crate::body::Body;
use crate::headers::Headers;

/// A unary response: headers, a single-consumer body, and an
/// application-error flag distinct from transport/framework errors
/// distinct from transport/framework errors.
#[derive(Debug)]
pub struct Response {
    headers: Headers,
    body: Body,
    application_error: Option<ApplicationError>,
}

/// Details of a handler-reported application error, carried on the
/// response rather than as a framework `Error` so that transports can
/// forward it to the client on the wire.
#[derive(Debug, Clone)]
pub struct ApplicationError {
    pub name: Option<String>,
    pub code: Option<i32>,
    pub message: String,
}

impl Response {
    pub fn new(body: impl Into<Body>) -> Self {
        Response {
            headers: Headers::new(),
            body: body.into(),
            application_error: None,
        }
    }

    pub fn with_application_error(message: impl Into<String>) -> Self {
        Response {
            headers: Headers::new(),
            body: Body::empty(),
            application_error: Some(ApplicationError {
                name: None,
                code: None,
                message: message.into(),
            }),
        }
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

    pub fn is_application_error(&self) -> bool {
        self.application_error.is_some()
    }

    pub fn application_error(&self) -> Option<&ApplicationError> {
        self.application_error.as_ref()
    }

    pub fn set_application_error(&mut self, error: ApplicationError) {
        self.application_error = Some(error);
    }

    /// Close the response, asserting the body has been fully consumed.
    /// Transports call this after writing the body to the wire; it is a
    /// documented contract error (panics in debug builds of caller code
    /// in practice, but here simply reports) to close without consuming.
    pub fn close(self) -> crate::Result<()> {
        if self.body.is_consumed() || self.body.is_empty() {
            Ok(())
        } else {
            Err(crate::Error::internal(
                "response body closed without being consumed",
            ))
        }
    }
}
