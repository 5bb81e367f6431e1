//! Handed to generated client stubs so they can serialize a payload,
//! issue the call, and deserialize the response without knowing which
//! transport backs the named outbound.

use std::sync::Arc;

use crate::transport as t;

#[derive(Clone)]
pub struct ClientConfig {
    caller: String,
    service: String,
    unary: Option<Arc<dyn t::UnaryOutbound>>,
    oneway: Option<Arc<dyn t::OnewayOutbound>>,
    stream: Option<Arc<dyn t::StreamOutbound>>,
}

impl ClientConfig {
    pub(crate) fn new(
        caller: String,
        service: String,
        unary: Option<Arc<dyn t::UnaryOutbound>>,
        oneway: Option<Arc<dyn t::OnewayOutbound>>,
        stream: Option<Arc<dyn t::StreamOutbound>>,
    ) -> Self {
        ClientConfig {
            caller,
            service,
            unary,
            oneway,
            stream,
        }
    }

    pub fn caller(&self) -> &str {
        &self.caller
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn unary_outbound(&self) -> Option<&Arc<dyn t::UnaryOutbound>> {
        self.unary.as_ref()
    }

    pub fn oneway_outbound(&self) -> Option<&Arc<dyn t::OnewayOutbound>> {
        self.oneway.as_ref()
    }

    pub fn stream_outbound(&self) -> Option<&Arc<dyn t::StreamOutbound>> {
        self.stream.as_ref()
    }
}
