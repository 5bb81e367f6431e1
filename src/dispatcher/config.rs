//! `Dispatcher` configuration objects.

use std::collections::HashMap;
use std::sync::Arc;

use crate::middleware::{
    OnewayInbound, OnewayOutbound, StreamInbound, StreamOutbound, UnaryInbound, UnaryOutbound,
};
use crate::router::Router;
use crate::transport as t;

/// The inbound/outbound middleware lists for each call modality,
/// applied in list order.
#[derive(Default)]
pub struct MiddlewareConfig {
    pub unary_inbound: Vec<Arc<dyn UnaryInbound>>,
    pub oneway_inbound: Vec<Arc<dyn OnewayInbound>>,
    pub stream_inbound: Vec<Arc<dyn StreamInbound>>,
    pub unary_outbound: Vec<Arc<dyn UnaryOutbound>>,
    pub oneway_outbound: Vec<Arc<dyn OnewayOutbound>>,
    pub stream_outbound: Vec<Arc<dyn StreamOutbound>>,
}

/// One named outbound's transport-level endpoints. Any subset may be
/// `None` — a named outbound that is only ever called unary has no need
/// for a stream endpoint.
#[derive(Default, Clone)]
pub struct OutboundSet {
    pub service: String,
    pub unary: Option<Arc<dyn t::UnaryOutbound>>,
    pub oneway: Option<Arc<dyn t::OnewayOutbound>>,
    pub stream: Option<Arc<dyn t::StreamOutbound>>,
}

/// Construction-time configuration for a [`super::Dispatcher`]: name,
/// inbounds, named outbounds, middleware lists, router, and metrics
/// scope.
///
/// `metrics_scope` is carried as an opaque string label — the metrics
/// emitter itself ships separately, but the core still threads a scope
/// name through so a transport or middleware can tag the metrics it
/// *does* emit.
pub struct DispatcherConfig {
    pub name: String,
    pub inbounds: Vec<Arc<dyn t::Inbound>>,
    pub outbounds: HashMap<String, OutboundSet>,
    pub middleware: MiddlewareConfig,
    pub router: Router,
    pub metrics_scope: Option<String>,
}

impl DispatcherConfig {
    pub fn new(name: impl Into<String>) -> Self {
        DispatcherConfig {
            name: name.into(),
            inbounds: Vec::new(),
            outbounds: HashMap::new(),
            middleware: MiddlewareConfig::default(),
            router: Router::new(),
            metrics_scope: None,
        }
    }

    pub fn with_inbound(mut self, inbound: Arc<dyn t::Inbound>) -> Self {
        self.inbounds.push(inbound);
        self
    }

    pub fn with_outbound(mut self, name: impl Into<String>, outbound: OutboundSet) -> Self {
        self.outbounds.insert(name.into(), outbound);
        self
    }

    pub fn with_middleware(mut self, middleware: MiddlewareConfig) -> Self {
        self.middleware = middleware;
        self
    }

    pub fn with_metrics_scope(mut self, scope: impl Into<String>) -> Self {
        self.metrics_scope = Some(scope.into());
        self
    }
}
