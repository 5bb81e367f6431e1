//! Ties a [`Router`], a set of named outbounds, a middleware stack, and
//! zero or more inbounds together under one lifecycle.

mod client_config;
mod config;
mod inbound_dispatch;

pub use client_config::ClientConfig;
pub use config::{DispatcherConfig, MiddlewareConfig, OutboundSet};
pub use inbound_dispatch::InboundDispatch;

use std::sync::{Arc, RwLock};

use crate::error::Error;
use crate::lifecycle::Lifecycle;
use crate::middleware::{OnewayInboundChain, StreamInboundChain, UnaryInboundChain};
use crate::router::{ProcedureDescriptor, Procedure, Router};
use crate::transport as t;

/// Whether one inbound is accepting calls, for [`DispatcherStatus`].
pub struct InboundStatus {
    pub running: bool,
}

/// Whether one named outbound's endpoints are running. A set only has an
/// entry for the modalities it was configured with.
pub struct OutboundStatus {
    pub name: String,
    pub unary_running: Option<bool>,
    pub oneway_running: Option<bool>,
    pub stream_running: Option<bool>,
}

/// A snapshot suitable for a health page or a debug endpoint — no live
/// references, just copied state.
pub struct DispatcherStatus {
    pub name: String,
    pub inbounds: Vec<InboundStatus>,
    pub outbounds: Vec<OutboundStatus>,
    pub procedures: Vec<ProcedureDescriptor>,
}

/// The long-lived object wiring inbounds, outbounds, the router, and
/// middleware together under one `start`/`stop`.
///
/// Registration can happen either through [`DispatcherConfig::router`] at
/// construction or afterwards through [`Dispatcher::register`] — both end
/// up behind the same lock so a procedure can be added while the
/// dispatcher is already running.
pub struct Dispatcher {
    name: String,
    router: Arc<RwLock<Router>>,
    inbounds: Vec<Arc<dyn t::Inbound>>,
    outbounds: std::collections::HashMap<String, OutboundSet>,
    dispatch: Arc<InboundDispatch>,
    lifecycle: Lifecycle,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        let router = Arc::new(RwLock::new(config.router));
        let unary_chain = UnaryInboundChain::new(config.middleware.unary_inbound);
        let oneway_chain = OnewayInboundChain::new(config.middleware.oneway_inbound);
        let stream_chain = StreamInboundChain::new(config.middleware.stream_inbound);
        let dispatch = Arc::new(InboundDispatch::new(
            router.clone(),
            unary_chain,
            oneway_chain,
            stream_chain,
        ));

        Dispatcher {
            name: config.name,
            router,
            inbounds: config.inbounds,
            outbounds: config.outbounds,
            dispatch,
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add procedures after construction. Safe to call before or after
    /// `start` — inbounds always dispatch through the same shared router.
    pub fn register(&self, procedures: Vec<Procedure>) -> crate::Result<()> {
        self.router.write().unwrap().register(&self.name, procedures)
    }

    pub fn dispatch(&self) -> Arc<InboundDispatch> {
        self.dispatch.clone()
    }

    pub fn client_config(&self, outbound_name: &str) -> crate::Result<ClientConfig> {
        let set = self.outbounds.get(outbound_name).ok_or_else(|| {
            Error::invalid_argument(format!("no outbound configured with name {outbound_name:?}"))
        })?;
        Ok(ClientConfig::new(
            self.name.clone(),
            set.service.clone(),
            set.unary.clone(),
            set.oneway.clone(),
            set.stream.clone(),
        ))
    }

    /// Start outbounds, then inbounds. If any outbound or inbound fails to
    /// start, everything already started is stopped before the error is
    /// returned — a partially-started `Dispatcher` is never left running.
    pub async fn start(&self) -> crate::Result<()> {
        self.lifecycle
            .start_with(|| async {
                let mut started_unary = Vec::new();
                let mut started_oneway = Vec::new();
                let mut started_stream = Vec::new();

                for set in self.outbounds.values() {
                    if let Some(u) = &set.unary {
                        if let Err(e) = u.start().await {
                            Self::unwind(&started_unary, &started_oneway, &started_stream, &[]).await;
                            return Err(e);
                        }
                        started_unary.push(u.clone());
                    }
                    if let Some(o) = &set.oneway {
                        if let Err(e) = o.start().await {
                            Self::unwind(&started_unary, &started_oneway, &started_stream, &[]).await;
                            return Err(e);
                        }
                        started_oneway.push(o.clone());
                    }
                    if let Some(s) = &set.stream {
                        if let Err(e) = s.start().await {
                            Self::unwind(&started_unary, &started_oneway, &started_stream, &[]).await;
                            return Err(e);
                        }
                        started_stream.push(s.clone());
                    }
                }

                let mut started_inbounds = Vec::new();
                for inbound in &self.inbounds {
                    inbound.set_dispatch(self.dispatch.clone());
                    if let Err(e) = inbound.start().await {
                        Self::unwind(&started_unary, &started_oneway, &started_stream, &started_inbounds).await;
                        return Err(e);
                    }
                    started_inbounds.push(inbound.clone());
                }

                tracing::info!(dispatcher = %self.name, "dispatcher started");
                Ok(())
            })
            .await
    }

    async fn unwind(
        unary: &[Arc<dyn t::UnaryOutbound>],
        oneway: &[Arc<dyn t::OnewayOutbound>],
        stream: &[Arc<dyn t::StreamOutbound>],
        inbounds: &[Arc<dyn t::Inbound>],
    ) {
        for inbound in inbounds {
            let _ = inbound.stop().await;
        }
        for u in unary {
            let _ = u.stop().await;
        }
        for o in oneway {
            let _ = o.stop().await;
        }
        for s in stream {
            let _ = s.stop().await;
        }
    }

    /// Stop inbounds, then outbounds, accumulating every error encountered
    /// rather than bailing on the first one — every component gets a
    /// chance to shut down regardless of a sibling's failure.
    pub async fn stop(&self) -> crate::Result<()> {
        self.lifecycle
            .stop_with(|| async {
                let mut error: Option<Error> = None;

                for inbound in &self.inbounds {
                    if let Err(e) = inbound.stop().await {
                        error = Some(match error {
                            Some(acc) => acc.annotate(e.to_string()),
                            None => e,
                        });
                    }
                }
                for set in self.outbounds.values() {
                    if let Some(u) = &set.unary {
                        if let Err(e) = u.stop().await {
                            error = Some(match error {
                                Some(acc) => acc.annotate(e.to_string()),
                                None => e,
                            });
                        }
                    }
                    if let Some(o) = &set.oneway {
                        if let Err(e) = o.stop().await {
                            error = Some(match error {
                                Some(acc) => acc.annotate(e.to_string()),
                                None => e,
                            });
                        }
                    }
                    if let Some(s) = &set.stream {
                        if let Err(e) = s.stop().await {
                            error = Some(match error {
                                Some(acc) => acc.annotate(e.to_string()),
                                None => e,
                            });
                        }
                    }
                }

                tracing::info!(dispatcher = %self.name, "dispatcher stopped");
                match error {
                    Some(e) => Err(e),
                    None => Ok(()),
                }
            })
            .await
    }

    pub async fn is_running(&self) -> bool {
        self.lifecycle.is_running().await
    }

    pub async fn introspect(&self) -> DispatcherStatus {
        let mut inbounds = Vec::with_capacity(self.inbounds.len());
        for inbound in &self.inbounds {
            inbounds.push(InboundStatus {
                running: inbound.is_running().await,
            });
        }

        let mut outbounds = Vec::with_capacity(self.outbounds.len());
        for (name, set) in &self.outbounds {
            let unary_running = match &set.unary {
                Some(u) => Some(u.is_running().await),
                None => None,
            };
            let oneway_running = match &set.oneway {
                Some(o) => Some(o.is_running().await),
                None => None,
            };
            let stream_running = match &set.stream {
                Some(s) => Some(s.is_running().await),
                None => None,
            };
            outbounds.push(OutboundStatus {
                name: name.clone(),
                unary_running,
                oneway_running,
                stream_running,
            });
        }

        let procedures = self.router.read().unwrap().procedures();

        DispatcherStatus {
            name: self.name.clone(),
            inbounds,
            outbounds,
            procedures,
        }
    }
}
