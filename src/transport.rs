//! The interfaces a concrete wire protocol (HTTP/1, HTTP/2, a
//! TChannel-like framed binary protocol, gRPC, ...) must implement to
//! plug into the dispatcher.
//!
//! No concrete transport ships in this crate — wire-protocol codecs are
//! explicitly out of scope. What lives here is the seam:
//! trait objects the dispatcher, peer pool, and choosers are written
//! against, and that the test support module fakes out for the
//! integration tests.

use std::sync::Arc;

use async_trait::async_trait;

use crate::chooser::Chooser;
use crate::context::Context;
use crate::dispatcher::InboundDispatch;
use crate::lifecycle::Lifecycle;
use crate::peer::{Peer, PeerIdentifier, Subscriber};
use crate::request::Request;
use crate::response::Response;
use crate::stream::{ClientStream, RequestMeta};

/// A lifecycle-bearing endpoint that accepts incoming calls.
#[async_trait]
pub trait Inbound: Send + Sync {
    /// Wire up the dispatch path (middleware chain + router); called
    /// before `start`.
    fn set_dispatch(&self, dispatch: Arc<InboundDispatch>);

    async fn start(&self) -> crate::Result<()>;
    async fn stop(&self) -> crate::Result<()>;
    async fn is_running(&self) -> bool;
}

/// A lifecycle-bearing endpoint that issues outgoing unary calls.
#[async_trait]
pub trait UnaryOutbound: Send + Sync {
    async fn start(&self) -> crate::Result<()>;
    async fn stop(&self) -> crate::Result<()>;
    async fn is_running(&self) -> bool;
    async fn call(&self, ctx: &mut Context, req: Request) -> crate::Result<Response>;
}

/// A lifecycle-bearing endpoint for fire-and-forget calls. `call` returns
/// once the transport has accepted the request for transmission, not
/// once a handler has run it.
#[async_trait]
pub trait OnewayOutbound: Send + Sync {
    async fn start(&self) -> crate::Result<()>;
    async fn stop(&self) -> crate::Result<()>;
    async fn is_running(&self) -> bool;
    async fn call_oneway(&self, ctx: &mut Context, req: Request) -> crate::Result<()>;
}

/// A lifecycle-bearing endpoint that opens bidirectional streams.
#[async_trait]
pub trait StreamOutbound: Send + Sync {
    async fn start(&self) -> crate::Result<()>;
    async fn stop(&self) -> crate::Result<()>;
    async fn is_running(&self) -> bool;
    async fn call_stream(&self, ctx: &mut Context, meta: RequestMeta) -> crate::Result<ClientStream>;
}

/// The plug-in for one wire protocol: manufactures inbounds, outbounds,
/// and peers.
#[async_trait]
pub trait Transport: Send + Sync {
    fn new_inbound(&self, local_address: &str) -> crate::Result<Arc<dyn Inbound>>;

    fn new_single_outbound(&self, remote_address: &str) -> crate::Result<Arc<dyn UnaryOutbound>>;

    fn new_outbound(&self, chooser: Arc<dyn Chooser>) -> crate::Result<Arc<dyn UnaryOutbound>>;

    fn retain_peer(&self, id: PeerIdentifier, subscriber: &Arc<dyn Subscriber>) -> Arc<Peer>;

    fn release_peer(&self, id: &PeerIdentifier, subscriber: &Arc<dyn Subscriber>);
}

/// Shared scaffolding a concrete transport composes into its own struct:
/// a `PeerPool` plus the `Lifecycle` guard every `Inbound`/`Outbound`
/// needs. Not required by the
/// `Transport` trait itself — it is simply the shape every real
/// transport in this family ends up with.
pub struct TransportCore {
    pub peers: crate::peer::pool::PeerPool,
    pub lifecycle: Lifecycle,
}

impl Default for TransportCore {
    fn default() -> Self {
        TransportCore {
            peers: crate::peer::pool::PeerPool::new(),
            lifecycle: Lifecycle::new(),
        }
    }
}
