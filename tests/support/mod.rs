//! A fake, fully in-process `Transport` used by the integration tests:
//! `call`/`call_oneway`/`call_stream` route directly into the matching
//! `Inbound`'s dispatch path, skipping any real wire protocol.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;

use rpc_core::{
    Chooser, ClientStream, Context, Inbound, InboundDispatch, ListUpdate, PeerIdentifier, PeerList,
    Request, RequestMeta, Response, Subscriber, Transport, TransportOnewayOutbound,
    TransportStreamOutbound, TransportUnaryOutbound,
};

#[derive(Default)]
struct Network {
    inbounds: HashMap<String, Arc<FakeInbound>>,
}

pub struct FakeTransport {
    pool: rpc_core::PeerPool,
    network: Mutex<Network>,
    self_weak: Weak<FakeTransport>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|weak| FakeTransport {
            pool: rpc_core::PeerPool::new(),
            network: Mutex::new(Network::default()),
            self_weak: weak.clone(),
        })
    }

    fn dispatch_for(&self, address: &str) -> rpc_core::Result<Arc<InboundDispatch>> {
        let inbound = self
            .network
            .lock()
            .unwrap()
            .inbounds
            .get(address)
            .cloned()
            .ok_or_else(|| rpc_core::Error::unavailable(format!("no inbound listening on {address:?}")))?;
        inbound
            .dispatch
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| rpc_core::Error::internal("inbound has no dispatch wired up yet"))
    }
}

pub struct FakeInbound {
    dispatch: Mutex<Option<Arc<InboundDispatch>>>,
    running: AtomicBool,
}

#[async_trait]
impl Inbound for FakeInbound {
    fn set_dispatch(&self, dispatch: Arc<InboundDispatch>) {
        *self.dispatch.lock().unwrap() = Some(dispatch);
    }

    async fn start(&self) -> rpc_core::Result<()> {
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> rpc_core::Result<()> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

enum Target {
    Fixed(String),
    Chosen(Arc<dyn Chooser>),
}

/// Resolves to a listening address either directly or through a
/// `Chooser`, then drives the resolved inbound's dispatch path.
pub struct FakeOutbound {
    transport: Arc<FakeTransport>,
    target: Target,
    running: AtomicBool,
}

impl FakeOutbound {
    async fn resolve(&self, ctx: &mut Context, req_like: &Request) -> rpc_core::Result<(String, Option<rpc_core::Picked>)> {
        match &self.target {
            Target::Fixed(address) => Ok((address.clone(), None)),
            Target::Chosen(chooser) => {
                let picked = rpc_core::chooser::pick_and_start(chooser.as_ref(), ctx, req_like).await?;
                let address = picked.peer().identifier().identifier().to_string();
                Ok((address, Some(picked)))
            }
        }
    }
}

#[async_trait]
impl TransportUnaryOutbound for FakeOutbound {
    async fn start(&self) -> rpc_core::Result<()> {
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }
    async fn stop(&self) -> rpc_core::Result<()> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }
    async fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn call(&self, ctx: &mut Context, req: Request) -> rpc_core::Result<Response> {
        let (address, mut picked) = self.resolve(ctx, &req).await?;
        let dispatch = self.transport.dispatch_for(&address);
        // Races the local deadline against the dispatch just like a real
        // transport would race it against the wire call, so a handler
        // that never returns still surfaces as a local timeout instead of
        // hanging the outbound forever.
        let procedure = req.procedure().to_string();
        let result = match dispatch {
            Ok(dispatch) => {
                let mut call_ctx = ctx.clone();
                tokio::select! {
                    biased;
                    done = ctx.cancelled_or_expired() => match done {
                        Some(rpc_core::ContextDone::DeadlineExceeded) => Err(rpc_core::Error::deadline_exceeded(
                            format!("Timeout: call to procedure {procedure:?}"),
                        )),
                        _ => Err(rpc_core::Error::cancelled("call cancelled")),
                    },
                    res = dispatch.handle_unary(&mut call_ctx, req) => res,
                }
            }
            Err(e) => Err(e),
        };
        if let Some(picked) = &mut picked {
            picked.finish();
        }
        result
    }
}

#[async_trait]
impl TransportOnewayOutbound for FakeOutbound {
    async fn start(&self) -> rpc_core::Result<()> {
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }
    async fn stop(&self) -> rpc_core::Result<()> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }
    async fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn call_oneway(&self, ctx: &mut Context, req: Request) -> rpc_core::Result<()> {
        let (address, mut picked) = self.resolve(ctx, &req).await?;
        let dispatch = self.transport.dispatch_for(&address)?;
        let mut ctx = ctx.clone();
        tokio::spawn(async move {
            let _ = dispatch.handle_oneway(&mut ctx, req).await;
        });
        if let Some(picked) = &mut picked {
            picked.finish();
        }
        Ok(())
    }
}

#[async_trait]
impl TransportStreamOutbound for FakeOutbound {
    async fn start(&self) -> rpc_core::Result<()> {
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }
    async fn stop(&self) -> rpc_core::Result<()> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }
    async fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn call_stream(&self, ctx: &mut Context, meta: RequestMeta) -> rpc_core::Result<ClientStream> {
        let probe = Request::builder()
            .caller(meta.caller.clone())
            .callee(meta.callee.clone())
            .procedure(meta.procedure.clone())
            .encoding(meta.encoding.clone())
            .body(Vec::new())?;
        let (address, mut picked) = self.resolve(ctx, &probe).await?;
        let dispatch = self.transport.dispatch_for(&address)?;

        let (client, server) = rpc_core::duplex(meta.clone());
        let mut ctx = ctx.clone();
        let service = meta.callee.clone();
        let procedure = meta.procedure.clone();
        let encoding = meta.encoding.clone();
        tokio::spawn(async move {
            // A handler error is already reported to the client over the
            // stream itself (see `ServerStream::failure_handle`); this
            // only logs it so a failing test run has something to point
            // at.
            if let Err(e) = dispatch
                .handle_stream(&mut ctx, server, &service, &procedure, &encoding)
                .await
            {
                tracing::debug!(error = %e, %service, %procedure, "stream handler returned an error");
            }
        });
        if let Some(picked) = &mut picked {
            picked.finish();
        }
        Ok(client)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    fn new_inbound(&self, local_address: &str) -> rpc_core::Result<Arc<dyn Inbound>> {
        let inbound = Arc::new(FakeInbound {
            dispatch: Mutex::new(None),
            running: AtomicBool::new(false),
        });
        self.network
            .lock()
            .unwrap()
            .inbounds
            .insert(local_address.to_string(), inbound.clone());
        Ok(inbound)
    }

    fn new_single_outbound(&self, remote_address: &str) -> rpc_core::Result<Arc<dyn TransportUnaryOutbound>> {
        Ok(self.endpoint_to(remote_address))
    }

    fn new_outbound(&self, chooser: Arc<dyn Chooser>) -> rpc_core::Result<Arc<dyn TransportUnaryOutbound>> {
        Ok(self.endpoint_via(chooser))
    }

    fn retain_peer(&self, id: PeerIdentifier, subscriber: &Arc<dyn Subscriber>) -> Arc<rpc_core::Peer> {
        let peer = self.pool.retain_peer(id, subscriber);
        peer.set_status(rpc_core::ConnStatus::Available);
        peer
    }

    fn release_peer(&self, id: &PeerIdentifier, subscriber: &Arc<dyn Subscriber>) {
        self.pool.release_peer(id, subscriber)
    }
}

impl FakeTransport {
    /// `Transport` methods only see `&self`; this recovers the `Arc` the
    /// caller is holding so outbounds can keep it alive past the call.
    fn self_arc(&self) -> Arc<FakeTransport> {
        self.self_weak.upgrade().expect("FakeTransport dropped while still in use")
    }

    /// A fixed-address endpoint implementing all three `Transport*Outbound`
    /// traits. `Transport::new_single_outbound` only promises the unary
    /// one, so tests needing a oneway or stream endpoint to the same
    /// address use this directly instead of going through the trait.
    pub fn endpoint_to(&self, address: &str) -> Arc<FakeOutbound> {
        Arc::new(FakeOutbound {
            transport: self.self_arc(),
            target: Target::Fixed(address.to_string()),
            running: AtomicBool::new(false),
        })
    }

    /// Same, but resolving the address through a `Chooser` on every call.
    pub fn endpoint_via(&self, chooser: Arc<dyn Chooser>) -> Arc<FakeOutbound> {
        Arc::new(FakeOutbound {
            transport: self.self_arc(),
            target: Target::Chosen(chooser),
            running: AtomicBool::new(false),
        })
    }
}

/// Build a multi-endpoint chooser-backed outbound over `addresses` using a
/// round-robin list, for tests that need several peers. Returns the
/// started chooser so the test can also exercise `PeerList::update`.
pub fn round_robin_outbound(
    transport: &Arc<FakeTransport>,
    addresses: &[&str],
) -> Arc<rpc_core::RoundRobinChooser> {
    let chooser = rpc_core::RoundRobinChooser::new(transport.clone(), rpc_core::RoundRobinConfig::default());
    let additions = addresses.iter().map(|a| PeerIdentifier::new(*a)).collect();
    chooser.update(ListUpdate::new(additions, vec![]));
    chooser
}
