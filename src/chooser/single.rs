//! Always returns the one retained peer; backs outbounds with a fixed
//! address.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::context::Context;
use crate::peer::{ConnStatus, Peer, PeerIdentifier, Subscriber};
use crate::request::Request;
use crate::transport::Transport;

use super::{Chooser, Picked};

/// A `Subscriber` that does nothing with status notifications; `Single`
/// has exactly one peer and nothing to rebalance toward, but it still
/// needs *a* subscriber identity to retain the peer through the pool's
/// ref-counting.
struct Inert;

impl Subscriber for Inert {
    fn notify_status_changed(&self, _peer: PeerIdentifier, _status: ConnStatus) {}
}

pub struct SingleChooser {
    identifier: PeerIdentifier,
    transport: Arc<dyn Transport>,
    subscriber: Arc<dyn Subscriber>,
    lifecycle: crate::lifecycle::Lifecycle,
    peer: Mutex<Option<Arc<Peer>>>,
}

impl SingleChooser {
    pub fn new(identifier: PeerIdentifier, transport: Arc<dyn Transport>) -> Arc<Self> {
        Arc::new(SingleChooser {
            identifier,
            transport,
            subscriber: Arc::new(Inert),
            lifecycle: crate::lifecycle::Lifecycle::new(),
            peer: Mutex::new(None),
        })
    }
}

#[async_trait]
impl Chooser for SingleChooser {
    async fn choose(&self, _ctx: &mut Context, _req: &Request) -> crate::Result<Picked> {
        let peer = self
            .peer
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| crate::Error::internal("single chooser not started"))?;
        Ok(Picked::new(peer))
    }

    async fn start(&self) -> crate::Result<()> {
        self.lifecycle
            .start_with(|| async {
                let peer = self.transport.retain_peer(self.identifier.clone(), &self.subscriber);
                *self.peer.lock().unwrap() = Some(peer);
                Ok(())
            })
            .await
    }

    async fn stop(&self) -> crate::Result<()> {
        self.lifecycle
            .stop_with(|| async {
                if let Some(_peer) = self.peer.lock().unwrap().take() {
                    self.transport.release_peer(&self.identifier, &self.subscriber);
                }
                Ok(())
            })
            .await
    }

    async fn is_running(&self) -> bool {
        self.lifecycle.is_running().await
    }
}
