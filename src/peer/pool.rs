//! Per-`Transport` keyed collection of peers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use super::{Peer, PeerIdentifier, Subscriber};

/// `RetainPeer` is atomic: look up, either bump an existing peer's
/// subscriber set or create a new one, add the subscriber, return the
/// peer. `ReleasePeer` removes the subscriber and, once the peer has no
/// subscribers left, drops it from the pool.
#[derive(Default)]
pub struct PeerPool {
    peers: Mutex<HashMap<PeerIdentifier, Arc<Peer>>>,
}

impl PeerPool {
    pub fn new() -> Self {
        PeerPool::default()
    }

    #[tracing::instrument(skip(self, subscriber), fields(peer = %identifier))]
    pub fn retain_peer(
        &self,
        identifier: PeerIdentifier,
        subscriber: &Arc<dyn Subscriber>,
    ) -> Arc<Peer> {
        let mut peers = self.peers.lock().unwrap();
        let peer = peers
            .entry(identifier.clone())
            .or_insert_with(|| Peer::new(identifier))
            .clone();
        peer.add_subscriber(Arc::downgrade(subscriber));
        tracing::debug!("peer retained");
        peer
    }

    #[tracing::instrument(skip(self, subscriber), fields(peer = %identifier))]
    pub fn release_peer(&self, identifier: &PeerIdentifier, subscriber: &Arc<dyn Subscriber>) {
        let mut peers = self.peers.lock().unwrap();
        if let Some(peer) = peers.get(identifier) {
            let weak: Weak<dyn Subscriber> = Arc::downgrade(subscriber);
            peer.remove_dead_subscriber(&weak);
            if peer.subscriber_count() == 0 {
                if peer.status() == super::ConnStatus::Connecting {
                    peer.set_status(super::ConnStatus::ConnectionFailed);
                }
                peers.remove(identifier);
                tracing::debug!("peer released, ref count reached zero");
            }
        }
    }

    pub fn get(&self, identifier: &PeerIdentifier) -> Option<Arc<Peer>> {
        self.peers.lock().unwrap().get(identifier).cloned()
    }

    pub fn len(&self) -> usize {
        self.peers.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
