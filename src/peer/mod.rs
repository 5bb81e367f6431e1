//! Ref-counted, connection-tracking handles to remote endpoints.

pub mod list;
pub mod pool;

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock, Weak};

/// An opaque remote-endpoint identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerIdentifier(String);

impl PeerIdentifier {
    pub fn new(identifier: impl Into<String>) -> Self {
        PeerIdentifier(identifier.into())
    }

    pub fn identifier(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The canonical connection-status transitions a `Transport` drives a
/// `Peer` through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnStatus {
    Connecting,
    Available,
    Unavailable,
    ConnectionFailed,
}

/// Observer of a peer's status changes. Peer Lists are the canonical
/// subscriber.
///
/// Peers hold only a `Weak` reference back to subscribers so a subscriber that disappears
/// without unsubscribing is simply skipped on the next notification
/// rather than kept alive or causing a panic.
pub trait Subscriber: Send + Sync {
    fn notify_status_changed(&self, peer: PeerIdentifier, status: ConnStatus);
}

/// A ref-counted connection handle owned by exactly one `Transport`
/// `pending` is the monotonic in-flight request
/// counter the fewest-pending chooser reads.
pub struct Peer {
    identifier: PeerIdentifier,
    status: RwLock<ConnStatus>,
    pending: AtomicI64,
    subscribers: RwLock<Vec<Weak<dyn Subscriber>>>,
}

impl fmt::Debug for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peer")
            .field("identifier", &self.identifier)
            .field("status", &self.status())
            .field("pending", &self.pending())
            .finish()
    }
}

impl Peer {
    pub(crate) fn new(identifier: PeerIdentifier) -> Arc<Peer> {
        Arc::new(Peer {
            identifier,
            status: RwLock::new(ConnStatus::Connecting),
            pending: AtomicI64::new(0),
            subscribers: RwLock::new(Vec::new()),
        })
    }

    pub fn identifier(&self) -> &PeerIdentifier {
        &self.identifier
    }

    pub fn status(&self) -> ConnStatus {
        *self.status.read().unwrap()
    }

    pub fn pending(&self) -> i64 {
        self.pending.load(Ordering::SeqCst)
    }

    /// Called by the chooser protocol step 2 once a peer has been
    /// picked: increments the pending count and notifies subscribers
    /// notifies subscribers.
    pub fn start_request(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    /// Invoked by `onFinish` exactly once per completed call.
    pub fn end_request(&self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }

    /// Transport-side status update. Snapshots subscribers under the
    /// read lock before notifying so a subscriber re-entering the peer
    /// (e.g. to release it) cannot deadlock.
    pub fn set_status(&self, status: ConnStatus) {
        *self.status.write().unwrap() = status;
        let subs: Vec<Arc<dyn Subscriber>> = self
            .subscribers
            .read()
            .unwrap()
            .iter()
            .filter_map(Weak::upgrade)
            .collect();
        for sub in subs {
            sub.notify_status_changed(self.identifier.clone(), status);
        }
    }

    pub(crate) fn add_subscriber(&self, subscriber: Weak<dyn Subscriber>) {
        self.subscribers.write().unwrap().push(subscriber);
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        let mut subs = self.subscribers.write().unwrap();
        subs.retain(|s| s.strong_count() > 0);
        subs.len()
    }

    pub(crate) fn remove_dead_subscriber(&self, target: &Weak<dyn Subscriber>) {
        let mut subs = self.subscribers.write().unwrap();
        subs.retain(|s| !Weak::ptr_eq(s, target) && s.strong_count() > 0);
    }
}
