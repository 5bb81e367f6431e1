//! Ring of `Available` peers plus an auxiliary map of `Unavailable` ones
//! round-robin chooser.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;

use crate::context::{Context, ContextDone};
use crate::error::Error;
use crate::peer::list::{ListUpdate, PeerList, UpdateErrors};
use crate::peer::{ConnStatus, Peer, PeerIdentifier, Subscriber};
use crate::request::Request;
use crate::transport::Transport;

use super::{Chooser, Picked};

/// Config for a round-robin chooser.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoundRobinConfig {
    #[serde(default)]
    pub fail_fast: bool,
    /// Insert newly-added peers at a random ring position instead of
    /// appending, avoiding a thundering-herd bias toward recently-added
    /// peers.
    #[serde(default)]
    pub shuffle_on_insert: bool,
    pub capacity: Option<usize>,
}

struct RingState {
    members: HashMap<PeerIdentifier, Arc<Peer>>,
    ring: Vec<PeerIdentifier>,
    unavailable: HashSet<PeerIdentifier>,
    next: usize,
}

impl RingState {
    fn new() -> Self {
        RingState {
            members: HashMap::new(),
            ring: Vec::new(),
            unavailable: HashSet::new(),
            next: 0,
        }
    }

    fn insert_into_ring(&mut self, id: PeerIdentifier, shuffle: bool) {
        self.unavailable.remove(&id);
        if self.ring.contains(&id) {
            return;
        }
        if shuffle && !self.ring.is_empty() {
            let pos = rand::thread_rng().gen_range(0..=self.ring.len());
            self.ring.insert(pos, id);
        } else {
            self.ring.push(id);
        }
    }

    fn remove_from_ring(&mut self, id: &PeerIdentifier) {
        if let Some(pos) = self.ring.iter().position(|x| x == id) {
            self.ring.remove(pos);
            if self.next > pos {
                self.next -= 1;
            }
            if self.ring.is_empty() {
                self.next = 0;
            } else {
                self.next %= self.ring.len();
            }
        }
    }
}

/// The subscriber identity and mutable ring state, kept as a separate
/// `Arc` from the public `RoundRobinChooser` so it can be handed to
/// `Transport::retain_peer` as `Arc<dyn Subscriber>` without the
/// chicken-and-egg problem of needing an `Arc<Self>` at construction
/// time.
struct Inner {
    state: Mutex<RingState>,
    notify: tokio::sync::Notify,
    shuffle_on_insert: bool,
}

impl Subscriber for Inner {
    fn notify_status_changed(&self, peer: PeerIdentifier, status: ConnStatus) {
        let mut state = self.state.lock().unwrap();
        if !state.members.contains_key(&peer) {
            return;
        }
        match status {
            ConnStatus::Available => {
                state.insert_into_ring(peer, self.shuffle_on_insert);
                self.notify.notify_waiters();
            }
            ConnStatus::Unavailable | ConnStatus::ConnectionFailed | ConnStatus::Connecting => {
                state.remove_from_ring(&peer);
                state.unavailable.insert(peer);
            }
        }
    }
}

pub struct RoundRobinChooser {
    inner: Arc<Inner>,
    transport: Arc<dyn Transport>,
    lifecycle: crate::lifecycle::Lifecycle,
    config: RoundRobinConfig,
}

impl RoundRobinChooser {
    pub fn new(transport: Arc<dyn Transport>, config: RoundRobinConfig) -> Arc<Self> {
        Arc::new(RoundRobinChooser {
            inner: Arc::new(Inner {
                state: Mutex::new(RingState::new()),
                notify: tokio::sync::Notify::new(),
                shuffle_on_insert: config.shuffle_on_insert,
            }),
            transport,
            lifecycle: crate::lifecycle::Lifecycle::new(),
            config,
        })
    }

    fn subscriber(&self) -> Arc<dyn Subscriber> {
        self.inner.clone()
    }
}

impl PeerList for RoundRobinChooser {
    fn update(&self, update: ListUpdate) -> UpdateErrors {
        let mut errors = UpdateErrors::default();
        let subscriber = self.subscriber();

        // Additions and removals are both applied while the ring's lock
        // is effectively exclusive (retain/release happen outside the
        // lock, but the membership mutation that makes the new peer
        // visible to `choose` is a single locked section per peer), so
        // `Choose` never observes a half-applied update.
        for id in update.additions {
            let mut state = self.inner.state.lock().unwrap();
            if state.members.contains_key(&id) {
                errors.already_in_list.push(id);
                continue;
            }
            drop(state);
            let peer = self.transport.retain_peer(id.clone(), &subscriber);
            let mut state = self.inner.state.lock().unwrap();
            let initial_status = peer.status();
            state.members.insert(id.clone(), peer);
            if initial_status == ConnStatus::Available {
                state.insert_into_ring(id, self.config.shuffle_on_insert);
            } else {
                state.unavailable.insert(id);
            }
        }

        for id in update.removals {
            let mut state = self.inner.state.lock().unwrap();
            if state.members.remove(&id).is_none() {
                errors.not_in_list.push(id);
                continue;
            }
            state.remove_from_ring(&id);
            state.unavailable.remove(&id);
            drop(state);
            self.transport.release_peer(&id, &subscriber);
        }

        errors
    }

    fn len(&self) -> usize {
        self.inner.state.lock().unwrap().members.len()
    }
}

#[async_trait]
impl Chooser for RoundRobinChooser {
    async fn choose(&self, ctx: &mut Context, _req: &Request) -> crate::Result<Picked> {
        loop {
            let next_peer = {
                let mut state = self.inner.state.lock().unwrap();
                if state.ring.is_empty() {
                    None
                } else {
                    let idx = state.next % state.ring.len();
                    state.next = (state.next + 1) % state.ring.len();
                    let id = state.ring[idx].clone();
                    state.members.get(&id).cloned()
                }
            };

            if let Some(peer) = next_peer {
                return Ok(Picked::new(peer));
            }

            if self.config.fail_fast {
                return Err(Error::unavailable("no peer available (fail-fast)"));
            }

            if !ctx.has_deadline() {
                return Err(Error::invalid_argument("no deadline on choose context"));
            }

            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            tokio::select! {
                biased;
                done = ctx.cancelled_or_expired() => {
                    return match done {
                        Some(ContextDone::DeadlineExceeded) => {
                            Err(Error::deadline_exceeded("choose deadline exceeded waiting for a peer"))
                        }
                        _ => Err(Error::cancelled("choose cancelled waiting for a peer")),
                    };
                }
                _ = &mut notified => continue,
            }
        }
    }

    async fn start(&self) -> crate::Result<()> {
        self.lifecycle.start_with(|| async { Ok(()) }).await
    }

    async fn stop(&self) -> crate::Result<()> {
        let subscriber = self.subscriber();
        let transport = self.transport.clone();
        let inner = self.inner.clone();
        self.lifecycle
            .stop_with(|| async move {
                let ids: Vec<PeerIdentifier> = {
                    let state = inner.state.lock().unwrap();
                    state.members.keys().cloned().collect()
                };
                for id in ids {
                    transport.release_peer(&id, &subscriber);
                }
                inner.state.lock().unwrap().members.clear();
                Ok(())
            })
            .await
    }

    async fn is_running(&self) -> bool {
        self.lifecycle.is_running().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::pool::PeerPool;
    use std::time::Duration;

    /// A fake transport that flips every retained peer to `Available`
    /// synchronously, so ring tests don't need to simulate a real
    /// connection handshake.
    struct ImmediatelyAvailableTransport {
        pool: PeerPool,
    }

    #[async_trait]
    impl Transport for ImmediatelyAvailableTransport {
        fn new_inbound(&self, _: &str) -> crate::Result<Arc<dyn crate::transport::Inbound>> {
            unimplemented!()
        }
        fn new_single_outbound(&self, _: &str) -> crate::Result<Arc<dyn crate::transport::UnaryOutbound>> {
            unimplemented!()
        }
        fn new_outbound(
            &self,
            _: Arc<dyn Chooser>,
        ) -> crate::Result<Arc<dyn crate::transport::UnaryOutbound>> {
            unimplemented!()
        }
        fn retain_peer(&self, id: PeerIdentifier, subscriber: &Arc<dyn Subscriber>) -> Arc<Peer> {
            let peer = self.pool.retain_peer(id, subscriber);
            peer.set_status(ConnStatus::Available);
            peer
        }
        fn release_peer(&self, id: &PeerIdentifier, subscriber: &Arc<dyn Subscriber>) {
            self.pool.release_peer(id, subscriber)
        }
    }

    fn req() -> Request {
        Request::builder()
            .caller("c")
            .callee("s")
            .procedure("p")
            .encoding(crate::encoding::Encoding::RAW)
            .body(Vec::new())
            .unwrap()
    }

    #[tokio::test]
    async fn rotation_invariant_over_n_calls() {
        let transport: Arc<dyn Transport> = Arc::new(ImmediatelyAvailableTransport {
            pool: PeerPool::new(),
        });
        let chooser = RoundRobinChooser::new(transport, RoundRobinConfig::default());
        chooser.start().await.unwrap();
        chooser.update(ListUpdate::new(
            vec![
                PeerIdentifier::new("A"),
                PeerIdentifier::new("B"),
                PeerIdentifier::new("C"),
            ],
            vec![],
        ));

        let mut ctx = Context::background();
        let mut order = Vec::new();
        for _ in 0..6 {
            let picked = chooser.choose(&mut ctx, &req()).await.unwrap();
            order.push(picked.peer().identifier().identifier().to_string());
        }
        assert_eq!(order, vec!["A", "B", "C", "A", "B", "C"]);
    }

    #[tokio::test]
    async fn no_deadline_on_empty_list_is_invalid_argument() {
        let transport: Arc<dyn Transport> = Arc::new(ImmediatelyAvailableTransport {
            pool: PeerPool::new(),
        });
        let chooser = RoundRobinChooser::new(transport, RoundRobinConfig::default());
        chooser.start().await.unwrap();

        let mut ctx = Context::background();
        let err = chooser.choose(&mut ctx, &req()).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
        assert!(err.message().contains("no deadline"));
    }

    #[tokio::test]
    async fn fail_fast_errors_immediately_when_empty() {
        let transport: Arc<dyn Transport> = Arc::new(ImmediatelyAvailableTransport {
            pool: PeerPool::new(),
        });
        let chooser = RoundRobinChooser::new(
            transport,
            RoundRobinConfig {
                fail_fast: true,
                ..Default::default()
            },
        );
        chooser.start().await.unwrap();

        let mut ctx = Context::background();
        let err = chooser.choose(&mut ctx, &req()).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Unavailable);
    }

    #[tokio::test]
    async fn choose_blocks_until_peer_added_then_succeeds() {
        let transport: Arc<dyn Transport> = Arc::new(ImmediatelyAvailableTransport {
            pool: PeerPool::new(),
        });
        let chooser = RoundRobinChooser::new(transport, RoundRobinConfig::default());
        chooser.start().await.unwrap();

        let chooser2 = chooser.clone();
        let waiter = tokio::spawn(async move {
            let (mut ctx, _handle) = Context::with_timeout(Duration::from_secs(5));
            chooser2.choose(&mut ctx, &req()).await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        chooser.update(ListUpdate::new(vec![PeerIdentifier::new("A")], vec![]));

        let picked = waiter.await.unwrap().unwrap();
        assert_eq!(picked.peer().identifier().identifier(), "A");
    }

    #[tokio::test]
    async fn duplicate_and_missing_updates_are_reported_without_rollback() {
        let transport: Arc<dyn Transport> = Arc::new(ImmediatelyAvailableTransport {
            pool: PeerPool::new(),
        });
        let chooser = RoundRobinChooser::new(transport, RoundRobinConfig::default());
        chooser.start().await.unwrap();

        chooser.update(ListUpdate::new(vec![PeerIdentifier::new("A")], vec![]));
        let errs = chooser.update(ListUpdate::new(
            vec![PeerIdentifier::new("A"), PeerIdentifier::new("B")],
            vec![PeerIdentifier::new("missing")],
        ));
        assert_eq!(errs.already_in_list, vec![PeerIdentifier::new("A")]);
        assert_eq!(errs.not_in_list, vec![PeerIdentifier::new("missing")]);
        // B still got added despite A's conflict.
        assert_eq!(chooser.len(), 2);
    }
}
