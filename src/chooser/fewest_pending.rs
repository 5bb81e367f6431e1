//! Picks the `Available` peer with the fewest in-flight requests,
//! randomizing insertion order so an idle list degenerates to
//! pseudo-round-robin instead of always favoring the first-added peer
//! fewest-pending-requests chooser.
//!
//! A literal binary heap keyed on pending count can't stay valid as
//! peers' pending counts change out from under it (each `Peer`'s
//! counter is a free-running atomic, not something this structure owns),
//! so this is a linear scan over the (small, connection-pool-sized)
//! member set instead — same asymptotics as a heap re-heapified on every
//! mutation, without the bookkeeping.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Deserialize;

use crate::context::{Context, ContextDone};
use crate::error::Error;
use crate::peer::list::{ListUpdate, PeerList, UpdateErrors};
use crate::peer::{ConnStatus, Peer, PeerIdentifier, Subscriber};
use crate::request::Request;
use crate::transport::Transport;

use super::{Chooser, Picked};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FewestPendingConfig {
    #[serde(default)]
    pub fail_fast: bool,
    pub random_seed: Option<u64>,
    pub capacity: Option<usize>,
}

struct Entry {
    peer: Arc<Peer>,
    shuffle_key: u64,
    seq: u64,
}

struct HeapState {
    members: HashMap<PeerIdentifier, Entry>,
    available: HashSet<PeerIdentifier>,
    next_seq: u64,
    rng: StdRng,
}

impl HeapState {
    fn new(seed: Option<u64>) -> Self {
        HeapState {
            members: HashMap::new(),
            available: HashSet::new(),
            next_seq: 0,
            rng: match seed {
                Some(s) => StdRng::seed_from_u64(s),
                None => StdRng::from_entropy(),
            },
        }
    }

    fn min_available(&self) -> Option<Arc<Peer>> {
        self.available
            .iter()
            .filter_map(|id| self.members.get(id))
            .min_by_key(|e| (e.peer.pending(), e.shuffle_key, e.seq))
            .map(|e| e.peer.clone())
    }
}

struct Inner {
    state: Mutex<HeapState>,
    notify: tokio::sync::Notify,
}

impl Subscriber for Inner {
    fn notify_status_changed(&self, peer: PeerIdentifier, status: ConnStatus) {
        let mut state = self.state.lock().unwrap();
        if !state.members.contains_key(&peer) {
            return;
        }
        match status {
            ConnStatus::Available => {
                state.available.insert(peer);
                self.notify.notify_waiters();
            }
            ConnStatus::Unavailable | ConnStatus::ConnectionFailed | ConnStatus::Connecting => {
                state.available.remove(&peer);
            }
        }
    }
}

pub struct FewestPendingChooser {
    inner: Arc<Inner>,
    transport: Arc<dyn Transport>,
    lifecycle: crate::lifecycle::Lifecycle,
    config: FewestPendingConfig,
}

impl FewestPendingChooser {
    pub fn new(transport: Arc<dyn Transport>, config: FewestPendingConfig) -> Arc<Self> {
        Arc::new(FewestPendingChooser {
            inner: Arc::new(Inner {
                state: Mutex::new(HeapState::new(config.random_seed)),
                notify: tokio::sync::Notify::new(),
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

impl PeerList for FewestPendingChooser {
    fn update(&self, update: ListUpdate) -> UpdateErrors {
        let mut errors = UpdateErrors::default();
        let subscriber = self.subscriber();

        for id in update.additions {
            {
                let state = self.inner.state.lock().unwrap();
                if state.members.contains_key(&id) {
                    errors.already_in_list.push(id);
                    continue;
                }
            }
            let peer = self.transport.retain_peer(id.clone(), &subscriber);
            let mut state = self.inner.state.lock().unwrap();
            let shuffle_key = state.rng.gen::<u64>();
            let seq = state.next_seq;
            state.next_seq += 1;
            let available = peer.status() == ConnStatus::Available;
            state.members.insert(
                id.clone(),
                Entry {
                    peer,
                    shuffle_key,
                    seq,
                },
            );
            if available {
                state.available.insert(id);
            }
        }

        for id in update.removals {
            let mut state = self.inner.state.lock().unwrap();
            if state.members.remove(&id).is_none() {
                errors.not_in_list.push(id);
                continue;
            }
            state.available.remove(&id);
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
impl Chooser for FewestPendingChooser {
    async fn choose(&self, ctx: &mut Context, _req: &Request) -> crate::Result<Picked> {
        loop {
            let picked = self.inner.state.lock().unwrap().min_available();
            if let Some(peer) = picked {
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
