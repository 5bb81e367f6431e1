//! Couples a `ChooserList` with an `Updater` and ties their lifecycles
//! together.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::peer::list::PeerList;
use crate::request::Request;

use super::{Chooser, Picked};

/// A peer list that is also a chooser — the round-robin ring and the
/// fewest-pending heap both qualify.
pub trait ChooserList: Chooser + PeerList {}
impl<T: Chooser + PeerList + ?Sized> ChooserList for T {}

/// A separate lifecycle-bearing object that mutates a `ChooserList` over
/// time — a static list of peers, a DNS watcher, a service-discovery
/// client.
#[async_trait]
pub trait Updater: Send + Sync {
    async fn start(&self, list: Arc<dyn ChooserList>) -> crate::Result<()>;
    async fn stop(&self, list: Arc<dyn ChooserList>) -> crate::Result<()>;
    async fn is_running(&self) -> bool;
}

/// An `Updater` that pushes a fixed peer set on start and retracts it on
/// stop. The simplest possible updater, useful for statically-configured
/// outbounds.
pub struct StaticUpdater {
    peers: Vec<crate::peer::PeerIdentifier>,
    lifecycle: crate::lifecycle::Lifecycle,
}

impl StaticUpdater {
    pub fn new(peers: Vec<crate::peer::PeerIdentifier>) -> Arc<Self> {
        Arc::new(StaticUpdater {
            peers,
            lifecycle: crate::lifecycle::Lifecycle::new(),
        })
    }
}

#[async_trait]
impl Updater for StaticUpdater {
    async fn start(&self, list: Arc<dyn ChooserList>) -> crate::Result<()> {
        let peers = self.peers.clone();
        self.lifecycle
            .start_with(|| async move {
                let errors = list.update(crate::peer::list::ListUpdate::new(peers, vec![]));
                if !errors.is_empty() {
                    return Err(crate::Error::internal(format!(
                        "static updater: {} duplicate additions",
                        errors.already_in_list.len()
                    )));
                }
                Ok(())
            })
            .await
    }

    async fn stop(&self, list: Arc<dyn ChooserList>) -> crate::Result<()> {
        let peers = self.peers.clone();
        self.lifecycle
            .stop_with(|| async move {
                list.update(crate::peer::list::ListUpdate::new(vec![], peers));
                Ok(())
            })
            .await
    }

    async fn is_running(&self) -> bool {
        self.lifecycle.is_running().await
    }
}

pub struct BoundChooser {
    list: Arc<dyn ChooserList>,
    updater: Arc<dyn Updater>,
    lifecycle: crate::lifecycle::Lifecycle,
}

impl BoundChooser {
    pub fn new(list: Arc<dyn ChooserList>, updater: Arc<dyn Updater>) -> Arc<Self> {
        Arc::new(BoundChooser {
            list,
            updater,
            lifecycle: crate::lifecycle::Lifecycle::new(),
        })
    }
}

#[async_trait]
impl Chooser for BoundChooser {
    async fn choose(&self, ctx: &mut Context, req: &Request) -> crate::Result<Picked> {
        self.list.choose(ctx, req).await
    }

    /// Start the `ChooserList`, then the `Updater`; if the updater fails
    /// to start, the list is stopped again before the error is returned
    /// returned.
    async fn start(&self) -> crate::Result<()> {
        let list = self.list.clone();
        let updater = self.updater.clone();
        self.lifecycle
            .start_with(|| async move {
                list.start().await?;
                if let Err(e) = updater.start(list.clone()).await {
                    let _ = list.stop().await;
                    return Err(e);
                }
                Ok(())
            })
            .await
    }

    /// Stop the `Updater`, then the `ChooserList`; both stop errors are
    /// combined and returned.
    async fn stop(&self) -> crate::Result<()> {
        let list = self.list.clone();
        let updater = self.updater.clone();
        self.lifecycle
            .stop_with(|| async move {
                let updater_result = updater.stop(list.clone()).await;
                let list_result = list.stop().await;
                match (updater_result, list_result) {
                    (Ok(()), Ok(())) => Ok(()),
                    (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
                    (Err(a), Err(b)) => Err(a.annotate(format!("and list stop error: {b}"))),
                }
            })
            .await
    }

    async fn is_running(&self) -> bool {
        self.lifecycle.is_running().await
    }
}
