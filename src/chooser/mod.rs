//! Policies that pick one peer per outbound call.

pub mod bound;
pub mod fewest_pending;
pub mod round_robin;
pub mod single;

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::peer::Peer;
use crate::request::Request;

/// The peer a `Chooser` picked, plus the `onFinish` callback the Choose
/// protocol requires be invoked exactly once, after the call's response
/// is fully consumed.
pub struct Picked {
    peer: Arc<Peer>,
    on_finish: Option<Box<dyn FnOnce() + Send>>,
}

impl Picked {
    pub fn new(peer: Arc<Peer>) -> Self {
        let finisher = peer.clone();
        Picked {
            peer,
            on_finish: Some(Box::new(move || finisher.end_request())),
        }
    }

    pub fn peer(&self) -> &Arc<Peer> {
        &self.peer
    }

    /// Invoke `onFinish`. Idempotent: calling it twice only runs the
    /// callback once.
    pub fn finish(&mut self) {
        if let Some(f) = self.on_finish.take() {
            f();
        }
    }
}

impl Drop for Picked {
    /// A caller that drops a `Picked` without calling `finish` (a
    /// programming error) still releases the pending-count slot, so a
    /// crashed call path cannot leak it permanently.
    fn drop(&mut self) {
        self.finish();
    }
}

/// Given an ambient context and a request, picks one peer. May suspend
/// until a peer becomes available or the context's deadline elapses
/// or the context's deadline elapses.
#[async_trait]
pub trait Chooser: Send + Sync {
    async fn choose(&self, ctx: &mut Context, req: &Request) -> crate::Result<Picked>;
    async fn start(&self) -> crate::Result<()>;
    async fn stop(&self) -> crate::Result<()>;
    async fn is_running(&self) -> bool;
}

/// Runs the full Choose protocol: pick a peer,
/// then mark the request started on it. Step 3 (issuing the wire call)
/// and step 4 (`picked.finish()`) are the outbound's responsibility.
pub async fn pick_and_start(
    chooser: &dyn Chooser,
    ctx: &mut Context,
    req: &Request,
) -> crate::Result<Picked> {
    let picked = chooser.choose(ctx, req).await?;
    picked.peer().start_request();
    Ok(picked)
}
