//! Ambient call context: cancellation, deadline, and request-scoped
//! metadata threaded explicitly through every blocking operation.
//!
//! No thread-locals: `Context` is a plain value passed as the first
//! argument to anything that can suspend.

use std::time::{Duration, Instant};

use tokio::sync::watch;

/// A cancellation + deadline + metadata handle passed as the first
/// argument to every operation that can block (`Chooser::choose`,
/// `Outbound::call`, `Stream::send_message`, `Stream::receive_message`).
#[derive(Clone)]
pub struct Context {
    deadline: Option<Instant>,
    cancel: watch::Receiver<bool>,
}

/// The write side of a `Context`'s cancellation signal. Dropping this
/// without calling `cancel()` leaves the context alive until the
/// deadline (if any) elapses on its own.
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl Context {
    /// A context with no deadline and no way to cancel it. Mostly useful
    /// in tests; production call sites should use `with_timeout` or
    /// propagate a context received from a caller.
    pub fn background() -> Self {
        let (_tx, rx) = watch::channel(false);
        Context {
            deadline: None,
            cancel: rx,
        }
    }

    /// Create a fresh context with a deadline `timeout` from now, and the
    /// handle that can cancel it early.
    pub fn with_timeout(timeout: Duration) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let ctx = Context {
            deadline: Some(Instant::now() + timeout),
            cancel: rx,
        };
        (ctx, CancelHandle { tx })
    }

    /// Create a fresh cancellable context with no deadline.
    pub fn cancellable() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let ctx = Context {
            deadline: None,
            cancel: rx,
        };
        (ctx, CancelHandle { tx })
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn has_deadline(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Time left until the deadline, or `None` if there is no deadline.
    /// Returns `Some(Duration::ZERO)` once the deadline has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.map(|d| Instant::now() >= d).unwrap_or(false)
    }

    /// Suspend until the context is cancelled, its deadline elapses, or
    /// (if neither applies) forever. Returns which of the two fired, or
    /// `None` if the context carries neither.
    pub async fn cancelled_or_expired(&mut self) -> Option<ContextDone> {
        match self.deadline {
            Some(deadline) => {
                let sleep = tokio::time::sleep_until(deadline.into());
                tokio::pin!(sleep);
                tokio::select! {
                    _ = &mut sleep => Some(ContextDone::DeadlineExceeded),
                    changed = self.cancel.changed() => {
                        if changed.is_ok() && *self.cancel.borrow() {
                            Some(ContextDone::Cancelled)
                        } else {
                            None
                        }
                    }
                }
            }
            None => {
                if self.cancel.changed().await.is_ok() && *self.cancel.borrow() {
                    Some(ContextDone::Cancelled)
                } else {
                    None
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextDone {
    Cancelled,
    DeadlineExceeded,
}
