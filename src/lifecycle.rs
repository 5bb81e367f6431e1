//! The `{Idle, Starting, Running, Stopping, Stopped}` state machine
//! shared by every lifecycle-bearing entity.
//!
//! A small enum plus a guard that makes concurrent transitions observe
//! one agreed-upon outcome rather than racing.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// A reusable idempotent start/stop guard. `start_with`/`stop_with` run
/// the given async closure exactly once per transition and fan the same
/// result out to every concurrent caller: concurrent `start_with` calls
/// all block until the first completes, and all observe the same result.
pub struct Lifecycle {
    state: Arc<Mutex<State>>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Lifecycle {
            state: Arc::new(Mutex::new(State::Idle)),
        }
    }

    pub async fn state(&self) -> State {
        *self.state.lock().await
    }

    pub async fn is_running(&self) -> bool {
        matches!(*self.state.lock().await, State::Running)
    }

    /// Transition `Idle -> Starting -> Running`, running `body` while
    /// holding the transition lock so concurrent starters all await the
    /// same work and observe the same result. A second call after
    /// `Running` is idempotent (returns `Ok(())` without re-running
    /// `body`); a call after `Stopped` fails — lifecycle is single-use.
    pub async fn start_with<F, Fut>(&self, body: F) -> crate::Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = crate::Result<()>>,
    {
        let mut guard = self.state.lock().await;
        match *guard {
            State::Running => Ok(()),
            State::Starting => Err(Error::internal("already starting")),
            State::Stopped | State::Stopping => {
                Err(Error::internal("cannot restart a stopped lifecycle"))
            }
            State::Idle => {
                *guard = State::Starting;
                drop(guard);
                let result = body().await;
                let mut guard = self.state.lock().await;
                *guard = match result {
                    Ok(()) => State::Running,
                    Err(_) => State::Idle,
                };
                result
            }
        }
    }

    /// Transition `Running -> Stopping -> Stopped`. Idempotent: calling
    /// `stop_with` on an already-`Stopped` lifecycle succeeds without
    /// re-running `body`.
    pub async fn stop_with<F, Fut>(&self, body: F) -> crate::Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = crate::Result<()>>,
    {
        let mut guard = self.state.lock().await;
        match *guard {
            State::Stopped => Ok(()),
            State::Stopping => Err(Error::internal("already stopping")),
            State::Idle => {
                *guard = State::Stopped;
                Ok(())
            }
            State::Starting => Err(Error::internal("cannot stop while starting")),
            State::Running => {
                *guard = State::Stopping;
                drop(guard);
                let result = body().await;
                let mut guard = self.state.lock().await;
                *guard = State::Stopped;
                result
            }
        }
    }
}
