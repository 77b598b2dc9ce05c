//! Lifecycle state machine.
//!
//! ```text
//! Starting ──both listeners bound──▶ Serving ──signal or listener failure──▶ Draining ──serve returned──▶ Stopped
//! ```
//!
//! Transitions only move forward. A request to move to an earlier or equal
//! state is ignored, so no state is ever revisited.

use std::fmt;
use std::net::SocketAddr;

use tokio::sync::watch;

use crate::observability::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    Starting = 0,
    Serving = 1,
    Draining = 2,
    Stopped = 3,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Starting => "starting",
            LifecycleState::Serving => "serving",
            LifecycleState::Draining => "draining",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Addresses the two listeners actually bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundAddrs {
    pub http: SocketAddr,
    pub grpc: SocketAddr,
}

/// Snapshot published to `Coordinator::subscribe` receivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub state: LifecycleState,
    pub addrs: Option<BoundAddrs>,
}

/// Owner of the current status. Cloned receivers observe every transition.
pub(crate) struct StateCell {
    tx: watch::Sender<Status>,
}

impl StateCell {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(Status {
            state: LifecycleState::Starting,
            addrs: None,
        });
        metrics::record_lifecycle_state(LifecycleState::Starting);
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Status> {
        self.tx.subscribe()
    }

    pub(crate) fn current(&self) -> LifecycleState {
        self.tx.borrow().state
    }

    /// Move to `next` if it is later than the current state. Returns whether it moved.
    pub(crate) fn advance(&self, next: LifecycleState) -> bool {
        let moved = self.tx.send_if_modified(|status| {
            if next > status.state {
                status.state = next;
                true
            } else {
                false
            }
        });
        if moved {
            metrics::record_lifecycle_state(next);
        }
        moved
    }

    /// Record the bound addresses and enter `Serving`.
    pub(crate) fn serving(&self, addrs: BoundAddrs) -> bool {
        let moved = self.tx.send_if_modified(|status| {
            if status.state < LifecycleState::Serving {
                status.state = LifecycleState::Serving;
                status.addrs = Some(addrs);
                true
            } else {
                false
            }
        });
        if moved {
            metrics::record_lifecycle_state(LifecycleState::Serving);
        }
        moved
    }
}
