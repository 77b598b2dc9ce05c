//! Runs the engine's listeners and decides how the process ends.
//!
//! Two tasks run once startup has finished:
//! - the serve task calls `Engine::serve` and sends its result on a
//!   single-slot completion channel
//! - the signal task waits for a termination signal and calls `Engine::stop`
//!
//! Only the serve result decides the outcome. A failed stop is logged and
//! reported, never escalated.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

use crate::config::ListenAddrs;
use crate::engine::Engine;
use crate::error::Error;
use crate::lifecycle::shutdown::{Shutdown, ShutdownError};
use crate::lifecycle::signals::Signal;
use crate::lifecycle::state::{LifecycleState, StateCell, Status};
use crate::observability::logging::LIFECYCLE_TARGET;

/// What the signal task saw. Informational only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// The signal that started the shutdown, if one arrived.
    pub signal: Option<Signal>,
    /// Set when the engine could not drain before the deadline.
    pub stop_error: Option<ShutdownError>,
}

pub struct Coordinator<E: Engine> {
    engine: Arc<E>,
    stop_timeout: Duration,
    state: Arc<StateCell>,
    /// Releases the signal task once the serve result is in.
    cancel: Shutdown,
}

impl<E: Engine> Coordinator<E> {
    pub fn new(engine: Arc<E>, stop_timeout: Duration) -> Self {
        Self {
            engine,
            stop_timeout,
            state: Arc::new(StateCell::new()),
            cancel: Shutdown::new(),
        }
    }

    /// Watch state transitions and the bound listener addresses.
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.state.subscribe()
    }

    pub fn state(&self) -> LifecycleState {
        self.state.current()
    }

    /// Serve until the engine's listeners close.
    ///
    /// `signal` resolves when a termination signal arrives; production passes
    /// `Signals::recv`. Returns `Ok` when the listeners closed after a stop,
    /// and the listener error otherwise.
    pub async fn run<S>(self, addrs: ListenAddrs, signal: S) -> Result<ShutdownReport, Error>
    where
        S: Future<Output = Signal> + Send + 'static,
    {
        let signal_task = tokio::spawn(watch_signal(
            self.engine.clone(),
            signal,
            self.cancel.clone(),
            self.state.clone(),
            self.stop_timeout,
        ));

        let (done_tx, mut done_rx) = mpsc::channel(1);
        let (listening_tx, listening_rx) = oneshot::channel();
        let engine = self.engine.clone();
        tokio::spawn(async move {
            let result = engine.serve(addrs, listening_tx).await;
            let _ = done_tx.send(result).await;
        });

        // A dropped sender means serve failed before binding; the result follows.
        if let Ok(bound) = listening_rx.await {
            self.state.serving(bound);
            tracing::info!(target: LIFECYCLE_TARGET, address = %bound.http, "REST server listening");
            tracing::info!(target: LIFECYCLE_TARGET, address = %bound.grpc, "RPC server listening");
        }

        let outcome = match done_rx.recv().await {
            Some(result) => result.map_err(Error::from),
            None => Err(Error::ServeTaskLost),
        };
        if outcome.is_err() {
            self.state.advance(LifecycleState::Draining);
        }

        self.cancel.trigger();
        let report = self.collect_signal_task(signal_task).await;
        self.state.advance(LifecycleState::Stopped);

        match outcome {
            Ok(()) => {
                tracing::info!(target: LIFECYCLE_TARGET, "Shutdown complete");
                Ok(report)
            }
            Err(e) => Err(e),
        }
    }

    /// Wait for the signal task so its stop error is logged before exit.
    /// A stop in flight is bounded by its own deadline, which is at most
    /// `stop_timeout` away.
    async fn collect_signal_task(
        &self,
        task: tokio::task::JoinHandle<ShutdownReport>,
    ) -> ShutdownReport {
        match tokio::time::timeout(self.stop_timeout, task).await {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => {
                tracing::error!(target: LIFECYCLE_TARGET, error = %e, "Signal task failed");
                ShutdownReport::default()
            }
            Err(_) => {
                tracing::warn!(target: LIFECYCLE_TARGET, "Stop did not return, exiting without it");
                ShutdownReport::default()
            }
        }
    }
}

async fn watch_signal<E, S>(
    engine: Arc<E>,
    signal: S,
    cancel: Shutdown,
    state: Arc<StateCell>,
    stop_timeout: Duration,
) -> ShutdownReport
where
    E: Engine,
    S: Future<Output = Signal> + Send + 'static,
{
    let signal = tokio::select! {
        signal = signal => signal,
        _ = cancel.wait() => return ShutdownReport::default(),
    };

    tracing::info!(target: LIFECYCLE_TARGET, %signal, "Received {}, shutting down gracefully", signal);
    state.advance(LifecycleState::Draining);

    let stop_error = match engine.stop(Instant::now() + stop_timeout).await {
        Ok(()) => None,
        Err(e) => {
            tracing::error!(target: LIFECYCLE_TARGET, error = %e, "Failed to stop");
            Some(e)
        }
    };

    ShutdownReport {
        signal: Some(signal),
        stop_error,
    }
}
