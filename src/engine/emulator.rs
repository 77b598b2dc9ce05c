//! The bundled engine: SQLite catalog behind a REST and an RPC listener.
//!
//! # Responsibilities
//! - Own the catalog opened on the selected storage handle
//! - Bind both listeners and serve them until asked to stop
//! - Drain both listeners on `stop`, force-closing them at the deadline
//!
//! # Design Decisions
//! - One listener failing asks the other to drain, so `serve` returns only
//!   after both have terminated
//! - Stop, force-close and "serve finished" are three separate `Shutdown`
//!   tokens; nothing polls a shared flag

use std::future::IntoFuture;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use axum::{middleware, Router};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::{ConfigError, ListenAddrs, LogFormat, LogLevel};
use crate::engine::{rest, rpc, Engine};
use crate::error::Error;
use crate::lifecycle::{BoundAddrs, Shutdown, ShutdownError};
use crate::net::{Listener, ListenerError};
use crate::observability::{logging, metrics};
use crate::seed::{validate_seed, Seed, SeedError};
use crate::storage::{Catalog, StorageError, StorageHandle};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// State shared with request handlers.
pub struct EngineState {
    pub catalog: Catalog,
    active_project: RwLock<Option<String>>,
}

impl EngineState {
    pub fn active_project(&self) -> Option<String> {
        self.active_project
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

pub struct EmulatorEngine {
    state: Arc<EngineState>,
    request_timeout: Duration,
    /// Stop requested: listeners drain in-flight requests and close.
    shutdown: Shutdown,
    /// Drain deadline passed: listeners close immediately.
    force: Shutdown,
    /// `serve` has returned.
    drained: Shutdown,
}

impl std::fmt::Debug for EmulatorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmulatorEngine")
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl EmulatorEngine {
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.state.catalog
    }

    pub fn active_project(&self) -> Option<String> {
        self.state.active_project()
    }

    pub(crate) fn shared_state(&self) -> Arc<EngineState> {
        self.state.clone()
    }

    async fn serve_listeners(
        &self,
        addrs: ListenAddrs,
        listening: oneshot::Sender<BoundAddrs>,
    ) -> Result<(), ListenerError> {
        let rest_listener = Listener::bind(rest::LISTENER, &addrs.http).await?;
        let rpc_listener = Listener::bind(rpc::LISTENER, &addrs.grpc).await?;

        let _ = listening.send(BoundAddrs {
            http: rest_listener.local_addr(),
            grpc: rpc_listener.local_addr(),
        });

        let rest_app = with_layers(
            rest::router(self.shared_state()),
            rest::LISTENER,
            self.request_timeout,
        );
        let rpc_app = with_layers(
            rpc::router(self.shared_state()),
            rpc::LISTENER,
            self.request_timeout,
        );

        let (rest_result, rpc_result) = tokio::join!(
            self.run_listener(rest_listener, rest_app),
            self.run_listener(rpc_listener, rpc_app),
        );
        rest_result.and(rpc_result)
    }

    async fn run_listener(&self, listener: Listener, app: Router) -> Result<(), ListenerError> {
        let name = listener.name();
        let drain = self.shutdown.clone();
        let server = axum::serve(listener.into_inner(), app)
            .with_graceful_shutdown(async move { drain.wait().await });

        let result = tokio::select! {
            result = server.into_future() => {
                result.map_err(|source| ListenerError::Serve { listener: name, source })
            }
            _ = self.force.wait() => {
                tracing::warn!(listener = name, "Drain deadline passed, closing listener");
                Ok(())
            }
        };

        match &result {
            Ok(()) => tracing::debug!(listener = name, "Listener closed"),
            Err(e) => {
                tracing::error!(listener = name, error = %e, "Listener failed, draining the other");
                self.shutdown.trigger();
            }
        }
        result
    }
}

impl Engine for EmulatorEngine {
    fn construct(storage: StorageHandle) -> Result<Self, StorageError> {
        let catalog = Catalog::open(storage)?;
        Ok(Self {
            state: Arc::new(EngineState {
                catalog,
                active_project: RwLock::new(None),
            }),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            shutdown: Shutdown::new(),
            force: Shutdown::new(),
            drained: Shutdown::new(),
        })
    }

    fn set_active_project(&self, id: &str) -> Result<(), Error> {
        if !self.state.catalog.has_project(id)? {
            return Err(ConfigError::UnknownProject(id.to_string()).into());
        }

        *self
            .state
            .active_project
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(id.to_string());
        tracing::debug!(project = id, "Active project set");
        Ok(())
    }

    fn load(&self, seed: &Seed) -> Result<(), SeedError> {
        validate_seed(seed)?;
        self.state.catalog.apply_seed(seed)?;
        tracing::info!(projects = seed.projects.len(), "Seed loaded");
        Ok(())
    }

    fn set_log_level(&self, level: LogLevel) {
        logging::set_level(level);
    }

    fn set_log_format(&self, format: LogFormat) {
        logging::set_format(format);
    }

    async fn serve(
        &self,
        addrs: ListenAddrs,
        listening: oneshot::Sender<BoundAddrs>,
    ) -> Result<(), ListenerError> {
        let result = self.serve_listeners(addrs, listening).await;
        self.drained.trigger();
        result
    }

    async fn stop(&self, deadline: Instant) -> Result<(), ShutdownError> {
        let timeout = deadline.saturating_duration_since(Instant::now());
        self.shutdown.trigger();

        match tokio::time::timeout_at(deadline, self.drained.wait()).await {
            Ok(()) => Ok(()),
            Err(_) => {
                self.force.trigger();
                Err(ShutdownError::DeadlineExceeded { timeout })
            }
        }
    }
}

/// Middleware shared by both listeners.
#[allow(deprecated)]
fn with_layers(router: Router, listener: &'static str, request_timeout: Duration) -> Router {
    router
        .layer(middleware::from_fn_with_state(listener, metrics::track_requests))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}
