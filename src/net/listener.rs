//! TCP listener binding.
//!
//! # Responsibilities
//! - Bind each protocol surface to its configured `host:port`
//! - Report the address actually bound (port 0 picks a free port)
//! - Name the listener in every error so a bind failure is attributable

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("{listener} listener failed to bind {addr}: {source}")]
    Bind {
        listener: &'static str,
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The listener stopped with an I/O error while serving.
    #[error("{listener} listener failed: {source}")]
    Serve {
        listener: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// A bound listener and the name of the surface it serves.
#[derive(Debug)]
pub struct Listener {
    name: &'static str,
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind `addr` (a `host:port` string) for the surface called `name`.
    pub async fn bind(name: &'static str, addr: &str) -> Result<Self, ListenerError> {
        let bind_error = |source| ListenerError::Bind {
            listener: name,
            addr: addr.to_string(),
            source,
        };

        let inner = TcpListener::bind(addr).await.map_err(bind_error)?;
        let local_addr = inner.local_addr().map_err(bind_error)?;

        tracing::debug!(listener = name, address = %local_addr, "Listener bound");

        Ok(Self {
            name,
            inner,
            local_addr,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn into_inner(self) -> TcpListener {
        self.inner
    }
}
