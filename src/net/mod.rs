//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ListenAddrs (host:http_port, host:grpc_port)
//!     → listener.rs (bind, report local address)
//!     → Hand off to the engine's REST and RPC routers
//! ```

pub mod listener;

pub use listener::{Listener, ListenerError};
