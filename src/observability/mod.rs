//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, reloadable level/format)
//!     → metrics.rs (request counters, latency, lifecycle gauge)
//!
//! Consumers:
//!     → stdout (console or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
