//! Configuration validation.
//!
//! Serde and clap handle syntax (unknown log levels never get this far);
//! this module checks the values make sense together. All errors are
//! returned, not just the first.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::EmulatorConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("the required flag --project was not specified")]
    MissingProject,

    #[error("listener host must not be empty")]
    EmptyHost,

    #[error("http and grpc listeners both use port {0}")]
    PortConflict(u16),

    #[error("request timeout must be greater than zero")]
    ZeroRequestTimeout,

    #[error("shutdown timeout must be greater than zero")]
    ZeroShutdownTimeout,

    #[error("invalid metrics address {0:?}")]
    InvalidMetricsAddress(String),
}

/// Validate a fully merged configuration.
pub fn validate_config(config: &EmulatorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.project.id.trim().is_empty() {
        errors.push(ValidationError::MissingProject);
    }

    let listener = &config.listener;
    if listener.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }
    // Port 0 asks the OS for a free port, so two zeros never collide.
    if listener.http_port != 0 && listener.http_port == listener.grpc_port {
        errors.push(ValidationError::PortConflict(listener.http_port));
    }
    if listener.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if config.lifecycle.shutdown_timeout_secs == 0 {
        errors.push(ValidationError::ZeroShutdownTimeout);
    }

    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidMetricsAddress(addr.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
