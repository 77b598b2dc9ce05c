//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global tracing subscriber
//! - Swap log level and output format at runtime
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for machines, console format for people
//! - `RUST_LOG` wins over the configured level when it is set; the lifecycle
//!   directive is appended to it
//! - The lifecycle target is always enabled at info so operators see listener
//!   addresses, signal receipt and shutdown failures even at the default `error` level

use std::sync::OnceLock;

use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, reload, EnvFilter, Layer, Registry};

use crate::config::{LogFormat, LogLevel};

/// Target used for operator-visible lifecycle messages.
pub const LIFECYCLE_TARGET: &str = "warehouse_emulator::lifecycle";

type Filtered = Layered<reload::Layer<EnvFilter, Registry>, Registry>;
type FormatLayer = Box<dyn Layer<Filtered> + Send + Sync>;

struct LogControl {
    filter: reload::Handle<EnvFilter, Registry>,
    format: reload::Handle<FormatLayer, Filtered>,
}

static CONTROL: OnceLock<LogControl> = OnceLock::new();

/// Install the global subscriber.
pub fn init(level: LogLevel, format: LogFormat) -> Result<(), TryInitError> {
    let (filter, filter_handle) = reload::Layer::new(filter_for(level));
    let (format_layer, format_handle) = reload::Layer::new(format_layer(format));

    tracing_subscriber::registry()
        .with(filter)
        .with(format_layer)
        .try_init()?;

    let _ = CONTROL.set(LogControl {
        filter: filter_handle,
        format: format_handle,
    });
    Ok(())
}

/// Change the active log level. No-op unless `init` installed the subscriber.
pub fn set_level(level: LogLevel) {
    if let Some(control) = CONTROL.get() {
        if let Err(e) = control.filter.reload(filter_for(level)) {
            tracing::warn!(error = %e, %level, "Failed to change log level");
        }
    }
}

/// Change the output format. No-op unless `init` installed the subscriber.
pub fn set_format(format: LogFormat) {
    if let Some(control) = CONTROL.get() {
        if let Err(e) = control.format.reload(format_layer(format)) {
            tracing::warn!(error = %e, %format, "Failed to change log format");
        }
    }
}

fn filter_for(level: LogLevel) -> EnvFilter {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    EnvFilter::new(directives(env.as_deref(), level))
}

/// `RUST_LOG` replaces the configured level but never hides the lifecycle target.
fn directives(env: Option<&str>, level: LogLevel) -> String {
    let base = env
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(level.as_directive());
    format!("{},{}=info", base, LIFECYCLE_TARGET)
}

fn format_layer(format: LogFormat) -> FormatLayer {
    match format {
        LogFormat::Console => fmt::layer().with_target(false).boxed(),
        LogFormat::Json => fmt::layer().json().with_current_span(false).boxed(),
    }
}
