//! Metrics collection and exposition.
//!
//! # Metrics
//! - `emulator_requests_total` (counter): requests by listener, method, status
//! - `emulator_request_duration_seconds` (histogram): latency by listener
//! - `emulator_lifecycle_state` (gauge): 0 starting, 1 serving, 2 draining, 3 stopped

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::lifecycle::LifecycleState;

/// Install the Prometheus exporter on `addr`. Must run inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(listener: &'static str, method: &str, status: u16, start: Instant) {
    counter!(
        "emulator_requests_total",
        "listener" => listener,
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("emulator_request_duration_seconds", "listener" => listener)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_lifecycle_state(state: LifecycleState) {
    gauge!("emulator_lifecycle_state").set(state as u8 as f64);
}

/// Router middleware recording every request against the listener in `State`.
pub async fn track_requests(
    State(listener): State<&'static str>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let response = next.run(request).await;
    record_request(listener, &method, response.status().as_u16(), start);
    response
}
