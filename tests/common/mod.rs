//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::time::Duration;

use tokio::sync::{oneshot, watch};

use warehouse_emulator::config::EmulatorConfig;
use warehouse_emulator::lifecycle::{BoundAddrs, LifecycleState, Signal, Status};

/// Config bound to loopback on OS-assigned ports.
pub fn test_config(project: &str) -> EmulatorConfig {
    let mut config = EmulatorConfig::default();
    config.project.id = project.to_string();
    config.listener.host = "127.0.0.1".to_string();
    config.listener.http_port = 0;
    config.listener.grpc_port = 0;
    config.lifecycle.shutdown_timeout_secs = 5;
    config
}

/// A termination signal the test raises by hand.
pub struct FakeSignal {
    tx: oneshot::Sender<Signal>,
}

impl FakeSignal {
    pub fn new() -> (Self, impl Future<Output = Signal> + Send + 'static) {
        let (tx, rx) = oneshot::channel();
        let fut = async move {
            match rx.await {
                Ok(signal) => signal,
                // Test dropped the handle without raising: never fire.
                Err(_) => std::future::pending().await,
            }
        };
        (Self { tx }, fut)
    }

    pub fn raise(self, signal: Signal) {
        let _ = self.tx.send(signal);
    }
}

/// Wait until the lifecycle reports both listeners bound.
pub async fn wait_for_serving(status: &mut watch::Receiver<Status>) -> BoundAddrs {
    let status = tokio::time::timeout(
        Duration::from_secs(5),
        status.wait_for(|s| s.state == LifecycleState::Serving && s.addrs.is_some()),
    )
    .await
    .expect("emulator did not start serving in time")
    .expect("status channel closed");
    status.addrs.expect("serving status carries addresses")
}

/// Poll until `addr` accepts HTTP, for tests that cannot observe the status channel.
pub async fn wait_for_http(client: &reqwest::Client, url: &str) {
    for _ in 0..100 {
        if client.get(url).send().await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("{} never became reachable", url);
}
