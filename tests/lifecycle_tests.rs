//! End-to-end lifecycle tests: bootstrap, serve both listeners, shut down.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use warehouse_emulator::config::{ConfigError, ValidationError};
use warehouse_emulator::engine::EmulatorEngine;
use warehouse_emulator::lifecycle::{self, bootstrap, Coordinator, LifecycleState, Signal};
use warehouse_emulator::net::ListenerError;
use warehouse_emulator::Error;

mod common;

use common::{test_config, wait_for_serving, FakeSignal};

#[tokio::test]
async fn test_serve_both_listeners_then_terminate() {
    let mut config = test_config("proj1");
    config.project.dataset = Some("ds1".to_string());

    let engine = bootstrap::<EmulatorEngine>(&config).unwrap();
    let coordinator = Coordinator::new(Arc::new(engine), config.lifecycle.shutdown_timeout());
    let mut status = coordinator.subscribe();

    let (signal, signal_fut) = FakeSignal::new();
    let handle = tokio::spawn(coordinator.run(config.listener.addrs(), signal_fut));
    let addrs = wait_for_serving(&mut status).await;

    let client = reqwest::Client::new();
    let datasets: Value = client
        .get(format!("http://{}/v2/projects/proj1/datasets", addrs.http))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        datasets,
        json!({ "datasets": [{ "id": "ds1", "projectId": "proj1" }] })
    );

    let active: Value = client
        .post(format!("http://{}/rpc/GetActiveProject", addrs.grpc))
        .json(&json!({}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(active["projectId"], "proj1");

    let rpc_datasets: Value = client
        .post(format!("http://{}/rpc/ListDatasets", addrs.grpc))
        .json(&json!({}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rpc_datasets["datasets"], json!(["ds1"]));

    signal.raise(Signal::Terminate);
    let report = tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .expect("coordinator should exit after the signal")
        .unwrap()
        .expect("clean shutdown");

    assert_eq!(report.signal, Some(Signal::Terminate));
    assert_eq!(report.stop_error, None);
    assert_eq!(status.borrow().state, LifecycleState::Stopped);

    // Both listeners are closed.
    assert!(client
        .get(format!("http://{}/health", addrs.http))
        .send()
        .await
        .is_err());
    assert!(client
        .get(format!("http://{}/health", addrs.grpc))
        .send()
        .await
        .is_err());
}

#[tokio::test]
async fn test_interrupt_while_idle_exits_cleanly() {
    let config = test_config("proj1");
    let engine = bootstrap::<EmulatorEngine>(&config).unwrap();
    let coordinator = Coordinator::new(Arc::new(engine), config.lifecycle.shutdown_timeout());
    let mut status = coordinator.subscribe();

    let (signal, signal_fut) = FakeSignal::new();
    let handle = tokio::spawn(coordinator.run(config.listener.addrs(), signal_fut));
    wait_for_serving(&mut status).await;

    signal.raise(Signal::Interrupt);
    let report = tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(report.signal, Some(Signal::Interrupt));
}

#[tokio::test]
async fn test_missing_project_fails_before_listening() {
    let config = test_config("");
    let (_signal, signal_fut) = FakeSignal::new();

    let err = lifecycle::run_until(&config, signal_fut).await.unwrap_err();
    match err {
        Error::Config(ConfigError::Validation(errors)) => {
            assert!(errors.contains(&ValidationError::MissingProject));
        }
        other => panic!("expected a validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unopenable_database_is_a_storage_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config("proj1");
    config.storage.database = Some(dir.path().join("no/such/dir/emulator.db"));
    let (_signal, signal_fut) = FakeSignal::new();

    let err = lifecycle::run_until(&config, signal_fut).await.unwrap_err();
    assert!(matches!(err, Error::Storage(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_unreadable_seed_file_is_a_seed_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config("proj1");
    config.storage.data_from_yaml = Some(dir.path().join("missing.yaml"));
    let (_signal, signal_fut) = FakeSignal::new();

    let err = lifecycle::run_until(&config, signal_fut).await.unwrap_err();
    assert!(matches!(err, Error::Seed(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_port_in_use_is_a_listener_error() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = test_config("proj1");
    config.listener.http_port = taken.local_addr().unwrap().port();
    let (_signal, signal_fut) = FakeSignal::new();

    let err = tokio::time::timeout(
        Duration::from_secs(10),
        lifecycle::run_until(&config, signal_fut),
    )
    .await
    .expect("bind failure should end the run")
    .unwrap_err();

    assert!(
        matches!(err, Error::Listener(ListenerError::Bind { listener: "rest", .. })),
        "got {:?}",
        err
    );
}
