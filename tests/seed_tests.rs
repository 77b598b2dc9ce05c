//! Startup seeding against real storage.

use std::fs;

use serde_json::json;

use warehouse_emulator::engine::EmulatorEngine;
use warehouse_emulator::lifecycle::bootstrap;
use warehouse_emulator::storage::{Catalog, StorageHandle};
use warehouse_emulator::{Engine, Error};

mod common;

use common::test_config;

const SEED: &str = r#"
projects:
  - id: proj1
    datasets:
      - id: ds2
        tables:
          - id: people
            columns:
              - { name: id, type: INTEGER, mode: REQUIRED }
              - { name: name, type: STRING }
            data:
              - { id: 1, name: alice }
              - { id: 2, name: bob }
  - id: other
"#;

fn sorted(mut ids: Vec<String>) -> Vec<String> {
    ids.sort();
    ids
}

#[test]
fn test_file_seed_extends_configured_project() {
    let dir = tempfile::tempdir().unwrap();
    let seed_path = dir.path().join("seed.yaml");
    fs::write(&seed_path, SEED).unwrap();

    let mut config = test_config("proj1");
    config.project.dataset = Some("ds1".to_string());
    config.storage.data_from_yaml = Some(seed_path);

    let engine = bootstrap::<EmulatorEngine>(&config).unwrap();
    let catalog = engine.catalog();

    assert_eq!(engine.active_project().as_deref(), Some("proj1"));
    assert_eq!(
        sorted(catalog.project_ids().unwrap()),
        vec!["other".to_string(), "proj1".to_string()]
    );
    assert_eq!(
        sorted(catalog.dataset_ids("proj1").unwrap().unwrap()),
        vec!["ds1".to_string(), "ds2".to_string()]
    );

    let rows = catalog
        .table_rows("proj1", "ds2", "people")
        .unwrap()
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("name"), Some(&json!("alice")));
}

#[test]
fn test_file_backed_store_is_visible_to_a_second_connection() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("emulator.db");
    let seed_path = dir.path().join("seed.yaml");
    fs::write(&seed_path, SEED).unwrap();

    let mut config = test_config("proj1");
    config.storage.database = Some(db_path.clone());
    config.storage.data_from_yaml = Some(seed_path);

    let engine = bootstrap::<EmulatorEngine>(&config).unwrap();
    assert!(!engine.catalog().handle().is_ephemeral());

    let second = Catalog::open(StorageHandle::select(Some(db_path.as_path()))).unwrap();
    let project = second.project("proj1").unwrap().expect("seeded project");
    let people = project
        .dataset("ds2")
        .and_then(|d| d.table("people"))
        .expect("seeded table");
    assert_eq!(people.columns.len(), 2);
    assert_eq!(people.data.len(), 2);
    drop(engine);

    // A restart on the same file sees the earlier data and seeds again without conflict.
    let restarted = bootstrap::<EmulatorEngine>(&config).unwrap();
    let rows = restarted
        .catalog()
        .table_rows("proj1", "ds2", "people")
        .unwrap()
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[test]
fn test_reapplying_a_seed_is_idempotent() {
    let engine = EmulatorEngine::construct(StorageHandle::ephemeral()).unwrap();
    let seed = warehouse_emulator::seed::parse_seed_str(SEED).unwrap();

    engine.load(&seed).unwrap();
    let first = engine.catalog().project("proj1").unwrap();
    engine.load(&seed).unwrap();
    let second = engine.catalog().project("proj1").unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_invalid_seed_file_aborts_startup() {
    let dir = tempfile::tempdir().unwrap();
    let seed_path = dir.path().join("seed.yaml");
    fs::write(&seed_path, "projects:\n  - id: proj1\n  - id: proj1\n").unwrap();

    let mut config = test_config("proj1");
    config.storage.data_from_yaml = Some(seed_path);

    let err = bootstrap::<EmulatorEngine>(&config).unwrap_err();
    assert!(matches!(err, Error::Seed(_)), "got {:?}", err);
}

#[test]
fn test_separate_in_memory_stores_do_not_share_data() {
    let first = bootstrap::<EmulatorEngine>(&test_config("alpha")).unwrap();
    let second = bootstrap::<EmulatorEngine>(&test_config("beta")).unwrap();

    assert_eq!(first.catalog().project_ids().unwrap(), vec!["alpha".to_string()]);
    assert_eq!(second.catalog().project_ids().unwrap(), vec!["beta".to_string()]);
}
