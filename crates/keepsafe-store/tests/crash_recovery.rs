//! Recovery behaviour of the backup protocol under injected failures

#![allow(clippy::panic)]
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

mod common;

use bytes::Bytes;
use common::{FaultyBackend, key};
use keepsafe_store::{Backend, BackupState, RecordStore, StoreConfig, StoreError};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::{io::ErrorKind, time::Duration};
use tokio_util::sync::CancellationToken;

fn faulty_store() -> RecordStore<FaultyBackend> {
    RecordStore::new(FaultyBackend::in_memory(), StoreConfig::default())
        .expect("Store should be created")
}

fn encoded(value: &Value) -> Bytes {
    Bytes::from(serde_json::to_vec(value).expect("Encoding should succeed"))
}

fn io_kind(err: &StoreError) -> ErrorKind {
    match err {
        StoreError::Backend(io_err) => io_err.kind(),
        other => panic!("Expected Backend error, got {other:?}"),
    }
}

#[tokio::test]
async fn torn_primary_write_reads_previous_value() {
    let store = faulty_store();
    let v0 = json!({"generation": 0});
    store.write(&key("r"), &v0).await.expect("Write should succeed");

    store.backend().fail_writes(true);
    let err = store
        .write(&key("r"), &json!({"generation": 1, "padding": "x".repeat(64)}))
        .await
        .expect_err("Primary write should fail");
    assert_eq!(io_kind(&err), ErrorKind::Other);

    // The primary is torn, the backup still holds the previous value
    let memory = store.backend().inner();
    assert_eq!(memory.get(&key("r.old")), Some(encoded(&v0)));
    assert!(serde_json::from_slice::<Value>(&memory.get(&key("r")).unwrap()).is_err());

    store.backend().fail_writes(false);
    let loaded: Option<Value> = store.read(&key("r")).await.expect("Read should succeed");
    assert_eq!(loaded, Some(v0));
    assert!(memory.get(&key("r.old")).is_none());
    assert_eq!(store.stats().recoveries, 1);
}

#[tokio::test]
async fn crash_after_staging_recovers_staged_value() {
    let store = faulty_store();
    let v0 = json!(["a", "b"]);
    store.write(&key("r"), &v0).await.expect("Write should succeed");

    let state = store
        .coordinator()
        .stage_backup(&key("r"))
        .await
        .expect("Staging should succeed");
    assert_eq!(state, BackupState::Staged);

    // Simulated crash partway through the primary write
    store.backend().inner().insert(&key("r"), r#"["a", "b", "c"#);

    let loaded: Option<Value> = store.read(&key("r")).await.expect("Read should succeed");
    assert_eq!(loaded, Some(v0));
}

#[tokio::test]
async fn crash_before_retire_rolls_back_completed_write() {
    let store = faulty_store();
    let v0 = json!({"a": 0});
    let v1 = json!({"a": 1});
    store.write(&key("r"), &v0).await.expect("Write should succeed");

    store
        .coordinator()
        .stage_backup(&key("r"))
        .await
        .expect("Staging should succeed");
    store
        .backend()
        .write(&key("r"), encoded(&v1))
        .await
        .expect("Primary write should succeed");

    // The new value is complete on the primary but the backup was never
    // retired, so the read restores the previous value.
    let loaded: Option<Value> = store.read(&key("r")).await.expect("Read should succeed");
    assert_eq!(loaded, Some(v0));
}

#[tokio::test]
async fn failed_retire_surfaces_error_and_rolls_back() {
    let store = faulty_store();
    let v0 = json!("first");
    let v1 = json!("second");
    store.write(&key("r"), &v0).await.expect("Write should succeed");

    store.backend().fail_deletes(true);
    let err = store
        .write(&key("r"), &v1)
        .await
        .expect_err("Retiring the backup should fail");
    assert_eq!(io_kind(&err), ErrorKind::PermissionDenied);

    let memory = store.backend().inner();
    assert_eq!(memory.get(&key("r")), Some(encoded(&v1)));
    assert_eq!(memory.get(&key("r.old")), Some(encoded(&v0)));

    store.backend().fail_deletes(false);
    let loaded: Option<Value> = store.read(&key("r")).await.expect("Read should succeed");
    assert_eq!(loaded, Some(v0));
}

#[tokio::test]
async fn retire_backup_is_idempotent() {
    let store = faulty_store();
    store
        .write(&key("r"), &json!(1))
        .await
        .expect("Write should succeed");
    store
        .coordinator()
        .stage_backup(&key("r"))
        .await
        .expect("Staging should succeed");

    let coordinator = store.coordinator();
    for _ in 0..2 {
        coordinator
            .retire_backup(&key("r"))
            .await
            .expect("Retire should succeed");
        assert!(
            !coordinator
                .is_pending(&key("r"))
                .await
                .expect("Operation should succeed")
        );
    }
}

#[tokio::test]
async fn pending_backup_is_not_clobbered_by_next_write() {
    let store = faulty_store();
    let last_good = json!({"v": "last good"});
    let memory = store.backend().inner();

    memory.insert(&key("r"), r#"{"v": "to"#);
    memory.insert(&key("r.old"), encoded(&last_good));

    let state = store
        .coordinator()
        .stage_backup(&key("r"))
        .await
        .expect("Staging should succeed");
    assert_eq!(state, BackupState::AlreadyStaged);
    assert_eq!(memory.get(&key("r.old")), Some(encoded(&last_good)));

    store.backend().fail_writes(true);
    store
        .write(&key("r"), &json!({"v": "newer"}))
        .await
        .expect_err("Primary write should fail");
    assert_eq!(memory.get(&key("r.old")), Some(encoded(&last_good)));

    store.backend().fail_writes(false);
    let loaded: Option<Value> = store.read(&key("r")).await.expect("Read should succeed");
    assert_eq!(loaded, Some(last_good));
}

#[tokio::test]
async fn write_over_pending_backup_completes() {
    let store = faulty_store();
    let memory = store.backend().inner();
    memory.insert(&key("r"), "{");
    memory.insert(&key("r.old"), "0");

    store
        .write(&key("r"), &json!(2))
        .await
        .expect("Write should succeed");

    assert!(memory.get(&key("r.old")).is_none());
    let loaded: Option<Value> = store.read(&key("r")).await.expect("Read should succeed");
    assert_eq!(loaded, Some(json!(2)));
}

#[tokio::test]
async fn corrupt_primary_without_backup() {
    let store = faulty_store();
    store.backend().inner().insert(&key("r"), "{\"a\": tru");

    let err = store
        .read::<Value>(&key("r"))
        .await
        .expect_err("Corrupt record should fail");
    assert!(err.is_corrupt());
    assert!(!matches!(err, StoreError::Decode(_)));
}

#[tokio::test]
async fn failed_copy_removes_partial_backup() {
    let store = faulty_store();
    let v0 = json!({"keep": "me"});
    store.write(&key("r"), &v0).await.expect("Write should succeed");

    store.backend().fail_copies(true);
    let err = store
        .write(&key("r"), &json!({"keep": "not me"}))
        .await
        .expect_err("Staging should fail");
    assert_eq!(io_kind(&err), ErrorKind::StorageFull);

    let memory = store.backend().inner();
    assert!(memory.get(&key("r.old")).is_none());
    assert_eq!(memory.get(&key("r")), Some(encoded(&v0)));
}

#[tokio::test]
async fn failed_copy_reports_copy_error_over_cleanup_error() {
    let store = faulty_store();
    store
        .write(&key("r"), &json!("v0"))
        .await
        .expect("Write should succeed");

    store.backend().fail_copies(true);
    store.backend().fail_deletes(true);
    let err = store
        .write(&key("r"), &json!("v1"))
        .await
        .expect_err("Staging should fail");

    assert_eq!(io_kind(&err), ErrorKind::StorageFull);
}

#[tokio::test]
async fn cancelled_mid_write_recovers_previous_value() {
    let store = faulty_store();
    let v0 = json!({"step": 0});
    store.write(&key("r"), &v0).await.expect("Write should succeed");

    store.backend().hang_writes(true);
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let err = store
        .write_with_cancel(&key("r"), &json!({"step": 1, "pad": "0123456789"}), &token)
        .await
        .expect_err("Write should be cancelled");
    assert!(matches!(err, StoreError::Cancelled));
    assert!(store.is_pending(&key("r")).await.expect("Operation should succeed"));

    store.backend().hang_writes(false);
    let loaded: Option<Value> = store.read(&key("r")).await.expect("Read should succeed");
    assert_eq!(loaded, Some(v0));
}

#[tokio::test]
async fn backup_without_primary_is_restored() {
    let store = faulty_store();
    store.backend().inner().insert(&key("r.old"), "42");

    assert!(store.contains(&key("r")).await.expect("Operation should succeed"));
    let loaded: Option<Value> = store.read(&key("r")).await.expect("Read should succeed");
    assert_eq!(loaded, Some(json!(42)));
}
