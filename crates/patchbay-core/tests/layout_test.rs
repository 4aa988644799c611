#![allow(clippy::unwrap_used)]
// Layout persistence, restore and autosave against the fake routing daemon.

mod common;

use std::time::Duration;

use pretty_assertions::assert_eq;

use common::{FakeBridge, Harness, key, stereo_tables, tracked_keys};
use patchbay_core::{Connection, ConnectionKey, CoreError, LayoutSnapshot};

fn snapshot_of(pairs: &[ConnectionKey]) -> LayoutSnapshot {
    LayoutSnapshot {
        timestamp: chrono::Utc::now(),
        connections: pairs.to_vec(),
        tracked_connections: pairs.iter().cloned().map(Connection::from).collect(),
        ..LayoutSnapshot::default()
    }
}

fn write_snapshot(h: &Harness, snapshot: &LayoutSnapshot) {
    std::fs::write(h.layout_path(), serde_json::to_vec(snapshot).unwrap()).unwrap();
}

// ── Save / load ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_save_then_load_round_trips_the_graph() {
    let h = Harness::start(FakeBridge::default()).await;
    let reconciler = h.engine.reconciler();
    reconciler.connect("a:out", "b:in").await.unwrap();
    reconciler.connect("c:out", "d:in").await.unwrap();

    assert!(h.engine.layout().save().await.unwrap());
    let snapshot = h.engine.layout().load().await.unwrap();

    assert_eq!(snapshot.connections, tracked_keys(&h.engine));
    let tracked: Vec<_> = snapshot.tracked_connections.iter().map(Connection::key).collect();
    assert_eq!(tracked, tracked_keys(&h.engine));
}

#[tokio::test]
async fn test_snapshot_carries_alias_and_preset_tables() {
    let (aliases, presets) = stereo_tables();
    let h = Harness::start_with(FakeBridge::default(), |config| {
        config.aliases = aliases.clone();
        config.presets = presets.clone();
    })
    .await;

    h.engine.layout().save().await.unwrap();
    let snapshot = h.engine.layout().load().await.unwrap();

    assert_eq!(snapshot.device_config, aliases);
    assert_eq!(snapshot.presets.len(), 2);
    assert_eq!(snapshot.presets["passthrough"].name, "passthrough");
}

#[tokio::test]
async fn test_second_save_rotates_backup() {
    let h = Harness::start(FakeBridge::default()).await;
    let layout = h.engine.layout();

    h.engine.reconciler().connect("a:out", "b:in").await.unwrap();
    layout.save().await.unwrap();
    assert!(!layout.backup_path().exists());

    h.engine.reconciler().connect("c:out", "d:in").await.unwrap();
    layout.save().await.unwrap();

    let backup: LayoutSnapshot =
        serde_json::from_slice(&std::fs::read(layout.backup_path()).unwrap()).unwrap();
    assert_eq!(backup.connections, vec![key("a:out", "b:in")]);
    assert_eq!(layout.load().await.unwrap().connections.len(), 2);
}

#[tokio::test]
async fn test_save_is_skipped_when_unhealthy() {
    let h = Harness::start(FakeBridge::default()).await;
    h.bridge.set_running(false);

    assert!(!h.engine.layout().save().await.unwrap());
    assert!(!h.layout_path().exists());
}

#[tokio::test]
async fn test_load_without_file_is_no_saved_state() {
    let h = Harness::start(FakeBridge::default()).await;

    let err = h.engine.layout().load().await.unwrap_err();

    assert!(matches!(err, CoreError::NoSavedState { .. }), "got {err:?}");
}

// ── Restore ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_restore_converges_to_snapshot() {
    let h = Harness::start(FakeBridge::default()).await;
    let pairs = vec![
        key("a:out", "b:in"),
        key("c:out", "d:in"),
        key("e:out", "f:in"),
    ];
    write_snapshot(&h, &snapshot_of(&pairs));
    // Something unrelated is connected before the restore.
    h.bridge.add_connection("system:capture_1", "system:playback_1");

    let report = h.engine.layout().restore().await.unwrap();

    assert_eq!((report.restored, report.failed), (3, 0));
    assert_eq!(tracked_keys(&h.engine), pairs);
    assert_eq!(h.bridge.connections(), pairs);
}

#[tokio::test]
async fn test_restore_counts_individual_failures() {
    let h = Harness::start(FakeBridge::default()).await;
    write_snapshot(
        &h,
        &snapshot_of(&[key("a:out", "b:in"), key("gone:out", "b:in")]),
    );

    let report = h.engine.layout().restore().await.unwrap();

    assert_eq!((report.restored, report.failed), (1, 1));
    assert_eq!(h.bridge.connections(), vec![key("a:out", "b:in")]);
}

#[tokio::test]
async fn test_restore_requires_a_healthy_daemon() {
    let h = Harness::start(FakeBridge::default()).await;
    write_snapshot(&h, &snapshot_of(&[key("a:out", "b:in")]));
    h.bridge.set_running(false);

    let err = h.engine.layout().restore().await.unwrap_err();

    assert!(err.is_unavailable(), "got {err:?}");
}

#[tokio::test]
async fn test_corrupt_layout_is_preserved_and_startup_continues_empty() {
    let h = Harness::start(FakeBridge::default()).await;
    std::fs::write(h.layout_path(), b"{\"connections\": [oops").unwrap();
    let layout = h.engine.layout();

    let err = layout.restore().await.unwrap_err();
    assert!(matches!(err, CoreError::StateCorrupt { .. }), "got {err:?}");
    assert!(!h.layout_path().exists());
    assert_eq!(
        std::fs::read(layout.corrupt_path()).unwrap(),
        b"{\"connections\": [oops"
    );

    // Nothing left to restore; startup carries on with an empty layout.
    assert!(layout.restore_on_startup().await.unwrap().is_none());
    assert!(tracked_keys(&h.engine).is_empty());

    // A later save writes a fresh file and leaves the corrupt copy alone.
    h.engine.reconciler().connect("a:out", "b:in").await.unwrap();
    assert!(layout.save().await.unwrap());
    assert!(layout.corrupt_path().exists());
    assert_eq!(layout.load().await.unwrap().connections.len(), 1);
}

#[tokio::test]
async fn test_restore_on_startup_without_file() {
    let h = Harness::start(FakeBridge::default()).await;

    let report = h.engine.layout().restore_on_startup().await.unwrap();

    assert!(report.is_none());
    assert!(!h.engine.layout().is_starting_up());
}

#[tokio::test]
async fn test_engine_start_restores_then_save_round_trips() {
    let h = Harness::start(FakeBridge::default()).await;
    write_snapshot(&h, &snapshot_of(&[key("a:out", "b:in")]));

    let report = h.engine.start().await.unwrap();
    assert_eq!(report.restored, 1);

    assert!(h.engine.shutdown().await.unwrap());
    assert_eq!(
        h.engine.layout().load().await.unwrap().connections,
        vec![key("a:out", "b:in")]
    );
}

#[tokio::test]
async fn test_failed_startup_restore_is_retried_before_any_save() {
    let h = Harness::start(FakeBridge::default()).await;
    let pairs = vec![key("a:out", "b:in"), key("c:out", "d:in")];
    write_snapshot(&h, &snapshot_of(&pairs));
    let layout = h.engine.layout();

    h.bridge.set_running(false);
    assert!(h.engine.start().await.is_none());
    assert!(layout.is_restore_pending());
    assert!(!layout.save().await.unwrap());

    // Daemon is back: the next save restores instead of writing the
    // empty tracked graph over the layout.
    h.bridge.set_running(true);
    assert!(!layout.save().await.unwrap());
    assert!(!layout.is_restore_pending());
    assert_eq!(h.bridge.connections(), pairs);
    assert_eq!(layout.load().await.unwrap().connections, pairs);
    assert!(!layout.backup_path().exists());

    // From here on saves persist the restored graph as usual.
    assert!(layout.save().await.unwrap());
    assert_eq!(layout.load().await.unwrap().connections, pairs);
    let backup: LayoutSnapshot =
        serde_json::from_slice(&std::fs::read(layout.backup_path()).unwrap()).unwrap();
    assert_eq!(backup.connections, pairs);
}

#[tokio::test]
async fn test_shutdown_keeps_layout_while_restore_pending() {
    let h = Harness::start(FakeBridge::default()).await;
    let pairs = vec![key("e:out", "f:in")];
    write_snapshot(&h, &snapshot_of(&pairs));

    h.bridge.set_running(false);
    assert!(h.engine.start().await.is_none());
    h.bridge.set_running(true);

    assert!(!h.engine.shutdown().await.unwrap());
    assert!(h.bridge.connections().is_empty());
    assert_eq!(h.engine.layout().load().await.unwrap().connections, pairs);
}

// ── Autosave ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_autosave_writes_periodically_and_stops() {
    let h = Harness::start(FakeBridge::default()).await;
    let layout = h.engine.layout();
    h.engine.reconciler().connect("a:out", "b:in").await.unwrap();

    layout.start_autosave(Duration::from_millis(50)).await;
    assert!(layout.is_autosaving().await);

    tokio::time::sleep(Duration::from_millis(400)).await;
    layout.stop_autosave().await;

    assert!(!layout.is_autosaving().await);
    assert_eq!(
        layout.load().await.unwrap().connections,
        vec![key("a:out", "b:in")]
    );
}

#[tokio::test]
async fn test_restarting_autosave_replaces_the_task() {
    let h = Harness::start(FakeBridge::default()).await;
    let layout = h.engine.layout();

    layout.start_autosave(Duration::from_secs(3600)).await;
    layout.start_autosave(Duration::from_secs(3600)).await;
    assert!(layout.is_autosaving().await);

    layout.start_autosave(Duration::ZERO).await;
    assert!(!layout.is_autosaving().await);
}

#[tokio::test]
async fn test_shutdown_saves_and_stops_autosave() {
    let h = Harness::start(FakeBridge::default()).await;
    h.engine.reconciler().connect("c:out", "d:in").await.unwrap();
    h.engine
        .layout()
        .start_autosave(Duration::from_secs(3600))
        .await;

    assert!(h.engine.shutdown().await.unwrap());

    assert!(!h.engine.layout().is_autosaving().await);
    assert!(h.layout_path().exists());
}

#[tokio::test]
async fn test_autosave_after_failed_startup_restore_keeps_the_layout() {
    let h = Harness::start(FakeBridge::default()).await;
    let pairs = vec![key("a:out", "b:in"), key("c:out", "d:in")];
    write_snapshot(&h, &snapshot_of(&pairs));
    let layout = h.engine.layout();

    h.bridge.set_running(false);
    assert!(h.engine.start().await.is_none());
    layout.start_autosave(Duration::from_millis(50)).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    h.bridge.set_running(true);
    tokio::time::sleep(Duration::from_millis(400)).await;
    layout.stop_autosave().await;

    assert_eq!(h.bridge.connections(), pairs);
    assert_eq!(layout.load().await.unwrap().connections, pairs);
    if layout.backup_path().exists() {
        let backup: LayoutSnapshot =
            serde_json::from_slice(&std::fs::read(layout.backup_path()).unwrap()).unwrap();
        assert_eq!(backup.connections, pairs);
    }
}
