#![allow(clippy::unwrap_used)]
// Preset validation and application against the fake routing daemon.

mod common;

use std::collections::BTreeMap;

use pretty_assertions::assert_eq;

use common::{FakeBridge, Harness, key, stereo_tables, tracked_keys};
use patchbay_core::{ApplyOptions, CoreError, ItemOutcome, Preset, PresetConnection};

async fn stereo_harness() -> Harness {
    let (aliases, presets) = stereo_tables();
    Harness::start_with(FakeBridge::default(), |config| {
        config.aliases = aliases;
        config.presets = presets;
    })
    .await
}

fn passthrough_keys() -> Vec<patchbay_core::ConnectionKey> {
    vec![
        key("system:capture_1", "system:playback_1"),
        key("system:capture_2", "system:playback_2"),
    ]
}

#[tokio::test]
async fn test_stereo_passthrough_replaces_existing_routing() {
    let h = stereo_harness().await;
    h.bridge.add_connection("a:out", "b:in");

    let report = h
        .engine
        .presets()
        .apply("passthrough", ApplyOptions::default())
        .await
        .unwrap();

    assert_eq!(report.preset, "passthrough");
    assert!(report.cleared_first);
    assert!(!report.dry_run);
    assert_eq!((report.total, report.successful, report.failed), (2, 2, 0));
    assert_eq!(report.items[0].from_alias, "mic_l");
    assert_eq!(report.items[0].from.as_deref(), Some("system:capture_1"));
    assert_eq!(h.bridge.connections(), passthrough_keys());
    assert_eq!(tracked_keys(&h.engine), passthrough_keys());
}

#[tokio::test]
async fn test_apply_without_clear_keeps_existing_routing() {
    let h = stereo_harness().await;
    h.engine.reconciler().connect("a:out", "b:in").await.unwrap();

    let report = h
        .engine
        .presets()
        .apply(
            "passthrough",
            ApplyOptions {
                clear_first: false,
                dry_run: false,
            },
        )
        .await
        .unwrap();

    assert!(!report.cleared_first);
    assert_eq!(report.successful, 2);
    assert_eq!(h.bridge.connections().len(), 3);
    assert_eq!(h.hits("POST", "/clear").await, 0);
}

#[tokio::test]
async fn test_dry_run_has_no_side_effects_and_same_shape() {
    let h = stereo_harness().await;
    h.bridge.add_connection("a:out", "b:in");

    let dry = h
        .engine
        .presets()
        .apply(
            "passthrough",
            ApplyOptions {
                clear_first: true,
                dry_run: true,
            },
        )
        .await
        .unwrap();

    assert!(dry.dry_run);
    assert!(!dry.cleared_first);
    assert_eq!((dry.total, dry.successful, dry.failed), (2, 2, 0));
    assert!(dry.items.iter().all(|i| i.outcome == ItemOutcome::Validated));
    assert_eq!(
        h.server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.method.as_str() == "POST")
            .count(),
        0
    );
    assert_eq!(h.bridge.connections(), vec![key("a:out", "b:in")]);

    let real = h
        .engine
        .presets()
        .apply("passthrough", ApplyOptions::default())
        .await
        .unwrap();
    assert_eq!(real.items.len(), dry.items.len());
    for (d, r) in dry.items.iter().zip(&real.items) {
        assert_eq!((&d.from, &d.to), (&r.from, &r.to));
    }
}

#[tokio::test]
async fn test_unresolved_alias_counts_as_failure() {
    let h = stereo_harness().await;

    let report = h
        .engine
        .presets()
        .apply("broken", ApplyOptions::default())
        .await
        .unwrap();

    assert_eq!((report.total, report.successful, report.failed), (2, 1, 1));
    let failed = &report.items[1];
    assert_eq!(failed.from_alias, "synth");
    assert_eq!(failed.from, None);
    match &failed.outcome {
        ItemOutcome::Failed { error } => assert!(error.contains("synth"), "{error}"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(
        h.bridge.connections(),
        vec![key("system:capture_1", "system:playback_1")]
    );
}

#[tokio::test]
async fn test_validate_reports_missing_aliases() {
    let h = stereo_harness().await;

    let ok = h.engine.presets().validate("passthrough").unwrap();
    assert!(ok.is_valid());
    assert_eq!(ok.valid.len(), 2);

    let broken = h.engine.presets().validate("broken").unwrap();
    assert!(!broken.is_valid());
    assert_eq!(broken.invalid.len(), 1);
    assert_eq!(broken.invalid[0].missing, vec!["synth".to_owned()]);
    assert_eq!(h.server.received_requests().await.unwrap().len(), 0);
}

#[tokio::test]
async fn test_unknown_preset() {
    let h = stereo_harness().await;

    let err = h.engine.presets().validate("nope").unwrap_err();
    assert!(matches!(err, CoreError::PresetNotFound { .. }), "got {err:?}");

    let err = h
        .engine
        .presets()
        .apply("nope", ApplyOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::PresetNotFound { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_list_presets() {
    let h = stereo_harness().await;

    let list = h.engine.presets().list();

    let names: Vec<_> = list.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["broken", "passthrough"]);
    assert_eq!(list[1].connections, 2);
}

#[tokio::test]
async fn test_reloaded_tables_apply_to_next_run() {
    let h = stereo_harness().await;
    let (mut aliases, mut presets) = stereo_tables();
    aliases.insert("synth".into(), "a:out".into());
    presets.insert(
        "synth".into(),
        Preset {
            name: String::new(),
            description: "Synth to left monitor".into(),
            connections: vec![PresetConnection {
                from: "synth".into(),
                to: "out_l".into(),
            }],
        },
    );

    h.engine.reload_tables(aliases, presets);

    let broken = h.engine.presets().validate("broken").unwrap();
    assert!(broken.is_valid());
    let report = h
        .engine
        .presets()
        .apply("synth", ApplyOptions::default())
        .await
        .unwrap();
    assert_eq!(report.successful, 1);
    assert_eq!(h.bridge.connections(), vec![key("a:out", "system:playback_1")]);

    // Emptying the tables is visible immediately too.
    h.engine.reload_tables(BTreeMap::new(), BTreeMap::new());
    assert!(h.engine.presets().list().is_empty());
}
