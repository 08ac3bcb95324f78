use std::fs;

use httpmock::prelude::*;
use serde_json::json;
use swanwatch_common::config::RunOptions;
use swanwatch_common::error::AuditError;
use swanwatch_common::tunnel::{Status, TunnelStatus};
use swanwatch_core::inventory::{InventoryClient, SEARCH_CHILD_PATH};
use swanwatch_core::run_audit;

use super::fakes::{FakeInventory, FakeNetwork, RecordingTerminator, config, record};

fn two_tunnels() -> FakeInventory {
    FakeInventory::Rows(vec![
        record("u2", "Globex-10.0.7.9", "10.0.7.9/32"),
        record("u1", "Acme - 10.0.5.9", "10.0.5.9/32"),
    ])
}

/// The reference scenario: one tunnel answers, the other does not, and the offline
/// one is torn down exactly once after the report is on disk.
#[tokio::test]
async fn audit_reports_in_tunnel_order_and_terminates_offline_tunnel() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir.path().join("tunnels.json"));
    let network = FakeNetwork::with_live(&["10.0.5.9"]);
    let mut terminator = RecordingTerminator::default();

    let summary = run_audit(
        &cfg,
        RunOptions::default(),
        &two_tunnels(),
        &network.prober(),
        &mut terminator,
    )
    .await
    .unwrap();

    let expected = vec![
        TunnelStatus {
            tunnel_number: 5,
            company: "Acme".to_string(),
            status: Status::On,
            uuid: "u1".to_string(),
        },
        TunnelStatus {
            tunnel_number: 7,
            company: "Globex-10.0.7.9".to_string(),
            status: Status::Off,
            uuid: "u2".to_string(),
        },
    ];
    assert_eq!(summary.statuses, expected);
    assert_eq!((summary.online(), summary.offline()), (1, 1));

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&cfg.output_path).unwrap()).unwrap();
    assert_eq!(
        written,
        json!([
            { "tunel": 5, "empresa": "Acme", "status": "ON", "uuid": "u1" },
            { "tunel": 7, "empresa": "Globex-10.0.7.9", "status": "OFF", "uuid": "u2" }
        ])
    );

    assert_eq!(terminator.terminated, vec!["u2".to_string()]);
    assert!(terminator.closed);
    let remediation = summary.remediation.unwrap();
    assert_eq!(remediation.terminated, vec!["u2".to_string()]);
    assert!(remediation.failed.is_empty());

    assert_eq!(network.probes("10.0.5.9"), 1);
}

#[tokio::test]
async fn dry_run_writes_report_but_terminates_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir.path().join("tunnels.json"));
    let network = FakeNetwork::with_live(&[]);
    let mut terminator = RecordingTerminator::default();

    let summary = run_audit(
        &cfg,
        RunOptions { remediate: false },
        &two_tunnels(),
        &network.prober(),
        &mut terminator,
    )
    .await
    .unwrap();

    assert_eq!(summary.offline(), 2);
    assert!(summary.remediation.is_none());
    assert!(terminator.terminated.is_empty());
    assert!(cfg.output_path.exists());
}

#[tokio::test]
async fn all_online_never_touches_the_terminator() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir.path().join("tunnels.json"));
    let network = FakeNetwork::with_live(&["10.0.5.9", ""]);
    let mut terminator = RecordingTerminator::default();

    let summary = run_audit(
        &cfg,
        RunOptions::default(),
        &two_tunnels(),
        &network.prober(),
        &mut terminator,
    )
    .await
    .unwrap();

    assert_eq!(summary.online(), 2);
    assert!(summary.remediation.is_none());
    assert!(!terminator.closed);
}

#[tokio::test]
async fn terminator_failures_are_collected_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir.path().join("tunnels.json"));
    let network = FakeNetwork::with_live(&[]);
    let mut terminator = RecordingTerminator {
        refuse: ["u1".to_string()].into_iter().collect(),
        ..Default::default()
    };

    let summary = run_audit(
        &cfg,
        RunOptions::default(),
        &two_tunnels(),
        &network.prober(),
        &mut terminator,
    )
    .await
    .unwrap();

    let remediation = summary.remediation.unwrap();
    assert_eq!(remediation.terminated, vec!["u2".to_string()]);
    assert_eq!(remediation.failed.len(), 1);
    assert_eq!(remediation.failed[0].0, "u1");
    assert_eq!(remediation.attempted(), 2);
}

#[tokio::test]
async fn unnumbered_tunnel_stops_the_run_before_any_report() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir.path().join("tunnels.json"));
    let inventory = FakeInventory::Rows(vec![
        record("u1", "Acme - 10.0.5.9", "10.0.5.9/32"),
        record("u3", "Initech - 10.20.1.1", "10.20/32"),
    ]);
    let network = FakeNetwork::with_live(&["10.0.5.9"]);
    let mut terminator = RecordingTerminator::default();

    let err = run_audit(
        &cfg,
        RunOptions::default(),
        &inventory,
        &network.prober(),
        &mut terminator,
    )
    .await
    .unwrap_err();

    match err {
        AuditError::Derivation(e) => {
            assert_eq!(e.uuid, "u3");
            assert_eq!(e.company, "Initech");
            assert_eq!(e.raw, "");
        }
        other => panic!("expected a derivation error, got {other:?}"),
    }
    assert!(!cfg.output_path.exists());
    assert_eq!(network.probes("10.0.5.9"), 0);
}

#[tokio::test]
async fn inventory_failure_is_fatal_and_leaves_no_report() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir.path().join("tunnels.json"));
    let network = FakeNetwork::with_live(&[]);
    let mut terminator = RecordingTerminator::default();

    let err = run_audit(
        &cfg,
        RunOptions::default(),
        &FakeInventory::Unauthorized,
        &network.prober(),
        &mut terminator,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AuditError::Inventory(_)), "{err:?}");
    assert!(!cfg.output_path.exists());
}

#[tokio::test]
async fn empty_connection_writes_an_empty_report() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir.path().join("tunnels.json"));
    let network = FakeNetwork::with_live(&[]);
    let mut terminator = RecordingTerminator::default();

    let summary = run_audit(
        &cfg,
        RunOptions::default(),
        &FakeInventory::Rows(Vec::new()),
        &network.prober(),
        &mut terminator,
    )
    .await
    .unwrap();

    assert!(summary.statuses.is_empty());
    assert_eq!(fs::read_to_string(&cfg.output_path).unwrap(), "[]");
}

/// Same scenario as above, but the rows come over HTTP from a mock firewall.
#[tokio::test]
async fn audit_over_http_inventory() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path(SEARCH_CHILD_PATH)
            .body_includes("\"connection\":\"conn-1\"");
        then.status(200).json_body(json!({
            "rows": [
                { "uuid": "u1", "description": "Acme - 10.0.5.9", "remote_ts": "10.0.5.9/32" },
                { "uuid": "u2", "description": "Globex-10.0.7.9", "remote_ts": "10.0.7.9/32" },
                { "uuid": "u4", "description": null, "remote_ts": "10.0.6.1/32" }
            ]
        }));
    });

    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir.path().join("tunnels.json"));
    let inventory =
        InventoryClient::with_base_url(server.base_url(), "key", "secret", "conn-1").unwrap();
    let network = FakeNetwork::with_live(&["10.0.5.9"]);
    let mut terminator = RecordingTerminator::default();

    let summary = run_audit(
        &cfg,
        RunOptions::default(),
        &inventory,
        &network.prober(),
        &mut terminator,
    )
    .await
    .unwrap();

    mock.assert();
    let numbers: Vec<u32> = summary.statuses.iter().map(|s| s.tunnel_number).collect();
    assert_eq!(numbers, vec![5, 6, 7]);
    assert_eq!(summary.statuses[1].company, "");
    assert_eq!(terminator.terminated, vec!["u4".to_string(), "u2".to_string()]);
}
