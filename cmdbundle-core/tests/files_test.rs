mod common;

use std::sync::Arc;

use cmdbundle_core::host::LocalFileAccess;
use cmdbundle_core::{Actor, EngineConfig};
use common::{RecordingHost, executor, lines, services};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_yaml_write_then_read() {
    let dir = tempfile::tempdir().unwrap();
    let host = RecordingHost::new();
    let alice = host.add_player("Alice");
    let files = Arc::new(LocalFileAccess::new(dir.path()));
    let executor = executor(
        services(host.clone()).with_files(files),
        EngineConfig::default(),
    );

    executor
        .invoke(
            &lines(&[
                "say saved ;;cmdbundle-scores.yml::players.%player%::42",
                "say score ,,cmdbundle-scores.yml::players.Alice",
            ]),
            alice,
            &[],
        )
        .await
        .wait()
        .await;

    let dispatched: Vec<String> = host
        .dispatched()
        .iter()
        .map(|l| l.trim().to_string())
        .collect();
    assert_eq!(dispatched, vec!["say saved", "say score 42"]);

    let written = std::fs::read_to_string(dir.path().join("cmdbundle-scores.yml")).unwrap();
    let doc: serde_yaml::Value = serde_yaml::from_str(&written).unwrap();
    assert_eq!(doc["players"]["Alice"], serde_yaml::Value::from(42));
}

#[tokio::test]
async fn test_plain_write_then_read() {
    let dir = tempfile::tempdir().unwrap();
    let host = RecordingHost::new();
    let files = Arc::new(LocalFileAccess::new(dir.path()));
    let executor = executor(
        services(host.clone()).with_files(files),
        EngineConfig::default(),
    );

    executor
        .invoke(
            &lines(&["say ok ;;cmdbundle-motd.txt::welcome", "say ,,cmdbundle-motd.txt"]),
            Actor::Console,
            &[],
        )
        .await
        .wait()
        .await;

    let dispatched: Vec<String> = host
        .dispatched()
        .iter()
        .map(|l| l.trim().to_string())
        .collect();
    assert_eq!(dispatched, vec!["say ok", "say welcome"]);
}

#[tokio::test]
async fn test_missing_file_reads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let host = RecordingHost::new();
    let files = Arc::new(LocalFileAccess::new(dir.path()));
    let executor = executor(
        services(host.clone()).with_files(files),
        EngineConfig::default(),
    );
    executor
        .invoke(&lines(&["say [,,cmdbundle-nothing.txt]"]), Actor::Console, &[])
        .await
        .wait()
        .await;
    assert_eq!(host.dispatched(), vec!["say []"]);
}
