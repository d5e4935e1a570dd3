//! Orchestrator integration tests.
//!
//! Tests the full flow: config -> build -> start -> datagrams over loopback
//! -> operator filter edits -> shutdown -> daily file contents.

use std::path::Path;
use std::time::Duration;

use syslens_core::config::SyslensConfig;
use syslens_daemon::orchestrator::Orchestrator;
use syslens_log_pipeline::sink::DailyRecord;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// Loopback listener on an ephemeral port, storage into `log_dir`, no console.
fn archive_config(log_dir: &Path) -> SyslensConfig {
    let toml_str = format!(
        r#"
[general]
log_level = "info"

[listener]
bind_addr = "127.0.0.1"
port = 0

[display]
enabled = false

[storage]
enabled = true
log_dir = "{}"
file_prefix = "edge"
"#,
        log_dir.display()
    );
    SyslensConfig::parse(&toml_str).expect("failed to parse test config")
}

async fn send(orchestrator: &Orchestrator, datagram: &[u8]) {
    let target = orchestrator
        .local_addr()
        .expect("listener should be bound");
    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    sender.send_to(datagram, target).await.unwrap();
}

async fn wait_until(mut done: impl FnMut() -> bool) {
    for _ in 0..300 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within 3s");
}

/// All records from every daily file in `dir`.
fn archived_records(dir: &Path) -> Vec<DailyRecord> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    paths.sort();
    paths
        .iter()
        .flat_map(|path| {
            std::fs::read_to_string(path)
                .unwrap()
                .lines()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect::<Vec<DailyRecord>>()
        })
        .collect()
}

#[tokio::test]
async fn test_operator_filter_controls_archive() {
    // Given: a running daemon with a channel standing in for stdin
    let dir = tempfile::tempdir().unwrap();
    let (lines_tx, lines_rx) = mpsc::channel(4);
    let mut orchestrator = Orchestrator::build_from_config(archive_config(dir.path()))
        .expect("orchestrator should build")
        .with_filter_input(lines_rx);
    orchestrator.start().await.expect("orchestrator should start");

    // When: the operator narrows the stream to sshd
    lines_tx.send("process=sshd".to_owned()).await.unwrap();
    let filter = orchestrator.active_filter();
    wait_until(|| filter.load().query() == "process=sshd").await;

    send(
        &orchestrator,
        b"<38>Oct 11 22:14:15 gateway sshd[4242]: Failed password for root from 10.0.0.9",
    )
    .await;
    send(&orchestrator, b"<78>Oct 11 22:14:16 gateway cron[77]: (root) CMD (backup)").await;

    let pipeline = orchestrator.pipeline();
    wait_until(|| pipeline.delivered_count() == 1 && pipeline.filtered_count() == 1).await;
    orchestrator.shutdown().await.expect("shutdown should succeed");

    // Then: only the sshd event reached the daily file
    let records = archived_records(dir.path());
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert!(record.parsed);
    assert_eq!(record.priority, Some(38));
    assert_eq!(record.facility.as_deref(), Some("auth"));
    assert_eq!(record.severity.as_deref(), Some("informational"));
    assert_eq!(record.hostname.as_deref(), Some("gateway"));
    assert_eq!(record.process.as_deref(), Some("sshd"));
    assert_eq!(record.pid, Some(4242));
    assert_eq!(record.message, "Failed password for root from 10.0.0.9");
}

#[tokio::test]
async fn test_rejected_query_keeps_previous_filter() {
    let dir = tempfile::tempdir().unwrap();
    let (lines_tx, lines_rx) = mpsc::channel(4);
    let mut orchestrator = Orchestrator::build_from_config(archive_config(dir.path()))
        .unwrap()
        .with_filter_input(lines_rx);
    orchestrator.start().await.unwrap();

    // Given: an applied filter
    lines_tx.send("severity=error".to_owned()).await.unwrap();
    let filter = orchestrator.active_filter();
    wait_until(|| filter.load().query() == "severity=error").await;

    // When: a broken query, then an empty line
    lines_tx.send("(process=sshd".to_owned()).await.unwrap();
    lines_tx.send("process=cron".to_owned()).await.unwrap();
    wait_until(|| filter.load().query() == "process=cron").await;
    lines_tx.send(String::new()).await.unwrap();

    // Then: the broken query never replaced the filter, and the empty line cleared it
    wait_until(|| filter.load().is_match_all()).await;
    orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_initial_filter_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = archive_config(dir.path());
    config.filter.query = r#"message("disk")"#.to_owned();
    config.filter.min_severity = "warning".to_owned();

    let mut orchestrator = Orchestrator::build_from_config(config)
        .unwrap()
        .without_filter_input();
    orchestrator.start().await.unwrap();

    // informational: below threshold
    send(&orchestrator, b"<14>Oct 11 22:14:15 nas smartd: disk sda ok").await;
    // warning: matches
    send(&orchestrator, b"<12>Oct 11 22:14:16 nas smartd: disk sdb failing").await;
    // error without "disk": rejected by query
    send(&orchestrator, b"<11>Oct 11 22:14:17 nas kernel: oops").await;

    let pipeline = orchestrator.pipeline();
    wait_until(|| pipeline.delivered_count() + pipeline.filtered_count() == 3).await;
    orchestrator.shutdown().await.unwrap();

    let records = archived_records(dir.path());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].message, "disk sdb failing");
}

#[tokio::test]
async fn test_start_fails_when_port_in_use() {
    // Given: a port already bound by another socket
    let occupied = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = occupied.local_addr().unwrap().port();

    let dir = tempfile::tempdir().unwrap();
    let mut config = archive_config(dir.path());
    config.listener.port = port;

    let mut orchestrator = Orchestrator::build_from_config(config)
        .unwrap()
        .without_filter_input();

    // When
    let result = orchestrator.start().await;

    // Then
    let err = result.expect_err("start should fail").to_string();
    assert!(err.contains("failed to start log pipeline"), "got: {err}");
}

#[tokio::test]
async fn test_run_returns_after_shutdown_token() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator = Orchestrator::build_from_config(archive_config(dir.path()))
        .unwrap()
        .without_filter_input();
    let token = orchestrator.shutdown_token();

    let task = tokio::spawn(async move { orchestrator.run().await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    token.cancel();

    let result = tokio::time::timeout(Duration::from_secs(3), task)
        .await
        .expect("run should return after cancellation")
        .expect("run task should not panic");
    assert!(result.is_ok(), "run failed: {result:?}");
}

#[tokio::test]
async fn test_build_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("syslens.toml");
    let archive = dir.path().join("archive");
    std::fs::write(
        &config_path,
        format!(
            "[listener]\nport = 0\n[display]\nenabled = false\n[storage]\nlog_dir = \"{}\"\n",
            archive.display()
        ),
    )
    .unwrap();

    let orchestrator = Orchestrator::build(&config_path).await.unwrap();

    assert_eq!(orchestrator.config().listener.port, 0);
    assert_eq!(orchestrator.pipeline().sink_count(), 1);
}
