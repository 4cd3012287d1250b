#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::{Command, Output};

fn relaybridge(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_relaybridge"))
        .arg("--log-level")
        .arg("error")
        .args(args)
        .output()
        .expect("relaybridge should run")
}

fn temp_config(tag: &str, json: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "relaybridge-{tag}-{}-{}.json",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::write(&path, json).expect("config should be writable");
    path
}

#[test]
fn version_prints_package_version() {
    let output = relaybridge(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn channels_json_lists_defaults_and_user_channels() {
    let config = temp_config(
        "channels",
        r#"{"channels": [{"id": 40, "name": "chat", "policy": "unreliable"}]}"#,
    );

    let output = relaybridge(&[
        "--format",
        "json",
        "channels",
        "--config",
        config.to_str().expect("temp path should be utf-8"),
    ]);
    let _ = std::fs::remove_file(&config);

    assert!(output.status.success());
    let channels: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be json");
    let channels = channels.as_array().expect("channels should be an array");
    assert_eq!(channels.len(), 6);
    assert_eq!(channels[2]["name"], "DEFAULT");
    assert_eq!(channels[2]["policy"], "reliable_sequenced");
    assert_eq!(channels[5]["id"], 40);
    assert_eq!(channels[5]["name"], "chat");
    assert_eq!(channels[5]["delivery"], "unreliable");
}

#[test]
fn duplicate_channel_config_exits_with_usage() {
    let config = temp_config(
        "duplicate",
        r#"{"channels": [{"id": 2, "policy": "reliable"}]}"#,
    );

    let output = relaybridge(&[
        "channels",
        "--config",
        config.to_str().expect("temp path should be utf-8"),
    ]);
    let _ = std::fs::remove_file(&config);

    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("registered more than once"));
}

#[test]
fn loopback_echoes_for_every_client() {
    let output = relaybridge(&[
        "--format",
        "json",
        "loopback",
        "--clients",
        "3",
        "--channel",
        "40",
        "--data",
        "ping",
    ]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let events: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be json"))
        .collect();

    let host_data = events
        .iter()
        .filter(|event| event["side"] == "host" && event["kind"] == "data")
        .count();
    assert_eq!(host_data, 3);

    let echoes: Vec<_> = events
        .iter()
        .filter(|event| event["side"] != "host" && event["kind"] == "data")
        .collect();
    assert_eq!(echoes.len(), 3);
    for echo in echoes {
        assert_eq!(echo["client_id"], 0);
        assert_eq!(echo["channel"], 40);
        assert_eq!(echo["payload"], "ping");
    }
}

#[test]
fn loopback_events_use_declared_channel_names() {
    let config = temp_config(
        "named",
        r#"{"channels": [{"id": 40, "name": "chat", "policy": "reliable"}]}"#,
    );

    let output = relaybridge(&[
        "--format",
        "json",
        "loopback",
        "--clients",
        "1",
        "--channel",
        "40",
        "--config",
        config.to_str().expect("temp path should be utf-8"),
    ]);
    let _ = std::fs::remove_file(&config);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let data: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be json"))
        .filter(|event: &serde_json::Value| event["kind"] == "data")
        .collect();
    assert_eq!(data.len(), 2);
    assert!(data.iter().all(|event| event["channel_name"] == "chat"));
}

#[test]
fn zero_pump_budget_config_exits_with_usage() {
    let config = temp_config("pump", r#"{"max_messages_per_pump": 0}"#);

    let output = relaybridge(&[
        "loopback",
        "--config",
        config.to_str().expect("temp path should be utf-8"),
    ]);
    let _ = std::fs::remove_file(&config);

    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("max_messages_per_pump"));
}

#[test]
fn loopback_rejects_zero_clients() {
    let output = relaybridge(&["loopback", "--clients", "0"]);
    assert_eq!(output.status.code(), Some(64));
}
