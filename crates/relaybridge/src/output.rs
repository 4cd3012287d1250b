use std::io::IsTerminal;
use std::time::UNIX_EPOCH;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use relaybridge_frame::ChannelRegistry;
use relaybridge_peer::{EventKind, NetworkEvent};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct EventOutput<'a> {
    side: &'a str,
    kind: &'a str,
    client_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel_name: Option<&'a str>,
    payload_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<String>,
    timestamp: String,
}

#[derive(Serialize)]
struct ChannelOutput<'a> {
    id: u8,
    name: &'a str,
    policy: relaybridge_frame::ChannelPolicy,
    delivery: String,
}

/// Print one event; channel names come from `registry` so declared names
/// show up.
pub fn print_event(
    side: &str,
    event: &NetworkEvent,
    registry: &ChannelRegistry,
    format: OutputFormat,
) {
    let is_data = event.kind == EventKind::Data;
    match format {
        OutputFormat::Json => {
            let out = EventOutput {
                side,
                kind: kind_name(event.kind),
                client_id: event.client_id,
                channel: is_data.then_some(event.channel),
                channel_name: is_data.then(|| registry.name(event.channel)),
                payload_size: event.payload.len(),
                payload: is_data.then(|| payload_preview(event.payload.as_ref())),
                timestamp: unix_seconds(event),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SIDE", "EVENT", "CLIENT", "CHANNEL", "PAYLOAD"])
                .add_row(vec![
                    side.to_string(),
                    kind_name(event.kind).to_string(),
                    event.client_id.to_string(),
                    if is_data {
                        registry.name(event.channel).to_string()
                    } else {
                        "-".to_string()
                    },
                    if is_data {
                        payload_preview(event.payload.as_ref())
                    } else {
                        "-".to_string()
                    },
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            if is_data {
                println!(
                    "[{side}] {} client={} channel={} ({}) size={} payload={}",
                    kind_name(event.kind),
                    event.client_id,
                    event.channel,
                    registry.name(event.channel),
                    event.payload.len(),
                    payload_preview(event.payload.as_ref())
                );
            } else {
                println!(
                    "[{side}] {} client={}",
                    kind_name(event.kind),
                    event.client_id
                );
            }
        }
    }
}

pub fn print_channels(registry: &ChannelRegistry, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out: Vec<ChannelOutput<'_>> = registry
                .iter()
                .map(|channel| ChannelOutput {
                    id: channel.id,
                    name: channel.display_name(),
                    policy: channel.policy,
                    delivery: format!("{:?}", channel.policy.delivery_mode()).to_lowercase(),
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ID", "NAME", "POLICY", "DELIVERY"]);
            for channel in registry.iter() {
                table.add_row(vec![
                    channel.id.to_string(),
                    channel.display_name().to_string(),
                    format!("{:?}", channel.policy),
                    format!("{:?}", channel.policy.delivery_mode()),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for channel in registry.iter() {
                println!(
                    "{:>3} {:<16} {:?} -> {:?}",
                    channel.id,
                    channel.display_name(),
                    channel.policy,
                    channel.policy.delivery_mode()
                );
            }
        }
    }
}

pub fn kind_name(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Connect => "connect",
        EventKind::Disconnect => "disconnect",
        EventKind::Data => "data",
        EventKind::Nothing => "nothing",
    }
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn unix_seconds(event: &NetworkEvent) -> String {
    event
        .timestamp
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
