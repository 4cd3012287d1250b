//! Loopback chat example: one host, two clients, a user chat channel.
//!
//! Run with:
//!   cargo run --example loopback-chat --features peer

use std::thread;

use relaybridge::frame::{ChannelConfig, ChannelPolicy, USER_CHANNEL_START};
use relaybridge::peer::{AdapterConfig, EventKind, RelayAdapter, SERVER_CLIENT_ID};
use relaybridge::transport::{LoopbackNetwork, PeerIdentity};

const CHAT: u8 = USER_CHANNEL_START;
const HOST: PeerIdentity = PeerIdentity(1);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AdapterConfig::default().with_channel(ChannelConfig::named(
        CHAT,
        "chat",
        ChannelPolicy::ReliableSequenced,
    ));
    let network = LoopbackNetwork::new();

    let mut host = RelayAdapter::new(network.endpoint(HOST), config.clone());
    host.init()?;
    host.start_as_server()?;

    let mut clients = Vec::new();
    for (name, identity) in [("alice", 10), ("bob", 11)] {
        let mut adapter = RelayAdapter::new(network.endpoint(PeerIdentity(identity)), config.clone());
        adapter.init()?;
        adapter.start_as_client(HOST)?;
        clients.push((name, adapter));
    }

    let mut members = Vec::new();
    let mut delivered = 0;
    for _ in 0..20 {
        host.maintain();
        loop {
            let event = host.poll();
            match event.kind {
                EventKind::Nothing => break,
                EventKind::Connect => {
                    eprintln!("[host] client {} joined", event.client_id);
                    members.push(event.client_id);
                }
                EventKind::Disconnect => members.retain(|id| *id != event.client_id),
                // Relay each chat line to every member, sender included.
                EventKind::Data if event.channel == CHAT => {
                    for member in &members {
                        host.send(*member, &event.payload, CHAT)?;
                    }
                }
                EventKind::Data => {}
            }
        }

        for (name, adapter) in &mut clients {
            adapter.maintain();
            loop {
                let event = adapter.poll();
                match event.kind {
                    EventKind::Nothing => break,
                    EventKind::Connect => {
                        let line = format!("{name}: hello everyone");
                        adapter.send(SERVER_CLIENT_ID, line.as_bytes(), CHAT)?;
                    }
                    EventKind::Data => {
                        eprintln!("[{name}] {}", String::from_utf8_lossy(&event.payload));
                        delivered += 1;
                    }
                    EventKind::Disconnect => eprintln!("[{name}] host went away"),
                }
            }
        }

        if delivered == clients.len() * clients.len() {
            break;
        }
        thread::sleep(config.maintenance_interval());
    }

    for (_, adapter) in &mut clients {
        adapter.shutdown();
    }
    host.shutdown();
    Ok(())
}
