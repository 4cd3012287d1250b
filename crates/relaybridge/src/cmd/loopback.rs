use relaybridge_peer::{EventKind, NetworkEvent, RelayAdapter, SERVER_CLIENT_ID};
use relaybridge_transport::{LoopbackNetwork, LoopbackRelay, PeerIdentity};

use crate::cmd::{load_config, LoopbackArgs};
use crate::exit::{peer_error, CliError, CliResult, FAILURE, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_event, OutputFormat};

const HOST_IDENTITY: PeerIdentity = PeerIdentity(1);
const FIRST_CLIENT_IDENTITY: u64 = 100;

struct LoopbackClient {
    label: String,
    adapter: RelayAdapter<LoopbackRelay>,
    echoed: bool,
}

pub fn run(args: LoopbackArgs, format: OutputFormat) -> CliResult<i32> {
    if args.clients == 0 {
        return Err(CliError::new(USAGE, "--clients must be at least 1"));
    }
    let config = load_config(args.config.as_ref())?;
    let network = LoopbackNetwork::new();

    let mut host = RelayAdapter::new(network.endpoint(HOST_IDENTITY), config.clone());
    host.init().map_err(|err| peer_error("host init failed", err))?;
    host.start_as_server()
        .map_err(|err| peer_error("host start failed", err))?;

    let mut clients = Vec::with_capacity(args.clients);
    for index in 0..args.clients {
        let identity = PeerIdentity(FIRST_CLIENT_IDENTITY + index as u64);
        let mut adapter = RelayAdapter::new(network.endpoint(identity), config.clone());
        adapter
            .init()
            .map_err(|err| peer_error("client init failed", err))?;
        adapter
            .start_as_client(HOST_IDENTITY)
            .map_err(|err| peer_error("client start failed", err))?;
        clients.push(LoopbackClient {
            label: format!("client-{index}"),
            adapter,
            echoed: false,
        });
    }

    let payload = args.data.as_bytes();
    let mut rounds = 0usize;
    while rounds < args.max_rounds && !clients.iter().all(|client| client.echoed) {
        rounds += 1;

        host.maintain();
        for event in drain(&mut host) {
            print_event("host", &event, host.channels(), format);
            if event.kind == EventKind::Data {
                host.send(event.client_id, &event.payload, event.channel)
                    .map_err(|err| peer_error("echo send failed", err))?;
            }
        }

        for client in &mut clients {
            client.adapter.maintain();
            for event in drain(&mut client.adapter) {
                print_event(&client.label, &event, client.adapter.channels(), format);
                match event.kind {
                    EventKind::Connect => client
                        .adapter
                        .send(SERVER_CLIENT_ID, payload, args.channel)
                        .map_err(|err| peer_error("client send failed", err))?,
                    EventKind::Data if event.payload.as_ref() == payload => client.echoed = true,
                    EventKind::Disconnect => {
                        return Err(CliError::new(
                            FAILURE,
                            format!("{} lost its host connection", client.label),
                        ))
                    }
                    _ => {}
                }
            }
        }
    }

    let echoed = clients.iter().filter(|client| client.echoed).count();
    for client in &mut clients {
        client.adapter.shutdown();
    }
    host.shutdown();

    if echoed < clients.len() {
        return Err(CliError::new(
            TIMEOUT,
            format!(
                "only {echoed} of {} clients received an echo after {rounds} rounds",
                clients.len()
            ),
        ));
    }

    tracing::info!(clients = echoed, rounds, "loopback exchange complete");
    Ok(SUCCESS)
}

/// Poll until the adapter reports nothing pending.
fn drain(adapter: &mut RelayAdapter<LoopbackRelay>) -> Vec<NetworkEvent> {
    std::iter::from_fn(|| {
        let event = adapter.poll();
        (event.kind != EventKind::Nothing).then_some(event)
    })
    .collect()
}
