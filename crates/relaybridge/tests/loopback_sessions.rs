#![cfg(feature = "peer")]

use relaybridge::frame::{DEFAULT, TIME_SYNC, USER_CHANNEL_START};
use relaybridge::peer::{
    AdapterConfig, ClientId, EventKind, NetworkEvent, RelayAdapter, Role, StartStatus,
    SERVER_CLIENT_ID,
};
use relaybridge::transport::{
    ConnectionHandle, ConnectionInfo, ConnectionState, DeliveryMode, LoopbackNetwork,
    LoopbackRelay, PeerIdentity, RelaySocket, SocketEvent,
};

const HOST: PeerIdentity = PeerIdentity(1);

fn adapter(network: &LoopbackNetwork, identity: PeerIdentity) -> RelayAdapter<LoopbackRelay> {
    let mut adapter = RelayAdapter::new(network.endpoint(identity), AdapterConfig::default());
    adapter.init().expect("init should succeed");
    adapter
}

fn drain(adapter: &mut RelayAdapter<LoopbackRelay>) -> Vec<NetworkEvent> {
    std::iter::from_fn(|| {
        let event = adapter.poll();
        (event.kind != EventKind::Nothing).then_some(event)
    })
    .collect()
}

/// One maintenance tick plus a full drain for the host and every client.
fn tick(
    host: &mut RelayAdapter<LoopbackRelay>,
    clients: &mut [RelayAdapter<LoopbackRelay>],
) -> (Vec<NetworkEvent>, Vec<Vec<NetworkEvent>>) {
    host.maintain();
    let host_events = drain(host);
    let client_events = clients
        .iter_mut()
        .map(|client| {
            client.maintain();
            drain(client)
        })
        .collect();
    (host_events, client_events)
}

/// Host plus `count` clients, ticked until every client is connected.
fn session(
    network: &LoopbackNetwork,
    count: usize,
) -> (RelayAdapter<LoopbackRelay>, Vec<RelayAdapter<LoopbackRelay>>, Vec<ClientId>) {
    let mut host = adapter(network, HOST);
    assert_eq!(
        host.start_as_server().expect("host should start"),
        StartStatus::Ready
    );

    let mut clients: Vec<_> = (0..count)
        .map(|index| {
            let mut client = adapter(network, PeerIdentity(100 + index as u64));
            assert_eq!(
                client.start_as_client(HOST).expect("client should start"),
                StartStatus::Pending
            );
            client
        })
        .collect();

    let mut host_ids = Vec::new();
    let mut connected = vec![false; count];
    for _ in 0..10 {
        let (host_events, client_events) = tick(&mut host, &mut clients);
        host_ids.extend(
            host_events
                .iter()
                .filter(|event| event.kind == EventKind::Connect)
                .map(|event| event.client_id),
        );
        for (index, events) in client_events.iter().enumerate() {
            if events.iter().any(|event| event.kind == EventKind::Connect) {
                connected[index] = true;
            }
        }
        if host_ids.len() == count && connected.iter().all(|c| *c) {
            return (host, clients, host_ids);
        }
    }
    panic!("session did not connect: host saw {host_ids:?}, clients {connected:?}");
}

#[test]
fn host_sees_connect_with_relay_handle_id() {
    let network = LoopbackNetwork::new();
    let (host, _clients, host_ids) = session(&network, 1);

    assert_eq!(host_ids.len(), 1);
    assert_ne!(host_ids[0], SERVER_CLIENT_ID);
    assert_eq!(host.connected_clients(), 1);
}

#[test]
fn injected_accept_for_handle_seven_yields_client_seven() {
    let network = LoopbackNetwork::new();
    let mut host = adapter(&network, HOST);
    host.start_as_server().expect("host should start");

    host.relay_mut()
        .inject_listen_event(SocketEvent::Connected(ConnectionInfo {
            handle: ConnectionHandle(7),
            identity: PeerIdentity(77),
            state: ConnectionState::Connected,
        }));

    let event = host.poll();
    assert_eq!(event.kind, EventKind::Connect);
    assert_eq!(event.client_id, 7);
}

#[test]
fn host_send_puts_channel_byte_on_the_wire() {
    let network = LoopbackNetwork::new();
    let mut host = adapter(&network, HOST);
    host.start_as_server().expect("host should start");

    // A raw relay endpoint sees exactly what the adapter transmits.
    let mut raw = network.endpoint(PeerIdentity(500));
    raw.init_network().expect("raw init should succeed");
    let conn = raw.connect(HOST).expect("raw connect should succeed");

    let mut client_id = None;
    for _ in 0..5 {
        host.maintain();
        raw.run_callbacks();
        for event in drain(&mut host) {
            if event.kind == EventKind::Connect {
                client_id = Some(event.client_id);
            }
        }
    }
    let client_id = client_id.expect("host should report the raw peer");
    while raw.next_connection_event(conn).is_some() {}

    host.send(client_id, &[0xAA, 0xBB], 2)
        .expect("host send should succeed");
    match raw.next_connection_event(conn) {
        Some(SocketEvent::Message { data, .. }) => assert_eq!(data.as_ref(), &[0xAA, 0xBB, 0x02]),
        other => panic!("expected raw message, got {other:?}"),
    }

    raw.send(conn, &[0xAA, 0xBB, 0x02], DeliveryMode::Reliable)
        .expect("raw send should succeed");
    let event = host.poll();
    assert_eq!(event.kind, EventKind::Data);
    assert_eq!(event.client_id, client_id);
    assert_eq!(event.channel, 2);
    assert_eq!(event.payload.as_ref(), &[0xAA, 0xBB]);

    raw.send(conn, &[], DeliveryMode::Reliable)
        .expect("raw send should succeed");
    assert_eq!(host.poll().kind, EventKind::Nothing);
}

#[test]
fn idle_client_poll_reports_nothing() {
    let network = LoopbackNetwork::new();
    let mut client = adapter(&network, PeerIdentity(2));
    client.start_as_client(HOST).expect("client should start");

    let event = client.poll();
    assert_eq!(event.kind, EventKind::Nothing);
    assert_eq!(event.client_id, 0);
}

#[test]
fn untracked_disconnect_yields_exactly_one_event() {
    let network = LoopbackNetwork::new();
    let mut host = adapter(&network, HOST);
    host.start_as_server().expect("host should start");

    host.relay_mut()
        .inject_listen_event(SocketEvent::Disconnected(ConnectionInfo {
            handle: ConnectionHandle(7),
            identity: PeerIdentity(77),
            state: ConnectionState::ClosedByPeer,
        }));

    let event = host.poll();
    assert_eq!(event.kind, EventKind::Disconnect);
    assert_eq!(event.client_id, 7);
    assert_eq!(host.poll().kind, EventKind::Nothing);
}

#[test]
fn client_leaving_mid_handshake_frees_host_handle() {
    let network = LoopbackNetwork::new();
    let mut host = adapter(&network, HOST);
    host.start_as_server().expect("host should start");
    let mut client = adapter(&network, PeerIdentity(2));
    client.start_as_client(HOST).expect("client should start");
    client.disconnect_self();

    host.maintain();
    let events = drain(&mut host);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Disconnect);

    let handle = ConnectionHandle(
        u32::try_from(events[0].client_id).expect("client id should be a relay handle"),
    );
    assert_eq!(host.relay().connection_status(handle), None);
    assert_eq!(host.connected_clients(), 0);
}

#[test]
fn data_round_trips_on_user_and_builtin_channels() {
    let network = LoopbackNetwork::new();
    let (mut host, mut clients, host_ids) = session(&network, 1);

    clients[0]
        .send(SERVER_CLIENT_ID, b"state", USER_CHANNEL_START)
        .expect("client send should succeed");
    clients[0]
        .send(SERVER_CLIENT_ID, b"", TIME_SYNC)
        .expect("client send should succeed");

    let received = drain(&mut host);
    assert_eq!(received.len(), 2);
    assert_eq!(received[0].kind, EventKind::Data);
    assert_eq!(received[0].client_id, host_ids[0]);
    assert_eq!(received[0].channel, USER_CHANNEL_START);
    assert_eq!(received[0].payload.as_ref(), b"state");
    assert_eq!(received[1].channel, TIME_SYNC);
    assert!(received[1].payload.is_empty());

    host.send(host_ids[0], b"ack", DEFAULT)
        .expect("host send should succeed");
    let replies = drain(&mut clients[0]);
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].client_id, SERVER_CLIENT_ID);
    assert_eq!(replies[0].channel, DEFAULT);
    assert_eq!(replies[0].payload.as_ref(), b"ack");
}

#[test]
fn events_keep_send_order_across_clients() {
    let network = LoopbackNetwork::new();
    let (mut host, mut clients, _) = session(&network, 3);

    let order = [2usize, 0, 1, 0];
    for (seq, index) in order.iter().enumerate() {
        clients[*index]
            .send(SERVER_CLIENT_ID, &[seq as u8], DEFAULT)
            .expect("client send should succeed");
    }

    let received: Vec<u8> = drain(&mut host)
        .into_iter()
        .map(|event| event.payload[0])
        .collect();
    assert_eq!(received, vec![0, 1, 2, 3]);
}

#[test]
fn client_role_only_reports_server_id() {
    let network = LoopbackNetwork::new();
    let (mut host, mut clients, host_ids) = session(&network, 2);

    for id in &host_ids {
        host.send(*id, b"hi", DEFAULT).expect("host send should succeed");
    }
    host.disconnect_client(host_ids[1]);
    let (_, client_events) = tick(&mut host, &mut clients);

    for events in client_events {
        assert!(!events.is_empty());
        assert!(events.iter().all(|event| event.client_id == SERVER_CLIENT_ID));
    }
}

#[test]
fn host_disconnect_reaches_client() {
    let network = LoopbackNetwork::new();
    let (mut host, mut clients, host_ids) = session(&network, 1);

    host.disconnect_client(host_ids[0]);
    assert_eq!(host.connected_clients(), 0);

    let (host_events, client_events) = tick(&mut host, &mut clients);
    assert!(host_events.is_empty());
    assert_eq!(client_events[0].len(), 1);
    assert_eq!(client_events[0][0].kind, EventKind::Disconnect);
    assert_eq!(client_events[0][0].client_id, SERVER_CLIENT_ID);

    host.send(host_ids[0], b"late", DEFAULT)
        .expect("send to departed client should be skipped");
}

#[test]
fn client_disconnect_reaches_host() {
    let network = LoopbackNetwork::new();
    let (mut host, mut clients, host_ids) = session(&network, 2);

    clients[0].disconnect_self();
    assert_eq!(clients[0].role(), Role::Idle);

    let (host_events, _) = tick(&mut host, &mut clients);
    assert_eq!(host_events.len(), 1);
    assert_eq!(host_events[0].kind, EventKind::Disconnect);
    assert!(host_ids.contains(&host_events[0].client_id));
    assert_eq!(host.connected_clients(), 1);
}

#[test]
fn host_shutdown_disconnects_everyone() {
    let network = LoopbackNetwork::new();
    let (mut host, mut clients, _) = session(&network, 2);

    host.shutdown();
    assert_eq!(host.role(), Role::Idle);

    for client in &mut clients {
        client.maintain();
        let events = drain(client);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Disconnect);
    }
}

#[test]
fn rtt_is_reported_for_connected_clients() {
    let network = LoopbackNetwork::new();
    network.set_ping(std::time::Duration::from_millis(30));
    let (host, clients, host_ids) = session(&network, 1);

    assert_eq!(
        host.current_rtt(host_ids[0]),
        Some(std::time::Duration::from_millis(30))
    );
    assert_eq!(
        clients[0].current_rtt(clients[0].server_client_id()),
        Some(std::time::Duration::from_millis(30))
    );
}
