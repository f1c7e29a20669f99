//! End-to-end session scenarios against the scripted adapter.
//!
//! Every test that connects runs on a paused clock so the 2000 ms settle
//! delay elapses virtually.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use uuid::Uuid;

use gatt_probe::adapter::AdapterError;
use gatt_probe::mock::{MockAdapter, MockCall};
use gatt_probe::models::{
    CharacteristicFlags, CharacteristicInfo, PeripheralHandle, ServiceInfo, SessionEvent,
    SessionState, Topology,
};
use gatt_probe::session::{PeripheralSession, SessionConfig};
use gatt_probe::SessionError;

fn test_peripheral() -> PeripheralHandle {
    PeripheralHandle {
        id: "peripheral-1".to_string(),
        name: "Test Peripheral".to_string(),
    }
}

fn new_session(
    adapter: &MockAdapter,
) -> (
    PeripheralSession<MockAdapter>,
    mpsc::UnboundedReceiver<SessionEvent>,
) {
    new_session_with(adapter, SessionConfig::default())
}

fn new_session_with(
    adapter: &MockAdapter,
    config: SessionConfig,
) -> (
    PeripheralSession<MockAdapter>,
    mpsc::UnboundedReceiver<SessionEvent>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let session = PeripheralSession::new(adapter.clone(), test_peripheral(), config, tx);
    (session, rx)
}

fn drain_events(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn state_changes(events: &[SessionEvent]) -> Vec<SessionState> {
    events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::StateChanged(state) => Some(*state),
            _ => None,
        })
        .collect()
}

fn characteristic(n: u128) -> CharacteristicInfo {
    CharacteristicInfo {
        uuid: Uuid::from_u128(n),
        flags: CharacteristicFlags::default(),
    }
}

fn service(n: u128, characteristics: Vec<CharacteristicInfo>) -> ServiceInfo {
    ServiceInfo {
        uuid: Uuid::from_u128(n),
        characteristics,
    }
}

#[tokio::test(start_paused = true)]
async fn connect_walks_the_full_state_sequence() {
    let adapter = MockAdapter::new();
    let (session, mut rx) = new_session(&adapter);

    assert_eq!(session.state().await, SessionState::Disconnected);
    session.connect().await.expect("connect should succeed");
    assert_eq!(session.state().await, SessionState::Ready);
    assert!(session.has_endpoint().await);

    let events = drain_events(&mut rx);
    assert_eq!(
        state_changes(&events),
        vec![
            SessionState::Connecting,
            SessionState::Settling,
            SessionState::Discovering,
            SessionState::Ready,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn discovery_respects_the_settle_delay() {
    let adapter = MockAdapter::new();
    let (session, _rx) = new_session(&adapter);

    session.connect().await.expect("connect should succeed");

    let timed = adapter.timed_calls();
    let connect_at = timed
        .iter()
        .find(|(call, _)| matches!(call, MockCall::Connect))
        .map(|(_, at)| *at)
        .expect("connect call recorded");
    let discover_at = timed
        .iter()
        .find(|(call, _)| matches!(call, MockCall::DiscoverTopology))
        .map(|(_, at)| *at)
        .expect("discovery call recorded");

    assert!(discover_at.duration_since(connect_at) >= Duration::from_millis(2000));
}

#[tokio::test(start_paused = true)]
async fn settle_delay_floor_applies_to_short_configs() {
    let adapter = MockAdapter::new();
    let (session, _rx) = new_session_with(&adapter, SessionConfig { settle_delay_ms: 10 });

    let started = Instant::now();
    session.connect().await.expect("connect should succeed");
    assert!(started.elapsed() >= Duration::from_millis(2000));
}

#[tokio::test(start_paused = true)]
async fn read_decodes_characteristic_text() {
    let adapter = MockAdapter::new();
    adapter.queue_read(Ok(vec![0x48, 0x69]));
    let (session, mut rx) = new_session(&adapter);

    session.connect().await.expect("connect should succeed");
    let text = session.read().await.expect("read should succeed");

    assert_eq!(text, "Hi");
    assert_eq!(session.last_read().await.as_deref(), Some("Hi"));
    assert_eq!(session.state().await, SessionState::Ready);

    let events = drain_events(&mut rx);
    assert!(events
        .iter()
        .any(|event| matches!(event, SessionEvent::TextRead(t) if t == "Hi")));
}

#[tokio::test(start_paused = true)]
async fn read_addresses_the_selected_endpoint() {
    let adapter = MockAdapter::new();
    adapter.queue_topology(Ok(Topology::from_services(vec![
        service(0x51, vec![characteristic(0xC1)]),
        service(0x52, vec![characteristic(0xC2), characteristic(0xC3)]),
    ])));
    let (session, _rx) = new_session(&adapter);

    session.connect().await.expect("connect should succeed");
    session.read().await.expect("read should succeed");

    let (service_id, characteristic_id) = adapter
        .calls()
        .into_iter()
        .find_map(|call| match call {
            MockCall::Read {
                service,
                characteristic,
            } => Some((service, characteristic)),
            _ => None,
        })
        .expect("read call recorded");

    assert_eq!(service_id, Uuid::from_u128(0x52));
    assert_eq!(characteristic_id, Uuid::from_u128(0xC3));
}

#[tokio::test(start_paused = true)]
async fn write_issues_exactly_one_adapter_write() {
    let adapter = MockAdapter::new();
    let (session, _rx) = new_session(&adapter);

    session.connect().await.expect("connect should succeed");
    session.write("Ping").await.expect("write should succeed");

    assert_eq!(adapter.writes(), vec![vec![0x50, 0x69, 0x6e, 0x67]]);
    assert_eq!(session.state().await, SessionState::Ready);
}

#[tokio::test]
async fn transfers_require_ready() {
    let adapter = MockAdapter::new();
    let (session, _rx) = new_session(&adapter);

    let err = session.read().await.expect_err("read must be refused");
    assert!(matches!(
        err,
        SessionError::NotReady(SessionState::Disconnected)
    ));

    let err = session.write("Ping").await.expect_err("write must be refused");
    assert!(matches!(
        err,
        SessionError::NotReady(SessionState::Disconnected)
    ));

    assert!(adapter.calls().is_empty(), "no adapter call may be issued");
}

#[tokio::test(start_paused = true)]
async fn empty_topology_reaches_ready_but_refuses_transfers() {
    let adapter = MockAdapter::new();
    adapter.queue_topology(Ok(Topology::default()));
    let (session, _rx) = new_session(&adapter);

    session.connect().await.expect("connect should succeed");
    assert_eq!(session.state().await, SessionState::Ready);
    assert!(!session.has_endpoint().await);

    let err = session.read().await.expect_err("read must be refused");
    assert!(matches!(err, SessionError::EndpointUnavailable));
    let err = session.write("Ping").await.expect_err("write must be refused");
    assert!(matches!(err, SessionError::EndpointUnavailable));

    // Refusal leaves state untouched and never reaches the adapter.
    assert_eq!(session.state().await, SessionState::Ready);
    assert!(!adapter
        .calls()
        .iter()
        .any(|call| matches!(call, MockCall::Read { .. } | MockCall::Write { .. })));
}

#[tokio::test(start_paused = true)]
async fn transfer_is_busy_while_one_is_in_flight() {
    let adapter = MockAdapter::new();
    let (session, _rx) = new_session(&adapter);
    session.connect().await.expect("connect should succeed");

    adapter.set_read_delay(Duration::from_millis(500));
    let background = session.clone();
    let in_flight = tokio::spawn(async move { background.read().await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(session.state().await, SessionState::Transferring);

    let err = session.read().await.expect_err("second transfer must be refused");
    assert!(matches!(
        err,
        SessionError::NotReady(SessionState::Transferring)
    ));

    let text = in_flight
        .await
        .expect("task should not panic")
        .expect("first read should succeed");
    assert_eq!(text, "Hi");
    assert_eq!(session.state().await, SessionState::Ready);
}

#[tokio::test(start_paused = true)]
async fn second_connect_while_active_is_rejected() {
    let adapter = MockAdapter::new();
    adapter.set_connect_delay(Duration::from_millis(500));
    let (session, _rx) = new_session(&adapter);

    let background = session.clone();
    let first = tokio::spawn(async move { background.connect().await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    let err = session
        .connect()
        .await
        .expect_err("second connect must be rejected");
    assert!(matches!(err, SessionError::AlreadyActive(_)));

    first
        .await
        .expect("task should not panic")
        .expect("first connect should complete");

    let connects = adapter
        .calls()
        .iter()
        .filter(|call| matches!(call, MockCall::Connect))
        .count();
    assert_eq!(connects, 1, "only one connection sequence may run");
}

#[tokio::test(start_paused = true)]
async fn disconnect_during_discovery_discards_the_late_result() {
    let adapter = MockAdapter::new();
    adapter.set_discovery_delay(Duration::from_millis(500));
    let (session, mut rx) = new_session(&adapter);

    let background = session.clone();
    let connecting = tokio::spawn(async move { background.connect().await });

    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(session.state().await, SessionState::Discovering);

    session.disconnect().await;
    assert_eq!(session.state().await, SessionState::Disconnected);

    let result = connecting.await.expect("task should not panic");
    assert!(matches!(result, Err(SessionError::Superseded)));

    // The late topology never moves the session to Ready or Error.
    assert_eq!(session.state().await, SessionState::Disconnected);
    assert!(!session.has_endpoint().await);
    let events = drain_events(&mut rx);
    assert_eq!(
        state_changes(&events),
        vec![
            SessionState::Connecting,
            SessionState::Settling,
            SessionState::Discovering,
            SessionState::Disconnected,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn disconnect_during_transfer_discards_the_late_result() {
    let adapter = MockAdapter::new();
    let (session, mut rx) = new_session(&adapter);
    session.connect().await.expect("connect should succeed");

    adapter.set_read_delay(Duration::from_millis(500));
    let background = session.clone();
    let reading = tokio::spawn(async move { background.read().await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(session.state().await, SessionState::Transferring);

    session.disconnect().await;
    assert_eq!(session.state().await, SessionState::Disconnected);

    let result = reading.await.expect("task should not panic");
    assert!(matches!(result, Err(SessionError::Superseded)));
    assert_eq!(session.last_read().await, None);

    let events = drain_events(&mut rx);
    assert!(!events
        .iter()
        .any(|event| matches!(event, SessionEvent::TextRead(_))));
}

#[tokio::test(start_paused = true)]
async fn connect_fault_is_terminal_until_reconnect() {
    let adapter = MockAdapter::new();
    adapter.queue_connect(Err(AdapterError::ConnectFailed));
    let (session, _rx) = new_session(&adapter);

    let err = session.connect().await.expect_err("connect must fail");
    assert!(matches!(
        err,
        SessionError::Connection(AdapterError::ConnectFailed)
    ));
    assert_eq!(session.state().await, SessionState::Error);

    let err = session.read().await.expect_err("reads are refused in Error");
    assert!(matches!(err, SessionError::NotReady(SessionState::Error)));

    // An explicit reconnect restarts the cycle.
    session.connect().await.expect("reconnect should succeed");
    assert_eq!(session.state().await, SessionState::Ready);
}

#[tokio::test(start_paused = true)]
async fn discovery_fault_reaches_error_with_topology_absent() {
    let adapter = MockAdapter::new();
    adapter.queue_topology(Err(AdapterError::DiscoveryFailed));
    let (session, _rx) = new_session(&adapter);

    let err = session.connect().await.expect_err("connect must fail");
    assert!(matches!(
        err,
        SessionError::Connection(AdapterError::DiscoveryFailed)
    ));
    assert_eq!(session.state().await, SessionState::Error);
    assert!(session.topology().await.is_none());
    assert!(!session.has_endpoint().await);
}

#[tokio::test(start_paused = true)]
async fn transfer_fault_returns_to_ready_and_keeps_last_text() {
    let adapter = MockAdapter::new();
    adapter.queue_read(Ok(b"Hi".to_vec()));
    adapter.queue_read(Err(AdapterError::ReadFailed));
    adapter.queue_write(Err(AdapterError::WriteFailed));
    let (session, _rx) = new_session(&adapter);
    session.connect().await.expect("connect should succeed");

    session.read().await.expect("first read should succeed");

    let err = session.read().await.expect_err("second read must fail");
    assert!(matches!(
        err,
        SessionError::Transfer(AdapterError::ReadFailed)
    ));
    assert_eq!(session.state().await, SessionState::Ready);
    assert_eq!(session.last_read().await.as_deref(), Some("Hi"));

    let err = session.write("Ping").await.expect_err("write must fail");
    assert!(matches!(
        err,
        SessionError::Transfer(AdapterError::WriteFailed)
    ));
    assert_eq!(session.state().await, SessionState::Ready);

    // The session stays usable after recoverable faults.
    session.write("Ping").await.expect("next write should succeed");
}

#[tokio::test(start_paused = true)]
async fn probe_failure_never_gates_ready() {
    let adapter = MockAdapter::new();
    adapter.queue_probe(Err(AdapterError::ProbeFailed));
    let (session, mut rx) = new_session(&adapter);

    session.connect().await.expect("connect should succeed");
    assert_eq!(session.state().await, SessionState::Ready);

    assert!(adapter
        .calls()
        .iter()
        .any(|call| matches!(call, MockCall::ProbeSignalStrength)));
    let events = drain_events(&mut rx);
    assert!(!events
        .iter()
        .any(|event| matches!(event, SessionEvent::SignalStrength(_))));
}

#[tokio::test(start_paused = true)]
async fn probe_result_is_published() {
    let adapter = MockAdapter::new();
    adapter.queue_probe(Ok(-42));
    let (session, mut rx) = new_session(&adapter);

    session.connect().await.expect("connect should succeed");

    let events = drain_events(&mut rx);
    assert!(events
        .iter()
        .any(|event| matches!(event, SessionEvent::SignalStrength(-42))));
}

#[tokio::test(start_paused = true)]
async fn disconnect_clears_discovery_state() {
    let adapter = MockAdapter::new();
    let (session, _rx) = new_session(&adapter);

    // Disconnecting an idle session never reaches the adapter.
    session.disconnect().await;
    assert!(adapter.calls().is_empty());

    session.connect().await.expect("connect should succeed");
    assert!(session.has_endpoint().await);
    assert!(session.topology().await.is_some());

    session.disconnect().await;
    assert_eq!(session.state().await, SessionState::Disconnected);
    assert!(!session.has_endpoint().await);
    assert!(session.topology().await.is_none());

    let disconnects = adapter
        .calls()
        .iter()
        .filter(|call| matches!(call, MockCall::Disconnect))
        .count();
    assert_eq!(disconnects, 1);
}

#[tokio::test(start_paused = true)]
async fn adapter_disconnect_failure_is_swallowed() {
    let adapter = MockAdapter::new();
    adapter.queue_disconnect(Err(AdapterError::NotConnected));
    let (session, _rx) = new_session(&adapter);

    session.connect().await.expect("connect should succeed");
    session.disconnect().await;
    assert_eq!(session.state().await, SessionState::Disconnected);

    // The session can start a fresh cycle afterwards.
    session.connect().await.expect("reconnect should succeed");
    assert_eq!(session.state().await, SessionState::Ready);
}

