//! Integration tests for the client lifecycle
//!
//! These tests drive `init` / `start` / `stop` / `join` from plain threads
//! against a local mock server.

mod common;

use common::{packet, wait_until, Call, MockWsServer, RecordingHandler, ServerScript};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wsbridge::{
    ClientConfig, ClientEvent, ConnectionState, Executor, FaultKind, WebSocketClient,
    WsBridgeError, WORKER_THREAD_NAME,
};

const TIMEOUT: Duration = Duration::from_secs(5);

fn config(server: &MockWsServer) -> ClientConfig {
    ClientConfig::builder()
        .host(server.ws_url())
        .ping_interval(Duration::ZERO)
        .build()
        .unwrap()
}

fn expect_event<H, C>(client: &WebSocketClient<H, C>, expected: ClientEvent)
where
    C: wsbridge::PacketCodec,
    H: wsbridge::ClientHandler<C::Packet>,
{
    let event = client.recv_event_timeout(TIMEOUT).unwrap();
    assert_eq!(event, expected);
}

#[test]
fn test_on_connected_fires_before_any_packet() {
    verbose_println!("Testing hook order on connect...");

    let server = MockWsServer::with_script(ServerScript::greeting(&[r#"{"type":"hello"}"#]));
    let handler: Arc<RecordingHandler> = RecordingHandler::shared();
    let client = WebSocketClient::new(handler.clone());
    client.init(config(&server)).unwrap();
    client.start().unwrap();

    expect_event(&client, ClientEvent::Connected);
    assert!(wait_until(TIMEOUT, || handler.packets().len() == 1));

    let calls = handler.calls();
    assert_eq!(calls[0], Call::Connected);
    assert_eq!(calls[1], Call::Packet(packet(json!({"type": "hello"}))));
    assert_eq!(calls.iter().filter(|c| **c == Call::Connected).count(), 1);

    // Every hook runs on the worker thread
    for name in handler.threads() {
        assert_eq!(name.as_deref(), Some(WORKER_THREAD_NAME));
    }

    client.stop();
    client.join().unwrap();
    verbose_println!("  Calls: {:?}", handler.calls());
}

#[test]
fn test_stop_then_join_waits_for_worker_exit() {
    verbose_println!("Testing stop/join...");

    let server = MockWsServer::start();
    let handler: Arc<RecordingHandler> = RecordingHandler::shared();
    let client = WebSocketClient::new(handler.clone());
    client.init(config(&server)).unwrap();
    client.start().unwrap();
    expect_event(&client, ClientEvent::Connected);
    assert!(client.is_connected());
    assert!(client.is_worker_running());

    client.stop();
    client.join().unwrap();

    // join() returned, so the thread is gone and the session finished
    assert!(!client.is_worker_running());
    assert_eq!(client.connection_state(), ConnectionState::Closed);
    expect_event(&client, ClientEvent::Disconnected);
    assert_eq!(handler.calls().last(), Some(&Call::Disconnected));

    // A second join has nothing left to wait for
    client.join().unwrap();
}

#[test]
fn test_start_while_active_is_ignored() {
    let server = MockWsServer::start();
    let client = WebSocketClient::new(Arc::new(RecordingHandler::<wsbridge::Packet>::default()));
    client.init(config(&server)).unwrap();

    client.start().unwrap();
    client.start().unwrap();
    expect_event(&client, ClientEvent::Connected);
    client.start().unwrap();

    std::thread::sleep(Duration::from_millis(200));
    assert_eq!(server.connections(), 1);
    assert!(client.try_recv_event().is_none());

    client.stop();
    client.join().unwrap();
}

#[test]
fn test_restart_after_join_opens_new_session() {
    verbose_println!("Testing restart...");

    let server = MockWsServer::start();
    let handler: Arc<RecordingHandler> = RecordingHandler::shared();
    let client = WebSocketClient::new(handler.clone());
    client.init(config(&server)).unwrap();

    for round in 1..=2 {
        client.start().unwrap();
        expect_event(&client, ClientEvent::Connected);
        client.stop();
        client.join().unwrap();
        expect_event(&client, ClientEvent::Disconnected);
        assert_eq!(server.connections(), round);
        verbose_println!("  Round {} complete", round);
    }

    let connects = handler
        .calls()
        .iter()
        .filter(|c| **c == Call::Connected)
        .count();
    assert_eq!(connects, 2);
}

#[test]
fn test_restart_after_peer_close_without_stop() {
    verbose_println!("Testing restart after peer close...");

    let server =
        MockWsServer::with_script(ServerScript::greeting(&[r#"{"seq":1}"#]).then_close_first(1));
    let handler: Arc<RecordingHandler> = RecordingHandler::shared();
    let client = WebSocketClient::new(handler.clone());
    client.init(config(&server)).unwrap();

    client.start().unwrap();
    expect_event(&client, ClientEvent::Connected);
    expect_event(&client, ClientEvent::Disconnected);
    assert_eq!(client.connection_state(), ConnectionState::Closed);

    // Same worker, no stop() in between
    client.start().unwrap();
    expect_event(&client, ClientEvent::Connected);
    assert_eq!(client.connection_state(), ConnectionState::Connected);
    assert_eq!(server.connections(), 2);

    let hello = packet(json!({"type": "hello"}));
    client.send_packet(&hello).unwrap();
    assert!(wait_until(TIMEOUT, || handler.packets().contains(&hello)));
    assert_eq!(server.received(), vec![r#"{"type":"hello"}"#.to_string()]);

    client.stop();
    client.join().unwrap();
    expect_event(&client, ClientEvent::Disconnected);
}

#[test]
fn test_misuse_surfaces_to_caller() {
    let server = MockWsServer::start();
    let handler: Arc<RecordingHandler> = RecordingHandler::shared();
    let client = WebSocketClient::new(handler.clone());
    let hello = packet(json!({"type": "hello"}));

    assert_eq!(client.start(), Err(WsBridgeError::NotInitialized));
    assert_eq!(client.send_packet(&hello), Err(WsBridgeError::NotInitialized));

    client.init(config(&server)).unwrap();
    assert_eq!(client.send_packet(&hello), Err(WsBridgeError::NotConnected));

    client.start().unwrap();
    expect_event(&client, ClientEvent::Connected);
    assert_eq!(
        client.init(config(&server)),
        Err(WsBridgeError::InvalidState("init() while a session is active".into()))
    );

    client.stop();
    let result = client.send_packet(&hello);
    assert!(matches!(result, Err(WsBridgeError::LoopStopped(_))));

    // Scheduling onto a stopped loop is also reported through on_error
    assert!(wait_until(TIMEOUT, || handler
        .calls()
        .iter()
        .any(|c| matches!(c, Call::Error { kind: FaultKind::CallerMisuse, .. }))));

    let joined = client.join();
    assert!(matches!(joined, Err(WsBridgeError::LoopStopped(_))));
}

#[test]
fn test_attached_executor_spawns_no_thread() {
    verbose_println!("Testing attached executor...");

    let server = MockWsServer::start();
    let handler: Arc<RecordingHandler> = RecordingHandler::shared();
    let client = WebSocketClient::builder(handler.clone())
        .executor(Executor::Attached(server.handle()))
        .build();
    client.init(config(&server)).unwrap();
    client.start().unwrap();

    expect_event(&client, ClientEvent::Connected);
    assert!(!client.owns_worker_thread());
    assert!(!client.is_worker_running());

    client.send_packet(&packet(json!({"type": "ping"}))).unwrap();
    assert!(wait_until(TIMEOUT, || handler.packets().len() == 1));

    client.stop();
    client.join().unwrap();
    expect_event(&client, ClientEvent::Disconnected);

    // The host runtime keeps serving work after the client stopped
    let value = server.handle().block_on(async { tokio::spawn(async { 42 }).await.unwrap() });
    assert_eq!(value, 42);
}

#[test]
fn test_connect_failure_reports_connect_fault() {
    verbose_println!("Testing connect failure...");

    // Bind and release a port so nothing listens on it
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let handler: Arc<RecordingHandler> = RecordingHandler::shared();
    let client = WebSocketClient::new(handler.clone());
    client
        .init(
            ClientConfig::builder()
                .host(format!("ws://127.0.0.1:{}/socket", port))
                .build()
                .unwrap(),
        )
        .unwrap();
    client.start().unwrap();

    let event = client.recv_event_timeout(TIMEOUT).unwrap();
    assert!(matches!(event, ClientEvent::Error(WsBridgeError::Connect(_))));
    assert_eq!(client.connection_state(), ConnectionState::Closed);

    client.stop();
    assert!(matches!(client.join(), Err(WsBridgeError::Connect(_))));

    // Never connected, so neither on_connected nor on_disconnected ran
    assert_eq!(
        handler.calls(),
        vec![Call::Error {
            kind: FaultKind::Connect,
            last_sent: None,
            last_received: None,
        }]
    );
}
