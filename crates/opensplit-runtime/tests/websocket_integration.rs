//! End-to-end tests against a real server on a loopback port
//!
//! Clients connect with tokio-tungstenite exactly as a browser observer would
//! and only ever learn about the timer through broadcast snapshots.

use futures::{SinkExt, StreamExt};
use opensplit_core::{config::DEFAULT_WS_PATH, ManualClock, Nanos, TimerSnapshot, TimerStatus};
use opensplit_runtime::{RuntimeBuilder, RuntimeConfig, RuntimeHandle};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_runtime(clock: ManualClock) -> RuntimeHandle {
    RuntimeBuilder::new(RuntimeConfig::testing())
        .with_clock(clock)
        .build_and_start()
        .await
        .expect("Failed to start runtime")
}

async fn connect(runtime: &RuntimeHandle) -> Client {
    let (client, _) = connect_async(runtime.ws_url(DEFAULT_WS_PATH))
        .await
        .expect("Failed to connect");
    client
}

async fn send(client: &mut Client, json: &str) {
    client
        .send(Message::Text(json.to_string()))
        .await
        .expect("Failed to send frame");
}

async fn next_snapshot(client: &mut Client) -> TimerSnapshot {
    loop {
        let message = timeout(Duration::from_secs(2), client.next())
            .await
            .expect("Snapshot should arrive within timeout")
            .expect("Connection should be open")
            .expect("Frame should be valid");
        if let Message::Text(text) = message {
            return TimerSnapshot::from_json(&text).expect("Snapshot should parse");
        }
    }
}

#[tokio::test]
async fn test_initial_snapshot_on_connect() {
    let mut runtime = start_runtime(ManualClock::new()).await;
    let mut client = connect(&runtime).await;

    let snapshot = next_snapshot(&mut client).await;
    assert_eq!(snapshot.status, TimerStatus::Stopped);
    assert_eq!(snapshot.current_time, Nanos::ZERO);
    assert_eq!(snapshot.timer_title, "OpenSplit");
    assert_eq!(snapshot.current_split_index, -1);
    assert!(snapshot.splits.is_empty());

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_commands_fan_out_to_every_observer() {
    let mut runtime = start_runtime(ManualClock::new()).await;
    let mut alice = connect(&runtime).await;
    let mut bob = connect(&runtime).await;
    next_snapshot(&mut alice).await;
    next_snapshot(&mut bob).await;

    send(
        &mut alice,
        r#"{"command":"setSplits","splits":[{"name":"Forest"},{"name":"Castle"}],"title":"Any%"}"#,
    )
    .await;
    for client in [&mut alice, &mut bob] {
        let snapshot = next_snapshot(client).await;
        assert_eq!(snapshot.timer_title, "Any%");
        assert_eq!(snapshot.predefined_splits.len(), 2);
        assert_eq!(snapshot.predefined_splits[0].icon, "🏃");
    }

    send(&mut bob, r#"{"command":"start"}"#).await;
    for client in [&mut alice, &mut bob] {
        let snapshot = next_snapshot(client).await;
        assert_eq!(snapshot.status, TimerStatus::Running);
        assert_eq!(snapshot.current_split_index, 0);
    }

    let stats = runtime.shutdown().await.unwrap();
    assert_eq!(stats.commands_applied, 2);
    assert_eq!(stats.observers_registered, 2);
}

#[tokio::test]
async fn test_invalid_frames_keep_connection_open() {
    let mut runtime = start_runtime(ManualClock::new()).await;
    let mut client = connect(&runtime).await;
    next_snapshot(&mut client).await;

    send(&mut client, "{not json").await;
    send(&mut client, r#"{"command":"fly"}"#).await;
    send(&mut client, r#"{"command":"setWorldRecord"}"#).await;
    send(&mut client, r#"{"command":"start"}"#).await;

    // Only the valid command produces a broadcast
    let snapshot = next_snapshot(&mut client).await;
    assert_eq!(snapshot.status, TimerStatus::Running);

    let stats = runtime.shutdown().await.unwrap();
    assert_eq!(stats.commands_applied, 1);
}

#[tokio::test]
async fn test_full_run_sets_personal_best() {
    let clock = ManualClock::new();
    let mut runtime = start_runtime(clock.clone()).await;
    let mut client = connect(&runtime).await;
    next_snapshot(&mut client).await;

    send(
        &mut client,
        r#"{"command":"setSplits","splits":[{"name":"A"},{"name":"B"}]}"#,
    )
    .await;
    next_snapshot(&mut client).await;

    send(&mut client, r#"{"command":"start"}"#).await;
    next_snapshot(&mut client).await;

    clock.advance(Duration::from_secs(1));
    send(&mut client, r#"{"command":"nextSplit"}"#).await;
    let first = next_snapshot(&mut client).await;
    assert_eq!(first.splits.len(), 1);
    assert_eq!(first.splits[0].segment_time, Nanos::from_millis(1000));
    assert_eq!(first.current_split_index, 1);

    clock.advance(Duration::from_secs(2));
    send(&mut client, r#"{"command":"nextSplit"}"#).await;
    let finished = next_snapshot(&mut client).await;
    assert_eq!(finished.status, TimerStatus::Stopped);
    assert_eq!(finished.current_split_index, -1);
    assert_eq!(finished.personal_best, Nanos::from_millis(3000));
    assert_eq!(
        finished.pb_split_times,
        vec![Nanos::from_millis(1000), Nanos::from_millis(3000)]
    );
    assert_eq!(finished.sum_of_best, Nanos::from_millis(3000));

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_oversized_frame_closes_connection() {
    let mut config = RuntimeConfig::testing();
    config.connection.max_message_size = 1024;
    let mut runtime = RuntimeBuilder::new(config)
        .with_clock(ManualClock::new())
        .build_and_start()
        .await
        .expect("Failed to start runtime");
    let mut client = connect(&runtime).await;
    next_snapshot(&mut client).await;

    let huge_name = "x".repeat(4 * 1024);
    let frame = format!(
        r#"{{"command":"setSplits","splits":[{{"name":"{}"}}]}}"#,
        huge_name
    );
    // The server may reset before the write completes
    let _ = client.send(Message::Text(frame)).await;

    let ended = timeout(Duration::from_secs(2), async {
        loop {
            match client.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(ended.is_ok(), "Connection should be torn down");

    let stats = runtime.shutdown().await.unwrap();
    assert_eq!(stats.commands_applied, 0);
    assert_eq!(stats.observers_registered, 1);
}

#[tokio::test]
async fn test_non_websocket_path_is_rejected() {
    let mut runtime = start_runtime(ManualClock::new()).await;

    let result = connect_async(runtime.ws_url("/elsewhere")).await;
    match result {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), 404),
        other => panic!("Expected a 404, got {:?}", other.map(|(_, r)| r.status())),
    }

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_closes_observers() {
    let mut runtime = start_runtime(ManualClock::new()).await;
    let mut client = connect(&runtime).await;
    next_snapshot(&mut client).await;

    runtime.shutdown().await.unwrap();

    // The write pump sends a close frame once its queue is closed
    let closed = timeout(Duration::from_secs(2), async {
        loop {
            match client.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok());
}
