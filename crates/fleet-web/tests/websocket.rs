//! End-to-end tests over a real WebSocket connection.

use std::time::Duration;

use fleet_web::{serve, ServerConfig};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const DELAY: Duration = Duration::from_millis(100);
const TIMEOUT: Duration = Duration::from_secs(5);

async fn start_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = ServerConfig {
        command_delay: DELAY,
        ..ServerConfig::default()
    };

    tokio::spawn(async move {
        serve(listener, &config, std::future::pending()).await.unwrap();
    });

    format!("ws://{addr}/ws")
}

async fn connect(url: &str) -> Client {
    let (client, _) = connect_async(url).await.expect("connect");
    client
}

async fn next_event(client: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(TIMEOUT, client.next())
            .await
            .expect("timed out waiting for event")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn send(client: &mut Client, payload: &str) {
    client.send(Message::text(payload.to_string())).await.unwrap();
}

#[tokio::test]
async fn test_initial_snapshot_on_connect() {
    let url = start_server().await;
    let mut client = connect(&url).await;

    let initial = next_event(&mut client).await;
    assert_eq!(
        initial,
        serde_json::json!({
            "type": "initial",
            "instances": [
                { "id": "1", "state": "running" },
                { "id": "2", "state": "stopped" }
            ]
        })
    );
}

#[tokio::test]
async fn test_create_is_broadcast_to_every_client() {
    let url = start_server().await;
    let mut a = connect(&url).await;
    next_event(&mut a).await;

    send(&mut a, r#"{"action":"create"}"#).await;
    let received = next_event(&mut a).await;
    assert_eq!(received["type"], "received");
    assert_eq!(received["action"], "create");
    let id = received["id"].as_str().unwrap().to_string();
    assert_eq!(received["ts"].as_str().unwrap().len(), 17);

    let mut b = connect(&url).await;
    let initial = next_event(&mut b).await;
    assert_eq!(initial["instances"].as_array().unwrap().len(), 2);

    for client in [&mut a, &mut b] {
        let created = next_event(client).await;
        assert_eq!(created["type"], "created");
        assert_eq!(created["id"], id.as_str());
    }
}

#[tokio::test]
async fn test_malformed_message_keeps_connection_open() {
    let url = start_server().await;
    let mut client = connect(&url).await;
    next_event(&mut client).await;

    send(&mut client, "this is not json").await;
    send(&mut client, r#"{"action":"stop"}"#).await;
    send(&mut client, r#"{"action":"stop","id":"999"}"#).await;

    let received = next_event(&mut client).await;
    assert_eq!(received["type"], "received");
    assert_eq!(received["id"], "999");

    let error = next_event(&mut client).await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["id"], "999");
}

#[tokio::test]
async fn test_closed_client_does_not_block_others() {
    let url = start_server().await;
    let mut a = connect(&url).await;
    let mut b = connect(&url).await;
    next_event(&mut a).await;
    next_event(&mut b).await;

    b.close(None).await.unwrap();
    drop(b);

    send(&mut a, r#"{"action":"start","id":"2"}"#).await;
    assert_eq!(next_event(&mut a).await["type"], "received");
    assert_eq!(next_event(&mut a).await["type"], "started");
}
