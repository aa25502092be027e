mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use common::{FakeProviders, audio, interim_transcript};
use voxbridge::{ServerConfig, routes, state::AppState};

type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

async fn serve(providers: Arc<FakeProviders>, public_host: Option<&str>) -> SocketAddr {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        public_host: public_host.map(str::to_string),
        initial_message: "Hello caller.".to_string(),
        ..Default::default()
    };
    let app_state = AppState::with_providers(config, providers);
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr) -> Client {
    let url = format!("ws://{addr}/connection");
    let (ws, _) = connect_async(url).await.expect("Failed to connect");
    ws
}

async fn send(ws: &mut Client, frame: Value) {
    ws.send(Message::Text(frame.to_string().into())).await.unwrap();
}

async fn next_frame(ws: &mut Client) -> Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("Timed out waiting for a frame")
            .expect("Connection closed")
            .unwrap();
        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn start_call(ws: &mut Client) {
    send(ws, json!({"event": "connected", "protocol": "Call", "version": "1.0.0"})).await;
    send(
        ws,
        json!({
            "event": "start",
            "sequenceNumber": "1",
            "start": {
                "streamSid": "MZ200",
                "callSid": "CA200",
                "accountSid": "AC1",
                "tracks": ["inbound"],
                "customParameters": {},
                "mediaFormat": {"encoding": "audio/x-mulaw", "sampleRate": 8000, "channels": 1}
            },
            "streamSid": "MZ200"
        }),
    )
    .await;
}

async fn active_sessions(addr: SocketAddr) -> u64 {
    let body: Value = reqwest::get(format!("http://{addr}/"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "OK");
    body["active_sessions"].as_u64().unwrap()
}

#[tokio::test]
async fn test_call_lifecycle_over_websocket() {
    let providers = Arc::new(FakeProviders::new(vec![]));
    let addr = serve(providers.clone(), None).await;
    assert_eq!(active_sessions(addr).await, 0);

    let mut ws = connect(addr).await;
    start_call(&mut ws).await;

    let media = next_frame(&mut ws).await;
    assert_eq!(media["event"], "media");
    assert_eq!(media["streamSid"], "MZ200");
    assert_eq!(media["media"]["payload"], audio("Hello caller."));

    let mark = next_frame(&mut ws).await;
    assert_eq!(mark["event"], "mark");
    assert_eq!(mark["streamSid"], "MZ200");
    let mark_name = mark["mark"]["name"].as_str().unwrap().to_string();
    assert!(!mark_name.is_empty());
    assert_eq!(active_sessions(addr).await, 1);

    send(
        &mut ws,
        json!({"event": "mark", "streamSid": "MZ200", "mark": {"name": mark_name}}),
    )
    .await;
    send(
        &mut ws,
        json!({
            "event": "media",
            "streamSid": "MZ200",
            "media": {"track": "inbound", "chunk": "1", "timestamp": "5", "payload": audio("caller")}
        }),
    )
    .await;
    assert!(common::eventually(|| providers.audio.lock().as_slice() == b"caller").await);

    send(&mut ws, json!({"event": "stop", "streamSid": "MZ200", "stop": {}})).await;

    let mut remaining = 0;
    for _ in 0..100 {
        remaining = active_sessions(addr).await;
        if remaining == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn test_barge_in_sends_clear_frame() {
    let providers = Arc::new(FakeProviders::new(vec![]));
    let addr = serve(providers.clone(), None).await;

    let mut ws = connect(addr).await;
    start_call(&mut ws).await;
    assert_eq!(next_frame(&mut ws).await["event"], "media");
    assert_eq!(next_frame(&mut ws).await["event"], "mark");

    providers.emit(interim_transcript("wait a second")).await;

    let clear = next_frame(&mut ws).await;
    assert_eq!(clear, json!({"event": "clear", "streamSid": "MZ200"}));

    ws.close(None).await.unwrap();
}

#[tokio::test]
async fn test_malformed_frames_do_not_end_the_connection() {
    let providers = Arc::new(FakeProviders::new(vec![]));
    let addr = serve(providers, None).await;

    let mut ws = connect(addr).await;
    ws.send(Message::Text("not json".into())).await.unwrap();
    send(&mut ws, json!({"event": "dtmf", "dtmf": {"digit": "1"}})).await;
    send(&mut ws, json!({"event": "media", "media": {"payload": "AAAA"}})).await;

    start_call(&mut ws).await;
    assert_eq!(next_frame(&mut ws).await["event"], "media");

    ws.close(None).await.unwrap();
}

#[tokio::test]
async fn test_incoming_call_twiml() {
    let providers = Arc::new(FakeProviders::new(vec![]));
    let addr = serve(providers, None).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/incoming"))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/xml"
    );
    let body = response.text().await.unwrap();
    assert!(body.contains(&format!("wss://{addr}/connection")));

    let providers = Arc::new(FakeProviders::new(vec![]));
    let addr = serve(providers, Some("bridge.example.com")).await;
    let body = reqwest::get(format!("http://{addr}/incoming"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("wss://bridge.example.com/connection"));
}
