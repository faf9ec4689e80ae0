//! End-to-end relay sessions over a real WebSocket

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use eeg_relay::{
    config::{PlayerConfig, RelayConfig, ServerConfig},
    lsl::{Player, Recording, StreamRegistry},
    protocol::ServerMessage,
    relay::{LocalDiscovery, Relay, WindowPolicy},
    server::RelayServer,
};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const CHANNELS: [&str; 6] = ["Fp1", "Fp2", "Cz", "O1", "O2", "Pz"];

struct Harness {
    addr: SocketAddr,
    _player: Option<Player>,
    server: JoinHandle<eeg_relay::Result<()>>,
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn start(with_stream: bool) -> Harness {
    let registry = StreamRegistry::new();

    let player = if with_stream {
        let config = PlayerConfig {
            chunk_size: 25,
            ..PlayerConfig::default()
        };
        let recording = Recording::synthetic(
            CHANNELS.iter().map(|c| c.to_string()).collect(),
            config.sample_rate,
            10.0,
        )
        .unwrap();
        Some(Player::start(&registry, recording, &config).unwrap())
    } else {
        None
    };

    let relay = Relay::new(
        LocalDiscovery::new(registry),
        RelayConfig::default()
            .window(WindowPolicy::Fixed { seconds: 0.5 })
            .poll_interval_ms(20),
    );
    let server_config = ServerConfig {
        bind_address: "127.0.0.1".into(),
        port: 0,
    };
    let (addr, server) = RelayServer::new(server_config, relay)
        .start_background()
        .await
        .unwrap();

    Harness {
        addr,
        _player: player,
        server,
    }
}

async fn connect(addr: SocketAddr) -> Client {
    let (ws, _) = connect_async(format!("ws://{}/", addr)).await.unwrap();
    ws
}

async fn next_message(ws: &mut Client) -> ServerMessage {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for server")
            .expect("connection ended")
            .unwrap();
        match frame {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}

/// The server must not send any further text frames
async fn assert_closed(ws: &mut Client) {
    let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("server did not close");
    if let Some(Ok(Message::Text(text))) = frame {
        panic!("unexpected message after terminal error: {}", text);
    }
}

#[tokio::test]
async fn test_full_session_streams_selected_channels() {
    let harness = start(true).await;
    let mut ws = connect(harness.addr).await;

    assert_eq!(
        next_message(&mut ws).await,
        ServerMessage::StreamList {
            streams: vec!["SimEEG".into()]
        }
    );

    ws.send(Message::Text(r#"{"stream_name":"SimEEG"}"#.into())).await.unwrap();
    assert_eq!(
        next_message(&mut ws).await,
        ServerMessage::ChannelList {
            channels: CHANNELS.iter().map(|c| c.to_string()).collect()
        }
    );

    ws.send(Message::Text(r#"{"selected_channels":["Fp1","Cz"]}"#.into()))
        .await
        .unwrap();

    for _ in 0..3 {
        match next_message(&mut ws).await {
            ServerMessage::DataWindow(window) => {
                assert_eq!(window.selected_channels, vec!["Fp1", "Cz"]);
                assert_eq!(window.data.len(), 2);
                assert!(window.is_well_formed());
                assert!(!window.timestamps.is_empty());
                assert!(window.timestamps.len() <= 125);
                assert!(window.timestamps.windows(2).all(|w| w[0] <= w[1]));
                assert_eq!(window.winsize, Some(0.5));
            }
            other => panic!("expected data, got {:?}", other),
        }
    }

    ws.close(None).await.unwrap();
}

#[tokio::test]
async fn test_invalid_channel_selection_closes_session() {
    let harness = start(true).await;
    let mut ws = connect(harness.addr).await;

    next_message(&mut ws).await;
    ws.send(Message::Text(r#"{"stream_name":"SimEEG"}"#.into())).await.unwrap();
    next_message(&mut ws).await;

    ws.send(Message::Text(r#"{"selected_channels":["Fp1","NotAChannel"]}"#.into()))
        .await
        .unwrap();
    assert_eq!(
        next_message(&mut ws).await,
        ServerMessage::error("Invalid channel selection.")
    );
    assert_closed(&mut ws).await;
}

#[tokio::test]
async fn test_invalid_stream_name() {
    let harness = start(true).await;
    let mut ws = connect(harness.addr).await;

    next_message(&mut ws).await;
    ws.send(Message::Text(r#"{"stream_name":"Nope"}"#.into())).await.unwrap();
    assert_eq!(next_message(&mut ws).await, ServerMessage::error("Invalid stream name."));
    assert_closed(&mut ws).await;
}

#[tokio::test]
async fn test_no_streams_available() {
    let harness = start(false).await;
    let mut ws = connect(harness.addr).await;

    assert_eq!(next_message(&mut ws).await, ServerMessage::error("No streams available."));
    assert_closed(&mut ws).await;
}

#[tokio::test]
async fn test_health_endpoint() {
    let harness = start(true).await;

    let mut stream = TcpStream::connect(harness.addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains(r#""status":"ok""#));
    assert!(response.contains(r#""stream_count":1"#));
}
