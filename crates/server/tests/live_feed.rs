//! The subscribe endpoint driven over a real socket.

use chrono::DateTime;
use cynefin_server::app;
use cynefin_server::chat::{conversations, messages};
use cynefin_server::core::models::{Conversation, Message};
use cynefin_server::core::{AppState, CynefinConfig};
use futures::StreamExt;
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use tempfile::{tempdir, TempDir};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve(feed_capacity: usize) -> (TempDir, AppState, SocketAddr) {
    let dir = tempdir().unwrap();
    let mut config = CynefinConfig::with_base_dir(dir.path());
    config.bcrypt_cost = 4;
    config.feed_capacity = feed_capacity;
    let state = AppState::open(config).await.unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (dir, state, addr)
}

/// Returns (token, user_id)
async fn login(state: &AppState, name: &str) -> (String, String) {
    let email = format!("{}@example.com", name.to_lowercase());
    let profile = state.auth.signup(&email, name, "password1").await.unwrap();
    let (_, session) = state.auth.login(&email, "password1").await.unwrap();
    (session.token, profile.id)
}

async fn connect(
    addr: SocketAddr,
    conversation_id: &str,
    token: &str,
) -> Result<Socket, WsError> {
    let url = format!("ws://{}/api/conversations/{}/subscribe", addr, conversation_id);
    let mut request = url.into_client_request().unwrap();
    request.headers_mut().insert(
        "authorization",
        format!("Bearer {}", token).parse().unwrap(),
    );
    connect_async(request).await.map(|(socket, _)| socket)
}

async fn next_event(socket: &mut Socket) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for a feed event")
            .expect("socket closed")
            .unwrap();
        if let WsMessage::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

fn ids(event: &Value) -> Vec<String> {
    event["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap().to_string())
        .collect()
}

async fn direct(state: &AppState, a: &str, b: &str) -> Conversation {
    conversations::resolve_direct(&state.db, a, b).await.unwrap()
}

#[tokio::test]
async fn test_snapshot_then_live_message() {
    let (_dir, state, addr) = serve(16).await;
    let (alice_token, alice) = login(&state, "Alice").await;
    let (_, bob) = login(&state, "Bob").await;
    let conv = direct(&state, &alice, &bob).await;

    let earlier = messages::send(&state.db, &state.feed, &conv, &bob, "hello")
        .await
        .unwrap()
        .unwrap();

    let mut socket = connect(addr, &conv.id, &alice_token).await.unwrap();

    let snapshot = next_event(&mut socket).await;
    assert_eq!(snapshot["type"], "snapshot");
    assert_eq!(ids(&snapshot), vec![earlier.id.clone()]);

    let sent = messages::send(&state.db, &state.feed, &conv, &alice, "hi back")
        .await
        .unwrap()
        .unwrap();

    let live = next_event(&mut socket).await;
    assert_eq!(live["type"], "message");
    assert_eq!(live["message"]["id"], sent.id.as_str());
    assert_eq!(live["message"]["content"], "hi back");
    assert_eq!(live["message"]["sender_id"], alice.as_str());

    // The live copy is the stored row
    let received: Message = serde_json::from_value(live["message"].clone()).unwrap();
    let stored = messages::history(&state.db, &conv.id).await.unwrap();
    assert_eq!(stored.last(), Some(&received));
}

#[tokio::test]
async fn test_outsider_is_refused_before_upgrade() {
    let (_dir, state, addr) = serve(16).await;
    let (_, alice) = login(&state, "Alice").await;
    let (_, bob) = login(&state, "Bob").await;
    let (carol_token, _) = login(&state, "Carol").await;
    let conv = direct(&state, &alice, &bob).await;

    match connect(addr, &conv.id, &carol_token).await {
        Err(WsError::Http(response)) => assert_eq!(response.status(), 403),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("outsider was allowed to subscribe"),
    }

    match connect(addr, &conv.id, "not-a-token").await {
        Err(WsError::Http(response)) => assert_eq!(response.status(), 401),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("anonymous client was allowed to subscribe"),
    }
}

#[tokio::test]
async fn test_lagging_socket_is_resynced_in_order() {
    let (_dir, state, addr) = serve(2).await;
    let (alice_token, alice) = login(&state, "Alice").await;
    let (_, bob) = login(&state, "Bob").await;
    let conv = direct(&state, &alice, &bob).await;

    let mut socket = connect(addr, &conv.id, &alice_token).await.unwrap();
    let snapshot = next_event(&mut socket).await;
    assert_eq!(snapshot["type"], "snapshot");
    assert!(ids(&snapshot).is_empty());

    // Store five rows, then publish them back to back with nothing in
    // between that lets the server task drain its receiver
    let mut burst = Vec::new();
    for i in 0..5 {
        let message = Message {
            id: format!("m{}", i),
            conversation_id: conv.id.clone(),
            sender_id: bob.clone(),
            content: format!("burst {}", i),
            created_at: DateTime::from_timestamp_micros(1_700_000_000_000_000 + i).unwrap(),
        };
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, sender_id, content, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&message.id)
        .bind(&message.conversation_id)
        .bind(&message.sender_id)
        .bind(&message.content)
        .bind(message.created_at.timestamp_micros())
        .execute(&state.db)
        .await
        .unwrap();
        burst.push(message);
    }
    for message in burst {
        state.feed.publish(message).await;
    }

    let resynced = next_event(&mut socket).await;
    assert_eq!(resynced["type"], "resynced");
    assert_eq!(ids(&resynced), vec!["m0", "m1", "m2", "m3", "m4"]);

    // Buffered duplicates are swallowed; the next event is a fresh insert
    let sent = messages::send(&state.db, &state.feed, &conv, &alice, "caught up")
        .await
        .unwrap()
        .unwrap();
    let live = next_event(&mut socket).await;
    assert_eq!(live["type"], "message");
    assert_eq!(live["message"]["id"], sent.id.as_str());
}
