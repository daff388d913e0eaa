//! Live message subscription over WebSocket
//!
//! The socket first receives a `snapshot` of the conversation, then one
//! `message` event per insert. A subscriber that falls behind the channel
//! buffer is caught up from the store and sent a `resynced` event holding
//! the full merged list.

use crate::chat::{conversations, feed::MessageFeed, messages};
use crate::core::models::Message;
use crate::core::{AppState, Ctx, Result};
use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEvent {
    Snapshot { messages: Vec<Message> },
    Message { message: Message },
    Resynced { messages: Vec<Message> },
}

/// GET /api/conversations/{id}/subscribe
pub async fn subscribe(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    ctx: Ctx,
    Path(id): Path<String>,
) -> Result<Response> {
    // Membership is checked before the upgrade so refusals are plain HTTP errors
    let conversation = conversations::get_for_member(&state.db, ctx.user_id(), &id).await?;
    info!("WS subscribe {} - {}", conversation.id, ctx.user_id());

    Ok(ws.on_upgrade(move |socket| feed_connection(socket, state, conversation.id)))
}

async fn send_event(socket: &mut WebSocket, event: &FeedEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(json) => socket.send(WsMessage::Text(json.into())).await.is_ok(),
        Err(e) => {
            error!("Failed to encode feed event: {}", e);
            true
        }
    }
}

async fn feed_connection(mut socket: WebSocket, state: AppState, conversation_id: String) {
    let (mut feed, mut rx) =
        match MessageFeed::activate(&state.db, &state.feed, &conversation_id).await {
            Ok(activated) => activated,
            Err(e) => {
                error!("Feed activation failed for {}: {}", conversation_id, e);
                let _ = socket.send(WsMessage::Close(None)).await;
                return;
            }
        };

    let snapshot = FeedEvent::Snapshot {
        messages: feed.messages().to_vec(),
    };
    if !send_event(&mut socket, &snapshot).await {
        return;
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(message) => {
                        if feed.apply(message.clone())
                            && !send_event(&mut socket, &FeedEvent::Message { message }).await
                        {
                            break; // client disconnected
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Subscriber to {} lagged, skipped {} messages", conversation_id, n);
                        match messages::history(&state.db, &conversation_id).await {
                            Ok(history) => {
                                feed.merge(history);
                                let event = FeedEvent::Resynced {
                                    messages: feed.messages().to_vec(),
                                };
                                if !send_event(&mut socket, &event).await {
                                    break;
                                }
                            }
                            Err(e) => {
                                error!("Resync of {} failed: {}", conversation_id, e);
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(WsMessage::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(WsMessage::Ping(data))) => {
                        let _ = socket.send(WsMessage::Pong(data)).await;
                    }
                    _ => {} // the feed is server-to-client only
                }
            }
        }
    }

    drop(rx);
    state.feed.prune().await;
    info!("WS closed {}", conversation_id);
}
