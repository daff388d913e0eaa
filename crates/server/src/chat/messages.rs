//! Message history and the send call

use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::chat::conversations;
use crate::core::error::{Error, Result};
use crate::core::feed::ChangeFeed;
use crate::core::models::{stored_now, to_micros, Conversation, Message, MessageRow};

/// All messages of a conversation, oldest first. Insertion order breaks ties.
pub async fn history(db: &SqlitePool, conversation_id: &str) -> Result<Vec<Message>> {
    let rows = sqlx::query_as::<_, MessageRow>(
        "SELECT id, conversation_id, sender_id, content, created_at FROM messages WHERE conversation_id = ? ORDER BY created_at ASC, rowid ASC",
    )
    .bind(conversation_id)
    .fetch_all(db)
    .await?;

    Ok(rows.into_iter().map(Message::from).collect())
}

/// Store one message and publish it on the change feed.
///
/// The text is trimmed first; nothing is written for blank input and
/// `Ok(None)` is returned.
pub async fn send(
    db: &SqlitePool,
    feed: &ChangeFeed,
    conversation: &Conversation,
    sender_id: &str,
    text: &str,
) -> Result<Option<Message>> {
    let content = text.trim();
    if content.is_empty() {
        return Ok(None);
    }

    if !conversations::is_participant(db, conversation, sender_id).await? {
        warn!(
            "[Messages] {} tried to post into {}",
            sender_id, conversation.id
        );
        return Err(Error::Forbidden(
            "Not a participant in this conversation".to_string(),
        ));
    }

    let message = Message {
        id: Uuid::new_v4().to_string(),
        conversation_id: conversation.id.clone(),
        sender_id: sender_id.to_string(),
        content: content.to_string(),
        created_at: stored_now(),
    };

    sqlx::query(
        "INSERT INTO messages (id, conversation_id, sender_id, content, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&message.id)
    .bind(&message.conversation_id)
    .bind(&message.sender_id)
    .bind(&message.content)
    .bind(to_micros(message.created_at))
    .execute(db)
    .await?;

    let reached = feed.publish(message.clone()).await;
    info!(
        "[Messages] {} -> {} ({} live subscribers)",
        sender_id, conversation.id, reached
    );

    Ok(Some(message))
}
