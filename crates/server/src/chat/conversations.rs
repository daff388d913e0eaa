//! Conversation resolver
//!
//! A conversation between two users is created lazily the first time either
//! of them opens it. Lookups match both orderings of the pair and the store
//! keeps the unordered pair unique, so racing resolves land on one row.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::chat::groups;
use crate::core::error::{Error, Result};
use crate::core::models::{to_micros, Conversation, ConversationRow};

const SELECT_CONVERSATION: &str =
    "SELECT id, participant_1, participant_2, is_group, group_id, created_at FROM conversations";

/// Find or create the individual conversation between `self_id` and `other_id`.
pub async fn resolve_direct(db: &SqlitePool, self_id: &str, other_id: &str) -> Result<Conversation> {
    if self_id == other_id {
        return Err(Error::BadRequest(
            "Cannot start a conversation with yourself".to_string(),
        ));
    }

    let other: Option<(String,)> = sqlx::query_as("SELECT id FROM profiles WHERE id = ?")
        .bind(other_id)
        .fetch_optional(db)
        .await?;
    if other.is_none() {
        warn!("[Conversations] Unknown user {}", other_id);
        return Err(Error::NotFound("User not found".to_string()));
    }

    if let Some(existing) = find_direct(db, self_id, other_id).await? {
        return Ok(existing);
    }

    let result = sqlx::query(
        "INSERT OR IGNORE INTO conversations (id, participant_1, participant_2, is_group, group_id, created_at) VALUES (?, ?, ?, 0, NULL, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(self_id)
    .bind(other_id)
    .bind(to_micros(Utc::now()))
    .execute(db)
    .await?;

    if result.rows_affected() > 0 {
        info!("[Conversations] Created conversation {} <-> {}", self_id, other_id);
    }

    // Either our row or the one a concurrent resolve inserted first
    find_direct(db, self_id, other_id)
        .await?
        .ok_or_else(|| Error::Internal("Conversation vanished after insert".to_string()))
}

async fn find_direct(db: &SqlitePool, a: &str, b: &str) -> Result<Option<Conversation>> {
    let row = sqlx::query_as::<_, ConversationRow>(&format!(
        "{} WHERE is_group = 0 AND ((participant_1 = ? AND participant_2 = ?) OR (participant_1 = ? AND participant_2 = ?)) LIMIT 1",
        SELECT_CONVERSATION
    ))
    .bind(a)
    .bind(b)
    .bind(b)
    .bind(a)
    .fetch_optional(db)
    .await?;

    Ok(row.map(Conversation::from))
}

/// Find or create the conversation of a group the caller belongs to.
pub async fn resolve_group(db: &SqlitePool, user_id: &str, group_id: &str) -> Result<Conversation> {
    let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM groups WHERE id = ?")
        .bind(group_id)
        .fetch_optional(db)
        .await?;
    if exists.is_none() {
        return Err(Error::NotFound("Group not found".to_string()));
    }

    if !groups::is_member(db, group_id, user_id).await? {
        warn!("[Conversations] {} is not a member of group {}", user_id, group_id);
        return Err(Error::Forbidden("Not a member of this group".to_string()));
    }

    if let Some(existing) = find_group(db, group_id).await? {
        return Ok(existing);
    }

    sqlx::query(
        "INSERT OR IGNORE INTO conversations (id, participant_1, participant_2, is_group, group_id, created_at) VALUES (?, NULL, NULL, 1, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(group_id)
    .bind(to_micros(Utc::now()))
    .execute(db)
    .await?;

    find_group(db, group_id)
        .await?
        .ok_or_else(|| Error::Internal("Group conversation vanished after insert".to_string()))
}

pub(crate) async fn find_group(db: &SqlitePool, group_id: &str) -> Result<Option<Conversation>> {
    let row = sqlx::query_as::<_, ConversationRow>(&format!(
        "{} WHERE is_group = 1 AND group_id = ?",
        SELECT_CONVERSATION
    ))
    .bind(group_id)
    .fetch_optional(db)
    .await?;

    Ok(row.map(Conversation::from))
}

/// Fetch a conversation and check that `user_id` takes part in it.
pub async fn get_for_member(
    db: &SqlitePool,
    user_id: &str,
    conversation_id: &str,
) -> Result<Conversation> {
    let conversation = sqlx::query_as::<_, ConversationRow>(&format!(
        "{} WHERE id = ?",
        SELECT_CONVERSATION
    ))
    .bind(conversation_id)
    .fetch_optional(db)
    .await?
    .map(Conversation::from)
    .ok_or_else(|| Error::NotFound("Conversation not found".to_string()))?;

    if is_participant(db, &conversation, user_id).await? {
        Ok(conversation)
    } else {
        Err(Error::Forbidden(
            "Not a participant in this conversation".to_string(),
        ))
    }
}

/// Direct participants, or members of the group for group conversations.
pub async fn is_participant(
    db: &SqlitePool,
    conversation: &Conversation,
    user_id: &str,
) -> Result<bool> {
    match (&conversation.group_id, conversation.is_group) {
        (Some(group_id), true) => groups::is_member(db, group_id, user_id).await,
        _ => Ok(conversation.has_participant(user_id)),
    }
}

/// Every conversation `user_id` takes part in, oldest first.
pub async fn list_for_user(db: &SqlitePool, user_id: &str) -> Result<Vec<Conversation>> {
    let rows = sqlx::query_as::<_, ConversationRow>(&format!(
        "{} WHERE participant_1 = ? OR participant_2 = ? OR group_id IN (SELECT group_id FROM group_members WHERE user_id = ?) ORDER BY created_at ASC, rowid ASC",
        SELECT_CONVERSATION
    ))
    .bind(user_id)
    .bind(user_id)
    .bind(user_id)
    .fetch_all(db)
    .await?;

    Ok(rows.into_iter().map(Conversation::from).collect())
}
