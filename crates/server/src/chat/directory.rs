//! User directory and chat listings
//!
//! Nothing here is cached; every call re-queries the store.

use sqlx::SqlitePool;
use tracing::warn;

use crate::core::error::{Error, Result};
use crate::core::models::{from_micros, other_participant, ChatSummary, Profile};

/// Default length of the recent chats listing
pub const DEFAULT_RECENT_LIMIT: i64 = 5;

/// Everyone except the caller, by name.
pub async fn list_directory(db: &SqlitePool, self_id: &str) -> Result<Vec<Profile>> {
    let profiles = sqlx::query_as::<_, Profile>(
        "SELECT id, full_name, email, avatar_url FROM profiles WHERE id != ? ORDER BY full_name COLLATE NOCASE ASC",
    )
    .bind(self_id)
    .fetch_all(db)
    .await?;

    Ok(profiles)
}

#[derive(Debug, sqlx::FromRow)]
struct ChatRow {
    id: String,
    participant_1: Option<String>,
    participant_2: Option<String>,
    is_group: bool,
    group_id: Option<String>,
    last_message: Option<String>,
    last_message_time: Option<i64>,
}

/// Conversations with at least one message, most recent first.
pub async fn recent_chats(db: &SqlitePool, self_id: &str, limit: i64) -> Result<Vec<ChatSummary>> {
    let limit = if limit > 0 { limit } else { DEFAULT_RECENT_LIMIT };

    let rows = sqlx::query_as::<_, ChatRow>(
        r#"
        SELECT c.id, c.participant_1, c.participant_2, c.is_group, c.group_id,
               m.content AS last_message, m.created_at AS last_message_time
        FROM conversations c
        JOIN messages m ON m.id = (
            SELECT id FROM messages
            WHERE conversation_id = c.id
            ORDER BY created_at DESC, rowid DESC
            LIMIT 1
        )
        WHERE c.participant_1 = ? OR c.participant_2 = ?
           OR c.group_id IN (SELECT group_id FROM group_members WHERE user_id = ?)
        ORDER BY m.created_at DESC, m.rowid DESC
        LIMIT ?
        "#,
    )
    .bind(self_id)
    .bind(self_id)
    .bind(self_id)
    .bind(limit)
    .fetch_all(db)
    .await?;

    Ok(enrich(db, self_id, rows).await)
}

/// Every conversation of the caller, including ones without messages,
/// optionally filtered by a case-insensitive substring of the display name.
pub async fn all_chats(
    db: &SqlitePool,
    self_id: &str,
    search: Option<&str>,
) -> Result<Vec<ChatSummary>> {
    let rows = sqlx::query_as::<_, ChatRow>(
        r#"
        SELECT c.id, c.participant_1, c.participant_2, c.is_group, c.group_id,
               m.content AS last_message, m.created_at AS last_message_time
        FROM conversations c
        LEFT JOIN messages m ON m.id = (
            SELECT id FROM messages
            WHERE conversation_id = c.id
            ORDER BY created_at DESC, rowid DESC
            LIMIT 1
        )
        WHERE c.participant_1 = ? OR c.participant_2 = ?
           OR c.group_id IN (SELECT group_id FROM group_members WHERE user_id = ?)
        ORDER BY COALESCE(m.created_at, c.created_at) DESC
        "#,
    )
    .bind(self_id)
    .bind(self_id)
    .bind(self_id)
    .fetch_all(db)
    .await?;

    let chats = enrich(db, self_id, rows).await;

    let needle = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);
    Ok(match needle {
        Some(needle) => chats
            .into_iter()
            .filter(|c| c.participant_name.to_lowercase().contains(&needle))
            .collect(),
        None => chats,
    })
}

/// Give each row a display name; rows whose lookup fails are dropped.
async fn enrich(db: &SqlitePool, self_id: &str, rows: Vec<ChatRow>) -> Vec<ChatSummary> {
    let mut chats = Vec::with_capacity(rows.len());

    for row in rows {
        match display_name(db, self_id, &row).await {
            Ok((participant_id, participant_name)) => {
                let group_name = row.is_group.then(|| participant_name.clone());
                chats.push(ChatSummary {
                    id: row.id,
                    participant_id,
                    participant_name,
                    last_message: row.last_message,
                    last_message_time: row.last_message_time.map(from_micros),
                    is_group: row.is_group,
                    group_name,
                });
            }
            Err(e) => warn!("[Directory] Skipping conversation {}: {}", row.id, e),
        }
    }

    chats
}

async fn display_name(db: &SqlitePool, self_id: &str, row: &ChatRow) -> Result<(String, String)> {
    if row.is_group {
        let group_id = row
            .group_id
            .as_deref()
            .ok_or_else(|| Error::NotFound("Group conversation without group".to_string()))?;
        let (name,) = sqlx::query_as::<_, (String,)>("SELECT name FROM groups WHERE id = ?")
            .bind(group_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| Error::NotFound("Group not found".to_string()))?;
        return Ok((group_id.to_string(), name));
    }

    let other = other_participant(
        row.participant_1.as_deref(),
        row.participant_2.as_deref(),
        self_id,
    )
    .ok_or_else(|| Error::NotFound("Conversation has no participants".to_string()))?;
    let (name,) = sqlx::query_as::<_, (String,)>("SELECT full_name FROM profiles WHERE id = ?")
        .bind(other)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| Error::NotFound("Profile not found".to_string()))?;

    Ok((other.to_string(), name))
}
