//! Groups and membership

use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::chat::conversations;
use crate::core::error::{Error, Result};
use crate::core::models::{
    from_micros, stored_now, to_micros, Group, GroupDetail, GroupMember, GroupRole, GroupRow,
};

/// Input of the create-group dialog
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewGroup {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub member_ids: Vec<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct MemberRow {
    group_id: String,
    user_id: String,
    role: String,
    joined_at: i64,
}

impl TryFrom<MemberRow> for GroupMember {
    type Error = Error;

    fn try_from(row: MemberRow) -> Result<Self> {
        let role = GroupRole::parse(&row.role)
            .ok_or_else(|| Error::Internal(format!("Unknown group role {}", row.role)))?;
        Ok(Self {
            group_id: row.group_id,
            user_id: row.user_id,
            role,
            joined_at: from_micros(row.joined_at),
        })
    }
}

/// Creates the group, its memberships and its conversation in one transaction.
/// The creator joins as admin; with N selected members the group ends up
/// with N + 1 membership rows.
pub async fn create_group(db: &SqlitePool, creator_id: &str, new: NewGroup) -> Result<GroupDetail> {
    let name = new.name.trim();
    if name.is_empty() {
        return Err(Error::BadRequest("Group name is required".to_string()));
    }

    let description = new
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    let mut member_ids: Vec<String> = Vec::new();
    for id in new.member_ids.iter().map(|id| id.trim()) {
        if !id.is_empty() && id != creator_id && !member_ids.iter().any(|m| m == id) {
            member_ids.push(id.to_string());
        }
    }
    if member_ids.is_empty() {
        return Err(Error::BadRequest(
            "Select at least one member".to_string(),
        ));
    }

    for id in &member_ids {
        let found: Option<(String,)> = sqlx::query_as("SELECT id FROM profiles WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await?;
        if found.is_none() {
            warn!("[Groups] Unknown member {}", id);
            return Err(Error::NotFound(format!("User not found: {}", id)));
        }
    }

    let now = stored_now();
    let group = Group {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        description,
        creator_id: creator_id.to_string(),
        created_at: now,
    };
    let conversation_id = Uuid::new_v4().to_string();

    let mut tx = db.begin().await?;

    sqlx::query(
        "INSERT INTO groups (id, name, description, creator_id, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&group.id)
    .bind(&group.name)
    .bind(&group.description)
    .bind(&group.creator_id)
    .bind(to_micros(now))
    .execute(&mut *tx)
    .await?;

    let mut members = Vec::with_capacity(member_ids.len() + 1);
    members.push(GroupMember {
        group_id: group.id.clone(),
        user_id: creator_id.to_string(),
        role: GroupRole::Admin,
        joined_at: now,
    });
    members.extend(member_ids.into_iter().map(|user_id| GroupMember {
        group_id: group.id.clone(),
        user_id,
        role: GroupRole::Member,
        joined_at: now,
    }));

    for member in &members {
        sqlx::query(
            "INSERT INTO group_members (group_id, user_id, role, joined_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&member.group_id)
        .bind(&member.user_id)
        .bind(member.role.as_str())
        .bind(to_micros(member.joined_at))
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query(
        "INSERT INTO conversations (id, participant_1, participant_2, is_group, group_id, created_at) VALUES (?, NULL, NULL, 1, ?, ?)",
    )
    .bind(&conversation_id)
    .bind(&group.id)
    .bind(to_micros(now))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(
        "[Groups] {} created '{}' with {} members",
        creator_id,
        group.name,
        members.len()
    );

    Ok(GroupDetail {
        group,
        members,
        conversation_id: Some(conversation_id),
    })
}

pub async fn is_member(db: &SqlitePool, group_id: &str, user_id: &str) -> Result<bool> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT role FROM group_members WHERE group_id = ? AND user_id = ?")
            .bind(group_id)
            .bind(user_id)
            .fetch_optional(db)
            .await?;
    Ok(row.is_some())
}

/// Groups `user_id` belongs to, by name.
pub async fn list_groups_for_user(db: &SqlitePool, user_id: &str) -> Result<Vec<Group>> {
    let rows = sqlx::query_as::<_, GroupRow>(
        r#"
        SELECT g.id, g.name, g.description, g.creator_id, g.created_at
        FROM groups g
        JOIN group_members gm ON gm.group_id = g.id
        WHERE gm.user_id = ?
        ORDER BY g.name COLLATE NOCASE ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    Ok(rows.into_iter().map(Group::from).collect())
}

pub async fn members(db: &SqlitePool, group_id: &str) -> Result<Vec<GroupMember>> {
    let rows = sqlx::query_as::<_, MemberRow>(
        "SELECT group_id, user_id, role, joined_at FROM group_members WHERE group_id = ? ORDER BY joined_at ASC, rowid ASC",
    )
    .bind(group_id)
    .fetch_all(db)
    .await?;

    rows.into_iter().map(GroupMember::try_from).collect()
}

/// A group with its members, visible to members only.
pub async fn get_group(db: &SqlitePool, user_id: &str, group_id: &str) -> Result<GroupDetail> {
    let group = sqlx::query_as::<_, GroupRow>(
        "SELECT id, name, description, creator_id, created_at FROM groups WHERE id = ?",
    )
    .bind(group_id)
    .fetch_optional(db)
    .await?
    .map(Group::from)
    .ok_or_else(|| Error::NotFound("Group not found".to_string()))?;

    if !is_member(db, group_id, user_id).await? {
        return Err(Error::Forbidden("Not a member of this group".to_string()));
    }

    let members = members(db, group_id).await?;
    let conversation_id = conversations::find_group(db, group_id)
        .await?
        .map(|c| c.id);

    Ok(GroupDetail {
        group,
        members,
        conversation_id,
    })
}
