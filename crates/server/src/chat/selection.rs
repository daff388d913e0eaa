//! Which chat the chats page has open

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::chat::groups;
use crate::core::error::{Error, Result};
use crate::core::models::Profile;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selection {
    #[default]
    None,
    Individual { id: String, name: String },
    Group { id: String, name: String },
}

/// Outcome of the back action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Back {
    /// A chat was open and has been closed
    Cleared,
    /// Nothing was open; navigate to the home page
    Home,
}

/// `/chats?user=<id>` or `/chats?group=<id>`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectionQuery {
    pub user: Option<String>,
    pub group: Option<String>,
}

impl Selection {
    pub fn individual(profile: &Profile) -> Self {
        Selection::Individual {
            id: profile.id.clone(),
            name: profile.full_name.clone(),
        }
    }

    pub fn back(&mut self) -> Back {
        match self {
            Selection::None => Back::Home,
            _ => {
                *self = Selection::None;
                Back::Cleared
            }
        }
    }

    /// Where the page's back link leads
    pub fn back_href(&self) -> &'static str {
        match self {
            Selection::None => "/",
            _ => "/chats",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Selection::None)
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Selection::None => None,
            Selection::Individual { name, .. } | Selection::Group { name, .. } => Some(name),
        }
    }

    /// Resolve the page query against the store. A group takes precedence
    /// when both parameters are present.
    pub async fn from_query(db: &SqlitePool, self_id: &str, query: &SelectionQuery) -> Result<Self> {
        if let Some(group_id) = query.group.as_deref().filter(|g| !g.is_empty()) {
            let detail = groups::get_group(db, self_id, group_id).await?;
            return Ok(Selection::Group {
                id: detail.group.id,
                name: detail.group.name,
            });
        }

        if let Some(user_id) = query.user.as_deref().filter(|u| !u.is_empty()) {
            let profile = sqlx::query_as::<_, Profile>(
                "SELECT id, full_name, email, avatar_url FROM profiles WHERE id = ?",
            )
            .bind(user_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))?;
            return Ok(Selection::individual(&profile));
        }

        Ok(Selection::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_back_clears_then_goes_home() {
        let mut selection = Selection::Group {
            id: "g1".into(),
            name: "Hikers".into(),
        };
        assert_eq!(selection.name(), Some("Hikers"));
        assert_eq!(selection.back_href(), "/chats");

        assert_eq!(selection.back(), Back::Cleared);
        assert!(selection.is_none());
        assert_eq!(selection.back_href(), "/");
        assert_eq!(selection.back(), Back::Home);
    }
}
