use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's public display record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

/// A message thread between two users, or the thread of a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub participant_1: Option<String>,
    pub participant_2: Option<String>,
    pub is_group: bool,
    pub group_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The side of an individual pair that is not `user_id`.
pub(crate) fn other_participant<'a>(
    participant_1: Option<&'a str>,
    participant_2: Option<&'a str>,
    user_id: &str,
) -> Option<&'a str> {
    match (participant_1, participant_2) {
        (Some(a), Some(b)) if a == user_id => Some(b),
        (Some(a), Some(_)) => Some(a),
        _ => None,
    }
}

impl Conversation {
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participant_1.as_deref() == Some(user_id)
            || self.participant_2.as_deref() == Some(user_id)
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ConversationRow {
    pub id: String,
    pub participant_1: Option<String>,
    pub participant_2: Option<String>,
    pub is_group: bool,
    pub group_id: Option<String>,
    pub created_at: i64,
}

impl From<ConversationRow> for Conversation {
    fn from(row: ConversationRow) -> Self {
        Self {
            id: row.id,
            participant_1: row.participant_1,
            participant_2: row.participant_2,
            is_group: row.is_group,
            group_id: row.group_id,
            created_at: from_micros(row.created_at),
        }
    }
}

/// A single chat message. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct MessageRow {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub content: String,
    pub created_at: i64,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            conversation_id: row.conversation_id,
            sender_id: row.sender_id,
            content: row.content,
            created_at: from_micros(row.created_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub creator_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct GroupRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub creator_id: String,
    pub created_at: i64,
}

impl From<GroupRow> for Group {
    fn from(row: GroupRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            creator_id: row.creator_id,
            created_at: from_micros(row.created_at),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupRole {
    Admin,
    Member,
}

impl GroupRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupRole::Admin => "admin",
            GroupRole::Member => "member",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(GroupRole::Admin),
            "member" => Some(GroupRole::Member),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub group_id: String,
    pub user_id: String,
    pub role: GroupRole,
    pub joined_at: DateTime<Utc>,
}

/// A group together with its membership rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDetail {
    #[serde(flatten)]
    pub group: Group,
    pub members: Vec<GroupMember>,
    pub conversation_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    pub fn is_dark(&self) -> bool {
        matches!(self, Theme::Dark)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            "system" => Some(Theme::System),
            _ => None,
        }
    }
}

/// A row in the recent or full chat listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSummary {
    /// Conversation id
    pub id: String,
    /// Other user's id, or the group id
    pub participant_id: String,
    pub participant_name: String,
    pub last_message: Option<String>,
    pub last_message_time: Option<DateTime<Utc>>,
    pub is_group: bool,
    pub group_name: Option<String>,
}

/// Database timestamps are microseconds since the epoch.
pub(crate) fn to_micros(t: DateTime<Utc>) -> i64 {
    t.timestamp_micros()
}

pub(crate) fn from_micros(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or_default()
}

/// The current time at the precision the store keeps, so values handed
/// out before a write equal the rows read back later.
pub(crate) fn stored_now() -> DateTime<Utc> {
    from_micros(to_micros(Utc::now()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct(a: &str, b: &str) -> Conversation {
        Conversation {
            id: "c1".into(),
            participant_1: Some(a.into()),
            participant_2: Some(b.into()),
            is_group: false,
            group_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_other_participant_either_side() {
        let conv = direct("alice", "bob");
        let (a, b) = (conv.participant_1.as_deref(), conv.participant_2.as_deref());
        assert_eq!(other_participant(a, b, "alice"), Some("bob"));
        assert_eq!(other_participant(a, b, "bob"), Some("alice"));
        assert_eq!(other_participant(a, None, "alice"), None);
        assert!(conv.has_participant("bob"));
        assert!(!conv.has_participant("carol"));
    }

    #[test]
    fn test_theme_parse_and_darkness() {
        assert_eq!(Theme::parse("dark"), Some(Theme::Dark));
        assert_eq!(Theme::parse("nope"), None);
        assert!(Theme::Dark.is_dark());
        assert!(!Theme::System.is_dark());
        assert_eq!(Theme::default(), Theme::System);
    }

    #[test]
    fn test_micros_round_trip_keeps_precision() {
        let t = DateTime::from_timestamp_micros(1_700_000_000_123_456).unwrap();
        assert_eq!(from_micros(to_micros(t)), t);
    }

    #[test]
    fn test_stored_now_has_no_sub_micro_part() {
        let now = stored_now();
        assert_eq!(now.timestamp_subsec_nanos() % 1_000, 0);
        assert_eq!(from_micros(to_micros(now)), now);
    }
}
