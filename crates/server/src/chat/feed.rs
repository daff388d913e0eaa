//! Message feed
//!
//! The merged view of one conversation: stored history plus live inserts
//! from the change feed. Activation subscribes before reading history so no
//! insert falls between the two, and every append is de-duplicated by id.

use std::collections::HashSet;

use sqlx::SqlitePool;
use tokio::sync::broadcast;

use crate::chat::messages;
use crate::core::error::Result;
use crate::core::feed::ChangeFeed;
use crate::core::models::Message;

#[derive(Debug)]
pub struct MessageFeed {
    conversation_id: String,
    messages: Vec<Message>,
    seen: HashSet<String>,
}

impl MessageFeed {
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            messages: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Subscribe to live inserts, then load history into a new feed.
    pub async fn activate(
        db: &SqlitePool,
        changes: &ChangeFeed,
        conversation_id: &str,
    ) -> Result<(Self, broadcast::Receiver<Message>)> {
        let rx = changes.subscribe(conversation_id).await;
        let history = messages::history(db, conversation_id).await?;

        let mut feed = Self::new(conversation_id);
        feed.merge(history);

        Ok((feed, rx))
    }

    /// Add one message. Returns false for duplicates and for messages of
    /// another conversation.
    pub fn apply(&mut self, message: Message) -> bool {
        if message.conversation_id != self.conversation_id || self.seen.contains(&message.id) {
            return false;
        }

        // Equal timestamps keep arrival order
        let at = self
            .messages
            .partition_point(|m| m.created_at <= message.created_at);
        self.seen.insert(message.id.clone());
        self.messages.insert(at, message);
        true
    }

    /// Merge a batch (usually a re-fetched history), returning what was new.
    pub fn merge(&mut self, batch: impl IntoIterator<Item = Message>) -> Vec<Message> {
        batch
            .into_iter()
            .filter(|m| self.apply(m.clone()))
            .collect()
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn at(id: &str, micros: i64) -> Message {
        Message {
            id: id.into(),
            conversation_id: "c1".into(),
            sender_id: "u1".into(),
            content: id.into(),
            created_at: DateTime::<Utc>::from_timestamp_micros(micros).unwrap(),
        }
    }

    fn ids(feed: &MessageFeed) -> Vec<&str> {
        feed.messages().iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_duplicate_is_shown_once() {
        let mut feed = MessageFeed::new("c1");
        assert!(feed.apply(at("m1", 10)));
        assert!(!feed.apply(at("m1", 10)));
        assert_eq!(feed.len(), 1);
    }

    #[test]
    fn test_out_of_order_append_is_sorted() {
        let mut feed = MessageFeed::new("c1");
        feed.apply(at("m2", 20));
        feed.apply(at("m3", 30));
        feed.apply(at("m1", 10));
        assert_eq!(ids(&feed), vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn test_equal_timestamps_keep_arrival_order() {
        let mut feed = MessageFeed::new("c1");
        feed.apply(at("a", 10));
        feed.apply(at("b", 10));
        feed.apply(at("c", 10));
        assert_eq!(ids(&feed), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_foreign_conversation_ignored() {
        let mut feed = MessageFeed::new("c1");
        let mut other = at("x", 10);
        other.conversation_id = "c2".into();
        assert!(!feed.apply(other));
        assert!(feed.is_empty());
    }

    #[test]
    fn test_merge_returns_only_new_messages() {
        let mut feed = MessageFeed::new("c1");
        feed.apply(at("m2", 20));

        let added = feed.merge(vec![at("m1", 10), at("m2", 20), at("m3", 30)]);
        let added: Vec<&str> = added.iter().map(|m| m.id.as_str()).collect();

        assert_eq!(added, vec!["m1", "m3"]);
        assert_eq!(ids(&feed), vec!["m1", "m2", "m3"]);
    }
}
