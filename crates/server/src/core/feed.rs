//! Change feed
//!
//! One bounded broadcast channel per conversation. Every message inserted
//! into a conversation is published here after the row is committed, and
//! each subscriber sees inserts in the order they were published.

use std::collections::HashMap;

use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::core::models::Message;

pub struct ChangeFeed {
    capacity: usize,
    channels: RwLock<HashMap<String, broadcast::Sender<Message>>>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Receive every message inserted into `conversation_id` after this call.
    pub async fn subscribe(&self, conversation_id: &str) -> broadcast::Receiver<Message> {
        if let Some(tx) = self.channels.read().await.get(conversation_id) {
            return tx.subscribe();
        }

        let mut channels = self.channels.write().await;
        channels
            .entry(conversation_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Fan a message out to current subscribers of its conversation.
    /// Returns the number of receivers reached.
    pub async fn publish(&self, message: Message) -> usize {
        let channels = self.channels.read().await;
        let Some(tx) = channels.get(&message.conversation_id) else {
            return 0;
        };

        match tx.send(message) {
            Ok(n) => n,
            Err(_) => {
                debug!("[Feed] No live subscribers");
                0
            }
        }
    }

    /// Drop channels nobody listens to any more.
    pub async fn prune(&self) {
        self.channels
            .write()
            .await
            .retain(|_, tx| tx.receiver_count() > 0);
    }

    pub async fn subscriber_count(&self, conversation_id: &str) -> usize {
        self.channels
            .read()
            .await
            .get(conversation_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}
