//! One live tutoring conversation per user.
//!
//! Each conversation sits behind its own async mutex, so messages from the
//! same user are handled one at a time while different users proceed in
//! parallel. Conversations idle longer than the TTL are restarted on next
//! use; at capacity, idle ones are purged first and then the least recently
//! used is dropped. A conversation some caller still holds is never dropped
//! or restarted, so an in-flight message cannot fork the history.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::warn;

use crate::gateway::models::{ChatMessage, Sender};
use crate::llm_client::Turn;

#[derive(Debug, Default)]
pub struct Conversation {
    history: Vec<ChatMessage>,
}

impl Conversation {
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// The turns to send for `message`: the full history followed by it.
    pub fn turns_with(&self, message: &str) -> Vec<Turn> {
        self.history
            .iter()
            .map(|m| match m.sender {
                Sender::User => Turn::user(m.text.clone()),
                Sender::Assistant => Turn::model(m.text.clone()),
            })
            .chain(std::iter::once(Turn::user(message)))
            .collect()
    }

    /// Records a completed exchange. Called only once the reply exists.
    pub fn record_exchange(&mut self, message: &str, reply: &str) {
        self.history.push(ChatMessage {
            sender: Sender::User,
            text: message.to_string(),
        });
        self.history.push(ChatMessage {
            sender: Sender::Assistant,
            text: reply.to_string(),
        });
    }
}

struct Slot {
    conversation: Arc<Mutex<Conversation>>,
    last_used: Instant,
}

impl Slot {
    fn fresh(now: Instant) -> Self {
        Self {
            conversation: Arc::new(Mutex::new(Conversation::default())),
            last_used: now,
        }
    }

    /// Held outside the registry by a message still being handled.
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.conversation) > 1
    }

    fn is_idle(&self, now: Instant, ttl: Duration) -> bool {
        now.duration_since(self.last_used) >= ttl && !self.in_use()
    }
}

pub struct ConversationRegistry {
    slots: DashMap<String, Slot>,
    capacity: usize,
    idle_ttl: Duration,
}

impl ConversationRegistry {
    pub fn new(capacity: usize, idle_ttl: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            capacity: capacity.max(1),
            idle_ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get_or_create(&self, user_id: &str) -> Arc<Mutex<Conversation>> {
        let now = Instant::now();
        if !self.slots.contains_key(user_id) && self.slots.len() >= self.capacity {
            self.make_room(now);
        }

        let mut slot = self
            .slots
            .entry(user_id.to_string())
            .or_insert_with(|| Slot::fresh(now));
        if slot.is_idle(now, self.idle_ttl) {
            *slot = Slot::fresh(now);
        }
        slot.last_used = now;
        slot.conversation.clone()
    }

    fn make_room(&self, now: Instant) {
        let ttl = self.idle_ttl;
        self.slots.retain(|_, slot| !slot.is_idle(now, ttl));

        while self.slots.len() >= self.capacity {
            let oldest = self
                .slots
                .iter()
                .filter(|entry| !entry.value().in_use())
                .min_by_key(|entry| entry.value().last_used)
                .map(|entry| entry.key().clone());
            let Some(user_id) = oldest else {
                warn!(
                    live = self.slots.len(),
                    "every conversation is busy; running over capacity"
                );
                break;
            };
            // Re-checked under the shard lock; a caller may have claimed it since.
            if self
                .slots
                .remove_if(&user_id, |_, slot| !slot.in_use())
                .is_some()
            {
                warn!(%user_id, "conversation evicted at capacity");
            }
        }
    }
}
