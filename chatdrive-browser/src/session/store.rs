//! Identity-keyed cache of observed messages.

use super::message::ChatMessage;
use crate::ids::MessageId;
use std::collections::HashMap;

/// Messages observed during one session, keyed by id.
#[derive(Debug, Default)]
pub struct MessageStore {
    messages: HashMap<MessageId, ChatMessage>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &MessageId) -> Option<&ChatMessage> {
        self.messages.get(id)
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.messages.contains_key(id)
    }

    /// Cache `message` unless its id is already known; returns the cached entry.
    pub fn insert(&mut self, message: ChatMessage) -> &ChatMessage {
        self.messages
            .entry(message.id().clone())
            .or_insert(message)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
