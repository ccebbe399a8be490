//! Conversations and the collection that holds them.

use crate::core::message::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const NEW_CHAT_TITLE: &str = "New conversation";
const TITLE_MAX_CHARS: usize = 55;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: NEW_CHAT_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.touch();
    }

    pub fn user_message_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_user()).count()
    }

    pub fn last_is_assistant(&self) -> bool {
        self.messages.last().is_some_and(Message::is_assistant)
    }

    /// Removes the trailing assistant message, if there is one.
    pub fn pop_assistant(&mut self) -> Option<Message> {
        if !self.last_is_assistant() {
            return None;
        }
        let popped = self.messages.pop();
        self.touch();
        popped
    }
}

/// Title derived from the first user message.
pub fn title_from(text: &str) -> String {
    if text.chars().count() > TITLE_MAX_CHARS {
        let truncated: String = text.chars().take(TITLE_MAX_CHARS).collect();
        format!("{truncated}…")
    } else {
        text.to_string()
    }
}

/// All stored conversations plus the one currently open.
#[derive(Debug, Clone, Default)]
pub struct ChatCollection {
    chats: Vec<Chat>,
    current_id: Option<String>,
}

impl ChatCollection {
    /// Wraps loaded chats, opening the most recently updated one.
    pub fn from_chats(chats: Vec<Chat>) -> Self {
        let current_id = chats
            .iter()
            .max_by_key(|chat| chat.updated_at)
            .map(|chat| chat.id.clone());
        Self { chats, current_id }
    }

    pub fn chats(&self) -> &[Chat] {
        &self.chats
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    pub fn current(&self) -> Option<&Chat> {
        let id = self.current_id.as_deref()?;
        self.chats.iter().find(|chat| chat.id == id)
    }

    pub fn current_mut(&mut self) -> Option<&mut Chat> {
        let id = self.current_id.clone()?;
        self.chats.iter_mut().find(|chat| chat.id == id)
    }

    /// Starts a fresh conversation at the front of the list and opens it.
    pub fn new_chat(&mut self) -> &mut Chat {
        let mut stamp = Utc::now().timestamp_millis();
        while self.get(&format!("c_{stamp}")).is_some() {
            stamp += 1;
        }
        let chat = Chat::new(format!("c_{stamp}"));
        self.current_id = Some(chat.id.clone());
        self.chats.insert(0, chat);
        &mut self.chats[0]
    }

    /// Returns the open conversation, creating one if none is open.
    pub fn ensure_current(&mut self) -> &mut Chat {
        let index = self
            .current_id
            .as_deref()
            .and_then(|id| self.chats.iter().position(|chat| chat.id == id));
        match index {
            Some(index) => &mut self.chats[index],
            None => self.new_chat(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Chat> {
        self.chats.iter().find(|chat| chat.id == id)
    }

    /// Opens an existing conversation. Returns false for unknown ids.
    pub fn select(&mut self, id: &str) -> bool {
        if self.get(id).is_some() {
            self.current_id = Some(id.to_string());
            true
        } else {
            false
        }
    }

    /// Deletes a conversation. When it was open, the most recently updated
    /// remaining one is opened instead.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.chats.len();
        self.chats.retain(|chat| chat.id != id);
        let removed = self.chats.len() != before;
        if removed && self.current_id.as_deref() == Some(id) {
            let next = self.search("").first().map(|chat| chat.id.clone());
            self.current_id = next;
        }
        removed
    }

    pub fn clear(&mut self) {
        self.chats.clear();
        self.current_id = None;
    }

    /// Case-insensitive title search, newest first. An empty query lists
    /// everything.
    pub fn search(&self, query: &str) -> Vec<&Chat> {
        let query = query.trim().to_lowercase();
        let mut matches: Vec<&Chat> = self
            .chats
            .iter()
            .filter(|chat| query.is_empty() || chat.title.to_lowercase().contains(&query))
            .collect();
        matches.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        matches
    }

    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.chats)
    }
}
