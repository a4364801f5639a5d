//! Message log — the append-only transcript of one chat session.
//!
//! DESIGN
//! ======
//! The log never reorders or removes entries; System notices are appended
//! like any other message and never retracted. The only permitted mutation
//! after append is `recolor_local`, which rewrites the display color on
//! messages authored by the local user when the bubble-color preference
//! changes. Everything else is read-only access.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    LocalUser,
    RemoteUser,
    /// Session notices ("You have ended the chat", connection loss, ...).
    System,
}

/// One transcript entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender: Sender,
    pub content: String,
    /// Milliseconds since the Unix epoch. Assigned at creation, never mutated.
    pub created_at: i64,
    /// Presentation-only bubble color. Mutable only for LocalUser messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_color: Option<String>,
}

/// Current time as milliseconds since Unix epoch.
fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

impl Message {
    /// A message authored by the local user, colored with the current
    /// bubble preference.
    #[must_use]
    pub fn local(content: impl Into<String>, color: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: Sender::LocalUser,
            content: content.into(),
            created_at: now_ms(),
            display_color: color.map(str::to_owned),
        }
    }

    /// A message received from the remote participant.
    #[must_use]
    pub fn remote(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: Sender::RemoteUser,
            content: content.into(),
            created_at: now_ms(),
            display_color: None,
        }
    }

    /// A session notice.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: Sender::System,
            content: content.into(),
            created_at: now_ms(),
            display_color: None,
        }
    }
}

/// Append-only ordered sequence of [`Message`].
#[derive(Debug, Default)]
pub struct MessageLog {
    entries: Vec<Message>,
}

impl MessageLog {
    #[must_use]
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Append a message. There is no way to remove or reorder entries.
    pub fn append(&mut self, message: Message) {
        self.entries.push(message);
    }

    /// Rewrite the display color on every LocalUser message. RemoteUser and
    /// System entries are untouched.
    pub fn recolor_local(&mut self, color: &str) {
        for entry in &mut self.entries {
            if entry.sender == Sender::LocalUser {
                entry.display_color = Some(color.to_owned());
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.entries.iter()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.entries.last()
    }
}

impl<'a> IntoIterator for &'a MessageLog {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
