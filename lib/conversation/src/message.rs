//! Turn types for conversations.

use chrono::{DateTime, Utc};
use concierge_core::TurnId;
use serde::{Deserialize, Serialize};

/// The role of a turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// Guest message.
    User,
    /// Assistant reply, or the canonical serialization of a function call.
    Assistant,
}

impl TurnRole {
    /// Returns the lowercase role name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single immutable turn in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Unique turn identifier.
    pub id: TurnId,
    /// Who authored the turn.
    pub role: TurnRole,
    /// Turn content.
    pub content: String,
    /// When the turn was created.
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    /// Creates a new turn stamped with the current time.
    #[must_use]
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            id: TurnId::new(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a user turn.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    /// Creates an assistant turn.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_creation() {
        let turn = ConversationTurn::user("Hello!");
        assert_eq!(turn.role, TurnRole::User);
        assert_eq!(turn.content, "Hello!");

        let reply = ConversationTurn::assistant("Welcome to the hotel.");
        assert_eq!(reply.role, TurnRole::Assistant);
        assert_ne!(turn.id, reply.id);
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&TurnRole::Assistant).expect("serialize");
        assert_eq!(json, "\"assistant\"");
        assert_eq!(TurnRole::User.as_str(), "user");
    }
}
