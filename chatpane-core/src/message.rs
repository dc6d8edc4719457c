//! Conversation types exchanged with the chat API.
//!
//! Provides the [`Role`] enum, the [`ConversationTurn`] struct that makes up
//! the conversation history, and the response [`Mode`] selected by the UI.

use serde::{Deserialize, Serialize};

/// Role of a turn in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User input.
    User,
    /// Reply from the remote assistant.
    Assistant,
}

impl Role {
    /// Wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single turn in a conversation.
///
/// Turns are never mutated once they are part of a history; the controller
/// only ever appends new ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Who produced this turn.
    pub role: Role,
    /// The text content of this turn.
    pub content: String,
}

impl ConversationTurn {
    /// Create a new turn with the given role and content.
    ///
    /// # Examples
    ///
    /// ```
    /// use chatpane_core::message::{ConversationTurn, Role};
    ///
    /// let turn = ConversationTurn::new(Role::User, "Hello!");
    /// assert_eq!(turn.role, Role::User);
    /// assert_eq!(turn.content, "Hello!");
    /// ```
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Shorthand for a [`Role::User`] turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Shorthand for a [`Role::Assistant`] turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Response length mode forwarded to the remote service.
///
/// The meaning of each mode is up to the server; the widget only relays the
/// state of its "long answers" toggle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Concise answers.
    #[default]
    Short,
    /// Longer, structured answers.
    Long,
}

impl Mode {
    /// Map the state of the long-mode toggle to a mode.
    pub fn from_long_flag(long: bool) -> Self {
        if long { Mode::Long } else { Mode::Short }
    }

    /// Wire name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Short => "short",
            Mode::Long => "long",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_new_with_str() {
        let turn = ConversationTurn::new(Role::User, "Hello");
        assert_eq!(turn.role, Role::User);
        assert_eq!(turn.content, "Hello");
    }

    #[test]
    fn test_turn_shorthands() {
        assert_eq!(ConversationTurn::user("hi").role, Role::User);
        assert_eq!(
            ConversationTurn::assistant(String::from("yo")),
            ConversationTurn::new(Role::Assistant, "yo")
        );
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn test_role_deserialization() {
        assert_eq!(
            serde_json::from_str::<Role>("\"assistant\"").unwrap(),
            Role::Assistant
        );
        assert!(serde_json::from_str::<Role>("\"system\"").is_err());
    }

    #[test]
    fn test_turn_serialization_shape() {
        let json = serde_json::to_value(ConversationTurn::user("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn test_mode_from_long_flag() {
        assert_eq!(Mode::from_long_flag(true), Mode::Long);
        assert_eq!(Mode::from_long_flag(false), Mode::Short);
        assert_eq!(Mode::default(), Mode::Short);
    }

    #[test]
    fn test_mode_serialization() {
        assert_eq!(serde_json::to_string(&Mode::Short).unwrap(), "\"short\"");
        assert_eq!(serde_json::to_string(&Mode::Long).unwrap(), "\"long\"");
        assert_eq!(Mode::Long.as_str(), "long");
    }
}
