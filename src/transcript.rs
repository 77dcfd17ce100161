//! Conversation transcript and the operations that mutate it.
//!
//! The transcript is append-only: turns are never reordered or removed. The
//! one in-place mutation is text accumulation on the single open model turn
//! while its stream is running; every other turn is settled.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One message in the conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl ChatTurn {
    fn new(role: Role, text: String) -> Self {
        Self {
            role,
            text,
            created_at: Utc::now(),
        }
    }
}

/// Ordered conversation history with at most one open model turn.
#[derive(Debug, Default, Serialize)]
pub struct Transcript {
    turns: Vec<ChatTurn>,
    #[serde(skip)]
    model_turn_open: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn is_model_turn_open(&self) -> bool {
        self.model_turn_open
    }

    /// Text of the open model turn, if one is open.
    pub fn open_model_text(&self) -> Option<&str> {
        if !self.model_turn_open {
            return None;
        }
        self.turns.last().map(|turn| turn.text.as_str())
    }

    /// Append a user turn. User turns are immutable once pushed.
    pub fn push_user_turn(&mut self, text: impl Into<String>) {
        self.turns.push(ChatTurn::new(Role::User, text.into()));
    }

    /// Open a new, empty model turn. At most one model turn may be open; a
    /// second open while one is active is ignored.
    pub fn begin_model_turn(&mut self) -> bool {
        if self.model_turn_open {
            warn!("model turn already open; ignoring begin");
            return false;
        }
        self.turns.push(ChatTurn::new(Role::Model, String::new()));
        self.model_turn_open = true;
        true
    }

    /// Append streamed text to the open model turn. Deltas concatenate in
    /// call order, which for a session equals arrival order.
    pub fn append_model_text(&mut self, delta: &str) -> bool {
        if !self.model_turn_open {
            warn!("no open model turn; dropping streamed text");
            return false;
        }
        if let Some(turn) = self.turns.last_mut() {
            turn.text.push_str(delta);
        }
        true
    }

    /// Replace the open model turn's text with a failure message and close
    /// it. The user sees one clear message instead of a silently truncated
    /// answer.
    pub fn fail_model_turn(&mut self, message: &str) {
        if !self.model_turn_open {
            warn!("no open model turn; dropping failure message");
            return;
        }
        if let Some(turn) = self.turns.last_mut() {
            turn.text.clear();
            turn.text.push_str(message);
        }
        self.model_turn_open = false;
    }

    /// Close the open model turn, keeping its text. Closing an already
    /// closed transcript is harmless.
    pub fn close_model_turn(&mut self) {
        self.model_turn_open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_then_model_flow() {
        let mut transcript = Transcript::new();
        transcript.push_user_turn("hi");
        assert!(transcript.begin_model_turn());
        assert!(transcript.append_model_text("Hel"));
        assert!(transcript.append_model_text("lo"));
        transcript.close_model_turn();

        let turns = transcript.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].text, "hi");
        assert_eq!(turns[1].role, Role::Model);
        assert_eq!(turns[1].text, "Hello");
        assert!(!transcript.is_model_turn_open());
    }

    #[test]
    fn test_second_begin_is_ignored() {
        let mut transcript = Transcript::new();
        assert!(transcript.begin_model_turn());
        assert!(!transcript.begin_model_turn());
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn test_append_without_open_turn_is_dropped() {
        let mut transcript = Transcript::new();
        transcript.push_user_turn("hi");
        assert!(!transcript.append_model_text("stray"));
        assert_eq!(transcript.turns()[0].text, "hi");
    }

    #[test]
    fn test_fail_overwrites_and_closes() {
        let mut transcript = Transcript::new();
        transcript.begin_model_turn();
        transcript.append_model_text("partial ans");
        transcript.fail_model_turn("Request timed out. Please try again.");

        assert_eq!(
            transcript.turns()[0].text,
            "Request timed out. Please try again."
        );
        assert!(!transcript.is_model_turn_open());
        // Late deltas after the failure are dropped.
        assert!(!transcript.append_model_text("late"));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut transcript = Transcript::new();
        transcript.push_user_turn("hi");
        transcript.begin_model_turn();
        transcript.append_model_text("answer");
        transcript.close_model_turn();
        let after_first: Vec<String> =
            transcript.turns().iter().map(|t| t.text.clone()).collect();

        transcript.close_model_turn();
        let after_second: Vec<String> =
            transcript.turns().iter().map(|t| t.text.clone()).collect();
        assert_eq!(after_first, after_second);
        assert_eq!(transcript.len(), 2);
    }

    #[test]
    fn test_open_model_text() {
        let mut transcript = Transcript::new();
        assert!(transcript.open_model_text().is_none());
        transcript.begin_model_turn();
        assert_eq!(transcript.open_model_text(), Some(""));
        transcript.append_model_text("abc");
        assert_eq!(transcript.open_model_text(), Some("abc"));
        transcript.close_model_turn();
        assert!(transcript.open_model_text().is_none());
    }

    #[test]
    fn test_serializes_roles_lowercase() {
        let mut transcript = Transcript::new();
        transcript.push_user_turn("hi");
        let json = serde_json::to_value(&transcript).unwrap();
        assert_eq!(json["turns"][0]["role"], "user");
    }
}
