use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::{ChatMessage, Role};

/// One blueprint negotiation. `current_blueprint` always mirrors the most
/// recent assistant entry in `conversation_history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub requester_email: String,
    pub original_idea: String,
    pub current_blueprint: String,
    pub conversation_history: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub finalized: bool,
}

impl Session {
    /// Build a session from a seeded history whose last entry is the first
    /// assistant reply.
    pub fn new(
        idea: impl Into<String>,
        email: impl Into<String>,
        conversation_history: Vec<ChatMessage>,
    ) -> Self {
        let now = Utc::now();
        let current_blueprint = latest_reply(&conversation_history)
            .unwrap_or_default()
            .to_string();
        Self {
            id: Uuid::new_v4(),
            requester_email: email.into(),
            original_idea: idea.into(),
            current_blueprint,
            conversation_history,
            created_at: now,
            last_active_at: now,
            finalized: false,
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.conversation_history.push(ChatMessage::user(content));
        self.touch();
    }

    pub fn record_reply(&mut self, content: impl Into<String>) {
        let content = content.into();
        self.current_blueprint = content.clone();
        self.conversation_history.push(ChatMessage::assistant(content));
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_active_at = Utc::now();
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.last_active_at > ttl
    }
}

fn latest_reply(history: &[ChatMessage]) -> Option<&str> {
    history
        .iter()
        .rev()
        .find(|m| m.role == Role::Assistant)
        .map(|m| m.content.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> Session {
        Session::new(
            "bakery site",
            "a@b.com",
            vec![
                ChatMessage::system("sys"),
                ChatMessage::user("idea"),
                ChatMessage::assistant("first draft"),
            ],
        )
    }

    #[test]
    fn test_new_takes_blueprint_from_last_reply() {
        let session = seeded();
        assert_eq!(session.current_blueprint, "first draft");
        assert_eq!(session.conversation_history.len(), 3);
        assert!(!session.finalized);
    }

    #[test]
    fn test_record_reply_keeps_blueprint_in_sync() {
        let mut session = seeded();
        session.push_user("add a menu page");
        session.record_reply("second draft");

        let last = session.conversation_history.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, session.current_blueprint);
        assert_eq!(session.conversation_history.len(), 5);
    }

    #[test]
    fn test_expiry_uses_last_activity() {
        let mut session = seeded();
        session.last_active_at = Utc::now() - Duration::minutes(30);
        assert!(session.is_expired(Utc::now(), Duration::minutes(10)));
        assert!(!session.is_expired(Utc::now(), Duration::minutes(60)));
    }
}
