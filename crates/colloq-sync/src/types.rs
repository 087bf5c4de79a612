//! Data model shared by the stores and the controller

use chrono::{DateTime, Utc};
use colloq_api::{ConversationId, ConversationRecord, HistoryEntry, SendMessageResponse};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder id handed out for optimistic entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(u64);

impl LocalId {
    pub fn new(n: u64) -> Self {
        Self(n)
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "local-{}", self.0)
    }
}

/// Message identifier: a local placeholder until the server issues one
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MessageId {
    Local(LocalId),
    Server(String),
}

impl MessageId {
    pub fn is_local(&self) -> bool {
        matches!(self, MessageId::Local(_))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Local(id) => id.fmt(f),
            MessageId::Server(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Request in flight
    Pending,
    /// Backed by the server
    Confirmed,
    /// Request failed; entry kept for the user to see
    Failed,
}

/// One message in the active conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEntry {
    pub id: MessageId,
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub status: MessageStatus,
    /// Synthetic assistant entry standing in for a failed answer
    #[serde(default)]
    pub is_error: bool,
}

impl MessageEntry {
    /// Optimistic entry awaiting the server
    pub fn pending(id: LocalId, role: Role, text: impl Into<String>) -> Self {
        Self {
            id: MessageId::Local(id),
            role,
            text: text.into(),
            created_at: Utc::now(),
            status: MessageStatus::Pending,
            is_error: false,
        }
    }

    /// Server-backed entry
    pub fn confirmed(
        id: impl Into<String>,
        role: Role,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::Server(id.into()),
            role,
            text: text.into(),
            created_at,
            status: MessageStatus::Confirmed,
            is_error: false,
        }
    }

    /// Synthetic assistant entry shown after a failed send
    pub fn error(id: LocalId, text: impl Into<String>) -> Self {
        Self {
            id: MessageId::Local(id),
            role: Role::Assistant,
            text: text.into(),
            created_at: Utc::now(),
            status: MessageStatus::Failed,
            is_error: true,
        }
    }

    /// The confirmed user/assistant pair for a send response.
    ///
    /// The backend issues one id per exchange; the user half gets a
    /// `:user` suffix so both entries stay unique.
    pub fn pair_from_response(user_text: &str, response: &SendMessageResponse) -> [Self; 2] {
        [
            Self::confirmed(
                format!("{}:user", response.message_id),
                Role::User,
                user_text,
                response.created_at,
            ),
            Self::confirmed(
                response.message_id.clone(),
                Role::Assistant,
                response.answer.clone(),
                response.created_at,
            ),
        ]
    }

    /// Expand history pairs into entries, keeping the server's order
    pub fn from_history(history: Vec<HistoryEntry>) -> Vec<Self> {
        let mut entries = Vec::with_capacity(history.len() * 2);
        for (index, item) in history.into_iter().enumerate() {
            let id = item.id.unwrap_or_else(|| format!("history-{}", index));
            entries.push(Self::confirmed(
                format!("{}:user", id),
                Role::User,
                item.query,
                item.created_at,
            ));
            entries.push(Self::confirmed(id, Role::Assistant, item.answer, item.created_at));
        }
        entries
    }

    pub fn is_pending(&self) -> bool {
        self.status == MessageStatus::Pending
    }
}

/// Conversation as shown in the conversation list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ConversationRecord> for ConversationSummary {
    fn from(record: ConversationRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Read-only copy of the engine state for rendering
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncSnapshot {
    pub conversations: Vec<ConversationSummary>,
    pub active_id: Option<ConversationId>,
    pub messages: Vec<MessageEntry>,
    /// A send is in flight; further sends are ignored
    pub sending: bool,
    /// History for the active conversation is loading
    pub loading: bool,
}

impl SyncSnapshot {
    pub fn active(&self) -> Option<&ConversationSummary> {
        let id = self.active_id.as_ref()?;
        self.conversations.iter().find(|c| &c.id == id)
    }

    pub fn can_send(&self) -> bool {
        !self.sending && !self.loading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_from_history_keeps_order_and_ids() {
        let history = vec![
            HistoryEntry {
                id: Some("7".into()),
                query: "first".into(),
                answer: "one".into(),
                created_at: ts(200),
            },
            HistoryEntry {
                id: None,
                query: "second".into(),
                answer: "two".into(),
                created_at: ts(100),
            },
        ];

        let entries = MessageEntry::from_history(history);
        let texts: Vec<&str> = entries.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, ["first", "one", "second", "two"]);
        assert_eq!(entries[0].id, MessageId::Server("7:user".into()));
        assert_eq!(entries[1].id, MessageId::Server("7".into()));
        assert_eq!(entries[3].id, MessageId::Server("history-1".into()));
        assert!(entries.iter().all(|e| e.status == MessageStatus::Confirmed));
    }

    #[test]
    fn test_pair_from_response() {
        let response = SendMessageResponse {
            message_id: "41".into(),
            answer: "Hi there".into(),
            created_at: ts(50),
            conversation_id: ConversationId::from(3),
            conversation_name: "Hello".into(),
        };
        let [user, assistant] = MessageEntry::pair_from_response("Hello", &response);
        assert_eq!(user.role, Role::User);
        assert_eq!(user.text, "Hello");
        assert_eq!(user.id.to_string(), "41:user");
        assert_eq!(assistant.role, Role::Assistant);
        assert_eq!(assistant.text, "Hi there");
        assert!(!assistant.id.is_local());
    }

    #[test]
    fn test_snapshot_active() {
        let snapshot = SyncSnapshot {
            conversations: vec![ConversationSummary {
                id: ConversationId::from(1),
                name: "One".into(),
                created_at: ts(0),
                updated_at: ts(0),
            }],
            active_id: Some(ConversationId::from(1)),
            ..Default::default()
        };
        assert_eq!(snapshot.active().map(|c| c.name.as_str()), Some("One"));
        assert!(snapshot.can_send());
    }
}
