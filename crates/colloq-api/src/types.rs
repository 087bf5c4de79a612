//! Wire types for the chat backend

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::{Error, Result};

/// Opaque conversation identifier.
///
/// The backend may send ids as JSON numbers or strings; both normalise to
/// a string. Numeric ids are written back as numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ConversationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<i64> for ConversationId {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

impl Serialize for ConversationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.0.parse::<i64>() {
            Ok(n) if n.to_string() == self.0 => serializer.serialize_i64(n),
            _ => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for ConversationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        lenient::id(deserializer).map(Self)
    }
}

/// Lenient field decoders for values the backend is loose about.
mod lenient {
    use super::*;
    use serde::de::Error as _;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Int(i64),
        Str(String),
    }

    /// Accept an id given as a number or a non-empty string
    pub fn id<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
        match RawId::deserialize(deserializer)? {
            RawId::Int(n) => Ok(n.to_string()),
            RawId::Str(s) if !s.trim().is_empty() => Ok(s),
            RawId::Str(_) => Err(D::Error::custom("empty id")),
        }
    }

    pub fn opt_id<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Option<String>, D::Error> {
        match Option::<RawId>::deserialize(deserializer)? {
            None => Ok(None),
            Some(RawId::Int(n)) => Ok(Some(n.to_string())),
            Some(RawId::Str(s)) if s.trim().is_empty() => Ok(None),
            Some(RawId::Str(s)) => Ok(Some(s)),
        }
    }

    /// Accept RFC 3339 or a naive ISO-8601 timestamp (taken as UTC)
    pub fn timestamp<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}")))
    }
}

/// Parse a backend timestamp.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// A conversation as listed or created by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: ConversationId,
    pub name: String,
    #[serde(alias = "createdAt", deserialize_with = "lenient::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(alias = "updatedAt", deserialize_with = "lenient::timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Body of a send-message request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendMessageRequest {
    pub message: String,
    /// `None` asks the backend to create a conversation for this message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
}

impl SendMessageRequest {
    pub fn new(message: impl Into<String>, conversation_id: Option<ConversationId>) -> Self {
        Self {
            message: message.into(),
            conversation_id,
        }
    }
}

/// Reply to a send-message request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessageResponse {
    #[serde(alias = "messageId", deserialize_with = "lenient::id")]
    pub message_id: String,
    pub answer: String,
    #[serde(alias = "createdAt", deserialize_with = "lenient::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(alias = "conversationId")]
    pub conversation_id: ConversationId,
    #[serde(alias = "conversationName")]
    pub conversation_name: String,
}

/// One question/answer pair from a conversation's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub id: Option<String>,
    pub query: String,
    pub answer: String,
    #[serde(alias = "createdAt", deserialize_with = "lenient::timestamp")]
    pub created_at: DateTime<Utc>,
}

/// History payload; the backend wraps the pairs, older builds sent a bare array
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum HistoryResponse {
    Wrapped { messages: Vec<HistoryEntry> },
    Bare(Vec<HistoryEntry>),
}

impl HistoryResponse {
    pub(crate) fn into_entries(self) -> Vec<HistoryEntry> {
        match self {
            HistoryResponse::Wrapped { messages } => messages,
            HistoryResponse::Bare(messages) => messages,
        }
    }
}

/// Body of a rename request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenameRequest<'a> {
    pub name: &'a str,
}

/// `{"success": bool}` acknowledgement for rename and delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Ack {
    pub success: bool,
}

impl Ack {
    /// Turn `success: false` into an error
    pub fn ensure(self, operation: &'static str) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            Err(Error::Rejected(operation))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_conversation_id_from_number_and_string() {
        let a: ConversationId = serde_json::from_str("42").unwrap();
        let b: ConversationId = serde_json::from_str("\"42\"").unwrap();
        let c: ConversationId = serde_json::from_str("\"conv-abc\"").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "42");
        assert_eq!(c.as_str(), "conv-abc");
    }

    #[test]
    fn test_conversation_id_rejects_empty_and_float() {
        assert!(serde_json::from_str::<ConversationId>("\"\"").is_err());
        assert!(serde_json::from_str::<ConversationId>("1.5").is_err());
        assert!(serde_json::from_str::<ConversationId>("null").is_err());
    }

    #[test]
    fn test_conversation_id_keeps_numeric_wire_type() {
        let req = SendMessageRequest::new("hi", Some(ConversationId::from(7)));
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            serde_json::json!({"message": "hi", "conversation_id": 7})
        );

        let req = SendMessageRequest::new("hi", Some(ConversationId::new("abc")));
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            serde_json::json!({"message": "hi", "conversation_id": "abc"})
        );
    }

    #[test]
    fn test_send_request_omits_missing_conversation() {
        let req = SendMessageRequest::new("Hello", None);
        assert_eq!(serde_json::to_string(&req).unwrap(), r#"{"message":"Hello"}"#);
    }

    #[test]
    fn test_parse_timestamp_forms() {
        let rfc = parse_timestamp("2024-05-01T10:20:30Z").unwrap();
        let offset = parse_timestamp("2024-05-01T12:20:30+02:00").unwrap();
        let naive = parse_timestamp("2024-05-01T10:20:30.123456").unwrap();
        assert_eq!(rfc, offset);
        assert_eq!(naive.hour(), 10);
        assert_eq!(naive.day(), 1);
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_conversation_record_snake_and_camel() {
        let snake: ConversationRecord = serde_json::from_str(
            r#"{"id": 3, "name": "New Chat", "created_at": "2024-05-01T10:00:00", "updated_at": "2024-05-01T10:00:00"}"#,
        )
        .unwrap();
        let camel: ConversationRecord = serde_json::from_str(
            r#"{"id": "3", "name": "New Chat", "createdAt": "2024-05-01T10:00:00Z", "updatedAt": "2024-05-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(snake, camel);
    }

    #[test]
    fn test_send_response_requires_all_fields() {
        let ok: SendMessageResponse = serde_json::from_str(
            r#"{"message_id": 9, "conversation_id": 3, "answer": "Hi!", "created_at": "2024-05-01T10:00:00", "conversation_name": "Hello"}"#,
        )
        .unwrap();
        assert_eq!(ok.message_id, "9");
        assert_eq!(ok.conversation_name, "Hello");

        let missing_name = serde_json::from_str::<SendMessageResponse>(
            r#"{"message_id": 9, "conversation_id": 3, "answer": "Hi!", "created_at": "2024-05-01T10:00:00"}"#,
        );
        assert!(missing_name.is_err());
    }

    #[test]
    fn test_history_wrapped_and_bare() {
        let wrapped: HistoryResponse = serde_json::from_str(
            r#"{"conversation": {"id": 1}, "messages": [{"id": 5, "query": "q", "answer": "a", "created_at": "2024-05-01T10:00:00"}]}"#,
        )
        .unwrap();
        let entries = wrapped.into_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id.as_deref(), Some("5"));

        let bare: HistoryResponse = serde_json::from_str(
            r#"[{"query": "q", "answer": "a", "created_at": "2024-05-01T10:00:00Z"}]"#,
        )
        .unwrap();
        let entries = bare.into_entries();
        assert_eq!(entries[0].id, None);
    }

    #[test]
    fn test_ack_ensure() {
        assert!(Ack { success: true }.ensure("rename").is_ok());
        assert!(matches!(
            Ack { success: false }.ensure("rename"),
            Err(Error::Rejected("rename"))
        ));
    }
}
