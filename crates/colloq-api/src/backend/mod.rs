//! Chat backend implementations

pub mod http;

use crate::{
    ConversationId, ConversationRecord, Error, HistoryEntry, Result, SendMessageRequest,
    SendMessageResponse,
};
use async_trait::async_trait;

/// The request/response boundary to the answering service.
///
/// Every call is a single round trip; implementations do not retry.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// All conversations of the current user, most recently updated first
    async fn list_conversations(&self) -> Result<Vec<ConversationRecord>>;

    /// Create an empty conversation with the default name
    async fn create_conversation(&self) -> Result<ConversationRecord>;

    /// Send a message; with no conversation id the backend creates one
    async fn send_message(&self, request: &SendMessageRequest) -> Result<SendMessageResponse>;

    /// Question/answer pairs of a conversation, oldest first
    async fn get_history(&self, conversation_id: &ConversationId) -> Result<Vec<HistoryEntry>>;

    async fn rename_conversation(&self, conversation_id: &ConversationId, name: &str) -> Result<()>;

    async fn delete_conversation(&self, conversation_id: &ConversationId) -> Result<()>;
}

/// Get a bearer token from the provided value or an environment variable
pub fn get_token(provided: Option<&str>, env_var: &str) -> Option<String> {
    if let Some(token) = provided.filter(|t| !t.trim().is_empty()) {
        return Some(token.to_string());
    }

    std::env::var(env_var).ok().filter(|t| !t.trim().is_empty())
}

/// Require a token, failing with a configuration error
pub fn require_token(provided: Option<&str>, env_var: &str) -> Result<String> {
    get_token(provided, env_var)
        .ok_or_else(|| Error::InvalidConfig(format!("no token given and {env_var} is not set")))
}
