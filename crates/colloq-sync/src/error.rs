//! Error types for colloq-sync

use colloq_api::ConversationId;
use thiserror::Error;

use crate::types::LocalId;

/// Result type alias using colloq-sync Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the sync engine.
///
/// Backend failures are not represented here: the controller turns them
/// into state changes and notifications instead of returning them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Message text was empty after trimming
    #[error("Message is empty")]
    EmptyMessage,

    /// Conversation name was empty after trimming
    #[error("Conversation name is empty")]
    InvalidName,

    /// The pending pair a resolution targets is gone (conversation switched)
    #[error("Pending message {0} is no longer present")]
    StaleResolution(LocalId),

    /// Referenced conversation is not in the registry
    #[error("Conversation not found: {0}")]
    NotFound(ConversationId),
}

impl Error {
    /// Whether the error was raised before any network call was made
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::EmptyMessage | Error::InvalidName)
    }
}
