//! Sync event types

use colloq_api::ConversationId;
use serde::{Deserialize, Serialize};

use crate::controller::SendOutcome;
use crate::types::LocalId;

/// Severity of a user-visible notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Error,
}

/// Events emitted by the sync controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    /// Something in the snapshot changed; re-render
    StateChanged,

    /// Optimistic entries were appended for a send
    SendStarted { local_id: LocalId },

    /// A send left the `Sending` state
    SendFinished { outcome: SendOutcome },

    /// A conversation entered the registry from a backend response
    ConversationCreated { id: ConversationId },

    /// A conversation got a new name
    ConversationRenamed {
        id: ConversationId,
        name: String,
        /// Derived from the first message rather than chosen by the user
        automatic: bool,
    },

    /// A conversation was deleted
    ConversationDeleted { id: ConversationId },

    /// Transient message for the user
    Notification {
        level: NotificationLevel,
        message: String,
    },

    /// The backend rejected the credentials
    AuthExpired,
}

impl SyncEvent {
    pub(crate) fn info(message: impl Into<String>) -> Self {
        SyncEvent::Notification {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    pub(crate) fn error(message: impl Into<String>) -> Self {
        SyncEvent::Notification {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }

    /// Check if this is an error notification
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            SyncEvent::Notification {
                level: NotificationLevel::Error,
                ..
            }
        )
    }
}
