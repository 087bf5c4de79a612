//! colloq-sync: Conversation and message synchronization
//!
//! This crate keeps a client's view of its conversations consistent with
//! the chat backend: optimistic sends, reconciliation of answers, automatic
//! naming, and switching, renaming and deleting conversations without
//! stale responses leaking into the wrong view.

pub mod controller;
pub mod error;
pub mod events;
pub mod message_store;
pub mod naming;
pub mod registry;
pub mod types;

pub use controller::{ActionOutcome, SEND_FAILED_TEXT, SendOutcome, SyncController};
pub use error::{Error, Result};
pub use events::{NotificationLevel, SyncEvent};
pub use message_store::MessageStore;
pub use naming::NamingConfig;
pub use registry::{ConversationRegistry, Removed};
pub use types::{
    ConversationSummary, LocalId, MessageEntry, MessageId, MessageStatus, Role, SyncSnapshot,
};
