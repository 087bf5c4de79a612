//! Sync controller: drives the stores against the backend
//!
//! All state lives behind one lock that is only taken in synchronous
//! sections, never across a backend await. Operations polled concurrently
//! on one task therefore interleave exactly at their backend calls, and the
//! checks that keep them apart (the in-flight flag, the switch epoch) are
//! plain state checks.

use std::collections::HashSet;
use std::sync::Arc;

use colloq_api::{ChatBackend, ConversationId, SendMessageRequest, SendMessageResponse};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::{
    error::{Error, Result},
    events::SyncEvent,
    message_store::MessageStore,
    naming::NamingConfig,
    registry::ConversationRegistry,
    types::{ConversationSummary, LocalId, MessageEntry, SyncSnapshot},
};

/// Text of the assistant entry that stands in for a failed answer
pub const SEND_FAILED_TEXT: &str =
    "Sorry, an error occurred while processing your request. Please try again.";

/// How a send ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendOutcome {
    /// Another send was in flight or history was loading; nothing changed
    Ignored,
    /// The answer replaced the pending pair
    Reconciled,
    /// The backend failed; the pair was marked failed
    Errored,
    /// The user switched conversation before the answer arrived
    Abandoned,
}

/// How a create/select/rename/delete ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    Applied,
    /// The backend failed; a notification was published
    Failed,
    /// A later selection replaced this one before its history arrived
    Superseded,
}

#[derive(Debug, Default)]
struct SyncState {
    registry: ConversationRegistry,
    messages: MessageStore,
    sending: bool,
    loading: bool,
    /// Bumped on every active-pointer change
    epoch: u64,
    /// Conversations whose name is settled; auto-rename never touches them
    named: HashSet<ConversationId>,
}

impl SyncState {
    /// Move the active pointer and drop the previous conversation's entries
    fn switch_to(&mut self, id: Option<&ConversationId>) -> Result<u64> {
        self.registry.set_active(id)?;
        self.epoch += 1;
        self.messages.clear();
        self.loading = false;
        Ok(self.epoch)
    }
}

/// A send between its optimistic update and its resolution
struct PendingSend {
    local_user_id: LocalId,
    conversation_id: Option<ConversationId>,
    epoch: u64,
    text: String,
    guard: InFlightGuard,
}

#[derive(Debug, Clone, Copy)]
enum InFlight {
    Send { local_user_id: LocalId },
    HistoryLoad,
}

/// Releases an in-flight flag when its operation is dropped mid-await.
///
/// Completed operations disarm it before taking the state lock.
struct InFlightGuard {
    state: Arc<Mutex<SyncState>>,
    event_tx: broadcast::Sender<SyncEvent>,
    epoch: u64,
    kind: InFlight,
    armed: bool,
}

impl InFlightGuard {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        {
            let mut state = self.state.lock();
            let current = state.epoch == self.epoch;
            match self.kind {
                InFlight::Send { local_user_id } => {
                    state.sending = false;
                    if current {
                        state
                            .messages
                            .mark_pending_pair_failed(local_user_id, SEND_FAILED_TEXT);
                    }
                }
                // A later switch owns the flag
                InFlight::HistoryLoad if current => state.loading = false,
                InFlight::HistoryLoad => {}
            }
        }
        tracing::debug!(kind = ?self.kind, "in-flight operation dropped");
        let _ = self.event_tx.send(SyncEvent::StateChanged);
    }
}

/// Owns the conversation registry and message store and is the only thing
/// that mutates them.
///
/// Cloning is cheap and yields a handle onto the same state.
#[derive(Clone)]
pub struct SyncController {
    backend: Arc<dyn ChatBackend>,
    naming: NamingConfig,
    state: Arc<Mutex<SyncState>>,
    event_tx: broadcast::Sender<SyncEvent>,
}

impl SyncController {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self::with_naming(backend, NamingConfig::default())
    }

    pub fn with_naming(backend: Arc<dyn ChatBackend>, naming: NamingConfig) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            backend,
            naming,
            state: Arc::new(Mutex::new(SyncState::default())),
            event_tx,
        }
    }

    /// Subscribe to sync events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.event_tx.subscribe()
    }

    pub fn naming(&self) -> &NamingConfig {
        &self.naming
    }

    /// Copy of the current state for rendering
    pub fn snapshot(&self) -> SyncSnapshot {
        let state = self.state.lock();
        SyncSnapshot {
            conversations: state.registry.list().to_vec(),
            active_id: state.registry.active_id().cloned(),
            messages: state.messages.entries().to_vec(),
            sending: state.sending,
            loading: state.loading,
        }
    }

    pub fn is_sending(&self) -> bool {
        self.state.lock().sending
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    pub fn active_id(&self) -> Option<ConversationId> {
        self.state.lock().registry.active_id().cloned()
    }

    fn guard(&self, epoch: u64, kind: InFlight) -> InFlightGuard {
        InFlightGuard {
            state: Arc::clone(&self.state),
            event_tx: self.event_tx.clone(),
            epoch,
            kind,
            armed: true,
        }
    }

    fn emit(&self, event: SyncEvent) {
        let _ = self.event_tx.send(event);
    }

    fn emit_all(&self, events: Vec<SyncEvent>) {
        for event in events {
            self.emit(event);
        }
    }

    fn report_failure(&self, error: &colloq_api::Error, message: &str, events: &mut Vec<SyncEvent>) {
        events.push(SyncEvent::error(message));
        if error.is_unauthorized() {
            events.push(SyncEvent::AuthExpired);
        }
    }

    /// Fetch the conversation list without opening any conversation.
    ///
    /// An active conversation missing from the new list is closed.
    pub async fn refresh_conversations(&self) -> Result<ActionOutcome> {
        let records = match self.backend.list_conversations().await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load conversations");
                let mut events = Vec::new();
                self.report_failure(&e, "Failed to load conversations", &mut events);
                self.emit_all(events);
                return Ok(ActionOutcome::Failed);
            }
        };

        {
            let mut state = self.state.lock();
            let had_active = state.registry.active_id().is_some();
            state
                .registry
                .replace_all(records.into_iter().map(ConversationSummary::from).collect());
            tracing::debug!(count = state.registry.len(), "conversations loaded");

            if had_active && state.registry.active_id().is_none() {
                state.switch_to(None)?;
            }
        }
        self.emit(SyncEvent::StateChanged);
        Ok(ActionOutcome::Applied)
    }

    /// Fetch the conversation list; with nothing active, open the first one
    pub async fn load_conversations(&self) -> Result<ActionOutcome> {
        if self.refresh_conversations().await? == ActionOutcome::Failed {
            return Ok(ActionOutcome::Failed);
        }

        let next = {
            let state = self.state.lock();
            match state.registry.active_id() {
                Some(_) => None,
                None => state.registry.first_id(),
            }
        };

        match next {
            Some(id) => self.select_conversation(&id).await,
            None => Ok(ActionOutcome::Applied),
        }
    }

    /// Create an empty conversation at the head of the list and open it
    pub async fn create_conversation(&self) -> Result<ActionOutcome> {
        let record = match self.backend.create_conversation().await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "failed to create conversation");
                let mut events = Vec::new();
                self.report_failure(&e, "Failed to create new conversation", &mut events);
                self.emit_all(events);
                return Ok(ActionOutcome::Failed);
            }
        };

        let id = record.id.clone();
        {
            let mut state = self.state.lock();
            state.registry.upsert(record.into());
            state.switch_to(Some(&id))?;
        }
        tracing::debug!(conversation = %id, "conversation created");

        self.emit(SyncEvent::ConversationCreated { id });
        self.emit(SyncEvent::StateChanged);
        Ok(ActionOutcome::Applied)
    }

    /// Make a conversation active and reload its history.
    ///
    /// The history is applied only if no other switch happened meanwhile.
    pub async fn select_conversation(&self, id: &ConversationId) -> Result<ActionOutcome> {
        let epoch = {
            let mut state = self.state.lock();
            let epoch = state.switch_to(Some(id))?;
            state.loading = true;
            epoch
        };
        tracing::debug!(conversation = %id, "loading history");
        self.emit(SyncEvent::StateChanged);

        let mut guard = self.guard(epoch, InFlight::HistoryLoad);
        let result = self.backend.get_history(id).await;
        guard.disarm();

        let mut events = Vec::new();
        let outcome = {
            let mut state = self.state.lock();
            if state.epoch != epoch {
                tracing::debug!(conversation = %id, "selection superseded, dropping history");
                return Ok(ActionOutcome::Superseded);
            }
            state.loading = false;

            match result {
                Ok(history) => {
                    state.messages.load_all(MessageEntry::from_history(history));
                    ActionOutcome::Applied
                }
                Err(e) => {
                    tracing::warn!(error = %e, conversation = %id, "failed to load history");
                    state.messages.clear();
                    self.report_failure(&e, "Failed to load messages", &mut events);
                    ActionOutcome::Failed
                }
            }
        };
        events.push(SyncEvent::StateChanged);
        self.emit_all(events);
        Ok(outcome)
    }

    /// Send a message to the active conversation, or to a new one when
    /// nothing is active.
    pub async fn send(&self, text: &str) -> Result<SendOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::EmptyMessage);
        }

        let Some(pending) = self.begin_send(text) else {
            return Ok(SendOutcome::Ignored);
        };

        let request = SendMessageRequest::new(pending.text.clone(), pending.conversation_id.clone());
        let result = self.backend.send_message(&request).await;

        Ok(self.finish_send(pending, result))
    }

    /// Idle -> Sending: set the guard and append the optimistic pair
    fn begin_send(&self, text: &str) -> Option<PendingSend> {
        let pending = {
            let mut state = self.state.lock();
            if state.sending || state.loading {
                tracing::debug!(
                    sending = state.sending,
                    loading = state.loading,
                    "send ignored"
                );
                return None;
            }
            state.sending = true;
            let (local_user_id, _) = state.messages.append_pending_pair(text);
            PendingSend {
                local_user_id,
                conversation_id: state.registry.active_id().cloned(),
                epoch: state.epoch,
                text: text.to_string(),
                guard: self.guard(state.epoch, InFlight::Send { local_user_id }),
            }
        };
        tracing::debug!(
            local_id = %pending.local_user_id,
            conversation = ?pending.conversation_id,
            "send started"
        );

        self.emit(SyncEvent::SendStarted {
            local_id: pending.local_user_id,
        });
        self.emit(SyncEvent::StateChanged);
        Some(pending)
    }

    /// Sending -> Reconciled | Errored | Abandoned
    fn finish_send(
        &self,
        mut pending: PendingSend,
        result: colloq_api::Result<SendMessageResponse>,
    ) -> SendOutcome {
        pending.guard.disarm();
        let mut events = Vec::new();
        let outcome = {
            let mut state = self.state.lock();
            state.sending = false;

            match result.and_then(|response| check_target(&pending, response)) {
                Ok(response) => self.reconcile(&mut state, &pending, response, &mut events),
                Err(e) => {
                    if state.epoch == pending.epoch {
                        tracing::warn!(error = %e, local_id = %pending.local_user_id, "send failed");
                    } else {
                        tracing::warn!(
                            error = %e,
                            local_id = %pending.local_user_id,
                            "send failed after conversation switch"
                        );
                    }
                    state
                        .messages
                        .mark_pending_pair_failed(pending.local_user_id, SEND_FAILED_TEXT);
                    self.report_failure(&e, "Failed to send message", &mut events);
                    SendOutcome::Errored
                }
            }
        };
        tracing::debug!(?outcome, "send finished");

        events.push(SyncEvent::SendFinished { outcome });
        events.push(SyncEvent::StateChanged);
        self.emit_all(events);
        outcome
    }

    fn reconcile(
        &self,
        state: &mut SyncState,
        pending: &PendingSend,
        response: SendMessageResponse,
        events: &mut Vec<SyncEvent>,
    ) -> SendOutcome {
        let id = response.conversation_id.clone();

        // Registry facts hold whether or not the user is still looking.
        if pending.conversation_id.is_none() {
            if !state.registry.contains(&id) {
                state.registry.upsert(ConversationSummary {
                    id: id.clone(),
                    name: response.conversation_name.clone(),
                    created_at: response.created_at,
                    updated_at: response.created_at,
                });
                events.push(SyncEvent::ConversationCreated { id: id.clone() });
            }
        } else {
            state.registry.touch(&id, response.created_at);
        }
        self.apply_server_name(state, &id, &response.conversation_name, &pending.text, events);

        if state.epoch != pending.epoch {
            tracing::debug!(conversation = %id, "conversation switched during send, discarding answer");
            return SendOutcome::Abandoned;
        }

        let [user, assistant] = MessageEntry::pair_from_response(&pending.text, &response);
        if let Err(e) = state
            .messages
            .resolve_pending_pair(pending.local_user_id, user, assistant)
        {
            tracing::debug!(error = %e, "discarding answer");
            return SendOutcome::Abandoned;
        }

        if pending.conversation_id.is_none() {
            // The store already holds the exchange; no history reload.
            if let Err(e) = state.registry.set_active(Some(&id)) {
                tracing::warn!(error = %e, "created conversation missing from registry");
            }
            state.epoch += 1;
        }

        SendOutcome::Reconciled
    }

    /// Auto-rename: fires at most once per conversation, and only while the
    /// server still reports the default name.
    fn apply_server_name(
        &self,
        state: &mut SyncState,
        id: &ConversationId,
        server_name: &str,
        sent_text: &str,
        events: &mut Vec<SyncEvent>,
    ) {
        let Some(mut summary) = state.registry.get(id).cloned() else {
            return;
        };

        let name = if self.naming.is_default(server_name) {
            if !state.named.insert(id.clone()) {
                return;
            }
            let derived = self.naming.derive_title(sent_text);
            tracing::debug!(conversation = %id, name = %derived, "auto-renaming conversation");
            derived
        } else {
            state.named.insert(id.clone());
            if summary.name == server_name {
                return;
            }
            server_name.to_string()
        };

        summary.name = name.clone();
        state.registry.upsert(summary);
        events.push(SyncEvent::ConversationRenamed {
            id: id.clone(),
            name,
            automatic: true,
        });
    }

    /// Rename a conversation on the backend, then locally
    pub async fn rename_conversation(
        &self,
        id: &ConversationId,
        name: &str,
    ) -> Result<ActionOutcome> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidName);
        }
        {
            let state = self.state.lock();
            if !state.registry.contains(id) {
                return Err(Error::NotFound(id.clone()));
            }
        }

        if let Err(e) = self.backend.rename_conversation(id, name).await {
            tracing::warn!(error = %e, conversation = %id, "failed to rename conversation");
            let mut events = Vec::new();
            self.report_failure(&e, "Failed to rename conversation", &mut events);
            self.emit_all(events);
            return Ok(ActionOutcome::Failed);
        }

        {
            let mut state = self.state.lock();
            state.named.insert(id.clone());
            if let Err(e) = state.registry.rename(id, name) {
                tracing::debug!(error = %e, "renamed conversation is gone");
            }
        }

        self.emit(SyncEvent::ConversationRenamed {
            id: id.clone(),
            name: name.to_string(),
            automatic: false,
        });
        self.emit(SyncEvent::info("Conversation renamed"));
        self.emit(SyncEvent::StateChanged);
        Ok(ActionOutcome::Applied)
    }

    /// Delete a conversation; if it was active, open the next one or
    /// fall back to the empty view.
    pub async fn delete_conversation(&self, id: &ConversationId) -> Result<ActionOutcome> {
        {
            let state = self.state.lock();
            if !state.registry.contains(id) {
                return Err(Error::NotFound(id.clone()));
            }
        }

        if let Err(e) = self.backend.delete_conversation(id).await {
            tracing::warn!(error = %e, conversation = %id, "failed to delete conversation");
            let mut events = Vec::new();
            self.report_failure(&e, "Failed to delete conversation", &mut events);
            self.emit_all(events);
            return Ok(ActionOutcome::Failed);
        }

        let next = {
            let mut state = self.state.lock();
            state.named.remove(id);
            match state.registry.remove(id) {
                Some(removed) if removed.was_active => {
                    state.switch_to(None)?;
                    state.registry.first_id()
                }
                _ => None,
            }
        };
        tracing::debug!(conversation = %id, next = ?next, "conversation deleted");

        self.emit(SyncEvent::ConversationDeleted { id: id.clone() });
        self.emit(SyncEvent::info("Conversation deleted"));
        self.emit(SyncEvent::StateChanged);

        if let Some(next) = next {
            self.select_conversation(&next).await?;
        }
        Ok(ActionOutcome::Applied)
    }
}

/// A reply for another conversation than the one written to is malformed
fn check_target(
    pending: &PendingSend,
    response: SendMessageResponse,
) -> colloq_api::Result<SendMessageResponse> {
    match pending.conversation_id {
        Some(ref sent_to) if *sent_to != response.conversation_id => {
            Err(colloq_api::Error::UnexpectedResponse(format!(
                "answer for conversation {} while sending to {}",
                response.conversation_id, sent_to
            )))
        }
        _ => Ok(response),
    }
}
