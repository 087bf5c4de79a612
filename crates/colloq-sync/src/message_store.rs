//! Ordered message entries of the active conversation.
//!
//! Entries are kept in creation order; timestamps are informational and
//! never used for ordering. Optimistic entries always come as a pending user
//! entry immediately followed by its pending assistant placeholder.

use crate::error::{Error, Result};
use crate::types::{LocalId, MessageEntry, MessageId, MessageStatus, Role};

#[derive(Debug, Default)]
pub struct MessageStore {
    entries: Vec<MessageEntry>,
    next_local: u64,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[MessageEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_pending(&self) -> bool {
        self.entries.iter().any(MessageEntry::is_pending)
    }

    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_pending()).count()
    }

    /// Number of confirmed user/assistant pairs
    pub fn confirmed_pairs(&self) -> usize {
        self.entries
            .windows(2)
            .filter(|w| {
                w[0].role == Role::User
                    && w[1].role == Role::Assistant
                    && w[0].status == MessageStatus::Confirmed
                    && w[1].status == MessageStatus::Confirmed
            })
            .count()
    }

    /// Replace everything, dropping pending entries of the previous conversation
    pub fn load_all(&mut self, entries: Vec<MessageEntry>) {
        self.entries = entries;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn next_local_id(&mut self) -> LocalId {
        self.next_local += 1;
        LocalId::new(self.next_local)
    }

    /// Append a pending user entry and its assistant placeholder.
    ///
    /// Returns `(user_id, placeholder_id)`.
    pub fn append_pending_pair(&mut self, user_text: &str) -> (LocalId, LocalId) {
        let user_id = self.next_local_id();
        let placeholder_id = self.next_local_id();
        self.entries.extend([
            MessageEntry::pending(user_id, Role::User, user_text),
            MessageEntry::pending(placeholder_id, Role::Assistant, ""),
        ]);
        (user_id, placeholder_id)
    }

    /// Index of the pending pair whose user entry has `local_user_id`
    fn find_pending_pair(&self, local_user_id: LocalId) -> Option<usize> {
        let index = self
            .entries
            .iter()
            .position(|e| e.id == MessageId::Local(local_user_id))?;
        let user = &self.entries[index];
        let placeholder = self.entries.get(index + 1)?;
        let is_pair = user.role == Role::User
            && user.is_pending()
            && placeholder.role == Role::Assistant
            && placeholder.is_pending()
            && placeholder.id.is_local();
        is_pair.then_some(index)
    }

    /// Swap a pending pair for its confirmed entries, in place
    pub fn resolve_pending_pair(
        &mut self,
        local_user_id: LocalId,
        user: MessageEntry,
        assistant: MessageEntry,
    ) -> Result<()> {
        let index = self
            .find_pending_pair(local_user_id)
            .ok_or(Error::StaleResolution(local_user_id))?;
        self.entries[index] = user;
        self.entries[index + 1] = assistant;
        Ok(())
    }

    /// Turn a pending pair into a failed user entry plus an error entry.
    ///
    /// Returns `false` when the pair is no longer present.
    pub fn mark_pending_pair_failed(&mut self, local_user_id: LocalId, error_text: &str) -> bool {
        let Some(index) = self.find_pending_pair(local_user_id) else {
            return false;
        };
        let error_id = self.next_local_id();
        self.entries[index].status = MessageStatus::Failed;
        self.entries[index + 1] = MessageEntry::error(error_id, error_text);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn confirmed_pair(id: &str, query: &str, answer: &str) -> Vec<MessageEntry> {
        vec![
            MessageEntry::confirmed(format!("{id}:user"), Role::User, query, ts(0)),
            MessageEntry::confirmed(id, Role::Assistant, answer, ts(0)),
        ]
    }

    #[test]
    fn test_append_pending_pair_is_contiguous() {
        let mut store = MessageStore::new();
        store.load_all(confirmed_pair("1", "q", "a"));

        let (user_id, placeholder_id) = store.append_pending_pair("hello");
        assert_ne!(user_id, placeholder_id);
        assert_eq!(store.len(), 4);
        assert_eq!(store.entries()[2].id, MessageId::Local(user_id));
        assert_eq!(store.entries()[2].text, "hello");
        assert_eq!(store.entries()[3].id, MessageId::Local(placeholder_id));
        assert_eq!(store.entries()[3].role, Role::Assistant);
        assert_eq!(store.pending_count(), 2);
    }

    #[test]
    fn test_resolve_replaces_in_place() {
        let mut store = MessageStore::new();
        let (user_id, _) = store.append_pending_pair("question");

        let mut confirmed = confirmed_pair("9", "question", "answer");
        let assistant = confirmed.pop().unwrap();
        let user = confirmed.pop().unwrap();
        store.resolve_pending_pair(user_id, user, assistant).unwrap();

        assert_eq!(store.len(), 2);
        assert!(!store.has_pending());
        assert_eq!(store.confirmed_pairs(), 1);
        assert_eq!(store.entries()[1].text, "answer");
        assert_eq!(store.entries()[1].id, MessageId::Server("9".into()));
    }

    #[test]
    fn test_resolve_after_reload_is_stale() {
        let mut store = MessageStore::new();
        let (user_id, _) = store.append_pending_pair("question");

        let other = confirmed_pair("5", "other q", "other a");
        store.load_all(other.clone());

        let mut confirmed = confirmed_pair("9", "question", "answer");
        let assistant = confirmed.pop().unwrap();
        let user = confirmed.pop().unwrap();
        let result = store.resolve_pending_pair(user_id, user, assistant);

        assert_eq!(result, Err(Error::StaleResolution(user_id)));
        assert_eq!(store.entries(), other.as_slice());
    }

    #[test]
    fn test_resolve_twice_is_stale() {
        let mut store = MessageStore::new();
        let (user_id, _) = store.append_pending_pair("q");
        let pair = confirmed_pair("1", "q", "a");
        store
            .resolve_pending_pair(user_id, pair[0].clone(), pair[1].clone())
            .unwrap();
        assert!(store
            .resolve_pending_pair(user_id, pair[0].clone(), pair[1].clone())
            .is_err());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_mark_failed() {
        let mut store = MessageStore::new();
        store.load_all(confirmed_pair("1", "q", "a"));
        let (user_id, placeholder_id) = store.append_pending_pair("broken");

        assert!(store.mark_pending_pair_failed(user_id, "Something went wrong"));

        assert_eq!(store.len(), 4);
        assert!(!store.has_pending());
        let user = &store.entries()[2];
        assert_eq!(user.status, MessageStatus::Failed);
        assert_eq!(user.text, "broken");
        let error = &store.entries()[3];
        assert!(error.is_error);
        assert_eq!(error.role, Role::Assistant);
        assert_eq!(error.text, "Something went wrong");
        assert_ne!(error.id, MessageId::Local(placeholder_id));
    }

    #[test]
    fn test_mark_failed_missing_pair_is_noop() {
        let mut store = MessageStore::new();
        let (user_id, _) = store.append_pending_pair("q");
        store.clear();
        store.load_all(confirmed_pair("1", "q", "a"));

        assert!(!store.mark_pending_pair_failed(user_id, "err"));
        assert_eq!(store.len(), 2);
        assert_eq!(store.confirmed_pairs(), 1);
    }

    #[test]
    fn test_local_ids_unique_across_reloads() {
        let mut store = MessageStore::new();
        let (a, _) = store.append_pending_pair("one");
        store.load_all(Vec::new());
        let (b, _) = store.append_pending_pair("two");
        assert_ne!(a, b);
    }
}
