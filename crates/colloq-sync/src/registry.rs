//! Conversation list and the active-conversation pointer

use chrono::{DateTime, Utc};
use colloq_api::ConversationId;

use crate::error::{Error, Result};
use crate::types::ConversationSummary;

/// A conversation taken out of the registry
#[derive(Debug, Clone, PartialEq)]
pub struct Removed {
    pub summary: ConversationSummary,
    /// It was the active conversation; the pointer is now cleared
    pub was_active: bool,
}

/// Ordered conversation summaries, at most one per id.
///
/// Order is insertion order, except that new conversations go to the head.
#[derive(Debug, Default)]
pub struct ConversationRegistry {
    conversations: Vec<ConversationSummary>,
    active: Option<ConversationId>,
}

impl ConversationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> &[ConversationSummary] {
        &self.conversations
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn get(&self, id: &ConversationId) -> Option<&ConversationSummary> {
        self.conversations.iter().find(|c| &c.id == id)
    }

    pub fn contains(&self, id: &ConversationId) -> bool {
        self.get(id).is_some()
    }

    fn get_mut(&mut self, id: &ConversationId) -> Option<&mut ConversationSummary> {
        self.conversations.iter_mut().find(|c| &c.id == id)
    }

    pub fn first_id(&self) -> Option<ConversationId> {
        self.conversations.first().map(|c| c.id.clone())
    }

    /// Insert at the head if the id is new, else update in place.
    ///
    /// Returns `true` when a new entry was inserted.
    pub fn upsert(&mut self, summary: ConversationSummary) -> bool {
        match self.get_mut(&summary.id) {
            Some(existing) => {
                *existing = summary;
                false
            }
            None => {
                self.conversations.insert(0, summary);
                true
            }
        }
    }

    /// Replace the whole list, keeping the first occurrence of each id.
    ///
    /// The active pointer survives only if its conversation is still listed.
    pub fn replace_all(&mut self, summaries: Vec<ConversationSummary>) {
        let mut conversations: Vec<ConversationSummary> = Vec::with_capacity(summaries.len());
        for summary in summaries {
            if conversations.iter().any(|c| c.id == summary.id) {
                tracing::warn!(id = %summary.id, "duplicate conversation in list, keeping first");
                continue;
            }
            conversations.push(summary);
        }
        self.conversations = conversations;

        if let Some(active) = self.active.take() {
            if self.contains(&active) {
                self.active = Some(active);
            }
        }
    }

    /// Set a conversation's name without moving it
    pub fn rename(&mut self, id: &ConversationId, name: impl Into<String>) -> Result<()> {
        let summary = self
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.clone()))?;
        summary.name = name.into();
        Ok(())
    }

    /// Record activity without moving the conversation
    pub fn touch(&mut self, id: &ConversationId, at: DateTime<Utc>) {
        if let Some(summary) = self.get_mut(id) {
            if at > summary.updated_at {
                summary.updated_at = at;
            }
        }
    }

    /// Remove a conversation; when it was active the pointer is cleared and
    /// the caller chooses the next one.
    pub fn remove(&mut self, id: &ConversationId) -> Option<Removed> {
        let index = self.conversations.iter().position(|c| &c.id == id)?;
        let summary = self.conversations.remove(index);
        let was_active = self.active.as_ref() == Some(id);
        if was_active {
            self.active = None;
        }
        Some(Removed {
            summary,
            was_active,
        })
    }

    pub fn active_id(&self) -> Option<&ConversationId> {
        self.active.as_ref()
    }

    pub fn active(&self) -> Option<&ConversationSummary> {
        self.active.as_ref().and_then(|id| self.get(id))
    }

    /// Point at a listed conversation, or at none
    pub fn set_active(&mut self, id: Option<&ConversationId>) -> Result<()> {
        match id {
            Some(id) if !self.contains(id) => Err(Error::NotFound(id.clone())),
            Some(id) => {
                self.active = Some(id.clone());
                Ok(())
            }
            None => {
                self.active = None;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: i64, name: &str) -> ConversationSummary {
        let at = DateTime::from_timestamp(1_700_000_000 + id, 0).unwrap();
        ConversationSummary {
            id: ConversationId::from(id),
            name: name.to_string(),
            created_at: at,
            updated_at: at,
        }
    }

    fn names(registry: &ConversationRegistry) -> Vec<&str> {
        registry.list().iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_upsert_new_goes_to_head() {
        let mut registry = ConversationRegistry::new();
        assert!(registry.upsert(summary(1, "one")));
        assert!(registry.upsert(summary(2, "two")));
        assert_eq!(names(&registry), ["two", "one"]);
    }

    #[test]
    fn test_upsert_existing_updates_in_place() {
        let mut registry = ConversationRegistry::new();
        registry.replace_all(vec![summary(1, "one"), summary(2, "two"), summary(3, "three")]);

        assert!(!registry.upsert(summary(2, "renamed")));
        assert_eq!(names(&registry), ["one", "renamed", "three"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_replace_all_dedupes_and_keeps_active() {
        let mut registry = ConversationRegistry::new();
        registry.replace_all(vec![summary(1, "one"), summary(2, "two")]);
        registry.set_active(Some(&ConversationId::from(2))).unwrap();

        registry.replace_all(vec![summary(2, "two"), summary(2, "dup"), summary(4, "four")]);
        assert_eq!(names(&registry), ["two", "four"]);
        assert_eq!(registry.active_id(), Some(&ConversationId::from(2)));

        registry.replace_all(vec![summary(5, "five")]);
        assert_eq!(registry.active_id(), None);
    }

    #[test]
    fn test_set_active_unknown_is_not_found() {
        let mut registry = ConversationRegistry::new();
        registry.upsert(summary(1, "one"));

        let missing = ConversationId::from(9);
        assert_eq!(
            registry.set_active(Some(&missing)),
            Err(Error::NotFound(missing))
        );
        assert_eq!(registry.active_id(), None);

        registry.set_active(Some(&ConversationId::from(1))).unwrap();
        assert_eq!(registry.active().map(|c| c.name.as_str()), Some("one"));
        registry.set_active(None).unwrap();
        assert!(registry.active().is_none());
    }

    #[test]
    fn test_remove_active_clears_pointer() {
        let mut registry = ConversationRegistry::new();
        registry.replace_all(vec![summary(1, "one"), summary(2, "two")]);
        registry.set_active(Some(&ConversationId::from(1))).unwrap();

        let removed = registry.remove(&ConversationId::from(1)).unwrap();
        assert!(removed.was_active);
        assert_eq!(removed.summary.name, "one");
        assert_eq!(registry.active_id(), None);
        assert_eq!(registry.first_id(), Some(ConversationId::from(2)));
    }

    #[test]
    fn test_remove_inactive_keeps_pointer() {
        let mut registry = ConversationRegistry::new();
        registry.replace_all(vec![summary(1, "one"), summary(2, "two")]);
        registry.set_active(Some(&ConversationId::from(1))).unwrap();

        let removed = registry.remove(&ConversationId::from(2)).unwrap();
        assert!(!removed.was_active);
        assert_eq!(registry.active_id(), Some(&ConversationId::from(1)));
        assert!(registry.remove(&ConversationId::from(2)).is_none());
    }

    #[test]
    fn test_rename_and_touch() {
        let mut registry = ConversationRegistry::new();
        registry.replace_all(vec![summary(1, "one"), summary(2, "two")]);

        registry.rename(&ConversationId::from(2), "second").unwrap();
        assert_eq!(names(&registry), ["one", "second"]);
        assert!(registry.rename(&ConversationId::from(3), "x").is_err());

        let later = DateTime::from_timestamp(1_800_000_000, 0).unwrap();
        registry.touch(&ConversationId::from(2), later);
        assert_eq!(registry.get(&ConversationId::from(2)).unwrap().updated_at, later);
        assert_eq!(names(&registry), ["one", "second"]);
    }
}
