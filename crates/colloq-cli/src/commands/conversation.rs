//! /switch, /rename and /delete - act on one conversation

use super::CommandResult;
use colloq_api::ConversationId;
use colloq_sync::SyncSnapshot;

pub struct ConversationCommand;

impl ConversationCommand {
    pub fn switch(args: &str, snapshot: &SyncSnapshot) -> CommandResult {
        if args.is_empty() {
            return CommandResult::Message("Usage: /switch <n|id>\nUse /list to see positions".into());
        }
        match resolve_target(args, snapshot) {
            Some(id) => CommandResult::Switch(id),
            None => not_found(args),
        }
    }

    /// Rename the active conversation
    pub fn rename(args: &str, snapshot: &SyncSnapshot) -> CommandResult {
        let Some(id) = snapshot.active_id.clone() else {
            return CommandResult::Message("No active conversation to rename".into());
        };
        if args.is_empty() {
            return CommandResult::Message("Usage: /rename <name>".into());
        }
        CommandResult::Rename(id, args.to_string())
    }

    /// Delete the given conversation, or the active one
    pub fn delete(args: &str, snapshot: &SyncSnapshot) -> CommandResult {
        if args.is_empty() {
            return match snapshot.active_id.clone() {
                Some(id) => CommandResult::Delete(id),
                None => CommandResult::Message("No active conversation to delete".into()),
            };
        }
        match resolve_target(args, snapshot) {
            Some(id) => CommandResult::Delete(id),
            None => not_found(args),
        }
    }
}

fn not_found(target: &str) -> CommandResult {
    CommandResult::Message(format!(
        "No conversation matching '{}'\nUse /list to see positions",
        target
    ))
}

/// A 1-based list position, else an exact conversation id
fn resolve_target(target: &str, snapshot: &SyncSnapshot) -> Option<ConversationId> {
    let conversations = &snapshot.conversations;

    if let Ok(position) = target.parse::<usize>() {
        if (1..=conversations.len()).contains(&position) {
            return Some(conversations[position - 1].id.clone());
        }
    }

    conversations
        .iter()
        .find(|c| c.id.as_str() == target)
        .map(|c| c.id.clone())
}
