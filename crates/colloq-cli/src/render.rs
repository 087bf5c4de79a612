//! Plain-text rendering of sync snapshots

use colloq_sync::naming::truncate_chars;
use colloq_sync::{MessageEntry, MessageStatus, Role, SyncSnapshot};

const NAME_PREVIEW_CHARS: usize = 40;

/// One message as a prompt-style line
pub fn entry(entry: &MessageEntry) -> String {
    let who = match entry.role {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    let text = if entry.is_pending() && entry.text.is_empty() {
        "..."
    } else {
        entry.text.as_str()
    };
    let marker = match entry.status {
        MessageStatus::Failed => " [not delivered]",
        _ => "",
    };
    format!("{}> {}{}", who, text, marker)
}

/// Header plus every message of the active conversation
pub fn history(snapshot: &SyncSnapshot) -> String {
    let mut output = match snapshot.active() {
        Some(conversation) => format!("== {} ==\n", conversation.name),
        None => "== New conversation ==\n".to_string(),
    };

    if snapshot.messages.is_empty() {
        output.push_str("(no messages yet)");
    } else {
        let lines: Vec<String> = snapshot.messages.iter().map(entry).collect();
        output.push_str(&lines.join("\n\n"));
    }
    output
}

pub fn conversation_list(snapshot: &SyncSnapshot) -> String {
    if snapshot.conversations.is_empty() {
        return "No conversations yet. Type a message to start one.".to_string();
    }

    let mut output = String::from("Conversations:\n\n");
    for (i, conversation) in snapshot.conversations.iter().enumerate() {
        let marker = if snapshot.active_id.as_ref() == Some(&conversation.id) {
            " *"
        } else {
            ""
        };
        output.push_str(&format!(
            "  {:>2}. {:<43} {}{}\n",
            i + 1,
            truncate_chars(&conversation.name, NAME_PREVIEW_CHARS, "..."),
            conversation.updated_at.format("%Y-%m-%d %H:%M"),
            marker
        ));
    }

    output.push_str("\nSwitch with: /switch <n>");
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use colloq_api::ConversationId;
    use colloq_sync::{ConversationSummary, LocalId};

    fn snapshot_with(names: &[&str], active: Option<usize>) -> SyncSnapshot {
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let conversations: Vec<ConversationSummary> = names
            .iter()
            .enumerate()
            .map(|(i, name)| ConversationSummary {
                id: ConversationId::from(i as i64 + 1),
                name: name.to_string(),
                created_at: at,
                updated_at: at,
            })
            .collect();
        SyncSnapshot {
            active_id: active.map(|i| conversations[i].id.clone()),
            conversations,
            ..Default::default()
        }
    }

    #[test]
    fn test_entry_prefixes() {
        let user = MessageEntry::pending(LocalId::new(1), Role::User, "hi");
        let placeholder = MessageEntry::pending(LocalId::new(2), Role::Assistant, "");
        assert_eq!(entry(&user), "you> hi");
        assert_eq!(entry(&placeholder), "assistant> ...");

        let mut failed = user.clone();
        failed.status = MessageStatus::Failed;
        assert_eq!(entry(&failed), "you> hi [not delivered]");
    }

    #[test]
    fn test_list_marks_active() {
        let output = conversation_list(&snapshot_with(&["Alpha", "Bravo"], Some(1)));
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[2].contains("1. Alpha"));
        assert!(!lines[2].ends_with('*'));
        assert!(lines[3].contains("2. Bravo"));
        assert!(lines[3].ends_with(" *"));
    }

    #[test]
    fn test_list_empty() {
        assert!(conversation_list(&SyncSnapshot::default()).starts_with("No conversations"));
    }

    #[test]
    fn test_history_empty_conversation() {
        let output = history(&snapshot_with(&["Alpha"], Some(0)));
        assert_eq!(output, "== Alpha ==\n(no messages yet)");
        assert!(history(&SyncSnapshot::default()).starts_with("== New conversation =="));
    }
}
