//! Slash commands for interactive mode

mod conversation;

pub use conversation::ConversationCommand;

use colloq_api::ConversationId;
use colloq_sync::SyncSnapshot;

/// Result of executing a slash command
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// Start an empty conversation
    NewConversation,
    /// Make a conversation active and show its history
    Switch(ConversationId),
    /// Rename a conversation
    Rename(ConversationId, String),
    /// Delete a conversation
    Delete(ConversationId),
    /// Print the active conversation again
    ShowHistory,
    /// Show a message to the user (not sent to the backend)
    Message(String),
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse and execute a slash command
pub fn execute_command(input: &str, snapshot: &SyncSnapshot) -> Option<CommandResult> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let parts: Vec<&str> = rest.splitn(2, ' ').collect();
    let command = parts[0].to_lowercase();
    let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "new" | "n" => CommandResult::NewConversation,

        "list" | "l" => CommandResult::Message(crate::render::conversation_list(snapshot)),

        "switch" | "s" => ConversationCommand::switch(args, snapshot),

        "rename" | "r" => ConversationCommand::rename(args, snapshot),

        "delete" | "d" => ConversationCommand::delete(args, snapshot),

        "history" => CommandResult::ShowHistory,

        "quit" | "exit" | "q" => CommandResult::Exit,

        _ => CommandResult::Unknown(command),
    })
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?         Show this help message
  /new, /n              Start a new conversation
  /list, /l             List conversations
  /switch, /s <n|id>    Open a conversation by list position or id
  /rename, /r <name>    Rename the active conversation
  /delete, /d [n|id]    Delete a conversation (the active one by default)
  /history              Show the active conversation again
  /quit, /exit, /q      Exit colloq

Anything else is sent as a message to the active conversation.
With no active conversation, the first message starts a new one.

Examples:
  /switch 2             Open the second conversation in /list
  /rename Tax questions Rename the active conversation"#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(execute_command("hello /there", &SyncSnapshot::default()), None);
    }

    #[test]
    fn test_aliases_and_case() {
        let snapshot = SyncSnapshot::default();
        assert_eq!(
            execute_command("/NEW", &snapshot),
            Some(CommandResult::NewConversation)
        );
        assert_eq!(execute_command("  /q  ", &snapshot), Some(CommandResult::Exit));
        assert_eq!(
            execute_command("/history", &snapshot),
            Some(CommandResult::ShowHistory)
        );
        assert!(matches!(
            execute_command("/?", &snapshot),
            Some(CommandResult::Message(_))
        ));
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            execute_command("/frobnicate now", &SyncSnapshot::default()),
            Some(CommandResult::Unknown("frobnicate".into()))
        );
    }
}
