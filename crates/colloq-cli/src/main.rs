//! colloq - terminal client for the colloq chat service

mod commands;
mod config;
mod render;

use clap::Parser;
use colloq_api::{ConversationId, HttpBackend};
use colloq_sync::{ActionOutcome, NotificationLevel, SendOutcome, SyncController, SyncEvent};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// colloq - chat with the colloq assistant from the terminal
#[derive(Parser, Debug)]
#[command(name = "colloq")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the chat API (default: http://localhost:8000/api)
    #[arg(long)]
    base_url: Option<String>,

    /// Bearer token (default: config file, then COLLOQ_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Send a single message, print the answer and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Conversation for --command (default: start a new one)
    #[arg(long, requires = "command")]
    conversation: Option<String>,

    /// List conversations and exit
    #[arg(long)]
    list: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

fn init_tracing(verbose: bool) {
    if verbose {
        tracing_subscriber::fmt()
            .with_env_filter("colloq=debug")
            .with_writer(std::io::stderr)
            .init();
    } else if std::env::var_os("RUST_LOG").is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing(args.verbose);

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = config::Config::load();

    // CLI takes precedence over the config file
    let base_url = args
        .base_url
        .clone()
        .unwrap_or_else(|| cfg.base_url().to_string());

    let Some(token) = args
        .token
        .clone()
        .filter(|t| !t.trim().is_empty())
        .or_else(|| cfg.token())
    else {
        eprintln!("Error: No token found for {}", base_url);
        eprintln!();
        eprintln!("Options:");
        eprintln!("  1. Pass it: colloq --token <token>");
        eprintln!("  2. Set it: export {}=<token>", config::TOKEN_ENV_VAR);
        eprintln!("  3. Add to config: colloq --init-config");
        std::process::exit(1);
    };

    let backend = HttpBackend::with_timeout(&base_url, cfg.timeout())?.with_token(token);
    tracing::debug!(base_url = %backend.base_url(), "backend configured");
    let controller = SyncController::with_naming(Arc::new(backend), cfg.naming.clone());

    if args.list {
        return list_conversations(&controller).await;
    }

    // Non-interactive mode
    if let Some(command) = args.command {
        let conversation = args.conversation.map(ConversationId::new);
        return run_command(&controller, &command, conversation).await;
    }

    run_interactive(&controller, &base_url).await
}

/// Print notifications as they arrive; exit when the token is rejected
fn spawn_event_printer(controller: &SyncController) -> JoinHandle<()> {
    let mut receiver = controller.subscribe();

    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(SyncEvent::Notification {
                    level: NotificationLevel::Error,
                    message,
                }) => {
                    eprintln!("[error] {}", message);
                }
                Ok(SyncEvent::Notification {
                    level: NotificationLevel::Info,
                    message,
                }) => {
                    println!("[{}]", message);
                }
                Ok(SyncEvent::ConversationRenamed {
                    name,
                    automatic: true,
                    ..
                }) => {
                    println!("[Conversation named \"{}\"]", name);
                }
                Ok(SyncEvent::AuthExpired) => {
                    eprintln!();
                    eprintln!("Error: The server rejected the token (expired or revoked).");
                    eprintln!(
                        "Provide a fresh one with --token or {}.",
                        config::TOKEN_ENV_VAR
                    );
                    std::process::exit(2);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event printer fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Give the printer a moment to drain before stopping it
async fn stop_printer(handle: JoinHandle<()>) {
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    handle.abort();
}

async fn list_conversations(controller: &SyncController) -> anyhow::Result<()> {
    let printer = spawn_event_printer(controller);

    let outcome = controller.refresh_conversations().await?;
    let snapshot = controller.snapshot();
    stop_printer(printer).await;

    if outcome == ActionOutcome::Failed {
        std::process::exit(1);
    }

    println!("{}", render::conversation_list(&snapshot));
    Ok(())
}

async fn run_command(
    controller: &SyncController,
    text: &str,
    conversation: Option<ConversationId>,
) -> anyhow::Result<()> {
    println!("colloq> {}", text);
    println!();

    let printer = spawn_event_printer(controller);

    if let Some(id) = conversation {
        // The list only; the requested conversation is the one opened
        if controller.refresh_conversations().await? == ActionOutcome::Failed {
            stop_printer(printer).await;
            anyhow::bail!("could not load conversations");
        }
        if controller.select_conversation(&id).await? != ActionOutcome::Applied {
            stop_printer(printer).await;
            anyhow::bail!("could not open conversation {}", id);
        }
    }

    let outcome = controller.send(text).await?;
    let snapshot = controller.snapshot();
    stop_printer(printer).await;

    match outcome {
        SendOutcome::Reconciled => {
            if let Some(answer) = snapshot.messages.last() {
                println!("{}", answer.text);
            }
            if let Some(conversation) = snapshot.active() {
                println!("\n[Conversation {}: {}]", conversation.id, conversation.name);
            }
            Ok(())
        }
        SendOutcome::Errored => std::process::exit(1),
        SendOutcome::Ignored | SendOutcome::Abandoned => {
            anyhow::bail!("message was not delivered ({:?})", outcome)
        }
    }
}

fn print_history(controller: &SyncController) {
    println!("{}", render::history(&controller.snapshot()));
    println!();
}

/// Print a rejected intent; backend failures arrive as notifications
fn applied(result: colloq_sync::Result<ActionOutcome>) -> bool {
    match result {
        Ok(outcome) => outcome == ActionOutcome::Applied,
        Err(e) => {
            println!("{}", e);
            false
        }
    }
}

async fn run_interactive(controller: &SyncController, base_url: &str) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let printer = spawn_event_printer(controller);

    controller.load_conversations().await?;

    // Show minimal startup info (only if TTY)
    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        eprintln!("colloq ({}) - /help for commands", base_url);
        eprintln!();
    }
    print_history(controller);

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        // Handle slash commands
        if input.starts_with('/') {
            let snapshot = controller.snapshot();
            if let Some(result) = commands::execute_command(input, &snapshot) {
                match result {
                    commands::CommandResult::Exit => {
                        break;
                    }
                    commands::CommandResult::Message(msg) => {
                        println!("{}", msg);
                    }
                    commands::CommandResult::Unknown(cmd) => {
                        println!("Unknown command: /{}", cmd);
                        println!("Type /help for available commands.");
                    }
                    commands::CommandResult::NewConversation => {
                        if applied(controller.create_conversation().await) {
                            print_history(controller);
                        }
                    }
                    commands::CommandResult::Switch(id) => {
                        if applied(controller.select_conversation(&id).await) {
                            print_history(controller);
                        }
                    }
                    commands::CommandResult::Rename(id, name) => {
                        applied(controller.rename_conversation(&id, &name).await);
                    }
                    commands::CommandResult::Delete(id) => {
                        let was_active = snapshot.active_id.as_ref() == Some(&id);
                        if applied(controller.delete_conversation(&id).await) && was_active {
                            print_history(controller);
                        }
                    }
                    commands::CommandResult::ShowHistory => {
                        print_history(controller);
                    }
                }
            }
            continue;
        }

        match controller.send(input).await {
            Ok(SendOutcome::Reconciled) | Ok(SendOutcome::Errored) => {
                if let Some(answer) = controller.snapshot().messages.last() {
                    println!("{}", render::entry(answer));
                }
                println!();
            }
            Ok(SendOutcome::Ignored) => {
                println!("[Still busy; message not sent]");
            }
            Ok(SendOutcome::Abandoned) => {}
            Err(e) => {
                println!("{}", e);
            }
        }
    }

    printer.abort();
    Ok(())
}
