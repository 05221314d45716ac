use anyhow::{bail, Context, Result};
use colored::Colorize;

use studyhall_api::Catalog;
use studyhall_chat::{find_unit, ChatClient, QUESTION_SUGGESTIONS};
use studyhall_store::SessionStore;
use studyhall_types::{ChatMessage, ChatSession, Role, SessionId};

use crate::app::setup::AppConfig;
use crate::cli::{Commands, SessionCommands};
use crate::render::{print_message, print_notices, print_session, session_line, AnswerRenderer};

/// Resolve a session reference: a 1-based list number or a unique id prefix
pub fn resolve_session(sessions: &[ChatSession], reference: &str) -> Option<SessionId> {
    let reference = reference.trim();
    if let Ok(index) = reference.parse::<usize>() {
        if let Some(session) = index.checked_sub(1).and_then(|i| sessions.get(i)) {
            return Some(session.id.clone());
        }
    }
    if reference.is_empty() {
        return None;
    }
    let mut matches = sessions.iter().filter(|s| s.id.starts_with(reference));
    match (matches.next(), matches.next()) {
        (Some(session), None) => Some(session.id.clone()),
        _ => None,
    }
}

pub fn print_sessions(store: &SessionStore) {
    if store.sessions().is_empty() {
        println!("{}", "No chat sessions yet".bright_black());
        return;
    }
    let active = store.active_id();
    for (index, session) in store.sessions().iter().enumerate() {
        println!("{}", session_line(index, session, active == Some(&session.id)));
    }
}

pub fn print_saved(store: &SessionStore) {
    let saved = store.saved_messages();
    if saved.is_empty() {
        println!("{}", "No saved messages".bright_black());
        return;
    }
    for (session, message) in saved {
        println!("{}", format!("[{}]", session.unit_name).bright_cyan());
        print_message(message);
    }
}

pub fn print_suggestions() {
    println!("{}", "Try asking:".bright_cyan());
    for (index, suggestion) in QUESTION_SUGGESTIONS.iter().enumerate() {
        println!("  {}. {}", index + 1, suggestion);
    }
}

pub async fn print_catalog(catalog: &dyn Catalog) -> Result<()> {
    for course in catalog.courses().await? {
        println!("{}", course.name.bright_cyan().bold());
        for year in catalog.years(course.id).await? {
            println!("  {}", year.name);
            for semester in catalog.semesters(year.id).await? {
                println!("    {}", semester.name);
                for unit in catalog.units(semester.id).await? {
                    println!("      {} {}", format!("[{}]", unit.id).bright_black(), unit.name);
                }
            }
        }
    }
    Ok(())
}

/// Ask one question, aborting on Ctrl-C
async fn ask_once(config: &AppConfig, unit_id: u64, question: &str) -> Result<()> {
    let unit = find_unit(config.api.as_ref(), unit_id)
        .await
        .context("Failed to load the course catalog")?
        .with_context(|| format!("Unknown unit {}", unit_id))?;

    let mut chat = config.chat_client()?;
    chat.select_unit(Some(unit));

    let abort = chat.abort_handle();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            abort.abort();
        }
    });

    println!("{} {}", "You:".bright_green().bold(), question);
    let mut renderer = AnswerRenderer::stdout();
    let result = chat.ask(question, &mut renderer).await;
    watcher.abort();
    print_notices(chat.drain_notices());

    if result?.outcome.is_failure() {
        bail!("Failed to get answer");
    }
    Ok(())
}

fn run_session_command(chat: &mut ChatClient, command: SessionCommands) -> Result<()> {
    match command {
        SessionCommands::List => print_sessions(chat.store()),
        SessionCommands::Show { session } => {
            let id = resolve_session(chat.sessions(), &session)
                .with_context(|| format!("No session matches '{}'", session))?;
            if let Some(session) = chat.store().session(&id) {
                print_session(session);
            }
        }
        SessionCommands::Delete { session } => {
            let id = resolve_session(chat.sessions(), &session)
                .with_context(|| format!("No session matches '{}'", session))?;
            chat.delete_session(&id)?;
            print_notices(chat.drain_notices());
        }
    }
    Ok(())
}

/// Execute a one-shot subcommand
pub async fn run_command(command: Commands, config: AppConfig) -> Result<()> {
    match command {
        Commands::Ask { unit_id, question } => ask_once(&config, unit_id, &question.join(" ")).await,
        Commands::Sessions { command } => run_session_command(&mut config.chat_client()?, command),
        Commands::Courses => print_catalog(config.api.as_ref()).await,
        Commands::Suggest => {
            print_suggestions();
            Ok(())
        }
        Commands::Saved => {
            print_saved(&config.open_store()?);
            Ok(())
        }
        // Handled before any configuration is loaded
        Commands::Completions { .. } => Ok(()),
    }
}

/// Last assistant message of a session
pub fn last_answer(session: &ChatSession) -> Option<&ChatMessage> {
    session.messages.iter().rev().find(|m| m.role == Role::Assistant)
}
