use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::{Arc, Mutex};

use studyhall_chat::{all_units, find_unit, ChatClient, ChatError};
use studyhall_stream::AbortHandle;

use crate::app::commands::{
    last_answer, print_catalog, print_saved, print_sessions, print_suggestions, resolve_session,
};
use crate::app::setup::AppConfig;
use crate::render::{print_notices, print_session, AnswerRenderer};

fn print_help() {
    println!("{} Commands:", "📚".bright_cyan());
    println!("  /units                  - List every unit with its id");
    println!("  /tree                   - Show the course catalog");
    println!("  /unit <id>              - Select the unit to ask about");
    println!("  /sessions               - List chat sessions");
    println!("  /open <n|id>            - Open a session");
    println!("  /new                    - Start a new conversation");
    println!("  /delete <n|id>          - Delete a session");
    println!("  /save                   - Save or unsave the last answer");
    println!("  /saved                  - Show saved messages");
    println!("  /suggest                - Show starter questions");
    println!("  /quit                   - Exit");
    println!("  Anything else is asked as a question. Ctrl-C stops a running answer.");
}

fn prompt(chat: &ChatClient) -> String {
    let unit = match chat.selected_unit() {
        Some(unit) => format!("[{}]", unit.unit_name).bright_magenta(),
        None => "[no unit]".bright_black(),
    };
    format!("{} {} ", unit, "You:".bright_green().bold())
}

/// Run interactive REPL mode
pub async fn run_repl_mode(config: AppConfig) -> Result<()> {
    println!("{}", "📚 Study Hall".bright_cyan().bold());
    println!("{}", format!("Backend: {}", config.api.config().base_url).bright_black());
    println!("{}", format!("Sessions: {}", config.data_dir.display()).bright_black());
    println!("{}", "Type '/help' for commands, '/quit' to exit\n".bright_black());

    let mut chat = config.chat_client()?;
    let mut rl = DefaultEditor::new()?;

    // Abort handle of the answer currently streaming, if any
    let current_abort: Arc<Mutex<Option<AbortHandle>>> = Arc::new(Mutex::new(None));
    let current_abort_for_handler = current_abort.clone();

    tokio::spawn(async move {
        loop {
            if tokio::signal::ctrl_c().await.is_ok() {
                if let Ok(guard) = current_abort_for_handler.lock() {
                    if let Some(ref handle) = *guard {
                        println!("\n{}", "^C - Stopping answer...".bright_yellow());
                        handle.abort();
                    }
                }
            }
        }
    });

    loop {
        let line = match rl.readline(&prompt(&chat)) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("{}", "Type '/quit' to exit".bright_black());
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{} Input error: {}", "❌".bright_red(), err);
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line);

        let (command, arg) = match line.split_once(' ') {
            Some((command, arg)) => (command, arg.trim()),
            None => (line, ""),
        };

        match command {
            "/quit" | "/exit" | "exit" | "quit" => break,
            "/help" => print_help(),
            "/units" => match all_units(config.api.as_ref()).await {
                Ok(units) => {
                    for unit in units {
                        println!(
                            "  {} {} {}",
                            format!("[{}]", unit.unit_id).bright_black(),
                            unit.unit_name,
                            format!("({})", unit.course_path).bright_black()
                        );
                    }
                }
                Err(e) => eprintln!("{} Failed to load units: {}", "❌".bright_red(), e),
            },
            "/tree" => {
                if let Err(e) = print_catalog(config.api.as_ref()).await {
                    eprintln!("{} Failed to load courses: {}", "❌".bright_red(), e);
                }
            }
            "/unit" => {
                let Ok(unit_id) = arg.parse::<u64>() else {
                    eprintln!("{} Usage: /unit <id>", "💡".bright_yellow());
                    continue;
                };
                match find_unit(config.api.as_ref(), unit_id).await {
                    Ok(Some(unit)) => {
                        println!(
                            "{} {} {}",
                            "Selected".bright_green(),
                            unit.unit_name.bold(),
                            format!("({})", unit.course_path).bright_black()
                        );
                        chat.select_unit(Some(unit));
                    }
                    Ok(None) => eprintln!("{} No unit with id {}", "❌".bright_red(), unit_id),
                    Err(e) => eprintln!("{} Failed to load units: {}", "❌".bright_red(), e),
                }
            }
            "/sessions" => print_sessions(chat.store()),
            "/open" => match resolve_session(chat.sessions(), arg) {
                Some(id) => {
                    if let Err(e) = chat.select_session(&id) {
                        eprintln!("{} {}", "❌".bright_red(), e);
                    } else if let Some(session) = chat.current_session() {
                        print_session(session);
                    }
                }
                None => eprintln!("{} No session matches '{}'", "❌".bright_red(), arg),
            },
            "/new" => {
                chat.new_session();
                println!("{}", "New conversation".bright_black());
            }
            "/delete" => match resolve_session(chat.sessions(), arg) {
                Some(id) => {
                    if let Err(e) = chat.delete_session(&id) {
                        eprintln!("{} {}", "❌".bright_red(), e);
                    }
                }
                None => eprintln!("{} No session matches '{}'", "❌".bright_red(), arg),
            },
            "/save" => {
                let answer_id = chat
                    .current_session()
                    .and_then(last_answer)
                    .map(|message| message.id.clone());
                match answer_id {
                    Some(id) => {
                        if let Err(e) = chat.toggle_saved(&id) {
                            eprintln!("{} {}", "❌".bright_red(), e);
                        }
                    }
                    None => eprintln!("{} No answer to save", "❌".bright_red()),
                }
            }
            "/saved" => print_saved(chat.store()),
            "/suggest" => print_suggestions(),
            _ if command.starts_with('/') => {
                eprintln!("{} Unknown command '{}', try /help", "❌".bright_red(), command);
            }
            _ => {
                if let Ok(mut guard) = current_abort.lock() {
                    *guard = Some(chat.abort_handle());
                }
                let mut renderer = AnswerRenderer::stdout();
                let result = chat.ask(line, &mut renderer).await;
                if let Ok(mut guard) = current_abort.lock() {
                    *guard = None;
                }
                // Validation failures already raised a notice
                if let Err(e @ (ChatError::Store(_) | ChatError::Stream(_))) = result {
                    eprintln!("{} {}", "❌".bright_red(), e);
                }
            }
        }

        print_notices(chat.drain_notices());
    }

    println!("{}", "Goodbye!".bright_cyan());
    Ok(())
}
