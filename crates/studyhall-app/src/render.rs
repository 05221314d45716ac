use chrono::Local;
use colored::Colorize;
use std::io::{self, Stdout, Write};

use studyhall_chat::{format_session_date, session_preview, Notice, NoticeLevel};
use studyhall_stream::{StreamObserver, StreamOutcome};
use studyhall_types::{ChatMessage, ChatSession, Role};

/// Prints an answer as it streams in
pub struct AnswerRenderer<W: Write = Stdout> {
    out: W,
    printed: usize,
}

impl AnswerRenderer<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> AnswerRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, printed: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> StreamObserver for AnswerRenderer<W> {
    fn on_open(&mut self) {
        let _ = write!(self.out, "{} ", "Assistant:".bright_blue().bold());
        let _ = self.out.flush();
    }

    fn on_update(&mut self, message: &ChatMessage) {
        // Content only grows, so everything past `printed` is new
        if let Some(delta) = message.content.get(self.printed..) {
            if !delta.is_empty() {
                let _ = write!(self.out, "{}", delta);
                let _ = self.out.flush();
            }
        }
        self.printed = message.content.len();
    }

    fn on_finalized(&mut self, message: Option<&ChatMessage>, outcome: &StreamOutcome) {
        let _ = writeln!(self.out);
        if let Some(message) = message {
            write_citations(&mut self.out, message);
        }
        if *outcome == StreamOutcome::Cancelled {
            let _ = writeln!(self.out, "{}", "(stopped)".bright_black());
        }
        let _ = self.out.flush();
    }
}

fn write_citations<W: Write>(out: &mut W, message: &ChatMessage) {
    let Some(citations) = message.citations.as_ref().filter(|c| !c.is_empty()) else {
        return;
    };
    let _ = writeln!(out, "{}", "Sources:".bright_black());
    for citation in citations {
        let _ = writeln!(out, "  {} {}", "•".bright_black(), citation.label().bright_black());
    }
}

pub fn print_notices(notices: Vec<Notice>) {
    for notice in notices {
        match notice.level {
            NoticeLevel::Success => println!("{} {}", "✓".bright_green(), notice.text.green()),
            NoticeLevel::Info => println!("{} {}", "ℹ".bright_blue(), notice.text),
            NoticeLevel::Error => eprintln!("{} {}", "✗".bright_red(), notice.text.red()),
        }
    }
}

/// One line per session: list number, relative date, unit, preview
pub fn session_line(index: usize, session: &ChatSession, active: bool) -> String {
    let today = Local::now().date_naive();
    let date = format_session_date(session.timestamp.with_timezone(&Local).date_naive(), today);
    let marker = if active { "*" } else { " " };
    format!(
        "{}{:>3}. {} · {} · {}",
        marker,
        index + 1,
        date,
        session.unit_name,
        session_preview(session)
    )
}

pub fn print_message(message: &ChatMessage) {
    let label = match message.role {
        Role::User => "You:".bright_green().bold(),
        Role::Assistant => "Assistant:".bright_blue().bold(),
    };
    let saved = if message.saved { " ★".yellow().to_string() } else { String::new() };
    println!("{}{} {}", label, saved, message.content);
    write_citations(&mut io::stdout(), message);
}

pub fn print_session(session: &ChatSession) {
    println!(
        "{} {}",
        session.unit_name.bright_cyan().bold(),
        format!("({})", session.course_path).bright_black()
    );
    for message in &session.messages {
        print_message(message);
    }
}
