use chrono::{Datelike, NaiveDate};

use studyhall_types::ChatSession;

const PREVIEW_CHARS: usize = 60;

/// Starter questions shown before a conversation begins
pub const QUESTION_SUGGESTIONS: [&str; 8] = [
    "Can you summarize the key concepts in this unit?",
    "What are the main topics covered in this material?",
    "Explain the relationship between the concepts in this unit",
    "What are some practical applications of these concepts?",
    "How does this unit connect to other parts of the course?",
    "What are the most important points to remember?",
    "Can you provide examples to illustrate these concepts?",
    "What are common misconceptions about this topic?",
];

/// First characters of the last message, or a placeholder for empty sessions
pub fn session_preview(session: &ChatSession) -> String {
    match session.last_message() {
        None => "New conversation".to_string(),
        Some(message) => {
            let preview: String = message.content.chars().take(PREVIEW_CHARS).collect();
            if message.content.chars().count() > PREVIEW_CHARS {
                format!("{}...", preview)
            } else {
                preview
            }
        }
    }
}

/// "Today", "Yesterday", or a short month/day label like "May 29"
pub fn format_session_date(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "Today".to_string()
    } else if today.pred_opt() == Some(date) {
        "Yesterday".to_string()
    } else {
        format!("{} {}", date.format("%b"), date.day())
    }
}
