//! # studyhall-chat
//!
//! The chat facade used by the CLI: unit selection, session navigation,
//! asking questions with a live streamed answer, and user notices.

pub mod catalog;
pub mod client;
pub mod error;
pub mod notice;
pub mod sidebar;

pub use catalog::{all_units, find_unit};
pub use client::{AskOutcome, ChatClient};
pub use error::ChatError;
pub use notice::{Notice, NoticeLevel};
pub use sidebar::{format_session_date, session_preview, QUESTION_SUGGESTIONS};
