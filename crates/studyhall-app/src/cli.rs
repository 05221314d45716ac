use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// CLI arguments for studyhall
#[derive(Parser)]
#[command(name = "studyhall")]
#[command(about = "Study Hall - ask questions about your course material")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Base URL of the study assistant backend
    #[arg(long, value_name = "URL", env = "STUDYHALL_API_URL", default_value = "http://localhost:8000")]
    pub api_url: String,

    /// Directory holding saved chat sessions (default: ~/.studyhall)
    #[arg(long, value_name = "DIR", env = "STUDYHALL_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose debug output (shows HTTP requests, responses and stream chunks)
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Write every ask request to ~/.studyhall/logs
    #[arg(long)]
    pub log_requests: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask a single question and stream the answer
    Ask {
        /// Unit the question is about
        #[arg(short = 'u', long)]
        unit_id: u64,
        /// The question; multiple words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Inspect or delete saved chat sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Print the course catalog with unit ids
    Courses,
    /// Print starter questions
    Suggest,
    /// Print every saved message
    Saved,
    /// Generate shell completions
    Completions {
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// List sessions, newest first
    List,
    /// Print the messages of a session
    Show {
        /// List number or id prefix
        session: String,
    },
    /// Delete a session
    Delete {
        /// List number or id prefix
        session: String,
    },
}
