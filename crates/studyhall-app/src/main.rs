use anyhow::Result;
use clap::{CommandFactory, Parser};
use std::io;

mod app;
mod cli;
mod render;

use app::{run_command, run_repl_mode, setup_from_cli};
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_filter = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    if let Some(Commands::Completions { shell }) = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "studyhall", &mut io::stdout());
        return Ok(());
    }

    let app_config = setup_from_cli(&cli)?;

    match cli.command {
        Some(command) => run_command(command, app_config).await,
        None => run_repl_mode(app_config).await,
    }
}
