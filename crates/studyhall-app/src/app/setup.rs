use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use studyhall_api::{ApiClient, ApiConfig};
use studyhall_chat::ChatClient;
use studyhall_store::{FileStorage, SessionStore};
use studyhall_stream::AnswerSource;

use crate::cli::Cli;

/// Application configuration derived from CLI arguments and environment
pub struct AppConfig {
    pub api: Arc<ApiClient>,
    pub data_dir: PathBuf,
    pub verbose: bool,
}

impl AppConfig {
    pub fn open_store(&self) -> Result<SessionStore> {
        let storage = FileStorage::new(&self.data_dir)
            .with_context(|| format!("Failed to open data directory {}", self.data_dir.display()))?;
        SessionStore::open(storage).context("Failed to load chat sessions")
    }

    pub fn chat_client(&self) -> Result<ChatClient> {
        let source: Arc<dyn AnswerSource> = self.api.clone();
        Ok(ChatClient::new(self.open_store()?, source).with_verbose(self.verbose))
    }
}

/// Set up application configuration from CLI arguments
pub fn setup_from_cli(cli: &Cli) -> Result<AppConfig> {
    let mut api_config = ApiConfig::new(&cli.api_url)
        .with_context(|| format!("Invalid --api-url '{}'", cli.api_url))?;
    api_config.verbose = cli.verbose;
    api_config.log_requests = cli.log_requests;

    let data_dir = match &cli.data_dir {
        Some(dir) => dir.clone(),
        None => studyhall_logging::get_app_dir()?,
    };

    log::debug!("api: {}, data dir: {}", api_config.base_url, data_dir.display());

    Ok(AppConfig {
        api: Arc::new(ApiClient::new(api_config)?),
        data_dir,
        verbose: cli.verbose,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_setup_uses_data_dir_and_normalized_url() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("sessions");
        let cli = Cli::try_parse_from([
            "studyhall",
            "--api-url",
            "http://localhost:8000/",
            "--data-dir",
            data_dir.to_str().unwrap(),
        ])
        .unwrap();

        let config = setup_from_cli(&cli).unwrap();
        assert_eq!(config.api.config().base_url, "http://localhost:8000");

        let store = config.open_store().unwrap();
        assert!(store.sessions().is_empty());
        assert!(data_dir.is_dir());
    }

    #[test]
    fn test_setup_rejects_bad_url() {
        let cli = Cli::try_parse_from(["studyhall", "--api-url", "localhost:8000"]).unwrap();
        assert!(setup_from_cli(&cli).is_err());
    }
}
