use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use std::time::Duration;

use studyhall_logging::{log_request, log_request_to_file, log_response};
use studyhall_stream::{AnswerSource, ByteStream};
use studyhall_types::{AskRequest, CatalogNode};

use crate::config::ApiConfig;
use crate::error::ApiError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Read-only view of the Course → Year → Semester → Unit hierarchy
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn courses(&self) -> Result<Vec<CatalogNode>>;
    async fn years(&self, course_id: u64) -> Result<Vec<CatalogNode>>;
    async fn semesters(&self, year_id: u64) -> Result<Vec<CatalogNode>>;
    async fn units(&self, semester_id: u64) -> Result<Vec<CatalogNode>>;
}

/// HTTP client for the course platform backend
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ApiConfig,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    pub fn ask_stream_url(&self) -> String {
        self.url("/ask/stream")
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;

        let status = response.status();
        let body = response.text().await?;
        log_response(&status, &body, self.config.verbose);

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        serde_json::from_str(&body).with_context(|| format!("Unexpected response from {}", url))
    }
}

#[async_trait]
impl Catalog for ApiClient {
    async fn courses(&self) -> Result<Vec<CatalogNode>> {
        self.get_json("/courses/").await
    }

    async fn years(&self, course_id: u64) -> Result<Vec<CatalogNode>> {
        self.get_json(&format!("/courses/{}/years/", course_id)).await
    }

    async fn semesters(&self, year_id: u64) -> Result<Vec<CatalogNode>> {
        self.get_json(&format!("/years/{}/semesters/", year_id)).await
    }

    async fn units(&self, semester_id: u64) -> Result<Vec<CatalogNode>> {
        self.get_json(&format!("/semesters/{}/units/", semester_id)).await
    }
}

#[async_trait]
impl AnswerSource for ApiClient {
    async fn open(&self, request: &AskRequest) -> Result<ByteStream> {
        let url = self.ask_stream_url();

        log_request(&url, request, self.config.verbose);
        if self.config.log_requests {
            if let Err(e) = log_request_to_file(&url, request) {
                log::warn!("Request log not written: {:#}", e);
            }
        }

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(request)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            log_response(&status, &body, self.config.verbose);
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(anyhow::Error::from));
        Ok(Box::pin(body))
    }
}
