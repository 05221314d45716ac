use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use studyhall_types::AskRequest;

use crate::source::{AnswerSource, ByteStream};

/// One step of a scripted response body
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Deliver these bytes as one chunk
    Chunk(Vec<u8>),
    /// Fail the body with a transport error
    Error(String),
    /// Never produce another chunk
    Hang,
}

/// In-memory [`AnswerSource`] that replays a fixed body and records the
/// requests it receives
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    steps: Vec<ScriptStep>,
    open_error: Option<String>,
    requests: Arc<Mutex<Vec<AskRequest>>>,
}

impl ScriptedSource {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    /// Each string becomes one body chunk
    pub fn from_chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(
            chunks
                .into_iter()
                .map(|c| ScriptStep::Chunk(c.as_ref().as_bytes().to_vec()))
                .collect(),
        )
    }

    /// One `data: {"token": ...}` chunk per token, followed by `[DONE]`
    pub fn answering(tokens: &[&str]) -> Self {
        let mut chunks: Vec<String> = tokens
            .iter()
            .map(|t| format!("data: {}\n\n", serde_json::json!({ "token": t })))
            .collect();
        chunks.push("data: [DONE]\n\n".to_string());
        Self::from_chunks(chunks)
    }

    /// A source whose request fails before any body is read
    pub fn failing_open(message: impl Into<String>) -> Self {
        Self {
            open_error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<AskRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl AnswerSource for ScriptedSource {
    async fn open(&self, request: &AskRequest) -> Result<ByteStream> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.clone());

        if let Some(message) = &self.open_error {
            anyhow::bail!("{}", message);
        }

        let steps = self.steps.clone();
        let body = async_stream::stream! {
            for step in steps {
                match step {
                    ScriptStep::Chunk(bytes) => yield Ok(bytes),
                    ScriptStep::Error(message) => {
                        yield Err(anyhow::anyhow!(message));
                        break;
                    }
                    ScriptStep::Hang => futures::future::pending::<()>().await,
                }
            }
        };
        Ok(Box::pin(body))
    }
}
