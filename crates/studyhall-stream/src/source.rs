use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use studyhall_types::AskRequest;

/// Raw response body, chunk by chunk
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// Something that can answer a question with a streamed `data: ` body.
///
/// The HTTP client implements this against `/ask/stream`; tests use
/// [`crate::ScriptedSource`].
#[async_trait]
pub trait AnswerSource: Send + Sync {
    /// Open the answer stream. Errors here mean the request never started
    /// (connection refused, non-2xx status).
    async fn open(&self, request: &AskRequest) -> Result<ByteStream>;
}
