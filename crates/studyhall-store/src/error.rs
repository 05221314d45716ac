use std::path::PathBuf;
use thiserror::Error;

use studyhall_types::{MessageId, SessionId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("chat session not found: {0}")]
    SessionNotFound(SessionId),
    #[error("message {message_id} not found in session {session_id}")]
    MessageNotFound {
        session_id: SessionId,
        message_id: MessageId,
    },
    #[error("session {0} already has a streaming message")]
    StreamInProgress(SessionId),
    #[error("failed to access storage at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize sessions: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
