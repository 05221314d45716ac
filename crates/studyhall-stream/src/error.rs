use thiserror::Error;

use studyhall_store::StoreError;
use studyhall_types::SessionId;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("a stream is already active for session {0}")]
    AlreadyStreaming(SessionId),
    #[error("no stream has been started")]
    NotStreaming,
    #[error(transparent)]
    Store(#[from] StoreError),
}
