use thiserror::Error;

use studyhall_store::StoreError;
use studyhall_stream::StreamError;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Please select a unit")]
    NoUnitSelected,
    #[error("Please enter a question")]
    EmptyQuestion,
    #[error("An answer is still streaming in this session")]
    StreamInProgress,
    #[error("No chat session is open")]
    NoActiveSession,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Stream(#[from] StreamError),
}
