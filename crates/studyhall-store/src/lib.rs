//! Session and message store for studyhall
//!
//! Sessions live in memory and are written through a [`Storage`] backend
//! after every mutation, under the fixed key [`SESSIONS_KEY`].

pub mod error;
pub mod storage;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use store::{SessionStore, SESSIONS_KEY};
