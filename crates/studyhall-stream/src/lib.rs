//! # studyhall-stream
//!
//! Consumer for the streamed `/ask/stream` answer endpoint.
//!
//! - [`FrameParser`] turns raw body chunks into typed [`Frame`]s
//! - [`TokenAccumulator`] folds frames into message patches
//! - [`subscribe`] opens an [`AnswerSource`] on a background task and hands
//!   back a cancellable [`Subscription`]
//! - [`StreamController`] drives a subscription into the session store and
//!   finalizes the target message exactly once

pub mod accumulator;
pub mod controller;
pub mod error;
pub mod frame;
pub mod scripted;
pub mod source;
pub mod subscription;

pub use accumulator::TokenAccumulator;
pub use controller::{StreamController, StreamObserver, StreamOutcome, StreamPhase};
pub use error::StreamError;
pub use frame::{Frame, FrameParser, DATA_PREFIX, DONE_SENTINEL, MAX_LINE_BYTES};
pub use scripted::{ScriptStep, ScriptedSource};
pub use source::{AnswerSource, ByteStream};
pub use subscription::{subscribe, subscribe_with_token, AbortHandle, StreamEvent, Subscription};
