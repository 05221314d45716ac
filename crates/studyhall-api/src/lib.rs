//! # studyhall-api
//!
//! HTTP client for the course platform backend.
//!
//! - `POST /ask/stream` as an [`studyhall_stream::AnswerSource`]
//! - read-only catalog listing (`/courses/`, `/courses/{id}/years/`,
//!   `/years/{id}/semesters/`, `/semesters/{id}/units/`) behind [`Catalog`]

pub mod client;
pub mod config;
pub mod error;

pub use client::{ApiClient, Catalog};
pub use config::{normalize_base_url, ApiConfig, API_URL_ENV, DEFAULT_API_URL};
pub use error::ApiError;
