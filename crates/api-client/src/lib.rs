//! HTTP client for the Codex video analysis backend.

mod client;
mod error;
mod wire;

pub use client::{ApiClient, DEFAULT_REQUEST_TIMEOUT};
pub use error::{ApiClientError, Result};
pub use wire::{ChapterRecord, SearchHit, UploadTarget, VideoRecord};

/// Re-exported so callers can inspect [`ApiClientError::status`] without
/// depending on `reqwest` directly.
pub use reqwest::StatusCode;
