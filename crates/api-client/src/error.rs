use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use reqwest::StatusCode;

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, ApiClientError>;

/// Errors produced while talking to the Codex backend or its storage target.
#[derive(Debug)]
pub enum ApiClientError {
    InvalidBaseUrl(String),
    Http {
        context: &'static str,
        source: reqwest::Error,
    },
    UnexpectedStatus {
        context: &'static str,
        status: StatusCode,
        body: String,
    },
    Io {
        context: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ApiClientError {
    /// Returns the HTTP status when the backend answered with a non-2xx code.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            Self::Http { source, .. } => source.status(),
            _ => None,
        }
    }
}

impl Display for ApiClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBaseUrl(url) => write!(f, "invalid base url: {url}"),
            Self::Http { context, source } => write!(f, "{context}: http error: {source}"),
            Self::UnexpectedStatus {
                context,
                status,
                body,
            } => {
                write!(f, "{context}: unexpected status {status}: {}", body.trim())
            }
            Self::Io {
                context,
                path,
                source,
            } => write!(f, "{context}: {} ({source})", path.display()),
        }
    }
}

impl std::error::Error for ApiClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
