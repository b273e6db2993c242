use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use crate::upload::UploadPhase;

/// Result type used by the engine crate.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors produced by engine operations.
#[derive(Debug)]
pub enum EngineError {
    /// A file can only be picked while no upload is in flight.
    UploadInFlight {
        phase: UploadPhase,
    },
    /// `start` requires a selected file.
    NothingSelected {
        phase: UploadPhase,
    },
    /// `clear` is only permitted before the transfer starts.
    ClearNotPermitted {
        phase: UploadPhase,
    },
    ChapterNotFound {
        index: usize,
        len: usize,
    },
    FileIo {
        context: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    Api(codex_api_client::ApiClientError),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UploadInFlight { phase } => {
                write!(f, "an upload is already in progress ({phase})")
            }
            Self::NothingSelected { phase } => {
                write!(f, "no file is selected for upload ({phase})")
            }
            Self::ClearNotPermitted { phase } => {
                write!(f, "selection cannot be cleared while {phase}")
            }
            Self::ChapterNotFound { index, len } => {
                write!(f, "chapter {index} not found (asset has {len} chapters)")
            }
            Self::FileIo {
                context,
                path,
                source,
            } => write!(f, "{context}: {} ({source})", path.display()),
            Self::Api(err) => write!(f, "backend error: {err}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FileIo { source, .. } => Some(source),
            Self::Api(err) => Some(err),
            _ => None,
        }
    }
}

impl From<codex_api_client::ApiClientError> for EngineError {
    fn from(value: codex_api_client::ApiClientError) -> Self {
        Self::Api(value)
    }
}
