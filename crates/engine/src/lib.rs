//! UI-agnostic core of the Codex video library: timecodes, chapter timelines,
//! playback sync, uploads, library polling and notifications.

pub mod backend;
pub mod config;
pub mod error;
pub mod library;
pub mod notes;
pub mod notify;
pub mod playback;
pub mod poller;
pub mod search;
pub mod task;
pub mod time;
pub mod timeline;
pub mod upload;

#[cfg(test)]
mod test_support;

pub use backend::{Backend, HttpBackend};
pub use config::{EngineConfig, UploadConfig};
pub use error::{EngineError, Result};
pub use library::{AssetId, MediaAsset, attach_playback_urls, processing_count, sort_newest_first};
pub use notes::NotesDraft;
pub use notify::{DEFAULT_NOTIFICATION_TTL, Notification, NotificationChannel};
pub use playback::{PlaybackSync, Player, parse_deep_link};
pub use poller::{
    ActivePoller, AssetReady, DEFAULT_POLL_INTERVAL, LibraryPoller, LibraryRefresh,
    ProcessingWatchSet,
};
pub use search::{SearchResult, run_search};
pub use task::ScopedTask;
pub use time::TimeCode;
pub use timeline::{Chapter, ChapterList};
pub use upload::{
    CompletedUpload, SelectedFile, UPLOAD_FAILED_MESSAGE, UploadPhase, UploadPipeline,
    UploadSession, UploadTarget,
};
