use std::time::Duration;

use crate::notify::DEFAULT_NOTIFICATION_TTL;
use crate::poller::DEFAULT_POLL_INTERVAL;

/// Tunables for one engine instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Period of the library poller.
    pub poll_interval: Duration,
    /// How long a notification stays visible.
    pub notification_ttl: Duration,
    pub upload: UploadConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            notification_ttl: DEFAULT_NOTIFICATION_TTL,
            upload: UploadConfig::default(),
        }
    }
}

/// Pacing of the upload pipeline's simulated progress.
///
/// The transfer does not report real progress; while it runs the pipeline
/// ramps `progress` by `progress_step` every `progress_tick`, never past
/// `progress_ceiling`. Only a committed upload reaches 100.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    pub progress_tick: Duration,
    pub progress_step: u8,
    pub progress_ceiling: u8,
    /// Time spent in the success state before the pipeline resets to idle.
    pub success_display: Duration,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            progress_tick: Duration::from_millis(500),
            progress_step: 5,
            progress_ceiling: 90,
            success_display: Duration::from_secs(3),
        }
    }
}
