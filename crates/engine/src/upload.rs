use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::backend::Backend;
use crate::config::UploadConfig;
use crate::error::{EngineError, Result};
use crate::task::ScopedTask;

/// User-facing message for any failed upload. The cause is only logged.
pub const UPLOAD_FAILED_MESSAGE: &str = "Upload failed. Please try again.";

/// Lifecycle of one upload session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadPhase {
    #[default]
    Idle,
    Selected,
    Transferring,
    Committing,
    Succeeded,
    Failed,
}

impl UploadPhase {
    /// True while a transfer or commit is outstanding.
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Transferring | Self::Committing)
    }
}

impl Display for UploadPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Selected => "selected",
            Self::Transferring => "transferring",
            Self::Committing => "committing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.pad(name)
    }
}

/// Local file chosen for upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub content_type: String,
}

impl SelectedFile {
    /// Describes the regular file at `path`, guessing its content type from
    /// the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|source| EngineError::FileIo {
                context: "failed to read upload file metadata",
                path: path.to_path_buf(),
                source,
            })?;
        if !metadata.is_file() {
            return Err(EngineError::FileIo {
                context: "upload source is not a regular file",
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::InvalidInput),
            });
        }

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_owned();

        Ok(Self {
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
            content_type,
        })
    }
}

/// One-time destination for the raw bytes plus the key used to commit them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub destination_url: String,
    pub storage_key: String,
}

/// What a successful upload registered with the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedUpload {
    pub storage_key: String,
    pub title: String,
}

/// Observable state of the pipeline.
///
/// `session` changes whenever a new session begins (a selection, a clear or
/// the reset after success), so stale timers can recognise they are late.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadSession {
    pub session: u64,
    pub phase: UploadPhase,
    pub file: Option<SelectedFile>,
    /// 0..=100. While transferring this is simulated and capped below 100.
    pub progress: u8,
    pub error: Option<String>,
}

type CompletionCallback = Arc<dyn Fn(&CompletedUpload) + Send + Sync>;

/// Drives one file through target request, transfer and commit.
///
/// The transfer reports no real progress. While it is outstanding the pipeline
/// ramps `progress` on a timer as configured by [`UploadConfig`], never past
/// the ceiling; 100 is published only after the commit succeeds. The success
/// state is held for `success_display`, then the completion callback fires and
/// the session resets to idle unless a newer file was selected meanwhile.
pub struct UploadPipeline<B: ?Sized> {
    backend: Arc<B>,
    config: UploadConfig,
    state: Arc<watch::Sender<UploadSession>>,
    on_complete: Option<CompletionCallback>,
    /// One pending success display per finished session.
    success_timers: Mutex<Vec<ScopedTask>>,
}

impl<B> UploadPipeline<B>
where
    B: Backend + ?Sized,
{
    pub fn new(backend: Arc<B>, config: UploadConfig) -> Self {
        let (state, _) = watch::channel(UploadSession::default());
        Self {
            backend,
            config,
            state: Arc::new(state),
            on_complete: None,
            success_timers: Mutex::new(Vec::new()),
        }
    }

    /// Registers the callback fired once a successful session finishes its
    /// success display.
    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(&CompletedUpload) + Send + Sync + 'static,
    {
        self.on_complete = Some(Arc::new(callback));
        self
    }

    pub fn snapshot(&self) -> UploadSession {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> UploadPhase {
        self.state.borrow().phase
    }

    pub fn subscribe(&self) -> watch::Receiver<UploadSession> {
        self.state.subscribe()
    }

    /// Starts a new session for `file`.
    ///
    /// Rejected without any state change while a transfer or commit is in
    /// flight. Selecting again before starting replaces the selection.
    pub fn select_file(&self, file: SelectedFile) -> Result<()> {
        let name = file.name.clone();
        let size = file.size;
        let mut rejected = None;
        self.state.send_if_modified(|current| {
            if current.phase.is_in_flight() {
                rejected = Some(current.phase);
                return false;
            }
            *current = UploadSession {
                session: current.session + 1,
                phase: UploadPhase::Selected,
                file: Some(file),
                progress: 0,
                error: None,
            };
            true
        });

        if let Some(phase) = rejected {
            warn!(%phase, name = %name, "file selection rejected while upload is in flight");
            return Err(EngineError::UploadInFlight { phase });
        }
        info!(name = %name, size, "file selected");
        Ok(())
    }

    /// Drops the current selection. Only valid before the transfer starts.
    pub fn clear(&self) -> Result<()> {
        let mut rejected = None;
        self.state.send_if_modified(|current| {
            if current.phase != UploadPhase::Selected {
                rejected = Some(current.phase);
                return false;
            }
            *current = UploadSession {
                session: current.session + 1,
                ..UploadSession::default()
            };
            true
        });

        if let Some(phase) = rejected {
            warn!(%phase, "clear rejected");
            return Err(EngineError::ClearNotPermitted { phase });
        }
        info!("selection cleared");
        Ok(())
    }

    /// Runs the selected file through the backend.
    ///
    /// Any step failing moves the session to `Failed` with a generic message;
    /// the underlying error is logged and returned.
    pub async fn start(&self) -> Result<CompletedUpload> {
        let mut begun = None;
        let mut blocked = UploadPhase::Idle;
        self.state.send_if_modified(|current| {
            let file = match (current.phase, &current.file) {
                (UploadPhase::Selected, Some(file)) => file.clone(),
                _ => {
                    blocked = current.phase;
                    return false;
                }
            };
            begun = Some((current.session, file));
            current.phase = UploadPhase::Transferring;
            current.progress = 0;
            true
        });

        let Some((session, file)) = begun else {
            warn!(phase = %blocked, "upload start rejected");
            return Err(EngineError::NothingSelected { phase: blocked });
        };
        info!(session, name = %file.name, phase = %UploadPhase::Transferring, "upload started");

        let _abandoned = AbandonedUpload {
            state: &self.state,
            session,
        };
        match self.run_steps(session, &file).await {
            Ok(completed) => {
                self.succeed(session, &completed);
                Ok(completed)
            }
            Err(error) => {
                self.fail(session, &error);
                Err(error)
            }
        }
    }

    async fn run_steps(&self, session: u64, file: &SelectedFile) -> Result<CompletedUpload> {
        let target = self
            .backend
            .request_upload_target(&file.name, &file.content_type)
            .await?;
        self.transfer_with_progress(session, &target, file).await?;

        self.update(session, |current| current.phase = UploadPhase::Committing);
        info!(session, phase = %UploadPhase::Committing, "upload transferred");
        self.backend
            .commit_upload(&target.storage_key, &file.name)
            .await?;

        Ok(CompletedUpload {
            storage_key: target.storage_key,
            title: file.name.clone(),
        })
    }

    async fn transfer_with_progress(
        &self,
        session: u64,
        target: &UploadTarget,
        file: &SelectedFile,
    ) -> Result<()> {
        let tick = self.config.progress_tick;
        let mut ramp = tokio::time::interval_at(Instant::now() + tick, tick);
        ramp.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let transfer = self.backend.transfer(target, file);
        tokio::pin!(transfer);
        loop {
            tokio::select! {
                result = &mut transfer => return result,
                _ = ramp.tick() => self.bump_progress(session),
            }
        }
    }

    fn bump_progress(&self, session: u64) {
        let step = self.config.progress_step;
        let ceiling = self.config.progress_ceiling.min(99);
        self.state.send_if_modified(|current| {
            if current.session != session
                || current.phase != UploadPhase::Transferring
                || current.progress >= ceiling
            {
                return false;
            }
            current.progress = current.progress.saturating_add(step).min(ceiling);
            true
        });
    }

    fn update(&self, session: u64, apply: impl FnOnce(&mut UploadSession)) {
        self.state.send_if_modified(|current| {
            if current.session != session {
                return false;
            }
            apply(current);
            true
        });
    }

    fn succeed(&self, session: u64, completed: &CompletedUpload) {
        self.update(session, |current| {
            current.phase = UploadPhase::Succeeded;
            current.progress = 100;
            current.error = None;
        });
        info!(
            session,
            phase = %UploadPhase::Succeeded,
            storage_key = %completed.storage_key,
            title = %completed.title,
            "upload committed"
        );

        let state = Arc::clone(&self.state);
        let callback = self.on_complete.clone();
        let completed = completed.clone();
        let timer = ScopedTask::after(self.config.success_display, async move {
            state.send_if_modified(|current| {
                if current.session != session || current.phase != UploadPhase::Succeeded {
                    return false;
                }
                *current = UploadSession {
                    session: current.session + 1,
                    ..UploadSession::default()
                };
                true
            });
            if let Some(callback) = callback {
                callback(&completed);
            }
        });
        let mut timers = self
            .success_timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        timers.retain(|timer| !timer.is_finished());
        timers.push(timer);
    }

    fn fail(&self, session: u64, cause: &EngineError) {
        self.update(session, |current| {
            current.phase = UploadPhase::Failed;
            current.error = Some(UPLOAD_FAILED_MESSAGE.to_owned());
        });
        error!(session, phase = %UploadPhase::Failed, error = %cause, "upload failed");
    }
}

/// Fails the session if `start` is dropped while still in flight.
struct AbandonedUpload<'a> {
    state: &'a watch::Sender<UploadSession>,
    session: u64,
}

impl Drop for AbandonedUpload<'_> {
    fn drop(&mut self) {
        let session = self.session;
        let abandoned = self.state.send_if_modified(|current| {
            if current.session != session || !current.phase.is_in_flight() {
                return false;
            }
            current.phase = UploadPhase::Failed;
            current.error = Some(UPLOAD_FAILED_MESSAGE.to_owned());
            true
        });
        if abandoned {
            warn!(session, phase = %UploadPhase::Failed, "upload abandoned before completion");
        }
    }
}

impl<B: ?Sized> std::fmt::Debug for UploadPipeline<B> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadPipeline")
            .field("config", &self.config)
            .field("state", &*self.state.borrow())
            .field("on_complete", &self.on_complete.is_some())
            .finish_non_exhaustive()
    }
}
