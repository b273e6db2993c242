use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::error::Result;
use crate::library::{AssetId, MediaAsset, sort_newest_first};
use crate::notify::NotificationChannel;

/// Default period between library fetches.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// An asset observed moving from processing to processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReady {
    pub id: AssetId,
    pub title: String,
}

impl AssetReady {
    pub fn message(&self) -> String {
        format!("\"{}\" is ready for search.", self.title)
    }
}

/// Ids seen unprocessed on an earlier poll.
///
/// Completion is edge-triggered: an asset already processed the first time it
/// is seen produces no event, and a watched asset produces exactly one.
#[derive(Debug, Clone, Default)]
pub struct ProcessingWatchSet {
    ids: HashSet<AssetId>,
}

impl ProcessingWatchSet {
    pub fn contains(&self, id: AssetId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Records one observation and returns the completion edge, if any.
    pub fn observe(&mut self, asset: &MediaAsset) -> Option<AssetReady> {
        if !asset.processed {
            self.ids.insert(asset.id);
            return None;
        }
        self.ids.remove(&asset.id).then(|| AssetReady {
            id: asset.id,
            title: asset.title.clone(),
        })
    }

    /// Applies a full listing in order.
    pub fn reconcile(&mut self, assets: &[MediaAsset]) -> Vec<AssetReady> {
        assets
            .iter()
            .filter_map(|asset| self.observe(asset))
            .collect()
    }
}

/// Periodically refreshes the library and announces finished processing.
///
/// Inactive until [`LibraryPoller::activate`] hands it to a background task.
pub struct LibraryPoller<B: ?Sized> {
    backend: Arc<B>,
    notifications: Arc<NotificationChannel>,
    watch_set: ProcessingWatchSet,
    interval: Duration,
}

impl<B> LibraryPoller<B>
where
    B: Backend + ?Sized + 'static,
{
    pub fn new(
        backend: Arc<B>,
        notifications: Arc<NotificationChannel>,
        interval: Duration,
    ) -> Self {
        Self {
            backend,
            notifications,
            watch_set: ProcessingWatchSet::default(),
            interval,
        }
    }

    pub fn watch_set(&self) -> &ProcessingWatchSet {
        &self.watch_set
    }

    /// Fetches the library once, newest first, and notifies for every asset
    /// that finished processing since the previous tick.
    pub async fn tick(&mut self) -> Result<Vec<MediaAsset>> {
        let mut assets = self.backend.list_assets().await?;
        sort_newest_first(&mut assets);

        for ready in self.watch_set.reconcile(&assets) {
            info!(asset_id = ready.id, title = %ready.title, "asset finished processing");
            self.notifications.show(ready.message());
        }
        debug!(
            assets = assets.len(),
            processing = self.watch_set.len(),
            "library refreshed"
        );
        Ok(assets)
    }

    /// Starts polling on a background task: one tick immediately, then one per
    /// interval. Must be called inside a Tokio runtime.
    pub fn activate(self) -> ActivePoller {
        let (library_tx, library_rx) = watch::channel(Vec::new());
        let (refresh_tx, refresh_rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(library_tx, refresh_rx, cancel.clone()));

        ActivePoller {
            library: library_rx,
            refresh: refresh_tx,
            cancel,
            task: Some(task),
        }
    }

    async fn run(
        mut self,
        library: watch::Sender<Vec<MediaAsset>>,
        mut refresh: mpsc::Receiver<()>,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_ms = self.interval.as_millis() as u64, "library poller activated");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
                Some(()) = refresh.recv() => {
                    debug!("library refresh requested");
                    ticker.reset();
                }
            }

            let outcome = tokio::select! {
                _ = cancel.cancelled() => break,
                outcome = self.tick() => outcome,
            };
            match outcome {
                Ok(assets) => {
                    library.send_replace(assets);
                }
                Err(error) => warn!(%error, "library poll failed; waiting for next tick"),
            }
        }

        info!("library poller deactivated");
    }
}

/// Handle to a running poller. Dropping it stops polling.
#[derive(Debug)]
pub struct ActivePoller {
    library: watch::Receiver<Vec<MediaAsset>>,
    refresh: mpsc::Sender<()>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ActivePoller {
    /// Latest library listing, newest first. Empty until the first successful
    /// tick.
    pub fn library(&self) -> watch::Receiver<Vec<MediaAsset>> {
        self.library.clone()
    }

    /// Handle that can request an out-of-band tick from anywhere.
    pub fn refresher(&self) -> LibraryRefresh {
        LibraryRefresh {
            sender: self.refresh.clone(),
        }
    }

    /// Requests an immediate tick. See [`LibraryRefresh::request`].
    pub fn request_refresh(&self) -> bool {
        self.refresher().request()
    }

    /// Stops polling and waits for an in-flight tick to be abandoned.
    pub async fn deactivate(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(error) = task.await {
                warn!(%error, "library poller task ended abnormally");
            }
        }
    }
}

impl Drop for ActivePoller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Cloneable trigger for an immediate library refresh.
#[derive(Debug, Clone)]
pub struct LibraryRefresh {
    sender: mpsc::Sender<()>,
}

impl LibraryRefresh {
    /// Queues a refresh; repeated requests before it runs collapse into one.
    /// Returns `false` once the poller is gone.
    pub fn request(&self) -> bool {
        match self.sender.try_send(()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(())) => true,
            Err(mpsc::error::TrySendError::Closed(())) => false,
        }
    }
}
