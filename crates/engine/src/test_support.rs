//! Scripted in-memory backend for engine tests.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use codex_api_client::{ApiClientError, StatusCode};
use tokio::sync::{Notify, watch};

use crate::backend::Backend;
use crate::error::{EngineError, Result};
use crate::library::{AssetId, MediaAsset};
use crate::search::SearchResult;
use crate::timeline::ChapterList;
use crate::upload::{SelectedFile, UploadSession, UploadTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UploadStep {
    Target,
    Transfer,
    Commit,
}

#[derive(Debug, Clone)]
enum Listing {
    Assets(Vec<MediaAsset>),
    Failure,
}

#[derive(Debug, Default)]
pub(crate) struct ScriptedBackend {
    listings: Mutex<VecDeque<Listing>>,
    list_delay: Mutex<Option<Duration>>,
    lists_in_flight: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub max_concurrent_lists: AtomicUsize,

    pub playback_urls: Mutex<HashMap<AssetId, String>>,
    pub url_requests: Mutex<Vec<Vec<AssetId>>>,

    pub search_results: Mutex<Vec<SearchResult>>,
    pub search_queries: Mutex<Vec<String>>,
    search_fails: AtomicBool,

    failing_step: Mutex<Option<UploadStep>>,
    transfer_delay: Mutex<Option<Duration>>,
    transfer_held: AtomicBool,
    transfer_gate: Notify,
    commit_held: AtomicBool,
    commit_gate: Notify,
    pub transfers: AtomicUsize,
    pub commits: Mutex<Vec<(String, String)>>,
    pub progress_watch: Mutex<Option<watch::Receiver<UploadSession>>>,
    pub progress_at_transfer_end: Mutex<Option<u8>>,
}

impl ScriptedBackend {
    /// Queues one listing. The last queued listing repeats once the queue is
    /// drained.
    pub fn push_listing(&self, assets: Vec<MediaAsset>) {
        lock(&self.listings).push_back(Listing::Assets(assets));
    }

    pub fn push_listing_failure(&self) {
        lock(&self.listings).push_back(Listing::Failure);
    }

    pub fn set_list_delay(&self, delay: Duration) {
        *lock(&self.list_delay) = Some(delay);
    }

    pub fn fail_search(&self) {
        self.search_fails.store(true, Ordering::SeqCst);
    }

    pub fn fail_at(&self, step: UploadStep) {
        *lock(&self.failing_step) = Some(step);
    }

    pub fn set_transfer_delay(&self, delay: Duration) {
        *lock(&self.transfer_delay) = Some(delay);
    }

    /// Makes transfers wait until [`ScriptedBackend::release_transfer`].
    pub fn hold_transfer(&self) {
        self.transfer_held.store(true, Ordering::SeqCst);
    }

    pub fn release_transfer(&self) {
        self.transfer_gate.notify_one();
    }

    /// Makes commits wait until [`ScriptedBackend::release_commit`].
    pub fn hold_commit(&self) {
        self.commit_held.store(true, Ordering::SeqCst);
    }

    pub fn release_commit(&self) {
        self.commit_gate.notify_one();
    }

    fn next_listing(&self) -> Option<Listing> {
        let mut listings = lock(&self.listings);
        if listings.len() > 1 {
            listings.pop_front()
        } else {
            listings.front().cloned()
        }
    }

    fn check_step(&self, step: UploadStep, context: &'static str) -> Result<()> {
        if *lock(&self.failing_step) == Some(step) {
            return Err(scripted_failure(context));
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn list_assets(&self) -> Result<Vec<MediaAsset>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let running = self.lists_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent_lists.fetch_max(running, Ordering::SeqCst);

        let delay = *lock(&self.list_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.lists_in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.next_listing() {
            Some(Listing::Assets(assets)) => Ok(assets),
            Some(Listing::Failure) => Err(scripted_failure("list videos")),
            None => Ok(Vec::new()),
        }
    }

    async fn resolve_playback_urls(&self, ids: &[AssetId]) -> Result<HashMap<AssetId, String>> {
        lock(&self.url_requests).push(ids.to_vec());
        let urls = lock(&self.playback_urls);
        Ok(ids
            .iter()
            .filter_map(|id| urls.get(id).map(|url| (*id, url.clone())))
            .collect())
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        lock(&self.search_queries).push(query.to_owned());
        if self.search_fails.load(Ordering::SeqCst) {
            return Err(scripted_failure("search"));
        }
        Ok(lock(&self.search_results).clone())
    }

    async fn request_upload_target(
        &self,
        filename: &str,
        _content_type: &str,
    ) -> Result<UploadTarget> {
        self.check_step(UploadStep::Target, "request upload target")?;
        Ok(UploadTarget {
            destination_url: format!("https://storage.test/put/{filename}"),
            storage_key: format!("uploads/{filename}"),
        })
    }

    async fn transfer(&self, _target: &UploadTarget, _file: &SelectedFile) -> Result<()> {
        self.transfers.fetch_add(1, Ordering::SeqCst);
        let delay = *lock(&self.transfer_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.transfer_held.load(Ordering::SeqCst) {
            self.transfer_gate.notified().await;
        }

        let progress = lock(&self.progress_watch)
            .as_ref()
            .map(|session| session.borrow().progress);
        if progress.is_some() {
            *lock(&self.progress_at_transfer_end) = progress;
        }
        self.check_step(UploadStep::Transfer, "upload file")
    }

    async fn commit_upload(&self, storage_key: &str, title: &str) -> Result<()> {
        if self.commit_held.load(Ordering::SeqCst) {
            self.commit_gate.notified().await;
        }
        self.check_step(UploadStep::Commit, "commit upload")?;
        lock(&self.commits).push((storage_key.to_owned(), title.to_owned()));
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().expect("scripted backend lock")
}

fn scripted_failure(context: &'static str) -> EngineError {
    EngineError::Api(ApiClientError::UnexpectedStatus {
        context,
        status: StatusCode::BAD_GATEWAY,
        body: "scripted failure".to_owned(),
    })
}

/// Asset created `created_secs` after the epoch, without chapters.
pub(crate) fn asset(id: AssetId, title: &str, created_secs: i64, processed: bool) -> MediaAsset {
    MediaAsset {
        id,
        title: title.to_owned(),
        created_at: Utc
            .timestamp_opt(created_secs, 0)
            .single()
            .expect("valid timestamp"),
        processed,
        chapters: ChapterList::default(),
        summary: String::new(),
        description: None,
        storage_key: format!("uploads/{id}.mp4"),
        playback_url: None,
    }
}

pub(crate) fn selected_file(name: &str) -> SelectedFile {
    SelectedFile {
        path: PathBuf::from("/media").join(name),
        name: name.to_owned(),
        size: 1_048_576,
        content_type: "video/mp4".to_owned(),
    }
}
