use std::collections::HashMap;

use async_trait::async_trait;
use codex_api_client::{ApiClient, ChapterRecord, SearchHit, VideoRecord};
use tracing::debug;

use crate::error::Result;
use crate::library::{AssetId, MediaAsset};
use crate::playback::parse_deep_link;
use crate::search::SearchResult;
use crate::time::TimeCode;
use crate::timeline::{Chapter, ChapterList};
use crate::upload::{SelectedFile, UploadTarget};

/// Remote operations required by the engine.
///
/// Every call may suspend; implementations must be shareable across tasks.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Lists every asset in the library, in backend order.
    async fn list_assets(&self) -> Result<Vec<MediaAsset>>;

    /// Resolves signed playback URLs. Ids the backend cannot resolve may be
    /// missing from the map.
    async fn resolve_playback_urls(&self, ids: &[AssetId]) -> Result<HashMap<AssetId, String>>;

    /// Ranked hits for an already trimmed, non-empty query.
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;

    /// Issues a one-time destination for `filename`.
    async fn request_upload_target(&self, filename: &str, content_type: &str)
    -> Result<UploadTarget>;

    /// Sends the file's bytes to `target`.
    async fn transfer(&self, target: &UploadTarget, file: &SelectedFile) -> Result<()>;

    /// Registers a transferred object as a new library asset.
    async fn commit_upload(&self, storage_key: &str, title: &str) -> Result<()>;
}

/// HTTP-backed backend used by production wiring.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: ApiClient,
}

impl HttpBackend {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_assets(&self) -> Result<Vec<MediaAsset>> {
        let records = self.client.list_videos().await?;
        Ok(records.into_iter().map(asset_from_record).collect())
    }

    async fn resolve_playback_urls(&self, ids: &[AssetId]) -> Result<HashMap<AssetId, String>> {
        Ok(self.client.playback_urls(ids).await?)
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let hits = self.client.search(query).await?;
        Ok(hits
            .into_iter()
            .enumerate()
            .map(|(rank, hit)| result_from_hit(rank, hit))
            .collect())
    }

    async fn request_upload_target(
        &self,
        filename: &str,
        content_type: &str,
    ) -> Result<UploadTarget> {
        let target = self.client.presign_upload(filename, content_type).await?;
        Ok(UploadTarget {
            destination_url: target.url,
            storage_key: target.key,
        })
    }

    async fn transfer(&self, target: &UploadTarget, file: &SelectedFile) -> Result<()> {
        let sent = self
            .client
            .put_file(&target.destination_url, &file.path, &file.content_type)
            .await?;
        debug!(bytes = sent, storage_key = %target.storage_key, "file transferred");
        Ok(())
    }

    async fn commit_upload(&self, storage_key: &str, title: &str) -> Result<()> {
        Ok(self.client.commit_upload(storage_key, title).await?)
    }
}

fn asset_from_record(record: VideoRecord) -> MediaAsset {
    MediaAsset {
        id: record.id,
        title: record.title,
        created_at: record.created_at,
        processed: record.processed,
        chapters: chapters_from_records(record.chapters),
        summary: record.transcript_summary.unwrap_or_default(),
        description: record.description,
        storage_key: record.s3_key.unwrap_or_default(),
        playback_url: None,
    }
}

fn result_from_hit(rank: usize, hit: SearchHit) -> SearchResult {
    SearchResult {
        rank,
        asset_id: hit.id,
        title: hit.title,
        description: hit.description,
        chapters: chapters_from_records(hit.chapters),
        deep_link: hit.start_at.as_deref().and_then(parse_deep_link),
        playback_url: hit.playback_url.filter(|url| !url.is_empty()),
    }
}

fn chapters_from_records(records: Option<Vec<ChapterRecord>>) -> ChapterList {
    ChapterList::from_unsorted(
        records
            .unwrap_or_default()
            .into_iter()
            .map(|record| Chapter::new(TimeCode::parse(&record.timestamp), record.label))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use codex_api_client::{ChapterRecord, SearchHit, VideoRecord};

    use super::{asset_from_record, result_from_hit};
    use crate::time::TimeCode;

    fn chapter(timestamp: &str, label: &str) -> ChapterRecord {
        ChapterRecord {
            timestamp: timestamp.to_owned(),
            label: label.to_owned(),
        }
    }

    #[test]
    fn video_record_maps_to_sorted_asset() {
        let record = VideoRecord {
            id: 7,
            title: "Lecture 3".to_owned(),
            description: None,
            s3_key: Some("uploads/lecture-3.mp4".to_owned()),
            processed: true,
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            chapters: Some(vec![
                chapter("02:00", "Outro"),
                chapter("00:10", "Intro"),
                chapter("bogus", "Cold open"),
            ]),
            transcript_summary: None,
        };

        let asset = asset_from_record(record);

        let labels: Vec<_> = asset.chapters.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, ["Cold open", "Intro", "Outro"]);
        assert_eq!(asset.chapters.as_slice()[2].timestamp, TimeCode::from_secs(120));
        assert_eq!(asset.summary, "");
        assert_eq!(asset.storage_key, "uploads/lecture-3.mp4");
        assert_eq!(asset.playback_url, None);
    }

    #[test]
    fn search_hit_maps_deep_link_sentinel_to_none() {
        let hit = SearchHit {
            id: 3,
            title: "Lecture 1".to_owned(),
            description: Some("Optimisation".to_owned()),
            chapters: None,
            start_at: Some("00:00".to_owned()),
            playback_url: Some(String::new()),
        };

        let result = result_from_hit(0, hit);

        assert_eq!(result.deep_link, None);
        assert_eq!(result.playback_url, None);
        assert!(result.chapters.is_empty());
        assert!(!result.is_best_match());
    }

    #[test]
    fn search_hit_with_offset_is_best_match_at_rank_zero() {
        let hit = SearchHit {
            id: 3,
            title: "Lecture 1".to_owned(),
            description: None,
            chapters: Some(vec![chapter("00:00", "Start")]),
            start_at: Some("01:30".to_owned()),
            playback_url: Some("https://cdn.test/3.mp4".to_owned()),
        };

        let result = result_from_hit(0, hit);

        assert_eq!(result.deep_link, Some(TimeCode::from_secs(90)));
        assert!(result.is_best_match());
    }
}
