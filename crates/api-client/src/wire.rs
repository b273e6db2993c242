use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One video row as returned by `GET /videos/`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VideoRecord {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub s3_key: Option<String>,
    #[serde(default)]
    pub processed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub chapters: Option<Vec<ChapterRecord>>,
    #[serde(default)]
    pub transcript_summary: Option<String>,
}

/// Chapter marker emitted by the analysis pipeline. `timestamp` is `[HH:]MM:SS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRecord {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub label: String,
}

/// One ranked hit returned by `POST /search`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchHit {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub chapters: Option<Vec<ChapterRecord>>,
    /// Deep-link offset; `"00:00"` means the hit has no specific moment.
    #[serde(default)]
    pub start_at: Option<String>,
    #[serde(default)]
    pub playback_url: Option<String>,
}

/// One-time upload destination handed out by `POST /videos/presigned-url`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadTarget {
    pub url: String,
    pub key: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct PresignRequest<'a> {
    pub filename: &'a str,
    pub content_type: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CommitRequest<'a> {
    pub key: &'a str,
    pub title: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct PlaybackUrlsRequest<'a> {
    pub ids: &'a [u64],
}

#[derive(Debug, Serialize)]
pub(crate) struct SearchRequest<'a> {
    pub query: &'a str,
}
