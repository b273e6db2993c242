use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::backend::Backend;
use crate::error::Result;
use crate::timeline::ChapterList;

/// Opaque identifier for library assets.
pub type AssetId = u64;

/// One uploaded video as known to the library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaAsset {
    pub id: AssetId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub processed: bool,
    pub chapters: ChapterList,
    pub summary: String,
    pub description: Option<String>,
    pub storage_key: String,
    /// Signed URL, resolved lazily with [`attach_playback_urls`].
    pub playback_url: Option<String>,
}

/// Orders assets newest first. Assets created at the same instant keep their
/// fetch order.
pub fn sort_newest_first(assets: &mut [MediaAsset]) {
    assets.sort_by(|left, right| right.created_at.cmp(&left.created_at));
}

/// Number of assets still waiting for the analysis pipeline.
pub fn processing_count(assets: &[MediaAsset]) -> usize {
    assets.iter().filter(|asset| !asset.processed).count()
}

/// Resolves playback URLs for `assets` with a single backend call.
///
/// Ids the backend leaves out, or maps to an empty string, stay `None`.
pub async fn attach_playback_urls<B>(backend: &B, assets: &mut [MediaAsset]) -> Result<()>
where
    B: Backend + ?Sized,
{
    if assets.is_empty() {
        return Ok(());
    }

    let ids: Vec<AssetId> = assets.iter().map(|asset| asset.id).collect();
    let mut urls = backend.resolve_playback_urls(&ids).await?;
    for asset in assets.iter_mut() {
        asset.playback_url = urls.remove(&asset.id).filter(|url| !url.is_empty());
    }

    debug!(
        requested = ids.len(),
        resolved = assets.iter().filter(|a| a.playback_url.is_some()).count(),
        "playback urls attached"
    );
    Ok(())
}
