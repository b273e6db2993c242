use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::error::Result;
use crate::library::AssetId;
use crate::time::TimeCode;
use crate::timeline::ChapterList;

/// One ranked hit for a natural-language query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    /// 0-based position in the backend's ranking.
    pub rank: usize,
    pub asset_id: AssetId,
    pub title: String,
    pub description: Option<String>,
    pub chapters: ChapterList,
    /// Moment the query matched, or `None` when the hit carries no offset.
    pub deep_link: Option<TimeCode>,
    pub playback_url: Option<String>,
}

impl SearchResult {
    /// The top-ranked hit is highlighted only when it points at a moment.
    pub fn is_best_match(&self) -> bool {
        self.rank == 0 && self.deep_link.is_some()
    }
}

/// Runs a search, skipping the backend entirely for blank queries.
pub async fn run_search<B>(backend: &B, query: &str) -> Result<Vec<SearchResult>>
where
    B: Backend + ?Sized,
{
    let query = query.trim();
    if query.is_empty() {
        debug!("blank search query ignored");
        return Ok(Vec::new());
    }

    match backend.search(query).await {
        Ok(results) => {
            info!(query, hits = results.len(), "search finished");
            Ok(results)
        }
        Err(error) => {
            warn!(query, %error, "search failed");
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SearchResult, run_search};
    use crate::test_support::ScriptedBackend;
    use crate::time::TimeCode;
    use crate::timeline::ChapterList;

    fn hit(rank: usize, deep_link: Option<TimeCode>) -> SearchResult {
        SearchResult {
            rank,
            asset_id: rank as u64 + 1,
            title: format!("Hit {rank}"),
            description: None,
            chapters: ChapterList::default(),
            deep_link,
            playback_url: None,
        }
    }

    #[test]
    fn only_first_hit_with_offset_is_best_match() {
        assert!(hit(0, Some(TimeCode::from_secs(90))).is_best_match());
        assert!(!hit(0, None).is_best_match());
        assert!(!hit(1, Some(TimeCode::from_secs(90))).is_best_match());
    }

    #[tokio::test]
    async fn blank_query_does_not_reach_backend() {
        let backend = ScriptedBackend::default();

        let results = run_search(&backend, "   ").await.expect("search");

        assert!(results.is_empty());
        assert!(backend.search_queries.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn query_is_trimmed_and_results_pass_through() {
        let backend = ScriptedBackend::default();
        *backend.search_results.lock().expect("lock") =
            vec![hit(0, Some(TimeCode::from_secs(42))), hit(1, None)];

        let results = run_search(&backend, "  gradient descent \n")
            .await
            .expect("search");

        assert_eq!(results.len(), 2);
        assert!(results[0].is_best_match());
        assert_eq!(
            *backend.search_queries.lock().expect("lock"),
            vec!["gradient descent".to_owned()]
        );
    }

    #[tokio::test]
    async fn backend_failure_is_reported() {
        let backend = ScriptedBackend::default();
        backend.fail_search();

        assert!(run_search(&backend, "anything").await.is_err());
    }
}
