use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::error::{ApiClientError, Result};
use crate::wire::{
    CommitRequest, PlaybackUrlsRequest, PresignRequest, SearchHit, SearchRequest, UploadTarget,
    VideoRecord,
};

/// Timeout applied to JSON calls against the backend.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Async client for the Codex backend endpoints.
///
/// Raw uploads go straight to the presigned storage URL and are only bounded by
/// the connect timeout, since large videos take longer than any JSON call.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
    auth_token: Option<String>,
    request_timeout: Duration,
}

impl ApiClient {
    /// Creates a client targeting `base_url`.
    ///
    /// # Example
    /// ```
    /// use codex_api_client::ApiClient;
    ///
    /// let client = ApiClient::new("http://127.0.0.1:8000/", None).expect("valid url");
    /// assert_eq!(client.base_url(), "http://127.0.0.1:8000");
    /// ```
    pub fn new(base_url: impl Into<String>, auth_token: Option<String>) -> Result<Self> {
        Self::with_request_timeout(base_url, auth_token, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a client with a custom timeout for JSON calls.
    pub fn with_request_timeout(
        base_url: impl Into<String>,
        auth_token: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiClientError::InvalidBaseUrl(base_url));
        }

        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|source| ApiClientError::Http {
                context: "build http client",
                source,
            })?;

        Ok(Self {
            base_url,
            http,
            auth_token,
            request_timeout,
        })
    }

    /// Returns the base URL configured for this client.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches the full video list from `GET /videos/`.
    pub async fn list_videos(&self) -> Result<Vec<VideoRecord>> {
        let request = self.http.get(self.endpoint("videos/"));
        self.fetch_json("list videos", request).await
    }

    /// Resolves signed playback URLs for `ids` via `POST /videos/urls`.
    pub async fn playback_urls(&self, ids: &[u64]) -> Result<HashMap<u64, String>> {
        let request = self
            .http
            .post(self.endpoint("videos/urls"))
            .json(&PlaybackUrlsRequest { ids });
        self.fetch_json("resolve playback urls", request).await
    }

    /// Runs a semantic search via `POST /search`.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let request = self
            .http
            .post(self.endpoint("search"))
            .json(&SearchRequest { query });
        self.fetch_json("search", request).await
    }

    /// Requests a one-time upload destination via `POST /videos/presigned-url`.
    pub async fn presign_upload(&self, filename: &str, content_type: &str) -> Result<UploadTarget> {
        let request = self
            .http
            .post(self.endpoint("videos/presigned-url"))
            .json(&PresignRequest {
                filename,
                content_type,
            });
        self.fetch_json("request upload target", request).await
    }

    /// Streams the file at `path` to a presigned `url` with a `PUT`.
    ///
    /// Returns the number of bytes announced in `Content-Length`.
    pub async fn put_file(&self, url: &str, path: &Path, content_type: &str) -> Result<u64> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|source| ApiClientError::Io {
                context: "open upload file",
                path: path.to_path_buf(),
                source,
            })?;
        let len = file
            .metadata()
            .await
            .map_err(|source| ApiClientError::Io {
                context: "read upload file metadata",
                path: path.to_path_buf(),
                source,
            })?
            .len();

        debug!(len, content_type, "streaming upload body");
        let response = self
            .http
            .put(url)
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, len)
            .body(Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await
            .map_err(|source| ApiClientError::Http {
                context: "transfer upload body",
                source,
            })?;
        Self::ensure_success("transfer upload body", response).await?;

        Ok(len)
    }

    /// Tells the backend that `key` is fully uploaded via `POST /videos/commit`.
    pub async fn commit_upload(&self, key: &str, title: &str) -> Result<()> {
        let request = self
            .http
            .post(self.endpoint("videos/commit"))
            .json(&CommitRequest { key, title })
            .timeout(self.request_timeout);
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|source| ApiClientError::Http {
                context: "commit upload",
                source,
            })?;
        Self::ensure_success("commit upload", response).await?;
        Ok(())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn fetch_json<T>(&self, context: &'static str, request: RequestBuilder) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self
            .authorized(request.timeout(self.request_timeout))
            .send()
            .await
            .map_err(|source| ApiClientError::Http { context, source })?;
        let response = Self::ensure_success(context, response).await?;

        response
            .json()
            .await
            .map_err(|source| ApiClientError::Http { context, source })
    }

    async fn ensure_success(context: &'static str, response: Response) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(ApiClientError::UnexpectedStatus {
            context,
            status,
            body,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        if let Some(token) = &self.auth_token {
            request.header(AUTHORIZATION, format!("Bearer {token}"))
        } else {
            request
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ApiClient;
    use crate::ApiClientError;

    #[test]
    fn new_trims_trailing_slashes() {
        let client = ApiClient::new("https://api.example.com//", None).expect("valid url");
        assert_eq!(client.base_url(), "https://api.example.com");
        assert_eq!(client.endpoint("videos/"), "https://api.example.com/videos/");
    }

    #[test]
    fn new_rejects_urls_without_scheme() {
        let result = ApiClient::new("localhost:8000", None);
        assert!(matches!(result, Err(ApiClientError::InvalidBaseUrl(_))));
    }
}
