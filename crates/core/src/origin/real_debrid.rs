//! Real-Debrid REST API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::config::OriginConfig;

use super::{
    CatalogEntry, CatalogPage, EntryDetail, EntryFile, OriginError, RemoteOrigin,
    UnrestrictedLink,
};

/// Header carrying the total number of catalog entries.
const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Real-Debrid client implementation.
pub struct RealDebridClient {
    client: Client,
    config: OriginConfig,
}

impl RealDebridClient {
    /// Create a new Real-Debrid client.
    pub fn new(config: OriginConfig) -> Result<Self, OriginError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| OriginError::ConnectionFailed(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.api_url.trim_end_matches('/')
    }

    /// Build an authenticated request.
    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url(), endpoint);
        self.client
            .request(method, url)
            .bearer_auth(&self.config.api_token)
    }

    /// Send a request and turn non-success statuses into errors.
    async fn send(&self, request: RequestBuilder) -> Result<Response, OriginError> {
        let response = request.send().await.map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = error_detail(&body);

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => OriginError::Unauthorized(detail),
            StatusCode::NOT_FOUND => OriginError::NotFound(detail),
            _ => OriginError::ApiError(format!("HTTP {}: {}", status, detail)),
        })
    }
}

fn map_transport_error(e: reqwest::Error) -> OriginError {
    if e.is_timeout() {
        OriginError::Timeout
    } else if e.is_connect() {
        OriginError::ConnectionFailed(e.to_string())
    } else {
        OriginError::ApiError(e.to_string())
    }
}

/// Error body returned by the API.
#[derive(Debug, Deserialize)]
struct RdError {
    error: String,
    #[serde(default)]
    error_code: Option<i64>,
}

fn error_detail(body: &str) -> String {
    match serde_json::from_str::<RdError>(body) {
        Ok(RdError {
            error,
            error_code: Some(code),
        }) => format!("{} (code {})", error, code),
        Ok(RdError { error, .. }) => error,
        Err(_) => body.chars().take(100).collect(),
    }
}

/// Torrent as returned by `GET /torrents`.
#[derive(Debug, Deserialize)]
struct RdTorrent {
    id: String,
    filename: String,
    status: String,
    #[serde(default)]
    bytes: u64,
}

impl From<RdTorrent> for CatalogEntry {
    fn from(torrent: RdTorrent) -> Self {
        Self {
            id: torrent.id,
            filename: torrent.filename,
            status: torrent.status,
            bytes: torrent.bytes,
        }
    }
}

/// Torrent as returned by `GET /torrents/info/{id}`.
#[derive(Debug, Deserialize)]
struct RdTorrentInfo {
    id: String,
    filename: String,
    #[serde(default)]
    files: Vec<RdFile>,
    #[serde(default)]
    links: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RdFile {
    path: String,
    bytes: u64,
    selected: u8,
}

impl From<RdTorrentInfo> for EntryDetail {
    fn from(info: RdTorrentInfo) -> Self {
        Self {
            id: info.id,
            filename: info.filename,
            files: info
                .files
                .into_iter()
                .map(|f| EntryFile {
                    path: f.path,
                    bytes: f.bytes,
                    selected: f.selected == 1,
                })
                .collect(),
            links: info.links,
        }
    }
}

/// Response of `POST /unrestrict/link`.
#[derive(Debug, Deserialize)]
struct RdUnrestrict {
    download: String,
    filename: String,
    #[serde(default)]
    filesize: u64,
    #[serde(rename = "mimeType", default)]
    mime_type: Option<String>,
}

#[async_trait]
impl RemoteOrigin for RealDebridClient {
    fn name(&self) -> &str {
        "real-debrid"
    }

    async fn list_entries(&self, page: u32, limit: u32) -> Result<CatalogPage, OriginError> {
        let request = self
            .request(Method::GET, "/torrents")
            .query(&[("page", page.to_string()), ("limit", limit.to_string())]);
        let response = self.send(request).await?;

        // Past the last page the API answers 204 with no body
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(CatalogPage::default());
        }

        let total = response
            .headers()
            .get(TOTAL_COUNT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        let torrents: Vec<RdTorrent> = response
            .json()
            .await
            .map_err(|e| OriginError::InvalidResponse(e.to_string()))?;

        let entries: Vec<CatalogEntry> = torrents.into_iter().map(CatalogEntry::from).collect();

        debug!(page, count = entries.len(), total = ?total, "Fetched catalog page");

        Ok(CatalogPage { entries, total })
    }

    async fn entry_detail(&self, id: &str) -> Result<EntryDetail, OriginError> {
        let endpoint = format!("/torrents/info/{}", urlencoding::encode(id));
        let response = self.send(self.request(Method::GET, &endpoint)).await?;

        let info: RdTorrentInfo = response
            .json()
            .await
            .map_err(|e| OriginError::InvalidResponse(e.to_string()))?;

        Ok(info.into())
    }

    async fn unrestrict_link(&self, link: &str) -> Result<UnrestrictedLink, OriginError> {
        let request = self
            .request(Method::POST, "/unrestrict/link")
            .form(&[("link", link)]);
        let response = self.send(request).await?;

        let unrestricted: RdUnrestrict = response
            .json()
            .await
            .map_err(|e| OriginError::InvalidResponse(e.to_string()))?;

        Ok(UnrestrictedLink {
            download: unrestricted.download,
            filename: unrestricted.filename,
            filesize: unrestricted.filesize,
            mime_type: unrestricted.mime_type,
        })
    }

    async fn delete_entry(&self, id: &str) -> Result<(), OriginError> {
        let endpoint = format!("/torrents/delete/{}", urlencoding::encode(id));
        self.send(self.request(Method::DELETE, &endpoint)).await?;
        debug!(id, "Deleted remote entry");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::response::IntoResponse;
    use axum::routing::{delete, get, post};
    use axum::{Form, Json, Router};
    use serde_json::json;

    const TOKEN: &str = "test-token";

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == format!("Bearer {}", TOKEN))
            .unwrap_or(false)
    }

    async fn list_torrents(headers: HeaderMap) -> impl IntoResponse {
        if !authorized(&headers) {
            return (
                AxumStatus::UNAUTHORIZED,
                Json(json!({"error": "bad_token", "error_code": 8})),
            )
                .into_response();
        }
        (
            [("X-Total-Count", "3")],
            Json(json!([
                {"id": "abc123", "filename": "Movie.mkv", "status": "downloaded", "bytes": 1500000000u64, "hash": "h"},
                {"id": "def456", "filename": "Show", "status": "downloading", "bytes": 0}
            ])),
        )
            .into_response()
    }

    async fn torrent_info(Path(id): Path<String>) -> impl IntoResponse {
        if id != "abc123" {
            return (
                AxumStatus::NOT_FOUND,
                Json(json!({"error": "unknown_ressource", "error_code": 7})),
            )
                .into_response();
        }
        Json(json!({
            "id": "abc123",
            "filename": "Movie.mkv",
            "status": "downloaded",
            "files": [
                {"id": 1, "path": "/Movie.mkv", "bytes": 1500000000u64, "selected": 1},
                {"id": 2, "path": "/RARBG.txt", "bytes": 30, "selected": 0}
            ],
            "links": ["https://real-debrid.com/d/ABC"]
        }))
        .into_response()
    }

    async fn unrestrict(Form(form): Form<HashMap<String, String>>) -> impl IntoResponse {
        let link = form.get("link").cloned().unwrap_or_default();
        Json(json!({
            "id": "U1",
            "filename": "Movie.mkv",
            "mimeType": "video/x-matroska",
            "filesize": 1500000000u64,
            "link": link,
            "download": format!("https://download.example/{}", link.len())
        }))
    }

    async fn delete_torrent(Path(id): Path<String>) -> AxumStatus {
        if id == "abc123" {
            AxumStatus::NO_CONTENT
        } else {
            AxumStatus::NOT_FOUND
        }
    }

    async fn spawn_origin() -> String {
        spawn_router(
            Router::new()
                .route("/torrents", get(list_torrents))
                .route("/torrents/info/{id}", get(torrent_info))
                .route("/unrestrict/link", post(unrestrict))
                .route("/torrents/delete/{id}", delete(delete_torrent)),
        )
        .await
    }

    async fn spawn_router(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(api_url: String, token: &str) -> RealDebridClient {
        RealDebridClient::new(OriginConfig {
            api_url,
            api_token: token.to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_entries_without_total_header() {
        async fn untotaled() -> Json<serde_json::Value> {
            Json(json!([
                {"id": "a", "filename": "A", "status": "downloaded", "bytes": 1},
                {"id": "b", "filename": "B", "status": "downloaded", "bytes": 2}
            ]))
        }
        let url = spawn_router(Router::new().route("/torrents", get(untotaled))).await;
        let client = client(url, TOKEN);

        let page = client.list_entries(1, 2).await.unwrap();

        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.total, None);
    }

    #[tokio::test]
    async fn test_list_entries_reads_total_header() {
        let client = client(spawn_origin().await, TOKEN);

        let page = client.list_entries(1, 2).await.unwrap();
        assert_eq!(page.total, Some(3));
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[0].id, "abc123");
        assert!(page.entries[0].is_ready());
        assert!(!page.entries[1].is_ready());
    }

    #[tokio::test]
    async fn test_bad_token_is_unauthorized() {
        let client = client(spawn_origin().await, "wrong");

        let result = client.list_entries(1, 100).await;
        match result {
            Err(OriginError::Unauthorized(detail)) => assert!(detail.contains("bad_token")),
            other => panic!("expected Unauthorized, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_entry_detail_maps_selected_flags() {
        let client = client(spawn_origin().await, TOKEN);

        let detail = client.entry_detail("abc123").await.unwrap();
        assert_eq!(detail.files.len(), 2);
        assert!(detail.files[0].selected);
        assert!(!detail.files[1].selected);
        assert_eq!(detail.links, vec!["https://real-debrid.com/d/ABC".to_string()]);
    }

    #[tokio::test]
    async fn test_entry_detail_unknown_is_not_found() {
        let client = client(spawn_origin().await, TOKEN);

        let result = client.entry_detail("missing").await;
        assert!(matches!(result, Err(OriginError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unrestrict_link_posts_form() {
        let client = client(spawn_origin().await, TOKEN);

        let link = "https://real-debrid.com/d/ABC";
        let unrestricted = client.unrestrict_link(link).await.unwrap();
        assert_eq!(
            unrestricted.download,
            format!("https://download.example/{}", link.len())
        );
        assert_eq!(unrestricted.filesize, 1_500_000_000);
        assert_eq!(unrestricted.mime_type.as_deref(), Some("video/x-matroska"));
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let client = client(spawn_origin().await, TOKEN);

        assert!(client.delete_entry("abc123").await.is_ok());
        assert!(matches!(
            client.delete_entry("gone").await,
            Err(OriginError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client(format!("http://{}", addr), TOKEN);
        let result = client.list_entries(1, 10).await;
        assert!(matches!(result, Err(OriginError::ConnectionFailed(_))));
    }

    #[test]
    fn test_error_detail_parsing() {
        assert_eq!(
            error_detail(r#"{"error":"bad_token","error_code":8}"#),
            "bad_token (code 8)"
        );
        assert_eq!(error_detail(r#"{"error":"oops"}"#), "oops");
        assert_eq!(error_detail("plain text"), "plain text");
    }
}
