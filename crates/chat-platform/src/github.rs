//! GitHub contents API adapter for the content store port.
//!
//! `GET  /repos/{owner}/{repo}/contents/{path}?ref={branch}` → current `sha`
//! `PUT  /repos/{owner}/{repo}/contents/{path}`              → create or update
//!
//! Updating an existing file requires its current `sha`. GitHub answers a
//! stale or missing `sha` with 409, or with 422 mentioning `sha`; both are
//! surfaced as [`ChatError::VersionConflict`].

use async_trait::async_trait;
use gloo_net::http::{Request, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};

use chat_core::ports::{ContentStorePort, PutObject, VersionToken};
use chat_core::uploader::encode_path;
use chat_types::{config::ContentStoreConfig, ChatError, Result};

const ACCEPT: &str = "application/vnd.github.v3+json";

pub struct GitHubContentStore {
    config: ContentStoreConfig,
}

impl GitHubContentStore {
    pub fn new(config: ContentStoreConfig) -> Self {
        Self { config }
    }

    /// Contents endpoint of `path`, without query
    pub fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.owner,
            self.config.repo,
            encode_path(path)
        )
    }

    /// Contents endpoint of `path` pinned to the configured branch
    pub fn version_url(&self, path: &str) -> String {
        format!("{}?ref={}", self.contents_url(path), encode_path(&self.config.branch))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Authorization", &format!("token {}", self.config.token))
            .header("Accept", ACCEPT)
    }
}

#[async_trait(?Send)]
impl ContentStorePort for GitHubContentStore {
    async fn fetch_version(&self, path: &str) -> Result<Option<VersionToken>> {
        let url = self.version_url(path);
        log::debug!("GET {}", url);

        let response = self
            .authorize(Request::get(&url))
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        if response.status() == 404 {
            return Ok(None);
        }
        if !response.ok() {
            let (status, message) = failure_of(&response).await;
            return Err(ChatError::Http { status, message });
        }

        let entry: ContentEntry = response
            .json()
            .await
            .map_err(|e| ChatError::Serialization(e.to_string()))?;
        Ok(Some(VersionToken(entry.sha)))
    }

    async fn put_object(&self, req: PutObject) -> Result<VersionToken> {
        let url = self.contents_url(&req.path);
        log::debug!(
            "PUT {} ({})",
            url,
            if req.version.is_some() { "update" } else { "create" }
        );

        let body = put_body(&req, &self.config.branch);
        let response = self
            .authorize(Request::put(&url))
            .header("Content-Type", "application/json")
            .json(&body)
            .map_err(|e| ChatError::Network(e.to_string()))?
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        if !response.ok() {
            let (status, message) = failure_of(&response).await;
            return Err(classify_put_failure(&req.path, status, message));
        }

        let written: PutResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Serialization(e.to_string()))?;
        Ok(VersionToken(written.content.sha))
    }
}

// ─── Wire types ──────────────────────────────────────────────

#[derive(Deserialize)]
struct ContentEntry {
    sha: String,
}

#[derive(Deserialize)]
struct PutResponse {
    content: ContentEntry,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

/// Create-or-update body; `sha` only when updating
pub fn put_body(req: &PutObject, branch: &str) -> Value {
    let mut body = json!({
        "message": req.message,
        "content": req.content_base64,
        "branch": branch,
    });
    if let Some(version) = &req.version {
        body["sha"] = json!(version.0);
    }
    body
}

pub fn classify_put_failure(path: &str, status: u16, message: String) -> ChatError {
    let stale_sha = status == 422 && message.to_ascii_lowercase().contains("sha");
    if status == 409 || stale_sha {
        ChatError::VersionConflict { path: path.to_string() }
    } else {
        ChatError::Http { status, message }
    }
}

/// GitHub's `message` field, or the raw body when it is not JSON
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiError>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

async fn failure_of(response: &Response) -> (u16, String) {
    let status = response.status();
    let message = match response.text().await {
        Ok(body) if !body.trim().is_empty() => error_message(&body),
        _ => response.status_text(),
    };
    (status, message)
}
