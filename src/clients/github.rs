//! Document store backed by the GitHub contents API.
//!
//! Each document is a JSON file in a repository. Reads return the decoded
//! file body and its blob `sha`; writes must quote that `sha` when the file
//! already exists, which gives optimistic concurrency: GitHub answers `409`
//! or `422` when the token is missing or stale.

use super::{DocumentStore, StoredDocument, VersionToken};
use crate::error::BotError;
use base64::{Engine as _, engine::general_purpose};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{info, instrument, warn};

const SERVICE: &str = "github";

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    content: String,
    sha: String,
}

/// Client for `https://api.github.com/repos/{owner}/{repo}/contents/...`.
#[derive(Debug, Clone)]
pub struct GithubStore {
    client: Client,
    api_base: String,
    repo: String,
    token: String,
}

/// Percent-encode each path segment, keeping the separators.
fn encode_path(path: &str) -> String {
    path.trim_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Decode the base64 `content` field, which GitHub wraps at 60 columns.
fn decode_content(path: &str, content: &str) -> Result<String, BotError> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| BotError::MalformedDocument {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
    String::from_utf8(bytes).map_err(|e| BotError::MalformedDocument {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

impl GithubStore {
    /// `repo` is `owner/name`.
    pub fn new(repo: String, token: String, timeout: Duration) -> Result<Self, BotError> {
        Self::with_api_base(repo, token, "https://api.github.com", timeout)
    }

    pub fn with_api_base(
        repo: String,
        token: String,
        api_base: &str,
        timeout: Duration,
    ) -> Result<Self, BotError> {
        // GitHub rejects requests without a User-Agent.
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BotError::from_reqwest(SERVICE, e))?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            repo,
            token,
        })
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.api_base,
            self.repo,
            encode_path(path)
        )
    }
}

impl DocumentStore for GithubStore {
    #[instrument(level = "info", skip_all, fields(%path))]
    async fn get(&self, path: &str) -> Result<Option<StoredDocument>, BotError> {
        let resp = self
            .client
            .get(self.contents_url(path))
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| BotError::from_reqwest(SERVICE, e))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            info!("Document does not exist yet");
            return Ok(None);
        }
        let body = resp
            .text()
            .await
            .map_err(|e| BotError::from_reqwest(SERVICE, e))?;
        if !status.is_success() {
            return Err(BotError::status(SERVICE, status.as_u16(), &body));
        }

        let contents: ContentsResponse =
            serde_json::from_str(&body).map_err(|e| BotError::MalformedDocument {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Some(StoredDocument {
            body: decode_content(path, &contents.content)?,
            version: VersionToken(contents.sha),
        }))
    }

    #[instrument(level = "info", skip_all, fields(%path, has_version = version.is_some()))]
    async fn put(
        &self,
        path: &str,
        body: &str,
        version: Option<&VersionToken>,
        message: &str,
    ) -> Result<(), BotError> {
        let mut payload = json!({
            "message": message,
            "content": general_purpose::STANDARD.encode(body.as_bytes()),
        });
        if let Some(VersionToken(sha)) = version {
            payload["sha"] = json!(sha);
        }

        let resp = self
            .client
            .put(self.contents_url(path))
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| BotError::from_reqwest(SERVICE, e))?;

        let status = resp.status();
        match status {
            StatusCode::OK | StatusCode::CREATED => {
                info!(status = status.as_u16(), "Document written");
                Ok(())
            }
            StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                warn!(status = status.as_u16(), "Document version conflict");
                Err(BotError::VersionConflict {
                    path: path.to_string(),
                })
            }
            _ => {
                let text = resp.text().await.unwrap_or_default();
                Err(BotError::status(SERVICE, status.as_u16(), &text))
            }
        }
    }
}
