//! Google Drive v3 client.
//!
//! Authenticates with a bearer token obtained elsewhere; the OAuth flow is
//! not part of this crate.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, trace};

use super::{truncate_body, RemoteError, SourceClient};
use crate::domain::{ChildPage, SourceNode};

const SERVICE: &str = "drive";

/// Fields requested for every node
const NODE_FIELDS: &str = "id, name, mimeType, webViewLink";

/// Drive REST client
pub struct DriveClient {
    /// API root, e.g. https://www.googleapis.com
    api_url: String,
    /// OAuth access token
    access_token: String,
    /// Children requested per listing call
    page_size: u32,
    client: reqwest::Client,
}

impl DriveClient {
    /// Create a new client
    pub fn new(
        api_url: impl Into<String>,
        access_token: impl Into<String>,
        page_size: u32,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Drive HTTP client")?;

        Ok(Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            page_size,
            client,
        })
    }

    /// Build a files endpoint URL
    fn files_url(&self, suffix: &str) -> String {
        format!("{}/drive/v3/files{}", self.api_url, suffix)
    }

    /// Query parameters for one listing call
    fn list_query(&self, folder_id: &str, page_token: Option<&str>) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("q", format!("'{}' in parents", folder_id)),
            ("pageSize", self.page_size.to_string()),
            ("fields", format!("nextPageToken, files({})", NODE_FIELDS)),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }
        query
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|source| RemoteError::Transport {
                service: SERVICE,
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Status {
            service: SERVICE,
            status: status.as_u16(),
            body: truncate_body(&body),
        }
        .into())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = self.send(request).await?;
        let text = response.text().await.map_err(|source| RemoteError::Transport {
            service: SERVICE,
            source,
        })?;
        trace!(body = %text, "Drive response");

        serde_json::from_str(&text).map_err(|e| {
            RemoteError::Decode {
                service: SERVICE,
                message: e.to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl SourceClient for DriveClient {
    async fn list_children(&self, folder_id: &str, page_token: Option<&str>) -> Result<ChildPage> {
        debug!(folder_id, page_token, "Listing children");
        let request = self
            .client
            .get(self.files_url(""))
            .query(&self.list_query(folder_id, page_token));

        self.get_json(request)
            .await
            .with_context(|| format!("Failed to list children of {}", folder_id))
    }

    async fn get_metadata(&self, id: &str) -> Result<SourceNode> {
        debug!(id, "Fetching metadata");
        let request = self
            .client
            .get(self.files_url(&format!("/{}", id)))
            .query(&[("fields", NODE_FIELDS)]);

        self.get_json(request)
            .await
            .with_context(|| format!("Failed to fetch metadata for {}", id))
    }

    async fn export_content(&self, id: &str, mime_type: &str) -> Result<Vec<u8>> {
        debug!(id, mime_type, "Exporting content");
        let request = self
            .client
            .get(self.files_url(&format!("/{}/export", id)))
            .query(&[("mimeType", mime_type)]);

        let response = self
            .send(request)
            .await
            .with_context(|| format!("Failed to export {}", id))?;
        let bytes = response.bytes().await.map_err(|source| RemoteError::Transport {
            service: SERVICE,
            source,
        })?;

        debug!(id, bytes = bytes.len(), "Export downloaded");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> DriveClient {
        DriveClient::new(
            "https://www.googleapis.com/",
            "token",
            10,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_files_url() {
        let client = client();
        assert_eq!(
            client.files_url("/abc/export"),
            "https://www.googleapis.com/drive/v3/files/abc/export"
        );
    }

    #[test]
    fn test_list_query_first_page() {
        let query = client().list_query("folder-1", None);
        assert_eq!(query[0], ("q", "'folder-1' in parents".to_string()));
        assert_eq!(query[1], ("pageSize", "10".to_string()));
        assert!(query.iter().all(|(k, _)| *k != "pageToken"));
    }

    #[test]
    fn test_list_query_continuation() {
        let query = client().list_query("folder-1", Some("next"));
        assert!(query.contains(&("pageToken", "next".to_string())));
    }
}
