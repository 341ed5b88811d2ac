//! Confluence client.
//!
//! Pages, comments and attachments go through the REST API with basic auth.
//! Document import goes through the legacy `worddav` form endpoints, which
//! additionally need a browser session cookie and the no-check XSRF header.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, trace};

use super::{truncate_body, RemoteError, TargetClient};

const SERVICE: &str = "wiki";

/// Header value that disables Confluence's XSRF check
const NO_CHECK: &str = "no-check";

/// Conflict mode for the legacy importer: keep a disambiguated copy
const IMPORT_CONFLICT_MODE: u32 = 1;

/// Credentials and endpoint for the wiki
#[derive(Debug, Clone)]
pub struct ConfluenceSettings {
    pub base_url: String,
    pub user: String,
    pub password: String,
    /// JSESSIONID value for the legacy import endpoints
    pub session_cookie: String,
}

/// Confluence REST + legacy import client
pub struct ConfluenceClient {
    settings: ConfluenceSettings,
    client: reqwest::Client,
}

/// Subset of the content creation response we care about
#[derive(Debug, Deserialize)]
struct ContentResponse {
    id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ConfluenceClient {
    /// Create a new client
    pub fn new(settings: ConfluenceSettings, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build wiki HTTP client")?;

        let settings = ConfluenceSettings {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            ..settings
        };

        Ok(Self { settings, client })
    }

    /// Build an absolute URL from a path
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url, path)
    }

    fn session_cookie(&self) -> String {
        format!("JSESSIONID={};", self.settings.session_cookie)
    }

    /// JSON payload for a new page
    fn page_payload(space_key: &str, title: &str, parent_id: Option<&str>) -> serde_json::Value {
        let mut payload = json!({
            "type": "page",
            "title": title,
            "space": { "key": space_key },
            "body": {
                "storage": { "value": "", "representation": "storage" }
            }
        });
        if let Some(parent) = parent_id {
            payload["ancestors"] = json!([{ "id": parent }]);
        }
        payload
    }

    /// JSON payload replacing a freshly created page's body
    fn update_payload(space_key: &str, page_id: &str, title: &str, body: &str) -> serde_json::Value {
        json!({
            "id": page_id,
            "type": "page",
            "title": title,
            "space": { "key": space_key },
            "body": {
                "storage": { "value": body, "representation": "storage" }
            },
            "version": { "number": 2 }
        })
    }

    /// Form fields committing a legacy import
    fn finalize_form(page_id: &str, title: &str, depth: u32, level: u32) -> Vec<(&'static str, String)> {
        vec![
            ("pageId", page_id.to_string()),
            ("treeDepth", depth.to_string()),
            ("advanced", "true".to_string()),
            ("docTitle", title.to_string()),
            ("importSpace", "false".to_string()),
            ("overwriteAll", "false".to_string()),
            ("conflict", IMPORT_CONFLICT_MODE.to_string()),
            ("lvl", level.to_string()),
            ("submit", "Import".to_string()),
        ]
    }

    /// Send a request, returning status and body text
    async fn send(&self, operation: &str, request: reqwest::RequestBuilder) -> Result<(u16, String)> {
        let response = request
            .basic_auth(&self.settings.user, Some(&self.settings.password))
            .send()
            .await
            .map_err(|source| RemoteError::Transport {
                service: SERVICE,
                source,
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|source| RemoteError::Transport {
            service: SERVICE,
            source,
        })?;

        debug!(operation, status, "Wiki response");
        trace!(operation, body = %body, "Wiki response body");
        Ok((status, body))
    }

    /// Send a request and fail on any non-success status
    async fn send_checked(&self, operation: &str, request: reqwest::RequestBuilder) -> Result<String> {
        let (status, body) = self.send(operation, request).await?;
        if (200..300).contains(&status) {
            Ok(body)
        } else {
            Err(RemoteError::Status {
                service: SERVICE,
                status,
                body: truncate_body(&body),
            }
            .into())
        }
    }
}

/// Statuses that say nothing about a title collision.
///
/// Auth failures and unknown spaces or parents are errors in their own right;
/// every other answer is read for an id.
fn creation_status_is_error(status: u16) -> bool {
    status >= 500 || matches!(status, 401 | 403 | 404 | 429)
}

#[async_trait]
impl TargetClient for ConfluenceClient {
    async fn create_page(
        &self,
        space_key: &str,
        title: &str,
        parent_id: Option<&str>,
    ) -> Result<Option<String>> {
        let request = self
            .client
            .post(self.url("/rest/api/content"))
            .json(&Self::page_payload(space_key, title, parent_id));

        let (status, body) = self.send("create_page", request).await?;

        if creation_status_is_error(status) {
            return Err(RemoteError::Status {
                service: SERVICE,
                status,
                body: truncate_body(&body),
            }
            .into());
        }

        match serde_json::from_str::<ContentResponse>(&body) {
            Ok(ContentResponse { id: Some(id), .. }) => Ok(Some(id)),
            Ok(ContentResponse { message, .. }) => {
                debug!(title, status, message = message.as_deref().unwrap_or(""), "Page not created");
                Ok(None)
            }
            Err(_) => {
                debug!(title, status, "Page creation returned no JSON body");
                Ok(None)
            }
        }
    }

    async fn update_page_body(
        &self,
        space_key: &str,
        page_id: &str,
        title: &str,
        body: &str,
    ) -> Result<()> {
        let request = self
            .client
            .put(self.url(&format!("/rest/api/content/{}", page_id)))
            .json(&Self::update_payload(space_key, page_id, title, body));

        self.send_checked("update_page_body", request)
            .await
            .with_context(|| format!("Failed to update page {}", page_id))?;
        Ok(())
    }

    async fn add_comment(&self, page_id: &str, text: &str) -> Result<()> {
        let payload = json!({
            "type": "comment",
            "container": { "type": "page", "id": page_id },
            "body": {
                "storage": { "value": text, "representation": "storage" }
            }
        });
        let request = self
            .client
            .post(self.url("/rest/api/content"))
            .json(&payload);

        self.send_checked("add_comment", request)
            .await
            .with_context(|| format!("Failed to comment on page {}", page_id))?;
        Ok(())
    }

    async fn upload_attachment(
        &self,
        page_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
        comment: &str,
    ) -> Result<()> {
        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name.to_string()))
            .text("comment", comment.to_string());

        let request = self
            .client
            .post(self.url(&format!("/rest/api/content/{}/child/attachment", page_id)))
            .header("X-Atlassian-Token", NO_CHECK)
            .multipart(form);

        self.send_checked("upload_attachment", request)
            .await
            .with_context(|| format!("Failed to attach {} to page {}", file_name, page_id))?;
        Ok(())
    }

    async fn begin_document_import(
        &self,
        page_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<()> {
        let form = Form::new().part("filename", Part::bytes(bytes).file_name(file_name.to_string()));

        let request = self
            .client
            .post(self.url("/pages/worddav/importword.action"))
            .query(&[("pageId", page_id)])
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("X-Atlassian-Token", NO_CHECK)
            .header("Cookie", self.session_cookie())
            .multipart(form);

        self.send_checked("begin_document_import", request)
            .await
            .with_context(|| format!("Failed to upload {} for import into page {}", file_name, page_id))?;
        Ok(())
    }

    async fn finalize_document_import(
        &self,
        page_id: &str,
        title: &str,
        depth: u32,
        level: u32,
    ) -> Result<()> {
        let request = self
            .client
            .post(self.url("/pages/worddav/doimportword.action"))
            .header("X-Atlassian-Token", NO_CHECK)
            .header("Cookie", self.session_cookie())
            .form(&Self::finalize_form(page_id, title, depth, level));

        self.send_checked("finalize_document_import", request)
            .await
            .with_context(|| format!("Failed to finalize import into page {}", page_id))?;
        Ok(())
    }
}
