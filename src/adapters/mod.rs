//! Adapter interfaces for the two remote services.
//!
//! The engine talks to Drive through [`SourceClient`] and to the wiki
//! through [`TargetClient`]. The HTTP implementations live in `drive` and
//! `confluence`; `dry_run` stands in for the wiki when nothing should be
//! written.

pub mod confluence;
pub mod drive;
pub mod dry_run;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ChildPage, SourceNode};

pub use confluence::ConfluenceClient;
pub use drive::DriveClient;
pub use dry_run::DryRunTarget;

/// Read access to the source tree
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// List one page of a folder's children
    async fn list_children(&self, folder_id: &str, page_token: Option<&str>) -> Result<ChildPage>;

    /// Fetch a single node's metadata
    async fn get_metadata(&self, id: &str) -> Result<SourceNode>;

    /// Export a node's content in the given MIME type
    async fn export_content(&self, id: &str, mime_type: &str) -> Result<Vec<u8>>;
}

/// Write access to the target wiki
#[async_trait]
pub trait TargetClient: Send + Sync {
    /// Create a page and return its id.
    ///
    /// `Ok(None)` means the wiki answered but assigned no id, which is how a
    /// title collision shows up.
    async fn create_page(
        &self,
        space_key: &str,
        title: &str,
        parent_id: Option<&str>,
    ) -> Result<Option<String>>;

    /// Overwrite a page's body
    async fn update_page_body(
        &self,
        space_key: &str,
        page_id: &str,
        title: &str,
        body: &str,
    ) -> Result<()>;

    /// Post a comment on a page
    async fn add_comment(&self, page_id: &str, text: &str) -> Result<()>;

    /// Attach a file to a page
    async fn upload_attachment(
        &self,
        page_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
        comment: &str,
    ) -> Result<()>;

    /// First phase of the legacy import: upload the binary against a page
    async fn begin_document_import(
        &self,
        page_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<()>;

    /// Second phase of the legacy import: commit the uploaded document
    async fn finalize_document_import(
        &self,
        page_id: &str,
        title: &str,
        depth: u32,
        level: u32,
    ) -> Result<()>;
}

/// Failure talking to a remote service
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} call '{operation}' timed out after {seconds}s")]
    Timeout {
        service: &'static str,
        operation: String,
        seconds: u64,
    },

    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} returned an unexpected response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },
}

impl RemoteError {
    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Transport { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request()
            }
            RemoteError::Timeout { .. } => true,
            RemoteError::Status { status, .. } => *status == 429 || *status >= 500,
            RemoteError::Decode { .. } => false,
        }
    }
}

/// Keep response bodies readable in error messages
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 512;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
