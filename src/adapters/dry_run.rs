//! Target client that writes nothing.
//!
//! Every call is logged and answered with a synthetic success, so a full
//! traversal can be previewed against the real source tree.

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use super::TargetClient;

/// Prefix of the page ids handed out by the dry run
const DRY_RUN_ID_PREFIX: &str = "dry-run-";

/// Logging, non-writing target
#[derive(Debug, Default)]
pub struct DryRunTarget {
    next_id: AtomicU64,
}

impl DryRunTarget {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TargetClient for DryRunTarget {
    async fn create_page(
        &self,
        space_key: &str,
        title: &str,
        parent_id: Option<&str>,
    ) -> Result<Option<String>> {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let id = format!("{}{}", DRY_RUN_ID_PREFIX, n);
        info!(space_key, title, parent_id, page_id = %id, "[dry-run] create page");
        Ok(Some(id))
    }

    async fn update_page_body(
        &self,
        _space_key: &str,
        page_id: &str,
        title: &str,
        body: &str,
    ) -> Result<()> {
        info!(page_id, title, body_len = body.len(), "[dry-run] update page body");
        Ok(())
    }

    async fn add_comment(&self, page_id: &str, text: &str) -> Result<()> {
        info!(page_id, text, "[dry-run] comment");
        Ok(())
    }

    async fn upload_attachment(
        &self,
        page_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
        _comment: &str,
    ) -> Result<()> {
        info!(page_id, file_name, bytes = bytes.len(), "[dry-run] attach");
        Ok(())
    }

    async fn begin_document_import(
        &self,
        page_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<()> {
        info!(page_id, file_name, bytes = bytes.len(), "[dry-run] upload for import");
        Ok(())
    }

    async fn finalize_document_import(
        &self,
        page_id: &str,
        title: &str,
        depth: u32,
        level: u32,
    ) -> Result<()> {
        info!(page_id, title, depth, level, "[dry-run] finalize import");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_synthetic_ids_are_unique() {
        let target = DryRunTarget::new();

        let first = target.create_page("DS", "A", None).await.unwrap();
        let second = target.create_page("DS", "B", first.as_deref()).await.unwrap();

        assert_eq!(first.as_deref(), Some("dry-run-1"));
        assert_eq!(second.as_deref(), Some("dry-run-2"));
    }
}
