//! Run-level accounting of a migration.
//!
//! `pages` lists every page created. `skipped` lists nodes whose content was
//! not transferred on purpose, and `faults` lists nodes where something went
//! wrong. A node can show up in `pages` and in one of the other two.
//!
//! When a run stops early, `pending` lists the nodes that were scheduled but
//! never visited, together with the page they belong under. Their subtrees
//! were not listed either, so each entry is a root for a follow-up run.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::node::SourceNode;
use super::page::TargetPage;

/// Why a single node did not migrate cleanly
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum MigrationFault {
    #[error("page '{title}' could not be created, even with a disambiguated title")]
    PageCreation { title: String },

    #[error("page '{title}' may already exist: the wiki failed before answering a creation request")]
    AmbiguousPageCreation { title: String },

    #[error("page '{title}' could not be created: {error}")]
    PageCreationFailed { title: String, error: String },

    #[error("provenance comment failed: {error}")]
    Annotation { error: String },

    #[error("child listing stopped early after {listed} children: {error}")]
    Listing { listed: usize, error: String },

    #[error("content transfer failed: {error}")]
    ContentTransfer { error: String },

    #[error("node was already visited in this run")]
    AlreadyVisited,

    #[error("folder is deeper than the depth limit of {limit}")]
    DepthLimit { limit: u32 },
}

/// A fault attached to the node it happened on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFault {
    pub node_id: String,
    pub node_name: String,
    pub fault: MigrationFault,
}

/// A node that was intentionally not transferred
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedNode {
    pub node_id: String,
    pub node_name: String,
    pub mime_type: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Content type has no target representation
    UnsupportedType,

    /// Name matched an exclusion pattern
    Excluded,
}

/// A node scheduled for a visit that never happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingNode {
    pub node_id: String,
    pub node_name: String,
    pub mime_type: String,
    /// Page the node would have been created under
    pub parent_id: Option<String>,
    pub depth: u32,
}

/// Why a run ended before the whole tree was visited
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum StopReason {
    Cancelled,
    LimitReached { limit: String },
}

/// Outcome of one migration run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    /// Unique identifier for this run
    pub run_id: Uuid,

    /// Root source node id
    pub root_id: String,

    /// Target space
    pub space_key: String,

    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,

    /// Pages created, in creation order
    pub pages: Vec<TargetPage>,

    pub skipped: Vec<SkippedNode>,
    pub faults: Vec<NodeFault>,

    /// Nodes left unvisited when traversal ended early
    #[serde(default)]
    pub pending: Vec<PendingNode>,

    /// Set when traversal ended early
    pub stopped: Option<StopReason>,
}

impl MigrationReport {
    /// Start a report for a new run
    pub fn new(root_id: impl Into<String>, space_key: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            root_id: root_id.into(),
            space_key: space_key.into(),
            started_at: Utc::now(),
            completed_at: None,
            pages: Vec::new(),
            skipped: Vec::new(),
            faults: Vec::new(),
            pending: Vec::new(),
            stopped: None,
        }
    }

    pub fn record_page(&mut self, page: TargetPage) {
        self.pages.push(page);
    }

    pub fn record_skip(&mut self, node: &SourceNode, reason: SkipReason) {
        self.skipped.push(SkippedNode {
            node_id: node.id.clone(),
            node_name: node.name.clone(),
            mime_type: node.mime_type.clone(),
            reason,
        });
    }

    pub fn record_fault(&mut self, node: &SourceNode, fault: MigrationFault) {
        self.faults.push(NodeFault {
            node_id: node.id.clone(),
            node_name: node.name.clone(),
            fault,
        });
    }

    pub fn record_pending(&mut self, node: &SourceNode, parent_id: Option<&str>, depth: u32) {
        self.pending.push(PendingNode {
            node_id: node.id.clone(),
            node_name: node.name.clone(),
            mime_type: node.mime_type.clone(),
            parent_id: parent_id.map(str::to_string),
            depth,
        });
    }

    /// Mark the run finished
    pub fn finish(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    pub fn has_faults(&self) -> bool {
        !self.faults.is_empty()
    }

    /// Page created for a source node, if any
    pub fn page_for(&self, source_id: &str) -> Option<&TargetPage> {
        self.pages.iter().find(|p| p.source_id == source_id)
    }

    /// Faults recorded against a source node
    pub fn faults_for<'a>(&'a self, source_id: &'a str) -> impl Iterator<Item = &'a MigrationFault> {
        self.faults
            .iter()
            .filter(move |f| f.node_id == source_id)
            .map(|f| &f.fault)
    }

    /// One-line summary for the terminal
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} pages created, {} skipped, {} faults",
            self.pages.len(),
            self.skipped.len(),
            self.faults.len()
        );
        if !self.pending.is_empty() {
            summary.push_str(&format!(", {} not visited", self.pending.len()));
        }
        match &self.stopped {
            Some(StopReason::Cancelled) => summary.push_str(" (cancelled)"),
            Some(StopReason::LimitReached { limit }) => {
                summary.push_str(&format!(" (stopped: {})", limit))
            }
            None => {}
        }
        summary
    }

    /// Write the report as pretty JSON
    pub async fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write report: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::node::{MIME_DOCUMENT, MIME_FOLDER};

    fn page(source_id: &str, id: &str) -> TargetPage {
        TargetPage {
            id: id.to_string(),
            space_key: "DS".to_string(),
            title: source_id.to_string(),
            parent_id: Some("1".to_string()),
            source_id: source_id.to_string(),
        }
    }

    #[test]
    fn test_summary_counts() {
        let mut report = MigrationReport::new("root", "DS");
        report.record_page(page("root", "10"));
        report.record_skip(
            &SourceNode::new("v", "clip.mp4", "video/mp4", ""),
            SkipReason::UnsupportedType,
        );
        report.record_fault(
            &SourceNode::new("d", "Doc", MIME_DOCUMENT, ""),
            MigrationFault::ContentTransfer {
                error: "boom".to_string(),
            },
        );

        assert_eq!(report.summary(), "1 pages created, 1 skipped, 1 faults");
        assert!(report.has_faults());
        assert_eq!(report.page_for("root").map(|p| p.id.as_str()), Some("10"));
        assert_eq!(report.faults_for("d").count(), 1);
        assert_eq!(report.faults_for("root").count(), 0);
    }

    #[test]
    fn test_summary_mentions_stop() {
        let mut report = MigrationReport::new("root", "DS");
        report.stopped = Some(StopReason::Cancelled);
        assert!(report.summary().ends_with("(cancelled)"));
    }

    #[test]
    fn test_pending_nodes_in_summary_and_json() {
        let mut report = MigrationReport::new("root", "DS");
        report.record_page(page("root", "10"));
        report.record_pending(
            &SourceNode::new("f2", "Later", MIME_FOLDER, ""),
            Some("10"),
            1,
        );
        report.stopped = Some(StopReason::LimitReached {
            limit: "Maximum nodes reached: 1 >= 1".to_string(),
        });

        assert_eq!(
            report.summary(),
            "1 pages created, 0 skipped, 0 faults, 1 not visited (stopped: Maximum nodes reached: 1 >= 1)"
        );

        let json = serde_json::to_string(&report).unwrap();
        let parsed: MigrationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.pending[0].node_id, "f2");
        assert_eq!(parsed.pending[0].parent_id.as_deref(), Some("10"));
    }

    #[test]
    fn test_fault_serialization() {
        let mut report = MigrationReport::new("root", "DS");
        report.record_fault(
            &SourceNode::new("f", "Loop", MIME_FOLDER, ""),
            MigrationFault::AlreadyVisited,
        );

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains(r#""kind":"already_visited""#));

        let parsed: MigrationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.faults[0].fault, MigrationFault::AlreadyVisited);
    }

    #[tokio::test]
    async fn test_write_json() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("report.json");

        let mut report = MigrationReport::new("root", "DS");
        report.record_page(page("root", "10"));
        report.finish();
        report.write_json(&path).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: MigrationReport = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.pages.len(), 1);
        assert!(parsed.completed_at.is_some());
    }
}
