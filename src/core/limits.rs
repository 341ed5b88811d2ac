//! Traversal limits for a migration run.
//!
//! Bounds a run against pathological or accidentally cyclic source trees:
//! - Folder depth
//! - Total nodes visited
//! - Per-call and whole-run timeouts
//! - Exclusion patterns (nodes whose names should never be migrated)

use std::time::{Duration, Instant};

use glob::Pattern;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Limits applied to a migration run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationLimits {
    /// Maximum folder depth below the root (default: 64)
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum number of nodes visited per run (default: 10000)
    #[serde(default = "default_max_nodes")]
    pub max_nodes: u32,

    /// Children requested per listing call (default: 100)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Per-call timeout in seconds (default: 60)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Whole-run timeout in seconds, 0 for none (default: 0)
    #[serde(default)]
    pub run_timeout_seconds: u64,

    /// Glob patterns matched against node names; matches are skipped
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

fn default_max_depth() -> u32 {
    64
}
fn default_max_nodes() -> u32 {
    10_000
}
fn default_page_size() -> u32 {
    100
}
fn default_request_timeout() -> u64 {
    60
}

impl Default for MigrationLimits {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_nodes: default_max_nodes(),
            page_size: default_page_size(),
            request_timeout_seconds: default_request_timeout(),
            run_timeout_seconds: 0,
            exclude_patterns: Vec::new(),
        }
    }
}

impl MigrationLimits {
    /// Per-call timeout as a duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Check if a node name matches any exclusion pattern
    pub fn is_excluded(&self, name: &str) -> bool {
        for pattern_str in &self.exclude_patterns {
            if let Ok(pattern) = Pattern::new(pattern_str) {
                if pattern.matches(name) {
                    return true;
                }
            }
        }
        false
    }

    /// Whether children at `depth` may still be visited
    pub fn allows_depth(&self, depth: u32) -> bool {
        depth <= self.max_depth
    }

    /// Check current tracker state against limits
    pub fn check(&self, tracker: &LimitTracker) -> Result<(), LimitViolation> {
        if tracker.nodes_visited >= self.max_nodes {
            return Err(LimitViolation::MaxNodes {
                actual: tracker.nodes_visited,
                limit: self.max_nodes,
            });
        }

        if self.run_timeout_seconds > 0 {
            let elapsed = tracker.started_at.elapsed().as_secs();
            if elapsed >= self.run_timeout_seconds {
                return Err(LimitViolation::RunTimeout {
                    elapsed_seconds: elapsed,
                    limit_seconds: self.run_timeout_seconds,
                });
            }
        }

        Ok(())
    }
}

/// Tracks resource usage during a run
#[derive(Debug, Clone)]
pub struct LimitTracker {
    /// Number of nodes visited
    pub nodes_visited: u32,

    /// When the run started
    pub started_at: Instant,
}

impl Default for LimitTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LimitTracker {
    pub fn new() -> Self {
        Self {
            nodes_visited: 0,
            started_at: Instant::now(),
        }
    }

    pub fn record_visit(&mut self) {
        self.nodes_visited += 1;
    }
}

/// A run-wide limit was hit
#[derive(Debug, Clone, Error)]
pub enum LimitViolation {
    #[error("Maximum nodes reached: {actual} >= {limit}")]
    MaxNodes { actual: u32, limit: u32 },

    #[error("Run timeout: {elapsed_seconds}s >= {limit_seconds}s")]
    RunTimeout {
        elapsed_seconds: u64,
        limit_seconds: u64,
    },
}
