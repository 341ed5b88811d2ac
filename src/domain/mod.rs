//! Domain types for drivewiki.
//!
//! This module contains the core data structures:
//! - SourceNode: entries of the Drive tree
//! - TargetPage: pages created in the wiki
//! - MigrationReport: run-level accounting of pages, skips and faults

pub mod node;
pub mod page;
pub mod report;

// Re-export commonly used types
pub use node::{ChildPage, SourceNode};
pub use page::{disambiguated_title, provenance_comment, TargetPage};
pub use report::{
    MigrationFault, MigrationReport, NodeFault, PendingNode, SkipReason, SkippedNode,
    StopReason,
};
