//! drivewiki - migrate Google Drive folder trees into Confluence
//!
//! Walks a Drive folder hierarchy and recreates it as a Confluence page
//! tree. Folders become container pages, Google Docs are imported through
//! the wiki's Word importer, and Sheets and Slides are embedded.
//!
//! # Architecture
//!
//! - One page is created per Drive item, under the page of its folder
//! - Every page gets a provenance comment linking back to Drive
//! - Failures are contained per item and collected in a run report
//!
//! # Modules
//!
//! - `adapters`: Drive and Confluence clients, plus a dry-run target
//! - `core`: Migration engine, content policy, retry, limits, templates
//! - `domain`: Data structures (SourceNode, TargetPage, MigrationReport)
//! - `config`: Environment and config file loading
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Migrate a folder under page 65538 in space DS
//! drivewiki migrate --root 1f746Qv1Id7gD --space DS --parent 65538
//!
//! # Preview without writing to the wiki
//! drivewiki migrate --root 1f746Qv1Id7gD --space DS --parent 65538 --dry-run
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{SourceClient, TargetClient};
pub use self::core::{classify, Action, CancelFlag, MigrationError, Migrator};
pub use domain::{MigrationFault, MigrationReport, SourceNode, TargetPage};
