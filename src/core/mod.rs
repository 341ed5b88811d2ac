//! Core migration logic.
//!
//! This module contains:
//! - Policy: content type to action mapping
//! - Engine: tree traversal and per-node migration
//! - Limits: traversal bounds and exclusion patterns
//! - Retry: backoff and timeouts for remote calls
//! - Templates: embed templates for spreadsheets and slides

pub mod engine;
pub mod limits;
pub mod policy;
pub mod retry;
pub mod templates;

// Re-export commonly used types
pub use engine::{CancelFlag, MigrationError, Migrator};
pub use limits::{LimitTracker, LimitViolation, MigrationLimits};
pub use policy::{classify, Action, EmbedKind};
pub use retry::{is_transient, with_retry, RetryPolicy};
pub use templates::Templates;
