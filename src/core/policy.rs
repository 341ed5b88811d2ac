//! Content type policy.
//!
//! Maps a source node's MIME type to what the engine does with it. Pure and
//! total: unknown types are skipped, never rejected.

use serde::{Deserialize, Serialize};

use crate::domain::node::{MIME_DOCUMENT, MIME_FOLDER, MIME_PRESENTATION, MIME_SPREADSHEET};

/// Which embed template a node renders with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedKind {
    Spreadsheet,
    Slides,
}

/// What the engine does with a node after its page exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Walk the folder's children
    Recurse,

    /// Export as DOCX and run the wiki's document importer
    ImportDocument,

    /// Overwrite the page body with an embed template
    EmbedContent(EmbedKind),

    /// Leave the page empty
    Skip,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Recurse => write!(f, "recurse"),
            Action::ImportDocument => write!(f, "import document"),
            Action::EmbedContent(EmbedKind::Spreadsheet) => write!(f, "embed spreadsheet"),
            Action::EmbedContent(EmbedKind::Slides) => write!(f, "embed slides"),
            Action::Skip => write!(f, "skip"),
        }
    }
}

/// Classify a source content type
pub fn classify(mime_type: &str) -> Action {
    match mime_type {
        MIME_FOLDER => Action::Recurse,
        MIME_DOCUMENT => Action::ImportDocument,
        MIME_SPREADSHEET => Action::EmbedContent(EmbedKind::Spreadsheet),
        MIME_PRESENTATION => Action::EmbedContent(EmbedKind::Slides),
        _ => Action::Skip,
    }
}
