//! Source-side nodes as returned by the Drive API.
//!
//! A node is a read-only snapshot. It is fetched on demand and owned by the
//! traversal frame that visits it; nothing caches it beyond that.

use serde::{Deserialize, Serialize};

/// MIME type of a Drive folder
pub const MIME_FOLDER: &str = "application/vnd.google-apps.folder";

/// MIME type of a Google Docs document
pub const MIME_DOCUMENT: &str = "application/vnd.google-apps.document";

/// MIME type of a Google Sheets spreadsheet
pub const MIME_SPREADSHEET: &str = "application/vnd.google-apps.spreadsheet";

/// MIME type of a Google Slides deck
pub const MIME_PRESENTATION: &str = "application/vnd.google-apps.presentation";

/// Export format used for documents handed to the wiki importer
pub const MIME_WORD_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// A single entry in the source tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceNode {
    /// Stable identifier, unique within Drive
    pub id: String,

    /// Display name (not unique among siblings)
    pub name: String,

    /// Content type discriminator
    pub mime_type: String,

    /// Link back to the original item, used for provenance only
    #[serde(default)]
    pub web_view_link: String,
}

impl SourceNode {
    /// Create a node from its parts
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        mime_type: impl Into<String>,
        web_view_link: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mime_type: mime_type.into(),
            web_view_link: web_view_link.into(),
        }
    }

    /// File name used when the node is exported as DOCX
    pub fn export_file_name(&self) -> String {
        if self.name.to_lowercase().ends_with(".docx") {
            self.name.clone()
        } else {
            format!("{}.docx", self.name)
        }
    }
}

/// One page of a paginated child listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildPage {
    /// Children in the order the service returned them
    #[serde(default, rename = "files")]
    pub items: Vec<SourceNode>,

    /// Continuation token; `None` on the last page
    #[serde(default)]
    pub next_page_token: Option<String>,
}
