//! Embed templates for spreadsheets and slide decks.
//!
//! Each template is a Confluence storage-format fragment with a single
//! `{item_id}` placeholder. Built-in copies are compiled in; a templates
//! directory can override either file.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use super::policy::EmbedKind;

/// Placeholder replaced with the source item id
pub const ITEM_ID_PLACEHOLDER: &str = "{item_id}";

const SPREADSHEET_FILE: &str = "google_spreadsheet.html";
const SLIDES_FILE: &str = "google_slides.html";

const BUILTIN_SPREADSHEET: &str = include_str!("../../templates/google_spreadsheet.html");
const BUILTIN_SLIDES: &str = include_str!("../../templates/google_slides.html");

/// Loaded embed templates
#[derive(Debug, Clone)]
pub struct Templates {
    spreadsheet: String,
    slides: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Templates {
    /// Templates compiled into the binary
    pub fn builtin() -> Self {
        Self {
            spreadsheet: BUILTIN_SPREADSHEET.to_string(),
            slides: BUILTIN_SLIDES.to_string(),
        }
    }

    /// Load overrides from a directory, keeping built-ins for missing files
    pub fn load(dir: &Path) -> Result<Self> {
        let mut templates = Self::builtin();

        if let Some(content) = read_override(dir, SPREADSHEET_FILE)? {
            templates.spreadsheet = content;
        }
        if let Some(content) = read_override(dir, SLIDES_FILE)? {
            templates.slides = content;
        }

        Ok(templates)
    }

    /// Raw template for a kind
    pub fn template(&self, kind: EmbedKind) -> &str {
        match kind {
            EmbedKind::Spreadsheet => &self.spreadsheet,
            EmbedKind::Slides => &self.slides,
        }
    }

    /// Render the page body for an item
    pub fn render(&self, kind: EmbedKind, item_id: &str) -> String {
        self.template(kind).replace(ITEM_ID_PLACEHOLDER, item_id)
    }
}

fn read_override(dir: &Path, file_name: &str) -> Result<Option<String>> {
    let path = dir.join(file_name);
    if !path.exists() {
        debug!(path = %path.display(), "No template override, using built-in");
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read template: {}", path.display()))?;

    if !content.contains(ITEM_ID_PLACEHOLDER) {
        anyhow::bail!(
            "Template {} has no {} placeholder",
            path.display(),
            ITEM_ID_PLACEHOLDER
        );
    }

    Ok(Some(content))
}
