//! In-memory source and target clients for engine tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use drivewiki::adapters::{RemoteError, SourceClient, TargetClient};
use drivewiki::core::{CancelFlag, Migrator, RetryPolicy};
use drivewiki::domain::node::{
    MIME_DOCUMENT, MIME_FOLDER, MIME_PRESENTATION, MIME_SPREADSHEET,
};
use drivewiki::domain::{ChildPage, SourceNode};

pub const SPACE: &str = "DS";
pub const ROOT_PARENT: &str = "65538";

pub fn import_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

fn link(id: &str) -> String {
    format!("https://drive.google.com/open?id={}", id)
}

pub fn folder(id: &str, name: &str) -> SourceNode {
    SourceNode::new(id, name, MIME_FOLDER, link(id))
}

pub fn doc(id: &str, name: &str) -> SourceNode {
    SourceNode::new(id, name, MIME_DOCUMENT, link(id))
}

pub fn sheet(id: &str, name: &str) -> SourceNode {
    SourceNode::new(id, name, MIME_SPREADSHEET, link(id))
}

pub fn slides(id: &str, name: &str) -> SourceNode {
    SourceNode::new(id, name, MIME_PRESENTATION, link(id))
}

pub fn video(id: &str, name: &str) -> SourceNode {
    SourceNode::new(id, name, "video/mp4", link(id))
}

/// Calls seen by the mock source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCall {
    List {
        folder_id: String,
        page_token: Option<String>,
    },
    Metadata {
        id: String,
    },
    Export {
        id: String,
        mime_type: String,
    },
}

/// Paginated in-memory Drive tree
pub struct MockSource {
    children: HashMap<String, Vec<SourceNode>>,
    page_size: usize,
    failing_exports: HashSet<String>,
    /// folder id -> index of the listing page that fails
    failing_listings: HashMap<String, usize>,
    log: Arc<Mutex<Vec<SourceCall>>>,
}

impl MockSource {
    pub fn new(page_size: usize) -> Self {
        Self {
            children: HashMap::new(),
            page_size,
            failing_exports: HashSet::new(),
            failing_listings: HashMap::new(),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_children(mut self, folder_id: &str, children: Vec<SourceNode>) -> Self {
        self.children.insert(folder_id.to_string(), children);
        self
    }

    pub fn fail_export(mut self, id: &str) -> Self {
        self.failing_exports.insert(id.to_string());
        self
    }

    pub fn fail_listing_page(mut self, folder_id: &str, page_index: usize) -> Self {
        self.failing_listings.insert(folder_id.to_string(), page_index);
        self
    }

    pub fn log(&self) -> Arc<Mutex<Vec<SourceCall>>> {
        self.log.clone()
    }

    fn record(&self, call: SourceCall) {
        self.log.lock().unwrap().push(call);
    }
}

#[async_trait]
impl SourceClient for MockSource {
    async fn list_children(&self, folder_id: &str, page_token: Option<&str>) -> Result<ChildPage> {
        self.record(SourceCall::List {
            folder_id: folder_id.to_string(),
            page_token: page_token.map(str::to_string),
        });

        let offset: usize = page_token.map(|t| t.parse().unwrap()).unwrap_or(0);
        if let Some(&failing) = self.failing_listings.get(folder_id) {
            if offset / self.page_size == failing {
                anyhow::bail!("listing of {} failed at offset {}", folder_id, offset);
            }
        }

        let all = self.children.get(folder_id).cloned().unwrap_or_default();
        let end = (offset + self.page_size).min(all.len());
        let items = all[offset.min(all.len())..end].to_vec();
        let next_page_token = (end < all.len()).then(|| end.to_string());

        Ok(ChildPage {
            items,
            next_page_token,
        })
    }

    async fn get_metadata(&self, id: &str) -> Result<SourceNode> {
        self.record(SourceCall::Metadata { id: id.to_string() });
        anyhow::bail!("metadata lookups are not expected during traversal")
    }

    async fn export_content(&self, id: &str, mime_type: &str) -> Result<Vec<u8>> {
        self.record(SourceCall::Export {
            id: id.to_string(),
            mime_type: mime_type.to_string(),
        });
        if self.failing_exports.contains(id) {
            anyhow::bail!("export of {} failed", id);
        }
        Ok(format!("docx bytes of {}", id).into_bytes())
    }
}

/// Calls seen by the mock target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetCall {
    CreatePage {
        space_key: String,
        title: String,
        parent_id: Option<String>,
    },
    UpdatePageBody {
        space_key: String,
        page_id: String,
        title: String,
        body: String,
    },
    AddComment {
        page_id: String,
        text: String,
    },
    UploadAttachment {
        page_id: String,
        file_name: String,
        comment: String,
    },
    BeginImport {
        page_id: String,
        file_name: String,
    },
    FinalizeImport {
        page_id: String,
        title: String,
        depth: u32,
        level: u32,
    },
}

#[derive(Default)]
struct TargetBehavior {
    rejected_titles: HashSet<String>,
    existing_titles: HashSet<String>,
    lost_responses: HashSet<String>,
    transient_create_failures: usize,
    creation_status: Option<u16>,
    fail_comments: bool,
    cancel_after_pages: Option<(usize, CancelFlag)>,
}

/// In-memory wiki handing out ids "p1", "p2", ...
///
/// Like the real wiki, a title that already exists is answered without an id.
pub struct MockTarget {
    behavior: Mutex<TargetBehavior>,
    created: Mutex<usize>,
    log: Arc<Mutex<Vec<TargetCall>>>,
}

impl MockTarget {
    pub fn new() -> Self {
        Self {
            behavior: Mutex::new(TargetBehavior::default()),
            created: Mutex::new(0),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answer creation of this exact title without an id
    pub fn reject_title(self, title: &str) -> Self {
        self.behavior
            .lock()
            .unwrap()
            .rejected_titles
            .insert(title.to_string());
        self
    }

    /// Create the page for this title once, then answer 503 anyway
    pub fn lose_response_for(self, title: &str) -> Self {
        self.behavior
            .lock()
            .unwrap()
            .lost_responses
            .insert(title.to_string());
        self
    }

    /// Fail every creation with this status
    pub fn fail_creation_with(self, status: u16) -> Self {
        self.behavior.lock().unwrap().creation_status = Some(status);
        self
    }

    /// Fail the first `n` creations with a 503
    pub fn unavailable_for(self, n: usize) -> Self {
        self.behavior.lock().unwrap().transient_create_failures = n;
        self
    }

    pub fn fail_comments(self) -> Self {
        self.behavior.lock().unwrap().fail_comments = true;
        self
    }

    /// Trip the cancel flag once `n` pages exist
    pub fn cancel_after(self, n: usize, flag: CancelFlag) -> Self {
        self.behavior.lock().unwrap().cancel_after_pages = Some((n, flag));
        self
    }

    pub fn log(&self) -> Arc<Mutex<Vec<TargetCall>>> {
        self.log.clone()
    }

    fn record(&self, call: TargetCall) {
        self.log.lock().unwrap().push(call);
    }
}

#[async_trait]
impl TargetClient for MockTarget {
    async fn create_page(
        &self,
        space_key: &str,
        title: &str,
        parent_id: Option<&str>,
    ) -> Result<Option<String>> {
        self.record(TargetCall::CreatePage {
            space_key: space_key.to_string(),
            title: title.to_string(),
            parent_id: parent_id.map(str::to_string),
        });

        let mut behavior = self.behavior.lock().unwrap();
        if let Some(status) = behavior.creation_status {
            return Err(RemoteError::Status {
                service: "wiki",
                status,
                body: "denied".to_string(),
            }
            .into());
        }
        if behavior.transient_create_failures > 0 {
            behavior.transient_create_failures -= 1;
            return Err(RemoteError::Status {
                service: "wiki",
                status: 503,
                body: "unavailable".to_string(),
            }
            .into());
        }
        if behavior.rejected_titles.contains(title) || behavior.existing_titles.contains(title) {
            return Ok(None);
        }

        let mut created = self.created.lock().unwrap();
        *created += 1;
        behavior.existing_titles.insert(title.to_string());
        if let Some((n, flag)) = &behavior.cancel_after_pages {
            if *created >= *n {
                flag.cancel();
            }
        }

        if behavior.lost_responses.remove(title) {
            return Err(RemoteError::Status {
                service: "wiki",
                status: 503,
                body: "gateway timeout".to_string(),
            }
            .into());
        }
        Ok(Some(format!("p{}", *created)))
    }

    async fn update_page_body(
        &self,
        space_key: &str,
        page_id: &str,
        title: &str,
        body: &str,
    ) -> Result<()> {
        self.record(TargetCall::UpdatePageBody {
            space_key: space_key.to_string(),
            page_id: page_id.to_string(),
            title: title.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    async fn add_comment(&self, page_id: &str, text: &str) -> Result<()> {
        self.record(TargetCall::AddComment {
            page_id: page_id.to_string(),
            text: text.to_string(),
        });
        if self.behavior.lock().unwrap().fail_comments {
            anyhow::bail!("comments are disabled on {}", page_id);
        }
        Ok(())
    }

    async fn upload_attachment(
        &self,
        page_id: &str,
        file_name: &str,
        _bytes: Vec<u8>,
        comment: &str,
    ) -> Result<()> {
        self.record(TargetCall::UploadAttachment {
            page_id: page_id.to_string(),
            file_name: file_name.to_string(),
            comment: comment.to_string(),
        });
        Ok(())
    }

    async fn begin_document_import(
        &self,
        page_id: &str,
        file_name: &str,
        _bytes: Vec<u8>,
    ) -> Result<()> {
        self.record(TargetCall::BeginImport {
            page_id: page_id.to_string(),
            file_name: file_name.to_string(),
        });
        Ok(())
    }

    async fn finalize_document_import(
        &self,
        page_id: &str,
        title: &str,
        depth: u32,
        level: u32,
    ) -> Result<()> {
        self.record(TargetCall::FinalizeImport {
            page_id: page_id.to_string(),
            title: title.to_string(),
            depth,
            level,
        });
        Ok(())
    }
}

/// Migrator over the mocks with no retries and a fixed import date
pub fn migrator(source: MockSource, target: MockTarget) -> Migrator {
    Migrator::new(Box::new(source), Box::new(target))
        .with_retry(RetryPolicy::none())
        .with_import_date(import_date())
}

/// Titles of all creation attempts, in order
pub fn created_titles(log: &Arc<Mutex<Vec<TargetCall>>>) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .filter_map(|call| match call {
            TargetCall::CreatePage { title, .. } => Some(title.clone()),
            _ => None,
        })
        .collect()
}
