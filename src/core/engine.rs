//! Migration engine.
//!
//! Walks the source tree depth-first from a root node, creating one wiki
//! page per node and transferring content according to the content type
//! policy. Traversal uses an explicit stack of frames rather than recursion,
//! so a deep or cyclic tree is bounded by the run's limits instead of the
//! call stack.
//!
//! Failures are contained per node: a node whose page cannot be created is
//! abandoned with its subtree, and a failed content transfer is recorded
//! without affecting siblings or ancestors. Only a root page that cannot be
//! created fails the run.
//!
//! Page creation is not idempotent. The disambiguated fallback title is only
//! tried after a clean "no id" answer; if an earlier attempt failed in a way
//! that may have created the page, the node is abandoned instead.

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::adapters::{SourceClient, TargetClient};
use crate::domain::node::MIME_WORD_DOCX;
use crate::domain::{
    disambiguated_title, provenance_comment, MigrationFault, MigrationReport, SkipReason,
    SourceNode, StopReason, TargetPage,
};

use super::limits::{LimitTracker, MigrationLimits};
use super::policy::{classify, Action, EmbedKind};
use super::retry::{is_transient, with_retry, RetryPolicy};
use super::templates::Templates;

/// Depth and level passed to the legacy importer
const IMPORT_TREE_DEPTH: u32 = 0;
const IMPORT_LEVEL: u32 = 0;

/// Shared flag checked between node visits
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the running migration to stop after the current node
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Failure that prevented any progress
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("page for root '{name}' ({id}) could not be created: {fault}")]
    RootPageNotCreated {
        id: String,
        name: String,
        fault: MigrationFault,
    },
}

/// One pending visit: a node and the page it goes under
#[derive(Debug, Clone)]
struct Frame {
    node: SourceNode,
    parent_id: Option<String>,
    depth: u32,
}

/// Result of one creation request, after retries
enum Creation {
    Created(String),
    /// The wiki answered without an id
    Rejected,
    /// A retried request may have created the page before failing
    Uncertain,
    Failed(anyhow::Error),
}

/// Drive-to-wiki migration engine
pub struct Migrator {
    source: Box<dyn SourceClient>,
    target: Box<dyn TargetClient>,
    templates: Templates,
    limits: MigrationLimits,
    retry: RetryPolicy,
    attach_exports: bool,
    import_date: NaiveDate,
    cancel: CancelFlag,
}

impl Migrator {
    /// Create a migrator with default limits, retry policy and templates
    pub fn new(source: Box<dyn SourceClient>, target: Box<dyn TargetClient>) -> Self {
        Self {
            source,
            target,
            templates: Templates::builtin(),
            limits: MigrationLimits::default(),
            retry: RetryPolicy::default(),
            attach_exports: false,
            import_date: Local::now().date_naive(),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_templates(mut self, templates: Templates) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_limits(mut self, limits: MigrationLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Also attach the exported DOCX to imported pages
    pub fn with_attach_exports(mut self, attach: bool) -> Self {
        self.attach_exports = attach;
        self
    }

    /// Date used in disambiguated titles
    pub fn with_import_date(mut self, date: NaiveDate) -> Self {
        self.import_date = date;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle for cancelling a running migration
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Migrate `root` and everything below it under `parent_id` in `space_key`.
    ///
    /// Without a parent the root page is created at the top level of the
    /// space. The root's metadata is taken as given. Returns the run report
    /// even when individual nodes failed; fails only if the root page itself
    /// could not be created.
    #[instrument(skip(self, root), fields(root_id = %root.id))]
    pub async fn migrate(
        &self,
        root: SourceNode,
        space_key: &str,
        parent_id: Option<&str>,
    ) -> Result<MigrationReport, MigrationError> {
        info!(name = %root.name, "Starting migration");

        let mut report = MigrationReport::new(root.id.clone(), space_key);
        let mut tracker = LimitTracker::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut stack = vec![Frame {
            node: root,
            parent_id: parent_id.map(str::to_string),
            depth: 0,
        }];

        while let Some(frame) = stack.pop() {
            if self.cancel.is_cancelled() {
                warn!(pending = stack.len() + 1, "Migration cancelled");
                report.stopped = Some(StopReason::Cancelled);
                stack.push(frame);
                break;
            }

            if let Err(violation) = self.limits.check(&tracker) {
                error!(%violation, "Limit reached, stopping migration");
                report.stopped = Some(StopReason::LimitReached {
                    limit: violation.to_string(),
                });
                stack.push(frame);
                break;
            }

            if frame.depth > 0 && self.limits.is_excluded(&frame.node.name) {
                info!(id = %frame.node.id, name = %frame.node.name, "Excluded by pattern");
                report.record_skip(&frame.node, SkipReason::Excluded);
                continue;
            }

            if !visited.insert(frame.node.id.clone()) {
                warn!(id = %frame.node.id, name = %frame.node.name, "Node already visited, skipping");
                report.record_fault(&frame.node, MigrationFault::AlreadyVisited);
                continue;
            }

            tracker.record_visit();
            let is_root = frame.depth == 0;
            let root_ref = is_root.then(|| (frame.node.id.clone(), frame.node.name.clone()));

            match self.visit(frame, space_key, &mut report).await {
                Ok(children) => {
                    // Reversed so children pop in listing order
                    stack.extend(children.into_iter().rev());
                }
                Err(fault) => {
                    if let Some((id, name)) = root_ref {
                        report.finish();
                        return Err(MigrationError::RootPageNotCreated { id, name, fault });
                    }
                }
            }
        }

        // Only non-empty after an early stop; listed in the order they would have run
        for frame in stack.iter().rev() {
            report.record_pending(&frame.node, frame.parent_id.as_deref(), frame.depth);
        }

        report.finish();
        info!(summary = %report.summary(), "Migration finished");
        Ok(report)
    }

    /// Migrate a single node. Returns the child frames to visit, or the
    /// fault that kept its page from being created.
    async fn visit(
        &self,
        frame: Frame,
        space_key: &str,
        report: &mut MigrationReport,
    ) -> Result<Vec<Frame>, MigrationFault> {
        let Frame {
            node,
            parent_id,
            depth,
        } = frame;
        info!(id = %node.id, name = %node.name, mime_type = %node.mime_type, depth, "Migrating node");

        let page = match self.create_page(&node, space_key, parent_id.as_deref()).await {
            Ok(page) => page,
            Err(fault) => {
                error!(id = %node.id, name = %node.name, %fault, "Page could not be created, abandoning node");
                report.record_fault(&node, fault.clone());
                return Err(fault);
            }
        };
        debug!(page_id = %page.id, title = %page.title, "Page created");
        report.record_page(page.clone());

        if let Err(e) = self.annotate(&node, &page).await {
            warn!(page_id = %page.id, error = %e, "Provenance comment failed");
            report.record_fault(
                &node,
                MigrationFault::Annotation {
                    error: format!("{:#}", e),
                },
            );
        }

        let action = classify(&node.mime_type);
        debug!(id = %node.id, %action, "Classified");

        let outcome = match action {
            Action::Recurse => return Ok(self.child_frames(&node, &page, depth, report).await),
            Action::ImportDocument => self.import_document(&node, &page).await,
            Action::EmbedContent(kind) => self.embed_content(&node, &page, kind).await,
            Action::Skip => {
                info!(id = %node.id, mime_type = %node.mime_type, "Unsupported type, page left empty");
                report.record_skip(&node, SkipReason::UnsupportedType);
                Ok(())
            }
        };

        if let Err(e) = outcome {
            warn!(id = %node.id, %action, error = %e, "Content transfer failed");
            report.record_fault(
                &node,
                MigrationFault::ContentTransfer {
                    error: format!("{:#}", e),
                },
            );
        }

        Ok(Vec::new())
    }

    /// Run a remote call with the configured retry policy and timeout
    async fn call<T, F, Fut>(&self, operation: &str, f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        with_retry(&self.retry, self.limits.request_timeout(), operation, f).await
    }

    /// Create the node's page, falling back once to a disambiguated title
    async fn create_page(
        &self,
        node: &SourceNode,
        space_key: &str,
        parent_id: Option<&str>,
    ) -> Result<TargetPage, MigrationFault> {
        let mut title = node.name.clone();
        let mut creation = self.try_create_page(space_key, &title, parent_id).await;

        if let Creation::Rejected = creation {
            title = disambiguated_title(&node.name, self.import_date);
            info!(id = %node.id, %title, "Title rejected, retrying with disambiguated title");
            creation = self.try_create_page(space_key, &title, parent_id).await;
        }

        match creation {
            Creation::Created(id) => Ok(TargetPage {
                id,
                space_key: space_key.to_string(),
                title,
                parent_id: parent_id.map(str::to_string),
                source_id: node.id.clone(),
            }),
            Creation::Rejected => Err(MigrationFault::PageCreation {
                title: node.name.clone(),
            }),
            Creation::Uncertain => Err(MigrationFault::AmbiguousPageCreation { title }),
            Creation::Failed(e) => Err(MigrationFault::PageCreationFailed {
                title,
                error: format!("{:#}", e),
            }),
        }
    }

    async fn try_create_page(
        &self,
        space_key: &str,
        title: &str,
        parent_id: Option<&str>,
    ) -> Creation {
        let mut attempts = 0u32;
        let result = self
            .call("create_page", || {
                attempts += 1;
                self.target.create_page(space_key, title, parent_id)
            })
            .await;
        // Retries only follow failures that may have reached the wiki
        let retried = attempts > 1;

        match result {
            Ok(Some(id)) if !id.is_empty() => Creation::Created(id),
            Ok(_) if retried => {
                warn!(%title, attempts, "No id after a failed attempt, page may already exist");
                Creation::Uncertain
            }
            Ok(_) => Creation::Rejected,
            Err(e) if retried || is_transient(&e) => {
                warn!(%title, attempts, error = %e, "Page creation failed, page may already exist");
                Creation::Uncertain
            }
            Err(e) => {
                warn!(%title, error = %e, "Page creation failed");
                Creation::Failed(e)
            }
        }
    }

    async fn annotate(&self, node: &SourceNode, page: &TargetPage) -> Result<()> {
        let comment = provenance_comment(&node.web_view_link);
        self.call("add_comment", || self.target.add_comment(&page.id, &comment))
            .await
    }

    /// List every child of a folder and turn them into frames under `page`
    async fn child_frames(
        &self,
        node: &SourceNode,
        page: &TargetPage,
        depth: u32,
        report: &mut MigrationReport,
    ) -> Vec<Frame> {
        let children = self.list_all_children(node, report).await;
        if children.is_empty() {
            return Vec::new();
        }

        let child_depth = depth + 1;
        if !self.limits.allows_depth(child_depth) {
            warn!(id = %node.id, depth = child_depth, "Depth limit reached, children not visited");
            report.record_fault(
                node,
                MigrationFault::DepthLimit {
                    limit: self.limits.max_depth,
                },
            );
            return Vec::new();
        }

        children
            .into_iter()
            .map(|child| Frame {
                node: child,
                parent_id: Some(page.id.clone()),
                depth: child_depth,
            })
            .collect()
    }

    /// Follow continuation tokens until the listing is exhausted.
    ///
    /// A failed page ends pagination for this folder; whatever was listed
    /// before the failure is still returned.
    async fn list_all_children(
        &self,
        node: &SourceNode,
        report: &mut MigrationReport,
    ) -> Vec<SourceNode> {
        let mut children = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let token = page_token.as_deref();
            let result = self
                .call("list_children", || self.source.list_children(&node.id, token))
                .await;

            match result {
                Ok(page) => {
                    debug!(id = %node.id, count = page.items.len(), "Listed children page");
                    children.extend(page.items);
                    match page.next_page_token {
                        Some(next) if !next.is_empty() => page_token = Some(next),
                        _ => break,
                    }
                }
                Err(e) => {
                    warn!(id = %node.id, listed = children.len(), error = %e, "Listing failed, stopping pagination");
                    report.record_fault(
                        node,
                        MigrationFault::Listing {
                            listed: children.len(),
                            error: format!("{:#}", e),
                        },
                    );
                    break;
                }
            }
        }

        info!(id = %node.id, children = children.len(), "Folder listed");
        children
    }

    /// Export as DOCX and run the two-phase import
    async fn import_document(&self, node: &SourceNode, page: &TargetPage) -> Result<()> {
        let bytes = self
            .call("export_content", || {
                self.source.export_content(&node.id, MIME_WORD_DOCX)
            })
            .await
            .context("Export failed")?;
        let file_name = node.export_file_name();

        if self.attach_exports {
            let comment = provenance_comment(&node.web_view_link);
            self.call("upload_attachment", || {
                self.target
                    .upload_attachment(&page.id, &file_name, bytes.clone(), &comment)
            })
            .await
            .context("Attachment upload failed")?;
        }

        self.call("begin_document_import", || {
            self.target
                .begin_document_import(&page.id, &file_name, bytes.clone())
        })
        .await
        .context("Import upload failed")?;

        self.call("finalize_document_import", || {
            self.target.finalize_document_import(
                &page.id,
                &node.name,
                IMPORT_TREE_DEPTH,
                IMPORT_LEVEL,
            )
        })
        .await
        .context("Import finalize failed")?;

        info!(id = %node.id, page_id = %page.id, "Document imported");
        Ok(())
    }

    /// Replace the page body with the rendered embed template
    async fn embed_content(&self, node: &SourceNode, page: &TargetPage, kind: EmbedKind) -> Result<()> {
        let body = self.templates.render(kind, &node.id);

        self.call("update_page_body", || {
            self.target
                .update_page_body(&page.space_key, &page.id, &page.title, &body)
        })
        .await
        .context("Embed update failed")?;

        info!(id = %node.id, page_id = %page.id, ?kind, "Content embedded");
        Ok(())
    }
}
