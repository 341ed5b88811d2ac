//! Command-line interface for drivewiki.
//!
//! Provides commands for migrating a Drive folder tree, inspecting a single
//! Drive item, and showing the resolved configuration.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::adapters::{ConfluenceClient, DriveClient, DryRunTarget, SourceClient, TargetClient};
use crate::config::Config;
use crate::core::{classify, with_retry, Migrator, Templates};
use crate::domain::{MigrationReport, SkipReason};

/// drivewiki - migrate Google Drive folders into Confluence
#[derive(Parser, Debug)]
#[command(name = "drivewiki")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Migrate a Drive item and everything below it
    Migrate {
        /// Drive id of the root folder or file
        #[arg(long)]
        root: String,

        /// Target space key
        #[arg(long)]
        space: String,

        /// Id of the page the root is created under (top level of the space if omitted)
        #[arg(long)]
        parent: Option<String>,

        /// Walk the source tree without writing to the wiki
        #[arg(long)]
        dry_run: bool,

        /// Write the run report as JSON to this path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Override the maximum folder depth
        #[arg(long)]
        max_depth: Option<u32>,

        /// Override the maximum number of nodes visited
        #[arg(long)]
        max_nodes: Option<u32>,

        /// Skip items whose name matches this glob (repeatable)
        #[arg(long = "exclude")]
        exclude: Vec<String>,

        /// Also attach exported documents to their pages
        #[arg(long)]
        attach_exports: bool,
    },

    /// Show a Drive item's metadata and what a migration would do with it
    Inspect {
        /// Drive id
        id: String,
    },

    /// Show resolved configuration (secrets masked)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Migrate {
                root,
                space,
                parent,
                dry_run,
                report,
                max_depth,
                max_nodes,
                exclude,
                attach_exports,
            } => {
                let overrides = MigrateOverrides {
                    max_depth,
                    max_nodes,
                    exclude,
                    attach_exports,
                };
                migrate(&root, &space, parent.as_deref(), dry_run, report, overrides).await
            }
            Commands::Inspect { id } => inspect(&id).await,
            Commands::Config => show_config(),
        }
    }
}

/// Command-line overrides applied on top of the loaded configuration
struct MigrateOverrides {
    max_depth: Option<u32>,
    max_nodes: Option<u32>,
    exclude: Vec<String>,
    attach_exports: bool,
}

fn drive_client(config: &Config) -> Result<DriveClient> {
    DriveClient::new(
        config.drive_api_url.clone(),
        config.drive_token()?,
        config.limits.page_size,
        config.limits.request_timeout(),
    )
}

async fn fetch_metadata(config: &Config, drive: &DriveClient, id: &str) -> Result<crate::domain::SourceNode> {
    with_retry(&config.retry, config.limits.request_timeout(), "get_metadata", || {
        drive.get_metadata(id)
    })
    .await
    .with_context(|| format!("Failed to fetch metadata for root {}", id))
}

/// Run a migration
async fn migrate(
    root_id: &str,
    space: &str,
    parent: Option<&str>,
    dry_run: bool,
    report_path: Option<PathBuf>,
    overrides: MigrateOverrides,
) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(depth) = overrides.max_depth {
        config.limits.max_depth = depth;
    }
    if let Some(nodes) = overrides.max_nodes {
        config.limits.max_nodes = nodes;
    }
    config.limits.exclude_patterns.extend(overrides.exclude);
    config.validate()?;
    let attach_exports = config.attach_exports || overrides.attach_exports;

    // Fail fast on missing credentials before touching either service
    let drive = drive_client(&config)?;
    let target: Box<dyn TargetClient> = if dry_run {
        info!("Dry run: nothing will be written to the wiki");
        Box::new(DryRunTarget::new())
    } else {
        Box::new(ConfluenceClient::new(
            config.wiki_settings()?,
            config.limits.request_timeout(),
        )?)
    };

    let templates = match config.templates_dir {
        Some(ref dir) => Templates::load(dir)?,
        None => Templates::builtin(),
    };

    let root = fetch_metadata(&config, &drive, root_id).await?;

    let migrator = Migrator::new(Box::new(drive), target)
        .with_templates(templates)
        .with_limits(config.limits.clone())
        .with_retry(config.retry.clone())
        .with_attach_exports(attach_exports);

    let cancel = migrator.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current item");
            cancel.cancel();
        }
    });

    let report = migrator.migrate(root, space, parent).await?;

    print_report(&report);

    if let Some(path) = report_path {
        report.write_json(&path).await?;
        eprintln!("Report written to {}", path.display());
    }

    Ok(())
}

/// Print the run summary with every skipped and failed node
fn print_report(report: &MigrationReport) {
    if !report.skipped.is_empty() {
        println!("Skipped:");
        for skipped in &report.skipped {
            let reason = match skipped.reason {
                SkipReason::UnsupportedType => format!("unsupported type {}", skipped.mime_type),
                SkipReason::Excluded => "excluded".to_string(),
            };
            println!("  {} ({}): {}", skipped.node_name, skipped.node_id, reason);
        }
    }

    if report.has_faults() {
        println!("Faults:");
        for fault in &report.faults {
            println!("  {} ({}): {}", fault.node_name, fault.node_id, fault.fault);
        }
    }

    if !report.pending.is_empty() {
        println!("Not visited (resume each with --root <id> --parent <page>):");
        for pending in &report.pending {
            println!(
                "  {} ({}) under {}",
                pending.node_name,
                pending.node_id,
                pending.parent_id.as_deref().unwrap_or("(space top level)")
            );
        }
    }

    eprintln!("\n[Run {}: {}]", report.run_id, report.summary());
}

/// Show a Drive item and the action it maps to
async fn inspect(id: &str) -> Result<()> {
    let config = Config::load()?;
    let drive = drive_client(&config)?;
    let node = fetch_metadata(&config, &drive, id).await?;

    println!("Id:        {}", node.id);
    println!("Name:      {}", node.name);
    println!("Type:      {}", node.mime_type);
    println!("Link:      {}", node.web_view_link);
    println!("Action:    {}", classify(&node.mime_type));
    if config.limits.is_excluded(&node.name) {
        println!("Excluded:  yes (matches an exclude pattern)");
    }

    Ok(())
}

fn mask(value: Option<&str>) -> &'static str {
    match value {
        Some(v) if !v.is_empty() => "********",
        _ => "(not set)",
    }
}

/// Show resolved configuration
fn show_config() -> Result<()> {
    let config = Config::load()?;

    println!("drivewiki configuration");
    println!("=======================");
    println!();
    match &config.config_file {
        Some(path) => println!("Config file:     {}", path.display()),
        None => println!("Config file:     (none found, using environment and defaults)"),
    }
    println!("Development:     {}", config.development);
    println!();
    println!("Wiki URL:        {}", config.wiki_base_url.as_deref().unwrap_or("(not set)"));
    println!("Wiki user:       {}", config.wiki_user.as_deref().unwrap_or("(not set)"));
    println!("Wiki password:   {}", mask(config.wiki_password.as_deref()));
    println!("Session cookie:  {}", mask(Some(config.wiki_session_cookie.as_str())));
    println!("Drive API:       {}", config.drive_api_url);
    println!("Drive token:     {}", mask(config.drive_access_token.as_deref()));
    println!();
    println!("Max depth:       {}", config.limits.max_depth);
    println!("Max nodes:       {}", config.limits.max_nodes);
    println!("Page size:       {}", config.limits.page_size);
    println!("Call timeout:    {}s", config.limits.request_timeout_seconds);
    println!("Retry attempts:  {}", config.retry.max_attempts);
    if !config.limits.exclude_patterns.is_empty() {
        println!("Exclude:         {}", config.limits.exclude_patterns.join(", "));
    }
    match &config.templates_dir {
        Some(dir) => println!("Templates:       {}", dir.display()),
        None => println!("Templates:       (built-in)"),
    }
    println!("Attach exports:  {}", config.attach_exports);

    Ok(())
}
