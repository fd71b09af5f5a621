//! Command-line arguments for the binaries.

use crate::api::{ExportFormat, SiteId};
use crate::config::StorageBackend;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "site-drafts")]
#[command(about = "Inspect and clear the per-project draft store")]
pub struct DraftsArgs {
    /// JSON config file
    #[arg(short, long, env = "SITE_DRAFTS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Storage backend, overriding the config
    #[arg(long)]
    pub backend: Option<StorageBackend>,

    /// Storage directory (file) or database path (redb), overriding the config
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Storage key of the draft document, overriding the config
    #[arg(long)]
    pub storage_key: Option<String>,

    #[command(subcommand)]
    pub command: DraftsCommand,
}

#[derive(Subcommand, Debug)]
pub enum DraftsCommand {
    /// List every project context holding drafts
    List,
    /// Print the drafts of one context as JSON
    Show {
        /// Context key, e.g. NA/1234 or _draft
        context: String,
    },
    /// Remove the drafts of one context
    Clear {
        context: String,
        /// Only this tab
        #[arg(long)]
        tab: Option<String>,
    },
    /// Remove every draft
    ClearAll,
}

#[derive(Parser, Debug)]
#[command(name = "site-export")]
#[command(about = "Download the site export archive")]
pub struct ExportArgs {
    /// JSON config file
    #[arg(short, long, env = "SITE_DRAFTS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Backend base URL, overriding the config
    #[arg(long, env = "SITE_API_URL")]
    pub server: Option<String>,

    /// Bearer token
    #[arg(long, env = "SITE_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Archive contents: both, xlsx or csv
    #[arg(long, default_value = "both")]
    pub format: ExportFormat,

    /// Export one site only
    #[arg(long)]
    pub site: Option<SiteId>,

    /// First day, YYYY-MM-DD
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last day, YYYY-MM-DD
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Leave photos out of the archive
    #[arg(long)]
    pub no_photos: bool,

    /// Output file
    #[arg(short, long, default_value = "export.zip")]
    pub output: PathBuf,
}
