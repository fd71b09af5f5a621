//! site-drafts: inspect and clear the per-project draft store
//!
//! Usage:
//!   site-drafts list                          # Contexts holding drafts
//!   site-drafts show NA/1234                  # Drafts of one project as JSON
//!   site-drafts clear NA/1234 --tab contacts  # Drop one tab's draft
//!   site-drafts clear-all                     # Wipe every draft

use clap::Parser;
use site_drafts::cli::{DraftsArgs, DraftsCommand};
use site_drafts::config::ConsoleConfig;
use site_drafts::draft::{ContextKey, DraftStore, KeyResolver};
use site_drafts::form::MemoryForm;
use site_drafts::tab::Tab;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    let args = DraftsArgs::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(args) {
        tracing::error!("[drafts] {}", e);
        std::process::exit(1);
    }
}

fn run(args: DraftsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match args.config {
        Some(ref path) => ConsoleConfig::load(path)?,
        None => ConsoleConfig::default(),
    };
    if let Some(backend) = args.backend {
        config.storage.backend = backend;
    }
    if let Some(path) = args.path {
        config.storage.path = Some(path);
    }
    if let Some(key) = args.storage_key {
        config.storage_key = key;
    }

    tracing::debug!(
        "[drafts] Opening {:?} storage at {}",
        config.storage.backend,
        config.storage.resolved_path().display()
    );
    let storage = config.storage.open()?;
    // Every command names its context explicitly; the form only backs the resolver.
    let resolver = KeyResolver::new(Arc::new(MemoryForm::new()));
    let store = DraftStore::with_storage_key(storage, resolver, config.storage_key);

    match args.command {
        DraftsCommand::List => {
            for key in store.contexts() {
                let entries = store.entries_in(&key);
                let tabs: Vec<&str> = entries.keys().map(|t| t.as_str()).collect();
                let latest = entries.values().map(|e| e.timestamp).max();
                match latest {
                    Some(ts) => println!("{}\t{}\t{}", key, tabs.join(","), ts.to_rfc3339()),
                    None => println!("{}", key),
                }
            }
        }
        DraftsCommand::Show { context } => {
            let key = ContextKey::new(context);
            let entries: BTreeMap<&str, _> = store
                .entries_in(&key)
                .into_iter()
                .map(|(tab, entry)| (tab.as_str(), entry))
                .collect();
            if entries.is_empty() {
                tracing::info!("[drafts] No drafts for {}", key);
            }
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        DraftsCommand::Clear { context, tab } => {
            let key = ContextKey::new(context);
            match tab {
                Some(name) => {
                    let tab: Tab = name.parse()?;
                    store.clear_tab_of(&key, tab);
                    tracing::info!("[drafts] Cleared {} draft of {}", tab, key);
                }
                None => {
                    store.clear_context_of(&key);
                    tracing::info!("[drafts] Cleared drafts of {}", key);
                }
            }
        }
        DraftsCommand::ClearAll => {
            store.clear_all();
            tracing::info!("[drafts] Cleared all drafts");
        }
    }
    Ok(())
}
