//! site-export: download the backend's export archive
//!
//! The archive is written to disk as-is; its contents are never parsed.

use clap::Parser;
use site_drafts::api::{ExportQuery, HttpSiteApi};
use site_drafts::cli::ExportArgs;
use site_drafts::config::ConsoleConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let args = ExportArgs::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match args.config {
        Some(ref path) => match ConsoleConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("[export] Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => ConsoleConfig::default(),
    };

    let server = args.server.clone().unwrap_or(config.server_url.clone());
    let mut api = match HttpSiteApi::with_timeout(&server, config.request_timeout()) {
        Ok(api) => api,
        Err(e) => {
            tracing::error!("[export] Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(token) = args.token.clone().or(config.token.clone()) {
        api = api.with_token(token);
    }

    let query = ExportQuery {
        format: args.format,
        site: args.site,
        start_date: args.start,
        end_date: args.end,
        include_photos: !args.no_photos,
    };
    if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
        if start > end {
            tracing::error!("[export] Start date {} is after end date {}", start, end);
            std::process::exit(1);
        }
    }

    tracing::info!(
        "[export] Requesting {} export from {}",
        query.format.as_str(),
        api.base_url()
    );
    match api.download_export(&query, &args.output).await {
        Ok(bytes) => {
            tracing::info!(
                "[export] Wrote {} bytes to {}",
                bytes,
                args.output.display()
            );
        }
        Err(e) => {
            tracing::error!("[export] Export failed: {}", e.user_message());
            std::process::exit(1);
        }
    }
}
