//! fb-lark-sync — upsert Facebook Page posts into a Lark Bitable table.
//!
//! Each run fetches the Page's posts for a date window, indexes the table's
//! existing records by post id, and issues batched creates for new posts and
//! batched updates for known ones. Runs are one-shot and keep no local state,
//! so schedule them from cron or a systemd timer, one at a time per table.

#![warn(clippy::all)]

mod cli;
mod config;
mod facebook;
mod http;
mod lark;
mod outcome;
mod pacing;
mod shutdown;
mod sync;
#[cfg(test)]
mod test_support;
mod types;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use facebook::GraphClient;
use http::HttpSession;
use lark::{Bitable, Endpoints, LarkAuth};
use outcome::RunStatus;
use sync::{Reconciler, SyncReport};

fn print_summary(report: &SyncReport) {
    println!("Sync window starts {}", report.since);
    println!("Posts fetched: {}", report.fetched);
    if !report.source.is_complete() {
        println!("Post fetch: {}", report.source);
    }
    if let Some(upsert) = &report.upsert {
        let (created, updated) = (report.created(), report.updated());
        println!("Result: {created} created, {updated} updated");
        println!("Total: {}/{} records", created + updated, report.fetched);
        let planned = upsert.planned_creates + upsert.planned_updates;
        if created + updated < planned {
            println!(
                "Planned: {} to create, {} to update",
                upsert.planned_creates, upsert.planned_updates
            );
        }
    }
    println!("Status: {}", report.status);
}

/// Process outcome for a finished run. Partial and failed runs exit 0 unless
/// `strict_exit` is set; the status is always logged and printed.
fn finish(status: RunStatus, strict_exit: bool) -> anyhow::Result<()> {
    match status {
        RunStatus::Complete => Ok(()),
        RunStatus::Partial(reason) => {
            tracing::warn!("Sync incomplete: {}", reason);
            if strict_exit {
                anyhow::bail!("Sync incomplete: {reason}");
            }
            Ok(())
        }
        RunStatus::Failed(reason) => {
            tracing::error!("Sync failed: {}", reason);
            if strict_exit {
                anyhow::bail!("Sync failed: {reason}");
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let config = config::Config::from_cli(cli)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_filter())),
        )
        .init();
    tracing::debug!(?config, "Loaded configuration");

    let client: Arc<dyn HttpSession> = Arc::new(http::build_client(config.timeout)?);
    let endpoints = Endpoints::for_domain(config.domain);
    let auth = LarkAuth::new(
        client.clone(),
        endpoints.clone(),
        config.lark_app_id.clone(),
        config.lark_app_secret.clone(),
    );

    if config.auth_only {
        auth.tenant_access_token().await?;
        tracing::info!("Lark credentials accepted");
        return Ok(());
    }

    let shutdown_token = shutdown::install_signal_handler()?;

    let source = GraphClient::new(
        client.clone(),
        config.graph_base.clone(),
        config.page_id.clone(),
        config.fb_access_token.clone(),
    )
    .with_page_size(config.fb_page_size)
    .with_shutdown(shutdown_token.clone());

    let bitable = Bitable::new(client, endpoints, config.fields.clone(), config.limits.clone())
        .with_shutdown(shutdown_token);

    let reconciler = Reconciler::new(source, auth, bitable).with_dry_run(config.dry_run);
    let report = reconciler
        .sync(&config.table, config.since, config.lookback_days)
        .await;

    print_summary(&report);

    finish(report.status, config.strict_exit)
}
