//! CLI entry point for the coursesync tool.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::Parser;
use coursesync_core::{RestClient, SyncContext, SyncError, WritePool, run_pass};
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");
    info!("Coursesync starting");

    let token = match args.token {
        Some(token) => token,
        None => std::env::var("COURSESYNC_TOKEN")
            .context("no access token: pass --token or set COURSESYNC_TOKEN")?,
    };

    let last_sync = args
        .since
        .as_deref()
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|parsed| parsed.with_timezone(&Utc))
                .with_context(|| format!("--since is not a valid RFC 3339 instant: {raw}"))
        })
        .transpose()?;

    let client = RestClient::new(&args.base_url, &token)?;
    let ctx = SyncContext::new(Arc::new(client), last_sync);
    let pool = WritePool::new(usize::from(args.concurrency))?;

    let join_timeout = (args.join_timeout > 0).then(|| Duration::from_secs(args.join_timeout));

    let mut failed_files = 0usize;
    for course_id in &args.courses {
        let destination = args.output.join(course_id);

        match run_pass(&ctx, &pool, course_id, &destination, join_timeout).await {
            Ok(result) => failed_files += result.failed_files,
            Err(SyncError::SessionExpired) => {
                bail!("session expired; re-authenticate and run the pass again")
            }
            Err(SyncError::Api(error)) => {
                warn!(course_id, error = %error, "course could not be synced");
                failed_files += 1;
            }
        }
    }

    info!(
        courses = args.courses.len(),
        failed_files, "Sync complete"
    );
    if failed_files > 0 {
        info!("failed files will be retried on the next pass");
    }

    Ok(())
}
