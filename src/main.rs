//! # News Harvest
//!
//! Builds a news-article dataset from RFI, BBC, DW and VOA regional editions.
//!
//! ## Modes
//!
//! - **Discovery** (`-c`): query Common Crawl index endpoints for every
//!   supported site and write `seeding_final_data.json`
//! - **Extraction** (`-s`): fetch every seed URL, extract title, headline,
//!   body, image and caption with per-site rules, and write one
//!   success/error pair of JSON files
//!
//! ## Usage
//!
//! ```sh
//! news_harvest -c common_crawl_index.json
//! news_harvest -s seeding_final_data.json -p 16 -r 2
//! ```
//!
//! ## Architecture
//!
//! 1. **Seeding**: load the batches (one per site identifier)
//! 2. **Canonicalizing**: rewrite AMP and aliased-host seed URLs
//! 3. **Fetching**: bounded concurrency, per-URL retry, identity rotation
//! 4. **Extracting**: per-site selector rules with layout fallbacks
//! 5. **Output**: batch documents plus `doc`/`http` error buckets
//!
//! Ctrl+C writes whatever the current batch has collected before exiting.

use clap::Parser;
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod assemble;
mod cli;
mod discovery;
mod error;
mod extract;
mod fetch;
mod harvest;
mod models;
mod outputs;
mod seeds;
mod sites;
mod utils;

use cli::Cli;
use fetch::{HttpFetcher, RetryFetch, Rotator, TorControl};
use harvest::{Harvester, Outcome};
use outputs::json::write_json;
use utils::setup_folders;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_harvest starting up");

    let args = Cli::parse();
    debug!(?args.index_file, ?args.seed_file, retry = args.retry, pool_size = args.pool_size, "Parsed CLI arguments");

    if args.index_file.is_none() && args.seed_file.is_none() {
        warn!("No seeding file was provided (use -c for discovery or -s for extraction)");
        return Ok(());
    }

    if let Err(e) = setup_folders(&args.seeding_dir, &args.output_dir).await {
        error!(
            seeding = %args.seeding_dir.display(),
            output = %args.output_dir.display(),
            error = %e,
            "Working directories are not usable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    let fetcher = HttpFetcher::new(args.proxy.as_deref(), Duration::from_secs(args.timeout_secs))?;

    if let Some(index_file) = &args.index_file {
        run_discovery(&args, &args.seeding_dir.join(index_file), fetcher).await?;
    } else if let Some(seed_file) = &args.seed_file {
        run_extraction(&args, &args.seeding_dir.join(seed_file), fetcher).await?;
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

async fn run_discovery(args: &Cli, index_path: &Path, fetcher: HttpFetcher) -> Result<(), Box<dyn Error>> {
    let sources = seeds::load_index_sources(index_path).await?;
    let seeds = discovery::discover_all(&fetcher, &sources, args.pool_size as usize).await;

    let output = args.seeding_dir.join(discovery::SEEDING_FILE_NAME);
    write_json(&seeds, &output).await?;
    info!(
        path = %output.display(),
        sites = seeds.len(),
        urls = seeds.values().map(Vec::len).sum::<usize>(),
        "Done saving seeding file"
    );
    Ok(())
}

async fn run_extraction(args: &Cli, seed_path: &Path, fetcher: HttpFetcher) -> Result<(), Box<dyn Error>> {
    let mut seeds = seeds::load_seeding(seed_path).await?;
    if let Some(sample) = args.sample {
        seeds = seeds::sample_batches(seeds, sample);
        info!(sample, "Sampled seed batches");
    }

    let rotator = match &args.tor_control {
        Some(addr) => {
            info!(%addr, "Identity rotation enabled");
            Rotator::Tor(TorControl::new(addr.clone(), args.tor_password.clone()))
        }
        None => Rotator::Disabled,
    };
    let fetcher = RetryFetch::new(
        fetcher,
        args.retry as usize,
        Duration::from_millis(args.retry_delay_ms),
    );
    let harvester = Harvester::new(
        seeds,
        fetcher,
        rotator,
        args.pool_size as usize,
        args.output_dir.clone(),
    )?;

    let stop = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => warn!("Stop script Ctrl+C"),
            Err(e) => {
                error!(error = %e, "Cannot listen for Ctrl+C; running without a stop path");
                std::future::pending::<()>().await;
            }
        }
    };

    match harvester.run_until(stop).await? {
        Outcome::Completed(files) => info!(
            success = %files.success.display(),
            error = %files.error.display(),
            "Harvest completed"
        ),
        Outcome::Interrupted(files) => warn!(
            success = %files.success.display(),
            error = %files.error.display(),
            "Harvest interrupted; partial batch saved"
        ),
    }
    Ok(())
}
