//! Command-line interface definitions for the harvester.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Deployment-specific options (proxy, Tor control port) can also come from
//! environment variables.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the news harvester.
///
/// Exactly one mode runs per invocation: discovery (`-c`) builds a seeding
/// file from the Common Crawl index, extraction (`-s`) harvests the URLs of a
/// seeding file. Both files are read from `--seeding-dir`.
///
/// # Examples
///
/// ```sh
/// # Discover candidate URLs
/// news_harvest -c common_crawl_index.json
///
/// # Harvest 50 random URLs per site through Tor, 8 workers, 3 attempts each
/// news_harvest -s seeding_final_data.json -b 50 -p 8 -r 3 \
///     --proxy socks5h://127.0.0.1:9050 --tor-control 127.0.0.1:9051
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about = "Scrape RFI/DW/VOA/BBC articles")]
pub struct Cli {
    /// Index-source descriptor file (list of Common Crawl endpoints); runs discovery
    #[arg(short = 'c', conflicts_with = "seed_file")]
    pub index_file: Option<String>,

    /// Seeding file with candidate URLs per site; runs extraction
    #[arg(short = 's')]
    pub seed_file: Option<String>,

    /// Fetch attempts per URL before it is recorded as an HTTP failure
    #[arg(short = 'r', default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub retry: u32,

    /// Number of URLs processed concurrently
    #[arg(short = 'p', default_value_t = 16, value_parser = clap::value_parser!(u32).range(1..))]
    pub pool_size: u32,

    /// Randomly sample at most this many URLs per site
    #[arg(short = 'b')]
    pub sample: Option<usize>,

    /// Directory the index and seeding files are read from (discovery output goes here too)
    #[arg(long, default_value = "seeding")]
    pub seeding_dir: PathBuf,

    /// Directory harvested batches are written to
    #[arg(long, default_value = "content")]
    pub output_dir: PathBuf,

    /// Proxy for page fetches, e.g. socks5h://127.0.0.1:9050
    #[arg(long, env = "HARVEST_PROXY")]
    pub proxy: Option<String>,

    /// Tor control port address; enables identity rotation after every URL
    #[arg(long, env = "TOR_CONTROL_ADDR")]
    pub tor_control: Option<String>,

    /// Tor control port password
    #[arg(long, env = "TOR_CONTROL_PASSWORD", hide_env_values = true)]
    pub tor_password: Option<String>,

    /// Base delay between fetch attempts in milliseconds (doubles per attempt)
    #[arg(long, default_value_t = 250)]
    pub retry_delay_ms: u64,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}
