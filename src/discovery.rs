//! Discovery mode: build a seeding file from the Common Crawl index.
//!
//! Every supported site identifier is looked up on every index endpoint of
//! the descriptor file:
//!
//! ```text
//! GET {endpoint}?output=json&fl=url&url={site}/*
//! ```
//!
//! The answer is newline-delimited JSON, one `{"url": ...}` object per line.
//! A failing endpoint is logged and skipped; the other endpoints still count.

use crate::error::{HarvestError, Result};
use crate::fetch::PageFetcher;
use crate::models::{IndexSource, SeedFile};
use crate::sites::site_ids;
use crate::utils::truncate_for_log;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Name of the seeding file written by discovery mode.
pub const SEEDING_FILE_NAME: &str = "seeding_final_data.json";

#[derive(Debug, Deserialize)]
struct IndexRecord {
    url: String,
}

/// Query URL for all captures under `site` on one index endpoint.
pub fn index_query_url(endpoint: &str, site: &str) -> Result<String> {
    let pattern = format!("{site}/*");
    let url = Url::parse_with_params(
        endpoint,
        &[("output", "json"), ("fl", "url"), ("url", pattern.as_str())],
    )
    .map_err(|e| HarvestError::InvalidArgument(format!("{endpoint}: {e}")))?;
    Ok(url.to_string())
}

/// Parse one newline-delimited index response. Blank and malformed lines
/// are skipped.
pub fn parse_index_response(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<IndexRecord>(line) {
            Ok(record) => Some(record.url),
            Err(e) => {
                warn!(line = %truncate_for_log(line, 120), error = %e, "Skipping malformed index line");
                None
            }
        })
        .collect()
}

/// Collect the URLs of one site across all endpoints, first-seen order,
/// without duplicates.
#[instrument(level = "info", skip(fetcher, sources, concurrency))]
pub async fn discover_site<F>(
    fetcher: &F,
    sources: &[IndexSource],
    site: &str,
    concurrency: usize,
) -> Vec<String>
where
    F: PageFetcher,
{
    let per_endpoint: Vec<Vec<String>> = stream::iter(sources)
        .map(|source| async move {
            let query = match index_query_url(&source.cdx_api, site) {
                Ok(query) => query,
                Err(e) => {
                    warn!(error = %e, "Invalid index endpoint; skipping");
                    return Vec::new();
                }
            };
            match fetcher.fetch(&query).await {
                Ok(body) => {
                    let urls = parse_index_response(&body);
                    debug!(endpoint = %source.cdx_api, count = urls.len(), "Index endpoint answered");
                    urls
                }
                Err(e) => {
                    warn!(endpoint = %source.cdx_api, error = %e, "Seeding error; skipping endpoint");
                    Vec::new()
                }
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let urls: Vec<String> = per_endpoint.into_iter().flatten().unique().collect();
    info!(count = urls.len(), "Done with site");
    urls
}

/// Build the seeding map for every supported site.
#[instrument(level = "info", skip_all, fields(endpoints = sources.len()))]
pub async fn discover_all<F>(fetcher: &F, sources: &[IndexSource], concurrency: usize) -> SeedFile
where
    F: PageFetcher,
{
    let mut seeds = SeedFile::new();
    for site in site_ids() {
        let urls = discover_site(fetcher, sources, site, concurrency).await;
        seeds.insert(site.to_string(), urls);
    }
    seeds
}
