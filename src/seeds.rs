//! Seed loading and URL canonicalization.
//!
//! Seed URLs come straight out of the Common Crawl index, keyed by the site
//! identifier they were discovered under. Some of them are not what should be
//! fetched: BBC News AMP pages and the RFI language subdomains that now live
//! under a path on `www.rfi.fr`. [`canonicalize`] maps them to the fetchable
//! URL before the request is made.

use crate::error::Result;
use crate::models::{IndexSource, SeedFile};
use once_cell::sync::Lazy;
use rand::rng;
use rand::seq::SliceRandom;
use regex::Regex;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

/// Sites whose seeds include AMP renderings.
const AMP_SITES: &[&str] = &["www.bbc.com/news"];

/// `(site identifier, seed host, canonical host, path prefix)`.
const HOST_ALIASES: &[(&str, &str, &str, &str)] = &[
    ("sw.rfi.fr", "sw.rfi.fr", "www.rfi.fr", "/sw"),
    ("en.rfi.fr", "en.rfi.fr", "www.rfi.fr", "/en"),
];

static AMP_SEGMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:/amp)+/").unwrap());

/// Map a raw seed URL to the URL that should be fetched.
///
/// Trailing whitespace is dropped, AMP segments are removed for AMP-affected
/// sites, and aliased hosts are rewritten to their canonical host and path
/// prefix. Anything else is returned unchanged. Applying it twice gives the
/// same result as applying it once.
pub fn canonicalize(raw_url: &str, site_id: &str) -> String {
    let mut url = raw_url.trim_end().to_string();

    if AMP_SITES.contains(&site_id) && url.contains("/amp/") {
        url = AMP_SEGMENT_RE.replace_all(&url, "/").into_owned();
    }

    for (alias_site, seed_host, canonical_host, prefix) in HOST_ALIASES {
        if *alias_site == site_id {
            url = rewrite_host(url, seed_host, canonical_host, prefix);
        }
    }
    url
}

fn rewrite_host(url: String, seed_host: &str, canonical_host: &str, prefix: &str) -> String {
    let Ok(mut parsed) = Url::parse(&url) else {
        return url;
    };
    if parsed.host_str() != Some(seed_host) {
        return url;
    }
    let path = format!("{prefix}{}", parsed.path());
    if parsed.set_host(Some(canonical_host)).is_err() {
        return url;
    }
    parsed.set_path(&path);
    parsed.to_string()
}

/// Load a seeding file (site identifier → candidate URLs).
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_seeding(path: &Path) -> Result<SeedFile> {
    let raw = fs::read_to_string(path).await?;
    let seeds: SeedFile = serde_json::from_str(&raw)?;
    info!(
        batches = seeds.len(),
        urls = seeds.values().map(Vec::len).sum::<usize>(),
        "Loaded seeding file"
    );
    Ok(seeds)
}

/// Load the index-source descriptor used by discovery mode.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_index_sources(path: &Path) -> Result<Vec<IndexSource>> {
    let raw = fs::read_to_string(path).await?;
    let sources: Vec<IndexSource> = serde_json::from_str(&raw)?;
    info!(count = sources.len(), "Loaded index sources");
    Ok(sources)
}

/// Shuffle each batch and keep at most `sample_size` URLs of it.
pub fn sample_batches(seeds: SeedFile, sample_size: usize) -> SeedFile {
    let mut rng = rng();
    seeds
        .into_iter()
        .map(|(site, mut urls)| {
            urls.shuffle(&mut rng);
            urls.truncate(sample_size);
            (site, urls)
        })
        .collect()
}
