//! Extraction mode: turn seed batches into documents.
//!
//! Batches are processed strictly one after another. Within a batch, up to
//! `pool_size` URLs are in flight at once; each one goes through
//! canonicalize → fetch (with retry) → extract → assemble and lands in the
//! shared per-batch accumulator or in one of the error buckets. The batch ends
//! when every URL has been handled, its documents move into the run-wide
//! mapping, and the next batch starts with an empty accumulator.
//!
//! # Stopping Early
//!
//! [`Harvester::run_until`] races the crawl against a stop future (Ctrl+C in
//! production). When the stop future wins, the documents of the batch in
//! progress are written as a flat list, together with the errors collected so
//! far, and no further batch is started.

use crate::assemble::assemble;
use crate::error::{HarvestError, Result};
use crate::extract::{Extraction, extract};
use crate::fetch::{IdentityRotator, PageFetcher, RetryFetch};
use crate::models::{Document, ErrorReport, SeedFile};
use crate::outputs::json::{BatchFiles, write_json};
use crate::seeds::canonicalize;
use crate::sites::{SiteRuleSet, rules_for};
use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use scraper::Html;
use std::future::Future;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// How a run ended and where its output went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every batch finished; the success file maps batch → documents.
    Completed(BatchFiles),
    /// Stopped mid-run; the success file lists the current batch's documents.
    Interrupted(BatchFiles),
}

/// Classification of one processed URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UrlOutcome {
    Harvested,
    DocError,
    HttpError,
}

#[derive(Debug, Default)]
struct HarvestState {
    current_key: Option<String>,
    page_infos: Vec<Document>,
    final_data: IndexMap<String, Vec<Document>>,
    errors: ErrorReport,
}

/// Drives extraction mode over a seed file.
pub struct Harvester<F, R> {
    seeds: SeedFile,
    fetcher: RetryFetch<F>,
    rotator: R,
    pool_size: usize,
    output_dir: PathBuf,
    state: Mutex<HarvestState>,
}

impl<F, R> Harvester<F, R>
where
    F: PageFetcher,
    R: IdentityRotator,
{
    /// # Errors
    ///
    /// [`HarvestError::UnknownSite`] when a batch key has no rules, and
    /// [`HarvestError::InvalidArgument`] for an empty worker pool.
    pub fn new(
        seeds: SeedFile,
        fetcher: RetryFetch<F>,
        rotator: R,
        pool_size: usize,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        if pool_size == 0 {
            return Err(HarvestError::InvalidArgument(
                "pool size must be at least 1".to_string(),
            ));
        }
        for key in seeds.keys() {
            rules_for(key)?;
        }
        Ok(Self {
            seeds,
            fetcher,
            rotator,
            pool_size,
            output_dir: output_dir.into(),
            state: Mutex::new(HarvestState::default()),
        })
    }

    /// Crawl every batch unless `stop` resolves first, then save.
    pub async fn run_until<S>(&self, stop: S) -> Result<Outcome>
    where
        S: Future<Output = ()>,
    {
        tokio::select! {
            crawled = self.crawl() => {
                crawled?;
                Ok(Outcome::Completed(self.save_data(false).await?))
            }
            () = stop => {
                warn!("Stop requested; saving the batch in progress");
                Ok(Outcome::Interrupted(self.save_data(true).await?))
            }
        }
    }

    #[instrument(level = "info", skip_all, fields(batches = self.seeds.len(), pool_size = self.pool_size))]
    async fn crawl(&self) -> Result<()> {
        let mut downloaded = 0usize;

        for (key, urls) in &self.seeds {
            let rules = rules_for(key)?;
            {
                let mut state = self.state.lock().await;
                state.current_key = Some(key.clone());
                state.page_infos.clear();
            }
            info!(batch = %key, urls = urls.len(), "Starting batch");

            let outcomes: Vec<UrlOutcome> = stream::iter(urls)
                .map(|url| self.process_url(rules, url))
                .buffer_unordered(self.pool_size)
                .collect()
                .await;

            let harvested = {
                let mut state = self.state.lock().await;
                let documents = std::mem::take(&mut state.page_infos);
                let harvested = documents.len();
                state.final_data.insert(key.clone(), documents);
                harvested
            };
            downloaded += harvested;

            let count = |kind: UrlOutcome| outcomes.iter().filter(|o| **o == kind).count();
            info!(
                batch = %key,
                harvested,
                doc_errors = count(UrlOutcome::DocError),
                http_errors = count(UrlOutcome::HttpError),
                downloaded,
                "Done with batch"
            );
        }
        Ok(())
    }

    #[instrument(level = "debug", skip_all, fields(site = rules.site_id, url = %raw_url.trim_end()))]
    async fn process_url(&self, rules: &'static SiteRuleSet, raw_url: &str) -> UrlOutcome {
        let source_url = raw_url.trim_end();
        let url = canonicalize(raw_url, rules.site_id);
        if url != source_url {
            debug!(%url, "Canonicalized seed URL");
        }

        let fetched = self
            .fetcher
            .fetch_with(&url, |body| accept_page(&body, rules, &url))
            .await;

        let outcome = {
            let mut state = self.state.lock().await;
            let outcome = match fetched {
                Ok(extraction) if extraction.success => {
                    state
                        .page_infos
                        .push(assemble(extraction.fields, rules, source_url));
                    info!(
                        success_count = state.page_infos.len(),
                        batch = rules.site_id,
                        "Harvested document"
                    );
                    UrlOutcome::Harvested
                }
                Ok(_) => {
                    warn!("Missing document and headline");
                    state.errors.record_doc(source_url);
                    UrlOutcome::DocError
                }
                Err(e) => {
                    warn!(error = %e, "Giving up on URL");
                    state.errors.record_http(source_url);
                    UrlOutcome::HttpError
                }
            };
            info!(
                error_count = state.errors.http.len(),
                batch = rules.site_id,
                "Processed URL"
            );
            outcome
        };

        if let Err(e) = self.rotator.rotate().await {
            warn!(error = %e, "Identity rotation failed; continuing");
        }
        outcome
    }

    /// Write the success and error files for the current state.
    #[instrument(level = "info", skip(self))]
    async fn save_data(&self, interrupted: bool) -> Result<BatchFiles> {
        let state = self.state.lock().await;
        let key = state.current_key.as_deref().unwrap_or("harvest");
        let files = BatchFiles::new(&self.output_dir, key);

        if interrupted {
            write_json(&state.page_infos, &files.success).await?;
        } else {
            write_json(&state.final_data, &files.success).await?;
        }
        write_json(&state.errors, &files.error).await?;

        info!(
            success = %files.success.display(),
            error = %files.error.display(),
            doc_errors = state.errors.doc.len(),
            http_errors = state.errors.http.len(),
            "Saved harvest output"
        );
        Ok(files)
    }
}

/// Extract a fetched body, rejecting pages where nothing matched at all.
fn accept_page(body: &str, rules: &SiteRuleSet, url: &str) -> Result<Extraction> {
    let page = Html::parse_document(body);
    let extraction = extract(&page, rules);
    if extraction.fields.is_blank() {
        Err(HarvestError::BlankPage(url.to_string()))
    } else {
        Ok(extraction)
    }
}
