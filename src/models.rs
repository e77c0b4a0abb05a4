//! Data models for seed batches, extracted fields, and persisted documents.
//!
//! This module defines the core data structures used throughout the application:
//! - [`SeedFile`]: Candidate URLs grouped by site identifier
//! - [`ExtractedFields`]: Raw field values resolved from one page
//! - [`Document`]: The persisted unit written to `-success.json`
//! - [`ErrorReport`]: The two failure buckets written to `-error.json`

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Candidate URLs keyed by site identifier, in seeding-file order.
///
/// Each entry is one batch; batches are processed one after another.
pub type SeedFile = IndexMap<String, Vec<String>>;

/// One entry of the index-source descriptor used by discovery mode.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexSource {
    /// Base URL of a Common Crawl index endpoint.
    #[serde(rename = "cdx-api")]
    pub cdx_api: String,
}

/// Field values resolved from a single page.
///
/// Missing fields are empty strings, never errors. The image source may still
/// be root-relative at this stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub title: String,
    pub headline: String,
    pub document: String,
    pub image_src: String,
    pub image_caption: String,
}

impl ExtractedFields {
    /// A page worth keeping has body text or a headline.
    pub fn has_content(&self) -> bool {
        !self.document.is_empty() || !self.headline.is_empty()
    }

    /// Nothing at all matched, typically a block page or an unrelated layout.
    pub fn is_blank(&self) -> bool {
        self.title.is_empty()
            && self.headline.is_empty()
            && self.document.is_empty()
            && self.image_src.is_empty()
            && self.image_caption.is_empty()
    }
}

/// A harvested article as persisted in the batch output.
///
/// The JSON field names are part of the output format.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Document {
    pub title: String,
    pub headline: String,
    pub document: String,
    /// Absolute image URL when the site family needs completion.
    pub image: String,
    pub image_desc: String,
    /// The seed URL this document was harvested from.
    pub url: String,
}

/// Failures collected while processing a run.
///
/// `doc` holds pages that were fetched but had neither body text nor a
/// headline; `http` holds URLs that could not be fetched within the retry
/// budget.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorReport {
    pub doc: Vec<String>,
    pub http: Vec<String>,
}

impl ErrorReport {
    pub fn record_doc(&mut self, url: &str) {
        self.doc.push(format!(
            "Document problem (missing document and headline) for url: {url}"
        ));
    }

    pub fn record_http(&mut self, url: &str) {
        self.http.push(format!(
            "HTTP issue, page not found or dns failure for url: {url}"
        ));
    }
}
