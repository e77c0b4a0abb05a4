//! JSON output for harvested batches.
//!
//! Each save writes a pair of files sharing a random suffix:
//! `<batch>-<suffix>-success.json` and `<batch>-<suffix>-error.json`, where
//! `<batch>` is the site identifier with `/` replaced by `-`.

use crate::error::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Paths of one success/error pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFiles {
    pub success: PathBuf,
    pub error: PathBuf,
}

impl BatchFiles {
    /// Fresh file names for `batch_key` inside `output_dir`.
    pub fn new(output_dir: &Path, batch_key: &str) -> Self {
        let stem = format!("{}-{}", batch_key.replace('/', "-"), Uuid::new_v4().simple());
        Self {
            success: output_dir.join(format!("{stem}-success.json")),
            error: output_dir.join(format!("{stem}-error.json")),
        }
    }
}

/// Serialize `content` to `path`, creating the parent directory if needed.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_json<T>(content: &T, path: &Path) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_string(content)?;

    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent).await {
            error!(dir = %parent.display(), error = %e, "Failed to create output dir");
            return Err(e.into());
        }
    }

    fs::write(path, json).await?;
    info!("Wrote JSON file");
    Ok(())
}
