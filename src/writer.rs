//! Output sink: persists the ranked document as one JSON array.
//!
//! The document is written to a temporary file next to the target and renamed into
//! place, so a reader sees either the previous run's document or the new one.

use crate::resolver::ResolvedMetric;
use log::debug;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("Failed to create output directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize output document: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to write output document {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Replaces the document at `path` with `metrics`. Creates the parent directory if missing.
pub async fn write_document(path: &Path, metrics: &[ResolvedMetric]) -> Result<(), WriteError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(|source| WriteError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let body = serde_json::to_vec_pretty(metrics)?;
    let tmp = temp_path(path);

    // Any failure once the temporary file may exist removes it before reporting.
    if let Err(source) = replace_with(&tmp, path, &body).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(WriteError::Write {
            path: path.to_path_buf(),
            source,
        });
    }

    debug!("Wrote {} records ({} bytes) to {:?}", metrics.len(), body.len(), path);
    Ok(())
}

async fn replace_with(tmp: &Path, path: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(tmp).await?;
    file.write_all(body).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(tmp, path).await
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "document".into());
    name.push(".tmp");
    path.with_file_name(name)
}
