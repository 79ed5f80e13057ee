//! Publishing hand-off: writing the rendered feed to its fixed path.
//!
//! The document is written to a sibling temporary file and renamed over the
//! target, so readers (and the static host picking the file up) only ever
//! see a complete document. Overlapping runs resolve as last writer wins.

use crate::models::FeedDocument;
use std::error::Error;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

/// Replace the feed at `path` with `document`.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or the file
/// cannot be written or renamed. The previous file is left intact in that
/// case.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_feed(path: &Path, document: &FeedDocument) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let tmp_path = temp_path_for(path);
    if let Err(e) = write_then_rename(&tmp_path, path, document.xml.as_bytes()).await {
        // A failed write can leave a partial temp file behind
        if let Err(cleanup) = fs::remove_file(&tmp_path).await {
            debug!(tmp = %tmp_path.display(), error = %cleanup, "Temp file not removed");
        }
        return Err(Box::new(e));
    }

    info!(bytes = document.xml.len(), "Wrote feed");
    Ok(())
}

async fn write_then_rename(tmp_path: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    fs::write(tmp_path, bytes).await?;
    fs::rename(tmp_path, path).await
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "feed.xml".into());
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}
