//! Plain-text download of the analysis result.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fixed name of the downloaded file.
pub const DOWNLOAD_FILE_NAME: &str = "ai_face_analysis.txt";

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("download directory {0} does not exist")]
    MissingDir(String),
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Write `text` verbatim to `dir/ai_face_analysis.txt` and return the path.
///
/// The file handle is closed before this returns.
pub fn save_text(dir: &Path, text: &str) -> Result<PathBuf, DownloadError> {
    if !dir.is_dir() {
        return Err(DownloadError::MissingDir(dir.display().to_string()));
    }
    let path = dir.join(DOWNLOAD_FILE_NAME);
    let write_err = |source| DownloadError::Write {
        path: path.display().to_string(),
        source,
    };

    {
        let mut file = File::create(&path).map_err(write_err)?;
        file.write_all(text.as_bytes()).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
    }

    tracing::info!(path = %path.display(), bytes = text.len(), "result downloaded");
    Ok(path)
}
