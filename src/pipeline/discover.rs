//! Input discovery: list the documents a batch will process.
//!
//! Only the top level of the input folder is scanned. Entries are kept when
//! they are regular files (symlinks are followed) whose extension matches the
//! configured one. The result is sorted by file name.

use crate::config::BatchConfig;
use crate::error::Pdf2PngError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Eligible documents in `config.input_dir`, sorted by file name.
pub fn discover_documents(config: &BatchConfig) -> Result<Vec<PathBuf>, Pdf2PngError> {
    let dir = &config.input_dir;
    let entries = std::fs::read_dir(dir).map_err(|source| Pdf2PngError::InputDirUnreadable {
        path: dir.clone(),
        source,
    })?;

    let mut documents = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        let path = entry.path();
        if !config.matches_extension(&path) {
            continue;
        }
        if !is_file(&path) {
            debug!("Skipping non-file {}", path.display());
            continue;
        }
        documents.push(path);
    }

    documents.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!(
        "Discovered {} document(s) in {}",
        documents.len(),
        dir.display()
    );
    Ok(documents)
}

fn is_file(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}
