//! Batch results: per-document outcomes and aggregate stats.

use crate::error::{DocumentError, Pdf2PngError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResult {
    /// Source document.
    pub path: PathBuf,
    /// Page count, if the document could be opened.
    pub page_count: Option<usize>,
    /// PNGs written for this document, in page order.
    pub outputs: Vec<PathBuf>,
    /// First error hit; `None` means every page was written.
    pub error: Option<DocumentError>,
    /// Wall-clock time spent on this document.
    pub duration_ms: u64,
}

impl DocumentResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate numbers for a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_documents: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub pages_written: usize,
    pub total_duration_ms: u64,
}

/// Everything a batch produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub scale: f32,
    pub threshold: u8,
    /// One entry per discovered document, in processing order.
    pub documents: Vec<DocumentResult>,
    pub stats: BatchStats,
}

impl BatchReport {
    /// Documents that recorded an error.
    pub fn failures(&self) -> impl Iterator<Item = &DocumentResult> {
        self.documents.iter().filter(|d| !d.is_success())
    }

    /// Every PNG written by the batch, in processing order.
    pub fn outputs(&self) -> impl Iterator<Item = &PathBuf> {
        self.documents.iter().flat_map(|d| d.outputs.iter())
    }

    /// True when at least one document exists and all of them failed.
    pub fn all_failed(&self) -> bool {
        self.stats.total_documents > 0 && self.stats.failed == self.stats.total_documents
    }

    /// Treat any document failure as an error.
    pub fn into_result(self) -> Result<Self, Pdf2PngError> {
        let BatchStats {
            total_documents,
            succeeded,
            failed,
            ..
        } = self.stats;
        if failed == 0 {
            Ok(self)
        } else if self.all_failed() {
            let first_error = self
                .failures()
                .find_map(|d| d.error.as_ref())
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string());
            Err(Pdf2PngError::AllDocumentsFailed {
                total: total_documents,
                first_error,
            })
        } else {
            Err(Pdf2PngError::PartialFailure {
                succeeded,
                failed,
                total: total_documents,
            })
        }
    }
}
