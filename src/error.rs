//! Error types for the edgequake-pdf2png library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2PngError`]: **Fatal**: the batch cannot proceed at all
//!   (unreadable input folder, output folder cannot be created, PDFium not
//!   available). Returned as `Err(Pdf2PngError)` from the top-level batch
//!   functions.
//!
//! * [`DocumentError`]: **Non-fatal**: a single document failed (corrupt
//!   file, render glitch, disk full while writing one page) but its siblings
//!   are unaffected. Stored inside [`crate::output::DocumentResult`] so
//!   callers can inspect partial success.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2png library.
///
/// Document-level failures use [`DocumentError`] and are stored in
/// [`crate::output::DocumentResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Pdf2PngError {
    // ── Filesystem errors ─────────────────────────────────────────────────
    /// The input folder does not exist or cannot be listed.
    #[error("Cannot read input folder '{path}': {source}\nCheck the path exists and is a directory.")]
    InputDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The output folder could not be created. Nothing can be written.
    #[error("Failed to create output folder '{path}': {source}")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Batch outcome errors ──────────────────────────────────────────────
    /// Every document in the batch failed.
    #[error("All {total} documents failed.\nFirst error: {first_error}")]
    AllDocumentsFailed { total: usize, first_error: String },

    /// Some documents succeeded but at least one failed.
    ///
    /// Returned by [`crate::output::BatchReport::into_result`] when the
    /// caller wants to treat any document failure as an error.
    #[error("{failed}/{total} documents failed during conversion")]
    PartialFailure {
        succeeded: usize,
        failed: usize,
        total: usize,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Place libpdfium next to the pdf2png executable or in ./lib.\n\
  • Install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single document.
///
/// The batch records it against the document and moves on to the next one.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum DocumentError {
    /// The file could not be parsed as a PDF (corrupt, truncated, encrypted).
    #[error("{path}: cannot open document: {detail}")]
    Open { path: PathBuf, detail: String },

    /// A page index past the end of the document was requested.
    #[error("page index {index} is out of range (document has {total} pages)")]
    PageIndex { index: usize, total: usize },

    /// The backend failed to rasterise a page that exists.
    #[error("page {page}: rasterisation failed: {detail}")]
    Render { page: usize, detail: String },

    /// The pixel buffer could not be serialised to PNG.
    #[error("page {page}: PNG encoding failed: {detail}")]
    Encode { page: usize, detail: String },

    /// A PNG could not be written to disk.
    #[error("{path}: write failed: {detail}")]
    Filesystem { path: PathBuf, detail: String },
}
