//! # edgequake-pdf2png
//!
//! Render every page of every PDF in a folder to a PNG whose near-white
//! background is transparent, ready to be laid over other artwork.
//!
//! ## Pipeline Overview
//!
//! ```text
//! folder
//!  │
//!  ├─ 1. Discover      *.pdf directly inside the folder, sorted by name
//!  ├─ 2. Render        each page via pdfium at scale × 72 DPI (RGB)
//!  ├─ 3. Transparency  R,G,B all > 200 → (255,255,255,0), else opaque
//!  ├─ 4. Encode        PNG, written atomically
//!  └─ 5. Output        <folder>/processed/<stem>_page_<n>.png
//! ```
//!
//! A broken document is logged and skipped; the rest of the batch carries
//! on. The batch runs on one worker thread while the caller polls a
//! [`ProgressSignal`] for `Running → Complete | Failed`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2png::run_folder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let report = run_folder("scans", 5.0)?;
//!     eprintln!(
//!         "{}/{} documents, {} pages",
//!         report.stats.succeeded, report.stats.total_documents, report.stats.pages_written
//!     );
//!     Ok(())
//! }
//! ```
//!
//! With a responsive front-end:
//!
//! ```rust,no_run
//! use edgequake_pdf2png::{
//!     poll_until_terminal, spawn_pdfium_batch, BatchConfig, ProgressSignal, StatusPresenter,
//!     DEFAULT_POLL_INTERVAL,
//! };
//!
//! struct Stderr;
//!
//! impl StatusPresenter for Stderr {
//!     fn show_status(&mut self, text: &str) {
//!         eprint!("\r{text}");
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BatchConfig::builder("scans").build()?;
//!     let signal = ProgressSignal::new();
//!     let worker = spawn_pdfium_batch(config, signal.clone());
//!     let status = poll_until_terminal(&signal, &mut Stderr, DEFAULT_POLL_INTERVAL).await;
//!     eprintln!();
//!     let report = worker.await??;
//!     println!("{status}: {} pages", report.stats.pages_written);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2png` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2png = { version = "0.1", default-features = false }
//! ```
//!
//! ## PDFium
//!
//! The PDFium shared library is looked up via `PDFIUM_LIB_PATH`, next to the
//! executable, in `./lib`, in `./`, then in the system library path.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod buffer;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod surface;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{run_folder, spawn_batch, spawn_pdfium_batch, BatchOrchestrator};
pub use buffer::{BufferSizeMismatch, Channels, PixelBuffer};
pub use config::{BatchConfig, BatchConfigBuilder, DEFAULT_SCALE};
pub use error::{DocumentError, Pdf2PngError};
pub use output::{BatchReport, BatchStats, DocumentResult};
pub use pipeline::naming::OutputNamer;
pub use pipeline::render::{PdfiumRasterizer, RasterDocument, Rasterizer};
pub use pipeline::transparency::{TransparencyRule, DEFAULT_THRESHOLD};
pub use progress::{
    BatchProgressCallback, BatchStatus, NoopProgressCallback, ProgressCallback, ProgressSignal,
};
pub use surface::{poll_until_terminal, StatusPresenter, DEFAULT_POLL_INTERVAL, SPINNER_FRAMES};
