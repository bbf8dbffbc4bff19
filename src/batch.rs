//! Batch orchestration: one folder in, one PNG per page out.
//!
//! [`BatchOrchestrator::run`] is synchronous and does all work on the calling
//! thread. Front-ends that must stay responsive use [`spawn_batch`], which
//! runs it on a single blocking worker thread and leaves the caller free to
//! poll the [`ProgressSignal`].
//!
//! ## Failure isolation
//!
//! A document stops at its first error (corrupt file, render failure, write
//! failure); the error is recorded in its [`DocumentResult`] and the batch
//! moves on to the next document. PNGs already written for the failed
//! document stay on disk. Only problems that make the whole batch impossible
//! (input folder unreadable, output folder cannot be created) abort it.
//!
//! Nothing is retried: corrupt documents and permission errors stay broken.

use crate::config::BatchConfig;
use crate::error::{DocumentError, Pdf2PngError};
use crate::output::{BatchReport, BatchStats, DocumentResult};
use crate::pipeline::discover::discover_documents;
use crate::pipeline::encode::{encode_png, write_atomic};
use crate::pipeline::naming::{base_name, OutputNamer};
use crate::pipeline::render::{PdfiumRasterizer, Rasterizer};
use crate::pipeline::transparency::TransparencyRule;
use crate::progress::{BatchProgressCallback, NoopProgressCallback, ProgressSignal};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Drives a [`Rasterizer`] over every document in a folder.
pub struct BatchOrchestrator<R> {
    rasterizer: R,
}

impl<R: Rasterizer> BatchOrchestrator<R> {
    pub fn new(rasterizer: R) -> Self {
        Self { rasterizer }
    }

    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    /// Convert every eligible document in `config.input_dir`.
    ///
    /// Moves `signal` to `Running` first and to a terminal state before
    /// returning, on every path.
    ///
    /// # Returns
    /// `Ok(BatchReport)` once every document was attempted, even if some or
    /// all of them failed (the signal is `Failed` in the latter case).
    ///
    /// # Errors
    /// Returns `Err(Pdf2PngError)` only for fatal errors:
    /// - the signal was already started by another run
    /// - invalid configuration
    /// - input folder unreadable / output folder cannot be created
    pub fn run(
        &self,
        config: &BatchConfig,
        signal: &ProgressSignal,
    ) -> Result<BatchReport, Pdf2PngError> {
        if !signal.try_start() {
            return Err(Pdf2PngError::Internal(
                "batch was already started with this progress signal".to_string(),
            ));
        }
        let total_start = Instant::now();

        match self.run_started(config, signal, total_start) {
            Ok(report) => {
                if report.all_failed() {
                    let reason = report
                        .failures()
                        .find_map(|d| d.error.as_ref())
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "every document failed".to_string());
                    signal.mark_failed(format!(
                        "all {} documents failed; first error: {}",
                        report.stats.total_documents, reason
                    ));
                } else {
                    signal.mark_complete(report.stats.failed);
                }
                Ok(report)
            }
            Err(e) => {
                warn!("Batch aborted: {}", e);
                signal.mark_failed(e.to_string());
                Err(e)
            }
        }
    }

    fn run_started(
        &self,
        config: &BatchConfig,
        signal: &ProgressSignal,
        total_start: Instant,
    ) -> Result<BatchReport, Pdf2PngError> {
        config.validate()?;

        // ── Step 1: Discover documents ───────────────────────────────────
        // Before creating the output folder, which would otherwise create a
        // missing input folder along with it.
        let documents = discover_documents(config)?;
        let total = documents.len();

        // ── Step 2: Output folder ────────────────────────────────────────
        let output_dir = config.output_dir();
        std::fs::create_dir_all(&output_dir).map_err(|source| Pdf2PngError::OutputDirFailed {
            path: output_dir.clone(),
            source,
        })?;

        signal.set_total_documents(total);
        info!(
            "Starting batch: {} document(s) in {} → {} (scale {}, threshold {})",
            total,
            config.input_dir.display(),
            output_dir.display(),
            config.scale,
            config.threshold
        );
        if total == 0 {
            warn!(
                "No .{} files found in {}",
                config.extension,
                config.input_dir.display()
            );
        }
        warn_on_stem_collisions(&documents);

        let noop = NoopProgressCallback;
        let cb: &dyn BatchProgressCallback = match config.progress_callback {
            Some(ref cb) => cb.as_ref(),
            None => &noop,
        };
        cb.on_batch_start(total);

        // ── Step 3: Convert each document ────────────────────────────────
        let namer = OutputNamer::new(&output_dir);
        let rule = TransparencyRule::new(config.threshold);
        let mut results = Vec::with_capacity(total);

        for (i, doc) in documents.iter().enumerate() {
            cb.on_document_start(doc, i + 1, total);
            let result = self.convert_document(doc, &namer, rule, config.scale, cb);
            signal.document_done();
            results.push(result);
        }

        // ── Step 4: Stats ────────────────────────────────────────────────
        let failed = results.iter().filter(|r| !r.is_success()).count();
        let stats = BatchStats {
            total_documents: total,
            succeeded: total - failed,
            failed,
            pages_written: results.iter().map(|r| r.outputs.len()).sum(),
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };
        info!(
            "Batch complete: {}/{} documents, {} pages, {}ms",
            stats.succeeded, total, stats.pages_written, stats.total_duration_ms
        );
        cb.on_batch_complete(total, stats.succeeded);

        Ok(BatchReport {
            input_dir: config.input_dir.clone(),
            output_dir,
            scale: config.scale,
            threshold: config.threshold,
            documents: results,
            stats,
        })
    }

    /// Convert one document, recording (not propagating) its first error.
    pub fn convert_document(
        &self,
        document: &Path,
        namer: &OutputNamer,
        rule: TransparencyRule,
        scale: f32,
        cb: &dyn BatchProgressCallback,
    ) -> DocumentResult {
        let start = Instant::now();
        let mut result = DocumentResult {
            path: document.to_path_buf(),
            page_count: None,
            outputs: Vec::new(),
            error: None,
            duration_ms: 0,
        };

        match self.write_pages(document, namer, rule, scale, cb, &mut result) {
            Ok(()) => {
                info!(
                    "{}: wrote {} page(s)",
                    document.display(),
                    result.outputs.len()
                );
                cb.on_document_complete(document, result.outputs.len());
            }
            Err(e) => {
                warn!("{}: {}", document.display(), e);
                cb.on_document_error(document, &e);
                result.error = Some(e);
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        result
    }

    fn write_pages(
        &self,
        document: &Path,
        namer: &OutputNamer,
        rule: TransparencyRule,
        scale: f32,
        cb: &dyn BatchProgressCallback,
        result: &mut DocumentResult,
    ) -> Result<(), DocumentError> {
        // Released when this function returns, on success or error.
        let handle = self.rasterizer.open(document)?;
        let total_pages = handle.page_count();
        result.page_count = Some(total_pages);

        for index in 0..total_pages {
            let page_num = index + 1;
            let rgb = handle.render_page(index, scale)?;
            let rgba = rule.apply(&rgb);
            drop(rgb);
            let png = encode_png(rgba, page_num)?;

            let out = namer.name_for(document, page_num);
            write_atomic(&out, &png)?;
            debug!("Wrote {}", out.display());

            cb.on_page_written(document, page_num, total_pages, &out);
            result.outputs.push(out);
        }
        Ok(())
    }
}

fn warn_on_stem_collisions(documents: &[PathBuf]) {
    let mut seen: HashMap<String, &PathBuf> = HashMap::new();
    for doc in documents {
        if let Some(prev) = seen.insert(base_name(doc), doc) {
            warn!(
                "{} and {} share a base name; the later one overwrites the earlier's PNGs",
                prev.display(),
                doc.display()
            );
        }
    }
}

// ── Worker thread entry points ───────────────────────────────────────────

/// Marks the signal failed if the worker unwinds before reaching a terminal
/// state, so a polling front-end never waits forever.
struct TerminalGuard(ProgressSignal);

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if !self.0.is_terminal() {
            self.0.mark_failed("batch worker stopped unexpectedly");
        }
    }
}

/// Run a batch on a blocking worker thread.
///
/// `make_rasterizer` runs on the worker, so the backend is created, used and
/// dropped there and never crosses threads. Must be called from inside a
/// Tokio runtime.
pub fn spawn_batch<R, F>(
    config: BatchConfig,
    signal: ProgressSignal,
    make_rasterizer: F,
) -> JoinHandle<Result<BatchReport, Pdf2PngError>>
where
    R: Rasterizer + 'static,
    F: FnOnce() -> Result<R, Pdf2PngError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let _guard = TerminalGuard(signal.clone());
        let rasterizer = match make_rasterizer() {
            Ok(r) => r,
            Err(e) => {
                signal.mark_failed(e.to_string());
                return Err(e);
            }
        };
        BatchOrchestrator::new(rasterizer).run(&config, &signal)
    })
}

/// [`spawn_batch`] with the PDFium backend and the config's password.
pub fn spawn_pdfium_batch(
    config: BatchConfig,
    signal: ProgressSignal,
) -> JoinHandle<Result<BatchReport, Pdf2PngError>> {
    let password = config.password.clone();
    spawn_batch(config, signal, move || {
        Ok(PdfiumRasterizer::new()?.with_password(password))
    })
}

/// Convert every PDF in `input_dir` into `<input_dir>/processed` at `scale`,
/// on the calling thread, with PDFium.
pub fn run_folder(
    input_dir: impl Into<PathBuf>,
    scale: f32,
) -> Result<BatchReport, Pdf2PngError> {
    let config = BatchConfig::builder(input_dir).scale(scale).build()?;
    let orchestrator = BatchOrchestrator::new(PdfiumRasterizer::new()?);
    orchestrator.run(&config, &ProgressSignal::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::PixelBuffer;
    use crate::pipeline::render::RasterDocument;
    use crate::progress::BatchStatus;
    use tempfile::TempDir;

    /// Pages are solid `colour`; file content "pages:N" sets the count.
    struct SolidBackend {
        colour: [u8; 3],
    }

    struct SolidDoc {
        pages: usize,
        colour: [u8; 3],
    }

    impl RasterDocument for SolidDoc {
        fn page_count(&self) -> usize {
            self.pages
        }

        fn render_page(&self, index: usize, _scale: f32) -> Result<PixelBuffer, DocumentError> {
            if index >= self.pages {
                return Err(DocumentError::PageIndex {
                    index,
                    total: self.pages,
                });
            }
            Ok(PixelBuffer::filled(3, 2, &self.colour))
        }
    }

    impl Rasterizer for SolidBackend {
        fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn RasterDocument + 'a>, DocumentError> {
            let text = std::fs::read_to_string(path).unwrap_or_default();
            let pages = text
                .strip_prefix("pages:")
                .and_then(|n| n.trim().parse().ok())
                .ok_or_else(|| DocumentError::Open {
                    path: path.to_path_buf(),
                    detail: "not a test document".into(),
                })?;
            Ok(Box::new(SolidDoc {
                pages,
                colour: self.colour,
            }))
        }
    }

    fn orchestrator() -> BatchOrchestrator<SolidBackend> {
        BatchOrchestrator::new(SolidBackend { colour: [0, 0, 0] })
    }

    #[test]
    fn single_document_writes_every_page() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("report.pdf"), "pages:3").unwrap();
        let config = BatchConfig::builder(tmp.path()).build().unwrap();
        let signal = ProgressSignal::new();

        let report = orchestrator().run(&config, &signal).unwrap();

        assert_eq!(signal.status(), BatchStatus::Complete { failed: 0 });
        assert_eq!(report.stats.pages_written, 3);
        let out = tmp.path().join("processed");
        for n in 1..=3 {
            assert!(out.join(format!("report_page_{n}.png")).is_file());
        }
    }

    #[test]
    fn signal_cannot_be_reused() {
        let tmp = TempDir::new().unwrap();
        let config = BatchConfig::builder(tmp.path()).build().unwrap();
        let signal = ProgressSignal::new();
        orchestrator().run(&config, &signal).unwrap();
        assert!(orchestrator().run(&config, &signal).is_err());
    }

    #[test]
    fn missing_input_folder_fails_signal() {
        let tmp = TempDir::new().unwrap();
        let config = BatchConfig::builder(tmp.path().join("absent"))
            .build()
            .unwrap();
        let signal = ProgressSignal::new();
        let err = orchestrator().run(&config, &signal).unwrap_err();
        assert!(matches!(err, Pdf2PngError::InputDirUnreadable { .. }));
        assert!(matches!(signal.status(), BatchStatus::Failed(_)));
        assert!(!tmp.path().join("absent").exists());
    }

    #[test]
    fn output_folder_blocked_by_file_is_fatal() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("processed"), b"not a dir").unwrap();
        std::fs::write(tmp.path().join("a.pdf"), "pages:1").unwrap();
        let config = BatchConfig::builder(tmp.path()).build().unwrap();
        let signal = ProgressSignal::new();
        let err = orchestrator().run(&config, &signal).unwrap_err();
        assert!(matches!(err, Pdf2PngError::OutputDirFailed { .. }));
        assert!(signal.is_terminal());
    }

    #[test]
    fn every_document_failing_marks_failed() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("bad.pdf"), "garbage").unwrap();
        let config = BatchConfig::builder(tmp.path()).build().unwrap();
        let signal = ProgressSignal::new();
        let report = orchestrator().run(&config, &signal).unwrap();
        assert!(report.all_failed());
        match signal.status() {
            BatchStatus::Failed(reason) => assert!(reason.contains("not a test document")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn empty_folder_completes() {
        let tmp = TempDir::new().unwrap();
        let config = BatchConfig::builder(tmp.path()).build().unwrap();
        let signal = ProgressSignal::new();
        let report = orchestrator().run(&config, &signal).unwrap();
        assert_eq!(report.stats.total_documents, 0);
        assert_eq!(signal.status(), BatchStatus::Complete { failed: 0 });
        assert!(tmp.path().join("processed").is_dir());
    }

    #[test]
    fn white_pages_become_transparent_on_disk() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("blank.pdf"), "pages:1").unwrap();
        let config = BatchConfig::builder(tmp.path()).build().unwrap();
        let o = BatchOrchestrator::new(SolidBackend {
            colour: [255, 255, 255],
        });
        o.run(&config, &ProgressSignal::new()).unwrap();

        let png = tmp.path().join("processed/blank_page_1.png");
        let img = image::open(png).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (3, 2));
        assert!(img.pixels().all(|p| p.0 == [255, 255, 255, 0]));
    }

    #[test]
    fn signal_counts_documents() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.pdf"), "pages:1").unwrap();
        std::fs::write(tmp.path().join("b.pdf"), "nope").unwrap();
        let config = BatchConfig::builder(tmp.path()).build().unwrap();
        let signal = ProgressSignal::new();
        orchestrator().run(&config, &signal).unwrap();
        assert_eq!(signal.documents(), (2, 2));
        assert_eq!(signal.status(), BatchStatus::Complete { failed: 1 });
    }

    #[tokio::test]
    async fn spawned_batch_reaches_terminal_state() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.pdf"), "pages:2").unwrap();
        let config = BatchConfig::builder(tmp.path()).build().unwrap();
        let signal = ProgressSignal::new();

        let handle = spawn_batch(config, signal.clone(), || {
            Ok(SolidBackend { colour: [1, 2, 3] })
        });
        let report = handle.await.unwrap().unwrap();

        assert_eq!(report.stats.pages_written, 2);
        assert_eq!(signal.status(), BatchStatus::Complete { failed: 0 });
    }

    #[tokio::test]
    async fn backend_is_built_once_per_batch() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let tmp = TempDir::new().unwrap();
        for name in ["a.pdf", "b.pdf", "c.pdf"] {
            std::fs::write(tmp.path().join(name), "pages:2").unwrap();
        }
        let config = BatchConfig::builder(tmp.path()).build().unwrap();
        let builds = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&builds);
        let handle = spawn_batch(config, ProgressSignal::new(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(SolidBackend { colour: [0, 0, 0] })
        });
        let report = handle.await.unwrap().unwrap();

        assert_eq!(report.stats.pages_written, 6);
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn backend_setup_failure_fails_signal() {
        let tmp = TempDir::new().unwrap();
        let config = BatchConfig::builder(tmp.path()).build().unwrap();
        let signal = ProgressSignal::new();

        let handle = spawn_batch(config, signal.clone(), || -> Result<SolidBackend, _> {
            Err(Pdf2PngError::PdfiumBindingFailed("no library".into()))
        });
        assert!(handle.await.unwrap().is_err());
        assert!(matches!(signal.status(), BatchStatus::Failed(r) if r.contains("no library")));
    }

    struct PanickingBackend;

    impl Rasterizer for PanickingBackend {
        fn open<'a>(&'a self, _path: &Path) -> Result<Box<dyn RasterDocument + 'a>, DocumentError> {
            panic!("backend crashed");
        }
    }

    #[tokio::test]
    async fn worker_panic_still_reaches_terminal_state() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.pdf"), "pages:1").unwrap();
        let config = BatchConfig::builder(tmp.path()).build().unwrap();
        let signal = ProgressSignal::new();

        let handle = spawn_batch(config, signal.clone(), || Ok(PanickingBackend));
        assert!(handle.await.is_err());
        assert!(matches!(signal.status(), BatchStatus::Failed(_)));
    }
}
