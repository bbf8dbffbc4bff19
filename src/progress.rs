//! Batch status shared between the worker and the presentation loop, plus an
//! optional event callback for finer-grained progress.
//!
//! [`ProgressSignal`] is the one piece of state both threads touch. The worker
//! is the only writer; the presentation side polls it (see
//! [`crate::surface::poll_until_terminal`]) and stops once it reads a terminal
//! [`BatchStatus`]. Completion is an explicit state, never inferred from
//! whatever text happens to be on screen.
//!
//! [`BatchProgressCallback`] is for callers that want per-document and
//! per-page events (a progress bar, a log line per file).
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2png::{BatchProgressCallback, BatchConfig};
//! use std::path::Path;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PageCounter(AtomicUsize);
//!
//! impl BatchProgressCallback for PageCounter {
//!     fn on_page_written(&self, _doc: &Path, _page: usize, _total: usize, _out: &Path) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let counter = Arc::new(PageCounter(AtomicUsize::new(0)));
//! let config = BatchConfig::builder("scans")
//!     .progress_callback(counter as Arc<dyn BatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::DocumentError;

// ── Status ───────────────────────────────────────────────────────────────

/// Lifecycle of one batch job.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BatchStatus {
    /// Created, not started.
    #[default]
    Idle,
    /// The worker is processing documents.
    Running,
    /// Every document was attempted. `failed` of them recorded an error.
    Complete { failed: usize },
    /// The batch stopped (fatal error) or every document failed.
    Failed(String),
}

impl BatchStatus {
    /// `Complete` and `Failed` end the job; nothing changes afterwards.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Complete { .. } | BatchStatus::Failed(_))
    }

    /// Status line shown to the operator.
    pub fn message(&self) -> String {
        match self {
            BatchStatus::Idle => String::new(),
            BatchStatus::Running => "Processing Images...".to_string(),
            BatchStatus::Complete { failed: 0 } => {
                "Processing complete. You may now close the application.".to_string()
            }
            BatchStatus::Complete { failed } => format!(
                "Processing complete with {failed} failure{}. You may now close the application.",
                if *failed == 1 { "" } else { "s" }
            ),
            BatchStatus::Failed(reason) => format!("Processing failed: {reason}"),
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

const PHASE_IDLE: u8 = 0;
const PHASE_RUNNING: u8 = 1;
const PHASE_COMPLETE: u8 = 2;
const PHASE_FAILED: u8 = 3;

#[derive(Debug, Default)]
struct SignalState {
    phase: AtomicU8,
    /// Failure count for `Complete`, reason for `Failed`. Written before the
    /// phase is published.
    payload: Mutex<Payload>,
    documents_done: AtomicUsize,
    documents_total: AtomicUsize,
}

#[derive(Debug, Default)]
struct Payload {
    failed: usize,
    reason: Option<String>,
}

/// Cloneable handle to a batch's status cell.
///
/// One producer (the batch worker) and any number of readers. Transitions
/// only move forward: `Idle → Running → Complete | Failed`. Attempts to move
/// backwards or leave a terminal state return `false` and change nothing.
#[derive(Debug, Clone, Default)]
pub struct ProgressSignal {
    inner: Arc<SignalState>,
}

impl ProgressSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status snapshot.
    pub fn status(&self) -> BatchStatus {
        match self.inner.phase.load(Ordering::Acquire) {
            PHASE_IDLE => BatchStatus::Idle,
            PHASE_RUNNING => BatchStatus::Running,
            PHASE_COMPLETE => BatchStatus::Complete {
                failed: self.lock_payload().failed,
            },
            _ => BatchStatus::Failed(
                self.lock_payload()
                    .reason
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string()),
            ),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.inner.phase.load(Ordering::Acquire) >= PHASE_COMPLETE
    }

    /// Move `Idle → Running`. Returns `false` if the job was already started,
    /// which is how a front-end disables a second start request.
    pub fn try_start(&self) -> bool {
        self.inner
            .phase
            .compare_exchange(
                PHASE_IDLE,
                PHASE_RUNNING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Move `Running → Complete`.
    pub fn mark_complete(&self, failed: usize) -> bool {
        self.finish(PHASE_COMPLETE, |p| p.failed = failed)
    }

    /// Move `Idle | Running → Failed`. A batch can fail before it starts
    /// (e.g. invalid config), so `Idle` is accepted here.
    pub fn mark_failed(&self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        if self.inner.phase.load(Ordering::Acquire) == PHASE_IDLE {
            self.try_start();
        }
        self.finish(PHASE_FAILED, |p| p.reason = Some(reason))
    }

    /// Record how many documents the worker found.
    pub fn set_total_documents(&self, total: usize) {
        self.inner.documents_total.store(total, Ordering::Release);
    }

    /// Count one more document as attempted (success or failure).
    pub fn document_done(&self) {
        self.inner.documents_done.fetch_add(1, Ordering::AcqRel);
    }

    /// `(attempted, total)` documents so far.
    pub fn documents(&self) -> (usize, usize) {
        (
            self.inner.documents_done.load(Ordering::Acquire),
            self.inner.documents_total.load(Ordering::Acquire),
        )
    }

    fn finish(&self, phase: u8, write: impl FnOnce(&mut Payload)) -> bool {
        // Hold the payload lock across the transition so a reader that sees
        // the new phase also sees the payload written for it.
        let mut payload = self.lock_payload();
        if self.inner.phase.load(Ordering::Acquire) != PHASE_RUNNING {
            return false;
        }
        write(&mut payload);
        self.inner.phase.store(phase, Ordering::Release);
        true
    }

    fn lock_payload(&self) -> std::sync::MutexGuard<'_, Payload> {
        // Payload writes are single field stores; a poisoned lock is still consistent.
        self.inner
            .payload
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ── Event callback ───────────────────────────────────────────────────────

/// Called by the batch orchestrator as it works through the folder.
///
/// All methods default to no-ops so implementors override only what they
/// need. Calls come from the worker thread, one at a time, in document order.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once, after discovery, before the first document is opened.
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called before a document is opened.
    ///
    /// # Arguments
    /// * `index`: 1-indexed position in the batch
    fn on_document_start(&self, document: &Path, index: usize, total_documents: usize) {
        let _ = (document, index, total_documents);
    }

    /// Called after each PNG is written.
    ///
    /// # Arguments
    /// * `page_num`: 1-indexed page number
    fn on_page_written(&self, document: &Path, page_num: usize, total_pages: usize, output: &Path) {
        let _ = (document, page_num, total_pages, output);
    }

    /// Called when every page of a document was written.
    fn on_document_complete(&self, document: &Path, pages_written: usize) {
        let _ = (document, pages_written);
    }

    /// Called when a document stops on its first error.
    fn on_document_error(&self, document: &Path, error: &DocumentError) {
        let _ = (document, error);
    }

    /// Called once after every document has been attempted.
    fn on_batch_complete(&self, total_documents: usize, succeeded: usize) {
        let _ = (total_documents, succeeded);
    }
}

/// A no-op implementation for callers that don't need events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::BatchConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn starts_idle() {
        let s = ProgressSignal::new();
        assert_eq!(s.status(), BatchStatus::Idle);
        assert!(!s.is_terminal());
    }

    #[test]
    fn forward_transitions() {
        let s = ProgressSignal::new();
        assert!(s.try_start());
        assert_eq!(s.status(), BatchStatus::Running);
        assert!(s.mark_complete(2));
        assert_eq!(s.status(), BatchStatus::Complete { failed: 2 });
        assert!(s.is_terminal());
    }

    #[test]
    fn second_start_is_rejected() {
        let s = ProgressSignal::new();
        assert!(s.try_start());
        assert!(!s.try_start());
    }

    #[test]
    fn terminal_state_is_sticky() {
        let s = ProgressSignal::new();
        s.try_start();
        assert!(s.mark_failed("disk gone"));
        assert!(!s.mark_complete(0));
        assert!(!s.try_start());
        assert_eq!(s.status(), BatchStatus::Failed("disk gone".into()));
    }

    #[test]
    fn complete_requires_running() {
        let s = ProgressSignal::new();
        assert!(!s.mark_complete(0));
        assert_eq!(s.status(), BatchStatus::Idle);
    }

    #[test]
    fn failure_before_start_is_recorded() {
        let s = ProgressSignal::new();
        assert!(s.mark_failed("bad config"));
        assert_eq!(s.status(), BatchStatus::Failed("bad config".into()));
    }

    #[test]
    fn clones_share_state() {
        let producer = ProgressSignal::new();
        let consumer = producer.clone();
        producer.try_start();
        producer.set_total_documents(3);
        producer.document_done();
        assert_eq!(consumer.status(), BatchStatus::Running);
        assert_eq!(consumer.documents(), (1, 3));
    }

    #[test]
    fn reader_thread_observes_completion() {
        let signal = ProgressSignal::new();
        signal.try_start();
        let reader = signal.clone();
        let handle = thread::spawn(move || {
            while !reader.is_terminal() {
                thread::sleep(Duration::from_millis(1));
            }
            reader.status()
        });
        thread::sleep(Duration::from_millis(5));
        signal.mark_complete(1);
        assert_eq!(handle.join().unwrap(), BatchStatus::Complete { failed: 1 });
    }

    #[test]
    fn status_messages() {
        assert_eq!(BatchStatus::Running.message(), "Processing Images...");
        assert!(BatchStatus::Complete { failed: 0 }
            .message()
            .starts_with("Processing complete."));
        assert!(BatchStatus::Complete { failed: 1 }
            .message()
            .contains("with 1 failure."));
        assert!(BatchStatus::Complete { failed: 3 }
            .message()
            .contains("with 3 failures."));
        assert!(BatchStatus::Failed("x".into()).message().contains("failed: x"));
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        let doc = Path::new("a.pdf");
        cb.on_batch_start(1);
        cb.on_document_start(doc, 1, 1);
        cb.on_page_written(doc, 1, 1, Path::new("a_page_1.png"));
        cb.on_document_complete(doc, 1);
        cb.on_document_error(doc, &DocumentError::PageIndex { index: 1, total: 1 });
        cb.on_batch_complete(1, 1);
    }
}
