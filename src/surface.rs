//! Presentation seam: how a front-end watches a running batch.
//!
//! The front-end implements [`StatusPresenter`] and hands it to
//! [`poll_until_terminal`], which wakes on a fixed interval, reads the
//! [`ProgressSignal`] and pushes a status line. The loop never blocks on the
//! worker; it only reads the signal.

use crate::progress::{BatchStatus, ProgressSignal};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

/// Spinner frames cycled while the batch is running.
pub const SPINNER_FRAMES: [char; 4] = ['|', '/', '-', '\\'];

/// Default polling period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Something that can show a one-line status to the operator.
pub trait StatusPresenter {
    /// Replace the current status line.
    fn show_status(&mut self, text: &str);

    /// Called once with the terminal status. Defaults to showing its message.
    fn finish(&mut self, status: &BatchStatus) {
        self.show_status(&status.message());
    }
}

/// Status line for the `tick`-th poll while running.
pub fn running_line(tick: usize) -> String {
    format!(
        "Processing Images {}",
        SPINNER_FRAMES[tick % SPINNER_FRAMES.len()]
    )
}

/// Poll `signal` every `period` until it reaches a terminal status.
///
/// While the batch is `Idle` or `Running` the presenter receives
/// `"Processing Images <frame>"`, cycling [`SPINNER_FRAMES`]. Once the status
/// is terminal, [`StatusPresenter::finish`] is called exactly once and the
/// status is returned.
pub async fn poll_until_terminal<P>(
    signal: &ProgressSignal,
    presenter: &mut P,
    period: Duration,
) -> BatchStatus
where
    P: StatusPresenter + ?Sized,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut tick = 0usize;

    loop {
        ticker.tick().await;
        let status = signal.status();
        if status.is_terminal() {
            debug!("Batch reached terminal status after {} polls: {:?}", tick, status);
            presenter.finish(&status);
            return status;
        }
        presenter.show_status(&running_line(tick));
        tick = tick.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        lines: Vec<String>,
        finished: Vec<BatchStatus>,
    }

    impl StatusPresenter for Recorder {
        fn show_status(&mut self, text: &str) {
            self.lines.push(text.to_string());
        }

        fn finish(&mut self, status: &BatchStatus) {
            self.finished.push(status.clone());
            self.show_status(&status.message());
        }
    }

    #[test]
    fn frames_cycle() {
        let lines: Vec<_> = (0..5).map(running_line).collect();
        assert_eq!(
            lines,
            [
                "Processing Images |",
                "Processing Images /",
                "Processing Images -",
                "Processing Images \\",
                "Processing Images |",
            ]
        );
    }

    #[tokio::test]
    async fn already_terminal_finishes_immediately() {
        let signal = ProgressSignal::new();
        assert!(signal.try_start());
        assert!(signal.mark_complete(0));

        let mut rec = Recorder::default();
        let status = poll_until_terminal(&signal, &mut rec, Duration::from_millis(1)).await;

        assert_eq!(status, BatchStatus::Complete { failed: 0 });
        assert_eq!(rec.finished.len(), 1);
        assert_eq!(
            rec.lines,
            ["Processing complete. You may now close the application."]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn spins_until_worker_finishes() {
        let signal = ProgressSignal::new();
        assert!(signal.try_start());

        let worker = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(350)).await;
            worker.mark_failed("disk full");
        });

        let mut rec = Recorder::default();
        let status = poll_until_terminal(&signal, &mut rec, Duration::from_millis(100)).await;

        assert_eq!(status, BatchStatus::Failed("disk full".into()));
        assert_eq!(rec.finished.len(), 1);
        let spinning = &rec.lines[..rec.lines.len() - 1];
        assert!(!spinning.is_empty());
        assert!(spinning.iter().all(|l| l.starts_with("Processing Images ")));
        assert_eq!(rec.lines.last().unwrap(), "Processing failed: disk full");
    }

    #[test]
    fn default_finish_shows_message() {
        struct Last(String);
        impl StatusPresenter for Last {
            fn show_status(&mut self, text: &str) {
                self.0 = text.to_string();
            }
        }
        let mut p = Last(String::new());
        p.finish(&BatchStatus::Complete { failed: 2 });
        assert_eq!(
            p.0,
            "Processing complete with 2 failures. You may now close the application."
        );
    }
}
