//! CLI binary for edgequake-pdf2png.
//!
//! A thin shim over the library crate that maps CLI flags to `BatchConfig`,
//! runs the batch on a worker thread and animates its status until done.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2png::{
    poll_until_terminal, spawn_pdfium_batch, BatchConfig, BatchProgressCallback, BatchReport,
    BatchStatus, DocumentError, ProgressCallback, ProgressSignal, StatusPresenter,
    DEFAULT_POLL_INTERVAL, DEFAULT_SCALE, DEFAULT_THRESHOLD,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ── Presenters ───────────────────────────────────────────────────────────────

/// Single-line status driven by the polling loop. The loop supplies the
/// spinner frame, so the bar itself never ticks.
struct SpinnerPresenter {
    bar: ProgressBar,
}

impl SpinnerPresenter {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{msg:.cyan}  {prefix:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        Self { bar }
    }

    /// Per-document log lines printed above this spinner.
    fn callback(&self) -> ProgressCallback {
        Arc::new(CliProgressCallback {
            bar: self.bar.clone(),
            pages: AtomicUsize::new(0),
        })
    }
}

impl StatusPresenter for SpinnerPresenter {
    fn show_status(&mut self, text: &str) {
        self.bar.set_message(text.to_string());
    }

    fn finish(&mut self, status: &BatchStatus) {
        self.bar.finish_and_clear();
        let line = match status {
            BatchStatus::Complete { failed: 0 } => format!("{} {}", green("✔"), status),
            BatchStatus::Complete { .. } => format!("{} {}", cyan("⚠"), status),
            _ => format!("{} {}", red("✘"), red(&status.message())),
        };
        eprintln!("{line}");
    }
}

/// Plain output for `--no-progress`, `--json` and `--quiet`.
struct PlainPresenter {
    silent: bool,
    announced: bool,
}

impl StatusPresenter for PlainPresenter {
    fn show_status(&mut self, _text: &str) {
        if !self.silent && !self.announced {
            eprintln!("{}", BatchStatus::Running);
            self.announced = true;
        }
    }

    fn finish(&mut self, status: &BatchStatus) {
        if !self.silent {
            eprintln!("{status}");
        }
    }
}

// ── CLI progress callback ────────────────────────────────────────────────────

/// Prints one line per finished document above the spinner.
struct CliProgressCallback {
    bar: ProgressBar,
    pages: AtomicUsize,
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total_documents} document(s)…"))
        ));
    }

    fn on_document_start(&self, document: &Path, index: usize, total: usize) {
        self.pages.store(0, Ordering::SeqCst);
        self.bar
            .set_prefix(format!("[{index}/{total}] {}", file_label(document)));
    }

    fn on_page_written(&self, document: &Path, page_num: usize, total_pages: usize, _out: &Path) {
        self.pages.fetch_add(1, Ordering::SeqCst);
        self.bar.set_prefix(format!(
            "{}  page {page_num}/{total_pages}",
            file_label(document)
        ));
    }

    fn on_document_complete(&self, document: &Path, pages_written: usize) {
        self.bar.println(format!(
            "  {} {:<40} {}",
            green("✓"),
            file_label(document),
            dim(&format!("{pages_written} page(s)")),
        ));
    }

    fn on_document_error(&self, document: &Path, error: &DocumentError) {
        let written = self.pages.load(Ordering::SeqCst);
        let mut msg = error.to_string();
        // Keep the log tidy.
        if msg.chars().count() > 80 {
            msg = msg.chars().take(79).collect::<String>() + "\u{2026}";
        }
        self.bar.println(format!(
            "  {} {:<40} {}  {}",
            red("✗"),
            file_label(document),
            red(&msg),
            dim(&format!("{written} page(s) kept")),
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert every PDF in ./scans into ./scans/processed
  pdf2png scans

  # Prompt for the folder interactively
  pdf2png

  # Lower resolution (2 × 72 = 144 DPI), custom output folder
  pdf2png --scale 2 -o overlays scans

  # Keep light greys opaque: only pixels brighter than 240 become transparent
  pdf2png --threshold 240 scans

  # Machine-readable report
  pdf2png --json scans > report.json

OUTPUT:
  <output>/<pdf name without extension>_page_<n>.png, RGBA, n starting at 1.
  Pixels whose red, green and blue are all above the threshold become fully
  transparent; every other pixel keeps its colour and is fully opaque.

EXIT CODES:
  0  every document converted
  1  some documents failed (the rest were converted)
  2  the batch failed: bad folder, missing PDFium, or every document failed

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH     Path to libpdfium (file or directory)
  RUST_LOG            Override log filtering (e.g. edgequake_pdf2png=debug)
"#;

/// Convert every PDF in a folder into transparent-background PNGs.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2png",
    version,
    about = "Render PDF pages to PNGs with a transparent near-white background",
    long_about = "Render every page of every PDF in a folder to a PNG. Near-white pixels \
become transparent so the result can be laid over other artwork. Output goes to \
<folder>/processed unless --output-dir is given.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Folder containing the PDFs. Prompted for when omitted.
    input_dir: Option<PathBuf>,

    /// Write PNGs to this folder instead of <INPUT_DIR>/processed.
    #[arg(short, long, env = "PDF2PNG_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Render scale; 1.0 = 72 DPI.
    #[arg(long, env = "PDF2PNG_SCALE", default_value_t = DEFAULT_SCALE)]
    scale: f32,

    /// Pixels with R, G and B all above this value become transparent.
    #[arg(long, env = "PDF2PNG_THRESHOLD", default_value_t = DEFAULT_THRESHOLD)]
    threshold: u8,

    /// File extension of documents to convert.
    #[arg(long, default_value = "pdf")]
    extension: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2PNG_PASSWORD")]
    password: Option<String>,

    /// Print the batch report as JSON on stdout.
    #[arg(long, env = "PDF2PNG_JSON")]
    json: bool,

    /// Disable the spinner.
    #[arg(long, env = "PDF2PNG_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2PNG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2PNG_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters; INFO logs would
    // tear it apart.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let interactive = cli.input_dir.is_none();
    let code = match run(&cli, show_progress).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", red("error:"), e);
            ExitCode::from(2)
        }
    };

    if interactive {
        tokio::task::block_in_place(wait_for_enter);
    }
    code
}

async fn run(cli: &Cli, show_progress: bool) -> Result<ExitCode> {
    let input_dir = match cli.input_dir {
        Some(ref dir) => dir.clone(),
        None => tokio::task::block_in_place(prompt_for_folder)?,
    };

    let (mut presenter, progress_cb): (Box<dyn StatusPresenter>, Option<ProgressCallback>) =
        if show_progress {
            let spinner = SpinnerPresenter::new();
            let cb = spinner.callback();
            (Box::new(spinner), Some(cb))
        } else {
            let plain = PlainPresenter {
                silent: cli.quiet || cli.json,
                announced: false,
            };
            (Box::new(plain), None)
        };

    let config = build_config(cli, input_dir, progress_cb)?;

    // ── Run batch ────────────────────────────────────────────────────────
    let signal = ProgressSignal::new();
    let worker = spawn_pdfium_batch(config, signal.clone());
    let status = poll_until_terminal(&signal, presenter.as_mut(), DEFAULT_POLL_INTERVAL).await;

    let report = worker
        .await
        .context("Batch worker stopped unexpectedly")?
        .context("Batch failed")?;

    // ── Report ───────────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&report);
    }

    Ok(exit_code(&report, &status))
}

/// Map CLI args to `BatchConfig`.
fn build_config(
    cli: &Cli,
    input_dir: PathBuf,
    progress: Option<ProgressCallback>,
) -> Result<BatchConfig> {
    let mut builder = BatchConfig::builder(input_dir)
        .scale(cli.scale)
        .threshold(cli.threshold)
        .extension(cli.extension.clone());

    if let Some(ref dir) = cli.output_dir {
        builder = builder.output_dir(dir.clone());
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(report: &BatchReport) {
    for doc in report.failures() {
        if let Some(ref e) = doc.error {
            eprintln!("  {} {}", red("✗"), e);
        }
    }
    eprintln!(
        "{}/{} documents  {} pages  {}ms  →  {}",
        report.stats.succeeded,
        report.stats.total_documents,
        report.stats.pages_written,
        report.stats.total_duration_ms,
        bold(&report.output_dir.display().to_string()),
    );
}

fn exit_code(report: &BatchReport, status: &BatchStatus) -> ExitCode {
    match status {
        BatchStatus::Failed(_) => ExitCode::from(2),
        _ if report.all_failed() => ExitCode::from(2),
        _ if report.stats.failed > 0 => ExitCode::from(1),
        _ => ExitCode::SUCCESS,
    }
}

/// Ask for the input folder on stdin.
fn prompt_for_folder() -> Result<PathBuf> {
    eprint!("Folder containing the PDFs to convert: ");
    io::stderr().flush().ok();

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read folder from stdin")?;

    // Paths dragged into a terminal often arrive quoted.
    let trimmed = line.trim().trim_matches(|c| c == '"' || c == '\'');
    if trimmed.is_empty() {
        anyhow::bail!("No folder selected");
    }
    Ok(PathBuf::from(trimmed))
}

fn wait_for_enter() {
    eprint!("Press Enter to close.");
    io::stderr().flush().ok();
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).ok();
}
