//! CLI binary for edgequake-collector.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `CollectorConfig` / `ConversionRequest` and prints the result.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_collector::{
    CancellationToken, Collector, CollectorConfig, ConversionProgressCallback, ConversionRequest,
    ConversionResult, DocumentOverrides, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per sheet.
/// Sheets finish out of order, so per-unit timings are keyed by index.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    skipped: AtomicUsize,
}

impl CliProgressCallback {
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening file…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            skipped: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} units  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Converting");
    }

    fn elapsed(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .unwrap()
            .remove(&index)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_units: usize) {
        self.activate_bar(total_units);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total_units} unit(s)…"))
        ));
    }

    fn on_unit_start(&self, index: usize, _total: usize, name: &str) {
        self.start_times.lock().unwrap().insert(index, Instant::now());
        self.bar.set_message(name.to_string());
    }

    fn on_unit_complete(&self, index: usize, total: usize, name: &str, word_count: usize) {
        let secs = self.elapsed(index);
        self.bar.println(format!(
            "  {} {:>3}/{:<3} {:<24} {}  {}",
            green("✓"),
            index + 1,
            total,
            name,
            dim(&format!("{word_count:>7} words")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_unit_skipped(&self, index: usize, total: usize, name: &str, reason: &str) {
        let secs = self.elapsed(index);
        self.skipped.fetch_add(1, Ordering::SeqCst);

        let msg = if reason.chars().count() > 80 {
            let cut: String = reason.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            reason.to_string()
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3} {:<24} {}  {}",
            yellow("–"),
            index + 1,
            total,
            name,
            yellow(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total_units: usize, produced: usize) {
        self.bar.finish_and_clear();
        let skipped = self.skipped.load(Ordering::SeqCst);
        if skipped == 0 {
            eprintln!("{} {} unit(s) converted", green("✔"), bold(&produced.to_string()));
        } else {
            eprintln!(
                "{} {}/{} unit(s) converted  ({} skipped)",
                if produced == 0 { red("✘") } else { cyan("⚠") },
                bold(&produced.to_string()),
                total_units,
                yellow(&skipped.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a staged file and persist its documents
  collector report.xlsx --staging-dir ./hotdir --documents-dir ./storage/documents

  # Preview only: nothing is written, the result is printed as JSON
  collector notes.md --staging-dir ./hotdir --documents-dir ./storage/documents \
      --parse-only --json

  # Override document metadata
  collector minutes.txt --title "Board minutes" --author "Secretariat" ...

BEHAVIOUR:
  The staged file is deleted once a converter has taken it, whether the
  conversion succeeds or not. Bad paths, reserved names, missing files and
  names without an extension leave it in place.

  Exit status is 1 when the conversion did not succeed.

ENVIRONMENT VARIABLES:
  COLLECTOR_STAGING_DIR     Staging directory (same as --staging-dir)
  COLLECTOR_DOCUMENTS_DIR   Documents store root (same as --documents-dir)
  COLLECTOR_CONCURRENCY     Maximum sheets converted at once
  RUST_LOG                  Override the log filter (e.g. edgequake_collector=debug)
"#;

/// Convert staged files into canonical documents.
#[derive(Parser, Debug)]
#[command(
    name = "collector",
    version,
    about = "Convert staged text, CSV and spreadsheet files into canonical documents",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// File name relative to the staging directory.
    target: String,

    /// Directory holding staged uploads.
    #[arg(long, env = "COLLECTOR_STAGING_DIR")]
    staging_dir: PathBuf,

    /// Root of the documents store.
    #[arg(long, env = "COLLECTOR_DOCUMENTS_DIR")]
    documents_dir: PathBuf,

    /// Preview mode: return documents without writing them.
    #[arg(long, env = "COLLECTOR_PARSE_ONLY")]
    parse_only: bool,

    /// Document title override.
    #[arg(long)]
    title: Option<String>,

    /// Document author override.
    #[arg(long)]
    author: Option<String>,

    /// Document description override.
    #[arg(long)]
    description: Option<String>,

    /// Document source override.
    #[arg(long)]
    doc_source: Option<String>,

    /// Chunk source override.
    #[arg(long)]
    chunk_source: Option<String>,

    /// Maximum number of sheets converted at once. Default: number of CPUs.
    #[arg(short, long, env = "COLLECTOR_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Print the full result as JSON.
    #[arg(long, env = "COLLECTOR_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "COLLECTOR_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "COLLECTOR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "COLLECTOR_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose always wins.
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let collector = Collector::new(config);

    let request = ConversionRequest::new(cli.target.clone())
        .parse_only(cli.parse_only)
        .metadata(DocumentOverrides {
            title: cli.title.clone(),
            doc_author: cli.author.clone(),
            description: cli.description.clone(),
            doc_source: cli.doc_source.clone(),
            chunk_source: cli.chunk_source.clone(),
        });

    // ── Run conversion; Ctrl-C skips the sheets not yet finished ─────────
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let started = Instant::now();
    let result = collector.convert_with_cancel(&request, cancel).await;

    if cli.json {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialise result")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&result, cli.parse_only, started.elapsed());
    }

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<CollectorConfig> {
    let mut builder = CollectorConfig::builder()
        .staging_root(&cli.staging_dir)
        .documents_root(&cli.documents_dir);

    if let Some(n) = cli.concurrency {
        builder = builder.concurrency(n);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(result: &ConversionResult, parse_only: bool, elapsed: Duration) {
    if !result.success {
        eprintln!(
            "{} {}",
            red("✘"),
            result.reason.as_deref().unwrap_or("conversion failed")
        );
        return;
    }

    for doc in &result.documents {
        let place = match (&doc.location, parse_only) {
            (Some(loc), _) => loc.clone(),
            (None, true) => "preview".to_string(),
            (None, false) => "-".to_string(),
        };
        println!(
            "{}  {}  {}  {}",
            bold(&doc.title),
            dim(&format!("{} words / {} tokens", doc.word_count, doc.token_count_estimate)),
            dim(&doc.id.to_string()),
            place
        );
    }
    eprintln!(
        "{} {} document(s) in {}ms",
        green("✔"),
        result.documents.len(),
        elapsed.as_millis()
    );
}
