// src/main.rs
mod batch;
mod edgar;
mod extractors;
mod storage;
mod utils;

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use batch::{BatchRunner, BatchSummary};
use edgar::client::EdgarClient;
use edgar::models::{FilingCount, FormType, Quarter, SectionType};
use extractors::normalize::Normalizer;
use extractors::section::SectionExtractor;
use storage::FilingStore;
use utils::config::Settings;
use utils::error::EdgarError;
use utils::AppError;

/// Command Line Interface for downloading SEC EDGAR filings and extracting their sections
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Root directory for indices, filings and extracted sections
    #[arg(short, long, default_value = "./output", global = true)]
    output_dir: PathBuf,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone, Copy)]
struct YearRange {
    /// First year to process
    #[arg(long, default_value_t = 1996)]
    start: u32,

    /// Last year to process (inclusive)
    #[arg(long, default_value_t = 2020)]
    end: u32,
}

impl YearRange {
    fn years(&self) -> Result<RangeInclusive<u32>, AppError> {
        if self.start > self.end {
            return Err(AppError::Config(format!(
                "start year {} is after end year {}",
                self.start, self.end
            )));
        }
        Ok(self.start..=self.end)
    }

    fn quarters(&self) -> Result<Vec<Quarter>, AppError> {
        let years = self.years()?;
        Ok(Quarter::range(*years.start(), *years.end()))
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download the quarterly EDGAR master indices
    DownloadIndex {
        #[command(flatten)]
        range: YearRange,

        /// Agent to identify with SEC EDGAR ("ORG_NAME mail@address")
        #[arg(long)]
        user_agent: Option<String>,
    },

    /// Count filings of a form type per quarter in the downloaded indices
    CountFilings {
        #[command(flatten)]
        range: YearRange,

        /// One of: 8-k, 10-k, 10-k/a, 10-q, 10-q/a
        #[arg(long, default_value = "10-k")]
        form_type: FormType,
    },

    /// Download the first N filings of a form type per quarter
    DownloadFilings {
        #[command(flatten)]
        range: YearRange,

        #[arg(long, default_value = "10-k")]
        form_type: FormType,

        /// Number of filings to download per quarter
        #[arg(short = 'n', long = "no-of-filings", default_value_t = 10)]
        no_of_filings: usize,

        #[arg(long)]
        user_agent: Option<String>,
    },

    /// Normalize downloaded filings in place
    CleanFilings {
        #[command(flatten)]
        range: YearRange,

        #[arg(long, default_value = "10-k")]
        form_type: FormType,

        /// Worker threads (default: one per core)
        #[arg(long)]
        workers: Option<usize>,

        /// Tables with a digit share at or above this are dropped
        #[arg(long)]
        table_ratio: Option<f64>,
    },

    /// Extract a section from every downloaded filing
    Extract {
        #[command(flatten)]
        range: YearRange,

        #[arg(long, default_value = "10-k")]
        form_type: FormType,

        /// One of: mda, item1
        #[arg(long, default_value = "mda")]
        section: SectionType,

        #[arg(long)]
        workers: Option<usize>,

        #[arg(long)]
        table_ratio: Option<f64>,
    },

    /// Concatenate extracted sections into all_<section>.txt
    Gather {
        #[arg(long, default_value = "10-k")]
        form_type: FormType,

        #[arg(long, default_value = "mda")]
        section: SectionType,

        /// Minimum section length in characters
        #[arg(long)]
        min_length: Option<usize>,
    },

    /// Write an annotated HTML page showing every anchor hit in one filing
    Inspect {
        #[arg(long)]
        file: PathBuf,

        #[arg(long, default_value = "10-k")]
        form_type: FormType,

        #[arg(long, default_value = "mda")]
        section: SectionType,

        #[arg(long)]
        out: PathBuf,

        #[arg(long)]
        table_ratio: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Parse CLI Arguments, then set up logging (RUST_LOG overrides --verbose)
    let cli = Cli::parse();
    utils::logging::setup_logging(cli.verbose);
    tracing::info!("Starting processing for args: {:?}", cli);

    // 2. Initialize storage and settings
    let store = FilingStore::new(&cli.output_dir)?;
    let settings = Settings::new();

    // 3. Ctrl-C stops picking up new work; running documents finish
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, finishing documents in progress");
                cancel.store(true, Ordering::SeqCst);
            }
        });
    }

    match cli.command {
        Command::DownloadIndex { range, user_agent } => {
            let settings = settings.with_user_agent(user_agent);
            download_index(&store, &settings, &range, &cancel).await
        }
        Command::CountFilings { range, form_type } => count_filings(&store, &range, form_type).await,
        Command::DownloadFilings {
            range,
            form_type,
            no_of_filings,
            user_agent,
        } => {
            let settings = settings.with_user_agent(user_agent);
            download_filings(&store, &settings, &range, form_type, no_of_filings, &cancel).await
        }
        Command::CleanFilings {
            range,
            form_type,
            workers,
            table_ratio,
        } => {
            let settings = settings.with_workers(workers).with_table_digit_ratio(table_ratio)?;
            let years = range.years()?;
            let runner = BatchRunner::new(store, settings.workers, cancel);
            let normalizer = Normalizer::new(settings.table_digit_ratio);
            let summary = run_blocking(move || runner.clean_filings(form_type, years, &normalizer)).await?;
            check_summary(&summary, "clean")
        }
        Command::Extract {
            range,
            form_type,
            section,
            workers,
            table_ratio,
        } => {
            let settings = settings.with_workers(workers).with_table_digit_ratio(table_ratio)?;
            let years = range.years()?;
            let runner = BatchRunner::new(store, settings.workers, cancel);
            let extractor = SectionExtractor::new(Normalizer::new(settings.table_digit_ratio));
            let summary =
                run_blocking(move || runner.extract_sections(form_type, years, section, &extractor)).await?;
            check_summary(&summary, "extract")
        }
        Command::Gather {
            form_type,
            section,
            min_length,
        } => {
            let settings = settings.with_min_section_length(min_length);
            let summary = storage::corpus::gather_sections(&store, form_type, section, settings.min_section_length)?;
            tracing::info!(
                "Corpus written to {}: {} kept, {} too short, {} unreadable",
                summary.path.display(),
                summary.kept,
                summary.too_short,
                summary.unreadable
            );
            Ok(())
        }
        Command::Inspect {
            file,
            form_type,
            section,
            out,
            table_ratio,
        } => {
            let settings = settings.with_table_digit_ratio(table_ratio)?;
            inspect(&file, form_type, section, &out, settings.table_digit_ratio)
        }
    }
}

/// Runs a batch job off the async runtime.
async fn run_blocking<F>(job: F) -> Result<BatchSummary, AppError>
where
    F: FnOnce() -> Result<BatchSummary, AppError> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| AppError::Processing(format!("Worker task failed: {}", e)))?
}

fn check_summary(summary: &BatchSummary, what: &str) -> Result<(), AppError> {
    if summary.processed == 0 && summary.failed > 0 {
        return Err(AppError::Processing(format!(
            "Failed to {} any of {} filings",
            what, summary.failed
        )));
    }
    Ok(())
}

async fn download_index(
    store: &FilingStore,
    settings: &Settings,
    range: &YearRange,
    cancel: &AtomicBool,
) -> Result<(), AppError> {
    let client = EdgarClient::new(settings.require_user_agent()?, settings)?;

    let mut failure_count = 0;
    for quarter in range.quarters()? {
        if cancel.load(Ordering::SeqCst) {
            break;
        }
        if let Err(e) = client.download_index(quarter, &store.index_path(quarter)).await {
            tracing::error!("Failed to download index {}: {}", quarter, e);
            failure_count += 1;
        }
    }

    tracing::info!("Index download finished. Failures: {}", failure_count);
    Ok(())
}

async fn read_index(store: &FilingStore, quarter: Quarter) -> Result<String, EdgarError> {
    let path = store.index_path(quarter);
    if !path.exists() {
        return Err(EdgarError::IndexNotFound(path.display().to_string()));
    }
    let bytes = tokio::fs::read(&path).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

async fn count_filings(store: &FilingStore, range: &YearRange, form: FormType) -> Result<(), AppError> {
    let mut counts = Vec::new();
    for quarter in range.quarters()? {
        match read_index(store, quarter).await {
            Ok(index) => {
                let no_of_filings = edgar::index::entries_for_form(&index, form).len();
                tracing::info!("{}: {} {} filings", quarter, no_of_filings, form);
                counts.push(FilingCount {
                    year: quarter.year,
                    quarter: quarter.qtr,
                    no_of_filings,
                });
            }
            Err(e) => tracing::warn!("Skipping {}: {}", quarter, e),
        }
    }
    store.save_counts(form, &counts)?;
    Ok(())
}

async fn download_filings(
    store: &FilingStore,
    settings: &Settings,
    range: &YearRange,
    form: FormType,
    per_quarter: usize,
    cancel: &AtomicBool,
) -> Result<(), AppError> {
    let client = EdgarClient::new(settings.require_user_agent()?, settings)?;
    let log = store.audit_log(form, "download")?;

    let mut success_count = 0;
    let mut failure_count = 0;
    'quarters: for quarter in range.quarters()? {
        let index = match read_index(store, quarter).await {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", quarter, e);
                continue;
            }
        };

        for entry in edgar::index::entries_for_form(&index, form).into_iter().take(per_quarter) {
            if cancel.load(Ordering::SeqCst) {
                break 'quarters;
            }
            let dest = store.filing_path(form, quarter, &entry);
            match client.download_filing(&entry, &dest).await {
                Ok(Some(body)) => {
                    success_count += 1;
                    let metadata = edgar::header::parse_header(&body);
                    if let Err(e) = store.append_metadata(form, &metadata) {
                        tracing::error!("Failed to save metadata for {}: {}", entry.file_name(), e);
                    }
                    let message = format!("Downloaded {} to {}", entry.url(), dest.display());
                    if let Err(e) = log.record(&message, body.chars().count()) {
                        tracing::warn!("Could not write audit line: {}", e);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!("Failed to download filing {}: {}", entry.url(), e);
                    failure_count += 1;
                }
            }
        }
    }

    tracing::info!("Processing finished. Success: {}, Failures: {}", success_count, failure_count);

    if success_count == 0 && failure_count > 0 {
        return Err(AppError::Processing(format!(
            "Failed to download any of {} filings",
            failure_count
        )));
    }
    Ok(())
}

fn inspect(file: &Path, form: FormType, section: SectionType, out: &Path, table_ratio: f64) -> Result<(), AppError> {
    let bytes = std::fs::read(file)?;
    let raw = String::from_utf8_lossy(&bytes);

    let extractor = SectionExtractor::new(Normalizer::new(table_ratio));
    let scan = extractor.scan(&raw, form, section);
    match scan.best() {
        Some(best) => tracing::info!(
            "Selected {} span {}..{} ({} chars) out of {} candidates",
            best.variant,
            best.start,
            best.end,
            best.char_len(),
            scan.candidates().count()
        ),
        None => tracing::warn!("No {} section found in {}", section, file.display()),
    }

    let title = format!("{} / {} / {}", file.display(), form, section);
    utils::html_debug::create_debug_html(&scan, out, &title)
}
