// src/batch/mod.rs
//! Parallel processing of downloaded filings.

use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::edgar::models::{FormType, SectionType};
use crate::extractors::normalize::Normalizer;
use crate::extractors::section::SectionExtractor;
use crate::storage::{AuditLog, FilingStore};
use crate::utils::error::{AppError, StorageError};

/// Counts reported at the end of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: usize,
}

enum Outcome {
    Processed,
    Skipped,
}

#[derive(Default)]
struct Counters {
    processed: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
    cancelled: AtomicUsize,
}

impl Counters {
    fn summary(&self) -> BatchSummary {
        BatchSummary {
            processed: self.processed.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            cancelled: self.cancelled.load(Ordering::SeqCst),
        }
    }
}

/// Runs per-filing jobs on a rayon pool. A failing document is logged and
/// counted, never fatal; setting the cancel flag stops picking up new work.
pub struct BatchRunner {
    store: FilingStore,
    workers: Option<usize>,
    cancel: Arc<AtomicBool>,
}

impl BatchRunner {
    pub fn new(store: FilingStore, workers: Option<usize>, cancel: Arc<AtomicBool>) -> Self {
        Self { store, workers, cancel }
    }

    fn pool(&self) -> Result<rayon::ThreadPool, AppError> {
        rayon::ThreadPoolBuilder::new()
            // 0 lets rayon use one thread per core
            .num_threads(self.workers.unwrap_or(0))
            .thread_name(|i| format!("worker-{}", i))
            .build()
            .map_err(|e| AppError::Processing(format!("Failed to build worker pool: {}", e)))
    }

    fn run<F>(&self, form: FormType, years: RangeInclusive<u32>, job: F) -> Result<BatchSummary, AppError>
    where
        F: Fn(&Path) -> Result<Outcome, StorageError> + Sync,
    {
        let filings = self.store.list_filings(form, years)?;
        tracing::info!("Found {} {} filings to process", filings.len(), form);

        let counters = Counters::default();
        self.pool()?.install(|| {
            filings.par_iter().for_each(|filing| {
                if self.cancel.load(Ordering::SeqCst) {
                    counters.cancelled.fetch_add(1, Ordering::SeqCst);
                    return;
                }
                match job(filing) {
                    Ok(Outcome::Processed) => {
                        counters.processed.fetch_add(1, Ordering::SeqCst);
                    }
                    Ok(Outcome::Skipped) => {
                        counters.skipped.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => {
                        tracing::error!("Failed to process {}: {}", filing.display(), e);
                        counters.failed.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
        });

        let summary = counters.summary();
        if summary.cancelled > 0 {
            tracing::warn!("Interrupted: {} filings left unprocessed", summary.cancelled);
        }
        tracing::info!(
            "Processing finished. Processed: {}, Skipped: {}, Failures: {}",
            summary.processed,
            summary.skipped,
            summary.failed
        );
        Ok(summary)
    }

    /// Normalizes every downloaded filing in place.
    pub fn clean_filings(
        &self,
        form: FormType,
        years: RangeInclusive<u32>,
        normalizer: &Normalizer,
    ) -> Result<BatchSummary, AppError> {
        let log = self.store.audit_log(form, "clean")?;
        self.run(form, years, |filing| {
            let raw = read_lossy(filing)?;
            let cleaned = normalizer.normalize(&raw);
            fs::write(filing, &cleaned)?;
            log_processed(&log, &format!("Cleaned {}", filing.display()), &cleaned);
            Ok(Outcome::Processed)
        })
    }

    /// Extracts `section` from every downloaded filing that has no output yet.
    /// A filing without the section gets an empty output file.
    pub fn extract_sections(
        &self,
        form: FormType,
        years: RangeInclusive<u32>,
        section: SectionType,
        extractor: &SectionExtractor,
    ) -> Result<BatchSummary, AppError> {
        let log = self.store.audit_log(form, &format!("extract_{}", section.as_str()))?;
        self.run(form, years, |filing| {
            let output = FilingStore::section_output_path(filing, section);
            if output.exists() {
                tracing::debug!("{} exists already, skipping", output.display());
                return Ok(Outcome::Skipped);
            }

            let raw = read_lossy(filing)?;
            let extracted = extractor.extract(&raw, form, section);
            match extracted.variant {
                Some(variant) => tracing::debug!(
                    "{} chars of {} {} via {} in {}",
                    extracted.char_len(),
                    extracted.form_type,
                    extracted.section,
                    variant,
                    filing.display()
                ),
                None => tracing::warn!("No {} section found in {}", section, filing.display()),
            }
            fs::write(&output, &extracted.content)?;
            log_processed(
                &log,
                &format!("Extracted {} from {}", section, filing.display()),
                &extracted.content,
            );
            Ok(Outcome::Processed)
        })
    }
}

// Submissions are mostly ASCII; stray bytes must not abort the run
fn read_lossy(path: &Path) -> Result<String, StorageError> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn log_processed(log: &AuditLog, message: &str, text: &str) {
    if let Err(e) = log.record(message, text.chars().count()) {
        tracing::warn!("Could not write audit line to {}: {}", log.path().display(), e);
    }
}
