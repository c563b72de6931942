// src/storage/mod.rs
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::edgar::header::FilingMetadata;
use crate::edgar::models::{FilingCount, FormType, IndexEntry, Quarter, SectionType};
use crate::utils::error::StorageError;

pub mod corpus;

/// On-disk layout of downloaded filings, extracted sections and audit logs:
///
/// ```text
/// <base>/index/<year>_q<q>.idx
/// <base>/counts_<form-dir>.json
/// <base>/filings/<form-dir>/metadata.jsonl
/// <base>/filings/<form-dir>/log_*.txt
/// <base>/filings/<form-dir>/<year>/q<q>/<accession>.txt
/// <base>/filings/<form-dir>/<year>/q<q>/<accession>_<section>.txt
/// ```
#[derive(Debug, Clone)]
pub struct FilingStore {
    base_dir: PathBuf,
}

impl FilingStore {
    /// Creates a new FilingStore rooted at `base_dir`, creating it if needed.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    pub fn index_path(&self, quarter: Quarter) -> PathBuf {
        self.base_dir.join("index").join(quarter.index_file_name())
    }

    pub fn form_dir(&self, form: FormType) -> PathBuf {
        self.base_dir.join("filings").join(form.dir_name())
    }

    pub fn quarter_dir(&self, form: FormType, quarter: Quarter) -> PathBuf {
        self.form_dir(form)
            .join(quarter.year.to_string())
            .join(format!("q{}", quarter.qtr))
    }

    pub fn filing_path(&self, form: FormType, quarter: Quarter, entry: &IndexEntry) -> PathBuf {
        self.quarter_dir(form, quarter).join(entry.file_name())
    }

    /// Where the extracted `section` of `filing` is written.
    pub fn section_output_path(filing: &Path, section: SectionType) -> PathBuf {
        let stem = filing.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
        filing.with_file_name(format!("{}_{}.txt", stem, section.as_str()))
    }

    /// Downloaded filings of `form` for the given years, sorted by path.
    /// Section outputs (stems containing `_`) are not filings and are skipped.
    pub fn list_filings(&self, form: FormType, years: RangeInclusive<u32>) -> Result<Vec<PathBuf>, StorageError> {
        let mut filings = Vec::new();
        for year in years {
            let year_dir = self.form_dir(form).join(year.to_string());
            if !year_dir.is_dir() {
                tracing::debug!("No filings directory {}", year_dir.display());
                continue;
            }
            let pattern = format!("{}/q*/*.txt", glob::Pattern::escape(&year_dir.to_string_lossy()));
            let matches = glob::glob(&pattern).map_err(|e| StorageError::Pattern(format!("{}: {}", pattern, e)))?;

            for entry in matches {
                match entry {
                    Ok(path) if is_filing(&path) => filings.push(path),
                    Ok(_) => {}
                    Err(e) => tracing::warn!("Skipping unreadable entry: {}", e),
                }
            }
        }
        filings.sort();
        Ok(filings)
    }

    /// Opens (appending) one of the audit logs of a form directory.
    pub fn audit_log(&self, form: FormType, name: &str) -> Result<AuditLog, StorageError> {
        AuditLog::open(self.form_dir(form).join(format!("log_{}.txt", name)))
    }

    /// Appends one metadata record to `metadata.jsonl` of the form directory.
    pub fn append_metadata(&self, form: FormType, metadata: &FilingMetadata) -> Result<PathBuf, StorageError> {
        let form_dir = self.form_dir(form);
        fs::create_dir_all(&form_dir)?;
        let path = form_dir.join("metadata.jsonl");

        let line = serde_json::to_string(metadata).map_err(|e| StorageError::SerializationError(e.to_string()))?;
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{}", line)?;

        tracing::debug!("Appended metadata for {:?} to {}", metadata.fname, path.display());
        Ok(path)
    }

    /// Writes per-quarter filing counts as pretty JSON.
    pub fn save_counts(&self, form: FormType, counts: &[FilingCount]) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join(format!("counts_{}.json", form.dir_name()));

        let counts_str =
            serde_json::to_string_pretty(counts).map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&file_path, counts_str).map_err(StorageError::IoError)?;

        tracing::info!("Saved counts to {}", file_path.display());
        Ok(file_path)
    }
}

fn is_filing(path: &Path) -> bool {
    path.file_stem()
        .map(|stem| !stem.to_string_lossy().contains('_'))
        .unwrap_or(false)
}

/// Append-only audit trail shared by worker threads.
#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    file: Mutex<File>,
}

/// `[YYYY-mm-dd HH:MM:SS] <message>\t Length: <n> chars`
pub fn format_audit_line(timestamp: &chrono::NaiveDateTime, message: &str, length: usize) -> String {
    format!("[{}] {}\t Length: {} chars", timestamp.format("%Y-%m-%d %H:%M:%S"), message, length)
}

impl AuditLog {
    pub fn open(path: PathBuf) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, message: &str, length: usize) -> Result<(), StorageError> {
        let line = format_audit_line(&chrono::Local::now().naive_local(), message, length);
        // a panicked writer leaves the file usable
        let mut file = self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        writeln!(file, "{}", line)?;
        Ok(())
    }
}
