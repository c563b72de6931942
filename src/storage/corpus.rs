// src/storage/corpus.rs
//! Concatenation of extracted sections into a single corpus file.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::edgar::models::{FormType, SectionType};
use crate::storage::FilingStore;
use crate::utils::error::StorageError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusSummary {
    pub path: PathBuf,
    pub kept: usize,
    pub too_short: usize,
    pub unreadable: usize,
}

/// Writes every extracted `section` of `form` longer than `min_len` characters
/// to `all_<section>.txt` in the form directory, one section per line.
/// The corpus is rebuilt from scratch on each call.
pub fn gather_sections(
    store: &FilingStore,
    form: FormType,
    section: SectionType,
    min_len: usize,
) -> Result<CorpusSummary, StorageError> {
    let form_dir = store.form_dir(form);
    fs::create_dir_all(&form_dir)?;

    let pattern = format!(
        "{}/*/q*/*_{}.txt",
        glob::Pattern::escape(&form_dir.to_string_lossy()),
        section.as_str()
    );
    let mut sources: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| StorageError::Pattern(format!("{}: {}", pattern, e)))?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .collect();
    sources.sort();

    let path = form_dir.join(format!("all_{}.txt", section.as_str()));
    let mut writer = BufWriter::new(File::create(&path)?);
    let mut kept = 0;
    let mut too_short = 0;
    let mut unreadable = 0;

    for source in &sources {
        let text = match fs::read(source) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                tracing::error!("Failed to read {}: {}", source.display(), e);
                unreadable += 1;
                continue;
            }
        };
        // sections are single-line already; guard against hand-edited files
        let line = text.trim().replace('\n', " ");
        if line.chars().count() > min_len {
            writeln!(writer, "{}", line)?;
            kept += 1;
        } else {
            tracing::debug!("Skipping {} (shorter than {} chars)", source.display(), min_len);
            too_short += 1;
        }
    }
    writer.flush()?;

    tracing::info!(
        "Gathered {} {} sections into {} ({} too short)",
        kept,
        section,
        path.display(),
        too_short
    );
    Ok(CorpusSummary {
        path,
        kept,
        too_short,
        unreadable,
    })
}
