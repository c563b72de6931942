// src/edgar/index.rs
//! Parsing of EDGAR `master.idx` full-index files.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::edgar::models::{FormType, IndexEntry};

static FORM_10K_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^10-?K(?:SB|SB40|405)?$").expect("Failed to compile FORM_10K_RE"));
static FORM_10KA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^10-?K(?:SB|SB40|405)?/A$").expect("Failed to compile FORM_10KA_RE"));
static FORM_10Q_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^10-?Q(?:SB|SB40|405)?$").expect("Failed to compile FORM_10Q_RE"));
static FORM_10QA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^10-?Q(?:SB|SB40|405)?/A$").expect("Failed to compile FORM_10QA_RE"));
static FORM_8K_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^8.?K$").expect("Failed to compile FORM_8K_RE"));

// Only full-text submissions (`<accession>.txt`) are downloadable filings
static FILING_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^edgar/data/.*/[\d-]+\.txt$").expect("Failed to compile FILING_PATH_RE")
});

/// Returns true if an index form-type column (e.g. `10-K405`) belongs to `form`.
pub fn matches_form(form: FormType, raw_form: &str) -> bool {
    let raw_form = raw_form.trim();
    let re: &Regex = match form {
        FormType::TenK => &FORM_10K_RE,
        FormType::TenKAmended => &FORM_10KA_RE,
        FormType::TenQ => &FORM_10Q_RE,
        FormType::TenQAmended => &FORM_10QA_RE,
        FormType::EightK => &FORM_8K_RE,
    };
    re.is_match(raw_form)
}

/// Parses one `CIK|Company Name|Form Type|Date Filed|Filename` line.
/// Header lines, separators and non-submission paths yield `None`.
pub fn parse_line(line: &str) -> Option<IndexEntry> {
    let fields: Vec<&str> = line.trim_end().split('|').collect();
    if fields.len() != 5 {
        return None;
    }
    let path = fields[4].trim();
    if !FILING_PATH_RE.is_match(path) {
        return None;
    }
    Some(IndexEntry {
        cik: fields[0].trim().to_string(),
        company_name: fields[1].trim().to_string(),
        form_type: fields[2].trim().to_string(),
        date_filed: fields[3].trim().to_string(),
        path: path.to_string(),
    })
}

/// All entries of `form` in an index file's contents, in file order.
pub fn entries_for_form(index_text: &str, form: FormType) -> Vec<IndexEntry> {
    let entries: Vec<IndexEntry> = index_text
        .lines()
        .filter_map(parse_line)
        .filter(|entry| matches_form(form, &entry.form_type))
        .collect();
    tracing::debug!("Index lists {} {} filings", entries.len(), form);
    entries
}
