// src/edgar/models.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::error::ExtractError;

/// Form types handled by the pipeline, as written in EDGAR index files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormType {
    #[serde(rename = "8-k")]
    EightK,
    #[serde(rename = "10-k")]
    TenK,
    #[serde(rename = "10-k/a")]
    TenKAmended,
    #[serde(rename = "10-q")]
    TenQ,
    #[serde(rename = "10-q/a")]
    TenQAmended,
}

/// Forms that share a heading layout. Amendments reprint the sections of
/// their base form, so they share its anchor patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormFamily {
    Annual,
    Quarterly,
    Current,
}

impl FormType {
    pub const ALL: [FormType; 5] = [
        FormType::EightK,
        FormType::TenK,
        FormType::TenKAmended,
        FormType::TenQ,
        FormType::TenQAmended,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FormType::EightK => "8-k",
            FormType::TenK => "10-k",
            FormType::TenKAmended => "10-k/a",
            FormType::TenQ => "10-q",
            FormType::TenQAmended => "10-q/a",
        }
    }

    /// Directory name for this form under the filings tree (no path separators).
    pub fn dir_name(&self) -> String {
        self.as_str().replace('/', "-")
    }

    pub fn family(&self) -> FormFamily {
        match self {
            FormType::TenK | FormType::TenKAmended => FormFamily::Annual,
            FormType::TenQ | FormType::TenQAmended => FormFamily::Quarterly,
            FormType::EightK => FormFamily::Current,
        }
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormType {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        FormType::ALL
            .into_iter()
            .find(|form| form.as_str() == wanted || form.dir_name() == wanted)
            .ok_or_else(|| ExtractError::UnknownFormType(s.to_string()))
    }
}

/// The narrative sections the engine knows how to locate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionType {
    /// Management's Discussion and Analysis (and its older variants)
    #[serde(rename = "mda")]
    Mda,
    /// Item 1, Business
    #[serde(rename = "item1")]
    Business,
}

impl SectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionType::Mda => "mda",
            SectionType::Business => "item1",
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionType {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mda" | "md&a" => Ok(SectionType::Mda),
            "item1" | "item-1" | "business" => Ok(SectionType::Business),
            _ => Err(ExtractError::UnknownSectionType(s.to_string())),
        }
    }
}

/// One (year, quarter) partition of the EDGAR full index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Quarter {
    pub year: u32,
    pub qtr: u8,
}

impl Quarter {
    /// Every quarter of every year in `start..=end`, in chronological order.
    pub fn range(start: u32, end: u32) -> Vec<Quarter> {
        (start..=end)
            .flat_map(|year| (1..=4).map(move |qtr| Quarter { year, qtr }))
            .collect()
    }

    pub fn index_url(&self) -> String {
        format!(
            "https://www.sec.gov/Archives/edgar/full-index/{}/QTR{}/master.idx",
            self.year, self.qtr
        )
    }

    pub fn index_file_name(&self) -> String {
        format!("{}_q{}.idx", self.year, self.qtr)
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_Q{}", self.year, self.qtr)
    }
}

/// A single line of an EDGAR `master.idx` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub cik: String,
    pub company_name: String,
    pub form_type: String,
    pub date_filed: String,
    /// Archive path, e.g. `edgar/data/320193/0000320193-96-000023.txt`
    pub path: String,
}

impl IndexEntry {
    /// File name of the full-text submission (last path segment).
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn url(&self) -> String {
        format!("https://www.sec.gov/Archives/{}", self.path)
    }
}

/// Number of index entries of one form type in one quarter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilingCount {
    pub year: u32,
    pub quarter: u8,
    pub no_of_filings: usize,
}
