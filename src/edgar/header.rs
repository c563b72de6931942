// src/edgar/header.rs
//! Extraction of filer metadata from the `<SEC-HEADER>` block of a full-text submission.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Matches the line that closes the submission header.
pub static HEADER_END_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</(?:SEC|IMS)-HEADER>").expect("Failed to compile HEADER_END_RE"));

static ACCESSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0*(\d+)-(\d{2})-(\d{6})$").expect("Failed to compile ACCESSION_RE"));

/// Filer metadata found in a submission header. Every field is optional since
/// older headers omit most of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilingMetadata {
    pub fname: Option<String>,
    pub cik: Option<String>,
    pub comp_name: Option<String>,
    pub sic: Option<String>,
    pub form_type: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub phone: Option<String>,
    pub date_report: Option<String>,
    pub date_filing: Option<String>,
    pub hlink: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum Field {
    FileName,
    Cik,
    CompanyName,
    Sic,
    FormType,
    Street,
    City,
    State,
    Zip,
    Phone,
    DateReport,
    DateFiling,
}

// Each pattern captures the field value in the group named `v`.
static FIELD_PATTERNS: Lazy<Vec<(Field, Regex)>> = Lazy::new(|| {
    [
        (Field::FileName, r"(?i)<(?:SEC|IMS)-DOCUMENT>.*?(?P<v>\d{10}-\d{2}-\d{6}\.txt)"),
        (Field::Cik, r"(?i)^\s*CENTRAL\s*INDEX\s*KEY:\s*(?P<v>\d{10})"),
        (Field::CompanyName, r"(?i)^\s*COMPANY\s*CONFORMED\s*NAME:\s*(?P<v>.+)"),
        (Field::Sic, r"(?i)^\s*STANDARD\s*INDUSTRIAL\s*CLASSIFICATION:.*?(?P<v>\d{4})"),
        (Field::FormType, r"(?i)^\s*CONFORMED\s*SUBMISSION\s*TYPE:\s(?P<v>.+)"),
        (Field::Street, r"(?i)^\s*STREET\s*1?:\s(?P<v>.+)"),
        (Field::City, r"(?i)^\s*CITY:\s(?P<v>.+)"),
        (Field::State, r"(?i)^\s*STATE:\s(?P<v>.+)"),
        (Field::Zip, r"(?i)^\s*ZIP:\s(?P<v>.+)"),
        (Field::Phone, r"(?i)^\s*(?:BUSINESS)?\s*PHONE(?:\sNUMBER)?:\s(?P<v>.+)"),
        (Field::DateReport, r"(?i)^\s*CONFORMED\s*PERIOD\s*OF\s*REPORT:\s*(?P<v>\d{8})"),
        (Field::DateFiling, r"(?i)^\s*FILED\s*AS\s*OF\s*DATE:\s*(?P<v>\d{8})"),
    ]
    .into_iter()
    .map(|(field, pat)| (field, Regex::new(pat).expect("Failed to compile header field pattern")))
    .collect()
});

impl FilingMetadata {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::FileName => &mut self.fname,
            Field::Cik => &mut self.cik,
            Field::CompanyName => &mut self.comp_name,
            Field::Sic => &mut self.sic,
            Field::FormType => &mut self.form_type,
            Field::Street => &mut self.street,
            Field::City => &mut self.city,
            Field::State => &mut self.state,
            Field::Zip => &mut self.zip,
            Field::Phone => &mut self.phone,
            Field::DateReport => &mut self.date_report,
            Field::DateFiling => &mut self.date_filing,
        }
    }

    /// Link to the filing's EDGAR index page, derived from CIK and accession file name.
    fn filing_index_link(&self) -> Option<String> {
        let cik = self.cik.as_deref()?;
        let accession = self.fname.as_deref()?.strip_suffix(".txt")?;
        if !ACCESSION_RE.is_match(accession) {
            return None;
        }
        let cik = cik.trim_start_matches('0');
        Some(format!(
            "https://www.sec.gov/Archives/edgar/data/{}/{}/{}-index.htm",
            cik,
            accession.replace('-', ""),
            accession
        ))
    }
}

/// Scans header lines until the header end marker. The first value found
/// for a field wins, and a line fills at most one field.
pub fn parse_header(text: &str) -> FilingMetadata {
    let mut meta = FilingMetadata::default();

    for line in text.lines() {
        for (field, re) in FIELD_PATTERNS.iter() {
            let slot = meta.slot(*field);
            if slot.is_some() {
                continue;
            }
            if let Some(caps) = re.captures(line) {
                *slot = Some(caps["v"].trim().to_string());
                break;
            }
        }
        if HEADER_END_RE.is_match(line) {
            break;
        }
    }

    meta.hlink = meta.filing_index_link();
    meta
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "-----BEGIN PRIVACY-ENHANCED MESSAGE-----\n\
<SEC-DOCUMENT>0000320193-96-000023.txt : 19961219\n\
<SEC-HEADER>0000320193-96-000023.hdr.sgml : 19961219\n\
CONFORMED SUBMISSION TYPE:\t10-K\n\
CONFORMED PERIOD OF REPORT:\t19960927\n\
FILED AS OF DATE:\t\t19961219\n\
FILER:\n\
\tCOMPANY DATA:\n\
\t\tCOMPANY CONFORMED NAME:\t\t\tAPPLE COMPUTER INC\n\
\t\tCENTRAL INDEX KEY:\t\t\t0000320193\n\
\t\tSTANDARD INDUSTRIAL CLASSIFICATION:\tELECTRONIC COMPUTERS [3571]\n\
\tBUSINESS ADDRESS:\n\
\t\tSTREET 1:\t\t1 INFINITE LOOP\n\
\t\tCITY:\t\t\tCUPERTINO\n\
\t\tSTATE:\t\t\tCA\n\
\t\tZIP:\t\t\t95014\n\
\t\tBUSINESS PHONE:\t\t4089961010\n\
\tMAIL ADDRESS:\n\
\t\tSTREET 1:\t\t20525 MARIANI AVE\n\
\t\tCITY:\t\t\tCUPERTINO\n\
</SEC-HEADER>\n\
CITY:\tSHOULD NOT BE READ\n";

    #[test]
    fn test_parse_header_fields() {
        let meta = parse_header(HEADER);
        assert_eq!(meta.fname.as_deref(), Some("0000320193-96-000023.txt"));
        assert_eq!(meta.cik.as_deref(), Some("0000320193"));
        assert_eq!(meta.comp_name.as_deref(), Some("APPLE COMPUTER INC"));
        assert_eq!(meta.sic.as_deref(), Some("3571"));
        assert_eq!(meta.form_type.as_deref(), Some("10-K"));
        assert_eq!(meta.date_report.as_deref(), Some("19960927"));
        assert_eq!(meta.date_filing.as_deref(), Some("19961219"));
        assert_eq!(meta.phone.as_deref(), Some("4089961010"));
        // business address comes first and wins over the mail address
        assert_eq!(meta.street.as_deref(), Some("1 INFINITE LOOP"));
        assert_eq!(meta.city.as_deref(), Some("CUPERTINO"));
        assert_eq!(meta.zip.as_deref(), Some("95014"));
    }

    #[test]
    fn test_filing_index_link() {
        let meta = parse_header(HEADER);
        assert_eq!(
            meta.hlink.as_deref(),
            Some("https://www.sec.gov/Archives/edgar/data/320193/000032019396000023/0000320193-96-000023-index.htm")
        );
    }

    #[test]
    fn test_missing_header_yields_empty_metadata() {
        let meta = parse_header("ITEM 1. BUSINESS\nNothing to see here.");
        assert_eq!(meta, FilingMetadata::default());
    }
}
