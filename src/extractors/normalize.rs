// src/extractors/normalize.rs
//! Markup normalization: turns a raw EDGAR submission into plain text.
//!
//! Every step is total. A pattern that finds nothing leaves the text as it
//! was, so truncated or malformed submissions simply pass through. Removed
//! blocks and tags are replaced by a newline, which keeps headings that
//! followed markup at the start of a line.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::extractors::entities::decode_entities;
use crate::utils::config::DEFAULT_TABLE_DIGIT_RATIO;

/// Opening sentinel wrapped around retained text-heavy tables.
pub const TABLE_OPEN: &str = "[TABLE]";
/// Closing sentinel wrapped around retained text-heavy tables.
pub const TABLE_CLOSE: &str = "[/TABLE]";

// --- Attachment blocks ---
// `<TYPE>EX-27` etc. inside a <DOCUMENT> up to its closing tag
static TYPED_ATTACHMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)(?:<DOCUMENT>)?\n?<TYPE>(?:GRAPHIC|ZIP|EXCEL|JSON|PDF|XML|EX).*?</DOCUMENT>")
        .expect("Failed to compile TYPED_ATTACHMENT_RE")
});

// Bare encoded payload blocks
static BARE_ATTACHMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)<GRAPHIC>.*?</GRAPHIC>|<ZIP>.*?</ZIP>|<EXCEL>.*?</EXCEL>|<JSON>.*?</JSON>|<PDF>.*?</PDF>|<XML>.*?</XML>|<EX[^>]*>.*?</EX[^>]*>",
    )
    .expect("Failed to compile BARE_ATTACHMENT_RE")
});

// --- Header / footer ---
static HEADER_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\A.*?</(?:SEC|IMS)-HEADER>").expect("Failed to compile HEADER_BLOCK_RE")
});

static PRIVACY_FOOTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)-----END PRIVACY-ENHANCED MESSAGE-----").expect("Failed to compile PRIVACY_FOOTER_RE")
});

// --- Layout tags ---
// Paragraph, div, font and table-cell tags, spanning any number of lines
static LAYOUT_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<(?:div|font|tr|td|p)[^>]*>|</(?:font|div|tr|td|p)>").expect("Failed to compile LAYOUT_TAG_RE")
});

// --- Tables ---
static TABLE_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<TABLE.*?</TABLE>").expect("Failed to compile TABLE_BLOCK_RE"));

static ENTITY_REF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#?[A-Za-z0-9]+;").expect("Failed to compile ENTITY_REF_RE"));

// --- Tags ---
// A tag on one line, or a tag broken over exactly one line break
static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<.*?>|<.*?\n.*?>").expect("Failed to compile TAG_RE"));

// --- Whitespace ---
static INVISIBLE_SPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\u{00A0}\u{200B}]").expect("Failed to compile INVISIBLE_SPACE_RE"));

static BLANK_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\n\s*){3,}").expect("Failed to compile BLANK_RUN_RE"));

/// Converts raw submissions into normalized plain text.
#[derive(Debug, Clone)]
pub struct Normalizer {
    table_digit_ratio: f64,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_TABLE_DIGIT_RATIO)
    }
}

impl Normalizer {
    /// `table_digit_ratio`: tables whose digit share is below this are kept.
    pub fn new(table_digit_ratio: f64) -> Self {
        Self { table_digit_ratio }
    }

    /// Runs the full normalization pipeline. Idempotent: normalizing the
    /// output again returns it unchanged.
    pub fn normalize(&self, raw: &str) -> String {
        let before = raw.len();

        let txt = remove_attachments(raw);
        let txt = remove_header_footer(&txt);
        let txt = LAYOUT_TAG_RE.replace_all(&txt, "\n");
        let txt = self.filter_tables(&txt);
        let txt = decode_entities(&txt);
        let txt = TAG_RE.replace_all(&txt, "\n");
        let txt = INVISIBLE_SPACE_RE.replace_all(&txt, "\n");
        let txt = BLANK_RUN_RE.replace_all(txt.trim(), "\n\n");
        let txt = txt.trim().to_string();

        tracing::debug!("Normalized document: {} -> {} bytes", before, txt.len());
        txt
    }

    /// Keeps text-heavy tables wrapped in sentinels and drops numeric ones.
    pub fn filter_tables(&self, txt: &str) -> String {
        TABLE_BLOCK_RE
            .replace_all(txt, |caps: &Captures| {
                let block = &caps[0];
                if self.is_text_heavy(block) {
                    format!("{}{}{}", TABLE_OPEN, block, TABLE_CLOSE)
                } else {
                    tracing::trace!("Dropping numeric table ({} bytes)", block.len());
                    "\n".to_string()
                }
            })
            .into_owned()
    }

    /// A table is text-heavy when digits make up less than the configured
    /// share of its alphanumeric characters. Empty tables are not.
    pub fn is_text_heavy(&self, table: &str) -> bool {
        match digit_ratio(table) {
            Some(ratio) => ratio < self.table_digit_ratio,
            None => false,
        }
    }
}

/// digits / (digits + letters) over the table text, ignoring tags and entity
/// references. `None` when the table holds neither.
pub fn digit_ratio(table: &str) -> Option<f64> {
    let inner = TAG_RE.replace_all(table, "\n");
    let inner = ENTITY_REF_RE.replace_all(&inner, "");

    let (digits, letters) = inner.chars().fold((0usize, 0usize), |(d, c), ch| {
        if ch.is_ascii_digit() {
            (d + 1, c)
        } else if ch.is_ascii_alphabetic() {
            (d, c + 1)
        } else {
            (d, c)
        }
    });

    if digits + letters == 0 {
        return None;
    }
    Some(digits as f64 / (digits + letters) as f64)
}

fn remove_attachments(txt: &str) -> String {
    let txt = TYPED_ATTACHMENT_RE.replace_all(txt, "\n");
    BARE_ATTACHMENT_RE.replace_all(&txt, "\n").into_owned()
}

fn remove_header_footer(txt: &str) -> String {
    let txt = HEADER_BLOCK_RE.replace(txt, "\n");
    PRIVACY_FOOTER_RE.replace_all(&txt, "\n").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Table with exactly `digits` digits and `letters` letters.
    fn synthetic_table(digits: usize, letters: usize) -> String {
        format!(
            "<TABLE><TR><TD>{}</TD><TD>{}</TD></TR></TABLE>",
            "7".repeat(digits),
            "x".repeat(letters)
        )
    }

    #[test]
    fn test_table_retention_boundary() {
        let normalizer = Normalizer::default();

        let kept = normalizer.filter_tables(&synthetic_table(9, 91));
        assert!(kept.starts_with(TABLE_OPEN) && kept.ends_with(TABLE_CLOSE));

        let dropped = normalizer.filter_tables(&synthetic_table(11, 89));
        assert_eq!(dropped, "\n");

        let empty = normalizer.filter_tables("<TABLE><TR><TD>  --  </TD></TR></TABLE>");
        assert_eq!(empty, "\n");
    }

    #[test]
    fn test_digit_ratio_ignores_markup() {
        // tag names and &#160; must not count as letters or digits
        let table = "<TABLE BORDER=1><TR><TD>&#160;ab12&nbsp;</TD></TR></TABLE>";
        assert_eq!(digit_ratio(table), Some(0.5));
        assert_eq!(digit_ratio("<TABLE></TABLE>"), None);
    }

    #[test]
    fn test_text_heavy_table_survives_normalization() {
        let raw = "Intro paragraph\n<TABLE><TR><TD>Risk factors include competition</TD></TR></TABLE>\nAfter";
        let txt = Normalizer::default().normalize(raw);
        assert!(txt.contains("[TABLE]"));
        assert!(txt.contains("Risk factors include competition"));
        assert!(txt.contains("[/TABLE]"));
        assert!(!txt.contains("<TD>"));
    }

    #[test]
    fn test_removes_header_attachments_and_footer() {
        let raw = "<SEC-HEADER>\nCOMPANY CONFORMED NAME: ACME\n</SEC-HEADER>\n\
<DOCUMENT>\n<TYPE>10-K\n<TEXT>\nANNUAL REPORT\n</TEXT>\n</DOCUMENT>\n\
<DOCUMENT>\n<TYPE>EX-27\n<TEXT>\nFINANCIAL DATA SCHEDULE 1,234\n</TEXT>\n</DOCUMENT>\n\
<DOCUMENT>\n<TYPE>10-K\n<TEXT>\nSECOND PART\n</TEXT>\n</DOCUMENT>\n\
-----END PRIVACY-ENHANCED MESSAGE-----\n";
        let txt = Normalizer::default().normalize(raw);
        assert!(!txt.contains("ACME"));
        assert!(!txt.contains("FINANCIAL DATA SCHEDULE"));
        assert!(!txt.contains("PRIVACY-ENHANCED"));
        assert!(txt.contains("ANNUAL REPORT"));
        // non-greedy removal must not swallow the next document
        assert!(txt.contains("SECOND PART"));
    }

    #[test]
    fn test_tags_entities_and_spaces() {
        let raw = "<p>Net&nbsp;sales&#8217; growth &amp; margin</p><font\nsize=2>Next</font>";
        let txt = Normalizer::default().normalize(raw);
        assert_eq!(txt, "Net\nsales\u{2019} growth & margin\n\nNext");
    }

    #[test]
    fn test_blank_runs_collapse() {
        let txt = Normalizer::default().normalize("\n\nA\n\n\n\n   B\n \n C\n\n\n");
        assert_eq!(txt, "A\n\nB\n \n C");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let raw = "<SEC-HEADER>hdr</SEC-HEADER>\n<DOCUMENT>\n<TYPE>10-K\n<TEXT>\n\
<P>PART II</P>\n<P>ITEM 7.&nbsp;MANAGEMENT&#146;S DISCUSSION</P>\n\n\n\n\
<TABLE><TR><TD>Liquidity is adequate</TD></TR></TABLE>\n\
<TABLE><TR><TD>1,234</TD><TD>5,678</TD></TR></TABLE>\n\
<P>ITEM 8. FINANCIAL STATEMENTS</P>\n</TEXT>\n</DOCUMENT>";
        let normalizer = Normalizer::default();
        let once = normalizer.normalize(raw);
        let twice = normalizer.normalize(&once);
        assert_eq!(once, twice);
        assert!(!once.contains("1,234"));
    }

    #[test]
    fn test_double_encoded_entities_are_stable() {
        let normalizer = Normalizer::default();
        for raw in ["A&amp;nbsp;B", "x &amp;lt;b&amp;gt; y", "R&amp;amp;D"] {
            let once = normalizer.normalize(raw);
            assert_eq!(normalizer.normalize(&once), once, "input {:?}", raw);
        }
        assert_eq!(normalizer.normalize("A&amp;nbsp;B"), "A\nB");
        assert_eq!(normalizer.normalize("R&amp;amp;D"), "R&D");
    }

    #[test]
    fn test_multi_line_layout_tags_removed() {
        let raw = "<P>PART II</P>\n<DIV\nSTYLE=\"margin-top:12pt\"\nALIGN=\"left\">\nITEM 7. MANAGEMENT'S DISCUSSION</DIV>";
        let txt = Normalizer::default().normalize(raw);
        assert!(!txt.contains('<') && !txt.contains('>'), "tag left in {:?}", txt);
        assert!(txt.contains("\nITEM 7. MANAGEMENT'S DISCUSSION"));
    }

    #[test]
    fn test_dropped_table_keeps_following_heading_on_own_line() {
        let raw = "Intro text<TABLE><TR><TD>1,234</TD><TD>5,678</TD></TR></TABLE>ITEM 7. MANAGEMENT'S DISCUSSION";
        let txt = Normalizer::default().normalize(raw);
        assert_eq!(txt, "Intro text\nITEM 7. MANAGEMENT'S DISCUSSION");
    }

    #[test]
    fn test_malformed_input_passes_through() {
        let raw = "<TABLE no close\nplain text & more";
        let txt = Normalizer::default().normalize(raw);
        assert!(txt.contains("plain text & more"));
    }
}
