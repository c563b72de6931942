// src/extractors/locator.rs
//! Section locator: pairs opening and closing anchor hits into candidate
//! spans and keeps the longest one.
//!
//! Genuine section bodies are orders of magnitude longer than table of
//! contents lines or cross-references that survive the exclusion rules, so
//! the longest candidate is taken as the section.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::edgar::models::{FormType, SectionType};
use crate::extractors::patterns::{self, AnchorPattern, HeadingHit};

static TABLE_SENTINEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[/?TABLE\]").expect("Failed to compile TABLE_SENTINEL_RE"));

/// A located span of the scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionCandidate<'a> {
    pub start: usize,
    pub end: usize,
    pub text: &'a str,
    /// Id of the anchor pattern that produced the span
    pub variant: &'static str,
}

impl SectionCandidate<'_> {
    /// Length in characters, the quantity compared when choosing a candidate.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Hits and spans produced by one anchor pattern.
#[derive(Debug, Clone)]
pub struct PatternScan {
    pub variant: &'static str,
    pub opens: Vec<HeadingHit>,
    pub closes: Vec<HeadingHit>,
    pub spans: Vec<(usize, usize)>,
}

/// Result of running every applicable anchor pattern over a document.
/// Offsets refer to `text`, the document with table sentinels removed.
#[derive(Debug, Clone)]
pub struct Scan {
    pub text: String,
    pub patterns: Vec<PatternScan>,
}

impl Scan {
    /// All candidates, in pattern table order, then document order.
    pub fn candidates(&self) -> impl Iterator<Item = SectionCandidate<'_>> + '_ {
        self.patterns.iter().flat_map(move |scan| {
            scan.spans.iter().map(move |&(start, end)| SectionCandidate {
                start,
                end,
                text: &self.text[start..end],
                variant: scan.variant,
            })
        })
    }

    /// The longest candidate. On an exact tie the first one encountered wins.
    pub fn best(&self) -> Option<SectionCandidate<'_>> {
        let mut best: Option<(usize, SectionCandidate<'_>)> = None;
        for candidate in self.candidates() {
            let len = candidate.char_len();
            if best.as_ref().map_or(true, |(best_len, _)| len > *best_len) {
                best = Some((len, candidate));
            }
        }
        best.map(|(_, candidate)| candidate)
    }
}

/// Drops `[TABLE]`/`[/TABLE]` sentinels; the table text itself stays.
pub fn strip_table_sentinels(text: &str) -> String {
    TABLE_SENTINEL_RE.replace_all(text, "").into_owned()
}

/// Pairs each accepted opening hit with the first accepted closing hit that
/// starts at or after its end. Opening hits inside an already paired span
/// are skipped, so spans never overlap.
pub fn pair_hits(opens: &[HeadingHit], closes: &[HeadingHit]) -> Vec<(usize, usize)> {
    let closes: Vec<&HeadingHit> = closes.iter().filter(|h| h.is_accepted()).collect();
    let mut spans = Vec::new();
    let mut cursor = 0;

    for open in opens.iter().filter(|h| h.is_accepted()) {
        if open.start < cursor {
            continue;
        }
        let first_close = closes.partition_point(|c| c.start < open.end);
        if let Some(close) = closes.get(first_close) {
            if close.end > open.start {
                spans.push((open.start, close.end));
                cursor = close.end;
            }
        }
    }
    spans
}

/// Applies the anchor pattern library to normalized documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct SectionLocator;

impl SectionLocator {
    pub fn new() -> Self {
        Self
    }

    /// Runs every anchor pattern for (`form`, `section`) over `normalized`.
    pub fn scan(&self, normalized: &str, form: FormType, section: SectionType) -> Scan {
        let text = strip_table_sentinels(normalized);
        let applicable = patterns::patterns_for(form, section);
        if applicable.is_empty() {
            tracing::debug!("No anchor patterns defined for {} / {}", form, section);
        }

        let patterns = applicable
            .into_iter()
            .map(|pattern| scan_pattern(pattern, &text))
            .collect();
        Scan { text, patterns }
    }
}

fn scan_pattern(pattern: &AnchorPattern, text: &str) -> PatternScan {
    let opens = pattern.open.hits(text);
    let closes = pattern.close.hits(text);
    let spans = pair_hits(&opens, &closes);

    tracing::debug!(
        "Pattern {}: {} opening hits ({} accepted), {} closing hits ({} accepted), {} candidates",
        pattern.id,
        opens.len(),
        opens.iter().filter(|h| h.is_accepted()).count(),
        closes.len(),
        closes.iter().filter(|h| h.is_accepted()).count(),
        spans.len()
    );

    PatternScan {
        variant: pattern.id,
        opens,
        closes,
        spans,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENTENCE: &str = "Revenue increased due to strong demand for our products. ";

    fn body(sentences: usize) -> String {
        SENTENCE.repeat(sentences)
    }

    fn hit(start: usize, end: usize, accepted: bool) -> HeadingHit {
        HeadingHit {
            start,
            heading_start: start + 1,
            end,
            rejection: (!accepted).then(|| patterns::Rejection::Guard('"')),
        }
    }

    #[test]
    fn test_pair_hits_uses_first_close_and_skips_nested_opens() {
        let opens = vec![hit(0, 10, true), hit(20, 30, true), hit(100, 110, true)];
        let closes = vec![hit(5, 8, true), hit(50, 55, false), hit(60, 65, true), hit(200, 205, true)];
        // the open at 20 lies inside the first span
        assert_eq!(pair_hits(&opens, &closes), vec![(0, 65), (100, 205)]);
    }

    #[test]
    fn test_pair_hits_without_close() {
        let opens = vec![hit(0, 10, true)];
        assert!(pair_hits(&opens, &[]).is_empty());
        assert!(pair_hits(&opens, &[hit(3, 6, true)]).is_empty());
    }

    #[test]
    fn test_genuine_section_beats_toc_and_cross_reference() {
        let section_body = body(70);
        let genuine = format!(
            "\nPART II\n\nITEM 7. MANAGEMENT'S DISCUSSION AND ANALYSIS OF FINANCIAL CONDITION\n{}\n\nITEM 7A.",
            section_body
        );
        let doc = format!(
            "ANNUAL REPORT\n\nTABLE OF CONTENTS\n\
Item 7. Management's Discussion and Analysis 12\n\
Item 7A. Quantitative and Qualitative Disclosures About Market Risk 20\n\
Item 8. Financial Statements 21\n\n\
PART I\n\nITEM 1. BUSINESS\n\
The company sells widgets, as discussed in Item 7 of this report and as discussed in\n\
Item 7. Management's Discussion of results.\n{} QUANTITATIVE AND QUALITATIVE DISCLOSURES\n\
Market risk is limited.\n\nITEM 8. FINANCIAL STATEMENTS\nBalance sheet.",
            genuine
        );

        let scan = SectionLocator::new().scan(&doc, FormType::TenK, SectionType::Mda);
        let candidates: Vec<_> = scan.candidates().collect();
        assert_eq!(candidates.len(), 2, "TOC entry and genuine section");
        assert!(candidates[0].char_len() < 100);

        let best = scan.best().expect("section found");
        assert_eq!(best.text, genuine);
        assert!(best.char_len() > 4_000);
        assert_eq!(best.variant, "10-k/mda/item-7");
    }

    #[test]
    fn test_cross_reference_never_starts_candidate() {
        let doc = format!(
            "Intro\nas discussed in\nItem 7. Management's Discussion\n{}\nItem 8. Financial Statements",
            body(5)
        );
        let scan = SectionLocator::new().scan(&doc, FormType::TenK, SectionType::Mda);
        assert!(scan.best().is_none());
        let opens = &scan.patterns[0].opens;
        assert_eq!(opens.len(), 1);
        assert!(!opens[0].is_accepted());
    }

    #[test]
    fn test_line_broken_heading_matches_like_plain_heading() {
        let tail = format!("\n{}\n\nITEM 8. FINANCIAL STATEMENTS", body(3));
        let plain = format!("Cover\nITEM 7. MANAGEMENT'S DISCUSSION{}", tail);
        let broken = format!("Cover\nI\nT\nE\nM\n7\n.\nMANAGEMENT'S DISCUSSION{}", tail);

        let locator = SectionLocator::new();
        let plain_scan = locator.scan(&plain, FormType::TenK, SectionType::Mda);
        let broken_scan = locator.scan(&broken, FormType::TenK, SectionType::Mda);
        let plain_best = plain_scan.best().expect("plain heading found");
        let broken_best = broken_scan.best().expect("broken heading found");

        assert_eq!(plain_best.variant, broken_best.variant);
        assert_eq!(plain_best.start, broken_best.start);
        assert!(plain_best.text.ends_with(&tail[..tail.len() - " FINANCIAL STATEMENTS".len()]));
        assert!(broken_best.text.ends_with(&tail[..tail.len() - " FINANCIAL STATEMENTS".len()]));
    }

    #[test]
    fn test_table_sentinels_do_not_block_anchors() {
        let doc = format!(
            "Cover[TABLE]\nITEM 7. MANAGEMENT'S DISCUSSION\n{}[/TABLE]\nITEM 8. FINANCIAL STATEMENTS",
            body(2)
        );
        let scan = SectionLocator::new().scan(&doc, FormType::TenK, SectionType::Mda);
        let best = scan.best().expect("section found");
        assert!(!best.text.contains("[TABLE]"));
        assert!(best.text.contains(SENTENCE.trim()));
    }

    #[test]
    fn test_older_item_6_convention() {
        let doc = format!(
            "PART II\nITEM 5. MARKET\nStock.\nITEM 6. MANAGEMENT'S DISCUSSION AND ANALYSIS\n{}\nITEM 7. FINANCIAL STATEMENTS\nTables.",
            body(4)
        );
        let scan = SectionLocator::new().scan(&doc, FormType::TenK, SectionType::Mda);
        let best = scan.best().expect("item 6 section found");
        assert_eq!(best.variant, "10-k/mda/item-6");
        assert!(best.text.trim_start().starts_with("ITEM 6."));
    }

    #[test]
    fn test_quarterly_mda() {
        let doc = format!(
            "PART I - FINANCIAL INFORMATION\nItem 1. Financial Statements\nTables.\n\
Item 2. Management's Discussion and Analysis\n{}\nItem 1A. Risk Factors\nMore text.\n\
PART II - OTHER INFORMATION\nItem 6. Exhibits",
            body(4)
        );
        let scan = SectionLocator::new().scan(&doc, FormType::TenQ, SectionType::Mda);
        let best = scan.best().expect("10-Q MD&A found");
        assert!(best.text.contains("More text."), "Item 1A must not close the section");
        assert!(best.text.ends_with("Item 6."));
    }

    #[test]
    fn test_equal_length_duplicates_pick_first() {
        let section = format!("\nITEM 7. MANAGEMENT'S DISCUSSION\n{}\nITEM 8.", body(3));
        let doc = format!("Original{}\nAmendment reprint{}\nEnd", section, section);
        let scan = SectionLocator::new().scan(&doc, FormType::TenKAmended, SectionType::Mda);
        let candidates: Vec<_> = scan.candidates().collect();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].char_len(), candidates[1].char_len());
        assert_eq!(scan.best().map(|c| c.start), Some(candidates[0].start));
    }

    #[test]
    fn test_no_match_and_unsupported_form() {
        let scan = SectionLocator::new().scan("Nothing here", FormType::TenK, SectionType::Mda);
        assert!(scan.best().is_none());
        let scan = SectionLocator::new().scan("\nITEM 7. MANAGEMENT'S DISCUSSION\nx\nITEM 8.", FormType::EightK, SectionType::Mda);
        assert!(scan.patterns.is_empty());
        assert!(scan.best().is_none());
    }
}
