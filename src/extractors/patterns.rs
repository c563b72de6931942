// src/extractors/patterns.rs
//! Anchor pattern library.
//!
//! Section boundaries are described declaratively: each [`AnchorDef`] names
//! the heading that opens a section and the heading of the section that
//! follows it, for one form family and one filing era. A single builder turns
//! every definition into regexes with the same tolerance rules:
//!
//! * a heading must start a new line (optionally after a part designator),
//! * keywords may be typeset with a line break after every letter,
//! * cross-references ("see\nItem 7", "in Part II, Item 6") and quoted
//!   headings are rejected by a post-match predicate on the preceding text.
//!
//! The `regex` crate has no look-around, so the exclusion rules and number
//! vetoes are plain predicates evaluated on each hit.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::edgar::models::{FormFamily, FormType, SectionType};

// "ITEM", "I\nT\nE\nM" or "ITEMS", optionally followed by a period
const ITEM_KEYWORD: &str = r"I\n*?T\n*?E\n*?M(?:\n*?S)?\.?";

// Separators seen between a part/item number and its title
const SEP: &str = r"(?:\.\s*?(?:--|-|–|—)|--|[.,:|\-–—])";

const REFERRAL_WORDS: &[&str] = &["in", "to", "see", "and", "under", "of"];

/// Guards for opening headings: a heading named inside quotes or right
/// after a tag remnant is a reference, not a section start.
const OPEN_EXCLUSION: Exclusion = Exclusion {
    referral_words: REFERRAL_WORDS,
    guard_chars: &['"', '“', '>'],
};

/// Guards for closing headings: the comma catches enumerations like
/// "Items 7,\n8 and 9".
const CLOSE_EXCLUSION: Exclusion = Exclusion {
    referral_words: REFERRAL_WORDS,
    guard_chars: &['"', '“', ','],
};

// Part designator left on the line before a heading, e.g. "Part II," or "PART 2 -"
static PART_TAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bPART\s*(?:[IVX]+|[0-9]+)\s*[.,:;\-–—]*$").expect("Failed to compile PART_TAIL_RE")
});

/// Section titles recognised after an item number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    ManagementsDiscussion,
    ManagementsNarrative,
    ManagementsPlan,
    PlanOfOperation,
    /// Old 10-K405 filings combine Item 6 and the MD&A ("Selected Financial Data; ...")
    SelectedFinancialData,
    Business,
    Description,
}

impl Topic {
    fn fragment(&self) -> String {
        // "MANAGEMENT'S " with any apostrophe, or none
        let managements = format!(r"{}\n*?.?\n*?S?.?\s*?", line_broken("MANAGEMENT"));
        match self {
            Topic::ManagementsDiscussion => format!("{}{}", managements, line_broken("DISCUSSION")),
            Topic::ManagementsNarrative => format!("{}{}", managements, line_broken("NARRATIVE")),
            Topic::ManagementsPlan => format!("{}{}", managements, line_broken("PLAN")),
            Topic::PlanOfOperation => line_broken("PLAN OF OPERATION"),
            Topic::SelectedFinancialData => format!("{};", line_broken("SELECTED FINANCIAL DATA")),
            Topic::Business => format!(r"(?:{}\s*?)?{}", line_broken("OUR"), line_broken("BUSINESS")),
            Topic::Description => line_broken("DESCRIPTION"),
        }
    }
}

/// Regex fragment matching `word` with optional line breaks between letters.
/// Spaces inside `word` accept any whitespace run.
pub fn line_broken(word: &str) -> String {
    let mut out = String::new();
    for (i, ch) in word.chars().enumerate() {
        if ch == ' ' {
            out.push_str(r"\s*?");
            continue;
        }
        if i > 0 && !out.ends_with(r"\s*?") {
            out.push_str(r"\n*?");
        }
        out.push_str(&regex::escape(&ch.to_string()));
    }
    out
}

/// Words and characters that, right before a heading, mark it as a reference.
#[derive(Debug, Clone, Copy)]
pub struct Exclusion {
    pub referral_words: &'static [&'static str],
    pub guard_chars: &'static [char],
}

/// Why a structurally valid heading hit was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Referral(String),
    Guard(char),
    NumberVeto(String),
}

impl Exclusion {
    /// Checks the text preceding a heading keyword. A trailing part
    /// designator and surrounding whitespace are skipped first.
    pub fn check(&self, preceding: &str) -> Option<Rejection> {
        let mut tail = preceding.trim_end();
        if let Some(m) = PART_TAIL_RE.find(tail) {
            tail = tail[..m.start()].trim_end();
        }

        let last = tail.chars().last()?;
        if self.guard_chars.contains(&last) {
            return Some(Rejection::Guard(last));
        }

        let word_start = tail
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_alphabetic())
            .last()
            .map(|(i, _)| i)?;
        let word = &tail[word_start..];
        self.referral_words
            .iter()
            .find(|referral| word.eq_ignore_ascii_case(referral))
            .map(|_| Rejection::Referral(word.to_string()))
    }
}

/// Declarative description of one heading.
#[derive(Debug, Clone, Copy)]
pub struct HeadingDef {
    /// Alternation of accepted part numerals, e.g. `2|II`
    pub parts: &'static str,
    /// Alternation of accepted item numbers, e.g. `7A|7\.A|8`
    pub numbers: &'static str,
    /// Extra fragment allowed after the number, e.g. "and 2"
    pub trailer: Option<&'static str>,
    /// Titles that must follow the number; empty for closing headings
    pub topics: &'static [Topic],
    pub exclusion: Exclusion,
    /// Number text that must not start the number, checked case-insensitively
    pub number_veto: Option<&'static str>,
}

/// One era variant of a section boundary for a form family.
#[derive(Debug, Clone, Copy)]
pub struct AnchorDef {
    pub id: &'static str,
    pub family: FormFamily,
    pub section: SectionType,
    pub open: HeadingDef,
    pub close: HeadingDef,
}

const MDA_TOPICS: &[Topic] = &[Topic::ManagementsDiscussion, Topic::ManagementsNarrative];
const OLD_MDA_TOPICS: &[Topic] = &[
    Topic::ManagementsDiscussion,
    Topic::ManagementsNarrative,
    Topic::ManagementsPlan,
    Topic::PlanOfOperation,
    Topic::SelectedFinancialData,
];
const QUARTERLY_MDA_TOPICS: &[Topic] = &[
    Topic::ManagementsDiscussion,
    Topic::ManagementsNarrative,
    Topic::ManagementsPlan,
    Topic::PlanOfOperation,
];
const BUSINESS_TOPICS: &[Topic] = &[Topic::Business, Topic::Description];

const BUSINESS_OPEN: HeadingDef = HeadingDef {
    parts: "1|I",
    numbers: "1|I|L",
    trailer: Some(r"\s*?(?:A\s*?N\s*?D\s*?2\s*?)?(?:\.\s*?(?:--|-|–|—)|--|[.:\-–—])?"),
    topics: BUSINESS_TOPICS,
    exclusion: OPEN_EXCLUSION,
    number_veto: None,
};

const BUSINESS_CLOSE: HeadingDef = HeadingDef {
    parts: "I|1",
    numbers: r"1\s*?A|1\.\s*?A|I\s*?A|I\.\s*?A|2|3",
    trailer: None,
    topics: &[],
    exclusion: CLOSE_EXCLUSION,
    number_veto: None,
};

/// Every known boundary variant. Order only matters for exact-length ties.
pub const ANCHOR_DEFS: &[AnchorDef] = &[
    // Item 7 MD&A, closed by Item 7A (market risk) or Item 8
    AnchorDef {
        id: "10-k/mda/item-7",
        family: FormFamily::Annual,
        section: SectionType::Mda,
        open: HeadingDef {
            parts: "2|II",
            numbers: "7",
            trailer: None,
            topics: MDA_TOPICS,
            exclusion: OPEN_EXCLUSION,
            number_veto: None,
        },
        close: HeadingDef {
            parts: "2|II",
            numbers: r"7A|7\.A|8",
            trailer: None,
            topics: &[],
            exclusion: CLOSE_EXCLUSION,
            number_veto: None,
        },
    },
    // Older filings put the MD&A (or plan of operation) under Item 6
    AnchorDef {
        id: "10-k/mda/item-6",
        family: FormFamily::Annual,
        section: SectionType::Mda,
        open: HeadingDef {
            parts: "2|II",
            numbers: "6",
            trailer: None,
            topics: OLD_MDA_TOPICS,
            exclusion: OPEN_EXCLUSION,
            number_veto: None,
        },
        close: HeadingDef {
            parts: "2|II",
            numbers: "7",
            trailer: None,
            topics: &[],
            exclusion: CLOSE_EXCLUSION,
            number_veto: None,
        },
    },
    // 10-Q: Part I Item 2 (Item 6 in some small-business forms), closed by the next item
    AnchorDef {
        id: "10-q/mda/item-2",
        family: FormFamily::Quarterly,
        section: SectionType::Mda,
        open: HeadingDef {
            parts: "1|I",
            numbers: "2|II|6",
            trailer: None,
            topics: QUARTERLY_MDA_TOPICS,
            exclusion: OPEN_EXCLUSION,
            number_veto: None,
        },
        close: HeadingDef {
            parts: "I|1|II|2",
            numbers: "1|I|3|4|5|6",
            trailer: None,
            topics: &[],
            exclusion: CLOSE_EXCLUSION,
            // "Item 1A" (risk factors) and words such as "Item Information" are not closers
            number_veto: Some("1A|I[A-Z]"),
        },
    },
    AnchorDef {
        id: "10-k/item1/business",
        family: FormFamily::Annual,
        section: SectionType::Business,
        open: BUSINESS_OPEN,
        close: BUSINESS_CLOSE,
    },
    AnchorDef {
        id: "10-q/item1/business",
        family: FormFamily::Quarterly,
        section: SectionType::Business,
        open: BUSINESS_OPEN,
        close: BUSINESS_CLOSE,
    },
];

/// A heading hit: where the match starts (at its leading line break), where
/// the heading keyword starts, where the match ends, and whether it was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingHit {
    pub start: usize,
    pub heading_start: usize,
    pub end: usize,
    pub rejection: Option<Rejection>,
}

impl HeadingHit {
    pub fn is_accepted(&self) -> bool {
        self.rejection.is_none()
    }
}

/// A compiled heading.
#[derive(Debug)]
pub struct Heading {
    regex: Regex,
    exclusion: Exclusion,
    number_veto: Option<Regex>,
}

impl Heading {
    fn compile(def: &HeadingDef) -> Self {
        let topic = if def.topics.is_empty() {
            String::new()
        } else {
            let alternatives: Vec<String> = def.topics.iter().map(|t| format!("(?:{})", t.fragment())).collect();
            format!(r"\s*?(?:{})", alternatives.join("|"))
        };
        let pattern = format!(
            r"(?i)\n(?:PART\s*?(?:{parts})\s*?{sep}?)?\s*?(?P<heading>{item}\s*?(?:(?:NO\.|NUMBER)\s*?)?(?P<number>{numbers})\s*?{sep}?{trailer}{topic})",
            parts = def.parts,
            sep = SEP,
            item = ITEM_KEYWORD,
            numbers = def.numbers,
            trailer = def.trailer.unwrap_or(""),
            topic = topic,
        );
        let regex = RegexBuilder::new(&pattern)
            .size_limit(1 << 24)
            .build()
            .expect("Failed to compile anchor heading pattern");
        let number_veto = def.number_veto.map(|veto| {
            Regex::new(&format!("(?i)^(?:{})", veto)).expect("Failed to compile number veto pattern")
        });
        Self {
            regex,
            exclusion: def.exclusion,
            number_veto,
        }
    }

    /// All hits in `text`, one per heading, in document order. Rejected hits
    /// are kept (with their reason) so callers can report them.
    pub fn hits(&self, text: &str) -> Vec<HeadingHit> {
        let mut hits: Vec<HeadingHit> = Vec::new();
        let mut pos = 0;

        while pos <= text.len() {
            let Some(caps) = self.regex.captures_at(text, pos) else {
                break;
            };
            let whole = caps.get(0).map_or(0..0, |m| m.range());
            let heading = caps.name("heading").map_or(whole.clone(), |m| m.range());
            // every pattern starts with "\n", a single byte
            pos = whole.start + 1;

            // blank lines in front of a heading produce several matches for it; keep the earliest
            if hits.last().is_some_and(|prev| prev.heading_start == heading.start) {
                continue;
            }

            let rejection = self.exclusion.check(&text[..heading.start]).or_else(|| {
                let number = caps.name("number")?;
                let veto = self.number_veto.as_ref()?;
                veto.is_match(&text[number.start()..])
                    .then(|| Rejection::NumberVeto(number.as_str().to_string()))
            });
            if let Some(reason) = &rejection {
                tracing::trace!("Rejected heading at {}: {:?}", heading.start, reason);
            }

            hits.push(HeadingHit {
                start: whole.start,
                heading_start: heading.start,
                end: whole.end,
                rejection,
            });
        }
        hits
    }
}

/// A compiled anchor pair.
#[derive(Debug)]
pub struct AnchorPattern {
    pub id: &'static str,
    pub family: FormFamily,
    pub section: SectionType,
    pub open: Heading,
    pub close: Heading,
}

static LIBRARY: Lazy<Vec<AnchorPattern>> = Lazy::new(|| {
    let library: Vec<AnchorPattern> = ANCHOR_DEFS
        .iter()
        .map(|def| AnchorPattern {
            id: def.id,
            family: def.family,
            section: def.section,
            open: Heading::compile(&def.open),
            close: Heading::compile(&def.close),
        })
        .collect();
    tracing::debug!("Compiled {} anchor patterns", library.len());
    library
});

/// The anchor patterns that apply to a form type and section, in table order.
pub fn patterns_for(form: FormType, section: SectionType) -> Vec<&'static AnchorPattern> {
    let family = form.family();
    LIBRARY
        .iter()
        .filter(|p| p.family == family && p.section == section)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(id: &str) -> &'static AnchorPattern {
        LIBRARY.iter().find(|p| p.id == id).expect("pattern exists")
    }

    fn accepted(heading: &Heading, text: &str) -> Vec<usize> {
        heading
            .hits(text)
            .into_iter()
            .filter(HeadingHit::is_accepted)
            .map(|h| h.heading_start)
            .collect()
    }

    #[test]
    fn test_line_broken_fragment() {
        assert_eq!(line_broken("OUR"), r"O\n*?U\n*?R");
        assert_eq!(line_broken("PLAN OF"), r"P\n*?L\n*?A\n*?N\s*?O\n*?F");
    }

    #[test]
    fn test_every_definition_compiles() {
        assert_eq!(LIBRARY.len(), ANCHOR_DEFS.len());
        assert_eq!(patterns_for(FormType::TenK, SectionType::Mda).len(), 2);
        assert_eq!(patterns_for(FormType::TenKAmended, SectionType::Mda).len(), 2);
        assert_eq!(patterns_for(FormType::TenQ, SectionType::Mda).len(), 1);
        assert!(patterns_for(FormType::EightK, SectionType::Mda).is_empty());
    }

    #[test]
    fn test_heading_requires_line_start() {
        let open = &pattern("10-k/mda/item-7").open;
        assert_eq!(accepted(open, "\nITEM 7. MANAGEMENT'S DISCUSSION AND ANALYSIS").len(), 1);
        assert!(accepted(open, "\nThe results in ITEM 7. MANAGEMENT'S DISCUSSION").is_empty());
    }

    #[test]
    fn test_letter_by_letter_heading() {
        let open = &pattern("10-k/mda/item-7").open;
        let broken = "\nI\nT\nE\nM\n7\n.\nM\nA\nN\nA\nG\nE\nM\nE\nN\nT\n'\nS\nD\nI\nS\nC\nU\nS\nS\nI\nO\nN";
        let hits = open.hits(broken);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].is_accepted());
        assert_eq!(hits[0].end, broken.len());
    }

    #[test]
    fn test_part_designator_and_variants() {
        let open = &pattern("10-k/mda/item-7").open;
        assert_eq!(accepted(open, "\nPART II, ITEM 7 - MANAGEMENT\u{2019}S DISCUSSION").len(), 1);
        assert_eq!(accepted(open, "\nItem No. 7: Management's Narrative Analysis").len(), 1);

        let old = &pattern("10-k/mda/item-6").open;
        assert_eq!(accepted(old, "\nITEM 6. SELECTED FINANCIAL DATA; MANAGEMENT'S DISCUSSION").len(), 1);
        assert_eq!(accepted(old, "\nItem 6. Plan of Operation").len(), 1);
        assert!(accepted(old, "\nItem 6. Selected Financial Data\n").is_empty());
    }

    #[test]
    fn test_referral_words_reject() {
        let open = &pattern("10-k/mda/item-7").open;
        let text = "as discussed in\nItem 7. Management's Discussion";
        let hits = open.hits(text);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].rejection, Some(Rejection::Referral("in".to_string())));

        let text = "For more information, see\nPart II, Item 7. Management's Discussion";
        assert_eq!(open.hits(text)[0].rejection, Some(Rejection::Referral("see".to_string())));

        // only whole words count
        assert_eq!(accepted(open, "Bargain\nItem 7. Management's Discussion").len(), 1);
    }

    #[test]
    fn test_quote_guard_rejects() {
        let open = &pattern("10-k/mda/item-7").open;
        let hits = open.hits("caption \u{201C}\nItem 7. Management's Discussion\u{201D}");
        assert_eq!(hits[0].rejection, Some(Rejection::Guard('\u{201C}')));

        let close = &pattern("10-k/mda/item-7").close;
        let hits = close.hits("Items 7,\nItem 8 and 9");
        assert_eq!(hits[0].rejection, Some(Rejection::Guard(',')));
    }

    #[test]
    fn test_quarterly_close_veto() {
        let close = &pattern("10-q/mda/item-2").close;
        let hits = close.hits("\nItem 1A. Risk Factors\n\nItem 3. Quantitative");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].rejection, Some(Rejection::NumberVeto("1".to_string())));
        assert!(hits[1].is_accepted());
    }

    #[test]
    fn test_business_heading_variants() {
        let open = &pattern("10-k/item1/business").open;
        assert_eq!(accepted(open, "\nPART I\n\nITEM 1. BUSINESS").len(), 1);
        assert_eq!(accepted(open, "\nItem 1 and 2. Business and Properties").len(), 1);
        assert_eq!(accepted(open, "\nITEM 1. DESCRIPTION OF BUSINESS").len(), 1);
        assert_eq!(accepted(open, "\nItem 1. Our Business").len(), 1);

        let close = &pattern("10-k/item1/business").close;
        assert_eq!(accepted(close, "\nITEM 1A. RISK FACTORS").len(), 1);
        assert_eq!(accepted(close, "\nItem 2. Properties").len(), 1);
    }

    #[test]
    fn test_exclusion_check_directly() {
        assert_eq!(OPEN_EXCLUSION.check(""), None);
        assert_eq!(OPEN_EXCLUSION.check("Annual Report\n"), None);
        assert_eq!(
            OPEN_EXCLUSION.check("refer to\nPart II - "),
            Some(Rejection::Referral("to".to_string()))
        );
        assert_eq!(OPEN_EXCLUSION.check("<b>\n"), Some(Rejection::Guard('>')));
        assert_eq!(
            CLOSE_EXCLUSION.check("UNDER \n"),
            Some(Rejection::Referral("UNDER".to_string()))
        );
    }
}
