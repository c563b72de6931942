// src/extractors/cleanup.rs
//! Post-processing of a located section span into a single clean line of text.

use once_cell::sync::Lazy;
use regex::Regex;

static TOC_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:Return\s*?to\s*?)?Table\s*?of\s*?Contents[ \t]*$")
        .expect("Failed to compile TOC_LINE_RE")
});

static SEPARATOR_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_{2,}|-{2,}|={2,}").expect("Failed to compile SEPARATOR_RUN_RE"));

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("Failed to compile WHITESPACE_RE"));

static SPACED_PUNCT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" ([,;.\u{2019}\u{00AE}]) ").expect("Failed to compile SPACED_PUNCT_RE"));

// Leftover of a malformed `<!-- ... " -->` comment: everything up to its close is boilerplate.
// Must run before separator collapsing, which would eat the "--".
static COMMENT_TAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)\A.*?"\s*-->"#).expect("Failed to compile COMMENT_TAIL_RE"));

/// Cleans a located section span. The result has no line breaks.
pub fn clean_section(span: &str) -> String {
    let txt = TOC_LINE_RE.replace_all(span, " ");
    let txt = COMMENT_TAIL_RE.replace(&txt, "");
    let txt = SEPARATOR_RUN_RE.replace_all(&txt, " ");
    let txt = WHITESPACE_RE.replace_all(&txt, " ");
    let txt = SPACED_PUNCT_RE.replace_all(&txt, "${1} ");
    txt.trim().to_string()
}
