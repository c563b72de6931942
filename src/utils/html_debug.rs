// src/utils/html_debug.rs
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::extractors::locator::Scan;
use crate::extractors::patterns::HeadingHit;
use crate::utils::error::AppError;

/// A region of the scanned text to mark in the debug page. A zero-width
/// highlight is rendered as a marker glyph.
#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    pub start: usize,
    pub end: usize,
    pub kind: &'static str,
    pub note: String,
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Renders plain text as a HTML page with the given highlights.
/// Highlights overlapping an earlier one are skipped.
pub fn render_debug_html(text: &str, title: &str, highlights: &[Highlight]) -> String {
    let mut debug_html = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    debug_html.push_str(&format!("<title>{}</title>\n<style>\n", escape_html(title)));

    // CSS for highlight colors
    debug_html.push_str("body { font-family: monospace; white-space: pre-wrap; }\n");
    debug_html.push_str(".highlight-open { background-color: #90EE90; }\n");
    debug_html.push_str(".highlight-close { background-color: #ADD8E6; }\n");
    debug_html.push_str(".highlight-rejected { background-color: #FFC0CB; text-decoration: line-through; }\n");
    debug_html.push_str(".marker { background-color: #FFFF00; font-weight: bold; }\n");
    debug_html.push_str("</style>\n</head>\n<body>\n");
    debug_html.push_str(&format!("<h3>{}</h3>\n", escape_html(title)));

    let mut sorted_highlights = highlights.to_vec();
    sorted_highlights.sort_by_key(|h| (h.start, h.end));

    let mut last_pos = 0;
    for highlight in sorted_highlights {
        if highlight.start < last_pos || highlight.end > text.len() {
            tracing::trace!("Skipping overlapping highlight at {}..{}", highlight.start, highlight.end);
            continue;
        }
        debug_html.push_str(&escape_html(&text[last_pos..highlight.start]));

        if highlight.start == highlight.end {
            let glyph = if highlight.kind == "selected-end" { "&#9664;" } else { "&#9654;" };
            debug_html.push_str(&format!(
                "<span class=\"marker\" title=\"{}\">{}</span>",
                escape_html(&highlight.note),
                glyph
            ));
        } else {
            debug_html.push_str(&format!(
                "<span class=\"highlight-{}\" title=\"Position: {}-{}, {}\">",
                highlight.kind,
                highlight.start,
                highlight.end,
                escape_html(&highlight.note)
            ));
            debug_html.push_str(&escape_html(&text[highlight.start..highlight.end]));
            debug_html.push_str("</span>");
        }
        last_pos = highlight.end;
    }

    if last_pos < text.len() {
        debug_html.push_str(&escape_html(&text[last_pos..]));
    }
    debug_html.push_str("\n</body>\n</html>");
    debug_html
}

fn hit_highlight(hit: &HeadingHit, variant: &str, role: &'static str) -> Highlight {
    match &hit.rejection {
        None => Highlight {
            start: hit.heading_start,
            end: hit.end,
            kind: role,
            note: format!("{} {}", variant, role),
        },
        Some(reason) => Highlight {
            start: hit.heading_start,
            end: hit.end,
            kind: "rejected",
            note: format!("{} {} rejected: {:?}", variant, role, reason),
        },
    }
}

/// Highlights every anchor hit of a scan and marks the selected span.
pub fn scan_highlights(scan: &Scan) -> Vec<Highlight> {
    let mut highlights = Vec::new();
    for pattern in &scan.patterns {
        highlights.extend(pattern.opens.iter().map(|h| hit_highlight(h, pattern.variant, "open")));
        highlights.extend(pattern.closes.iter().map(|h| hit_highlight(h, pattern.variant, "close")));
    }
    if let Some(best) = scan.best() {
        let note = format!("{} selected ({} chars)", best.variant, best.char_len());
        highlights.push(Highlight { start: best.start, end: best.start, kind: "selected-start", note: note.clone() });
        highlights.push(Highlight { start: best.end, end: best.end, kind: "selected-end", note });
    }
    highlights
}

/// Writes an annotated page for `scan` to `path`.
pub fn create_debug_html(scan: &Scan, path: &Path, title: &str) -> Result<(), AppError> {
    let debug_html = render_debug_html(&scan.text, title, &scan_highlights(scan));
    let mut file = File::create(path)?;
    file.write_all(debug_html.as_bytes())?;

    tracing::info!("Saved debug HTML to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::models::{FormType, SectionType};
    use crate::extractors::locator::SectionLocator;

    #[test]
    fn test_render_escapes_and_marks() {
        let text = "a <b> & c";
        let highlights = vec![
            Highlight { start: 2, end: 5, kind: "open", note: "x".into() },
            Highlight { start: 3, end: 4, kind: "close", note: "overlaps".into() },
            Highlight { start: 0, end: 0, kind: "selected-start", note: "s".into() },
        ];
        let html = render_debug_html(text, "T & T", &highlights);
        assert!(html.contains("<title>T &amp; T</title>"));
        assert!(html.contains("<span class=\"highlight-open\" title=\"Position: 2-5, x\">&lt;b&gt;</span>"));
        assert!(!html.contains("highlight-close\" title"));
        assert!(html.contains("&#9654;</span>a "));
        assert!(html.contains(" &amp; c"));
    }

    #[test]
    fn test_scan_page_shows_rejections_and_selection() {
        let doc = format!(
            "Intro\nas discussed in\nItem 7. Management's Discussion\n\nCover\nITEM 7. MANAGEMENT'S DISCUSSION\n{}\nITEM 8. FINANCIAL STATEMENTS",
            "Sales grew. ".repeat(10)
        );
        let scan = SectionLocator::new().scan(&doc, FormType::TenK, SectionType::Mda);
        let highlights = scan_highlights(&scan);
        assert!(highlights.iter().any(|h| h.kind == "rejected" && h.note.contains("Referral")));
        assert!(highlights.iter().any(|h| h.kind == "selected-start"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inspect.html");
        create_debug_html(&scan, &path, "test").unwrap();
        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("highlight-rejected"));
        assert!(html.contains("&#9664;"));
    }
}
