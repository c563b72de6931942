// src/extractors/entities.rs
//! HTML character entity decoding for filing text.
//!
//! Named references are resolved against the full HTML5 table, including the
//! legacy names that may appear without a trailing semicolon (`&nbsp`, `&amp`).

use html5ever::data::{C1_REPLACEMENTS, NAMED_ENTITIES};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"&(?:#(?P<dec>[0-9]{1,7});?|#[xX](?P<hex>[0-9A-Fa-f]{1,6});?|(?P<name>[A-Za-z][A-Za-z0-9]{0,31};?))",
    )
    .expect("Failed to compile ENTITY_RE")
});

// Double-encoded text (`&amp;nbsp;`) needs one pass per encoding layer
const MAX_DECODE_PASSES: usize = 8;

fn numeric_char(code: u32) -> Option<char> {
    match code {
        0 => Some('\u{FFFD}'),
        // 128..=159 are windows-1252 code points in practice
        128..=159 => C1_REPLACEMENTS[(code - 128) as usize].or_else(|| char::from_u32(code)),
        _ => char::from_u32(code),
    }
}

/// Exact lookup of `name` (with or without its `;`). Prefix-only table
/// entries map to (0, 0) and are not entities.
fn lookup(name: &str) -> Option<String> {
    match NAMED_ENTITIES.get(name) {
        Some(&(first, second)) if first != 0 => {
            let mut decoded = String::new();
            decoded.extend(char::from_u32(first));
            if second != 0 {
                decoded.extend(char::from_u32(second));
            }
            Some(decoded)
        }
        _ => None,
    }
}

fn named_entity(name: &str) -> Option<String> {
    if let Some(decoded) = lookup(name) {
        return Some(decoded);
    }
    // upper-case spellings (&AMP;, &NBSP;) appear in older SGML filings
    if name.ends_with(';') {
        if let Some(decoded) = lookup(&name.to_ascii_lowercase()) {
            return Some(decoded);
        }
    }
    // longest legacy name at the front, e.g. `&copy2005` -> `©2005`
    (2..name.len())
        .rev()
        .find_map(|end| lookup(&name[..end]).map(|decoded| decoded + &name[end..]))
}

fn decode_once(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &Captures| {
            let decoded = if let Some(dec) = caps.name("dec") {
                dec.as_str().parse::<u32>().ok().and_then(numeric_char).map(String::from)
            } else if let Some(hex) = caps.name("hex") {
                u32::from_str_radix(hex.as_str(), 16).ok().and_then(numeric_char).map(String::from)
            } else {
                caps.name("name").and_then(|name| named_entity(name.as_str()))
            };
            decoded.unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Replaces named and numeric character references with their characters,
/// repeating until no decodable reference is left.
pub fn decode_entities(text: &str) -> String {
    let mut current = text.to_string();
    for _ in 0..MAX_DECODE_PASSES {
        if !current.contains('&') {
            break;
        }
        let next = decode_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}
