// src/extractors/section.rs

// --- Imports ---
use crate::edgar::models::{FormType, SectionType};
use crate::extractors::cleanup::clean_section;
use crate::extractors::locator::{Scan, SectionLocator};
use crate::extractors::normalize::Normalizer;

// --- Data Structures ---
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedSection {
    pub form_type: FormType,
    pub section: SectionType,
    /// Anchor pattern that located the section, `None` when nothing was found
    pub variant: Option<&'static str>,
    /// Cleaned section text; empty when no section was found
    pub content: String,
}

impl ExtractedSection {
    /// Length in characters, as reported in audit lines.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

// --- Main Extractor Structure ---
/// Runs normalization, location and cleanup for one document at a time.
/// Holds no per-document state, so one instance can be shared across workers.
#[derive(Debug, Clone, Default)]
pub struct SectionExtractor {
    normalizer: Normalizer,
    locator: SectionLocator,
}

impl SectionExtractor {
    pub fn new(normalizer: Normalizer) -> Self {
        Self {
            normalizer,
            locator: SectionLocator::new(),
        }
    }

    /// Full pipeline on a raw submission. Never fails: a document without a
    /// recognisable section yields an empty `ExtractedSection`.
    pub fn extract(&self, raw: &str, form_type: FormType, section: SectionType) -> ExtractedSection {
        let normalized = self.normalizer.normalize(raw);
        self.extract_normalized(&normalized, form_type, section)
    }

    /// Location and cleanup on text that is already normalized.
    pub fn extract_normalized(&self, normalized: &str, form_type: FormType, section: SectionType) -> ExtractedSection {
        let scan = self.locator.scan(normalized, form_type, section);

        let (variant, content) = match scan.best() {
            Some(candidate) => {
                tracing::debug!(
                    "Selected {} candidate at {}..{} ({} chars)",
                    candidate.variant,
                    candidate.start,
                    candidate.end,
                    candidate.char_len()
                );
                (Some(candidate.variant), clean_section(candidate.text))
            }
            None => {
                tracing::debug!("No {} section candidate in {} document", section, form_type);
                (None, String::new())
            }
        };

        ExtractedSection {
            form_type,
            section,
            variant,
            content,
        }
    }

    /// Normalizes and scans a raw submission, keeping every hit for diagnostics.
    pub fn scan(&self, raw: &str, form_type: FormType, section: SectionType) -> Scan {
        let normalized = self.normalizer.normalize(raw);
        self.locator.scan(&normalized, form_type, section)
    }
}
