// src/extractors/mod.rs
pub mod cleanup;
pub mod entities;
pub mod locator;
pub mod normalize;
pub mod patterns;
pub mod section;

// Re-export key extraction types for convenience
#[allow(unused_imports)]
pub use locator::{Scan, SectionCandidate, SectionLocator};
#[allow(unused_imports)]
pub use normalize::Normalizer;
#[allow(unused_imports)]
pub use section::{ExtractedSection, SectionExtractor};
