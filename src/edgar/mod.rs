// src/edgar/mod.rs
pub mod client;
pub mod header;
pub mod index;
pub mod models;

#[allow(unused_imports)]
pub use models::{FormFamily, FormType, Quarter, SectionType};
