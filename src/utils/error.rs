// src/utils/error.rs
use thiserror::Error;

// Errors raised while talking to EDGAR (index files and filing downloads)
#[derive(Error, Debug)]
pub enum EdgarError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode), // e.g., 404 Not Found

    #[error("SEC rate limit likely exceeded (check the User-Agent)")]
    RateLimited,

    #[error("Index file not available locally: {0} (run download-index first)")]
    IndexNotFound(String),

    #[error("Giving up on {url} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Errors raised when selecting what to extract. The engine itself never fails on a document.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Unknown form type '{0}' (expected one of: 8-k, 10-k, 10-k/a, 10-q, 10-q/a)")]
    UnknownFormType(String),

    #[error("Unknown section type '{0}' (expected one of: mda, item1)")]
    UnknownSectionType(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid search pattern: {0}")]
    Pattern(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("EDGAR interaction failed: {0}")]
    Edgar(#[from] EdgarError), // Automatically convert Edgar errors

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Batch processing failed: {0}")]
    Processing(String),
}
