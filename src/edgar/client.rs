// src/edgar/client.rs
use reqwest::header;
use std::path::Path;
use std::time::Duration;

use crate::edgar::models::{IndexEntry, Quarter};
use crate::utils::config::Settings;
use crate::utils::error::EdgarError;

/// What happened to a requested download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Download {
    /// The target file was fetched and written.
    Written,
    /// The target file already existed locally; nothing was fetched.
    AlreadyPresent,
}

/// Thin wrapper around a reqwest client configured for EDGAR.
pub struct EdgarClient {
    http: reqwest::Client,
    request_delay: Duration,
    retry_delay: Duration,
    max_attempts: u32,
}

impl EdgarClient {
    /// Builds a client that identifies itself with `user_agent`
    /// (SEC expects "ORG_NAME mail@address").
    pub fn new(user_agent: &str, settings: &Settings) -> Result<Self, EdgarError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(20))
            .build()?;
        tracing::debug!("Using User-Agent: {}", user_agent);
        Ok(Self {
            http,
            request_delay: settings.request_delay,
            retry_delay: settings.retry_delay,
            max_attempts: settings.max_attempts.max(1),
        })
    }

    /// Fetches a URL as text, with basic rate limiting.
    async fn fetch_text(&self, url: &str) -> Result<String, EdgarError> {
        // --- Basic Rate Limiting ---
        tokio::time::sleep(self.request_delay).await;

        let response = self
            .http
            .get(url)
            .header(header::ACCEPT, "text/plain,text/html,*/*")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("HTTP error status: {} for URL: {}", status, url);
            if status == reqwest::StatusCode::FORBIDDEN || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                tracing::warn!("Received {} - check User-Agent and rate limits.", status);
                return Err(EdgarError::RateLimited);
            }
            return Err(EdgarError::Http(status));
        }

        // Filings are mostly ASCII/latin-1; undecodable bytes are replaced, not fatal
        let bytes = response.bytes().await?;
        let body = String::from_utf8_lossy(&bytes).into_owned();
        tracing::debug!("Downloaded {} bytes from {}", body.len(), url);
        Ok(body)
    }

    /// Downloads the quarterly `master.idx` into `dest`, unless it is already there.
    pub async fn download_index(&self, quarter: Quarter, dest: &Path) -> Result<Download, EdgarError> {
        if dest.exists() {
            tracing::info!("Index file {} exists already!", quarter);
            return Ok(Download::AlreadyPresent);
        }
        let url = quarter.index_url();
        tracing::info!("Downloading index {} from {}", quarter, url);
        let body = self.fetch_text(&url).await?;
        write_file(dest, &body).await?;
        tracing::info!("Index file {} written to {}", quarter, dest.display());
        Ok(Download::Written)
    }

    /// Downloads a full-text submission to `dest`, retrying transient failures.
    /// Returns the downloaded text, or `None` if the file was already present.
    pub async fn download_filing(&self, entry: &IndexEntry, dest: &Path) -> Result<Option<String>, EdgarError> {
        if dest.exists() {
            tracing::info!("Already downloaded from: {} (at {})", entry.url(), dest.display());
            return Ok(None);
        }

        let url = entry.url();
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.fetch_text(&url).await {
                Ok(body) => {
                    write_file(dest, &body).await?;
                    tracing::info!("Download from: {} written to: {}", url, dest.display());
                    return Ok(Some(body));
                }
                Err(EdgarError::Http(status)) if status == reqwest::StatusCode::NOT_FOUND => {
                    return Err(EdgarError::Http(status));
                }
                Err(e) if attempt < self.max_attempts => {
                    tracing::warn!("{}: {} (attempt {}/{}), restarting", url, e, attempt, self.max_attempts);
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => {
                    return Err(EdgarError::RetriesExhausted {
                        url,
                        attempts: attempt,
                        last_error: e.to_string(),
                    });
                }
            }
        }
    }
}

async fn write_file(dest: &Path, body: &str) -> Result<(), EdgarError> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(dest, body).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_client() -> EdgarClient {
        let settings = Settings::new();
        EdgarClient::new("Test Org test@example.com", &settings).expect("client builds")
    }

    #[test]
    fn test_existing_index_is_not_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("1996_q1.idx");
        std::fs::write(&dest, "cached").unwrap();

        let client = offline_client();
        let outcome = tokio_test::block_on(client.download_index(Quarter { year: 1996, qtr: 1 }, &dest)).unwrap();

        assert_eq!(outcome, Download::AlreadyPresent);
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "cached");
    }

    #[test]
    fn test_existing_filing_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("0000950144-97-003452.txt");
        std::fs::write(&dest, "<SEC-HEADER>").unwrap();
        let entry = IndexEntry {
            cik: "1000045".into(),
            company_name: "NICHOLAS FINANCIAL INC".into(),
            form_type: "10-K".into(),
            date_filed: "1997-03-28".into(),
            path: "edgar/data/1000045/0000950144-97-003452.txt".into(),
        };

        let client = offline_client();
        let body = tokio_test::block_on(client.download_filing(&entry, &dest)).unwrap();
        assert!(body.is_none());
    }
}
