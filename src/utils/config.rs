// src/utils/config.rs
use std::time::Duration;

use crate::utils::error::AppError;

/// Environment variable consulted when `--user-agent` is not given.
pub const USER_AGENT_ENV: &str = "EDGAR_USER_AGENT";

// SEC asks for 10 requests/second max. Be conservative.
const DEFAULT_REQUEST_DELAY_MS: u64 = 150;
const DEFAULT_RETRY_DELAY_SECS: u64 = 5;
const DEFAULT_MAX_ATTEMPTS: u32 = 10;
const DEFAULT_MIN_SECTION_LENGTH: usize = 2_500;

/// Share of digits above which a table is treated as numeric and dropped.
pub const DEFAULT_TABLE_DIGIT_RATIO: f64 = 0.10;

/// Runtime settings shared by the fetcher, the store and the batch runner.
#[derive(Debug, Clone)]
pub struct Settings {
    pub user_agent: Option<String>,
    pub request_delay: Duration,
    pub retry_delay: Duration,
    pub max_attempts: u32,
    /// `None` lets rayon size the pool from the available cores.
    pub workers: Option<usize>,
    pub table_digit_ratio: f64,
    pub min_section_length: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings {
    pub fn new() -> Self {
        Self {
            user_agent: std::env::var(USER_AGENT_ENV).ok().filter(|ua| !ua.trim().is_empty()),
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            workers: None,
            table_digit_ratio: DEFAULT_TABLE_DIGIT_RATIO,
            min_section_length: DEFAULT_MIN_SECTION_LENGTH,
        }
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        if let Some(ua) = user_agent {
            self.user_agent = Some(ua);
        }
        self
    }

    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        self.workers = workers.filter(|&n| n > 0);
        self
    }

    pub fn with_table_digit_ratio(mut self, ratio: Option<f64>) -> Result<Self, AppError> {
        if let Some(ratio) = ratio {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(AppError::Config(format!(
                    "table ratio must be between 0 and 1, got {}",
                    ratio
                )));
            }
            self.table_digit_ratio = ratio;
        }
        Ok(self)
    }

    pub fn with_min_section_length(mut self, min_len: Option<usize>) -> Self {
        if let Some(min_len) = min_len {
            self.min_section_length = min_len;
        }
        self
    }

    /// EDGAR rejects anonymous clients, so downloads need an explicit agent
    /// of the form "ORG_NAME mail@address".
    pub fn require_user_agent(&self) -> Result<&str, AppError> {
        self.user_agent.as_deref().ok_or_else(|| {
            AppError::Config(format!(
                "an EDGAR user agent is required: pass --user-agent or set {}",
                USER_AGENT_ENV
            ))
        })
    }
}
