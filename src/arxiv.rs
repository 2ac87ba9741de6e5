use std::fmt;
use std::io::{Seek, SeekFrom, Write};
use std::time::Duration;

use backoff::ExponentialBackoff;
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::archive::FileSet;
use crate::error::ArxDiffError;

// Use a single, lazily-initialized reqwest::Client for all calls to
// enable connection pooling.
static HTTP_CLIENT: Lazy<Client> = Lazy::new(Client::new);

static URL_PREFIX_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?arxiv\.org/(?:abs|pdf|e-print|src)/")
        .expect("Invalid URL prefix regex pattern")
});
static PAPER_ID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<base>[0-9]{4}\.[0-9]{4,5}|[a-z-]+(?:\.[A-Za-z-]+)?/[0-9]{7})(?:v(?P<ver>[0-9]+))?$")
        .expect("Invalid paper ID regex pattern")
});

/// Normalized arXiv paper identifier: version-independent base ID plus
/// an optional version number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperId {
    pub base: String,
    pub version: Option<u32>,
}

impl PaperId {
    /// Parse a bare ID (`2104.08653`), a versioned ID
    /// (`2104.08653v2`), an old-style ID (`hep-th/9901001`), or an
    /// arxiv.org abs/pdf/e-print URL.
    pub fn parse(input: &str) -> Result<PaperId, ArxDiffError> {
        let trimmed = input.trim();
        let stripped = URL_PREFIX_REGEX.replace(trimmed, "");
        let stripped = stripped.trim_end_matches(".pdf").trim_end_matches('/');

        let caps = PAPER_ID_REGEX
            .captures(stripped)
            .ok_or_else(|| ArxDiffError::InvalidPaperId(input.to_string()))?;

        let base = caps.name("base").unwrap().as_str().to_string();
        let version = caps
            .name("ver")
            .map(|m| m.as_str().parse::<u32>())
            .transpose()
            .map_err(|_| ArxDiffError::InvalidPaperId(input.to_string()))?;

        Ok(PaperId { base, version })
    }

    pub fn with_version(&self, version: u32) -> PaperId {
        PaperId {
            base: self.base.clone(),
            version: Some(version),
        }
    }
}

impl fmt::Display for PaperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version {
            Some(v) => write!(f, "{}v{}", self.base, v),
            None => write!(f, "{}", self.base),
        }
    }
}

/// Metadata for one submitted revision of a paper, as returned by the
/// version-listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffVersion {
    pub version: u32,
    pub id: String,
    pub submitted_utc: String,
    pub size_label: String,
}

fn retry_policy() -> ExponentialBackoff {
    let max_timeout = std::env::var("API_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(30);

    ExponentialBackoff {
        initial_interval: Duration::from_millis(100),
        max_interval: Duration::from_secs(5),
        max_elapsed_time: Some(Duration::from_secs(max_timeout)),
        ..Default::default()
    }
}

fn unwrap_backoff(e: backoff::Error<ArxDiffError>) -> ArxDiffError {
    match e {
        backoff::Error::Permanent(err) | backoff::Error::Transient { err, .. } => err,
    }
}

/// Download the source archive for a paper and extract it into a file
/// set. Client errors (bad IDs, missing versions) are not retried;
/// transient failures are, with exponential backoff.
pub fn fetch_source(id: &PaperId) -> Result<FileSet, ArxDiffError> {
    // Support configurable base URL for testing
    let base_url = std::env::var("ARXIV_BASE_URL").unwrap_or_else(|_| "https://arxiv.org".to_string());
    let url = format!("{}/e-print/{}", base_url, id);

    let operation = || {
        info!("Downloading source files from arXiv for paper: {}", id);
        let response = HTTP_CLIENT
            .get(&url)
            .send()
            .map_err(|e| backoff::Error::transient(ArxDiffError::Network(e)))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(backoff::Error::permanent(ArxDiffError::Archive(format!(
                "source download for {} failed: HTTP {}",
                id, status
            ))));
        }
        if !status.is_success() {
            log::warn!("arXiv source endpoint returned status {}", status);
            return Err(backoff::Error::transient(ArxDiffError::Archive(format!(
                "source download for {} failed: HTTP {}",
                id, status
            ))));
        }

        let content = response
            .bytes()
            .map_err(|e| backoff::Error::transient(ArxDiffError::Network(e)))?;
        if content.is_empty() {
            return Err(backoff::Error::permanent(ArxDiffError::Archive(format!(
                "received empty content for paper {}",
                id
            ))));
        }
        Ok(content)
    };

    let content = backoff::retry(retry_policy(), operation).map_err(unwrap_backoff)?;

    // Spool the download to a temporary file so the archive reader can
    // seek while probing formats.
    let mut source_file = tempfile::tempfile()?;
    source_file.write_all(&content)?;
    source_file.seek(SeekFrom::Start(0))?;

    FileSet::from_reader(source_file)
}

/// Fetch the ordered version list for a paper from the source proxy.
pub fn fetch_versions(base_id: &str) -> Result<Vec<DiffVersion>, ArxDiffError> {
    // Support configurable base URL for testing
    let base_url =
        std::env::var("PAPER_PROXY_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
    let url = format!("{}/versions/{}", base_url, base_id);

    let operation = || {
        info!("Fetching version list for paper: {}", base_id);
        let response = HTTP_CLIENT
            .get(&url)
            .send()
            .map_err(|e| backoff::Error::transient(ArxDiffError::Network(e)))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(backoff::Error::permanent(ArxDiffError::Archive(format!(
                "version listing for {} failed: HTTP {}",
                base_id, status
            ))));
        }
        if !status.is_success() {
            log::warn!("version listing returned status {}", status);
            return Err(backoff::Error::transient(ArxDiffError::Archive(format!(
                "version listing for {} failed: HTTP {}",
                base_id, status
            ))));
        }

        response
            .json::<Vec<DiffVersion>>()
            .map_err(|e| backoff::Error::transient(ArxDiffError::Network(e)))
    };

    backoff::retry(retry_policy(), operation).map_err(unwrap_backoff)
}
