//! Error types for the mirroring engine.
//!
//! Two families are kept apart: [`MirrorError`] is the only error `mirror` ever returns and it is raised
//! before any I/O happens, while [`FetchFailure`] describes why a single
//! download did not produce a body and always ends up inside a result.

use reqwest::StatusCode;
use thiserror::Error;

/// Input validation failures raised synchronously by `mirror`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MirrorError {
    #[error("URL must not be empty")]
    EmptyUrl,

    #[error("malformed URL {url}: {reason}")]
    MalformedUrl { url: String, reason: String },

    #[error("URL must start with http:// or https:// (got scheme `{scheme}` in {url})")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("URL has no host: {url}")]
    MissingHost { url: String },
}

/// Why a single GET did not yield a body.
///
/// Every variant carries the URL that was requested so the error strings in a
/// result stay meaningful once detached from the fetch that produced them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    #[error("HTTP {status} for {url}")]
    HttpError { url: String, status: StatusCode },

    #[error("file too large ({size} bytes, limit {limit}): {url}")]
    TooLarge { url: String, size: u64, limit: u64 },

    #[error("timeout while downloading {url}")]
    Timeout { url: String },

    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("unexpected error for {url}: {message}")]
    Unknown { url: String, message: String },
}

impl FetchFailure {
    /// Stable machine-readable tag for the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchFailure::InvalidUrl { .. } => "invalid_url",
            FetchFailure::HttpError { .. } => "http_error",
            FetchFailure::TooLarge { .. } => "too_large",
            FetchFailure::Timeout { .. } => "timeout",
            FetchFailure::Network { .. } => "network_error",
            FetchFailure::Unknown { .. } => "unknown_error",
        }
    }

    pub fn url(&self) -> &str {
        match self {
            FetchFailure::InvalidUrl { url }
            | FetchFailure::HttpError { url, .. }
            | FetchFailure::TooLarge { url, .. }
            | FetchFailure::Timeout { url }
            | FetchFailure::Network { url, .. }
            | FetchFailure::Unknown { url, .. } => url,
        }
    }

    /// Maps a transport error from reqwest onto the taxonomy.
    pub(crate) fn from_reqwest(url: &str, err: &reqwest::Error) -> Self {
        let url = url.to_string();
        if err.is_timeout() {
            FetchFailure::Timeout { url }
        } else if let Some(status) = err.status() {
            FetchFailure::HttpError { url, status }
        } else if err.is_connect() || err.is_request() || err.is_body() || err.is_redirect() || err.is_decode() {
            FetchFailure::Network { url, message: err.to_string() }
        } else {
            FetchFailure::Unknown { url, message: err.to_string() }
        }
    }
}
