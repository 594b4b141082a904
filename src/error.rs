//! Error taxonomy for the bundle subsystem and the remote API client.
//!
//! Library operations return these typed errors so callers can tell an
//! authoritative absence (`NotFound`) from a transient fault, and a partial
//! result from a total failure. The binary converts them into `anyhow`
//! errors at the edge.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::models::Category;
use crate::sources::Mirror;

/// Failure of a single HTTP GET, as classified by an [`HttpClient`](crate::http::HttpClient).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    /// The server answered 404.
    #[error("HTTP 404 Not Found")]
    NotFound,

    /// Any other non-2xx status.
    #[error("HTTP {0}")]
    Status(u16),

    /// Connection failure, timeout, or body read failure.
    #[error("{0}")]
    Transport(String),
}

/// Failure to fetch one category file from one mirror.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The mirror legitimately lacks this file (HTTP 404).
    #[error("{url} not found (404)")]
    NotFound { url: String },

    /// Transport failure, timeout, or non-2xx status other than 404.
    #[error("network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    /// Body is not valid JSON, or its top-level value is not an array.
    #[error("malformed payload from {url}: {reason}")]
    Format { url: String, reason: String },

    /// The payload was valid but could not be persisted.
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FetchError {
    /// Build a fetch error from an HTTP failure for `url`.
    pub fn from_http(url: &str, err: HttpError) -> Self {
        match err {
            HttpError::NotFound => FetchError::NotFound {
                url: url.to_string(),
            },
            other => FetchError::Network {
                url: url.to_string(),
                reason: other.to_string(),
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound { .. })
    }
}

/// Failure to obtain one category after failover.
#[derive(Debug, Error)]
pub enum CategoryFailure {
    /// The primary mirror answered 404; no other mirror was tried.
    #[error("{category}.json does not exist on {mirror}: {source}")]
    Absent {
        category: Category,
        mirror: Mirror,
        #[source]
        source: FetchError,
    },

    /// Every mirror was tried and failed.
    #[error("all mirrors failed for {category}.json, last error: {last}")]
    Exhausted { category: Category, last: FetchError },
}

impl CategoryFailure {
    pub fn category(&self) -> Category {
        match self {
            CategoryFailure::Absent { category, .. } => *category,
            CategoryFailure::Exhausted { category, .. } => *category,
        }
    }

    /// `true` when the failure is an authoritative absence rather than a fault.
    pub fn is_absent(&self) -> bool {
        matches!(self, CategoryFailure::Absent { .. })
    }
}

/// Errors reading or writing files inside the bundle directory.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to remove {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode JSON: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failure of a whole bundle download.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Not a single category could be obtained from any mirror.
    #[error("no category could be downloaded from any mirror (last error: {last})")]
    NothingDownloaded { last: String },

    #[error(transparent)]
    Bundle(#[from] BundleError),
}

/// Failure to rebuild the index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// No valid record was found in any category file.
    #[error("no valid quote records found in bundle")]
    NoData,

    #[error(transparent)]
    Bundle(#[from] BundleError),
}

/// One finding of the integrity checker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityIssue {
    #[error("missing file: {name}")]
    MissingFile { name: String },

    #[error("{name}: expected {expected} quotes, found {actual}")]
    CountMismatch {
        name: String,
        expected: u64,
        actual: u64,
    },

    #[error("{name}: checksum mismatch (expected {expected}, found {actual})")]
    ChecksumMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("{name}: read failed - {reason}")]
    ReadError { name: String, reason: String },

    #[error("missing index file: index.jsonl")]
    MissingIndex,
}

/// Failure of an integrity check.
#[derive(Debug, Error)]
pub enum IntegrityError {
    /// `package-info.json` is absent; nothing to check against.
    #[error("package-info.json not found in {}", path.display())]
    MissingMetadata { path: PathBuf },

    /// The check ran and found problems. Every finding is listed.
    #[error("integrity check found {} issue(s)", .0.len())]
    Issues(Vec<IntegrityIssue>),

    #[error(transparent)]
    Bundle(#[from] BundleError),
}

/// Failure of a bulk export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no local bundle found, download one first")]
    NoBundle,

    #[error("no quotes match the requested filters")]
    NoMatch,

    #[error("none of the selected quotes could be loaded from the bundle")]
    NoContent,

    #[error(transparent)]
    Bundle(#[from] BundleError),
}

/// Failure of the remote quote API client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("invalid request URL: {0}")]
    Url(String),

    #[error("all API endpoints failed, last error: {last}")]
    AllEndpointsFailed { last: String },
}
