use crate::host::HostAddress;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;

/// Health status as reported by a host's status endpoint
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    pub application: String,
    pub version: String,
    #[serde(rename = "uptime")]
    pub uptime_seconds: u64,
    pub request_count: u64,
    pub error_count: u64,
    pub success_count: u64,
}

/// Reasons a single host could not deliver a [`StatusRecord`].
///
/// None of these abort a batch, they travel inside an [`Outcome`].
#[derive(Error, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FetchError {
    /// The request did not complete within the fetch timeout
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),
    /// Connection, DNS or any other transport level error
    #[error("Failed to reach server: {0}")]
    Network(String),
    /// The endpoint answered with a non-success status code
    #[error("Server returned status {status}: {body}")]
    Status { status: u16, body: String },
    /// The body was not a valid status document
    #[error("Failed to decode JSON: {reason}. Response: {body}")]
    Decode { reason: String, body: String },
    /// The batch was cancelled before the fetch finished
    #[error("Cancelled")]
    Cancelled,
    /// The fetch task died without reporting back
    #[error("Fetch task aborted: {0}")]
    Aborted(String),
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

/// Result of one host's fetch attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub host: HostAddress,
    pub result: Result<StatusRecord, FetchError>,
}

impl Outcome {
    pub fn success(host: HostAddress, record: StatusRecord) -> Self {
        Outcome {
            host,
            result: Ok(record),
        }
    }

    pub fn failure(host: HostAddress, error: FetchError) -> Self {
        Outcome {
            host,
            result: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn record(&self) -> Option<&StatusRecord> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.result.as_ref().err()
    }

    pub fn icon(&self) -> &str {
        match &self.result {
            Ok(_) => "✅",
            Err(FetchError::Timeout(_)) => "⌛",
            Err(FetchError::Cancelled) => "👻",
            Err(_) => "🚫",
        }
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.result {
            Ok(record) => write!(
                f,
                "{} {} [{} {}]",
                self.icon(),
                self.host,
                record.application,
                record.version
            ),
            Err(e) => write!(f, "{} {} ({})", self.icon(), self.host, e),
        }
    }
}
