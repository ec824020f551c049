// src/error.rs
//! Error taxonomy for the watcher.
//!
//! Fetch errors are contained per query and notify errors per channel.
//! Extraction failures are not errors of the round: they travel as
//! `Extracted::Broken` items. Only `Config` is fatal, and only at startup.

use reqwest::StatusCode;
use thiserror::Error;

/// Result alias for watcher operations.
pub type Result<T> = std::result::Result<T, WatchError>;

#[derive(Error, Debug)]
pub enum WatchError {
    /// Transport-level failure (DNS, connect, timeout).
    #[error("network error fetching {url}: {message}")]
    FetchNetwork { url: String, message: String },

    /// The target answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    FetchHttp { url: String, status: StatusCode },

    /// A notification channel failed to deliver.
    #[error("notify via {channel} failed: {message}")]
    NotifyTransport { channel: String, message: String },

    /// Malformed configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl WatchError {
    pub fn network(url: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::FetchNetwork {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn http(url: impl Into<String>, status: StatusCode) -> Self {
        Self::FetchHttp {
            url: url.into(),
            status,
        }
    }

    pub fn notify(channel: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::NotifyTransport {
            channel: channel.into(),
            message: message.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this error feeds the failure window.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::FetchNetwork { .. } | Self::FetchHttp { .. })
    }
}

/// A listing whose identity is known but which lacks a required field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("found no {field} on {link}")]
pub struct ExtractionError {
    pub identity: String,
    pub link: String,
    pub field: &'static str,
}
