//! Errors raised while talking to the upstream endpoints.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, timeout or body read failure.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Upstream answered with a non-success status.
    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// No pilot is registered for the drone.
    #[error("no pilot found for drone {serial}")]
    NotFound { serial: String },

    /// Payload could not be decoded.
    #[error("malformed {what}: {message}")]
    Parse { what: &'static str, message: String },
}

impl FetchError {
    pub fn parse(what: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Parse {
            what,
            message: err.to_string(),
        }
    }
}
