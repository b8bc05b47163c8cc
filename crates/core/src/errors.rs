//! Error taxonomy for the sync core.
//!
//! All local-store and remote-gateway failures are translated into these
//! kinds at the sync engine boundary; the categorization session and any
//! presentation layer never observe raw transport errors.

use thiserror::Error;

/// Result type alias for sync core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the sync core.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport-level failure reaching the remote service. Recovered by
    /// falling back to the local store on read, or by queueing on write.
    #[error("Network error: {0}")]
    Network(String),

    /// Cold start with no cached data and no reachable remote; there is
    /// nothing to show.
    #[error("No data available offline")]
    NoDataAvailable,

    /// Local persistence substrate failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_message() {
        let err = Error::network("connection refused");
        assert_eq!(err.to_string(), "Network error: connection refused");
    }
}
