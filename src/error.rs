// Error taxonomy for metric providers and the sampling engine.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    /// A provider could not be queried. Recovered at the adapter boundary.
    #[error("{source_name} unavailable: {reason}")]
    SourceUnavailable {
        source_name: &'static str,
        reason: String,
    },

    /// Requested sampling interval is outside the accepted range.
    #[error("sampling interval {requested}s out of range ({min}..={max}s)")]
    ConfigurationOutOfRange { requested: u64, min: u64, max: u64 },

    /// One-time provider setup failed; the provider stays unavailable.
    #[error("{provider} failed to initialize: {reason}")]
    ProviderInitialization {
        provider: &'static str,
        reason: String,
    },
}

impl MonitorError {
    pub fn unavailable(source_name: &'static str, reason: impl Into<String>) -> Self {
        MonitorError::SourceUnavailable {
            source_name,
            reason: reason.into(),
        }
    }
}
