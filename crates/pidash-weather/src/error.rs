//! Weather pipeline error types.

use pidash_core::NetworkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherError {
    /// Network failure, timeout or non-success HTTP status
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(#[from] NetworkError),

    /// Body did not parse or lacks expected fields
    #[error("Upstream response malformed: {0}")]
    UpstreamMalformed(String),

    /// Only ever logged; readers degrade to a cache miss
    #[error("Cache unreadable: {0}")]
    CacheUnreadable(String),

    #[error("Cache write failed: {0}")]
    CacheWrite(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WeatherError {
    /// Short message for the dashboard status line.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::UpstreamUnavailable(e) => e.user_message(),
            Self::UpstreamMalformed(_) => "The weather service sent unexpected data.",
            Self::CacheUnreadable(_) | Self::CacheWrite(_) => "Weather data may be outdated.",
            Self::Internal(_) => "Something went wrong. Please try again.",
        }
    }

    /// Whether another attempt at the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::UpstreamUnavailable(e) => e.is_transient(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(WeatherError::UpstreamUnavailable(NetworkError::Timeout).is_retryable());
        assert!(!WeatherError::UpstreamUnavailable(NetworkError::ServerError {
            status: 404,
            message: "Not Found".into(),
        })
        .is_retryable());
        assert!(!WeatherError::UpstreamMalformed("missing periods".into()).is_retryable());
    }

    #[test]
    fn test_user_messages() {
        let err = WeatherError::CacheWrite("disk full".into());
        assert!(err.user_message().contains("outdated"));

        let err = WeatherError::UpstreamUnavailable(NetworkError::Timeout);
        assert!(err.user_message().contains("timed out"));
    }
}
