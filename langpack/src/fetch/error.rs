//! Fetch error types.

use thiserror::Error;

/// Errors delivered to a resource requester.
///
/// `Clone` because one pooled result is handed to every caller that asked for
/// the same resource.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The resource itself came back with a non-2xx status.
    #[error("single fetch failed for {resource}: HTTP {status}")]
    SingleFetchFailed { resource: String, status: u16 },

    /// The batch response had no entry for this resource.
    #[error("batch response contained no result for {resource}")]
    MissingBatchResponse { resource: String },

    /// The batch call itself failed; every resource in it is rejected.
    #[error("batch fetch failed: {reason}")]
    BatchFetchFailed { reason: String },

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The body could not be turned into a resource map.
    #[error("failed to decode {resource}: {reason}")]
    Decode { resource: String, reason: String },

    /// No response arrived within the request timeout.
    #[error("request for {resource} timed out after {timeout_ms}ms")]
    Timeout { resource: String, timeout_ms: u64 },

    /// The client shut down before the request was answered.
    #[error("request cancelled")]
    Cancelled,
}

impl FetchError {
    /// Whether a later attempt could succeed.
    ///
    /// Transient failures are evicted from the request pool; definitive
    /// answers (a 404, an undecodable body) are kept.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::BatchFetchFailed { .. }
                | FetchError::Http(_)
                | FetchError::Timeout { .. }
                | FetchError::Cancelled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::SingleFetchFailed {
            resource: "app/fr-fr.json".to_string(),
            status: 404,
        };
        assert_eq!(
            err.to_string(),
            "single fetch failed for app/fr-fr.json: HTTP 404"
        );

        let err = FetchError::Timeout {
            resource: "x".to_string(),
            timeout_ms: 250,
        };
        assert!(err.to_string().contains("250ms"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(FetchError::Cancelled.is_transient());
        assert!(FetchError::Http("reset".into()).is_transient());
        assert!(FetchError::BatchFetchFailed { reason: "503".into() }.is_transient());
        assert!(!FetchError::SingleFetchFailed {
            resource: "r".into(),
            status: 404
        }
        .is_transient());
        assert!(!FetchError::Decode {
            resource: "r".into(),
            reason: "bad".into()
        }
        .is_transient());
    }
}
