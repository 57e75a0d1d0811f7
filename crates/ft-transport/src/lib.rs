//! Delivery of usage batches to the remote collector.
//!
//! The collector exposes `POST /usage` taking a JSON array of
//! `{domain, minutes}` objects; any 2xx status acknowledges the batch and no
//! response body is consumed. Failures are returned to the caller so the
//! batch can be restored into the ledger and retried on the next flush.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use ft_core::UsageEntry;

pub use reqwest::StatusCode;

/// Default request timeout for collector calls.
///
/// Keeps a flush (and the final flush at shutdown) bounded even when the
/// collector is unreachable.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport errors. All of them are recoverable: the engine restores the
/// batch and retries on the next tick.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The configured endpoint was unusable.
    #[error("invalid collector endpoint: {reason}")]
    InvalidEndpoint { reason: &'static str },
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// The request did not complete (connect error, timeout).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The delivery did not complete within the caller's bound.
    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),
    /// The collector answered with a non-2xx status.
    #[error("collector rejected batch: status {status}")]
    Status { status: reqwest::StatusCode },
}

/// Anything that can deliver a usage batch to the collector.
///
/// The engine is generic over this seam so tests can observe deliveries and
/// inject failures without a network.
pub trait DeliverUsage {
    /// Delivers the entries; `Ok` means the collector acknowledged them.
    fn deliver(
        &self,
        entries: &[UsageEntry],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// HTTP client for the collector's ingestion endpoint.
///
/// Safe to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct CollectorClient {
    http: reqwest::Client,
    endpoint: String,
}

impl fmt::Debug for CollectorClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectorClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl CollectorClient {
    /// Creates a client for the given endpoint with a request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not an absolute HTTP URL or the
    /// HTTP client fails to build.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(TransportError::InvalidEndpoint {
                reason: "endpoint cannot be empty",
            });
        }
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(TransportError::InvalidEndpoint {
                reason: "endpoint must be an absolute http(s) URL",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TransportError::ClientBuild)?;

        Ok(Self { http, endpoint })
    }

    /// The configured endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl DeliverUsage for CollectorClient {
    async fn deliver(&self, entries: &[UsageEntry]) -> Result<(), TransportError> {
        let response = self.http.post(&self.endpoint).json(entries).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status { status });
        }
        tracing::debug!(entries = entries.len(), %status, "batch delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_rejects_empty_endpoint() {
        assert!(matches!(
            CollectorClient::new("", DEFAULT_TIMEOUT),
            Err(TransportError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn client_rejects_relative_endpoint() {
        assert!(matches!(
            CollectorClient::new("localhost:8080/usage", DEFAULT_TIMEOUT),
            Err(TransportError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn client_accepts_http_endpoint() {
        let client = CollectorClient::new("http://localhost:8080/usage", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/usage");
    }
}
