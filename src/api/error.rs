//! Error taxonomy for remote platform calls.
//!
//! Every fetch in the system fails with one of these classes. The class
//! decides how far the failure propagates: most are contained at the node
//! that triggered them, `Network` self-heals on a later pass, and
//! `Unauthorized` aborts the whole pass.

use thiserror::Error;

/// Errors raised by the platform API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The response arrived but failed a structural expectation.
    #[error("response failed validation: {reason}")]
    Validation {
        /// What was expected and not found.
        reason: String,
    },

    /// The response body could not be deserialized.
    #[error("malformed response body: {source}")]
    MalformedResponse {
        /// The underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },

    /// The platform rejected the request as invalid (HTTP 400).
    #[error("bad request: {context}")]
    BadRequest {
        /// The request that was rejected.
        context: String,
    },

    /// The session lacks permission for this resource (HTTP 403).
    #[error("forbidden: {context}")]
    Forbidden {
        /// The resource that was denied.
        context: String,
    },

    /// The session is no longer valid (HTTP 401). Fatal for the pass.
    #[error("session expired or rejected by the platform")]
    Unauthorized,

    /// Transient transport failure (connection reset, timeout, truncated
    /// transfer). Expected to self-heal on the next pass.
    #[error("network error: {context}")]
    Network {
        /// Rendered transport error.
        context: String,
    },

    /// An HTTP status outside the named classes above.
    #[error("HTTP {status} from {url}")]
    Http {
        /// Status code returned by the server.
        status: u16,
        /// The URL that produced it.
        url: String,
    },
}

impl ApiError {
    /// Creates a validation error.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Creates a bad-request error.
    pub fn bad_request(context: impl Into<String>) -> Self {
        Self::BadRequest {
            context: context.into(),
        }
    }

    /// Creates a forbidden error.
    pub fn forbidden(context: impl Into<String>) -> Self {
        Self::Forbidden {
            context: context.into(),
        }
    }

    /// Creates a transient network error.
    pub fn network(context: impl Into<String>) -> Self {
        Self::Network {
            context: context.into(),
        }
    }

    /// Maps an HTTP status onto the taxonomy, or `None` for success codes.
    #[must_use]
    pub fn from_status(status: u16, url: &str) -> Option<Self> {
        match status {
            200..=299 => None,
            400 => Some(Self::bad_request(url)),
            401 => Some(Self::Unauthorized),
            403 => Some(Self::forbidden(url)),
            500..=599 => Some(Self::network(format!("HTTP {status} from {url}"))),
            _ => Some(Self::Http {
                status,
                url: url.to_string(),
            }),
        }
    }

    /// Maps a transport-layer error onto the taxonomy.
    pub fn from_transport(source: &reqwest::Error) -> Self {
        match source.status() {
            Some(status) if status.as_u16() == 401 => Self::Unauthorized,
            _ => Self::network(source.to_string()),
        }
    }

    /// Whether the error concerns only the resource that triggered it,
    /// rather than the session or the transport.
    #[must_use]
    pub fn is_node_local(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::MalformedResponse { .. }
                | Self::BadRequest { .. }
                | Self::Forbidden { .. }
                | Self::Http { .. }
        )
    }

    /// Whether a later pass is expected to succeed without intervention.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(source: serde_json::Error) -> Self {
        Self::MalformedResponse { source }
    }
}
