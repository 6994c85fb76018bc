//! Place-search client error types.

use std::fmt;

/// Broad category of a place-search failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// Transport failure: connection, timeout, DNS
    Network,

    /// HTTP 429 or `OVER_QUERY_LIMIT`
    RateLimited,

    /// The client's own call budget is spent; lasts for the client's lifetime
    BudgetExhausted,

    /// Non-2xx status, unparseable body, or an error `status` field
    InvalidResponse,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::Network => f.write_str("network error"),
            ApiErrorKind::RateLimited => f.write_str("rate limited"),
            ApiErrorKind::BudgetExhausted => f.write_str("call budget exhausted"),
            ApiErrorKind::InvalidResponse => f.write_str("invalid response"),
        }
    }
}

/// Error from the place-search API.
///
/// `detail` never contains the API key: request URLs are stripped from
/// transport errors before they are turned into an `ApiError`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {detail}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub detail: String,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn network(detail: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Network, detail)
    }

    pub fn rate_limited(detail: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::RateLimited, detail)
    }

    pub fn invalid_response(detail: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::InvalidResponse, detail)
    }

    pub fn budget_exhausted(detail: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::BudgetExhausted, detail)
    }

    /// Whether an orchestrator may reasonably try the call again.
    ///
    /// A spent call budget never recovers, so it is not transient.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            ApiErrorKind::Network | ApiErrorKind::RateLimited
        )
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        // The request URL carries the API key as a query parameter.
        let err = err.without_url();
        if err.is_decode() {
            ApiError::invalid_response(err.to_string())
        } else {
            ApiError::network(err.to_string())
        }
    }
}
