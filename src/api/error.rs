//! Error taxonomy for the transport-resilience layer
//!
//! Every failure surfaced by the client is an [`ApiError`]. Retry decisions are
//! made by [`ApiError::classify`], never by inspecting concrete error types.

use std::fmt;
use thiserror::Error;

/// Result alias used throughout the `api` module
pub type ApiResult<T> = Result<T, ApiError>;

/// How the retry driver should treat an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Throttling, 5xx, 406 or a transport failure: back off and retry
    Retryable,
    /// The access token was rejected and has since been refreshed: retry
    AuthExpired,
    /// Anything else: surface immediately without consuming a retry
    Fatal,
}

/// Context attached to an error once it leaves the retry loop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallContext {
    pub endpoint: String,
    pub parameters: Option<String>,
    pub account: Option<String>,
}

impl fmt::Display for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "endpoint={}", self.endpoint)?;
        if let Some(parameters) = &self.parameters {
            write!(f, " parameters={}", parameters)?;
        }
        if let Some(account) = &self.account {
            write!(f, " account={}", account)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// A 401 was observed and the credential refresh succeeded
    #[error("access token expired")]
    TokenExpired,

    /// The credential refresh failed or the token endpoint reported an error
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// 429, any 5xx, or the spurious 406 returned by the batch endpoint
    #[error("throttled or unavailable (HTTP {status}): {message}")]
    Throttled { status: u16, message: String },

    /// Transport failure (connect, timeout, body read)
    #[error("network error: {0}")]
    Network(String),

    /// Any other non-2xx status, or a response that could not be parsed
    #[error("protocol error (HTTP {status}): {message}")]
    Protocol { status: u16, message: String },

    /// The bulk export job could not deliver a result file
    #[error("export unavailable: {0}")]
    ExportUnavailable(String),

    /// The client's cancellation token fired
    #[error("operation cancelled")]
    Cancelled,

    /// A failure wrapped with the call it came from
    #[error("{context}: {source}")]
    Call {
        context: CallContext,
        #[source]
        source: Box<ApiError>,
    },
}

impl ApiError {
    /// Classify an HTTP status into an error, or `None` for 2xx
    pub fn from_status(status: u16, message: impl Into<String>) -> Option<Self> {
        let message = message.into();
        match status {
            200..=299 => None,
            401 => Some(ApiError::TokenExpired),
            406 | 429 | 500..=599 => Some(ApiError::Throttled { status, message }),
            _ => Some(ApiError::Protocol { status, message }),
        }
    }

    /// Build a protocol error for a response that failed to parse
    pub fn unparsable(status: u16, what: impl fmt::Display) -> Self {
        ApiError::Protocol {
            status,
            message: format!("unparsable response: {}", what),
        }
    }

    /// The innermost error, skipping any call context wrappers
    pub fn root(&self) -> &ApiError {
        match self {
            ApiError::Call { source, .. } => source.root(),
            other => other,
        }
    }

    /// Single classification function driving the retry policy
    pub fn classify(&self) -> ErrorClass {
        match self.root() {
            ApiError::Throttled { .. } | ApiError::Network(_) => ErrorClass::Retryable,
            ApiError::TokenExpired => ErrorClass::AuthExpired,
            _ => ErrorClass::Fatal,
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self.root() {
            ApiError::Throttled { status, .. } | ApiError::Protocol { status, .. } => Some(*status),
            ApiError::TokenExpired | ApiError::Unauthorized(_) => Some(401),
            _ => None,
        }
    }

    pub fn is_throttled(&self) -> bool {
        self.status() == Some(429)
    }

    pub fn is_export_unavailable(&self) -> bool {
        matches!(self.root(), ApiError::ExportUnavailable(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), ApiError::Cancelled)
    }

    /// Wrap with call context; cancellation and already-wrapped errors pass through
    pub fn with_context(self, context: CallContext) -> Self {
        match self {
            ApiError::Cancelled | ApiError::Call { .. } => self,
            other => ApiError::Call {
                context,
                source: Box::new(other),
            },
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        match error.status() {
            Some(status) => ApiError::from_status(status.as_u16(), error.to_string())
                .unwrap_or_else(|| ApiError::Network(error.to_string())),
            None => ApiError::Network(error.to_string()),
        }
    }
}
