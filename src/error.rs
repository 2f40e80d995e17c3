// Error handling module
// Classified errors returned by every API operation

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scope::ScopeError;

/// Classified outcome of a failed API operation
///
/// Produced once per pipeline invocation and never retried by the pipeline.
/// Callers match on the variant instead of on error messages.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The operation's scope was cancelled by its owner
    #[error("Operation cancelled")]
    Cancelled,

    /// The operation's scope deadline elapsed
    #[error("Operation deadline exceeded")]
    DeadlineExceeded,

    /// The network exchange itself failed
    #[error("Transport failure: {0}")]
    Transport(#[source] TransportError),

    /// The server answered with a non-success status
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A success response body did not match the expected shape
    #[error("Failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),

    /// Caller input failed a pre-flight check
    #[error("Validation error: {0}")]
    Validation(String),

    /// Client construction or configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::DeadlineExceeded)
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// The structured API error, if the server rejected the request
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_not_found)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_unauthorized)
    }

    pub fn is_bad_request(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_bad_request)
    }
}

impl From<ScopeError> for ClientError {
    fn from(err: ScopeError) -> Self {
        match err {
            ScopeError::Cancelled => Self::Cancelled,
            ScopeError::DeadlineExceeded => Self::DeadlineExceeded,
        }
    }
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Scope(scope) => scope.into(),
            other => Self::Transport(other),
        }
    }
}

/// Failures reported by a `Transport`
#[derive(Error, Debug)]
pub enum TransportError {
    /// The exchange stopped because its scope ended
    #[error(transparent)]
    Scope(#[from] ScopeError),

    /// The HTTP exchange failed (after any transport-level retries)
    #[error("HTTP request failed ({kind}): {message}")]
    Http { kind: &'static str, message: String },

    /// The request could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// One structured entry of an API error body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub message: String,

    /// Machine-readable reason code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Offending request field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Non-success response from the remote API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("API error {status}: {message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    pub details: Vec<ErrorDetail>,
}

/// Wire shape of an error body
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,

    #[serde(default, alias = "details")]
    errors: Vec<ErrorDetail>,
}

impl ApiError {
    /// Classify an error response.
    /// Always yields something usable, even for empty or garbled bodies.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let parsed = serde_json::from_slice::<ErrorBody>(body).ok();

        let (message, details) = match parsed {
            Some(ErrorBody { message, errors }) => (message, errors),
            None => (None, Vec::new()),
        };

        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| reason_phrase(status));

        Self {
            status,
            message,
            details,
        }
    }

    pub fn is_bad_request(&self) -> bool {
        self.status == 400
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn is_forbidden(&self) -> bool {
        self.status == 403
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    pub fn is_conflict(&self) -> bool {
        self.status == 409
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }

    pub fn is_server_error(&self) -> bool {
        (500..=599).contains(&self.status)
    }
}

/// Standard reason phrase for a status code
pub fn reason_phrase(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Unknown Status {}", status))
}

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ClientError>;
