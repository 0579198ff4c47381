use serde::Serialize;
use thiserror::Error;

/// Failures raised by a [`Provider`](super::Provider) implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The request never got a response (connect failure, timeout, reset).
    #[error("transport error: {0}")]
    Transport(String),
    /// The service answered with a non-success status.
    #[error("provider returned status {status}: {message}")]
    Status { status: u16, message: String },
    /// The service answered but the completion was empty.
    #[error("provider returned an empty response")]
    EmptyResponse,
    #[error("provider response exceeds size limit ({actual} > {limit} bytes)")]
    ResponseTooLarge { actual: usize, limit: usize },
    /// The response envelope did not have the expected shape.
    #[error("unexpected provider response: {0}")]
    Protocol(String),
    #[error("missing API key: environment variable {0} is not set")]
    MissingApiKey(String),
    #[error("provider configuration error: {0}")]
    Config(String),
}

/// Stable error codes of the translation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    PayloadTooLarge,
    ProviderUnavailable,
    ProviderError,
    MalformedResponse,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::PayloadTooLarge => "payload_too_large",
            Self::ProviderUnavailable => "provider_unavailable",
            Self::ProviderError => "provider_error",
            Self::MalformedResponse => "malformed_response",
        }
    }
}

/// Terminal failures of [`ProviderGateway::translate_batch`](super::ProviderGateway::translate_batch).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Malformed caller input. No external call was made.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Circuit breaker. No external call was made.
    #[error("payload too large: {actual} keys exceeds the limit of {limit} per request")]
    PayloadTooLarge { actual: usize, limit: usize },
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("provider error: {0}")]
    ProviderError(String),
    /// Unparsable even after repair. `raw` is kept for diagnostics.
    #[error("provider returned malformed JSON")]
    MalformedResponse { raw: String },
}

impl GatewayError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            Self::ProviderUnavailable(_) => ErrorKind::ProviderUnavailable,
            Self::ProviderError(_) => ErrorKind::ProviderError,
            Self::MalformedResponse { .. } => ErrorKind::MalformedResponse,
        }
    }

    /// Message safe to show to an end user.
    ///
    /// Provider-side details stay in the logs.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidRequest(_) | Self::PayloadTooLarge { .. } => self.to_string(),
            Self::ProviderUnavailable(_) | Self::ProviderError(_) => {
                "The translation service encountered an issue. Please try again.".to_string()
            }
            Self::MalformedResponse { .. } => {
                "The translation service returned an unreadable response. Please try again."
                    .to_string()
            }
        }
    }

    /// Whether the same payload could succeed on a later attempt.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable(_) | Self::ProviderError(_) | Self::MalformedResponse { .. }
        )
    }
}

impl From<ProviderError> for GatewayError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::Transport(message) => Self::ProviderUnavailable(message),
            other => Self::ProviderError(other.to_string()),
        }
    }
}
