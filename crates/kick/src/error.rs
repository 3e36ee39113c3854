//! Error types for the Kick client.

use std::sync::Arc;

use thiserror::Error;

/// Boxed error returned by webhook handlers and other user-supplied callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T, E = KickError> = std::result::Result<T, E>;

/// Diagnostic hint attached to a failed REST call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureHint {
    /// 401/403: the token is stale or lacks the scope required by the endpoint.
    StaleOrInsufficientScope,
    /// Any other non-success status.
    Generic,
}

impl FailureHint {
    /// Pick the hint for an HTTP status code.
    pub fn for_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::StaleOrInsufficientScope,
            _ => Self::Generic,
        }
    }

    /// Operator-facing suggestion.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::StaleOrInsufficientScope => {
                "token refresh failed or scopes are insufficient for this endpoint"
            }
            Self::Generic => "request rejected by the Kick API",
        }
    }
}

impl std::fmt::Display for FailureHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.suggestion())
    }
}

/// Errors that can occur while talking to Kick or receiving its webhooks.
#[derive(Debug, Error)]
pub enum KickError {
    /// No credential has been installed yet.
    #[error("credentials not initialized - authorize the client first")]
    CredentialUninitialized,

    /// Refreshing the access token failed.
    #[error("token refresh failed: {0}")]
    RefreshFailed(#[source] Arc<KickError>),

    /// The API rejected the request with 401 even after a fresh token.
    #[error("authentication rejected by the Kick API after token refresh")]
    AuthenticationRejected,

    /// The API returned a non-success status.
    #[error("API request failed with status {status}: {hint}")]
    Transport {
        status: u16,
        hint: FailureHint,
        /// Response body (truncated), if any.
        body: String,
    },

    /// Webhook signature did not verify.
    #[error("invalid webhook signature")]
    SignatureInvalid,

    /// A required webhook header was absent.
    #[error("missing required webhook header: {0}")]
    MissingHeaders(&'static str),

    /// Webhook body was not valid JSON for its declared event type.
    #[error("malformed webhook payload: {0}")]
    MalformedPayload(#[source] serde_json::Error),

    /// A registered webhook handler failed.
    #[error("webhook handler failed: {0}")]
    HandlerError(#[source] BoxError),

    /// The installed credential has no refresh token.
    #[error("no refresh token available")]
    MissingRefreshToken,

    /// The OAuth token endpoint rejected an exchange.
    #[error("token endpoint returned {status}: {body}")]
    TokenEndpoint { status: u16, body: String },

    /// The configured webhook public key could not be parsed.
    #[error("invalid webhook public key: {0}")]
    InvalidPublicKey(String),

    /// Signature header was not valid base64.
    #[error("malformed webhook signature: {0}")]
    MalformedSignature(#[from] base64::DecodeError),

    /// Caller supplied an invalid combination of parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// OAuth callback state did not match, or no authorization is pending.
    #[error("invalid OAuth state: {0}")]
    InvalidState(String),

    /// Network error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON encode/decode error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl KickError {
    /// Check if the user has to go through the authorization flow again.
    pub fn requires_reauthorization(&self) -> bool {
        match self {
            Self::CredentialUninitialized
            | Self::AuthenticationRejected
            | Self::MissingRefreshToken => true,
            Self::TokenEndpoint { status, .. } => matches!(status, 400 | 401),
            Self::RefreshFailed(cause) => cause.requires_reauthorization(),
            _ => false,
        }
    }

    /// Check if this error is transient and may be retried by the caller.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::HandlerError(_) => true,
            Self::Transport { status, .. } => *status == 429 || *status >= 500,
            Self::TokenEndpoint { status, .. } => *status == 429 || *status >= 500,
            Self::RefreshFailed(cause) => cause.is_transient(),
            _ => false,
        }
    }

    /// Check if this error rejects a webhook delivery before it reaches any handler.
    pub fn is_webhook_rejection(&self) -> bool {
        matches!(
            self,
            Self::SignatureInvalid | Self::MissingHeaders(_) | Self::MalformedSignature(_)
        )
    }
}
