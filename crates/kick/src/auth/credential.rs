//! OAuth credential types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Token payload returned by the Kick OAuth token endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds, relative to issuance.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Absolute expiry in epoch milliseconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}

/// An OAuth credential set.
///
/// Credentials are never mutated in place: a refresh produces a new value
/// that replaces the old one wholesale.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    /// Refresh tokens are single-use.
    pub refresh_token: Option<String>,
    /// `None` means the token is managed externally and never refreshed here.
    pub expires_at: Option<DateTime<Utc>>,
    pub scope: Option<String>,
    pub token_type: Option<String>,
}

impl Credential {
    /// Create a credential from bare tokens with no known expiry.
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: None,
            scope: None,
            token_type: None,
        }
    }

    /// Set an absolute expiry.
    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Build a credential from a token endpoint response.
    ///
    /// An explicit `expires_at` wins over `expires_in`; the latter is
    /// resolved against `issued_at`.
    pub fn from_token_response(response: TokenResponse, issued_at: DateTime<Utc>) -> Self {
        let expires_at = response
            .expires_at
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .or_else(|| {
                response
                    .expires_in
                    .and_then(|secs| i64::try_from(secs).ok())
                    .and_then(Duration::try_seconds)
                    .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
            });

        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token.filter(|t| !t.is_empty()),
            expires_at,
            scope: response.scope,
            token_type: response.token_type,
        }
    }

    /// Whether the token is inside the refresh window at `now`.
    ///
    /// Credentials without a known expiry never need a refresh.
    pub fn needs_refresh(&self, now: DateTime<Utc>, threshold: std::time::Duration) -> bool {
        let Some(expires_at) = self.expires_at else {
            return false;
        };
        let threshold = Duration::from_std(threshold).unwrap_or(Duration::zero());
        now >= expires_at - threshold
    }

    /// Whether the token is past its hard expiry at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    /// Check if a refresh token is available.
    #[inline]
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Granted scopes as a list.
    pub fn scopes(&self) -> Vec<&str> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().collect())
            .unwrap_or_default()
    }
}

impl From<TokenResponse> for Credential {
    fn from(response: TokenResponse) -> Self {
        Self::from_token_response(response, Utc::now())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .field("token_type", &self.token_type)
            .finish()
    }
}
