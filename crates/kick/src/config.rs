//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default REST host.
pub const DEFAULT_API_BASE_URL: &str = "https://api.kick.com";
/// Default OAuth host.
pub const DEFAULT_OAUTH_BASE_URL: &str = "https://id.kick.com";
/// Refresh the access token this many seconds before it expires.
pub const DEFAULT_REFRESH_THRESHOLD_SECS: u64 = 60;

/// Kick application configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KickConfig {
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Redirect URI registered for the app.
    pub redirect_uri: String,
    /// Scopes requested during authorization.
    pub scopes: Vec<String>,
    /// REST API host.
    pub api_base_url: String,
    /// OAuth host (authorize + token endpoints).
    pub oauth_base_url: String,
    /// Seconds before expiry at which the access token is refreshed.
    pub refresh_threshold_secs: u64,
    /// Transport timeout for outbound requests. `0` disables it.
    pub request_timeout_secs: u64,
    /// Inbound webhook endpoint settings.
    pub webhook: WebhookConfig,
}

impl Default for KickConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: "http://localhost:3000/callback".to_string(),
            scopes: Vec::new(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            oauth_base_url: DEFAULT_OAUTH_BASE_URL.to_string(),
            refresh_threshold_secs: DEFAULT_REFRESH_THRESHOLD_SECS,
            request_timeout_secs: 30,
            webhook: WebhookConfig::default(),
        }
    }
}

impl std::fmt::Debug for KickConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KickConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("api_base_url", &self.api_base_url)
            .field("oauth_base_url", &self.oauth_base_url)
            .field("refresh_threshold_secs", &self.refresh_threshold_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("webhook", &self.webhook)
            .finish()
    }
}

impl KickConfig {
    /// Create a config for an app with default hosts.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            ..Self::default()
        }
    }

    /// Set the requested scopes.
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Load config from environment variables, falling back to defaults.
    ///
    /// Supported env vars:
    /// - `KICK_CLIENT_ID`, `KICK_CLIENT_SECRET`, `KICK_REDIRECT_URI`
    /// - `KICK_SCOPES` (space or comma separated)
    /// - `KICK_API_BASE_URL`, `KICK_OAUTH_BASE_URL`
    /// - `KICK_WEBHOOK_PORT`, `KICK_WEBHOOK_PATH`, `KICK_WEBHOOK_PUBLIC_KEY`
    pub fn from_env_or_default() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply the `KICK_*` environment variables on top of this config.
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_env(|key| std::env::var(key).ok());
        self
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("KICK_CLIENT_ID") {
            self.client_id = v;
        }
        if let Some(v) = non_empty("KICK_CLIENT_SECRET") {
            self.client_secret = v;
        }
        if let Some(v) = non_empty("KICK_REDIRECT_URI") {
            self.redirect_uri = v;
        }
        if let Some(v) = non_empty("KICK_SCOPES") {
            self.scopes = v
                .split([' ', ','])
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = non_empty("KICK_API_BASE_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = non_empty("KICK_OAUTH_BASE_URL") {
            self.oauth_base_url = v;
        }
        if let Some(port) = non_empty("KICK_WEBHOOK_PORT")
            && let Ok(parsed) = port.parse::<u16>()
        {
            self.webhook.port = parsed;
        }
        if let Some(v) = non_empty("KICK_WEBHOOK_PATH") {
            self.webhook.path = v;
        }
        if let Some(v) = non_empty("KICK_WEBHOOK_PUBLIC_KEY") {
            self.webhook.public_key_pem = Some(v);
        }
    }

    /// Refresh threshold as a duration.
    pub fn refresh_threshold(&self) -> Duration {
        Duration::from_secs(self.refresh_threshold_secs)
    }

    /// Transport timeout, if enabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    /// URL of the OAuth token endpoint.
    pub fn token_url(&self) -> String {
        format!("{}/oauth/token", self.oauth_base_url.trim_end_matches('/'))
    }

    /// URL of the OAuth authorize endpoint.
    pub fn authorize_url(&self) -> String {
        format!(
            "{}/oauth/authorize",
            self.oauth_base_url.trim_end_matches('/')
        )
    }
}

/// Inbound webhook endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Bind address for the webhook server.
    pub bind_address: String,
    /// Port for the webhook server.
    pub port: u16,
    /// Path that receives deliveries.
    pub path: String,
    /// PEM public key overriding the built-in Kick signing key.
    pub public_key_pem: Option<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            path: "/kick/webhook".to_string(),
            public_key_pem: None,
        }
    }
}

impl WebhookConfig {
    /// Socket address string for binding.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
