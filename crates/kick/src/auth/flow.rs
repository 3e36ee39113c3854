//! Interactive authorization-code flow.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use super::credential::Credential;
use super::manager::CredentialManager;
use super::oauth::OAuthClient;
use super::pkce::{AuthorizationRequest, random_state};
use crate::config::KickConfig;
use crate::error::{KickError, Result};

/// Drives the authorization-code + PKCE flow and installs the resulting credential.
pub struct AuthorizationFlow {
    config: Arc<KickConfig>,
    oauth: OAuthClient,
    credentials: CredentialManager,
    fixed_state: Option<String>,
    pending: Mutex<Option<AuthorizationRequest>>,
    authorized: watch::Sender<bool>,
}

impl AuthorizationFlow {
    pub fn new(
        config: Arc<KickConfig>,
        oauth: OAuthClient,
        credentials: CredentialManager,
    ) -> Self {
        let (authorized, _) = watch::channel(credentials.is_initialized());
        Self {
            config,
            oauth,
            credentials,
            fixed_state: None,
            pending: Mutex::new(None),
            authorized,
        }
    }

    /// Use a fixed `state` value for every request instead of a random one.
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.fixed_state = Some(state.into());
        self
    }

    /// The `state` parameter expected back on the callback, if an
    /// authorization is in progress.
    pub fn pending_state(&self) -> Option<String> {
        self.pending.lock().as_ref().map(|request| request.state.clone())
    }

    /// Start an authorization and return the URL the user must visit.
    ///
    /// Each call generates a new `state` and PKCE pair and supersedes the
    /// previous request.
    pub fn authorization_url(&self) -> String {
        let state = self.fixed_state.clone().unwrap_or_else(random_state);
        let request = AuthorizationRequest::new(&self.config, state);
        let url = request.url.clone();
        *self.pending.lock() = Some(request);
        url
    }

    /// Finish the flow with the `code`/`state` pair delivered to the redirect URI.
    #[instrument(skip_all)]
    pub async fn complete(&self, code: &str, state: &str) -> Result<Credential> {
        let verifier = {
            let pending = self.pending.lock();
            let request = pending.as_ref().ok_or_else(nothing_pending)?;
            if state != request.state {
                warn!("OAuth callback state mismatch");
                return Err(KickError::InvalidState("state mismatch".to_string()));
            }
            request.pkce.verifier.clone()
        };

        let credential = self.oauth.exchange_code(code, &verifier).await?;
        self.pending.lock().take();

        self.credentials.initialize(credential.clone()).await;
        self.authorized.send_replace(true);
        info!(scope = ?credential.scope, "Application authorized");
        Ok(credential)
    }

    /// Exchange a code obtained out of band, using the pending PKCE verifier.
    pub async fn exchange_code(&self, code: &str) -> Result<Credential> {
        let state = self.pending_state().ok_or_else(nothing_pending)?;
        self.complete(code, &state).await
    }

    /// Wait until a credential has been installed through this flow
    /// (or was already present when the flow was created).
    pub async fn wait_for_authorization(&self) {
        let mut rx = self.authorized.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|authorized| *authorized).await;
    }

    /// Whether the flow has completed.
    pub fn is_authorized(&self) -> bool {
        *self.authorized.borrow()
    }
}

fn nothing_pending() -> KickError {
    KickError::InvalidState("no authorization in progress".to_string())
}
