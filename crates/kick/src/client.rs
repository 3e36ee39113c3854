//! [`KickClient`], the entry point tying the pieces together.

use std::sync::Arc;

use axum::Router;
use tracing::debug;

use crate::api::{
    CategoriesApi, ChannelsApi, ChatApi, EventsApi, KicksApi, LivestreamsApi, ModerationApi,
    RewardsApi, UsersApi,
};
use crate::auth::{
    AuthorizationFlow, Credential, CredentialManager, CredentialSink, OAuthClient, callback_router,
};
use crate::config::KickConfig;
use crate::error::Result;
use crate::http::{RestClient, build_http_client};
use crate::webhooks::WebhookVerifier;

/// Builder for [`KickClient`].
pub struct KickClientBuilder {
    config: KickConfig,
    http: Option<reqwest::Client>,
    sink: Option<Arc<dyn CredentialSink>>,
    credential: Option<Credential>,
}

impl KickClientBuilder {
    /// Use an existing HTTP client instead of building one from the config.
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Receive every credential the client installs or refreshes.
    pub fn credential_sink(mut self, sink: Arc<dyn CredentialSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Start with a previously stored credential.
    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub async fn build(self) -> Result<KickClient> {
        let config = Arc::new(self.config);
        let http = match self.http {
            Some(http) => http,
            None => build_http_client(&config)?,
        };

        let oauth = OAuthClient::new(http.clone(), &config);
        let mut credentials = CredentialManager::builder(Arc::new(oauth.clone()))
            .refresh_threshold(config.refresh_threshold());
        if let Some(sink) = self.sink {
            credentials = credentials.sink(sink);
        }
        let credentials = credentials.build();

        if let Some(credential) = self.credential {
            credentials.initialize(credential).await;
        }

        let rest = RestClient::new(http.clone(), config.api_base_url.clone())
            .with_credentials(credentials.clone());
        let flow = Arc::new(AuthorizationFlow::new(
            Arc::clone(&config),
            oauth.clone(),
            credentials.clone(),
        ));

        debug!(api = %config.api_base_url, "Kick client ready");
        Ok(KickClient {
            config,
            oauth,
            credentials,
            rest,
            flow,
        })
    }
}

/// Kick API client: credentials, REST wrappers and the authorization flow.
///
/// Cloning is cheap and clones share credentials.
#[derive(Clone)]
pub struct KickClient {
    config: Arc<KickConfig>,
    oauth: OAuthClient,
    credentials: CredentialManager,
    rest: RestClient,
    flow: Arc<AuthorizationFlow>,
}

impl KickClient {
    pub fn builder(config: KickConfig) -> KickClientBuilder {
        KickClientBuilder {
            config,
            http: None,
            sink: None,
            credential: None,
        }
    }

    pub fn config(&self) -> &KickConfig {
        &self.config
    }

    pub fn credentials(&self) -> &CredentialManager {
        &self.credentials
    }

    pub fn oauth(&self) -> &OAuthClient {
        &self.oauth
    }

    /// The authenticated executor, for endpoints without a typed wrapper.
    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    pub fn chat(&self) -> ChatApi {
        ChatApi::new(self.rest.clone())
    }

    pub fn users(&self) -> UsersApi {
        UsersApi::new(self.rest.clone())
    }

    pub fn channels(&self) -> ChannelsApi {
        ChannelsApi::new(self.rest.clone())
    }

    pub fn categories(&self) -> CategoriesApi {
        CategoriesApi::new(self.rest.clone())
    }

    pub fn livestreams(&self) -> LivestreamsApi {
        LivestreamsApi::new(self.rest.clone())
    }

    pub fn moderation(&self) -> ModerationApi {
        ModerationApi::new(self.rest.clone())
    }

    pub fn rewards(&self) -> RewardsApi {
        RewardsApi::new(self.rest.clone())
    }

    pub fn kicks(&self) -> KicksApi {
        KicksApi::new(self.rest.clone())
    }

    pub fn events(&self) -> EventsApi {
        EventsApi::new(self.rest.clone())
    }

    pub fn authorization_flow(&self) -> &Arc<AuthorizationFlow> {
        &self.flow
    }

    /// Start an authorization and return the URL to open in a browser.
    pub fn authorization_url(&self) -> String {
        self.flow.authorization_url()
    }

    /// Finish an authorization with a code obtained out of band.
    pub async fn exchange_code(&self, code: &str) -> Result<Credential> {
        self.flow.exchange_code(code).await
    }

    /// Router serving the OAuth redirect at `path`.
    pub fn callback_router(&self, path: &str) -> Router {
        callback_router(Arc::clone(&self.flow), path)
    }

    pub async fn wait_for_authorization(&self) {
        self.flow.wait_for_authorization().await
    }

    /// Verifier for the configured webhook key, or Kick's published key.
    pub fn webhook_verifier(&self) -> Result<WebhookVerifier> {
        match &self.config.webhook.public_key_pem {
            Some(pem) => WebhookVerifier::from_pem(pem),
            None => WebhookVerifier::kick(),
        }
    }
}

impl std::fmt::Debug for KickClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KickClient")
            .field("config", &self.config)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}
