//! OAuth 2.1 token endpoint client.
//!
//! Kick's token endpoint takes form-encoded bodies and answers with a JSON
//! [`TokenResponse`]. Both grants used by this crate go through
//! [`OAuthClient::request_token`].

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use tracing::{debug, instrument, warn};

use super::credential::{Credential, TokenResponse};
use super::manager::TokenRefresher;
use crate::config::KickConfig;
use crate::error::{KickError, Result};
use crate::http::{MAX_ERROR_BODY, truncate_body};

/// Client for the OAuth token endpoint.
#[derive(Clone)]
pub struct OAuthClient {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl OAuthClient {
    /// Create a client for the app described by `config`.
    pub fn new(client: Client, config: &KickConfig) -> Self {
        Self {
            client,
            token_url: config.token_url(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
        }
    }

    /// Exchange an authorization code (plus its PKCE verifier) for a credential.
    #[instrument(skip_all)]
    pub async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<Credential> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code_verifier", code_verifier),
        ];
        self.request_token(&params).await
    }

    /// Exchange a refresh token for a new credential.
    #[instrument(skip_all)]
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<Credential> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        self.request_token(&params).await
    }

    async fn request_token(&self, params: &[(&str, &str)]) -> Result<Credential> {
        let issued_at = Utc::now();
        let response = self
            .client
            .post(&self.token_url)
            .form(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = truncate_body(response.text().await.unwrap_or_default(), MAX_ERROR_BODY);
            warn!(status = %status, "Token endpoint rejected the request");
            return Err(KickError::TokenEndpoint {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response.json().await?;
        debug!(
            expires_in = ?token.expires_in,
            scope = ?token.scope,
            "Token endpoint issued a credential"
        );
        Ok(Credential::from_token_response(token, issued_at))
    }
}

#[async_trait]
impl TokenRefresher for OAuthClient {
    async fn refresh(&self, refresh_token: &str) -> Result<Credential> {
        self.refresh_token(refresh_token).await
    }
}

impl std::fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClient")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::build_http_client;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn oauth_client(server: &MockServer) -> OAuthClient {
        let mut config = KickConfig::new("client-id", "client-secret", "http://localhost/cb");
        config.oauth_base_url = server.uri();
        OAuthClient::new(build_http_client(&config).unwrap(), &config)
    }

    #[tokio::test]
    async fn test_refresh_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=old-refresh"))
            .and(body_string_contains("client_secret=client-secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "new-access",
                "refresh_token": "new-refresh",
                "expires_in": 7200,
                "scope": "chat:write",
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let before = Utc::now();
        let credential = oauth_client(&server)
            .refresh_token("old-refresh")
            .await
            .unwrap();

        assert_eq!(credential.access_token, "new-access");
        assert_eq!(credential.refresh_token.as_deref(), Some("new-refresh"));
        assert_eq!(credential.scope.as_deref(), Some("chat:write"));
        let expires_at = credential.expires_at.unwrap();
        assert!(expires_at >= before + chrono::Duration::seconds(7200));
    }

    #[tokio::test]
    async fn test_code_exchange_sends_verifier() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=the-code"))
            .and(body_string_contains("code_verifier=the-verifier"))
            .and(body_string_contains("redirect_uri=http%3A%2F%2Flocalhost%2Fcb"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "a",
                "refresh_token": "r"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let credential = oauth_client(&server)
            .exchange_code("the-code", "the-verifier")
            .await
            .unwrap();
        assert_eq!(credential.access_token, "a");
        assert!(credential.expires_at.is_none());
    }

    #[tokio::test]
    async fn test_non_success_fails_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let err = oauth_client(&server).refresh("spent").await.unwrap_err();
        match err {
            KickError::TokenEndpoint { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "invalid_grant");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
