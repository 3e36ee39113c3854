//! HTTP plumbing: client construction and the authenticated request executor.

use std::sync::OnceLock;

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::auth::CredentialManager;
use crate::config::KickConfig;
use crate::error::{FailureHint, KickError, Result};

const USER_AGENT: &str = concat!("kick-api/", env!("CARGO_PKG_VERSION"));

/// First try plus one retry after a forced refresh.
const MAX_ATTEMPTS: u32 = 2;

/// Longest response body kept in error values.
pub(crate) const MAX_ERROR_BODY: usize = 512;

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Build the `reqwest::Client` shared by the OAuth client and the executor.
pub fn build_http_client(config: &KickConfig) -> Result<reqwest::Client> {
    install_rustls_provider();

    let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
    if let Some(timeout) = config.request_timeout() {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// Cut `body` down to at most `max` bytes on a char boundary.
pub(crate) fn truncate_body(mut body: String, max: usize) -> String {
    if body.len() > max {
        let mut cut = max;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}

/// A single REST call, described independently of the token used to send it.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter. Repeated keys are kept.
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Append one `key=value` pair per item.
    pub fn query_all<I, V>(mut self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        self.query
            .extend(values.into_iter().map(|v| (key.to_string(), v.to_string())));
        self
    }

    /// Append a query parameter when `value` is present.
    pub fn query_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Add a caller header. Caller headers win over the default content type.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Serialize `body` as the JSON request body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = Some(Bytes::from(serde_json::to_vec(body)?));
        Ok(self)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }
}

/// Authenticated REST executor.
///
/// Every call carries `Authorization: Bearer <token>` from the attached
/// [`CredentialManager`]. A 401 triggers one forced refresh and one retry;
/// a second 401 is reported as [`KickError::AuthenticationRejected`].
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Option<CredentialManager>,
}

impl RestClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials: None,
        }
    }

    /// Attach the credential manager used to authorize requests.
    pub fn with_credentials(mut self, credentials: CredentialManager) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Execute `request` and decode the JSON response. An empty body decodes as `null`.
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let body = self.send(&request).await?;
        let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &body
        };
        Ok(serde_json::from_slice(body)?)
    }

    /// Execute `request` and discard the response body.
    pub async fn execute_no_content(&self, request: ApiRequest) -> Result<()> {
        self.send(&request).await.map(|_| ())
    }

    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    async fn send(&self, request: &ApiRequest) -> Result<Bytes> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(KickError::CredentialUninitialized)?;
        let url = format!("{}{}", self.base_url, request.path);

        let mut token = credentials.get_valid_access_token().await?;
        let mut attempt = 1;
        loop {
            let response = self.dispatch(&url, request, &token).await?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED {
                if attempt >= MAX_ATTEMPTS {
                    warn!("Request rejected again after token refresh");
                    return Err(KickError::AuthenticationRejected);
                }
                debug!(attempt, "Received 401, forcing token refresh");
                token = credentials.force_refresh().await?;
                attempt += 1;
                continue;
            }

            if !status.is_success() {
                let hint = FailureHint::for_status(status.as_u16());
                let body = truncate_body(response.text().await.unwrap_or_default(), MAX_ERROR_BODY);
                warn!(status = %status, %hint, "Kick API request failed");
                return Err(KickError::Transport {
                    status: status.as_u16(),
                    hint,
                    body,
                });
            }

            return Ok(response.bytes().await?);
        }
    }

    async fn dispatch(
        &self,
        url: &str,
        request: &ApiRequest,
        token: &str,
    ) -> Result<reqwest::Response> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.extend(request.headers.clone());

        let mut bearer = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
            KickError::InvalidRequest(format!("access token is not a valid header: {e}"))
        })?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .headers(headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        Ok(builder.send().await?)
    }
}
