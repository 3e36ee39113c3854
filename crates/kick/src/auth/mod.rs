//! OAuth credentials: token lifecycle, PKCE authorization and the callback endpoint.

pub mod callback;
pub mod credential;
pub mod flow;
pub mod manager;
pub mod oauth;
pub mod pkce;

pub use callback::{DEFAULT_CALLBACK_PATH, callback_router};
pub use credential::{Credential, TokenResponse};
pub use flow::AuthorizationFlow;
pub use manager::{
    CredentialManager, CredentialManagerBuilder, CredentialSink, RefreshState, TokenRefresher,
};
pub use oauth::OAuthClient;
pub use pkce::{AuthorizationRequest, Pkce, random_state};
