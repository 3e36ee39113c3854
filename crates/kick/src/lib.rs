//! kick-api: client library for the Kick public API.
//!
//! ## Credentials
//!
//! - [`CredentialManager`] - Owns the current OAuth credential and refreshes it single-flight
//! - [`OAuthClient`] - Token endpoint client (authorization code + refresh grants)
//! - [`AuthorizationFlow`] - PKCE authorization with a local callback endpoint
//!
//! ## REST
//!
//! - [`RestClient`] - Authenticated executor with one refresh-and-retry on 401
//! - [`api`] - Typed wrappers (chat, users, channels, rewards, ...)
//! - [`KickClient`] - Facade bundling all of the above
//!
//! ## Webhooks
//!
//! - [`WebhookVerifier`] - RSA/SHA-256 signature check against Kick's published key
//! - [`EventDispatcher`] - Verify, parse and fan out deliveries to [`WebhookHandler`]s
//! - [`webhooks::webhook_router`] - axum endpoint mapping outcomes to HTTP statuses

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod webhooks;

pub use auth::{
    AuthorizationFlow, Credential, CredentialManager, CredentialSink, OAuthClient, TokenRefresher,
};
pub use client::{KickClient, KickClientBuilder};
pub use config::{KickConfig, WebhookConfig};
pub use error::{BoxError, FailureHint, KickError, Result};
pub use http::{ApiRequest, RestClient};
pub use webhooks::{
    EventDispatcher, WebhookEvent, WebhookHandler, WebhookHeaders, WebhookVerifier, handler_fn,
};
