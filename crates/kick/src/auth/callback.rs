//! Local HTTP endpoint receiving the OAuth redirect.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use serde::Deserialize;
use tracing::error;

use super::flow::AuthorizationFlow;
use crate::error::KickError;

/// Default path for the OAuth callback.
pub const DEFAULT_CALLBACK_PATH: &str = "/callback";

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
}

/// Build a router that finishes `flow` when the OAuth redirect hits `path`.
pub fn callback_router(flow: Arc<AuthorizationFlow>, path: &str) -> Router {
    Router::new()
        .route(path, get(oauth_callback))
        .with_state(flow)
}

async fn oauth_callback(
    State(flow): State<Arc<AuthorizationFlow>>,
    Query(query): Query<CallbackQuery>,
) -> impl IntoResponse {
    let (Some(code), Some(state)) = (query.code, query.state) else {
        error!("Invalid OAuth callback: missing code or state");
        return (StatusCode::BAD_REQUEST, "Invalid OAuth callback");
    };

    match flow.complete(&code, &state).await {
        Ok(_) => (
            StatusCode::OK,
            "Authorization success, you can close this tab.",
        ),
        Err(KickError::InvalidState(reason)) => {
            error!(%reason, "Invalid OAuth callback");
            (StatusCode::BAD_REQUEST, "Invalid OAuth callback")
        }
        Err(e) => {
            error!(error = %e, "OAuth exchange failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Authorization failed")
        }
    }
}
