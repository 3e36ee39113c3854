//! HTTP endpoint receiving Kick webhook deliveries.

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::dispatcher::EventDispatcher;
use crate::error::{KickError, Result};

/// Error response for a rejected delivery.
///
/// Missing headers, bad signatures and undecodable signatures share one
/// status and body so a caller cannot tell which check failed.
struct WebhookRejection {
    status: StatusCode,
    message: &'static str,
}

impl From<KickError> for WebhookRejection {
    fn from(err: KickError) -> Self {
        if err.is_webhook_rejection() {
            warn!(error = %err, "Rejected webhook delivery");
            return Self {
                status: StatusCode::UNAUTHORIZED,
                message: "Unauthorized",
            };
        }
        match err {
            KickError::MalformedPayload(e) => {
                warn!(error = %e, "Webhook payload could not be parsed");
                Self {
                    status: StatusCode::BAD_REQUEST,
                    message: "Bad Request",
                }
            }
            other => {
                error!(error = %other, "Webhook handling failed");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "Internal Server Error",
                }
            }
        }
    }
}

impl IntoResponse for WebhookRejection {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

/// Build a router accepting `POST <path>` deliveries for `dispatcher`.
pub fn webhook_router(dispatcher: Arc<EventDispatcher>, path: &str) -> Router {
    Router::new()
        .route(path, post(receive_webhook))
        .with_state(dispatcher)
}

async fn receive_webhook(
    State(dispatcher): State<Arc<EventDispatcher>>,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<&'static str, WebhookRejection> {
    let outcome = dispatcher.handle(&body, &headers).await?;
    debug!(
        message_id = %outcome.message_id,
        event_type = %outcome.event_type,
        handlers = outcome.handlers_invoked,
        "Webhook delivered"
    );
    Ok("OK")
}

/// Serve `router` on `listener` until `cancel` fires.
pub async fn serve(listener: TcpListener, router: Router, cancel: CancellationToken) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Webhook server listening on http://{}", addr);
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
            info!("Webhook server shutting down...");
        })
        .await?;
    Ok(())
}
