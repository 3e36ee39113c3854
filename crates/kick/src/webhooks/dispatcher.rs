//! Verified webhook dispatch.
//!
//! [`EventDispatcher::handle`] runs the fixed pipeline
//! headers -> signature -> parse -> handlers. Nothing is parsed or dispatched
//! unless the signature verified.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::HeaderMap;
use futures::future::join_all;
use tracing::{debug, error, instrument, warn};

use super::event::WebhookEvent;
use super::headers::WebhookHeaders;
use super::verify::{SignatureVerifier, WebhookVerifier};
use crate::error::{BoxError, KickError, Result};

/// Something that can receive verified webhook events.
#[async_trait]
pub trait WebhookHandler: Send + Sync {
    async fn handle(
        &self,
        event: &WebhookEvent,
        headers: &WebhookHeaders,
    ) -> std::result::Result<(), BoxError>;
}

/// Adapter returned by [`handler_fn`].
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> WebhookHandler for FnHandler<F>
where
    F: Fn(WebhookEvent, WebhookHeaders) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<(), BoxError>> + Send + 'static,
{
    async fn handle(
        &self,
        event: &WebhookEvent,
        headers: &WebhookHeaders,
    ) -> std::result::Result<(), BoxError> {
        (self.0)(event.clone(), headers.clone()).await
    }
}

/// Wrap an async closure as a handler.
pub fn handler_fn<F, Fut>(f: F) -> Arc<FnHandler<F>>
where
    F: Fn(WebhookEvent, WebhookHeaders) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<(), BoxError>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// Event type -> handlers. A handler registered twice for one type runs once.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Vec<Arc<dyn WebhookHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `event_type`.
    pub fn on(&mut self, event_type: impl Into<String>, handler: Arc<dyn WebhookHandler>) {
        let handlers = self.handlers.entry(event_type.into()).or_default();
        if !handlers.iter().any(|h| Arc::ptr_eq(h, &handler)) {
            handlers.push(handler);
        }
    }

    /// Handlers registered for `event_type`.
    pub fn handlers_for(&self, event_type: &str) -> &[Arc<dyn WebhookHandler>] {
        self.handlers
            .get(event_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Event types with at least one handler.
    pub fn event_types(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.handlers.iter().map(|(k, v)| (k, v.len())))
            .finish()
    }
}

/// Result of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub message_id: String,
    pub event_type: String,
    pub handlers_invoked: usize,
}

/// Builder for [`EventDispatcher`].
#[derive(Default)]
pub struct EventDispatcherBuilder {
    verifier: Option<Arc<dyn SignatureVerifier>>,
    registry: HandlerRegistry,
}

impl EventDispatcherBuilder {
    /// Use `verifier` instead of Kick's published key.
    pub fn verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn on(mut self, event_type: impl Into<String>, handler: Arc<dyn WebhookHandler>) -> Self {
        self.registry.on(event_type, handler);
        self
    }

    pub fn registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn build(self) -> Result<EventDispatcher> {
        let verifier = match self.verifier {
            Some(verifier) => verifier,
            None => Arc::new(WebhookVerifier::kick()?),
        };
        Ok(EventDispatcher {
            verifier,
            registry: self.registry,
        })
    }
}

/// Verifies, parses and fans out webhook deliveries.
///
/// The registry is fixed once built; share the dispatcher behind an `Arc`.
pub struct EventDispatcher {
    verifier: Arc<dyn SignatureVerifier>,
    registry: HandlerRegistry,
}

impl EventDispatcher {
    pub fn builder() -> EventDispatcherBuilder {
        EventDispatcherBuilder::default()
    }

    pub fn new(verifier: Arc<dyn SignatureVerifier>, registry: HandlerRegistry) -> Self {
        Self { verifier, registry }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Handle one delivery.
    ///
    /// Every handler registered for the event type runs concurrently and all
    /// of them are awaited before this returns. Unregistered event types are
    /// acknowledged with zero invocations.
    #[instrument(skip_all)]
    pub async fn handle(&self, raw_body: &[u8], headers: &HeaderMap) -> Result<DispatchOutcome> {
        let headers = WebhookHeaders::from_header_map(headers)?;

        let verified = self.verifier.verify(
            &headers.message_id,
            &headers.timestamp,
            raw_body,
            &headers.signature,
        )?;
        if !verified {
            warn!(message_id = %headers.message_id, "Webhook signature rejected");
            return Err(KickError::SignatureInvalid);
        }

        let event = WebhookEvent::parse(&headers.event_type, raw_body)?;
        let handlers = self.registry.handlers_for(&headers.event_type);

        let outcome = DispatchOutcome {
            message_id: headers.message_id.clone(),
            event_type: headers.event_type.clone(),
            handlers_invoked: handlers.len(),
        };
        if handlers.is_empty() {
            debug!(event_type = %headers.event_type, "No handlers registered; acknowledging");
            return Ok(outcome);
        }

        debug!(
            event_type = %headers.event_type,
            handlers = handlers.len(),
            "Dispatching webhook"
        );
        let results = join_all(handlers.iter().map(|h| h.handle(&event, &headers))).await;

        let mut first_error = None;
        for err in results.into_iter().filter_map(std::result::Result::err) {
            error!(
                event_type = %headers.event_type,
                message_id = %headers.message_id,
                error = %err,
                "Webhook handler failed"
            );
            first_error.get_or_insert(err);
        }
        if let Some(err) = first_error {
            return Err(KickError::HandlerError(err));
        }

        Ok(outcome)
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
