//! Signed webhook deliveries: verification, typed events and dispatch.

pub mod dispatcher;
pub mod event;
pub mod headers;
pub mod server;
pub mod verify;

pub use dispatcher::{
    DispatchOutcome, EventDispatcher, EventDispatcherBuilder, FnHandler, HandlerRegistry,
    WebhookHandler, handler_fn,
};
pub use event::{WebhookEvent, event_types};
pub use headers::WebhookHeaders;
pub use server::{serve, webhook_router};
pub use verify::{KICK_WEBHOOK_PUBLIC_KEY_PEM, SignatureVerifier, WebhookVerifier, signed_payload};
