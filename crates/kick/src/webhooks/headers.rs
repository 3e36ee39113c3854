use axum::http::HeaderMap;

use crate::error::{KickError, Result};

pub const MESSAGE_ID: &str = "kick-event-message-id";
pub const MESSAGE_TIMESTAMP: &str = "kick-event-message-timestamp";
pub const SIGNATURE: &str = "kick-event-signature";
pub const EVENT_TYPE: &str = "kick-event-type";
pub const EVENT_VERSION: &str = "kick-event-version";
pub const SUBSCRIPTION_ID: &str = "kick-event-subscription-id";

/// Transport headers of one webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookHeaders {
    pub message_id: String,
    pub timestamp: String,
    pub signature: String,
    pub event_type: String,
    pub event_version: Option<String>,
    pub subscription_id: Option<String>,
}

impl WebhookHeaders {
    /// Extract the headers, failing on the first required one that is absent or empty.
    pub fn from_header_map(headers: &HeaderMap) -> Result<Self> {
        let required =
            |name: &'static str| lookup(headers, name).ok_or(KickError::MissingHeaders(name));

        Ok(Self {
            message_id: required(MESSAGE_ID)?,
            timestamp: required(MESSAGE_TIMESTAMP)?,
            signature: required(SIGNATURE)?,
            event_type: required(EVENT_TYPE)?,
            event_version: lookup(headers, EVENT_VERSION),
            subscription_id: lookup(headers, SUBSCRIPTION_ID),
        })
    }
}

fn lookup(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use rstest::rstest;

    fn full_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(MESSAGE_ID, HeaderValue::from_static("01JABC"));
        headers.insert(MESSAGE_TIMESTAMP, HeaderValue::from_static("2025-01-01T00:00:00Z"));
        headers.insert(SIGNATURE, HeaderValue::from_static("c2ln"));
        headers.insert(EVENT_TYPE, HeaderValue::from_static("chat.message.sent"));
        headers.insert(EVENT_VERSION, HeaderValue::from_static("1"));
        headers
    }

    #[test]
    fn test_extracts_all_headers() {
        let parsed = WebhookHeaders::from_header_map(&full_headers()).unwrap();
        assert_eq!(parsed.message_id, "01JABC");
        assert_eq!(parsed.event_type, "chat.message.sent");
        assert_eq!(parsed.event_version.as_deref(), Some("1"));
        assert_eq!(parsed.subscription_id, None);
    }

    #[rstest]
    #[case(MESSAGE_ID)]
    #[case(MESSAGE_TIMESTAMP)]
    #[case(SIGNATURE)]
    #[case(EVENT_TYPE)]
    fn test_missing_required_header(#[case] name: &'static str) {
        let mut headers = full_headers();
        headers.remove(name);
        let err = WebhookHeaders::from_header_map(&headers).unwrap_err();
        assert!(matches!(err, KickError::MissingHeaders(missing) if missing == name));
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let mut headers = full_headers();
        headers.insert(SIGNATURE, HeaderValue::from_static(""));
        assert!(matches!(
            WebhookHeaders::from_header_map(&headers),
            Err(KickError::MissingHeaders(SIGNATURE))
        ));
    }
}
