//! Webhook event subscriptions. Subscribing needs `events:subscribe`.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ApiResponse;
use crate::error::{KickError, Result};
use crate::http::{ApiRequest, RestClient};

const SUBSCRIPTIONS: &str = "/public/v1/events/subscriptions";

fn default_version() -> u32 {
    1
}

/// An event to have Kick push to the app's webhook URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSubscription {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: u32,
}

impl EventSubscription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }
}

/// Parses `name` or `name:version`.
impl FromStr for EventSubscription {
    type Err = KickError;

    fn from_str(s: &str) -> Result<Self> {
        let (name, version) = match s.split_once(':') {
            Some((name, version)) => {
                let version = version.parse().map_err(|_| {
                    KickError::InvalidRequest(format!("invalid event version in '{s}'"))
                })?;
                (name, version)
            }
            None => (s, default_version()),
        };
        if name.is_empty() {
            return Err(KickError::InvalidRequest("empty event name".to_string()));
        }
        Ok(Self::new(name).with_version(version))
    }
}

#[derive(Serialize)]
struct SubscribeBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    broadcaster_user_id: Option<u64>,
    events: &'a [EventSubscription],
    method: &'static str,
}

/// Per-event result of a subscribe call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SubscriptionResult {
    pub name: String,
    pub version: u32,
    pub subscription_id: Option<String>,
    pub error: Option<String>,
}

/// An active subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SubscriptionInfo {
    pub id: String,
    pub app_id: String,
    pub broadcaster_user_id: u64,
    pub event: String,
    pub version: u32,
    pub method: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct EventsApi {
    rest: RestClient,
}

impl EventsApi {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    /// Subscribe the authorized broadcaster (or `broadcaster_user_id`, for app tokens)
    /// to `events`, delivered by webhook.
    pub async fn subscribe(
        &self,
        events: &[EventSubscription],
        broadcaster_user_id: Option<u64>,
    ) -> Result<ApiResponse<Vec<SubscriptionResult>>> {
        if events.is_empty() {
            return Err(KickError::InvalidRequest(
                "no events to subscribe to".to_string(),
            ));
        }
        let request = ApiRequest::post(SUBSCRIPTIONS).json(&SubscribeBody {
            broadcaster_user_id,
            events,
            method: "webhook",
        })?;
        self.rest.execute(request).await
    }

    pub async fn list(
        &self,
        broadcaster_user_id: Option<u64>,
    ) -> Result<ApiResponse<Vec<SubscriptionInfo>>> {
        let request =
            ApiRequest::get(SUBSCRIPTIONS).query_opt("broadcaster_user_id", broadcaster_user_id);
        self.rest.execute(request).await
    }

    pub async fn unsubscribe(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let request = ApiRequest::delete(SUBSCRIPTIONS).query_all("id", ids);
        self.rest.execute_no_content(request).await
    }
}
