use serde::Serialize;

use super::ApiResponse;
use crate::error::Result;
use crate::http::{ApiRequest, RestClient};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BanRequest {
    pub broadcaster_user_id: u64,
    pub user_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Timeout length in minutes; `None` bans permanently.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnbanRequest {
    pub broadcaster_user_id: u64,
    pub user_id: u64,
}

/// Bans and timeouts. Needs `moderation:ban`.
#[derive(Debug, Clone)]
pub struct ModerationApi {
    rest: RestClient,
}

const BANS: &str = "/public/v1/moderation/bans";

impl ModerationApi {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    /// Ban permanently.
    pub async fn ban(
        &self,
        broadcaster_user_id: u64,
        user_id: u64,
        reason: Option<&str>,
    ) -> Result<ApiResponse<serde_json::Value>> {
        self.post_ban(&BanRequest {
            broadcaster_user_id,
            user_id,
            reason: reason.map(str::to_string),
            duration: None,
        })
        .await
    }

    /// Time out for `duration_minutes`.
    pub async fn timeout(
        &self,
        broadcaster_user_id: u64,
        user_id: u64,
        duration_minutes: u32,
        reason: Option<&str>,
    ) -> Result<ApiResponse<serde_json::Value>> {
        self.post_ban(&BanRequest {
            broadcaster_user_id,
            user_id,
            reason: reason.map(str::to_string),
            duration: Some(duration_minutes),
        })
        .await
    }

    /// Lift a ban or an active timeout.
    pub async fn unban(
        &self,
        broadcaster_user_id: u64,
        user_id: u64,
    ) -> Result<ApiResponse<serde_json::Value>> {
        let request = ApiRequest::delete(BANS).json(&UnbanRequest {
            broadcaster_user_id,
            user_id,
        })?;
        self.rest.execute(request).await
    }

    async fn post_ban(&self, body: &BanRequest) -> Result<ApiResponse<serde_json::Value>> {
        self.rest.execute(ApiRequest::post(BANS).json(body)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::rest_client;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ok() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": {}, "message": "OK"}))
    }

    #[tokio::test]
    async fn test_ban_omits_duration() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(BANS))
            .and(body_json(serde_json::json!({
                "broadcaster_user_id": 1,
                "user_id": 2,
                "reason": "spam"
            })))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;

        let response = ModerationApi::new(rest_client(&server).await)
            .ban(1, 2, Some("spam"))
            .await
            .unwrap();
        assert_eq!(response.message, "OK");
    }

    #[tokio::test]
    async fn test_timeout_sends_minutes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(BANS))
            .and(body_json(serde_json::json!({
                "broadcaster_user_id": 1,
                "user_id": 2,
                "duration": 10
            })))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;

        ModerationApi::new(rest_client(&server).await)
            .timeout(1, 2, 10, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unban_uses_delete_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(BANS))
            .and(body_json(serde_json::json!({"broadcaster_user_id": 1, "user_id": 2})))
            .respond_with(ok())
            .expect(1)
            .mount(&server)
            .await;

        ModerationApi::new(rest_client(&server).await)
            .unban(1, 2)
            .await
            .unwrap();
    }
}
