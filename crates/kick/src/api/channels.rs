use serde::{Deserialize, Serialize};

use super::ApiResponse;
use crate::error::{KickError, Result};
use crate::http::{ApiRequest, RestClient};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Channel {
    pub broadcaster_user_id: u64,
    pub slug: String,
    pub channel_description: Option<String>,
    pub banner_picture: Option<String>,
    pub stream_title: String,
    pub category: Option<ChannelCategory>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelCategory {
    pub id: u64,
    pub name: String,
    pub thumbnail: Option<String>,
}

/// Channel lookup filter. Ids and slugs cannot be combined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetChannelsParams {
    pub broadcaster_user_ids: Vec<u64>,
    pub slugs: Vec<String>,
}

impl GetChannelsParams {
    pub fn by_ids(ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            broadcaster_user_ids: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn by_slugs<S: Into<String>>(slugs: impl IntoIterator<Item = S>) -> Self {
        Self {
            slugs: slugs.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// Livestream metadata update for the authorized channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_title: Option<String>,
}

/// Channel endpoints. Updating needs `channel:write`.
#[derive(Debug, Clone)]
pub struct ChannelsApi {
    rest: RestClient,
}

impl ChannelsApi {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    /// Look up channels. With no filter, returns the authorized channel.
    pub async fn get(&self, params: &GetChannelsParams) -> Result<ApiResponse<Vec<Channel>>> {
        if !params.broadcaster_user_ids.is_empty() && !params.slugs.is_empty() {
            return Err(KickError::InvalidRequest(
                "cannot mix broadcaster_user_id and slug".to_string(),
            ));
        }

        let request = ApiRequest::get("/public/v1/channels")
            .query_all("broadcaster_user_id", &params.broadcaster_user_ids)
            .query_all("slug", &params.slugs);
        self.rest.execute(request).await
    }

    pub async fn update(&self, update: &ChannelUpdate) -> Result<()> {
        let request = ApiRequest::patch("/public/v1/channels").json(update)?;
        self.rest.execute_no_content(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::rest_client;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_mixing_ids_and_slugs_is_rejected_locally() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let params = GetChannelsParams {
            broadcaster_user_ids: vec![1],
            slugs: vec!["a".to_string()],
        };
        let err = ChannelsApi::new(rest_client(&server).await)
            .get(&params)
            .await
            .unwrap_err();
        assert!(matches!(err, KickError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_get_by_slug() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/public/v1/channels"))
            .and(query_param("slug", "xqc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{
                    "broadcaster_user_id": 5,
                    "slug": "xqc",
                    "stream_title": "title",
                    "category": {"id": 15, "name": "Just Chatting"}
                }],
                "message": "OK"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let channels = ChannelsApi::new(rest_client(&server).await)
            .get(&GetChannelsParams::by_slugs(["xqc"]))
            .await
            .unwrap()
            .data;
        assert_eq!(channels[0].broadcaster_user_id, 5);
        assert_eq!(channels[0].category.as_ref().unwrap().name, "Just Chatting");
    }

    #[tokio::test]
    async fn test_update_sends_only_set_fields() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/public/v1/channels"))
            .and(body_json(serde_json::json!({"stream_title": "new title"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let update = ChannelUpdate {
            stream_title: Some("new title".to_string()),
            ..ChannelUpdate::default()
        };
        ChannelsApi::new(rest_client(&server).await)
            .update(&update)
            .await
            .unwrap();
    }
}
