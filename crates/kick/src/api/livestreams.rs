use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ApiResponse;
use crate::error::Result;
use crate::http::{ApiRequest, RestClient};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Livestream {
    pub broadcaster_user_id: u64,
    pub channel_id: u64,
    pub slug: String,
    pub stream_title: String,
    pub viewer_count: u64,
    pub language: Option<String>,
    pub has_mature_content: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub thumbnail: Option<String>,
    pub profile_picture: Option<String>,
    pub custom_tags: Vec<String>,
    pub category: Option<LivestreamCategory>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LivestreamCategory {
    pub id: u64,
    pub name: String,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LivestreamSort {
    ViewerCount,
    StartedAt,
}

impl LivestreamSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewerCount => "viewer_count",
            Self::StartedAt => "started_at",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LivestreamsParams {
    pub broadcaster_user_ids: Vec<u64>,
    pub category_id: Option<u64>,
    pub language: Option<String>,
    pub limit: Option<u32>,
    pub sort: Option<LivestreamSort>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LivestreamStats {
    pub total_count: u64,
}

#[derive(Debug, Clone)]
pub struct LivestreamsApi {
    rest: RestClient,
}

impl LivestreamsApi {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    pub async fn get(&self, params: &LivestreamsParams) -> Result<ApiResponse<Vec<Livestream>>> {
        let request = ApiRequest::get("/public/v1/livestreams")
            .query_all("broadcaster_user_id", &params.broadcaster_user_ids)
            .query_opt("category_id", params.category_id)
            .query_opt("language", params.language.as_deref())
            .query_opt("limit", params.limit)
            .query_opt("sort", params.sort.map(|s| s.as_str()));
        self.rest.execute(request).await
    }

    pub async fn stats(&self) -> Result<ApiResponse<LivestreamStats>> {
        self.rest
            .execute(ApiRequest::get("/public/v1/livestreams/stats"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::rest_client;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_with_sort() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/public/v1/livestreams"))
            .and(query_param("sort", "viewer_count"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{
                    "broadcaster_user_id": 1,
                    "channel_id": 10,
                    "slug": "one",
                    "stream_title": "t",
                    "viewer_count": 1234,
                    "started_at": "2025-03-01T12:00:00Z",
                    "category": {"id": 2, "name": "Slots", "thumbnail": "x"}
                }],
                "message": "OK"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let params = LivestreamsParams {
            limit: Some(2),
            sort: Some(LivestreamSort::ViewerCount),
            ..LivestreamsParams::default()
        };
        let streams = LivestreamsApi::new(rest_client(&server).await)
            .get(&params)
            .await
            .unwrap()
            .data;
        assert_eq!(streams[0].viewer_count, 1234);
        assert!(streams[0].started_at.is_some());
    }

    #[tokio::test]
    async fn test_stats() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/public/v1/livestreams/stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"total_count": 77},
                "message": "OK"
            })))
            .mount(&server)
            .await;

        let stats = LivestreamsApi::new(rest_client(&server).await)
            .stats()
            .await
            .unwrap();
        assert_eq!(stats.data.total_count, 77);
    }
}
