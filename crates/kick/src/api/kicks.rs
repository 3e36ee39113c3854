use serde::{Deserialize, Serialize};

use super::ApiResponse;
use crate::error::Result;
use crate::http::{ApiRequest, RestClient};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardEntry {
    pub gifted_amount: u64,
    pub rank: u32,
    pub user_id: u64,
    pub username: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Leaderboard {
    pub lifetime: Vec<LeaderboardEntry>,
    pub month: Vec<LeaderboardEntry>,
    pub week: Vec<LeaderboardEntry>,
}

/// KICKs endpoints. Needs `kicks:read`.
#[derive(Debug, Clone)]
pub struct KicksApi {
    rest: RestClient,
}

impl KicksApi {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    /// Gifting leaderboard for the authorized broadcaster, optionally capped at `top` entries.
    pub async fn leaderboard(&self, top: Option<u32>) -> Result<ApiResponse<Leaderboard>> {
        let request = ApiRequest::get("/public/v1/kicks/leaderboard").query_opt("top", top);
        self.rest.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::rest_client;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_leaderboard() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/public/v1/kicks/leaderboard"))
            .and(query_param("top", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "lifetime": [
                        {"gifted_amount": 500, "rank": 1, "user_id": 4, "username": "big"}
                    ],
                    "month": [],
                    "week": []
                },
                "message": "OK"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let board = KicksApi::new(rest_client(&server).await)
            .leaderboard(Some(3))
            .await
            .unwrap()
            .data;
        assert_eq!(board.lifetime[0].username, "big");
        assert!(board.week.is_empty());
    }
}
