use serde::{Deserialize, Serialize};

use super::ApiResponse;
use crate::error::Result;
use crate::http::{ApiRequest, RestClient};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub user_id: u64,
    pub name: String,
    pub profile_picture: Option<String>,
    /// Only present for the authorized user with `user:read`.
    pub email: Option<String>,
}

/// User lookup. Needs `user:read`.
#[derive(Debug, Clone)]
pub struct UsersApi {
    rest: RestClient,
}

impl UsersApi {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    /// Look up users by id. An empty list returns the authorized user.
    pub async fn get(&self, ids: &[u64]) -> Result<ApiResponse<Vec<User>>> {
        let request = ApiRequest::get("/public/v1/users").query_all("id", ids);
        self.rest.execute(request).await
    }

    /// The authorized user.
    pub async fn me(&self) -> Result<Option<User>> {
        Ok(self.get(&[]).await?.data.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::rest_client;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_by_ids() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/public/v1/users"))
            .and(query_param("id", "1"))
            .and(query_param("id", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"user_id": 1, "name": "a"},
                    {"user_id": 2, "name": "b", "profile_picture": "https://x/p.png"}
                ],
                "message": "OK"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let users = UsersApi::new(rest_client(&server).await)
            .get(&[1, 2])
            .await
            .unwrap()
            .data;
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].name, "b");
    }

    #[tokio::test]
    async fn test_me() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/public/v1/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"user_id": 9, "name": "me", "email": "me@example.com"}],
                "message": "OK"
            })))
            .mount(&server)
            .await;

        let me = UsersApi::new(rest_client(&server).await)
            .me()
            .await
            .unwrap()
            .unwrap();
        assert_eq!(me.user_id, 9);
        assert_eq!(me.email.as_deref(), Some("me@example.com"));
    }
}
