use serde::{Deserialize, Serialize};

use super::PaginatedResponse;
use crate::error::Result;
use crate::http::{ApiRequest, RestClient};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    pub id: u64,
    pub name: String,
    pub thumbnail: Option<String>,
    pub tags: Vec<String>,
    pub viewer_count: Option<u64>,
}

/// Filters for the category search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetCategoriesParams {
    pub cursor: Option<String>,
    /// 1..=1000
    pub limit: Option<u32>,
    pub names: Vec<String>,
    pub tags: Vec<String>,
    pub ids: Vec<u64>,
}

#[derive(Debug, Clone)]
pub struct CategoriesApi {
    rest: RestClient,
}

impl CategoriesApi {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    pub async fn get(
        &self,
        params: &GetCategoriesParams,
    ) -> Result<PaginatedResponse<Vec<Category>>> {
        let request = ApiRequest::get("/public/v2/categories")
            .query_opt("cursor", params.cursor.as_deref())
            .query_opt("limit", params.limit)
            .query_all("name", &params.names)
            .query_all("tags", &params.tags)
            .query_all("id", &params.ids);
        self.rest.execute(request).await
    }
}
