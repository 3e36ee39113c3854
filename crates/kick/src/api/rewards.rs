//! Channel points rewards and their redemptions.
//!
//! Reading needs `channel:rewards:read`, everything else
//! `channel:rewards:write`. Only the app that created a reward may change it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ApiResponse, PaginatedResponse};
use crate::error::{KickError, Result};
use crate::http::{ApiRequest, RestClient};

/// Most redemption ids accepted by one accept/reject call.
pub const MAX_REDEMPTION_IDS: usize = 25;

const REWARDS: &str = "/public/v1/channels/rewards";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub title: String,
    pub cost: u64,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_paused: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_user_input_required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub should_redemptions_skip_request_queue: Option<bool>,
}

impl Reward {
    /// A new reward to pass to [`RewardsApi::create`].
    pub fn new(title: impl Into<String>, cost: u64, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            cost,
            description: description.into(),
            ..Self::default()
        }
    }
}

/// Partial update; unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RewardUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_paused: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_user_input_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub should_redemptions_skip_request_queue: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedemptionStatus {
    Pending,
    Fulfilled,
    Canceled,
}

impl RedemptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fulfilled => "fulfilled",
            Self::Canceled => "canceled",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetRedemptionsParams {
    pub reward_id: Option<String>,
    pub status: Option<RedemptionStatus>,
    pub ids: Vec<String>,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Redeemer {
    pub user_id: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Redemption {
    pub id: String,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub redeemer: Redeemer,
    pub status: String,
    pub user_input: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RedeemedRewardInfo {
    pub id: String,
    pub title: String,
    pub cost: u64,
    pub description: String,
    pub can_manage: bool,
    pub is_deleted: bool,
}

/// Redemptions grouped under the reward they belong to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RedemptionGroup {
    pub redemptions: Vec<Redemption>,
    pub reward: RedeemedRewardInfo,
}

/// Per-id failure reported by accept/reject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RedemptionAction {
    pub id: String,
    pub reason: String,
}

#[derive(Serialize)]
struct RedemptionIds<'a> {
    ids: &'a [String],
}

#[derive(Debug, Clone)]
pub struct RewardsApi {
    rest: RestClient,
}

impl RewardsApi {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    /// All rewards of the authorized broadcaster.
    pub async fn list(&self) -> Result<ApiResponse<Vec<Reward>>> {
        self.rest.execute(ApiRequest::get(REWARDS)).await
    }

    pub async fn create(&self, reward: &Reward) -> Result<ApiResponse<Reward>> {
        self.rest
            .execute(ApiRequest::post(REWARDS).json(reward)?)
            .await
    }

    pub async fn update(&self, id: &str, update: &RewardUpdate) -> Result<ApiResponse<Reward>> {
        let request = ApiRequest::patch(reward_path(id)).json(update)?;
        self.rest.execute(request).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.rest
            .execute_no_content(ApiRequest::delete(reward_path(id)))
            .await
    }

    pub async fn redemptions(
        &self,
        params: &GetRedemptionsParams,
    ) -> Result<PaginatedResponse<Vec<RedemptionGroup>>> {
        let request = ApiRequest::get(format!("{REWARDS}/redemptions"))
            .query_opt("reward_id", params.reward_id.as_deref())
            .query_opt("status", params.status.map(|s| s.as_str()))
            .query_opt("cursor", params.cursor.as_deref())
            .query_all("id", &params.ids);
        self.rest.execute(request).await
    }

    /// Accept up to [`MAX_REDEMPTION_IDS`] pending redemptions.
    pub async fn accept(&self, ids: &[String]) -> Result<ApiResponse<Vec<RedemptionAction>>> {
        self.act_on_redemptions("accept", ids).await
    }

    /// Reject (and refund) up to [`MAX_REDEMPTION_IDS`] pending redemptions.
    pub async fn reject(&self, ids: &[String]) -> Result<ApiResponse<Vec<RedemptionAction>>> {
        self.act_on_redemptions("reject", ids).await
    }

    async fn act_on_redemptions(
        &self,
        action: &str,
        ids: &[String],
    ) -> Result<ApiResponse<Vec<RedemptionAction>>> {
        if ids.is_empty() || ids.len() > MAX_REDEMPTION_IDS {
            return Err(KickError::InvalidRequest(format!(
                "{action} takes 1 to {MAX_REDEMPTION_IDS} redemption ids, got {}",
                ids.len()
            )));
        }
        let request = ApiRequest::post(format!("{REWARDS}/redemptions/{action}"))
            .json(&RedemptionIds { ids })?;
        self.rest.execute(request).await
    }
}

fn reward_path(id: &str) -> String {
    format!("{REWARDS}/{}", urlencoding::encode(id))
}
