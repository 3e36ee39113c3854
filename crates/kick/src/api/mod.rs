//! Typed wrappers over the Kick public REST API.
//!
//! Each wrapper is a thin, cheap-to-clone view over a shared
//! [`RestClient`](crate::http::RestClient); one method is one request.

use serde::{Deserialize, Serialize};

pub mod categories;
pub mod channels;
pub mod chat;
pub mod events;
pub mod kicks;
pub mod livestreams;
pub mod moderation;
pub mod rewards;
pub mod users;

pub use categories::{CategoriesApi, Category, GetCategoriesParams};
pub use channels::{Channel, ChannelCategory, ChannelUpdate, ChannelsApi, GetChannelsParams};
pub use chat::{ChatApi, ChatMessage, MessageType, SentMessage};
pub use events::{EventSubscription, EventsApi, SubscriptionInfo, SubscriptionResult};
pub use kicks::{KicksApi, Leaderboard, LeaderboardEntry};
pub use livestreams::{
    Livestream, LivestreamCategory, LivestreamSort, LivestreamStats, LivestreamsApi,
    LivestreamsParams,
};
pub use moderation::{BanRequest, ModerationApi, UnbanRequest};
pub use rewards::{
    GetRedemptionsParams, Redemption, RedemptionAction, RedemptionGroup, RedemptionStatus, Reward,
    RewardUpdate, RewardsApi,
};
pub use users::{User, UsersApi};

/// Standard Kick response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
    #[serde(default)]
    pub message: String,
}

/// Cursor block returned by paginated endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub next_cursor: Option<String>,
}

/// Envelope for paginated responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: T,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub pagination: Pagination,
}
