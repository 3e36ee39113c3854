//! Typed webhook payloads, keyed by `Kick-Event-Type`.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{KickError, Result};

/// Event type strings sent in `Kick-Event-Type`.
pub mod event_types {
    pub const CHAT_MESSAGE_SENT: &str = "chat.message.sent";
    pub const CHANNEL_FOLLOWED: &str = "channel.followed";
    pub const SUBSCRIPTION_RENEWAL: &str = "channel.subscription.renewal";
    pub const SUBSCRIPTION_GIFTS: &str = "channel.subscription.gifts";
    pub const SUBSCRIPTION_NEW: &str = "channel.subscription.new";
    pub const REWARD_REDEMPTION_UPDATED: &str = "channel.reward.redemption.updated";
    pub const LIVESTREAM_STATUS_UPDATED: &str = "livestream.status.updated";
    pub const LIVESTREAM_METADATA_UPDATED: &str = "livestream.metadata.updated";
    pub const MODERATION_BANNED: &str = "moderation.banned";
    pub const KICKS_GIFTED: &str = "kicks.gifted";

    /// Every event type with a typed payload.
    pub const ALL: &[&str] = &[
        CHAT_MESSAGE_SENT,
        CHANNEL_FOLLOWED,
        SUBSCRIPTION_RENEWAL,
        SUBSCRIPTION_GIFTS,
        SUBSCRIPTION_NEW,
        REWARD_REDEMPTION_UPDATED,
        LIVESTREAM_STATUS_UPDATED,
        LIVESTREAM_METADATA_UPDATED,
        MODERATION_BANNED,
        KICKS_GIFTED,
    ];
}

/// A Kick user as embedded in webhook payloads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventUser {
    pub is_anonymous: bool,
    pub user_id: Option<u64>,
    pub username: Option<String>,
    pub is_verified: Option<bool>,
    pub profile_picture: Option<String>,
    pub channel_slug: Option<String>,
    pub identity: Option<UserIdentity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserIdentity {
    pub username_color: Option<String>,
    pub badges: Vec<Badge>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Badge {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub count: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatMessageEvent {
    pub message_id: String,
    pub replies_to: Option<RepliedMessage>,
    pub broadcaster: EventUser,
    pub sender: EventUser,
    pub content: String,
    pub emotes: Vec<Emote>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepliedMessage {
    pub message_id: String,
    pub content: String,
    pub sender: EventUser,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Emote {
    pub emote_id: String,
    pub positions: Vec<EmotePosition>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotePosition {
    pub s: u32,
    pub e: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelFollowedEvent {
    pub broadcaster: EventUser,
    pub follower: EventUser,
}

/// Payload shared by `channel.subscription.new` and `channel.subscription.renewal`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionEvent {
    pub broadcaster: EventUser,
    pub subscriber: EventUser,
    /// Months subscribed.
    pub duration: u32,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionGiftsEvent {
    pub broadcaster: EventUser,
    pub gifter: EventUser,
    pub giftees: Vec<EventUser>,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardRedemptionEvent {
    pub id: String,
    pub user_input: Option<String>,
    pub status: String,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub reward: RedeemedReward,
    pub redeemer: EventUser,
    pub broadcaster: EventUser,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedeemedReward {
    pub id: String,
    pub title: String,
    pub cost: u64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LivestreamStatusEvent {
    pub broadcaster: EventUser,
    pub is_live: bool,
    pub title: String,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LivestreamMetadataEvent {
    pub broadcaster: EventUser,
    pub metadata: LivestreamMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LivestreamMetadata {
    pub title: String,
    pub language: Option<String>,
    pub has_mature_content: bool,
    pub category: Option<EventCategory>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventCategory {
    pub id: u64,
    pub name: String,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationBannedEvent {
    pub broadcaster: EventUser,
    pub moderator: EventUser,
    pub banned_user: EventUser,
    pub metadata: BanMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BanMetadata {
    pub reason: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    /// `None` for a permanent ban.
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KicksGiftedEvent {
    pub broadcaster: EventUser,
    pub sender: EventUser,
    pub gift: KicksGift,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KicksGift {
    pub amount: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub tier: Option<String>,
    pub message: Option<String>,
    pub pinned_time_seconds: Option<u64>,
}

/// A parsed webhook delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    ChatMessageSent(ChatMessageEvent),
    ChannelFollowed(ChannelFollowedEvent),
    SubscriptionRenewal(SubscriptionEvent),
    SubscriptionGifts(SubscriptionGiftsEvent),
    SubscriptionNew(SubscriptionEvent),
    RewardRedemptionUpdated(RewardRedemptionEvent),
    LivestreamStatusUpdated(LivestreamStatusEvent),
    LivestreamMetadataUpdated(LivestreamMetadataEvent),
    ModerationBanned(ModerationBannedEvent),
    KicksGifted(KicksGiftedEvent),
    /// An event type without a typed payload, or a payload that did not
    /// fit the typed model of its event type.
    Other { event_type: String, payload: Value },
}

impl WebhookEvent {
    /// Parse `raw_body` as the payload of `event_type`.
    ///
    /// Only a body that is not JSON at all is an error. A JSON payload that
    /// does not fit the typed model for its event type is kept raw as
    /// [`WebhookEvent::Other`].
    pub fn parse(event_type: &str, raw_body: &[u8]) -> Result<Self> {
        let payload: Value =
            serde_json::from_slice(raw_body).map_err(KickError::MalformedPayload)?;
        Ok(Self::from_value(event_type, payload))
    }

    fn from_value(event_type: &str, payload: Value) -> Self {
        use event_types::*;

        fn typed<T: DeserializeOwned>(payload: &Value) -> serde_json::Result<T> {
            T::deserialize(payload)
        }

        let decoded = match event_type {
            CHAT_MESSAGE_SENT => typed(&payload).map(Self::ChatMessageSent),
            CHANNEL_FOLLOWED => typed(&payload).map(Self::ChannelFollowed),
            SUBSCRIPTION_RENEWAL => typed(&payload).map(Self::SubscriptionRenewal),
            SUBSCRIPTION_GIFTS => typed(&payload).map(Self::SubscriptionGifts),
            SUBSCRIPTION_NEW => typed(&payload).map(Self::SubscriptionNew),
            REWARD_REDEMPTION_UPDATED => typed(&payload).map(Self::RewardRedemptionUpdated),
            LIVESTREAM_STATUS_UPDATED => typed(&payload).map(Self::LivestreamStatusUpdated),
            LIVESTREAM_METADATA_UPDATED => typed(&payload).map(Self::LivestreamMetadataUpdated),
            MODERATION_BANNED => typed(&payload).map(Self::ModerationBanned),
            KICKS_GIFTED => typed(&payload).map(Self::KicksGifted),
            _ => return Self::other(event_type, payload),
        };

        decoded.unwrap_or_else(|e| {
            warn!(
                event_type,
                error = %e,
                "Webhook payload does not match its typed model, keeping it raw"
            );
            Self::other(event_type, payload)
        })
    }

    fn other(event_type: &str, payload: Value) -> Self {
        Self::Other {
            event_type: event_type.to_string(),
            payload,
        }
    }

    /// The `Kick-Event-Type` this event was delivered as.
    pub fn event_type(&self) -> &str {
        use event_types::*;

        match self {
            Self::ChatMessageSent(_) => CHAT_MESSAGE_SENT,
            Self::ChannelFollowed(_) => CHANNEL_FOLLOWED,
            Self::SubscriptionRenewal(_) => SUBSCRIPTION_RENEWAL,
            Self::SubscriptionGifts(_) => SUBSCRIPTION_GIFTS,
            Self::SubscriptionNew(_) => SUBSCRIPTION_NEW,
            Self::RewardRedemptionUpdated(_) => REWARD_REDEMPTION_UPDATED,
            Self::LivestreamStatusUpdated(_) => LIVESTREAM_STATUS_UPDATED,
            Self::LivestreamMetadataUpdated(_) => LIVESTREAM_METADATA_UPDATED,
            Self::ModerationBanned(_) => MODERATION_BANNED,
            Self::KicksGifted(_) => KICKS_GIFTED,
            Self::Other { event_type, .. } => event_type,
        }
    }

    /// The broadcaster the event belongs to, when the payload names one.
    pub fn broadcaster(&self) -> Option<&EventUser> {
        match self {
            Self::ChatMessageSent(e) => Some(&e.broadcaster),
            Self::ChannelFollowed(e) => Some(&e.broadcaster),
            Self::SubscriptionRenewal(e) | Self::SubscriptionNew(e) => Some(&e.broadcaster),
            Self::SubscriptionGifts(e) => Some(&e.broadcaster),
            Self::RewardRedemptionUpdated(e) => Some(&e.broadcaster),
            Self::LivestreamStatusUpdated(e) => Some(&e.broadcaster),
            Self::LivestreamMetadataUpdated(e) => Some(&e.broadcaster),
            Self::ModerationBanned(e) => Some(&e.broadcaster),
            Self::KicksGifted(e) => Some(&e.broadcaster),
            Self::Other { .. } => None,
        }
    }
}
