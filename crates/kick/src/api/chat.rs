use serde::{Deserialize, Serialize};

use super::ApiResponse;
use crate::error::Result;
use crate::http::{ApiRequest, RestClient};

/// Who a chat message is sent as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// The bot account tied to the app. Sent to the authorized broadcaster's chat.
    #[default]
    Bot,
    /// The authorized user. Needs `broadcaster_user_id`.
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broadcaster_user_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<String>,
}

impl ChatMessage {
    /// A message sent as the bot.
    pub fn bot(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            kind: MessageType::Bot,
            broadcaster_user_id: None,
            reply_to_message_id: None,
        }
    }

    /// A message sent as the authorized user to `broadcaster_user_id`'s chat.
    pub fn user(content: impl Into<String>, broadcaster_user_id: u64) -> Self {
        Self {
            content: content.into(),
            kind: MessageType::User,
            broadcaster_user_id: Some(broadcaster_user_id),
            reply_to_message_id: None,
        }
    }

    pub fn reply_to(mut self, message_id: impl Into<String>) -> Self {
        self.reply_to_message_id = Some(message_id.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SentMessage {
    pub is_sent: bool,
    pub message_id: String,
}

/// Chat endpoints. Sending needs `chat:write`; deleting needs
/// `moderation:chat_message:manage`.
#[derive(Debug, Clone)]
pub struct ChatApi {
    rest: RestClient,
}

impl ChatApi {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    pub async fn send(&self, message: &ChatMessage) -> Result<ApiResponse<SentMessage>> {
        let request = ApiRequest::post("/public/v1/chat").json(message)?;
        self.rest.execute(request).await
    }

    pub async fn delete(&self, message_id: &str) -> Result<()> {
        let path = format!("/public/v1/chat/{}", urlencoding::encode(message_id));
        self.rest.execute_no_content(ApiRequest::delete(path)).await
    }
}
