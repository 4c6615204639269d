/// Typed wrappers over the conversation/message REST endpoints
///
/// Auth is a bearer `Authorization` header on every call, same credential
/// the socket upgrade carries.
use crate::error::Result;
use crate::types::{Conversation, Message};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    bearer_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GetOrCreateRequest<'a> {
    listing_id: i64,
    sender_id: &'a str,
    receiver_id: &'a str,
}

#[derive(Serialize)]
struct UserIdRequest<'a> {
    id: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    messages: Vec<Message>,
}

impl RestClient {
    pub fn new(base_url: &str, bearer_token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer_token: bearer_token.to_string(),
        }
    }

    /// Idempotent creation/lookup of the conversation for one listing and
    /// counterparty pairing
    pub async fn get_or_create_conversation(
        &self,
        listing_id: i64,
        sender_id: &str,
        receiver_id: &str,
    ) -> Result<Conversation> {
        let url = format!("{}/api/conversations/get-or-create", self.base_url);
        debug!("POST {}", url);
        let conversation = self
            .http
            .post(&url)
            .bearer_auth(&self.bearer_token)
            .json(&GetOrCreateRequest {
                listing_id,
                sender_id,
                receiver_id,
            })
            .send()
            .await?
            .error_for_status()?
            .json::<Conversation>()
            .await?;
        Ok(conversation)
    }

    /// All conversations the user participates in
    pub async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>> {
        let url = format!("{}/api/conversations", self.base_url);
        debug!("POST {}", url);
        let conversations = self
            .http
            .post(&url)
            .bearer_auth(&self.bearer_token)
            .json(&UserIdRequest { id: user_id })
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Conversation>>()
            .await?;
        Ok(conversations)
    }

    /// Full message history of one conversation
    pub async fn fetch_messages(&self, conversation_id: i64, user_id: &str) -> Result<Vec<Message>> {
        let url = format!("{}/api/messages/{}", self.base_url, conversation_id);
        debug!("POST {}", url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.bearer_token)
            .json(&UserIdRequest { id: user_id })
            .send()
            .await?
            .error_for_status()?
            .json::<MessagesResponse>()
            .await?;
        Ok(response.messages)
    }
}
