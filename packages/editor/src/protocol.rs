//! Wire messages exchanged with the chat server
//!
//! Every message is a JSON object tagged by `type`.

use convo_document::Chat;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mutations::Mutation;

/// Server → client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Full snapshot of a chat, sent in answer to an open request.
    #[serde(rename = "ChatOpenedServerMessage")]
    ChatOpened { chat: Chat },

    /// One change to a chat. `request_id` is set when the change was
    /// requested by a client.
    #[serde(rename = "NotifyAboutChatMutationServerMessage")]
    NotifyAboutChatMutation {
        #[serde(default)]
        request_id: Option<String>,
        mutation: Mutation,
    },

    #[serde(rename = "ResponseServerMessage")]
    Response {
        request_id: String,
        #[serde(default)]
        payload: Value,
        #[serde(default)]
        is_error: bool,
    },

    #[serde(rename = "ErrorServerMessage")]
    Error { error: String },

    #[serde(rename = "NotificationServerMessage")]
    Notification {
        #[serde(default)]
        title: String,
        #[serde(default)]
        message: String,
    },

    /// Any message type this client does not handle.
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::ChatOpened { .. } => "ChatOpenedServerMessage",
            ServerMessage::NotifyAboutChatMutation { .. } => "NotifyAboutChatMutationServerMessage",
            ServerMessage::Response { .. } => "ResponseServerMessage",
            ServerMessage::Error { .. } => "ErrorServerMessage",
            ServerMessage::Notification { .. } => "NotificationServerMessage",
            ServerMessage::Unknown => "Unknown",
        }
    }
}

/// Client → server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Subscribe to a chat. Answered with a snapshot.
    #[serde(rename = "OpenChatClientMessage")]
    OpenChat { chat_id: String, request_id: String },

    #[serde(rename = "CloseChatClientMessage")]
    CloseChat { chat_id: String, request_id: String },

    /// Ask the agent to stop generating.
    #[serde(rename = "StopChatClientMessage")]
    StopChat { chat_id: String, request_id: String },

    #[serde(rename = "DoMutationClientMessage")]
    DoMutation {
        request_id: String,
        mutation: Mutation,
    },
}

impl ClientMessage {
    pub fn request_id(&self) -> &str {
        match self {
            ClientMessage::OpenChat { request_id, .. }
            | ClientMessage::CloseChat { request_id, .. }
            | ClientMessage::StopChat { request_id, .. }
            | ClientMessage::DoMutation { request_id, .. } => request_id,
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
