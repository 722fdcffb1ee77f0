//! Conversation document schema
//!
//! Every record derives serde with container-level defaults: the server is
//! free to omit fields in a create payload, and unknown fields in snapshots
//! (asset metadata this client does not use) are ignored.

use serde::{Deserialize, Serialize};

/// Root of the replica: the top-level assets collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    pub assets: Vec<Chat>,
}

impl Document {
    /// Document holding a single chat, as delivered by a snapshot.
    pub fn with_chat(chat: Chat) -> Self {
        Self { assets: vec![chat] }
    }

    pub fn chat(&self, id: &str) -> Option<&Chat> {
        self.assets.iter().find(|c| c.id == id)
    }

    pub fn chat_mut(&mut self, id: &str) -> Option<&mut Chat> {
        self.assets.iter_mut().find(|c| c.id == id)
    }

    /// Find a message anywhere in the document.
    pub fn find_message(&self, message_id: &str) -> Option<&Message> {
        self.assets
            .iter()
            .flat_map(|c| c.message_groups.iter())
            .flat_map(|g| g.messages.iter())
            .find(|m| m.id == message_id)
    }

    /// Find a tool call anywhere in the document.
    pub fn find_tool_call(&self, tool_call_id: &str) -> Option<&ToolCall> {
        self.assets
            .iter()
            .flat_map(|c| c.message_groups.iter())
            .flat_map(|g| g.messages.iter())
            .flat_map(|m| m.tool_calls.iter())
            .find(|t| t.id == tool_call_id)
    }
}

/// A conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Chat {
    pub id: String,
    pub name: String,
    pub last_modified: String,
    pub lock_id: Option<String>,
    pub title_edited: bool,
    pub chat_options: ChatOptions,
    pub message_groups: Vec<MessageGroup>,
    pub is_analysis_in_progress: bool,
}

impl Default for Chat {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: "New chat".to_string(),
            last_modified: String::new(),
            lock_id: None,
            title_edited: false,
            chat_options: ChatOptions::default(),
            message_groups: Vec::new(),
            is_analysis_in_progress: false,
        }
    }
}

impl Chat {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn message_group(&self, id: &str) -> Option<&MessageGroup> {
        self.message_groups.iter().find(|g| g.id == id)
    }

    /// All messages in conversation order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.message_groups.iter().flat_map(|g| g.messages.iter())
    }
}

/// Per-chat settings. Lives in a single-valued slot, not a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatOptions {
    pub agent_id: String,
    pub materials_ids: Vec<String>,
    pub ai_can_add_extra_materials: bool,
    pub draft_command: String,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            agent_id: String::new(),
            materials_ids: Vec::new(),
            ai_can_add_extra_materials: true,
            draft_command: String::new(),
        }
    }
}

/// Consecutive messages from one actor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageGroup {
    pub id: String,
    pub actor_id: ActorId,
    pub role: Role,
    pub task: String,
    pub materials_ids: Vec<String>,
    pub messages: Vec<Message>,
    pub analysis: String,
}

impl MessageGroup {
    pub fn new(id: impl Into<String>, actor_id: ActorId) -> Self {
        let role = match actor_id.kind {
            ActorKind::User => Role::User,
            ActorKind::Agent => Role::Assistant,
        };
        Self {
            id: id.into(),
            actor_id,
            role,
            ..Self::default()
        }
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }
}

/// Who authored a message group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorId {
    #[serde(rename = "type")]
    pub kind: ActorKind,
    pub id: String,
}

impl ActorId {
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            kind: ActorKind::User,
            id: id.into(),
        }
    }

    pub fn agent(id: impl Into<String>) -> Self {
        Self {
            kind: ActorKind::Agent,
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorKind {
    #[default]
    User,
    Agent,
}

/// Model-facing role of a message group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    System,
    Assistant,
    Tool,
}

/// A single message. `content` is markdown and may be streaming in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    pub id: String,
    pub timestamp: String,
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub is_streaming: bool,
}

impl Message {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn streaming(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_streaming: true,
            ..Self::default()
        }
    }

    pub fn tool_call(&self, id: &str) -> Option<&ToolCall> {
        self.tool_calls.iter().find(|t| t.id == id)
    }
}

/// Code the agent wants to run, and what came back
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolCall {
    pub id: String,
    pub language: Option<String>,
    pub code: String,
    pub headline: String,
    pub output: Option<String>,
    pub is_successful: bool,
    pub is_executing: bool,
    pub is_streaming: bool,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            ..Self::default()
        }
    }
}
