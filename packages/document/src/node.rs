//! Typed field access for document records
//!
//! Mutations name fields by string key. Each record maps the keys it owns
//! onto its typed fields here, so a key that is not part of the schema, or a
//! value of the wrong shape, is refused instead of silently stored.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::model::{ActorId, Chat, ChatOptions, Message, MessageGroup, ToolCall};
use crate::FieldError;

/// Record kinds of the closed schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Chat,
    ChatOptions,
    MessageGroup,
    ActorId,
    Message,
    ToolCall,
}

impl NodeKind {
    /// Object type name used on the wire by create mutations.
    pub fn type_name(self) -> &'static str {
        match self {
            NodeKind::Document => "Document",
            NodeKind::Chat => "AICChat",
            NodeKind::ChatOptions => "AICChatOptions",
            NodeKind::MessageGroup => "AICMessageGroup",
            NodeKind::ActorId => "AICActorId",
            NodeKind::Message => "AICMessage",
            NodeKind::ToolCall => "AICToolCall",
        }
    }

    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "AICChat" => Some(NodeKind::Chat),
            "AICChatOptions" => Some(NodeKind::ChatOptions),
            "AICMessageGroup" => Some(NodeKind::MessageGroup),
            "AICActorId" => Some(NodeKind::ActorId),
            "AICMessage" => Some(NodeKind::Message),
            "AICToolCall" => Some(NodeKind::ToolCall),
            _ => None,
        }
    }
}

/// A document record whose scalar fields can be written by key.
pub trait Node: Clone + Serialize + DeserializeOwned {
    const KIND: NodeKind;

    /// Overwrite one field. Null clears optional fields.
    fn set_field(&mut self, key: &str, value: Value) -> Result<(), FieldError>;

    /// Concatenate onto a string field. An absent optional string counts as empty.
    fn append_to_field(&mut self, key: &str, delta: &str) -> Result<(), FieldError>;

    /// Shallow field union, incoming fields win. All-or-nothing.
    fn merge_fields(&mut self, fields: &Map<String, Value>) -> Result<(), FieldError> {
        let mut staged = self.clone();
        for (key, value) in fields {
            staged.set_field(key, value.clone())?;
        }
        *self = staged;
        Ok(())
    }
}

/// A record that lives in an ordered collection and is found by id.
pub trait Element: Node {
    fn id(&self) -> &str;
}

fn parse<T: DeserializeOwned>(kind: NodeKind, key: &str, value: Value) -> Result<T, FieldError> {
    serde_json::from_value(value).map_err(|e| FieldError::InvalidValue {
        kind,
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn unknown(kind: NodeKind, key: &str) -> FieldError {
    FieldError::UnknownField {
        kind,
        key: key.to_string(),
    }
}

fn not_a_string(kind: NodeKind, key: &str) -> FieldError {
    FieldError::NotAString {
        kind,
        key: key.to_string(),
    }
}

fn collection(kind: NodeKind, key: &str) -> FieldError {
    FieldError::Collection {
        kind,
        key: key.to_string(),
    }
}

fn append_optional(field: &mut Option<String>, delta: &str) {
    field.get_or_insert_with(String::new).push_str(delta);
}

impl Node for Chat {
    const KIND: NodeKind = NodeKind::Chat;

    fn set_field(&mut self, key: &str, value: Value) -> Result<(), FieldError> {
        let kind = Self::KIND;
        match key {
            "id" => self.id = parse(kind, key, value)?,
            "name" => self.name = parse(kind, key, value)?,
            "last_modified" => self.last_modified = parse(kind, key, value)?,
            "lock_id" => self.lock_id = parse(kind, key, value)?,
            "title_edited" => self.title_edited = parse(kind, key, value)?,
            "chat_options" => self.chat_options = parse(kind, key, value)?,
            "is_analysis_in_progress" => self.is_analysis_in_progress = parse(kind, key, value)?,
            "message_groups" => return Err(collection(kind, key)),
            _ => return Err(unknown(kind, key)),
        }
        Ok(())
    }

    fn append_to_field(&mut self, key: &str, delta: &str) -> Result<(), FieldError> {
        match key {
            "id" => self.id.push_str(delta),
            "name" => self.name.push_str(delta),
            "last_modified" => self.last_modified.push_str(delta),
            "lock_id" => append_optional(&mut self.lock_id, delta),
            "title_edited" | "chat_options" | "is_analysis_in_progress" | "message_groups" => {
                return Err(not_a_string(Self::KIND, key))
            }
            _ => return Err(unknown(Self::KIND, key)),
        }
        Ok(())
    }
}

impl Element for Chat {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Node for ChatOptions {
    const KIND: NodeKind = NodeKind::ChatOptions;

    fn set_field(&mut self, key: &str, value: Value) -> Result<(), FieldError> {
        let kind = Self::KIND;
        match key {
            "agent_id" => self.agent_id = parse(kind, key, value)?,
            "materials_ids" => self.materials_ids = parse(kind, key, value)?,
            "ai_can_add_extra_materials" => {
                self.ai_can_add_extra_materials = parse(kind, key, value)?
            }
            "draft_command" => self.draft_command = parse(kind, key, value)?,
            _ => return Err(unknown(kind, key)),
        }
        Ok(())
    }

    fn append_to_field(&mut self, key: &str, delta: &str) -> Result<(), FieldError> {
        match key {
            "agent_id" => self.agent_id.push_str(delta),
            "draft_command" => self.draft_command.push_str(delta),
            "materials_ids" | "ai_can_add_extra_materials" => {
                return Err(not_a_string(Self::KIND, key))
            }
            _ => return Err(unknown(Self::KIND, key)),
        }
        Ok(())
    }
}

impl Node for MessageGroup {
    const KIND: NodeKind = NodeKind::MessageGroup;

    fn set_field(&mut self, key: &str, value: Value) -> Result<(), FieldError> {
        let kind = Self::KIND;
        match key {
            "id" => self.id = parse(kind, key, value)?,
            "actor_id" => self.actor_id = parse(kind, key, value)?,
            "role" => self.role = parse(kind, key, value)?,
            "task" => self.task = parse(kind, key, value)?,
            "materials_ids" => self.materials_ids = parse(kind, key, value)?,
            "analysis" => self.analysis = parse(kind, key, value)?,
            "messages" => return Err(collection(kind, key)),
            _ => return Err(unknown(kind, key)),
        }
        Ok(())
    }

    fn append_to_field(&mut self, key: &str, delta: &str) -> Result<(), FieldError> {
        match key {
            "id" => self.id.push_str(delta),
            "task" => self.task.push_str(delta),
            "analysis" => self.analysis.push_str(delta),
            "actor_id" | "role" | "materials_ids" | "messages" => {
                return Err(not_a_string(Self::KIND, key))
            }
            _ => return Err(unknown(Self::KIND, key)),
        }
        Ok(())
    }
}

impl Element for MessageGroup {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Node for ActorId {
    const KIND: NodeKind = NodeKind::ActorId;

    fn set_field(&mut self, key: &str, value: Value) -> Result<(), FieldError> {
        let kind = Self::KIND;
        match key {
            "type" => self.kind = parse(kind, key, value)?,
            "id" => self.id = parse(kind, key, value)?,
            _ => return Err(unknown(kind, key)),
        }
        Ok(())
    }

    fn append_to_field(&mut self, key: &str, delta: &str) -> Result<(), FieldError> {
        match key {
            "id" => self.id.push_str(delta),
            "type" => return Err(not_a_string(Self::KIND, key)),
            _ => return Err(unknown(Self::KIND, key)),
        }
        Ok(())
    }
}

impl Node for Message {
    const KIND: NodeKind = NodeKind::Message;

    fn set_field(&mut self, key: &str, value: Value) -> Result<(), FieldError> {
        let kind = Self::KIND;
        match key {
            "id" => self.id = parse(kind, key, value)?,
            "timestamp" => self.timestamp = parse(kind, key, value)?,
            "content" => self.content = parse(kind, key, value)?,
            "is_streaming" => self.is_streaming = parse(kind, key, value)?,
            "tool_calls" => return Err(collection(kind, key)),
            _ => return Err(unknown(kind, key)),
        }
        Ok(())
    }

    fn append_to_field(&mut self, key: &str, delta: &str) -> Result<(), FieldError> {
        match key {
            "id" => self.id.push_str(delta),
            "timestamp" => self.timestamp.push_str(delta),
            "content" => self.content.push_str(delta),
            "is_streaming" | "tool_calls" => return Err(not_a_string(Self::KIND, key)),
            _ => return Err(unknown(Self::KIND, key)),
        }
        Ok(())
    }
}

impl Element for Message {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Node for ToolCall {
    const KIND: NodeKind = NodeKind::ToolCall;

    fn set_field(&mut self, key: &str, value: Value) -> Result<(), FieldError> {
        let kind = Self::KIND;
        match key {
            "id" => self.id = parse(kind, key, value)?,
            "language" => self.language = parse(kind, key, value)?,
            "code" => self.code = parse(kind, key, value)?,
            "headline" => self.headline = parse(kind, key, value)?,
            "output" => self.output = parse(kind, key, value)?,
            "is_successful" => self.is_successful = parse(kind, key, value)?,
            "is_executing" => self.is_executing = parse(kind, key, value)?,
            "is_streaming" => self.is_streaming = parse(kind, key, value)?,
            _ => return Err(unknown(kind, key)),
        }
        Ok(())
    }

    fn append_to_field(&mut self, key: &str, delta: &str) -> Result<(), FieldError> {
        match key {
            "id" => self.id.push_str(delta),
            "language" => append_optional(&mut self.language, delta),
            "code" => self.code.push_str(delta),
            "headline" => self.headline.push_str(delta),
            "output" => append_optional(&mut self.output, delta),
            "is_successful" | "is_executing" | "is_streaming" => {
                return Err(not_a_string(Self::KIND, key))
            }
            _ => return Err(unknown(Self::KIND, key)),
        }
        Ok(())
    }
}

impl Element for ToolCall {
    fn id(&self) -> &str {
        &self.id
    }
}
