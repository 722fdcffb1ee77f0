//! Address resolution
//!
//! [`resolve`] walks a ref's segment path two segments at a time: the first of
//! each pair names a collection (or slot) on the current node, the second
//! selects an element in it by id. Slots are entered directly and their id
//! segment is ignored.
//!
//! The final pair is not entered. The caller gets the *container* the ref
//! points into, so create can append to it and delete can remove from it;
//! operations on the existing element select it with [`Target::element_mut`].
//!
//! Nothing is ever fabricated. A missing element or an unknown collection name
//! is a [`ResolveError`]: the server referenced structure this replica does not
//! have.

use serde_json::{Map, Value};

use crate::model::{ActorId, Chat, ChatOptions, Document, Message, MessageGroup, ToolCall};
use crate::node::{Element, Node, NodeKind};
use crate::refs::{ObjectRef, SegmentPath, ROOT_COLLECTION};
use crate::{FieldError, ResolveError};

/// Mutable handle to one record of the document
#[derive(Debug)]
pub enum NodeMut<'a> {
    Document(&'a mut Document),
    Chat(&'a mut Chat),
    ChatOptions(&'a mut ChatOptions),
    MessageGroup(&'a mut MessageGroup),
    ActorId(&'a mut ActorId),
    Message(&'a mut Message),
    ToolCall(&'a mut ToolCall),
}

/// Mutable handle to a collection or single-valued slot
#[derive(Debug)]
pub enum ContainerMut<'a> {
    Chats(&'a mut Vec<Chat>),
    MessageGroups(&'a mut Vec<MessageGroup>),
    Messages(&'a mut Vec<Message>),
    ToolCalls(&'a mut Vec<ToolCall>),
    ChatOptions(&'a mut ChatOptions),
    ActorId(&'a mut ActorId),
}

/// An element taken out of a collection by delete
#[derive(Debug, Clone, PartialEq)]
pub enum Detached {
    Chat(Chat),
    MessageGroup(MessageGroup),
    Message(Message),
    ToolCall(ToolCall),
}

impl Detached {
    /// Ids of every message inside the detached subtree.
    pub fn message_ids(&self) -> Vec<String> {
        match self {
            Detached::Chat(chat) => chat.messages().map(|m| m.id.clone()).collect(),
            Detached::MessageGroup(group) => group.messages.iter().map(|m| m.id.clone()).collect(),
            Detached::Message(message) => vec![message.id.clone()],
            Detached::ToolCall(_) => Vec::new(),
        }
    }
}

impl<'a> NodeMut<'a> {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeMut::Document(_) => NodeKind::Document,
            NodeMut::Chat(_) => NodeKind::Chat,
            NodeMut::ChatOptions(_) => NodeKind::ChatOptions,
            NodeMut::MessageGroup(_) => NodeKind::MessageGroup,
            NodeMut::ActorId(_) => NodeKind::ActorId,
            NodeMut::Message(_) => NodeKind::Message,
            NodeMut::ToolCall(_) => NodeKind::ToolCall,
        }
    }

    /// Id of a collection element. Slots and the root have none.
    pub fn id(&self) -> Option<&str> {
        match self {
            NodeMut::Chat(chat) => Some(&chat.id),
            NodeMut::MessageGroup(group) => Some(&group.id),
            NodeMut::Message(message) => Some(&message.id),
            NodeMut::ToolCall(tool_call) => Some(&tool_call.id),
            NodeMut::Document(_) | NodeMut::ChatOptions(_) | NodeMut::ActorId(_) => None,
        }
    }

    /// Enter the collection or slot `name` of this node.
    pub fn into_container(self, name: &str) -> Result<ContainerMut<'a>, ResolveError> {
        match (self, name) {
            (NodeMut::Document(doc), ROOT_COLLECTION) => Ok(ContainerMut::Chats(&mut doc.assets)),
            (NodeMut::Chat(chat), "message_groups") => {
                Ok(ContainerMut::MessageGroups(&mut chat.message_groups))
            }
            (NodeMut::Chat(chat), "chat_options") => {
                Ok(ContainerMut::ChatOptions(&mut chat.chat_options))
            }
            (NodeMut::MessageGroup(group), "messages") => {
                Ok(ContainerMut::Messages(&mut group.messages))
            }
            (NodeMut::MessageGroup(group), "actor_id") => {
                Ok(ContainerMut::ActorId(&mut group.actor_id))
            }
            (NodeMut::Message(message), "tool_calls") => {
                Ok(ContainerMut::ToolCalls(&mut message.tool_calls))
            }
            (node, collection) => Err(ResolveError::UnknownCollection {
                parent: node.kind(),
                collection: collection.to_string(),
            }),
        }
    }

    pub fn set_field(&mut self, key: &str, value: Value) -> Result<(), FieldError> {
        match self {
            NodeMut::Document(_) => Err(FieldError::UnknownField {
                kind: NodeKind::Document,
                key: key.to_string(),
            }),
            NodeMut::Chat(node) => node.set_field(key, value),
            NodeMut::ChatOptions(node) => node.set_field(key, value),
            NodeMut::MessageGroup(node) => node.set_field(key, value),
            NodeMut::ActorId(node) => node.set_field(key, value),
            NodeMut::Message(node) => node.set_field(key, value),
            NodeMut::ToolCall(node) => node.set_field(key, value),
        }
    }

    pub fn append_to_field(&mut self, key: &str, delta: &str) -> Result<(), FieldError> {
        match self {
            NodeMut::Document(_) => Err(FieldError::UnknownField {
                kind: NodeKind::Document,
                key: key.to_string(),
            }),
            NodeMut::Chat(node) => node.append_to_field(key, delta),
            NodeMut::ChatOptions(node) => node.append_to_field(key, delta),
            NodeMut::MessageGroup(node) => node.append_to_field(key, delta),
            NodeMut::ActorId(node) => node.append_to_field(key, delta),
            NodeMut::Message(node) => node.append_to_field(key, delta),
            NodeMut::ToolCall(node) => node.append_to_field(key, delta),
        }
    }
}

fn find_mut<'a, T: Element>(list: &'a mut [T], id: &str) -> Option<&'a mut T> {
    list.iter_mut().find(|item| item.id() == id)
}

fn remove_by_id<T: Element>(list: &mut Vec<T>, id: &str) -> Option<T> {
    let index = list.iter().position(|item| item.id() == id)?;
    Some(list.remove(index))
}

/// Deserialize a create payload, naming it `id` when it carries no id.
fn build<T: Element>(mut object: Map<String, Value>, id: &str) -> Result<T, FieldError> {
    if !object.contains_key("id") {
        object.insert("id".to_string(), Value::String(id.to_string()));
    }
    serde_json::from_value(Value::Object(object)).map_err(|e| FieldError::InvalidValue {
        kind: T::KIND,
        key: "<object>".to_string(),
        reason: e.to_string(),
    })
}

impl<'a> ContainerMut<'a> {
    /// Collection name as it appears in segment paths.
    pub fn name(&self) -> &'static str {
        match self {
            ContainerMut::Chats(_) => ROOT_COLLECTION,
            ContainerMut::MessageGroups(_) => "message_groups",
            ContainerMut::Messages(_) => "messages",
            ContainerMut::ToolCalls(_) => "tool_calls",
            ContainerMut::ChatOptions(_) => "chat_options",
            ContainerMut::ActorId(_) => "actor_id",
        }
    }

    /// Record kind held by this container.
    pub fn element_kind(&self) -> NodeKind {
        match self {
            ContainerMut::Chats(_) => NodeKind::Chat,
            ContainerMut::MessageGroups(_) => NodeKind::MessageGroup,
            ContainerMut::Messages(_) => NodeKind::Message,
            ContainerMut::ToolCalls(_) => NodeKind::ToolCall,
            ContainerMut::ChatOptions(_) => NodeKind::ChatOptions,
            ContainerMut::ActorId(_) => NodeKind::ActorId,
        }
    }

    /// Ordered collection, as opposed to a single-valued slot.
    pub fn is_sequence(&self) -> bool {
        !matches!(self, ContainerMut::ChatOptions(_) | ContainerMut::ActorId(_))
    }

    /// Element count. A slot always holds exactly one record.
    pub fn len(&self) -> usize {
        match self {
            ContainerMut::Chats(list) => list.len(),
            ContainerMut::MessageGroups(list) => list.len(),
            ContainerMut::Messages(list) => list.len(),
            ContainerMut::ToolCalls(list) => list.len(),
            ContainerMut::ChatOptions(_) | ContainerMut::ActorId(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Select element `id`, consuming the handle. Slots ignore the id.
    pub fn into_element(self, id: &str) -> Result<NodeMut<'a>, ResolveError> {
        let collection = self.name();
        let found = match self {
            ContainerMut::Chats(list) => find_mut(list, id).map(NodeMut::Chat),
            ContainerMut::MessageGroups(list) => find_mut(list, id).map(NodeMut::MessageGroup),
            ContainerMut::Messages(list) => find_mut(list, id).map(NodeMut::Message),
            ContainerMut::ToolCalls(list) => find_mut(list, id).map(NodeMut::ToolCall),
            ContainerMut::ChatOptions(options) => Some(NodeMut::ChatOptions(options)),
            ContainerMut::ActorId(actor) => Some(NodeMut::ActorId(actor)),
        };
        found.ok_or_else(|| ResolveError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        })
    }

    /// Borrow element `id`. Slots ignore the id.
    pub fn element_mut(&mut self, id: &str) -> Option<NodeMut<'_>> {
        match self {
            ContainerMut::Chats(list) => find_mut(list, id).map(NodeMut::Chat),
            ContainerMut::MessageGroups(list) => find_mut(list, id).map(NodeMut::MessageGroup),
            ContainerMut::Messages(list) => find_mut(list, id).map(NodeMut::Message),
            ContainerMut::ToolCalls(list) => find_mut(list, id).map(NodeMut::ToolCall),
            ContainerMut::ChatOptions(options) => Some(NodeMut::ChatOptions(&mut **options)),
            ContainerMut::ActorId(actor) => Some(NodeMut::ActorId(&mut **actor)),
        }
    }

    /// Append a new element built from `object`, or merge it into a slot.
    ///
    /// An object without an `id` is named `default_id`. Slot merges are a
    /// shallow field union where incoming fields win.
    pub fn insert_object(
        &mut self,
        object: Map<String, Value>,
        default_id: &str,
    ) -> Result<(), FieldError> {
        match self {
            ContainerMut::Chats(list) => list.push(build(object, default_id)?),
            ContainerMut::MessageGroups(list) => list.push(build(object, default_id)?),
            ContainerMut::Messages(list) => list.push(build(object, default_id)?),
            ContainerMut::ToolCalls(list) => list.push(build(object, default_id)?),
            ContainerMut::ChatOptions(options) => options.merge_fields(&object)?,
            ContainerMut::ActorId(actor) => actor.merge_fields(&object)?,
        }
        Ok(())
    }

    /// Remove element `id`. Absent ids and slots are a no-op.
    pub fn remove(&mut self, id: &str) -> Option<Detached> {
        match self {
            ContainerMut::Chats(list) => remove_by_id(list, id).map(Detached::Chat),
            ContainerMut::MessageGroups(list) => {
                remove_by_id(list, id).map(Detached::MessageGroup)
            }
            ContainerMut::Messages(list) => remove_by_id(list, id).map(Detached::Message),
            ContainerMut::ToolCalls(list) => remove_by_id(list, id).map(Detached::ToolCall),
            ContainerMut::ChatOptions(_) | ContainerMut::ActorId(_) => None,
        }
    }
}

/// Result of [`resolve`]: the container a ref points into
#[derive(Debug)]
pub struct Target<'a> {
    pub container: ContainerMut<'a>,
    /// The ref's own id, to be looked up inside `container`.
    pub id: String,
    walked: SegmentPath,
}

impl<'a> Target<'a> {
    /// Path re-derived from the nodes actually visited, ending in the ref id.
    pub fn path(&self) -> SegmentPath {
        let mut path = self.walked.clone();
        path.push(self.container.name(), self.id.as_str());
        path
    }

    /// Path of the node owning the container.
    pub fn owner_path(&self) -> &SegmentPath {
        &self.walked
    }

    /// The existing element the ref names, if present.
    pub fn element_mut(&mut self) -> Option<NodeMut<'_>> {
        self.container.element_mut(&self.id)
    }

    pub fn into_element(self) -> Result<NodeMut<'a>, ResolveError> {
        self.container.into_element(&self.id)
    }
}

/// Locate the container `target` points into.
pub fn resolve<'a>(doc: &'a mut Document, target: &ObjectRef) -> Result<Target<'a>, ResolveError> {
    let path = target.segments();
    if !path.is_well_formed() {
        return Err(ResolveError::MalformedPath(path));
    }

    let pairs: Vec<(&str, &str)> = path.pairs().collect();
    let (&(last_collection, last_id), intermediate) = pairs
        .split_last()
        .ok_or_else(|| ResolveError::MalformedPath(path.clone()))?;

    let mut node = NodeMut::Document(doc);
    let mut walked = SegmentPath::default();

    for &(collection, id) in intermediate {
        let container = node.into_container(collection)?;
        let name = container.name();
        node = container.into_element(id)?;
        walked.push(name, node.id().unwrap_or(id));
    }

    let container = node.into_container(last_collection)?;
    tracing::trace!(path = %path, container = container.name(), "resolved ref");

    Ok(Target {
        container,
        id: last_id.to_string(),
        walked,
    })
}

/// Shared handle to one record of the document
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeRef<'a> {
    Document(&'a Document),
    Chat(&'a Chat),
    ChatOptions(&'a ChatOptions),
    MessageGroup(&'a MessageGroup),
    ActorId(&'a ActorId),
    Message(&'a Message),
    ToolCall(&'a ToolCall),
}

impl<'a> NodeRef<'a> {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeRef::Document(_) => NodeKind::Document,
            NodeRef::Chat(_) => NodeKind::Chat,
            NodeRef::ChatOptions(_) => NodeKind::ChatOptions,
            NodeRef::MessageGroup(_) => NodeKind::MessageGroup,
            NodeRef::ActorId(_) => NodeKind::ActorId,
            NodeRef::Message(_) => NodeKind::Message,
            NodeRef::ToolCall(_) => NodeKind::ToolCall,
        }
    }

    fn child(self, collection: &str, id: &str) -> Result<NodeRef<'a>, ResolveError> {
        let not_found = || ResolveError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        };
        match (self, collection) {
            (NodeRef::Document(doc), ROOT_COLLECTION) => {
                doc.chat(id).map(NodeRef::Chat).ok_or_else(not_found)
            }
            (NodeRef::Chat(chat), "message_groups") => chat
                .message_group(id)
                .map(NodeRef::MessageGroup)
                .ok_or_else(not_found),
            (NodeRef::Chat(chat), "chat_options") => Ok(NodeRef::ChatOptions(&chat.chat_options)),
            (NodeRef::MessageGroup(group), "messages") => {
                group.message(id).map(NodeRef::Message).ok_or_else(not_found)
            }
            (NodeRef::MessageGroup(group), "actor_id") => Ok(NodeRef::ActorId(&group.actor_id)),
            (NodeRef::Message(message), "tool_calls") => message
                .tool_call(id)
                .map(NodeRef::ToolCall)
                .ok_or_else(not_found),
            (node, collection) => Err(ResolveError::UnknownCollection {
                parent: node.kind(),
                collection: collection.to_string(),
            }),
        }
    }
}

/// Read-only lookup of the element a ref names.
pub fn lookup<'a>(doc: &'a Document, target: &ObjectRef) -> Result<NodeRef<'a>, ResolveError> {
    let path = target.segments();
    if !path.is_well_formed() {
        return Err(ResolveError::MalformedPath(path));
    }

    let mut node = NodeRef::Document(doc);
    for (collection, id) in path.pairs() {
        node = node.child(collection, id)?;
    }
    Ok(node)
}
