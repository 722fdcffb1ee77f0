//! # Document Mutations
//!
//! The four changes a server can make to a replicated chat.
//!
//! ## Mutation Semantics
//!
//! ### Create
//! - Appends to the ref's collection, or merges into a single-valued slot
//! - `object_type` must name the record kind the collection holds
//! - An id the collection already holds is rejected
//!
//! ### Delete
//! - Removes the element and everything below it
//! - Deleting an absent element is a no-op
//!
//! ### SetValue
//! - Atomic replacement of one field
//! - Writing `is_streaming` false on a streaming message finalizes it
//!
//! ### AppendToString
//! - Appends to a string field
//! - Deltas to the content of a streaming message pass through its buffer
//!
//! A ref that cannot be resolved is a [`MutationError::Desync`]. Any other
//! error leaves the document exactly as it was.

use convo_document::{
    resolve, ContainerMut, Document, Node, NodeKind, NodeMut, ObjectRef, ResolveError,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::MutationError;
use crate::events::ReplicaEvent;
use crate::streams::Streams;

/// A server-side change to the document, as it appears on the wire
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Mutation {
    /// Insert a new record into a collection or slot
    #[serde(rename = "CreateMutation")]
    Create {
        #[serde(rename = "ref")]
        target: ObjectRef,
        object_type: String,
        object: Map<String, Value>,
    },

    /// Remove a record
    #[serde(rename = "DeleteMutation")]
    Delete {
        #[serde(rename = "ref")]
        target: ObjectRef,
    },

    /// Replace one field of a record
    #[serde(rename = "SetValueMutation")]
    SetValue {
        #[serde(rename = "ref")]
        target: ObjectRef,
        key: String,
        #[serde(default)]
        value: Value,
    },

    /// Append to a string field of a record
    #[serde(rename = "AppendToStringMutation")]
    AppendToString {
        #[serde(rename = "ref")]
        target: ObjectRef,
        key: String,
        value: String,
    },
}

impl Mutation {
    pub fn create(target: ObjectRef, kind: NodeKind, object: Value) -> Result<Self, MutationError> {
        match object {
            Value::Object(object) => Ok(Mutation::Create {
                target,
                object_type: kind.type_name().to_string(),
                object,
            }),
            other => Err(MutationError::Malformed(format!(
                "create payload must be an object, got {other}"
            ))),
        }
    }

    pub fn delete(target: ObjectRef) -> Self {
        Mutation::Delete { target }
    }

    pub fn set_value(target: ObjectRef, key: impl Into<String>, value: Value) -> Self {
        Mutation::SetValue {
            target,
            key: key.into(),
            value,
        }
    }

    pub fn append(target: ObjectRef, key: impl Into<String>, value: impl Into<String>) -> Self {
        Mutation::AppendToString {
            target,
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn target(&self) -> &ObjectRef {
        match self {
            Mutation::Create { target, .. }
            | Mutation::Delete { target }
            | Mutation::SetValue { target, .. }
            | Mutation::AppendToString { target, .. } => target,
        }
    }

    /// Wire name of the mutation kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::Create { .. } => "CreateMutation",
            Mutation::Delete { .. } => "DeleteMutation",
            Mutation::SetValue { .. } => "SetValueMutation",
            Mutation::AppendToString { .. } => "AppendToStringMutation",
        }
    }

    /// Apply to `doc`, routing streaming content through `streams`.
    pub fn apply(
        &self,
        doc: &mut Document,
        streams: &mut Streams,
    ) -> Result<Vec<ReplicaEvent>, MutationError> {
        match self {
            Mutation::Create {
                target,
                object_type,
                object,
            } => Self::apply_create(doc, streams, target, object_type, object),

            Mutation::Delete { target } => Self::apply_delete(doc, streams, target),

            Mutation::SetValue { target, key, value } => {
                Self::apply_set_value(doc, streams, target, key, value)
            }

            Mutation::AppendToString { target, key, value } => {
                Self::apply_append(doc, streams, target, key, value)
            }
        }
    }

    fn apply_create(
        doc: &mut Document,
        streams: &mut Streams,
        target: &ObjectRef,
        object_type: &str,
        object: &Map<String, Value>,
    ) -> Result<Vec<ReplicaEvent>, MutationError> {
        let mut resolved = resolve(doc, target)?;

        let expected = resolved.container.element_kind();
        if NodeKind::from_type_name(object_type) != Some(expected) {
            return Err(MutationError::ObjectTypeMismatch {
                expected: expected.type_name(),
                found: object_type.to_string(),
            });
        }

        if resolved.container.is_sequence() {
            let id = object
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or(resolved.id.as_str());
            if resolved.container.element_mut(id).is_some() {
                return Err(MutationError::Malformed(format!(
                    "{} already holds {id}",
                    resolved.path()
                )));
            }
        }

        resolved.container.insert_object(object.clone(), &resolved.id)?;

        if expected != NodeKind::Message {
            return Ok(Vec::new());
        }

        // The payload may carry its own id; the last message is the new one.
        let mut events = Vec::new();
        if let ContainerMut::Messages(messages) = &mut resolved.container {
            if let Some(message) = messages.last_mut() {
                events.extend(streams.on_created(message));
            }
        }
        Ok(events)
    }

    fn apply_delete(
        doc: &mut Document,
        streams: &mut Streams,
        target: &ObjectRef,
    ) -> Result<Vec<ReplicaEvent>, MutationError> {
        let mut resolved = resolve(doc, target)?;

        match resolved.container.remove(&resolved.id) {
            Some(detached) => streams.forget(detached.message_ids()),
            None => tracing::debug!(path = %target, "delete of absent element ignored"),
        }
        Ok(Vec::new())
    }

    fn apply_set_value(
        doc: &mut Document,
        streams: &mut Streams,
        target: &ObjectRef,
        key: &str,
        value: &Value,
    ) -> Result<Vec<ReplicaEvent>, MutationError> {
        let mut resolved = resolve(doc, target)?;
        let collection = resolved.container.name();
        let element = resolved
            .element_mut()
            .ok_or_else(|| not_found(collection, &target.id))?;

        let mut events = Vec::new();
        match element {
            NodeMut::Message(message) => {
                let was_streaming = message.is_streaming;
                message.set_field(key, value.clone())?;

                match key {
                    "content" => events.extend(streams.on_content_replaced(message)),
                    "is_streaming" => {
                        events.extend(streams.on_streaming_changed(message, was_streaming))
                    }
                    _ => {}
                }
            }
            mut other => other.set_field(key, value.clone())?,
        }
        Ok(events)
    }

    fn apply_append(
        doc: &mut Document,
        streams: &mut Streams,
        target: &ObjectRef,
        key: &str,
        delta: &str,
    ) -> Result<Vec<ReplicaEvent>, MutationError> {
        let mut resolved = resolve(doc, target)?;
        let collection = resolved.container.name();
        let element = resolved
            .element_mut()
            .ok_or_else(|| not_found(collection, &target.id))?;

        match element {
            NodeMut::Message(message) if key == "content" && message.is_streaming => {
                Ok(streams.on_append(message, delta).into_iter().collect())
            }
            mut other => {
                other.append_to_field(key, delta)?;
                Ok(Vec::new())
            }
        }
    }
}

fn not_found(collection: &str, id: &str) -> MutationError {
    MutationError::Desync(ResolveError::NotFound {
        collection: collection.to_string(),
        id: id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_tags() {
        let mutation: Mutation = serde_json::from_value(json!({
            "type": "AppendToStringMutation",
            "ref": { "id": "m1", "parent_collection": null },
            "key": "content",
            "value": "abc"
        }))
        .unwrap();

        assert_eq!(mutation.kind(), "AppendToStringMutation");
        assert_eq!(mutation, Mutation::append(ObjectRef::new("m1"), "content", "abc"));
    }

    #[test]
    fn test_set_value_defaults_to_null() {
        let mutation: Mutation = serde_json::from_value(json!({
            "type": "SetValueMutation",
            "ref": { "id": "t1" },
            "key": "output"
        }))
        .unwrap();

        match mutation {
            Mutation::SetValue { value, .. } => assert!(value.is_null()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let result: Result<Mutation, _> = serde_json::from_value(json!({
            "type": "MoveMutation",
            "ref": { "id": "m1" }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_create_requires_object_payload() {
        let result = Mutation::create(ObjectRef::new("c1"), NodeKind::Chat, json!("nope"));
        assert!(matches!(result, Err(MutationError::Malformed(_))));
    }
}
