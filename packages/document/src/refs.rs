//! References into the document
//!
//! A ref is an id plus the chain of collections it sits in, innermost first.
//! Linearized root-first it becomes a [`SegmentPath`]:
//!
//! ```text
//! ObjectRef { id: "m1", parent_collection: messages ← g1 ← message_groups ← c1 ← assets }
//!   ⇒ assets / c1 / message_groups / g1 / messages / m1
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ResolveError;

/// Name of the document's top-level collection.
pub const ROOT_COLLECTION: &str = "assets";

/// Reference to an object inside a collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_collection: Option<CollectionRef>,
}

/// Reference to a named collection (or single-valued slot) on an object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionRef {
    pub id: String,
    #[serde(default)]
    pub parent: Option<Box<ObjectRef>>,
}

impl ObjectRef {
    /// Ref without a parent chain. Resolves into the root collection.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_collection: None,
        }
    }

    /// Top-level asset, with the root collection spelled out.
    pub fn asset(id: impl Into<String>) -> Self {
        CollectionRef::root().object(id)
    }

    /// Collection or slot named `name` on this object.
    pub fn collection(&self, name: impl Into<String>) -> CollectionRef {
        CollectionRef {
            id: name.into(),
            parent: Some(Box::new(self.clone())),
        }
    }

    /// The object owning this ref's collection, if any.
    pub fn parent(&self) -> Option<&ObjectRef> {
        self.parent_collection
            .as_ref()
            .and_then(|c| c.parent.as_deref())
    }

    /// Name of the collection holding this object.
    pub fn collection_name(&self) -> &str {
        self.parent_collection
            .as_ref()
            .map(|c| c.id.as_str())
            .unwrap_or(ROOT_COLLECTION)
    }

    /// Linearize root-first.
    pub fn segments(&self) -> SegmentPath {
        let mut segments = Vec::new();
        let mut current = Some(self);

        while let Some(object) = current {
            segments.push(object.id.clone());
            match &object.parent_collection {
                Some(collection) => {
                    segments.push(collection.id.clone());
                    current = collection.parent.as_deref();
                }
                None => {
                    segments.push(ROOT_COLLECTION.to_string());
                    current = None;
                }
            }
        }

        segments.reverse();
        SegmentPath(segments)
    }

    /// Rebuild a ref from its segment path.
    pub fn from_segments(path: &SegmentPath) -> Result<Self, ResolveError> {
        if !path.is_well_formed() {
            return Err(ResolveError::MalformedPath(path.clone()));
        }

        let mut pairs = path.pairs();
        let (root, id) = pairs
            .next()
            .ok_or_else(|| ResolveError::MalformedPath(path.clone()))?;
        let mut object = CollectionRef {
            id: root.to_string(),
            parent: None,
        }
        .object(id);

        for (collection, id) in pairs {
            object = object.collection(collection).object(id);
        }

        Ok(object)
    }
}

impl CollectionRef {
    /// The document's top-level assets collection.
    pub fn root() -> Self {
        Self {
            id: ROOT_COLLECTION.to_string(),
            parent: None,
        }
    }

    /// Element `id` of this collection.
    pub fn object(&self, id: impl Into<String>) -> ObjectRef {
        ObjectRef {
            id: id.into(),
            parent_collection: Some(self.clone()),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.segments().fmt(f)
    }
}

/// Root-first alternation of collection names and ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentPath(Vec<String>);

impl SegmentPath {
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Even length, at least one (collection, id) pair.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() >= 2 && self.0.len() % 2 == 0
    }

    /// (collection, id) pairs, root first. A trailing odd segment is dropped.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .chunks_exact(2)
            .map(|pair| (pair[0].as_str(), pair[1].as_str()))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, collection: impl Into<String>, id: impl Into<String>) {
        self.0.push(collection.into());
        self.0.push(id.into());
    }

    /// Number of (collection, id) levels below the root.
    pub fn depth(&self) -> usize {
        self.0.len() / 2
    }
}

impl From<Vec<String>> for SegmentPath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for SegmentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn message_ref() -> ObjectRef {
        ObjectRef::asset("c1")
            .collection("message_groups")
            .object("g1")
            .collection("messages")
            .object("m1")
    }

    #[test]
    fn test_segments_root_first() {
        assert_eq!(
            message_ref().segments().to_string(),
            "assets/c1/message_groups/g1/messages/m1"
        );
    }

    #[test]
    fn test_ref_without_parent_is_two_segments() {
        let path = ObjectRef::new("c1").segments();
        assert_eq!(path.segments(), ["assets", "c1"]);
        assert_eq!(path.depth(), 1);
    }

    #[test]
    fn test_parent_walk() {
        let r = message_ref();
        assert_eq!(r.collection_name(), "messages");
        assert_eq!(r.parent().unwrap().id, "g1");
        assert_eq!(r.parent().unwrap().parent().unwrap().id, "c1");
        assert!(r.parent().unwrap().parent().unwrap().parent().is_none());
    }

    #[test]
    fn test_wire_format() {
        let r: ObjectRef = serde_json::from_value(json!({
            "id": "m1",
            "context": null,
            "parent_collection": {
                "id": "messages",
                "parent": {
                    "id": "g1",
                    "parent_collection": {
                        "id": "message_groups",
                        "parent": {
                            "id": "c1",
                            "parent_collection": { "id": "assets", "parent": null }
                        }
                    }
                }
            }
        }))
        .unwrap();

        assert_eq!(r, message_ref());
    }

    #[test]
    fn test_from_segments_rejects_odd_paths() {
        let path = SegmentPath::new(vec!["assets".into(), "c1".into(), "messages".into()]);
        assert!(matches!(
            ObjectRef::from_segments(&path),
            Err(ResolveError::MalformedPath(_))
        ));
        assert!(ObjectRef::from_segments(&SegmentPath::default()).is_err());
    }

    proptest! {
        #[test]
        fn prop_segments_round_trip(pairs in prop::collection::vec(("[a-z_]{1,12}", "[a-z0-9-]{1,12}"), 1..6)) {
            let mut path = SegmentPath::default();
            for (collection, id) in &pairs {
                path.push(collection.as_str(), id.as_str());
            }

            let rebuilt = ObjectRef::from_segments(&path).unwrap();
            prop_assert_eq!(rebuilt.segments(), path);
        }
    }
}
