//! Components and the messages exchanged between editing contexts.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one editing context (one open [`DocumentSession`]).
///
/// [`DocumentSession`]: crate::DocumentSession
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(Uuid);

impl ContextId {
    /// Generate a new random context id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One editable region of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Unique id within a registry, e.g. `title` or `block-3`.
    pub id: String,
    /// Current plain markup content.
    pub content: String,
}

impl Component {
    /// Create a component.
    #[must_use]
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }

    /// Kind of document field this component contributes to.
    #[must_use]
    pub fn kind(&self) -> Option<ComponentKind> {
        ComponentKind::of(&self.id)
    }
}

/// Document field a component belongs to, derived from its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Page title.
    Title,
    /// One body line or paragraph.
    Block,
    /// Page tags.
    Tag,
    /// Page metadata.
    Metadata,
}

impl ComponentKind {
    /// All kinds in matching precedence order.
    pub const ALL: [Self; 4] = [Self::Title, Self::Block, Self::Tag, Self::Metadata];

    /// Marker an id must contain to be of this kind.
    #[must_use]
    pub fn marker(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Block => "block",
            Self::Tag => "tag",
            Self::Metadata => "metadata",
        }
    }

    /// Kind of a component id; the first kind whose marker the id contains.
    #[must_use]
    pub fn of(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| id.contains(kind.marker()))
    }
}

/// Message carried on a document channel.
///
/// Serialized adjacently tagged, e.g. `{"type":"UNREGISTER","data":"block-2"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// A component was mounted or replaced.
    Register(Component),
    /// A component was unmounted.
    Unregister(String),
    /// Save the document, optionally merging one changed component first.
    Save(Option<Component>),
}

/// A [`Message`] tagged with the context that sent it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Sending context.
    pub origin: ContextId,
    /// Payload.
    pub message: Message,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_kind_from_id() {
        assert_eq!(ComponentKind::of("title"), Some(ComponentKind::Title));
        assert_eq!(ComponentKind::of("block-12"), Some(ComponentKind::Block));
        assert_eq!(ComponentKind::of("tags"), Some(ComponentKind::Tag));
        assert_eq!(ComponentKind::of("page-metadata"), Some(ComponentKind::Metadata));
        assert_eq!(ComponentKind::of("sidebar"), None);
    }

    #[test]
    fn test_kind_precedence() {
        // contains both "title" and "block"
        assert_eq!(ComponentKind::of("title-block"), Some(ComponentKind::Title));
        assert_eq!(
            Component::new("metadata-block", "").kind(),
            Some(ComponentKind::Block)
        );
    }

    #[test]
    fn test_message_wire_shape() {
        let register = Message::Register(Component::new("block-1", "hello"));
        assert_eq!(
            serde_json::to_string(&register).unwrap(),
            r#"{"type":"REGISTER","data":{"id":"block-1","content":"hello"}}"#
        );

        let unregister = Message::Unregister("block-2".to_owned());
        assert_eq!(
            serde_json::to_string(&unregister).unwrap(),
            r#"{"type":"UNREGISTER","data":"block-2"}"#
        );

        assert_eq!(
            serde_json::to_string(&Message::Save(None)).unwrap(),
            r#"{"type":"SAVE","data":null}"#
        );
    }

    #[test]
    fn test_message_parses_wire_shape() {
        let message: Message =
            serde_json::from_str(r#"{"type":"SAVE","data":{"id":"title","content":"Notes"}}"#)
                .unwrap();
        assert_eq!(message, Message::Save(Some(Component::new("title", "Notes"))));
    }

    #[test]
    fn test_context_ids_are_unique() {
        assert_ne!(ContextId::new(), ContextId::new());
    }
}
