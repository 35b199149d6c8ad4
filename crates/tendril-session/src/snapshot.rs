//! Document snapshot submitted for persistence.

use serde::{Deserialize, Serialize};

use crate::message::ComponentKind;
use crate::registry::ComponentRegistry;

/// Full document record sent to the server on save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    /// Block contents joined with `\n`, in registry order.
    pub body: String,
    /// Current title.
    pub title: String,
    /// Title at load time (or at the last successful save).
    pub old_title: String,
    /// Tags field.
    pub tags: String,
    /// Metadata field.
    pub metadata: String,
}

impl DocumentSnapshot {
    /// Assemble a snapshot from the registry's current contents.
    ///
    /// Each field collects the components whose id contains its marker.
    /// Single-valued fields take the first match and are empty when none is
    /// registered.
    #[must_use]
    pub fn assemble(registry: &ComponentRegistry, old_title: &str) -> Self {
        let first = |kind| {
            registry
                .contents_of(kind)
                .next()
                .unwrap_or_default()
                .to_owned()
        };

        Self {
            body: registry
                .contents_of(ComponentKind::Block)
                .collect::<Vec<_>>()
                .join("\n"),
            title: first(ComponentKind::Title),
            old_title: old_title.to_owned(),
            tags: first(ComponentKind::Tag),
            metadata: first(ComponentKind::Metadata),
        }
    }
}
