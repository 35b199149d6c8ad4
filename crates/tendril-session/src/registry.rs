//! Component registry for one document view.

use std::collections::HashMap;

use crate::message::{Component, ComponentKind};

/// Id to content mapping with stable insertion order.
///
/// The first registration of an id fixes its position; later registrations
/// of the same id replace the content in place. The document body is
/// assembled in this order.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    order: Vec<String>,
    contents: HashMap<String, String>,
}

impl ComponentRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a component or overwrite the content of an existing id.
    pub fn register(&mut self, component: Component) {
        let Component { id, content } = component;
        if !self.contents.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.contents.insert(id, content);
    }

    /// Remove a component. Unknown ids are ignored.
    pub fn unregister(&mut self, id: &str) {
        if self.contents.remove(id).is_some() {
            self.order.retain(|existing| existing != id);
        }
    }

    /// Content of one component.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&str> {
        self.contents.get(id).map(String::as_str)
    }

    /// Replace the content of a registered component.
    ///
    /// Returns `false` without registering anything if `id` is unknown.
    pub fn update_content(&mut self, id: &str, content: &str) -> bool {
        match self.contents.get_mut(id) {
            Some(existing) => {
                content.clone_into(existing);
                true
            }
            None => false,
        }
    }

    /// Components whose id contains `type_prefix`, in registry order.
    #[must_use]
    pub fn get_by_prefix(&self, type_prefix: &str) -> Vec<Component> {
        self.iter()
            .filter(|(id, _)| id.contains(type_prefix))
            .map(|(id, content)| Component::new(id, content))
            .collect()
    }

    /// Contents of all components whose id contains the kind's marker, in
    /// registry order. Matches the same ids as
    /// [`get_by_prefix`](Self::get_by_prefix), so one id may count for
    /// several kinds.
    pub fn contents_of(&self, kind: ComponentKind) -> impl Iterator<Item = &str> {
        let marker = kind.marker();
        self.iter()
            .filter(move |(id, _)| id.contains(marker))
            .map(|(_, content)| content)
    }

    /// Full mapping in registry order.
    #[must_use]
    pub fn dump(&self) -> Vec<Component> {
        self.iter()
            .map(|(id, content)| Component::new(id, content))
            .collect()
    }

    /// Number of registered components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no components are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.order.iter().filter_map(|id| {
            self.contents
                .get(id)
                .map(|content| (id.as_str(), content.as_str()))
        })
    }
}
