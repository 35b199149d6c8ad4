//! Presentation tree consumed by the decoder.

use std::collections::HashMap;

/// Element in a parsed presentation fragment.
///
/// Text is stored the lxml way: `text` is the content before the first
/// child, `tail` is the text following this element inside its parent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresentationNode {
    /// Lowercase element tag name.
    pub tag: String,
    /// Direct text content.
    pub text: String,
    /// Text after the element.
    pub tail: String,
    /// Element attributes, keys lowercased.
    pub attrs: HashMap<String, String>,
    /// Child elements.
    pub children: Vec<PresentationNode>,
}

impl PresentationNode {
    /// Create a new node with the given tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Set text content.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set tail content.
    #[must_use]
    pub fn with_tail(mut self, tail: impl Into<String>) -> Self {
        self.tail = tail.into();
        self
    }

    /// Add one attribute.
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Set children.
    #[must_use]
    pub fn with_children(mut self, children: Vec<PresentationNode>) -> Self {
        self.children = children;
        self
    }

    /// Attribute value by name.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Concatenated text of this element and all descendants, without its tail.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = self.text.clone();
        for child in &self.children {
            out.push_str(&child.text_content());
            out.push_str(&child.tail);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_content_direct_text() {
        let node = PresentationNode::new("a").with_text("Home");
        assert_eq!(node.text_content(), "Home");
    }

    #[test]
    fn test_text_content_nested() {
        let strong = PresentationNode::new("strong")
            .with_text("Bold")
            .with_tail(" page");
        let node = PresentationNode::new("a")
            .with_text("The ")
            .with_children(vec![strong])
            .with_tail(" ignored");
        assert_eq!(node.text_content(), "The Bold page");
    }

    #[test]
    fn test_attr_lookup() {
        let node = PresentationNode::new("img").with_attr("src", "https://x.com/a.png");
        assert_eq!(node.attr("src"), Some("https://x.com/a.png"));
        assert_eq!(node.attr("alt"), None);
    }
}
