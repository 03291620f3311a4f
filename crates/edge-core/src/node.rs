//! Render instruction tree.

use std::fmt;
use std::sync::Arc;

use crate::component::Component;

/// An element attribute. A missing value renders as a boolean attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: Option<String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }
}

/// A node of the render instruction tree.
#[derive(Clone)]
pub enum RenderNode {
    /// Escaped text.
    Text(String),
    /// Markup emitted verbatim.
    RawMarkup(String),
    Element {
        tag: String,
        attributes: Vec<Attribute>,
        children: Vec<RenderNode>,
        /// Void element: open tag only.
        self_closing: bool,
    },
    Comment(String),
    Component {
        descriptor: Arc<dyn Component>,
        props: serde_json::Value,
        /// Slot content passed to the component.
        children: Vec<RenderNode>,
        /// Overrides the descriptor's `cache_key(props)` for this invocation.
        cache_key: Option<String>,
    },
    Fragment(Vec<RenderNode>),
}

impl RenderNode {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn raw(markup: impl Into<String>) -> Self {
        Self::RawMarkup(markup.into())
    }

    pub fn element(tag: impl Into<String>) -> Self {
        Self::Element {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            self_closing: false,
        }
    }

    pub fn void_element(tag: impl Into<String>) -> Self {
        Self::Element {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            self_closing: true,
        }
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Self::Comment(text.into())
    }

    pub fn component(descriptor: Arc<dyn Component>, props: serde_json::Value) -> Self {
        Self::Component {
            descriptor,
            props,
            children: Vec::new(),
            cache_key: None,
        }
    }

    pub fn fragment(children: impl IntoIterator<Item = RenderNode>) -> Self {
        Self::Fragment(children.into_iter().collect())
    }

    pub fn empty() -> Self {
        Self::Fragment(Vec::new())
    }

    /// Add an attribute. No effect on nodes other than elements.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Self::Element { attributes, .. } = &mut self {
            attributes.push(Attribute::new(name, value));
        }
        self
    }

    /// Add a valueless attribute. No effect on nodes other than elements.
    pub fn with_bool_attr(mut self, name: impl Into<String>) -> Self {
        if let Self::Element { attributes, .. } = &mut self {
            attributes.push(Attribute::boolean(name));
        }
        self
    }

    /// Append a child to an element, fragment or component slot.
    pub fn with_child(mut self, child: RenderNode) -> Self {
        match &mut self {
            Self::Element { children, .. }
            | Self::Fragment(children)
            | Self::Component { children, .. } => children.push(child),
            _ => {}
        }
        self
    }

    pub fn with_children(self, children: impl IntoIterator<Item = RenderNode>) -> Self {
        children.into_iter().fold(self, |node, child| node.with_child(child))
    }

    /// Set an explicit cache key on a component node.
    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        if let Self::Component { cache_key, .. } = &mut self {
            *cache_key = Some(key.into());
        }
        self
    }
}

impl From<&str> for RenderNode {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for RenderNode {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl fmt::Debug for RenderNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::RawMarkup(markup) => f.debug_tuple("RawMarkup").field(markup).finish(),
            Self::Element {
                tag,
                attributes,
                children,
                self_closing,
            } => f
                .debug_struct("Element")
                .field("tag", tag)
                .field("attributes", attributes)
                .field("children", children)
                .field("self_closing", self_closing)
                .finish(),
            Self::Comment(text) => f.debug_tuple("Comment").field(text).finish(),
            Self::Component {
                descriptor,
                props,
                children,
                cache_key,
            } => f
                .debug_struct("Component")
                .field("name", &descriptor.name())
                .field("props", props)
                .field("children", children)
                .field("cache_key", cache_key)
                .finish(),
            Self::Fragment(children) => f.debug_tuple("Fragment").field(children).finish(),
        }
    }
}
