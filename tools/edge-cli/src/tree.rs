//! Render trees described in JSON.
//!
//! ```json
//! {"element": {"tag": "main", "attrs": {"class": "page"}, "children": [
//!     {"component": {"name": "Header", "module": "components/Header.vue",
//!                    "key": "v1", "children": [{"text": "Shop"}]}}
//! ]}}
//! ```

use edge_core::{ComponentFn, RenderNode, Rendered};
use indexmap::IndexMap;
use serde::Deserialize;

/// A node of a JSON render tree.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeSpec {
    Text(String),
    Raw(String),
    Comment(String),
    Element(ElementSpec),
    Fragment(Vec<TreeSpec>),
    Component(ComponentSpec),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ElementSpec {
    pub tag: String,
    #[serde(default)]
    pub attrs: IndexMap<String, String>,
    /// Boolean attributes.
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub void: bool,
    #[serde(default)]
    pub children: Vec<TreeSpec>,
}

/// A component that renders its slot children.
#[derive(Debug, Clone, Deserialize)]
pub struct ComponentSpec {
    pub name: String,
    #[serde(default)]
    pub module: Option<String>,
    /// Cache key for this invocation.
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub props: serde_json::Value,
    #[serde(default)]
    pub children: Vec<TreeSpec>,
}

impl TreeSpec {
    pub fn from_json_str(input: &str) -> serde_json::Result<Self> {
        serde_json::from_str(input)
    }

    pub fn to_node(&self) -> RenderNode {
        match self {
            Self::Text(text) => RenderNode::text(text.clone()),
            Self::Raw(markup) => RenderNode::raw(markup.clone()),
            Self::Comment(text) => RenderNode::comment(text.clone()),
            Self::Element(element) => element.to_node(),
            Self::Fragment(children) => RenderNode::fragment(children.iter().map(Self::to_node)),
            Self::Component(component) => component.to_node(),
        }
    }
}

impl ElementSpec {
    fn to_node(&self) -> RenderNode {
        let node = if self.void {
            RenderNode::void_element(self.tag.clone())
        } else {
            RenderNode::element(self.tag.clone())
        };
        let node = self
            .attrs
            .iter()
            .fold(node, |node, (name, value)| node.with_attr(name.clone(), value.clone()));
        let node = self
            .flags
            .iter()
            .fold(node, |node, flag| node.with_bool_attr(flag.clone()));
        node.with_children(self.children.iter().map(TreeSpec::to_node))
    }
}

impl ComponentSpec {
    fn to_node(&self) -> RenderNode {
        let mut descriptor = ComponentFn::new(|input| {
            Ok(Rendered::ready(RenderNode::fragment(input.children.to_vec())))
        })
        .named(self.name.clone());
        if let Some(module) = &self.module {
            descriptor = descriptor.with_module(module.clone());
        }

        let node = RenderNode::component(descriptor.into_arc(), self.props.clone())
            .with_children(self.children.iter().map(TreeSpec::to_node));
        match &self.key {
            Some(key) => node.with_cache_key(key.clone()),
            None => node,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edge_core::RenderContext;
    use edge_streaming::{render_to_string, RenderOptions};

    async fn render(json: &str) -> (String, RenderContext) {
        let tree = TreeSpec::from_json_str(json).unwrap();
        let mut context = RenderContext::new("/");
        let html = render_to_string(tree.to_node(), &mut context, RenderOptions::default())
            .await
            .unwrap();
        (html, context)
    }

    // === Tree Tests ===

    #[tokio::test]
    async fn test_element_tree() {
        let (html, _) = render(
            r#"{"element": {"tag": "div", "attrs": {"id": "a", "class": "b"}, "flags": ["hidden"],
                "children": [{"text": "x < y"}, {"element": {"tag": "br", "void": true}}, {"comment": "c"}]}}"#,
        )
        .await;
        assert_eq!(html, "<div id=\"a\" class=\"b\" hidden>x &lt; y<br><!--c--></div>");
    }

    #[tokio::test]
    async fn test_component_registers_module() {
        let (html, context) = render(
            r#"{"fragment": [
                {"raw": "<hr>"},
                {"component": {"name": "Card", "module": "Card.vue", "children": [{"text": "hi"}]}}
            ]}"#,
        )
        .await;
        assert_eq!(html, "<hr>hi");
        assert!(context.registered_modules.contains("Card.vue"));
    }

    #[test]
    fn test_unknown_node_kind() {
        assert!(TreeSpec::from_json_str(r#"{"widget": "x"}"#).is_err());
    }
}
