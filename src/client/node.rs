use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::fetch::Fetch;
use crate::template::format_url_args;

use super::error::ConfigError;

/// Metadata carried by every node: its fully resolved URL template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeMeta {
    url: String,
}

impl NodeMeta {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Formats this node's URL without calling it.
    pub fn format_url(&self, args: &[Value]) -> String {
        format_url_args(&self.url, args)
    }
}

/// One node of a built client tree.
///
/// A node is callable when it has an executor, a namespace when it has
/// children, or both. Nodes expose no mutators; a tree is fixed once built.
#[derive(Debug, Clone, Default)]
pub struct ClientNode {
    pub(super) leaf: Option<Arc<Fetch>>,
    pub(super) children: BTreeMap<String, ClientNode>,
    pub(super) meta: NodeMeta,
}

impl ClientNode {
    pub fn prop(&self) -> &NodeMeta {
        &self.meta
    }

    pub fn url(&self) -> &str {
        self.meta.url()
    }

    pub fn format_url(&self, args: &[Value]) -> String {
        self.meta.format_url(args)
    }

    pub fn endpoint(&self) -> Option<&Arc<Fetch>> {
        self.leaf.as_ref()
    }

    pub fn is_callable(&self) -> bool {
        self.leaf.is_some()
    }

    pub fn get(&self, name: &str) -> Option<&ClientNode> {
        self.children.get(name)
    }

    /// Resolves a dotted path such as `users.by_id`. The empty path is `self`.
    pub fn at(&self, path: &str) -> Option<&ClientNode> {
        if path.is_empty() {
            return Some(self);
        }
        path.split('.').try_fold(self, |node, name| node.get(name))
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &ClientNode)> {
        self.children.iter().map(|(name, node)| (name.as_str(), node))
    }

    /// Every descendant with its dotted path, parents before children.
    pub fn walk(&self) -> Vec<(String, &ClientNode)> {
        let mut nodes = Vec::new();
        self.walk_into("", &mut nodes);
        nodes
    }

    fn walk_into<'a>(&'a self, prefix: &str, nodes: &mut Vec<(String, &'a ClientNode)>) {
        for (name, child) in &self.children {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}.{name}")
            };
            nodes.push((path.clone(), child));
            child.walk_into(&path, nodes);
        }
    }

    /// Like [`ClientNode::at`] but insists on a callable node.
    pub fn require(&self, path: &str) -> Result<&Arc<Fetch>, ConfigError> {
        let node = self
            .at(path)
            .ok_or_else(|| ConfigError::UnknownEndpoint(path.to_string()))?;
        node.endpoint().ok_or_else(|| ConfigError::NotCallable(path.to_string()))
    }
}
