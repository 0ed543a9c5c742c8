//! Node sources: where the endpoint list for a run comes from.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use boxfill_types::{Node, Result};

/// Protocols dropped from fetched nodes unless explicitly requested.
pub const UNSUPPORTED_PROXY_TYPES: &[&str] = &["ssr", "snell"];

/// Which node list to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeLocator {
    /// A single named subscription (`type=0`).
    Subscription { name: String },
    /// A named combined profile (`type=1`).
    Profile { name: String },
    /// A direct location, bypassing named lookups.
    Url { url: String },
}

impl fmt::Display for NodeLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeLocator::Subscription { name } => write!(f, "subscription '{name}'"),
            NodeLocator::Profile { name } => write!(f, "profile '{name}'"),
            NodeLocator::Url { url } => write!(f, "url '{url}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRequest {
    pub locator: NodeLocator,
    pub include_unsupported: bool,
}

/// Resolves a [`NodeRequest`] to its node list.
#[async_trait]
pub trait NodeSource: Send + Sync {
    async fn fetch(&self, request: &NodeRequest) -> Result<Vec<Node>>;
}

/// Drop nodes whose protocol is in [`UNSUPPORTED_PROXY_TYPES`], unless
/// `include_unsupported` is set.
pub fn filter_unsupported(nodes: Vec<Node>, include_unsupported: bool) -> Vec<Node> {
    if include_unsupported {
        return nodes;
    }
    nodes
        .into_iter()
        .filter(|node| match node.protocol() {
            Some(protocol) if UNSUPPORTED_PROXY_TYPES.contains(&protocol) => {
                tracing::debug!(
                    node = node.tag().unwrap_or_default(),
                    protocol,
                    "Dropping unsupported node"
                );
                false
            }
            _ => true,
        })
        .collect()
}

/// A fixed node list, returned for every request.
#[derive(Debug, Clone, Default)]
pub struct StaticNodeSource {
    nodes: Vec<Node>,
}

impl StaticNodeSource {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }
}

#[async_trait]
impl NodeSource for StaticNodeSource {
    async fn fetch(&self, request: &NodeRequest) -> Result<Vec<Node>> {
        Ok(filter_unsupported(self.nodes.clone(), request.include_unsupported))
    }
}
