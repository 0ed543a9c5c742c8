use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::outbound::Outbound;

/// Coarse classification of a fetched node by its `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Any proxy protocol (`vmess`, `trojan`, `shadowsocks`, ...).
    Proxy,
    Direct,
    Block,
    Dns,
    /// No usable `type` field.
    Other,
}

impl NodeKind {
    pub fn from_type(node_type: Option<&str>) -> Self {
        match node_type {
            Some("direct") => NodeKind::Direct,
            Some("block") => NodeKind::Block,
            Some("dns") => NodeKind::Dns,
            Some(t) if !t.is_empty() => NodeKind::Proxy,
            _ => NodeKind::Other,
        }
    }
}

/// An endpoint record as produced by a node source.
///
/// Nodes are immutable: the engine only reads the tag and kind, and appends the
/// original JSON object to the document unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub struct Node {
    tag: Option<String>,
    kind: NodeKind,
    fields: Map<String, Value>,
}

impl Node {
    /// Construct a node from its tag and protocol type.
    pub fn new(tag: impl Into<String>, node_type: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("tag".into(), Value::String(tag.into()));
        fields.insert("type".into(), Value::String(node_type.into()));
        Self::from_fields(fields)
    }

    /// Decode a node from an arbitrary JSON value. Non-object values become an
    /// untagged node of kind [`NodeKind::Other`], which every stage ignores.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self::from_fields(fields),
            other => {
                tracing::debug!(value = %other, "Ignoring non-object node");
                Self {
                    tag: None,
                    kind: NodeKind::Other,
                    fields: Map::new(),
                }
            }
        }
    }

    fn from_fields(fields: Map<String, Value>) -> Self {
        let tag = fields
            .get("tag")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(String::from);
        let kind = NodeKind::from_type(fields.get("type").and_then(Value::as_str));
        Self { tag, kind, fields }
    }

    /// The display tag, if present and non-empty.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// The raw `type` field (e.g. `"vmess"`).
    pub fn protocol(&self) -> Option<&str> {
        self.fields.get("type").and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// A routable node is a proxy with a usable tag.
    pub fn is_routable(&self) -> bool {
        self.kind == NodeKind::Proxy && self.tag.is_some()
    }

    /// The document entry this node is appended as.
    pub fn to_outbound(&self) -> Outbound {
        Outbound::from(self.fields.clone())
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        Node::from_value(value)
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Object(node.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_from_type() {
        assert_eq!(NodeKind::from_type(Some("vmess")), NodeKind::Proxy);
        assert_eq!(NodeKind::from_type(Some("direct")), NodeKind::Direct);
        assert_eq!(NodeKind::from_type(Some("block")), NodeKind::Block);
        assert_eq!(NodeKind::from_type(Some("dns")), NodeKind::Dns);
        assert_eq!(NodeKind::from_type(Some("")), NodeKind::Other);
        assert_eq!(NodeKind::from_type(None), NodeKind::Other);
    }

    #[test]
    fn decode_proxy_node() {
        let node = Node::from_value(json!({
            "tag": "HK-1",
            "type": "trojan",
            "server": "hk.example.com",
            "server_port": 443
        }));
        assert_eq!(node.tag(), Some("HK-1"));
        assert_eq!(node.kind(), NodeKind::Proxy);
        assert_eq!(node.protocol(), Some("trojan"));
        assert!(node.is_routable());
    }

    #[test]
    fn empty_tag_is_not_routable() {
        let node = Node::from_value(json!({ "tag": "", "type": "vmess" }));
        assert_eq!(node.tag(), None);
        assert!(!node.is_routable());
    }

    #[test]
    fn sentinel_kinds_are_not_routable() {
        assert!(!Node::new("DIRECT", "direct").is_routable());
        assert!(!Node::new("REJECT", "block").is_routable());
        assert!(!Node::new("DNS-OUT", "dns").is_routable());
    }

    #[test]
    fn non_object_node_is_ignored() {
        let node = Node::from_value(json!("just a string"));
        assert_eq!(node.kind(), NodeKind::Other);
        assert!(node.fields().is_empty());
        assert!(!node.is_routable());
    }

    #[test]
    fn deserializes_from_json_list() {
        let nodes: Vec<Node> = serde_json::from_str(
            r#"[{"tag":"A","type":"vless"},{"tag":"B","type":"direct"}]"#,
        )
        .unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(nodes[0].is_routable());
        assert!(!nodes[1].is_routable());
    }

    #[test]
    fn to_outbound_keeps_fields_in_order() {
        let node = Node::from_value(json!({
            "type": "shadowsocks",
            "tag": "SG-1",
            "method": "aes-128-gcm"
        }));
        let value = serde_json::to_value(node.to_outbound()).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["type", "tag", "method"]);
    }
}
