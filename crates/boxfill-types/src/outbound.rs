use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The `type` of a document entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OutboundKind {
    Selector,
    UrlTest,
    LoadBalance,
    Direct,
    Block,
    Dns,
    /// Any other type string, kept verbatim. Empty when the entry has no `type`.
    Other(String),
}

impl OutboundKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "selector" => OutboundKind::Selector,
            "urltest" => OutboundKind::UrlTest,
            "loadbalance" => OutboundKind::LoadBalance,
            "direct" => OutboundKind::Direct,
            "block" => OutboundKind::Block,
            "dns" => OutboundKind::Dns,
            other => OutboundKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            OutboundKind::Selector => "selector",
            OutboundKind::UrlTest => "urltest",
            OutboundKind::LoadBalance => "loadbalance",
            OutboundKind::Direct => "direct",
            OutboundKind::Block => "block",
            OutboundKind::Dns => "dns",
            OutboundKind::Other(s) => s,
        }
    }

    /// Group kinds must end up with at least one member.
    pub fn is_group(&self) -> bool {
        matches!(
            self,
            OutboundKind::Selector | OutboundKind::UrlTest | OutboundKind::LoadBalance
        )
    }
}

impl fmt::Display for OutboundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the document's `outbounds` array.
///
/// The typed fields mirror `tag`, `type`, `outbounds` and `default`. The
/// original JSON object is carried along, and a typed field is only written
/// back when it differs from what was decoded, so untouched entries come out
/// exactly as they went in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Outbound {
    pub tag: String,
    pub kind: OutboundKind,
    /// Member tag references. `None` when the field is absent or not an array.
    /// Non-string items are skipped.
    pub members: Option<Vec<String>>,
    pub default: Option<String>,
    raw: Map<String, Value>,
}

impl Outbound {
    pub fn new(tag: impl Into<String>, kind: OutboundKind) -> Self {
        Self {
            tag: tag.into(),
            kind,
            members: None,
            default: None,
            raw: Map::new(),
        }
    }

    pub fn with_members<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.members = Some(members.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_group(&self) -> bool {
        self.kind.is_group()
    }

    /// `true` when members are absent or empty.
    pub fn is_empty(&self) -> bool {
        self.members.as_ref().map_or(true, Vec::is_empty)
    }

    pub fn first_member(&self) -> Option<&str> {
        self.members.as_ref()?.first().map(String::as_str)
    }

    /// `true` when no usable `default` is set.
    pub fn lacks_default(&self) -> bool {
        self.default.as_deref().map_or(true, str::is_empty)
    }
}

fn decode_tag(raw: &Map<String, Value>) -> String {
    raw.get("tag")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn decode_kind(raw: &Map<String, Value>) -> OutboundKind {
    OutboundKind::parse(raw.get("type").and_then(Value::as_str).unwrap_or_default())
}

fn decode_members(raw: &Map<String, Value>) -> Option<Vec<String>> {
    let items = raw.get("outbounds")?.as_array()?;
    Some(items.iter().filter_map(Value::as_str).map(String::from).collect())
}

fn decode_default(raw: &Map<String, Value>) -> Option<String> {
    raw.get("default").and_then(Value::as_str).map(String::from)
}

impl From<Map<String, Value>> for Outbound {
    fn from(raw: Map<String, Value>) -> Self {
        Self {
            tag: decode_tag(&raw),
            kind: decode_kind(&raw),
            members: decode_members(&raw),
            default: decode_default(&raw),
            raw,
        }
    }
}

impl From<Outbound> for Map<String, Value> {
    fn from(outbound: Outbound) -> Self {
        let Outbound {
            tag,
            kind,
            members,
            default,
            mut raw,
        } = outbound;
        // Inserting an existing key keeps its position.
        if tag != decode_tag(&raw) {
            raw.insert("tag".into(), Value::String(tag));
        }
        if kind != decode_kind(&raw) {
            raw.insert("type".into(), Value::String(kind.as_str().to_string()));
        }
        if members != decode_members(&raw) {
            if let Some(members) = members {
                raw.insert(
                    "outbounds".into(),
                    Value::Array(members.into_iter().map(Value::String).collect()),
                );
            }
        }
        if default != decode_default(&raw) {
            if let Some(default) = default {
                raw.insert("default".into(), Value::String(default));
            }
        }
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outbound(value: Value) -> Outbound {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn kind_round_trips_known_strings() {
        for s in ["selector", "urltest", "loadbalance", "direct", "block", "dns"] {
            assert_eq!(OutboundKind::parse(s).as_str(), s);
        }
        assert_eq!(
            OutboundKind::parse("vmess"),
            OutboundKind::Other("vmess".into())
        );
    }

    #[test]
    fn group_kinds() {
        assert!(OutboundKind::Selector.is_group());
        assert!(OutboundKind::UrlTest.is_group());
        assert!(OutboundKind::LoadBalance.is_group());
        assert!(!OutboundKind::Direct.is_group());
        assert!(!OutboundKind::Other("vmess".into()).is_group());
    }

    #[test]
    fn decode_selector() {
        let ob = outbound(json!({
            "tag": "Region",
            "type": "selector",
            "outbounds": ["A", "B"],
            "default": "A",
            "interrupt_exist_connections": true
        }));
        assert_eq!(ob.tag, "Region");
        assert_eq!(ob.kind, OutboundKind::Selector);
        assert_eq!(ob.members, Some(vec!["A".to_string(), "B".to_string()]));
        assert_eq!(ob.default.as_deref(), Some("A"));
        assert_eq!(ob.first_member(), Some("A"));
    }

    #[test]
    fn non_array_members_are_absent() {
        let ob = outbound(json!({ "tag": "G", "type": "urltest", "outbounds": "oops" }));
        assert!(ob.members.is_none());
        assert!(ob.is_empty());
    }

    #[test]
    fn empty_default_counts_as_missing() {
        let ob = outbound(json!({ "tag": "G", "type": "selector", "default": "" }));
        assert!(ob.lacks_default());
    }

    #[test]
    fn encode_preserves_field_order_and_unknown_fields() {
        let mut ob = outbound(json!({
            "type": "selector",
            "tag": "G",
            "outbounds": [],
            "interrupt_exist_connections": false
        }));
        ob.members = Some(vec!["X".into()]);
        ob.default = Some("X".into());

        let value = serde_json::to_value(&ob).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(
            keys,
            vec!["type", "tag", "outbounds", "interrupt_exist_connections", "default"]
        );
        assert_eq!(value["outbounds"], json!(["X"]));
        assert_eq!(value["default"], json!("X"));
    }

    #[test]
    fn new_entry_serializes_tag_and_type_only() {
        let ob = Outbound::new("MyFallback", OutboundKind::Direct);
        let value = serde_json::to_value(&ob).unwrap();
        assert_eq!(value, json!({ "tag": "MyFallback", "type": "direct" }));
    }

    #[test]
    fn untouched_invalid_members_are_written_back_verbatim() {
        let ob = outbound(json!({ "tag": "G", "type": "direct", "outbounds": 5 }));
        let value = serde_json::to_value(&ob).unwrap();
        assert_eq!(value["outbounds"], json!(5));
    }

    #[test]
    fn untouched_odd_shapes_round_trip_unchanged() {
        let original = json!({
            "tag": 7,
            "type": "selector",
            "outbounds": ["A", 1, null],
            "default": false,
            "interval": "5m"
        });
        let ob = outbound(original.clone());
        assert_eq!(ob.tag, "");
        assert_eq!(ob.members, Some(vec!["A".to_string()]));
        assert!(ob.default.is_none());
        assert_eq!(serde_json::to_value(&ob).unwrap(), original);
    }

    #[test]
    fn changed_fields_replace_odd_shapes() {
        let mut ob = outbound(json!({ "tag": "G", "type": "urltest", "outbounds": ["A", 1] }));
        ob.members = Some(vec!["DIRECT".into()]);
        let value = serde_json::to_value(&ob).unwrap();
        assert_eq!(value, json!({ "tag": "G", "type": "urltest", "outbounds": ["DIRECT"] }));
    }
}
