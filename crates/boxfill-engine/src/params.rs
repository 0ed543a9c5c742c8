use std::collections::HashMap;

use boxfill_types::{BoxfillError, Result, DIRECT_TAG};

use crate::source::{NodeLocator, NodeRequest};

/// Validated invocation parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameters {
    pub locator: NodeLocator,
    /// The raw rule string; may be empty.
    pub rules: String,
    pub fallback_tag: String,
    pub include_unsupported: bool,
}

impl Parameters {
    pub fn new(locator: NodeLocator, rules: impl Into<String>) -> Self {
        Self {
            locator,
            rules: rules.into(),
            fallback_tag: DIRECT_TAG.to_string(),
            include_unsupported: false,
        }
    }

    pub fn with_fallback(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        self.fallback_tag = if tag.is_empty() { DIRECT_TAG.to_string() } else { tag };
        self
    }

    pub fn with_unsupported(mut self, include: bool) -> Self {
        self.include_unsupported = include;
        self
    }

    /// Parse and validate a `#key=value&...` fragment.
    pub fn parse(fragment: &str) -> Result<Self> {
        let mut pairs = parse_fragment(fragment)?;
        let mut take = |key: &str| pairs.remove(key).filter(|v| !v.is_empty());

        let locator = match take("url") {
            Some(url) => NodeLocator::Url { url },
            None => {
                let missing =
                    |name| BoxfillError::parameter(name, "required when 'url' is not given");
                let kind = take("type").ok_or_else(|| missing("type"))?;
                let name = take("name").ok_or_else(|| missing("name"))?;
                match kind.as_str() {
                    "0" => NodeLocator::Subscription { name },
                    "1" => NodeLocator::Profile { name },
                    other => {
                        return Err(BoxfillError::parameter(
                            "type",
                            format!("must be 0 or 1, got '{other}'"),
                        ))
                    }
                }
            }
        };

        // `outbound` must be present, but may be empty.
        let rules = pairs
            .remove("outbound")
            .ok_or_else(|| BoxfillError::parameter("outbound", "rule string is required"))?;
        let fallback_tag = pairs.remove("fallback_tag").unwrap_or_default();
        let include_unsupported = pairs
            .remove("includeUnsupportedProxy")
            .is_some_and(|v| v == "true");

        for key in pairs.keys() {
            tracing::debug!(key = %key, "Ignoring unknown parameter");
        }

        let params = Self::new(locator, rules)
            .with_fallback(fallback_tag)
            .with_unsupported(include_unsupported);
        params.validate()?;
        Ok(params)
    }

    /// Check invariants that hand-built parameters may violate.
    pub fn validate(&self) -> Result<()> {
        match &self.locator {
            NodeLocator::Subscription { name } | NodeLocator::Profile { name }
                if name.is_empty() =>
            {
                Err(BoxfillError::parameter("name", "must not be empty"))
            }
            NodeLocator::Url { url } if url.is_empty() => {
                Err(BoxfillError::parameter("url", "must not be empty"))
            }
            _ if self.fallback_tag.is_empty() => {
                Err(BoxfillError::parameter("fallback_tag", "must not be empty"))
            }
            _ => Ok(()),
        }
    }

    pub fn node_request(&self) -> NodeRequest {
        NodeRequest {
            locator: self.locator.clone(),
            include_unsupported: self.include_unsupported,
        }
    }
}

/// Split a fragment into percent-decoded key/value pairs.
///
/// A leading `#` is optional. A pair must contain exactly one `=`; any other
/// pair is ignored. A literal `=` in a value has to be sent as `%3D`. Later
/// duplicates win.
pub fn parse_fragment(fragment: &str) -> Result<HashMap<String, String>> {
    let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
    let mut pairs = HashMap::new();
    for pair in fragment.split('&').filter(|p| !p.is_empty()) {
        let Some((key, value)) = pair.split_once('=').filter(|(_, v)| !v.contains('=')) else {
            tracing::debug!(pair = %pair, "Ignoring parameter without exactly one '='");
            continue;
        };
        let key = decode(key, key)?;
        let value = decode(&key, value)?;
        pairs.insert(key, value);
    }
    Ok(pairs)
}

fn decode(name: &str, raw: &str) -> Result<String> {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .map_err(|e| BoxfillError::parameter(name, format!("not valid UTF-8 after decoding: {e}")))
}
