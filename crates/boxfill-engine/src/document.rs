use std::collections::HashMap;

use serde_json::{Map, Value};

use boxfill_types::{BoxfillError, Diagnostic, DiagnosticKind, Outbound, Result};

/// A parsed configuration template.
///
/// Every top-level key is kept in its original order. The `outbounds` array is
/// decoded into typed entries with a first-match `tag -> index` map on top.
#[derive(Debug, Clone)]
pub struct Document {
    root: Map<String, Value>,
    entries: Vec<Outbound>,
    /// First occurrence of each tag. Rebuilt after a mid-sequence insertion.
    index: HashMap<String, usize>,
    diagnostics: Vec<Diagnostic>,
}

impl Document {
    /// Parse template text.
    ///
    /// A missing or non-array `outbounds` field is repaired with a warning,
    /// and entries that are not objects are skipped with a warning. Only
    /// unparseable text and a non-object top level fail.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| BoxfillError::DocumentFormat {
                message: "template is not valid JSON".into(),
                source: Some(e),
            })?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut root) = value else {
            return Err(BoxfillError::document("top level is not a JSON object"));
        };

        let mut diagnostics = Vec::new();
        let items = match root.get_mut("outbounds").map(Value::take) {
            Some(Value::Array(items)) => items,
            Some(other) => {
                let message = format!(
                    "'outbounds' is {}, not an array; using an empty array",
                    json_kind(&other)
                );
                tracing::warn!("{message}");
                diagnostics.push(Diagnostic::warning(DiagnosticKind::DocumentFormat, message));
                Vec::new()
            }
            None => {
                let message = "template has no 'outbounds' array; using an empty array";
                tracing::warn!("{message}");
                diagnostics.push(Diagnostic::warning(DiagnosticKind::DocumentFormat, message));
                Vec::new()
            }
        };

        let mut entries = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            let map = match item {
                Value::Object(map) => map,
                other => {
                    let message =
                        format!("outbounds[{i}] is {}, not an object; skipped", json_kind(&other));
                    tracing::warn!("{message}");
                    diagnostics.push(Diagnostic::warning(DiagnosticKind::DocumentFormat, message));
                    continue;
                }
            };
            if let Some(members) = map.get("outbounds") {
                if let Some(message) = member_shape_problem(members) {
                    let tag = map.get("tag").and_then(Value::as_str).unwrap_or_default();
                    tracing::warn!(group = %tag, "{message}");
                    diagnostics.push(
                        Diagnostic::warning(DiagnosticKind::DocumentFormat, message).with_tag(tag),
                    );
                }
            }
            entries.push(Outbound::from(map));
        }

        let mut doc = Self {
            root,
            entries,
            index: HashMap::new(),
            diagnostics,
        };
        doc.rebuild_index();
        Ok(doc)
    }

    /// A document holding only an `outbounds` array.
    pub fn from_outbounds(entries: Vec<Outbound>) -> Self {
        let mut doc = Self {
            root: Map::new(),
            entries,
            index: HashMap::new(),
            diagnostics: Vec::new(),
        };
        doc.rebuild_index();
        doc
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, entry) in self.entries.iter().enumerate() {
            if !entry.tag.is_empty() {
                self.index.entry(entry.tag.clone()).or_insert(i);
            }
        }
    }

    /// Shape repairs made while parsing.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn entries(&self) -> &[Outbound] {
        &self.entries
    }

    /// Mutable access to every entry. Tags are index keys and must not be
    /// changed through this iterator.
    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut Outbound> {
        self.entries.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the first entry carrying `tag`.
    pub fn position(&self, tag: &str) -> Option<usize> {
        self.index.get(tag).copied()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.index.contains_key(tag)
    }

    /// First entry carrying `tag`.
    pub fn get(&self, tag: &str) -> Option<&Outbound> {
        self.position(tag).map(|i| &self.entries[i])
    }

    pub fn get_mut(&mut self, tag: &str) -> Option<&mut Outbound> {
        let i = self.position(tag)?;
        self.entries.get_mut(i)
    }

    /// Insert an entry, clamping `index` to the sequence length.
    /// Returns the index the entry landed at.
    pub fn insert(&mut self, index: usize, entry: Outbound) -> usize {
        let index = index.min(self.entries.len());
        self.entries.insert(index, entry);
        self.rebuild_index();
        index
    }

    /// Append an entry. An already-indexed tag keeps pointing at its first entry.
    pub fn push(&mut self, entry: Outbound) {
        let i = self.entries.len();
        if !entry.tag.is_empty() {
            self.index.entry(entry.tag.clone()).or_insert(i);
        }
        self.entries.push(entry);
    }

    /// The full document as JSON, `outbounds` in its original key position.
    pub fn to_value(&self) -> Value {
        let mut root = self.root.clone();
        let outbounds = self
            .entries
            .iter()
            .cloned()
            .map(|entry| Value::Object(entry.into()))
            .collect();
        root.insert("outbounds".into(), Value::Array(outbounds));
        Value::Object(root)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_value()).map_err(BoxfillError::Serialization)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn member_shape_problem(members: &Value) -> Option<String> {
    match members {
        Value::Array(items) if items.iter().all(Value::is_string) => None,
        Value::Array(_) => Some("non-string member references are ignored".into()),
        other => Some(format!(
            "member list is {}, not an array; treated as absent",
            json_kind(other)
        )),
    }
}
