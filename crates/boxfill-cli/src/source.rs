//! Node lists read from the local filesystem.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use boxfill_engine::{filter_unsupported, NodeLocator, NodeRequest, NodeSource};
use boxfill_types::{BoxfillError, Node, Result};

/// Resolves node requests against a directory:
///
/// ```text
/// <root>/subscriptions/<name>.json   type=0
/// <root>/profiles/<name>.json        type=1
/// ```
///
/// A `url` is either `file://<path>` or a plain path; relative paths are
/// taken relative to `<root>`.
#[derive(Debug, Clone)]
pub struct FileNodeSource {
    root: PathBuf,
}

impl FileNodeSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, locator: &NodeLocator) -> Result<PathBuf> {
        let path = match locator {
            NodeLocator::Subscription { name } => {
                self.root.join("subscriptions").join(file_name(locator, name)?)
            }
            NodeLocator::Profile { name } => {
                self.root.join("profiles").join(file_name(locator, name)?)
            }
            NodeLocator::Url { url } => {
                let raw = match url.strip_prefix("file://") {
                    Some(path) => path,
                    None if url.contains("://") => {
                        return Err(BoxfillError::NodeSource {
                            request: locator.to_string(),
                            message: "only file:// urls and local paths are supported".into(),
                        })
                    }
                    None => url.as_str(),
                };
                let path = Path::new(raw);
                if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    self.root.join(path)
                }
            }
        };
        Ok(path)
    }
}

/// `<name>.json`, provided the name stays inside its directory.
fn file_name(locator: &NodeLocator, name: &str) -> Result<String> {
    if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        return Err(BoxfillError::NodeSource {
            request: locator.to_string(),
            message: "name must not contain path separators or '..'".into(),
        });
    }
    Ok(format!("{name}.json"))
}

/// Decode a node file: a JSON array of node objects, or an object with an
/// `outbounds` array.
pub fn parse_nodes(text: &str) -> std::result::Result<Vec<Node>, String> {
    let value: Value = serde_json::from_str(text).map_err(|e| format!("invalid JSON: {e}"))?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("outbounds") {
            Some(Value::Array(items)) => items,
            _ => return Err("object has no 'outbounds' array".into()),
        },
        _ => return Err("expected an array of nodes".into()),
    };
    Ok(items.into_iter().map(Node::from_value).collect())
}

#[async_trait]
impl NodeSource for FileNodeSource {
    async fn fetch(&self, request: &NodeRequest) -> Result<Vec<Node>> {
        let path = self.path_for(&request.locator)?;
        let fail = |message: String| BoxfillError::NodeSource {
            request: request.locator.to_string(),
            message,
        };

        tracing::debug!(path = %path.display(), "Reading nodes");
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| fail(format!("{}: {e}", path.display())))?;
        let nodes = parse_nodes(&text).map_err(|e| fail(format!("{}: {e}", path.display())))?;
        Ok(filter_unsupported(nodes, request.include_unsupported))
    }
}
