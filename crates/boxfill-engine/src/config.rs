use std::path::Path;

use serde::{Deserialize, Serialize};

use boxfill_rules::Preset;
use boxfill_types::{BoxfillError, Result};

/// Template-layout settings for an [`Engine`](crate::Engine).
///
/// Every field has a default, so a config file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tag of the top-level selector that gets pruned.
    pub top_selector: String,
    /// Group made the top selector's default when nodes exist.
    pub auto_group: String,
    /// Group dropped from the top selector alongside the auto group when no nodes exist.
    pub manual_group: String,
    /// Where a synthesized fallback entry goes when the template has no `DNS-OUT`.
    pub fallback_insert_offset: usize,
    /// Preset rule tables applied before the parsed rules.
    pub presets: Vec<Preset>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            top_selector: "🪜 Proxy".into(),
            auto_group: "♻️ 自动选择".into(),
            manual_group: "🚀 手动切换".into(),
            fallback_insert_offset: 3,
            presets: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text).map_err(|e| {
            BoxfillError::Other(format!("invalid engine config {}: {e}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), "Loaded engine config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.top_selector, "🪜 Proxy");
        assert_eq!(config.auto_group, "♻️ 自动选择");
        assert_eq!(config.manual_group, "🚀 手动切换");
        assert_eq!(config.fallback_insert_offset, 3);
        assert!(config.presets.is_empty());
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config =
            EngineConfig::from_json(r#"{"top_selector": "Main", "presets": ["regions"]}"#)
                .unwrap();
        assert_eq!(config.top_selector, "Main");
        assert_eq!(config.presets, vec![Preset::Regions]);
        assert_eq!(config.fallback_insert_offset, 3);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"fallback_insert_offset": 1}}"#).unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.fallback_insert_offset, 1);
    }

    #[test]
    fn load_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ nope").unwrap();
        let err = EngineConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("invalid engine config"));
    }
}
