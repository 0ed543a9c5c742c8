//! Built-in rule tables for common template layouts.
//!
//! Templates that group nodes by region used to hardcode one conditional per
//! group. The same matching is expressed here as ordered data and compiled into
//! ordinary [`Rule`]s, so presets go through the same populator as parsed rules.

use serde::{Deserialize, Serialize};

use crate::rule::Rule;

/// A named preset rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Region groups (HK, TW, JP, SG, US, KR) plus the all-nodes groups.
    Regions,
}

impl Preset {
    pub fn name(self) -> &'static str {
        match self {
            Preset::Regions => "regions",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "regions" => Some(Preset::Regions),
            _ => None,
        }
    }
}

/// Groups that receive every routable node.
pub const ALL_NODE_GROUPS: &[&str] = &["🌐 其他节点", "♻️ 自动选择"];

/// Region groups and their (case-insensitive) tag patterns, in application order.
pub const REGION_TABLE: &[(&str, &str)] = &[
    ("🇭🇰 香港自动", "港|hk|hongkong|kong kong|hong kong|Hong|🇭🇰"),
    ("🇨🇳 台湾自动", "台|tw|taiwan|tai|🇨🇳|🇹🇼"),
    ("🇯🇵 日本自动", "日本|jp|japan|Japan|🇯🇵"),
    ("🇸🇬 狮城自动", "新|sg|singapore|Singapore|🇸🇬"),
    ("🇺🇲 美国节点", "美|us|unitedstates|united states|States|🇺🇸"),
    ("🇺🇲 美国自动", "美|us|unitedstates|united states|States|🇺🇸"),
    ("🇰🇷 韩国节点", "韩|kr|korea|Korea|🇰🇷"),
    ("🇰🇷 韩国自动", "韩|kr|korea|Korea|🇰🇷"),
];

/// Compile a preset into rules.
pub fn preset_rules(preset: Preset) -> Vec<Rule> {
    match preset {
        Preset::Regions => {
            let mut rules: Vec<Rule> = ALL_NODE_GROUPS.iter().map(|g| Rule::all(*g)).collect();
            for (group, pattern) in REGION_TABLE {
                match Rule::pattern(*group, pattern, true) {
                    Ok(rule) => rules.push(rule),
                    Err(e) => {
                        tracing::error!(group = %group, error = %e, "Invalid preset pattern")
                    }
                }
            }
            rules
        }
    }
}
