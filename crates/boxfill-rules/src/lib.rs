//! Rule-string parser and node classifier for boxfill group rules.
//!
//! A rule string assigns nodes to template groups:
//!
//! ```text
//! RuleString  ::= Clause ( "🕳️" Clause )*
//! Clause      ::= GroupTag "🏷️" FilterSpec
//! FilterSpec  ::= "all" | "kw:" Marker? Keyword ( "|" Keyword )* | "rgx:" Marker? Pattern
//! Marker      ::= "ℹ️"                      (case-insensitive matching)
//! ```
//!
//! Malformed clauses are dropped with a [`Diagnostic`](boxfill_types::Diagnostic)
//! instead of failing the whole string.
//!
//! # Example
//! ```
//! use boxfill_types::Node;
//!
//! let parsed = boxfill_rules::parse_rules("Region🏷️kw:HK|Hong");
//! assert_eq!(parsed.rules.len(), 1);
//!
//! let nodes = vec![Node::new("HK-1", "trojan"), Node::new("US-1", "trojan")];
//! assert_eq!(boxfill_rules::classify(&nodes, &parsed.rules[0]), vec!["HK-1"]);
//! ```

mod classify;
mod parser;
pub mod presets;
mod rule;

pub use classify::classify;
pub use parser::{parse_clause, parse_rules, ParsedRules};
pub use presets::{preset_rules, Preset};
pub use rule::{Matcher, Rule};

/// Separates rule clauses.
pub const RULE_SEPARATOR: &str = "\u{1F573}\u{FE0F}";

/// Separates a clause's group tag from its filter spec.
pub const TAG_SEPARATOR: &str = "\u{1F3F7}\u{FE0F}";

/// Prefix on a `kw`/`rgx` value that turns on case-insensitive matching.
pub const CASE_INSENSITIVE_MARKER: &str = "\u{2139}\u{FE0F}";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators_match_their_glyphs() {
        assert_eq!(RULE_SEPARATOR, "🕳️");
        assert_eq!(TAG_SEPARATOR, "🏷️");
        assert_eq!(CASE_INSENSITIVE_MARKER, "ℹ️");
    }
}
