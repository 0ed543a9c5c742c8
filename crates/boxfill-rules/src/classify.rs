use boxfill_types::Node;

use crate::rule::Rule;

/// Tags of the nodes matched by `rule`, in input order.
///
/// Untagged nodes never match. Callers are expected to pass routable nodes only.
pub fn classify(nodes: &[Node], rule: &Rule) -> Vec<String> {
    nodes
        .iter()
        .filter_map(Node::tag)
        .filter(|tag| rule.matcher.matches(tag))
        .map(String::from)
        .collect()
}
