use std::collections::BTreeSet;

use boxfill_rules::{classify, Rule};
use boxfill_types::{Diagnostic, DiagnosticKind, Node, OutboundKind};

use crate::document::Document;

/// What the populator did.
#[derive(Debug, Clone, Default)]
pub struct PopulateReport {
    /// Distinct groups that received at least one member.
    pub populated: usize,
    /// Rule targets with no matching entry, in rule order.
    pub skipped: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Apply `rules` in order, replacing the members of each target group with
/// the routable nodes it matches.
///
/// A rule that matches nothing leaves its group as it was, apart from
/// normalising an absent member list to an empty one. Later rules for the
/// same group win when they match.
pub fn populate_groups(
    document: &mut Document,
    rules: &[Rule],
    routable: &[Node],
) -> PopulateReport {
    let mut report = PopulateReport::default();
    let mut populated = BTreeSet::new();

    for rule in rules {
        let Some(entry) = document.get_mut(&rule.target) else {
            tracing::warn!(group = %rule.target, "Rule targets a group missing from the template");
            report.skipped.push(rule.target.clone());
            report.diagnostics.push(
                Diagnostic::warning(
                    DiagnosticKind::GroupLookup,
                    format!("group '{}' not found in template", rule.target),
                )
                .with_tag(&rule.target),
            );
            continue;
        };

        entry.members.get_or_insert_with(Vec::new);
        let matched = classify(routable, rule);
        if matched.is_empty() {
            tracing::debug!(
                group = %rule.target,
                filter = rule.matcher.filter_type(),
                "No nodes matched"
            );
            continue;
        }

        tracing::info!(
            group = %rule.target,
            filter = rule.matcher.filter_type(),
            count = matched.len(),
            "Populated group"
        );
        if entry.kind == OutboundKind::Selector && entry.lacks_default() {
            entry.default = Some(matched[0].clone());
        }
        entry.members = Some(matched);
        populated.insert(rule.target.clone());
    }

    report.populated = populated.len();
    report
}
