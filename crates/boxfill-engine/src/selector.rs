use boxfill_types::{OutboundKind, DIRECT_TAG};

use crate::config::EngineConfig;
use crate::document::Document;

/// What the top-selector reconciler did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorReport {
    pub kept: Vec<String>,
    pub dropped: Vec<String>,
    pub default: String,
}

/// Prune the top-level selector down to references that lead somewhere.
///
/// A member survives if it is `DIRECT`, or names an entry whose members are
/// non-empty and do not start with the fallback. With no routable nodes the
/// auto and manual groups are dropped too. `default` becomes the auto group
/// when nodes exist, otherwise `DIRECT`. If nothing survives the selector is
/// left with `DIRECT` alone.
///
/// Returns `None` when the document has no selector under the configured tag.
pub fn reconcile_top_selector(
    document: &mut Document,
    config: &EngineConfig,
    fallback: &str,
    routable_count: usize,
) -> Option<SelectorReport> {
    let top = document.get(&config.top_selector)?;
    if top.kind != OutboundKind::Selector {
        tracing::debug!(
            group = %config.top_selector,
            kind = %top.kind,
            "Top-level entry is not a selector, leaving it alone"
        );
        return None;
    }

    let mut kept = Vec::new();
    let mut dropped = Vec::new();
    for member in top.members.iter().flatten() {
        let leads_somewhere = member == DIRECT_TAG
            || document
                .get(member)
                .is_some_and(|entry| !entry.is_empty() && entry.first_member() != Some(fallback));
        let idle_group = routable_count == 0
            && (*member == config.auto_group || *member == config.manual_group);
        if leads_somewhere && !idle_group {
            kept.push(member.clone());
        } else {
            dropped.push(member.clone());
        }
    }

    if kept.is_empty() {
        tracing::warn!(group = %config.top_selector, "No selector member survived, keeping DIRECT");
        kept.push(DIRECT_TAG.to_string());
    }

    let default = if routable_count > 0 {
        config.auto_group.clone()
    } else {
        DIRECT_TAG.to_string()
    };

    tracing::info!(
        group = %config.top_selector,
        kept = kept.len(),
        dropped = dropped.len(),
        default = %default,
        "Reconciled top-level selector"
    );

    let top = document.get_mut(&config.top_selector)?;
    top.members = Some(kept.clone());
    top.default = Some(default.clone());

    Some(SelectorReport {
        kept,
        dropped,
        default,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxfill_types::Outbound;

    const AUTO: &str = "♻️ 自动选择";
    const MANUAL: &str = "🚀 手动切换";
    const TOP: &str = "🪜 Proxy";

    fn template(top_members: &[&str]) -> Document {
        Document::from_outbounds(vec![
            Outbound::new(TOP, OutboundKind::Selector).with_members(top_members.iter().copied()),
            Outbound::new(AUTO, OutboundKind::UrlTest).with_members(["n1", "n2"]),
            Outbound::new(MANUAL, OutboundKind::Selector).with_members(["n1", "n2"]),
            Outbound::new("HK", OutboundKind::UrlTest).with_members(["n1"]),
            Outbound::new("JP", OutboundKind::UrlTest).with_members(["DIRECT"]),
            Outbound::new("DIRECT", OutboundKind::Direct),
        ])
    }

    fn reconcile(doc: &mut Document, routable_count: usize) -> Option<SelectorReport> {
        reconcile_top_selector(doc, &EngineConfig::default(), "DIRECT", routable_count)
    }

    #[test]
    fn drops_groups_that_only_hold_the_fallback() {
        let mut doc = template(&[AUTO, MANUAL, "HK", "JP", "DIRECT"]);
        let report = reconcile(&mut doc, 2).unwrap();
        assert_eq!(report.kept, vec![AUTO, MANUAL, "HK", "DIRECT"]);
        assert_eq!(report.dropped, vec!["JP"]);
        assert_eq!(report.default, AUTO);

        let top = doc.get(TOP).unwrap();
        assert_eq!(top.members.as_ref().unwrap(), &report.kept);
        assert_eq!(top.default.as_deref(), Some(AUTO));
    }

    #[test]
    fn dangling_references_are_dropped() {
        let mut doc = template(&["Ghost", "HK"]);
        let report = reconcile(&mut doc, 1).unwrap();
        assert_eq!(report.kept, vec!["HK"]);
        assert_eq!(report.dropped, vec!["Ghost"]);
    }

    #[test]
    fn no_nodes_drops_auto_and_manual_and_defaults_direct() {
        let mut doc = template(&[AUTO, MANUAL, "HK", "DIRECT"]);
        let report = reconcile(&mut doc, 0).unwrap();
        assert_eq!(report.kept, vec!["HK", "DIRECT"]);
        assert_eq!(report.dropped, vec![AUTO, MANUAL]);
        assert_eq!(report.default, "DIRECT");
    }

    #[test]
    fn empty_result_falls_back_to_direct() {
        let mut doc = template(&["JP"]);
        let report = reconcile(&mut doc, 0).unwrap();
        assert_eq!(report.kept, vec!["DIRECT"]);
        assert_eq!(doc.get(TOP).unwrap().first_member(), Some("DIRECT"));
    }

    #[test]
    fn missing_or_non_selector_top_is_ignored() {
        let mut doc =
            Document::from_outbounds(vec![Outbound::new("Other", OutboundKind::Selector)]);
        assert!(reconcile(&mut doc, 1).is_none());

        let mut doc = Document::from_outbounds(vec![
            Outbound::new(TOP, OutboundKind::UrlTest).with_members(["Ghost"]),
        ]);
        assert!(reconcile(&mut doc, 1).is_none());
        assert_eq!(doc.get(TOP).unwrap().first_member(), Some("Ghost"));
    }

    #[test]
    fn configured_top_selector_tag_is_used() {
        let config = EngineConfig {
            top_selector: "Main".into(),
            ..EngineConfig::default()
        };
        let mut doc = Document::from_outbounds(vec![
            Outbound::new("Main", OutboundKind::Selector).with_members(["Ghost", "DIRECT"]),
        ]);
        let report = reconcile_top_selector(&mut doc, &config, "DIRECT", 0).unwrap();
        assert_eq!(report.kept, vec!["DIRECT"]);
    }
}
