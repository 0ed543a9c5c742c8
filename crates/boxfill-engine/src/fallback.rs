use boxfill_types::{is_builtin_tag, Outbound, OutboundKind, DNS_TAG};

use crate::document::Document;

/// What the fallback resolver did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FallbackReport {
    /// Groups that had no members and now point at the fallback.
    pub filled: Vec<String>,
    /// Index of the synthesized fallback entry, if one was inserted.
    pub inserted: Option<usize>,
}

/// Give every still-empty group the fallback as its sole member.
///
/// If the fallback was needed and nothing in the document carries its tag, a
/// `direct` entry is synthesized for it right after the first `DNS-OUT`
/// entry, or at `default_offset` when there is none. Running this twice is a
/// no-op the second time.
pub fn resolve_fallbacks(
    document: &mut Document,
    fallback: &str,
    default_offset: usize,
) -> FallbackReport {
    let mut report = FallbackReport::default();

    for entry in document.entries_mut() {
        if !entry.is_group() || !entry.is_empty() {
            continue;
        }
        tracing::debug!(
            group = %entry.tag,
            fallback = %fallback,
            "Group has no members, using fallback"
        );
        entry.members = Some(vec![fallback.to_string()]);
        if entry.kind == OutboundKind::Selector {
            entry.default = Some(fallback.to_string());
        }
        report.filled.push(entry.tag.clone());
    }

    if report.filled.is_empty() || is_builtin_tag(fallback) || document.contains(fallback) {
        return report;
    }

    let at = document
        .position(DNS_TAG)
        .map(|i| i + 1)
        .unwrap_or(default_offset);
    let at = document.insert(at, Outbound::new(fallback, OutboundKind::Direct));
    tracing::info!(fallback = %fallback, index = at, "Inserted fallback outbound");
    report.inserted = Some(at);
    report
}
