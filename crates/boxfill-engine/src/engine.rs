//! The engine driver: parameters and nodes in, configuration document out.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use futures::FutureExt;
use tracing::Instrument;

use boxfill_rules::{parse_rules, preset_rules, Rule};
use boxfill_types::{BoxfillError, Diagnostic, DiagnosticKind, ErrorReport, Node, Result};

use crate::config::EngineConfig;
use crate::document::Document;
use crate::fallback::{resolve_fallbacks, FallbackReport};
use crate::params::Parameters;
use crate::populate::{populate_groups, PopulateReport};
use crate::selector::{reconcile_top_selector, SelectorReport};
use crate::source::NodeSource;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Drives one template fill. Holds only configuration, so one engine can
/// serve any number of concurrent runs.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

/// Everything a completed run did, including recovered problems.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub rules: usize,
    pub routable_nodes: usize,
    pub populate: PopulateReport,
    pub fallback: FallbackReport,
    pub selector: Option<SelectorReport>,
    /// Document repairs, dropped rule clauses and group lookup misses, in
    /// the order they happened.
    pub diagnostics: Vec<Diagnostic>,
}

/// The result of [`Engine::generate`]. Either way there is a JSON document.
#[derive(Debug)]
pub enum GenerateOutcome {
    Success { config: String, report: RunReport },
    Failure(ErrorReport),
}

impl GenerateOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, GenerateOutcome::Success { .. })
    }

    /// The pretty-printed configuration, or the pretty-printed error report.
    pub fn into_json(self) -> String {
        match self {
            GenerateOutcome::Success { config, .. } => config,
            GenerateOutcome::Failure(report) => report.to_json(),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Preset rules followed by the rules parsed from `input`.
    pub fn rules(&self, input: &str) -> (Vec<Rule>, Vec<Diagnostic>) {
        let mut rules: Vec<Rule> = self
            .config
            .presets
            .iter()
            .flat_map(|p| preset_rules(*p))
            .collect();
        let parsed = parse_rules(input);
        let mut diagnostics = parsed.diagnostics;
        if parsed.rules.is_empty() {
            let message = if input.is_empty() {
                "rule string is empty; no groups will be populated from it"
            } else {
                "no valid rule clause in rule string"
            };
            tracing::warn!("{message}");
            diagnostics.push(Diagnostic::warning(DiagnosticKind::EmptyRules, message));
        }
        rules.extend(parsed.rules);
        (rules, diagnostics)
    }

    /// Fill `document` in place: populate, fall back, reconcile, append nodes.
    pub fn run(
        &self,
        params: &Parameters,
        nodes: Vec<Node>,
        document: &mut Document,
    ) -> Result<RunReport> {
        params.validate()?;

        let mut report = RunReport {
            diagnostics: document.take_diagnostics(),
            ..RunReport::default()
        };

        let (rules, rule_diagnostics) = self.rules(&params.rules);
        report.rules = rules.len();
        report.diagnostics.extend(rule_diagnostics);

        let routable: Vec<Node> = nodes.into_iter().filter(Node::is_routable).collect();
        report.routable_nodes = routable.len();
        tracing::info!(rules = report.rules, nodes = report.routable_nodes, "Filling template");

        report.populate = populate_groups(document, &rules, &routable);
        report.diagnostics.append(&mut report.populate.diagnostics);

        let fallback = &params.fallback_tag;
        report.fallback = resolve_fallbacks(document, fallback, self.config.fallback_insert_offset);
        if let Some(at) = report.fallback.inserted {
            let message = format!("inserted direct outbound for fallback at index {at}");
            let diag = Diagnostic::info(DiagnosticKind::Fallback, message);
            report.diagnostics.push(diag.with_tag(fallback.as_str()));
        }
        report.selector = reconcile_top_selector(document, &self.config, fallback, routable.len());

        for node in &routable {
            document.push(node.to_outbound());
        }

        tracing::info!(
            populated = report.populate.populated,
            fallbacks = report.fallback.filled.len(),
            outbounds = document.len(),
            "Template filled"
        );
        Ok(report)
    }

    /// Parse `template`, fill it and serialize the result.
    pub fn render(
        &self,
        params: &Parameters,
        nodes: Vec<Node>,
        template: &str,
    ) -> Result<(String, RunReport)> {
        let mut document = Document::parse(template)?;
        let report = self.run(params, nodes, &mut document)?;
        let config = document.to_json_pretty()?;
        Ok((config, report))
    }

    /// The full invocation. Never fails: every error, and any panic in the
    /// node source or while filling the template, comes back as an
    /// [`ErrorReport`].
    pub async fn generate(
        &self,
        fragment: &str,
        template: &str,
        source: &dyn NodeSource,
    ) -> GenerateOutcome {
        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("generate", run_id = %run_id);
        match self.try_generate(fragment, template, source).instrument(span).await {
            Ok((config, report)) => GenerateOutcome::Success { config, report },
            Err(e) => {
                tracing::error!(run_id = %run_id, error = %e, "Configuration generation failed");
                GenerateOutcome::Failure(ErrorReport::from_error(&e))
            }
        }
    }

    async fn try_generate(
        &self,
        fragment: &str,
        template: &str,
        source: &dyn NodeSource,
    ) -> Result<(String, RunReport)> {
        let params = Parameters::parse(fragment)?;
        let request = params.node_request();
        let nodes = AssertUnwindSafe(source.fetch(&request))
            .catch_unwind()
            .await
            .map_err(|payload| panic_error("fetching nodes", &*payload))??;
        tracing::info!(source = %request.locator, count = nodes.len(), "Fetched nodes");

        panic::catch_unwind(AssertUnwindSafe(|| self.render(&params, nodes, template)))
            .map_err(|payload| panic_error("filling template", &*payload))?
    }
}

fn panic_error(stage: &str, payload: &(dyn Any + Send)) -> BoxfillError {
    BoxfillError::Other(format!("panic while {stage}: {}", panic_message(payload)))
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{NodeLocator, StaticNodeSource};
    use boxfill_rules::Preset;
    use boxfill_types::Severity;

    const TEMPLATE: &str = r#"{
        "outbounds": [
            {
                "tag": "🪜 Proxy",
                "type": "selector",
                "outbounds": ["♻️ 自动选择", "Region", "DIRECT"]
            },
            {"tag": "♻️ 自动选择", "type": "urltest"},
            {"tag": "Region", "type": "selector"},
            {"tag": "DIRECT", "type": "direct"}
        ]
    }"#;

    fn params(rules: &str) -> Parameters {
        Parameters::new(NodeLocator::Subscription { name: "main".into() }, rules)
    }

    #[test]
    fn run_appends_routable_nodes_in_order() {
        let mut doc = Document::parse(TEMPLATE).unwrap();
        let nodes = vec![
            Node::new("HK-1", "trojan"),
            Node::new("DIRECT", "direct"),
            Node::new("US-1", "vmess"),
        ];
        let report = Engine::default()
            .run(&params("♻️ 自动选择🏷️all🕳️Region🏷️kw:HK"), nodes, &mut doc)
            .unwrap();
        assert_eq!(report.routable_nodes, 2);
        assert_eq!(report.populate.populated, 2);
        let tags: Vec<_> = doc.entries().iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, ["🪜 Proxy", "♻️ 自动选择", "Region", "DIRECT", "HK-1", "US-1"]);
    }

    #[test]
    fn empty_rule_string_warns() {
        let (rules, diagnostics) = Engine::default().rules("");
        assert!(rules.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::EmptyRules);
    }

    #[test]
    fn presets_come_before_parsed_rules() {
        let engine = Engine::new(EngineConfig {
            presets: vec![Preset::Regions],
            ..EngineConfig::default()
        });
        let (rules, diagnostics) = engine.rules("X🏷️all");
        assert!(diagnostics.is_empty());
        assert_eq!(rules.last().unwrap().target, "X");
        assert_eq!(rules[0].target, "🌐 其他节点");
    }

    #[test]
    fn run_rejects_invalid_parameters() {
        let mut doc = Document::parse(TEMPLATE).unwrap();
        let bad = Parameters::new(NodeLocator::Profile { name: String::new() }, "");
        assert!(Engine::default().run(&bad, Vec::new(), &mut doc).is_err());
    }

    #[test]
    fn panic_message_extracts_payload() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*payload), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*payload), "owned");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(&*payload), "unknown panic payload");
        let payload: Box<dyn Any + Send> = Box::new("index out of range");
        assert_eq!(
            panic_error("filling template", &*payload).to_string(),
            "panic while filling template: index out of range"
        );
    }

    #[test]
    fn inserted_fallback_is_reported() {
        let mut doc = Document::parse(TEMPLATE).unwrap();
        let params = params("").with_fallback("Compat");
        let report = Engine::default().run(&params, Vec::new(), &mut doc).unwrap();
        assert_eq!(report.fallback.inserted, Some(3));
        let info = report.diagnostics.last().unwrap();
        assert_eq!(info.kind, DiagnosticKind::Fallback);
        assert_eq!(info.severity, Severity::Info);
        assert_eq!(info.tag.as_deref(), Some("Compat"));
    }

    #[tokio::test]
    async fn generate_reports_parameter_errors() {
        let source = StaticNodeSource::default();
        let outcome = Engine::default()
            .generate("#name=x&outbound=a", TEMPLATE, &source)
            .await;
        let GenerateOutcome::Failure(report) = outcome else {
            panic!("expected failure");
        };
        assert!(report.error.starts_with("Configuration generation failed: "));
        assert!(report.error.contains("'type'"));
    }

    #[tokio::test]
    async fn generate_success_is_pretty_json() {
        let source = StaticNodeSource::new(vec![Node::new("HK-1", "trojan")]);
        let outcome = Engine::default()
            .generate("#type=0&name=main&outbound=Region🏷️all", TEMPLATE, &source)
            .await;
        assert!(outcome.is_success());
        let json = outcome.into_json();
        assert!(json.contains("\n  \"outbounds\""));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["outbounds"][2]["outbounds"], serde_json::json!(["HK-1"]));
    }
}
