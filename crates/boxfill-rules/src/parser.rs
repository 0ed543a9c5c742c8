use winnow::combinator::{opt, preceded};
use winnow::token::{rest, take_till};
use winnow::{ModalResult, Parser};

use boxfill_types::{BoxfillError, Diagnostic, Result};

use crate::rule::Rule;
use crate::{CASE_INSENSITIVE_MARKER, RULE_SEPARATOR, TAG_SEPARATOR};

/// Rules parsed from a rule string, plus one diagnostic per dropped clause.
#[derive(Debug, Clone, Default)]
pub struct ParsedRules {
    pub rules: Vec<Rule>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse a `FilterSpec` into its type keyword and the raw value after the
/// first `:`. Later colons belong to the value.
fn filter_spec<'i>(input: &mut &'i str) -> ModalResult<(&'i str, &'i str)> {
    let kind = take_till(0.., ':').parse_next(input)?;
    let value = opt(preceded(':', rest)).parse_next(input)?;
    Ok((kind, value.unwrap_or_default()))
}

fn clause_error(clause: &str, message: impl Into<String>) -> BoxfillError {
    BoxfillError::RuleClause {
        clause: clause.to_string(),
        message: message.into(),
    }
}

/// Parse one `GroupTag🏷️FilterSpec` clause.
pub fn parse_clause(clause: &str) -> Result<Rule> {
    let (group, spec) = clause
        .split_once(TAG_SEPARATOR)
        .ok_or_else(|| clause_error(clause, "missing group tag separator"))?;
    if spec.contains(TAG_SEPARATOR) {
        return Err(clause_error(clause, "more than one group tag separator"));
    }

    let (kind, value) = filter_spec
        .parse(spec)
        .map_err(|e| clause_error(clause, format!("malformed filter spec: {e}")))?;
    let kind = kind.to_lowercase();

    if kind == "all" {
        return Ok(Rule::all(group));
    }

    let (value, case_insensitive) = match value.strip_prefix(CASE_INSENSITIVE_MARKER) {
        Some(stripped) => (stripped, true),
        None => (value, false),
    };

    match kind.as_str() {
        "kw" => Ok(Rule::keywords(group, value.split('|'), case_insensitive)),
        "rgx" => Rule::pattern(group, value, case_insensitive)
            .map_err(|e| clause_error(clause, inner_message(e))),
        other => Err(clause_error(
            clause,
            format!("unsupported filter type '{other}'"),
        )),
    }
}

fn inner_message(err: BoxfillError) -> String {
    match err {
        BoxfillError::RuleClause { message, .. } => message,
        other => other.to_string(),
    }
}

/// Parse a full rule string.
///
/// Never fails: malformed clauses are logged, recorded as diagnostics and
/// skipped. An empty string yields no rules.
pub fn parse_rules(input: &str) -> ParsedRules {
    let mut parsed = ParsedRules::default();
    if input.is_empty() {
        return parsed;
    }

    for clause in input.split(RULE_SEPARATOR) {
        match parse_clause(clause) {
            Ok(rule) => {
                tracing::debug!(
                    group = %rule.target,
                    filter = rule.matcher.filter_type(),
                    case_insensitive = rule.case_insensitive(),
                    "Parsed rule"
                );
                parsed.rules.push(rule);
            }
            Err(e) => {
                tracing::warn!(clause = %clause, error = %e, "Skipping rule clause");
                let mut diag = Diagnostic::from(&e);
                if let Some((group, _)) = clause.split_once(TAG_SEPARATOR) {
                    diag = diag.with_tag(group);
                }
                parsed.diagnostics.push(diag);
            }
        }
    }

    parsed
}
