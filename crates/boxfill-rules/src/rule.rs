use regex::{Regex, RegexBuilder};

use boxfill_types::{BoxfillError, Result};

/// How a rule selects nodes by tag.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Every node.
    All,
    /// Tags containing at least one keyword. Keywords are stored lowercased
    /// when `case_insensitive` is set.
    Keywords {
        keywords: Vec<String>,
        case_insensitive: bool,
    },
    /// Tags the pattern finds a match in. Case sensitivity is compiled in.
    Pattern {
        regex: Regex,
        case_insensitive: bool,
    },
}

impl Matcher {
    pub fn matches(&self, tag: &str) -> bool {
        match self {
            Matcher::All => true,
            Matcher::Keywords {
                keywords,
                case_insensitive: true,
            } => {
                let lower = tag.to_lowercase();
                keywords.iter().any(|kw| lower.contains(kw.as_str()))
            }
            Matcher::Keywords { keywords, .. } => {
                keywords.iter().any(|kw| tag.contains(kw.as_str()))
            }
            Matcher::Pattern { regex, .. } => regex.is_match(tag),
        }
    }

    /// The filter type keyword used in rule strings.
    pub fn filter_type(&self) -> &'static str {
        match self {
            Matcher::All => "all",
            Matcher::Keywords { .. } => "kw",
            Matcher::Pattern { .. } => "rgx",
        }
    }
}

/// A single parsed rule: which group to fill and how to pick its members.
#[derive(Debug, Clone)]
pub struct Rule {
    pub target: String,
    pub matcher: Matcher,
}

impl Rule {
    pub fn all(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            matcher: Matcher::All,
        }
    }

    /// Build a keyword rule. An empty keyword is a substring of every tag, so
    /// it makes the rule match all nodes.
    pub fn keywords<I, S>(target: impl Into<String>, keywords: I, case_insensitive: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(|kw| {
                if case_insensitive {
                    kw.as_ref().to_lowercase()
                } else {
                    kw.as_ref().to_string()
                }
            })
            .collect();
        Self {
            target: target.into(),
            matcher: Matcher::Keywords {
                keywords,
                case_insensitive,
            },
        }
    }

    /// Compile a pattern rule.
    pub fn pattern(
        target: impl Into<String>,
        pattern: &str,
        case_insensitive: bool,
    ) -> Result<Self> {
        let target = target.into();
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| BoxfillError::RuleClause {
                clause: target.clone(),
                message: format!("invalid pattern '{pattern}': {e}"),
            })?;
        Ok(Self {
            target,
            matcher: Matcher::Pattern {
                regex,
                case_insensitive,
            },
        })
    }

    pub fn case_insensitive(&self) -> bool {
        match &self.matcher {
            Matcher::All => false,
            Matcher::Keywords {
                case_insensitive, ..
            }
            | Matcher::Pattern {
                case_insensitive, ..
            } => *case_insensitive,
        }
    }
}
