//! Path exclusion rules for placeholder substitution
//!
//! Rules are written as `glob:<pattern>` or `regex:<pattern>`. A rule without
//! a scheme prefix is a glob. Rules are matched against the file path relative
//! to the chart source folder, using `/` as separator on every platform.
//!
//! Glob semantics: `*` and `?` never cross a `/`. `**/` spans one or more
//! directories, so `**/*.json` does not match a top-level `a.json`.
//! `{a,b}` alternatives may be nested. Regex rules must match the whole path.

use glob::{MatchOptions, Pattern};
use regex::Regex;
use std::path::Path;

use crate::error::{CoreError, Result};

const GLOB_PREFIX: &str = "glob:";
const REGEX_PREFIX: &str = "regex:";

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A single exclusion rule
#[derive(Debug, Clone)]
pub enum ExclusionRule {
    /// One pattern per expanded `{a,b}` alternative
    Glob { source: String, patterns: Vec<Pattern> },
    Regex { source: String, regex: Regex },
}

impl ExclusionRule {
    /// Parse a rule, implying `glob:` when no scheme is given
    pub fn parse(rule: &str) -> Result<Self> {
        if let Some(expr) = rule.strip_prefix(REGEX_PREFIX) {
            let regex = Regex::new(&format!("^(?:{})$", expr)).map_err(|e| {
                CoreError::InvalidExclusion {
                    pattern: rule.to_string(),
                    message: e.to_string(),
                }
            })?;
            return Ok(ExclusionRule::Regex {
                source: rule.to_string(),
                regex,
            });
        }

        let invalid = |message: String| CoreError::InvalidExclusion {
            pattern: rule.to_string(),
            message,
        };
        let expr = rule.strip_prefix(GLOB_PREFIX).unwrap_or(rule);
        let patterns = expand_braces(expr)
            .map_err(|m| invalid(m.to_string()))?
            .iter()
            .map(|alt| {
                // `**/` spans at least one directory
                Pattern::new(&alt.replace("**/", "**/*/")).map_err(|e| invalid(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ExclusionRule::Glob {
            source: rule.to_string(),
            patterns,
        })
    }

    /// The rule as it was written
    pub fn as_str(&self) -> &str {
        match self {
            ExclusionRule::Glob { source, .. } | ExclusionRule::Regex { source, .. } => source,
        }
    }

    /// Whether a relative path matches this rule
    pub fn matches(&self, relative: &Path) -> bool {
        let normalized = normalize(relative);
        match self {
            ExclusionRule::Glob { patterns, .. } => patterns
                .iter()
                .any(|p| p.matches_with(&normalized, GLOB_OPTIONS)),
            ExclusionRule::Regex { regex, .. } => regex.is_match(&normalized),
        }
    }
}

/// A set of exclusion rules
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    rules: Vec<ExclusionRule>,
}

impl ExclusionSet {
    /// Parse every rule; the first invalid rule fails the whole set
    pub fn parse<S: AsRef<str>>(rules: &[S]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|r| ExclusionRule::parse(r.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// The first rule matching the path, if any
    pub fn matching_rule(&self, relative: &Path) -> Option<&ExclusionRule> {
        self.rules.iter().find(|r| r.matches(relative))
    }

    pub fn is_excluded(&self, relative: &Path) -> bool {
        self.matching_rule(relative).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}

/// Expand `{a,b}` groups into every alternative, left to right
fn expand_braces(expr: &str) -> std::result::Result<Vec<String>, &'static str> {
    let Some(open) = expr.find('{') else {
        if expr.contains('}') {
            return Err("unmatched '}'");
        }
        return Ok(vec![expr.to_string()]);
    };

    let mut depth = 0;
    let mut close = None;
    let mut splits = Vec::new();
    for (i, c) in expr[open..].char_indices().map(|(i, c)| (i + open, c)) {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(i);
                    break;
                }
            }
            ',' if depth == 1 => splits.push(i),
            _ => {}
        }
    }
    let close = close.ok_or("missing '}'")?;

    let prefix = &expr[..open];
    if prefix.contains('}') {
        return Err("unmatched '}'");
    }
    let suffix = &expr[close + 1..];
    let mut bounds = vec![open];
    bounds.extend(splits);
    bounds.push(close);

    let mut expanded = Vec::new();
    for pair in bounds.windows(2) {
        let alternative = &expr[pair[0] + 1..pair[1]];
        for tail in expand_braces(&format!("{alternative}{suffix}"))? {
            expanded.push(format!("{prefix}{tail}"));
        }
    }
    Ok(expanded)
}

fn normalize(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
