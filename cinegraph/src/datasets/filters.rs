//! Structural predicates applied to raw lines before parsing.
//!
//! A filter only looks at a couple of fields and never fails: a line it
//! cannot inspect is simply rejected.

use crate::config::FilterRules;
use crate::parser::fields::{self, COMMA, TAB};

/// Movies whose region or language is in the allowed lists.
pub fn movie_line(line: &str, rules: &FilterRules) -> bool {
    let [region, language] = fields::fields(line, TAB, [3, 4]);
    matches_any(region, &rules.regions) || matches_any(language, &rules.languages)
}

/// Role links with a category that produces a graph edge.
pub fn role_line(line: &str, rules: &FilterRules) -> bool {
    matches_any(fields::field(line, TAB, 3), &rules.roles)
}

/// Tag scores whose relevance (last field) is strictly above the threshold.
pub fn tag_score_line(line: &str, rules: &FilterRules) -> bool {
    fields::last_field(line, COMMA)
        .and_then(|value| value.trim().parse::<f64>().ok())
        .is_some_and(|relevance| relevance > rules.relevance_threshold)
}

fn matches_any(value: Option<&str>, allowed: &[String]) -> bool {
    value.is_some_and(|v| allowed.iter().any(|a| a.eq_ignore_ascii_case(v)))
}
