use std::collections::{BTreeMap, HashSet};

use regex::{Regex, RegexBuilder};
use sitcorpus_core::Category;

use crate::metrics::WarningItem;

const EXCERPT_RADIUS: usize = 30;
const DISPLAY_LIMIT: usize = 120;

/// One regex hit with its surrounding context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    pub value: String,
    pub start: usize,
    pub excerpt: String,
}

/// Category id to compiled pattern. Missing or invalid patterns map to `None`.
#[derive(Debug, Default)]
pub struct PatternSet {
    patterns: BTreeMap<String, Option<Regex>>,
}

impl PatternSet {
    /// Compile every catalog pattern case-insensitive and multi-line.
    pub fn compile(catalog: &[Category], warnings: &mut Vec<WarningItem>) -> Self {
        let mut patterns = BTreeMap::new();
        for category in catalog {
            let compiled = match category.regex.as_deref().map(str::trim) {
                None | Some("") => None,
                Some(pattern) => match RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .multi_line(true)
                    .build()
                {
                    Ok(regex) => Some(regex),
                    Err(err) => {
                        warnings.push(WarningItem {
                            code: "regex_invalid".to_string(),
                            path: format!("sits.{}.regex", category.id),
                            message: format!("pattern does not compile: {err}"),
                            hint: Some("category is evaluated as having no pattern".to_string()),
                        });
                        None
                    }
                },
            };
            patterns.insert(category.id.clone(), compiled);
        }
        Self { patterns }
    }

    pub fn contains(&self, sit_id: &str) -> bool {
        self.patterns.contains_key(sit_id)
    }

    pub fn get(&self, sit_id: &str) -> Option<&Regex> {
        self.patterns.get(sit_id).and_then(Option::as_ref)
    }

    /// All matches of the category's pattern; none without a pattern or text.
    pub fn find(&self, sit_id: &str, text: &str) -> Vec<PatternMatch> {
        match self.get(sit_id) {
            Some(regex) if !text.is_empty() => find_matches(regex, text),
            _ => Vec::new(),
        }
    }
}

pub fn find_matches(regex: &Regex, text: &str) -> Vec<PatternMatch> {
    regex
        .find_iter(text)
        .map(|found| PatternMatch {
            value: found.as_str().to_string(),
            start: found.start(),
            excerpt: excerpt(text, found.start(), found.end()),
        })
        .collect()
}

/// Up to `EXCERPT_RADIUS` characters either side of the match, newlines
/// flattened.
fn excerpt(text: &str, start: usize, end: usize) -> String {
    let from = text[..start]
        .char_indices()
        .rev()
        .nth(EXCERPT_RADIUS - 1)
        .map(|(index, _)| index)
        .unwrap_or(0);
    let to = text[end..]
        .char_indices()
        .nth(EXCERPT_RADIUS)
        .map(|(index, _)| end + index)
        .unwrap_or(text.len());
    text[from..to].replace('\n', " ")
}

/// Distinct non-empty match values rendered as `value ... excerpt`, each
/// capped at 120 characters.
pub fn sample_for_display(matches: &[PatternMatch], max_items: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for found in matches {
        let value = found.value.trim();
        if value.is_empty() || !seen.insert(value.to_string()) {
            continue;
        }
        let display = if found.excerpt.is_empty() {
            value.to_string()
        } else {
            format!("{value} ... {}", found.excerpt)
        };
        out.push(truncate_display(&display));
        if out.len() >= max_items {
            break;
        }
    }
    out
}

fn truncate_display(display: &str) -> String {
    if display.chars().count() <= DISPLAY_LIMIT {
        return display.to_string();
    }
    let head: String = display.chars().take(DISPLAY_LIMIT - 3).collect();
    format!("{head}...")
}
