//! Human-readable labels for a policy's rule table

use std::collections::HashMap;
use std::fmt;

use num_bigint::BigUint;

use crate::types::PolicyRule;

/// One display group of rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleLabel {
    /// Group heading: the rule's `group`, else the first dotted key segment
    pub heading: String,
    /// `leaf = value` entries in first-appearance order
    pub entries: Vec<String>,
}

impl fmt::Display for RuleLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entries.as_slice() {
            [single] if single.starts_with(&format!("{} = ", self.heading)) => f.write_str(single),
            entries => write!(f, "{}: {}", self.heading, entries.join(", ")),
        }
    }
}

fn heading_and_leaf(rule: &PolicyRule) -> (&str, &str) {
    let key = rule.key.as_str();
    if rule.group.is_empty() {
        key.split_once('.').unwrap_or((key, key))
    } else {
        (rule.group.as_str(), key)
    }
}

fn render_value(bytes: &[u8]) -> String {
    let value = BigUint::from_bytes_be(bytes);
    if value < crate::field::modulus() {
        value.to_str_radix(10)
    } else {
        format!("0x{}", hex::encode(bytes))
    }
}

/// Group rules into display labels
///
/// Headings appear in first-appearance order. Rules sharing a key collapse
/// into one `[a, b, ..]` entry ordered by rule index.
pub fn format_rules(rules: &[PolicyRule]) -> Vec<RuleLabel> {
    let mut headings: Vec<(&str, Vec<&str>)> = Vec::new();
    let mut heading_pos: HashMap<&str, usize> = HashMap::new();
    let mut by_key: HashMap<&str, Vec<usize>> = HashMap::new();

    for (i, rule) in rules.iter().enumerate() {
        let slots = by_key.entry(rule.key.as_str()).or_default();
        slots.push(i);
        if slots.len() > 1 {
            continue;
        }
        let (heading, _) = heading_and_leaf(rule);
        let pos = *heading_pos.entry(heading).or_insert_with(|| {
            headings.push((heading, Vec::new()));
            headings.len() - 1
        });
        headings[pos].1.push(rule.key.as_str());
    }

    headings
        .into_iter()
        .map(|(heading, keys)| {
            let entries = keys
                .into_iter()
                .filter_map(|key| by_key.remove(key))
                .map(|mut slots| {
                    // stable: equal indices keep table order
                    slots.sort_by_key(|&i| rules[i].index);
                    let (_, leaf) = heading_and_leaf(&rules[slots[0]]);
                    let values: Vec<String> =
                        slots.iter().map(|&i| render_value(&rules[i].value)).collect();
                    match values.as_slice() {
                        [single] => format!("{leaf} = {single}"),
                        many => format!("{leaf} = [{}]", many.join(", ")),
                    }
                })
                .collect();
            RuleLabel {
                heading: heading.to_string(),
                entries,
            }
        })
        .collect()
}
