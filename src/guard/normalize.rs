use serde::{Deserialize, Serialize};

/// A rule list as it appears in configuration: one pattern or several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawList {
    One(String),
    Many(Vec<String>),
}

/// Turn a configured list into trimmed, non-empty patterns, keeping order.
/// Patterns are not validated here.
pub fn normalize_list(list: Option<&RawList>) -> Vec<String> {
    match list {
        None => Vec::new(),
        Some(RawList::One(value)) => {
            let value = value.trim();
            if value.is_empty() {
                Vec::new()
            } else {
                vec![value.to_string()]
            }
        }
        Some(RawList::Many(values)) => values
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect(),
    }
}
