use std::collections::HashMap;

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::{
    error::{Error, Result},
    models::{GraphEntry, Item, ItemCategory},
};

pub const STEP_CODE_TYPE: &str = "STEP";

/// Deterministic, namespace-scoped codes for mirrored rows.
///
/// Codes are pure functions of their inputs, so upserts never need to
/// remember ids assigned by the mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityResolver {
    namespace: String,
}

impl IdentityResolver {
    pub fn new(namespace: impl Into<String>) -> Result<Self> {
        let namespace = namespace.into().trim().to_string();
        if namespace.is_empty() {
            return Err(Error::MissingNamespace("PANELGRAPH_NAMESPACE"));
        }
        Ok(Self { namespace })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// `{namespace}_{category}-{name}`, or for actions
    /// `{namespace}_ACTION-{panel}-{name}`.
    pub fn code(&self, category: ItemCategory, name: &str, panel_name: Option<&str>) -> String {
        let name = normalize_name(name);
        let composed = match (category, panel_name) {
            (ItemCategory::Action, Some(panel)) => {
                format!("ACTION-{}-{name}", normalize_name(panel))
            }
            _ => format!("{}-{name}", category.as_str()),
        };
        self.scoped(&composed)
    }

    /// Codes for every item, keyed by item id. An action is scoped by the
    /// first panel whose `child_actions` lists it.
    pub fn item_codes(&self, items: &[Item], entries: &[GraphEntry]) -> HashMap<String, String> {
        let names: HashMap<&str, &str> = items
            .iter()
            .map(|item| (item.item_id.as_str(), item.name.as_str()))
            .collect();
        let mut owner: HashMap<&str, &str> = HashMap::new();
        for entry in entries {
            for action in &entry.child_actions {
                owner
                    .entry(action.as_str())
                    .or_insert(entry.parent_panel.as_str());
            }
        }

        items
            .iter()
            .map(|item| {
                let panel_name = match item.item_category {
                    ItemCategory::Action => owner
                        .get(item.item_id.as_str())
                        .and_then(|panel| names.get(panel).copied()),
                    _ => None,
                };
                (
                    item.item_id.clone(),
                    self.code(item.item_category, &item.name, panel_name),
                )
            })
            .collect()
    }

    pub fn step_code(&self, session_record_id: &str, step_id: u64) -> String {
        self.scoped(&format!("{session_record_id}-{step_id}-{STEP_CODE_TYPE}"))
    }

    pub fn page_code(&self, panel_code: &str, page_number: u32) -> String {
        format!("{panel_code}-PAGE-{page_number}")
    }

    pub fn relation_code(&self, child_code: &str, parent_code: &str) -> String {
        format!("{child_code}__{parent_code}")
    }

    fn scoped(&self, composed: &str) -> String {
        format!("{}_{composed}", self.namespace)
    }
}

/// Strips diacritics, case-folds, collapses whitespace and rewrites a trailing
/// `(n)` into `-n`.
pub fn normalize_name(input: &str) -> String {
    let folded: String = input
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            'đ' | 'Đ' => 'd',
            other => other,
        })
        .flat_map(char::to_lowercase)
        .collect();

    let collapsed = folded.split_whitespace().collect::<Vec<_>>().join(" ");

    match split_duplicate_suffix(&collapsed) {
        Some((base, n)) => format!("{}-{n}", base.trim_end()),
        None => collapsed,
    }
}

fn split_duplicate_suffix(name: &str) -> Option<(&str, &str)> {
    let inner = name.strip_suffix(')')?;
    let open = inner.rfind('(')?;
    let digits = &inner[open + 1..];
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((&inner[..open], digits))
}
