//! Relational mirror → local snapshot.
//!
//! Only published rows are pulled. Foreign keys are resolved through the
//! identity codes; a row whose referenced code has no local id is skipped.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    identity::IdentityResolver,
    mirror::{self, ItemRow, PageRow, RelationRow, StepRow, ValidationRow},
    models::{
        GraphEntry, ItemCategory, Page, PageRef, Step, ValidationRecord, RECORD_SCHEMA_VERSION,
    },
    pool::ConnectionPool,
    stores::LocalStores,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadRole {
    #[default]
    Default,
    Draw,
}

impl LoadRole {
    /// `draw` (any case) selects the preserve-biased pull; anything else is
    /// the full overwrite.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("draw") {
            Self::Draw
        } else {
            Self::Default
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Draw => "draw",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    pub namespace: String,
    pub role: LoadRole,
    pub items: usize,
    pub graph_entries: usize,
    pub steps: usize,
    pub pages: usize,
    pub validations: usize,
    pub unresolved: usize,
}

struct Pulled {
    items: Vec<ItemRow>,
    relations: Vec<RelationRow>,
    steps: Vec<StepRow>,
    pages: Vec<PageRow>,
    validations: Vec<ValidationRow>,
}

#[derive(Clone)]
pub struct DatabaseLoader {
    pool: ConnectionPool,
    identity: IdentityResolver,
    stores: LocalStores,
}

impl DatabaseLoader {
    pub fn new(pool: ConnectionPool, identity: IdentityResolver, stores: LocalStores) -> Self {
        Self {
            pool,
            identity,
            stores,
        }
    }

    pub async fn run(&self, role: LoadRole) -> Result<LoadReport> {
        let pulled = self.pull(role).await?;
        let report = match role {
            LoadRole::Default => self.overwrite(pulled).await?,
            LoadRole::Draw => self.refresh_structure(pulled).await?,
        };
        info!(
            namespace = %report.namespace,
            role = ?report.role,
            items = report.items,
            entries = report.graph_entries,
            steps = report.steps,
            pages = report.pages,
            validations = report.validations,
            unresolved = report.unresolved,
            "Mirror load finished"
        );
        Ok(report)
    }

    async fn pull(&self, role: LoadRole) -> Result<Pulled> {
        let namespace = self.identity.namespace().to_string();
        let pulled = self
            .pool
            .with_conn(move |conn| {
                let full = role == LoadRole::Default;
                Ok(Pulled {
                    items: mirror::published_items(conn, &namespace)?,
                    relations: mirror::published_relations(conn, &namespace)?,
                    steps: if full { mirror::published_steps(conn, &namespace)? } else { Vec::new() },
                    pages: if full { mirror::published_pages(conn, &namespace)? } else { Vec::new() },
                    validations: mirror::published_validations(conn, &namespace)?,
                })
            })
            .await?;
        Ok(pulled)
    }

    /// Replaces every local file with the published generation. Local
    /// `parent_dom` and page-level actions are carried over since the mirror
    /// does not hold them.
    async fn overwrite(&self, pulled: Pulled) -> Result<LoadReport> {
        let mut report = self.report(LoadRole::Default);

        let mut items = Vec::with_capacity(pulled.items.len());
        let mut ids: HashMap<String, String> = HashMap::new();
        for row in pulled.items {
            let code = row.code.clone();
            match row.into_item() {
                Some(item) => {
                    ids.insert(code, item.item_id.clone());
                    items.push(item);
                }
                None => {
                    warn!(code = %code, "Skipping mirrored item with unknown category");
                    report.unresolved += 1;
                }
            }
        }
        let categories: HashMap<&str, ItemCategory> = items
            .iter()
            .map(|item| (item.item_id.as_str(), item.item_category))
            .collect();

        let local_entries = self.stores.graph.snapshot().await?;
        let mut entries: Vec<GraphEntry> = items
            .iter()
            .filter(|item| item.is_panel())
            .map(|item| GraphEntry::new(item.item_id.clone()))
            .collect();
        let mut entry_at: HashMap<String, usize> = entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (entry.parent_panel.clone(), idx))
            .collect();

        for relation in &pulled.relations {
            let Some((child, parent)) = resolve_relation(&ids, relation, &mut report.unresolved)
            else {
                continue;
            };
            let idx = *entry_at.entry(parent.to_string()).or_insert_with(|| {
                entries.push(GraphEntry::new(parent));
                entries.len() - 1
            });
            let entry = &mut entries[idx];
            let list = match categories.get(child) {
                Some(ItemCategory::Panel) => &mut entry.child_panels,
                _ => &mut entry.child_actions,
            };
            if !list.iter().any(|c| c == child) {
                list.push(child.to_string());
            }
        }

        let mut pages = Vec::with_capacity(pulled.pages.len());
        for row in pulled.pages {
            let Some(panel_id) = ids.get(&row.panel_code) else {
                warn!(code = %row.code, panel = %row.panel_code, "Page refers to an unknown panel");
                report.unresolved += 1;
                continue;
            };
            let idx = *entry_at.entry(panel_id.clone()).or_insert_with(|| {
                entries.push(GraphEntry::new(panel_id.clone()));
                entries.len() - 1
            });
            let local_actions = local_entries
                .iter()
                .find(|e| &e.parent_panel == panel_id)
                .and_then(|e| e.child_pages.iter().find(|p| p.page_number == row.page_number))
                .map(|p| p.child_actions.clone())
                .unwrap_or_default();
            entries[idx].child_pages.push(PageRef {
                page_number: row.page_number,
                page_id: row.page_id.clone(),
                child_actions: local_actions,
            });
            pages.push(Page {
                schema_version: RECORD_SCHEMA_VERSION,
                page_id: row.page_id,
                panel_id: panel_id.clone(),
                page_number: row.page_number,
                top: row.top,
                height: row.height,
                image_url: row.image_url,
                panel_image_hash: row.image_hash,
            });
        }

        for entry in &mut entries {
            entry.child_pages.sort_by_key(|p| p.page_number);
            if let Some(local) = local_entries
                .iter()
                .find(|e| e.parent_panel == entry.parent_panel)
            {
                entry.parent_dom = local.parent_dom.clone();
            }
        }

        let mut steps = Vec::with_capacity(pulled.steps.len());
        for row in pulled.steps {
            match resolve_step(&ids, &row) {
                Some(step) => steps.push(step),
                None => {
                    warn!(code = %row.code, "Step refers to unknown items");
                    report.unresolved += 1;
                }
            }
        }

        let validations = resolve_validations(&ids, pulled.validations, &mut report.unresolved);

        report.items = items.len();
        report.graph_entries = entries.len();
        report.steps = steps.len();
        report.pages = pages.len();
        report.validations = validations.len();

        self.stores.items.rewrite(items).await?;
        self.stores.graph.rewrite(entries).await?;
        self.stores.steps.rewrite(steps).await?;
        self.stores.pages.rewrite(pages).await?;
        self.stores.validations.rewrite(validations).await?;
        Ok(report)
    }

    /// Refreshes child action/panel lists and merges validations. Items,
    /// steps, pages, `child_pages` and `parent_dom` stay local.
    ///
    /// Codes resolve through the published item rows first, so an action the
    /// mirror files under another panel still maps to its local id. Locally
    /// derived codes cover rows the mirror has no item for.
    async fn refresh_structure(&self, pulled: Pulled) -> Result<LoadReport> {
        let mut report = self.report(LoadRole::Draw);

        let items = self.stores.items.snapshot().await?;
        let local_entries = self.stores.graph.snapshot().await?;
        let mut ids: HashMap<String, String> = self
            .identity
            .item_codes(&items, &local_entries)
            .into_iter()
            .map(|(id, code)| (code, id))
            .collect();
        let local_ids: HashSet<&str> = items.iter().map(|item| item.item_id.as_str()).collect();
        for row in &pulled.items {
            if local_ids.contains(row.item_id.as_str()) {
                ids.insert(row.code.clone(), row.item_id.clone());
            }
        }
        let categories: HashMap<String, ItemCategory> = items
            .iter()
            .map(|item| (item.item_id.clone(), item.item_category))
            .collect();

        let mut structure: HashMap<String, (Vec<String>, Vec<String>)> = HashMap::new();
        let mut order = Vec::new();
        for relation in &pulled.relations {
            let Some((child, parent)) = resolve_relation(&ids, relation, &mut report.unresolved)
            else {
                continue;
            };
            let slot = structure.entry(parent.to_string()).or_insert_with(|| {
                order.push(parent.to_string());
                Default::default()
            });
            let list = match categories.get(child) {
                Some(ItemCategory::Panel) => &mut slot.1,
                _ => &mut slot.0,
            };
            if !list.iter().any(|c| c == child) {
                list.push(child.to_string());
            }
        }

        let remote = resolve_validations(&ids, pulled.validations, &mut report.unresolved);

        report.graph_entries = self
            .stores
            .graph
            .mutate(move |entries| {
                for entry in entries.iter_mut() {
                    let (actions, panels) = structure.remove(&entry.parent_panel).unwrap_or_default();
                    entry.child_actions = actions;
                    entry.child_panels = panels;
                }
                for parent in order {
                    if let Some((actions, panels)) = structure.remove(&parent) {
                        let mut entry = GraphEntry::new(parent);
                        entry.child_actions = actions;
                        entry.child_panels = panels;
                        entries.push(entry);
                    }
                }
                entries.len()
            })
            .await?;

        report.validations = self
            .stores
            .validations
            .mutate(move |local| {
                let merged = merge_validations(std::mem::take(local), remote);
                *local = merged;
                local.len()
            })
            .await?;

        report.items = items.len();
        Ok(report)
    }

    fn report(&self, role: LoadRole) -> LoadReport {
        LoadReport {
            namespace: self.identity.namespace().to_string(),
            role,
            ..Default::default()
        }
    }
}

/// Upsert-preserve merge keyed by `item_id`: local-only records are kept,
/// shared records take the remote value, remote-only records are appended.
pub fn merge_validations(
    local: Vec<ValidationRecord>,
    remote: Vec<ValidationRecord>,
) -> Vec<ValidationRecord> {
    let mut remote_by_id: HashMap<String, ValidationRecord> = HashMap::new();
    let mut remote_order = Vec::new();
    for record in remote {
        if !remote_by_id.contains_key(&record.item_id) {
            remote_order.push(record.item_id.clone());
        }
        remote_by_id.insert(record.item_id.clone(), record);
    }

    let mut merged: Vec<ValidationRecord> = local
        .into_iter()
        .map(|record| remote_by_id.remove(&record.item_id).unwrap_or(record))
        .collect();
    for item_id in remote_order {
        if let Some(record) = remote_by_id.remove(&item_id) {
            merged.push(record);
        }
    }
    merged
}

fn resolve_relation<'a>(
    ids: &'a HashMap<String, String>,
    relation: &RelationRow,
    unresolved: &mut usize,
) -> Option<(&'a str, &'a str)> {
    match (ids.get(&relation.child_code), ids.get(&relation.parent_code)) {
        (Some(child), Some(parent)) => Some((child.as_str(), parent.as_str())),
        _ => {
            warn!(code = %relation.code, "Relation refers to unknown items");
            *unresolved += 1;
            None
        }
    }
}

fn resolve_step(ids: &HashMap<String, String>, row: &StepRow) -> Option<Step> {
    let panel_before = ids.get(&row.panel_before_code)?.clone();
    let action = ids.get(&row.action_code)?.clone();
    let panel_after = match &row.panel_after_code {
        Some(code) => Some(ids.get(code)?.clone()),
        None => None,
    };
    Some(Step {
        schema_version: RECORD_SCHEMA_VERSION,
        step_id: Some(row.step_id),
        panel_before,
        action,
        panel_after,
        purpose: row.purpose.clone(),
        reason: row.reason.clone(),
    })
}

fn resolve_validations(
    ids: &HashMap<String, String>,
    rows: Vec<ValidationRow>,
    unresolved: &mut usize,
) -> Vec<ValidationRecord> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(item_id) = ids.get(&row.item_code) else {
            warn!(code = %row.code, "Validation refers to an unknown item");
            *unresolved += 1;
            continue;
        };
        let created_at = match DateTime::parse_from_rfc3339(&row.created_at) {
            Ok(ts) => ts.with_timezone(&Utc),
            Err(err) => {
                warn!(code = %row.code, "Validation has an invalid timestamp: {err}");
                *unresolved += 1;
                continue;
            }
        };
        out.push(ValidationRecord {
            schema_version: RECORD_SCHEMA_VERSION,
            item_id: item_id.clone(),
            created_at,
            day_id: row.day_id,
            session_id: row.session_id,
            scene_id: row.scene_id,
            assignee: row.assignee,
        });
    }
    out
}
