//! Panel/action hierarchy and the geometry-based panel merge.
//!
//! Structural mutators return `Ok(false)` for missing or redundant input and
//! only fail on store I/O.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    catalog::ItemCatalog,
    geometry::{hull, iou, is_box_inside, Containment, MergeThresholds},
    models::{BoundingBox, GraphEntry, PageRef},
    record_store::RecordStore,
};

#[derive(Clone)]
pub struct GraphManager {
    entries: RecordStore<GraphEntry>,
    catalog: Arc<dyn ItemCatalog>,
    thresholds: MergeThresholds,
}

impl GraphManager {
    pub fn new(entries: RecordStore<GraphEntry>, catalog: Arc<dyn ItemCatalog>) -> Self {
        Self {
            entries,
            catalog,
            thresholds: MergeThresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: MergeThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub async fn snapshot(&self) -> Result<Vec<GraphEntry>> {
        Ok(self.entries.snapshot().await?)
    }

    pub async fn get_entry(&self, panel_id: &str) -> Result<Option<GraphEntry>> {
        let entries = self.entries.snapshot().await?;
        Ok(entries.into_iter().find(|e| e.parent_panel == panel_id))
    }

    pub async fn create_panel_entry(&self, panel_id: &str) -> Result<bool> {
        let panel_id = panel_id.to_string();
        Ok(self
            .entries
            .mutate(move |entries| {
                if find_entry(entries, &panel_id).is_some() {
                    return false;
                }
                entries.push(GraphEntry::new(panel_id));
                true
            })
            .await?)
    }

    pub async fn add_child_action(&self, panel_id: &str, action_id: &str) -> Result<bool> {
        let action_id = action_id.to_string();
        self.edit_entry(panel_id, move |entry| {
            insert_unique(&mut entry.child_actions, action_id)
        })
        .await
    }

    /// Does not check for cycles; only [`GraphManager::make_child`] does.
    pub async fn add_child_panel(&self, parent_id: &str, child_id: &str) -> Result<bool> {
        if parent_id == child_id {
            warn!(panel = %parent_id, "Refusing to add a panel as its own child");
            return Ok(false);
        }
        let child_id = child_id.to_string();
        self.edit_entry(parent_id, move |entry| {
            insert_unique(&mut entry.child_panels, child_id)
        })
        .await
    }

    /// Inserts the page ordered by page number, or re-points an existing page
    /// number at `page_id`.
    pub async fn add_child_page(&self, panel_id: &str, page_number: u32, page_id: &str) -> Result<bool> {
        let page_id = page_id.to_string();
        self.edit_entry(panel_id, move |entry| {
            if let Some(page) = entry
                .child_pages
                .iter_mut()
                .find(|p| p.page_number == page_number)
            {
                if page.page_id == page_id {
                    return false;
                }
                page.page_id = page_id;
                return true;
            }
            let at = entry
                .child_pages
                .iter()
                .position(|p| p.page_number > page_number)
                .unwrap_or(entry.child_pages.len());
            entry.child_pages.insert(
                at,
                PageRef {
                    page_number,
                    page_id,
                    child_actions: Vec::new(),
                },
            );
            true
        })
        .await
    }

    pub async fn add_child_action_to_page(
        &self,
        panel_id: &str,
        page_number: u32,
        action_id: &str,
    ) -> Result<bool> {
        let action_id = action_id.to_string();
        self.edit_entry(panel_id, move |entry| {
            match entry
                .child_pages
                .iter_mut()
                .find(|p| p.page_number == page_number)
            {
                Some(page) => insert_unique(&mut page.child_actions, action_id),
                None => false,
            }
        })
        .await
    }

    pub async fn remove_child_action(&self, panel_id: &str, action_id: &str) -> Result<bool> {
        let action_id = action_id.to_string();
        self.edit_entry(panel_id, move |entry| {
            remove_value(&mut entry.child_actions, &action_id)
        })
        .await
    }

    pub async fn remove_child_panel(&self, parent_id: &str, child_id: &str) -> Result<bool> {
        let child_id = child_id.to_string();
        self.edit_entry(parent_id, move |entry| {
            remove_value(&mut entry.child_panels, &child_id)
        })
        .await
    }

    pub async fn remove_child_page(&self, panel_id: &str, page_number: u32) -> Result<bool> {
        self.edit_entry(panel_id, move |entry| {
            let before = entry.child_pages.len();
            entry.child_pages.retain(|p| p.page_number != page_number);
            entry.child_pages.len() != before
        })
        .await
    }

    pub async fn update_parent_dom(&self, panel_id: &str, parent_dom: Vec<Value>) -> Result<bool> {
        self.edit_entry(panel_id, move |entry| {
            if entry.parent_dom == parent_dom {
                return false;
            }
            entry.parent_dom = parent_dom;
            true
        })
        .await
    }

    /// Deletes the entry and removes the panel from every `child_panels` list.
    pub async fn delete_panel_entry(&self, panel_id: &str) -> Result<bool> {
        let panel_id = panel_id.to_string();
        Ok(self
            .entries
            .mutate(move |entries| {
                let before = entries.len();
                entries.retain(|e| e.parent_panel != panel_id);
                let removed = entries.len() != before;
                let mut detached = false;
                for entry in entries.iter_mut() {
                    detached |= remove_value(&mut entry.child_panels, &panel_id);
                }
                removed || detached
            })
            .await?)
    }

    pub async fn get_all_descendants(&self, panel_id: &str) -> Result<Vec<String>> {
        let entries = self.entries.snapshot().await?;
        Ok(descendant_actions(&entries, panel_id))
    }

    pub async fn find_my_parent(&self, item_id: &str) -> Result<Option<String>> {
        let entries = self.entries.snapshot().await?;
        Ok(find_parent_index(&entries, item_id).map(|idx| entries[idx].parent_panel.clone()))
    }

    /// Merges a rediscovered panel into the hierarchy under (or beside)
    /// `parent_id`. Returns whether anything changed.
    pub async fn make_child(&self, parent_id: &str, child_id: &str) -> Result<bool> {
        if parent_id == child_id {
            return Ok(false);
        }

        let boxes: HashMap<String, BoundingBox> = self
            .catalog
            .list()
            .await?
            .into_iter()
            .filter_map(|item| item.bbox.map(|b| (item.item_id, b)))
            .collect();

        let thresholds = self.thresholds;
        let parent_id = parent_id.to_string();
        let child_id = child_id.to_string();
        Ok(self
            .entries
            .mutate(move |entries| merge_panels(entries, &boxes, &thresholds, &parent_id, &child_id))
            .await?)
    }

    async fn edit_entry<F>(&self, panel_id: &str, edit: F) -> Result<bool>
    where
        F: FnOnce(&mut GraphEntry) -> bool + Send + 'static,
    {
        let panel_id = panel_id.to_string();
        Ok(self
            .entries
            .mutate(move |entries| match find_entry(entries, &panel_id) {
                Some(idx) => edit(&mut entries[idx]),
                None => {
                    debug!(panel = %panel_id, "No graph entry for panel");
                    false
                }
            })
            .await?)
    }
}

/// Worklist form of the panel merge. Pairs are visited at most once, so
/// propagation through cyclic data terminates.
pub fn merge_panels(
    entries: &mut [GraphEntry],
    boxes: &HashMap<String, BoundingBox>,
    thresholds: &MergeThresholds,
    parent_id: &str,
    child_id: &str,
) -> bool {
    let mut visited: HashSet<(String, String)> = HashSet::new();
    let mut stack = vec![(parent_id.to_string(), child_id.to_string())];
    let mut changed = false;

    while let Some((parent, child)) = stack.pop() {
        if parent == child || !visited.insert((parent.clone(), child.clone())) {
            continue;
        }

        let Some(parent_box) = representative_box(entries, boxes, &parent) else {
            warn!(parent = %parent, child = %child, "Merge skipped: parent panel has no positioned actions");
            continue;
        };
        let Some(child_box) = representative_box(entries, boxes, &child) else {
            warn!(parent = %parent, child = %child, "Merge skipped: child panel has no positioned actions");
            continue;
        };

        let overlap = iou(&parent_box, &child_box);
        if overlap <= thresholds.disjoint || overlap >= thresholds.identical {
            if reaches(entries, &parent, &child) {
                continue;
            }
            let Some(gp_idx) = find_parent_index(entries, &parent) else {
                debug!(parent = %parent, child = %child, overlap, "Sibling merge: parent is a root, nothing to attach to");
                continue;
            };
            let grandparent = entries[gp_idx].parent_panel.clone();
            if grandparent == child || reaches(entries, &child, &grandparent) {
                continue;
            }
            if insert_unique(&mut entries[gp_idx].child_panels, child.clone()) {
                info!(grandparent = %grandparent, sibling = %parent, child = %child, overlap, "Attached panel as sibling");
                changed = true;
            }
            continue;
        }

        // Mutual containment keeps the requested roles.
        let parent_in_child =
            is_box_inside(&parent_box, &child_box, thresholds.containment) == Containment::AInB;
        let child_in_parent =
            is_box_inside(&child_box, &parent_box, thresholds.containment) == Containment::AInB;
        let (outer, inner) = if parent_in_child && !child_in_parent {
            debug!(parent = %parent, child = %child, overlap, "Roles inverted, nesting parent under child");
            (child, parent)
        } else {
            (parent, child)
        };

        let Some(outer_idx) = find_entry(entries, &outer) else {
            continue;
        };
        let inner_action_boxes: Vec<BoundingBox> = find_entry(entries, &inner)
            .map(|idx| {
                entries[idx]
                    .child_actions
                    .iter()
                    .filter_map(|id| boxes.get(id).copied())
                    .collect()
            })
            .unwrap_or_default();

        let outer_entry = &mut entries[outer_idx];
        let before = outer_entry.child_actions.len();
        outer_entry.child_actions.retain(|action| match boxes.get(action) {
            Some(action_box) => !inner_action_boxes
                .iter()
                .any(|cb| iou(action_box, cb) > thresholds.duplicate_action),
            None => true,
        });
        let removed = before - outer_entry.child_actions.len();
        if removed > 0 {
            info!(parent = %outer, child = %inner, removed, "Removed duplicated actions from parent");
            changed = true;
        }

        let existing: Vec<String> = outer_entry.child_panels.clone();
        if !existing.contains(&inner) {
            if reaches(entries, &inner, &outer) {
                warn!(parent = %outer, child = %inner, "Merge skipped: nesting would create a cycle");
                continue;
            }
            entries[outer_idx].child_panels.push(inner.clone());
            info!(parent = %outer, child = %inner, overlap, "Nested panel");
            changed = true;
        }

        for sibling in existing.into_iter().rev() {
            stack.push((sibling, inner.clone()));
        }
    }

    changed
}

/// Every action reachable from `panel_id`: its own actions plus those of all
/// nested panels. Terminates on cyclic data and never yields `panel_id`.
pub fn descendant_actions(entries: &[GraphEntry], panel_id: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen_actions = HashSet::new();
    let mut seen_panels = HashSet::new();
    let mut stack = vec![panel_id.to_string()];

    while let Some(current) = stack.pop() {
        if !seen_panels.insert(current.clone()) {
            continue;
        }
        let Some(idx) = find_entry(entries, &current) else {
            continue;
        };
        let entry = &entries[idx];
        for action in &entry.child_actions {
            if action != panel_id && seen_actions.insert(action.clone()) {
                out.push(action.clone());
            }
        }
        for child in entry.child_panels.iter().rev() {
            stack.push(child.clone());
        }
    }

    out
}

pub fn find_entry(entries: &[GraphEntry], panel_id: &str) -> Option<usize> {
    entries.iter().position(|e| e.parent_panel == panel_id)
}

pub fn find_parent_index(entries: &[GraphEntry], item_id: &str) -> Option<usize> {
    entries
        .iter()
        .position(|e| e.child_panels.iter().any(|c| c == item_id))
}

/// Panels that are not listed in any `child_panels`.
pub fn root_panels(entries: &[GraphEntry]) -> Vec<String> {
    let nested: HashSet<&str> = entries
        .iter()
        .flat_map(|e| e.child_panels.iter().map(String::as_str))
        .collect();
    entries
        .iter()
        .filter(|e| !nested.contains(e.parent_panel.as_str()))
        .map(|e| e.parent_panel.clone())
        .collect()
}

/// The panel's own box when the catalog has one, else the hull of every
/// action reachable from it.
fn representative_box(
    entries: &[GraphEntry],
    boxes: &HashMap<String, BoundingBox>,
    panel_id: &str,
) -> Option<BoundingBox> {
    if let Some(own) = boxes.get(panel_id) {
        return Some(*own);
    }
    hull(
        descendant_actions(entries, panel_id)
            .iter()
            .filter_map(|id| boxes.get(id)),
    )
}

/// True when `to` is `from` or nested anywhere below it through `child_panels`.
fn reaches(entries: &[GraphEntry], from: &str, to: &str) -> bool {
    let mut seen = HashSet::new();
    let mut stack = vec![from.to_string()];
    while let Some(current) = stack.pop() {
        if current == to {
            return true;
        }
        if !seen.insert(current.clone()) {
            continue;
        }
        if let Some(idx) = find_entry(entries, &current) {
            stack.extend(entries[idx].child_panels.iter().cloned());
        }
    }
    false
}

fn insert_unique(list: &mut Vec<String>, value: String) -> bool {
    if list.contains(&value) {
        return false;
    }
    list.push(value);
    true
}

fn remove_value(list: &mut Vec<String>, value: &str) -> bool {
    let before = list.len();
    list.retain(|v| v != value);
    list.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::StoreCatalog,
        models::{Item, ItemCategory},
    };

    fn entry(panel: &str, actions: &[&str], panels: &[&str]) -> GraphEntry {
        let mut e = GraphEntry::new(panel);
        e.child_actions = actions.iter().map(|s| s.to_string()).collect();
        e.child_panels = panels.iter().map(|s| s.to_string()).collect();
        e
    }

    fn boxes(pairs: &[(&str, (f64, f64, f64, f64))]) -> HashMap<String, BoundingBox> {
        pairs
            .iter()
            .map(|(id, (x, y, w, h))| (id.to_string(), BoundingBox::new(*x, *y, *w, *h)))
            .collect()
    }

    #[test]
    fn descendants_terminate_on_cycles_and_exclude_self() {
        let entries = vec![
            entry("a", &["a1"], &["b"]),
            entry("b", &["b1", "a"], &["a"]),
        ];
        let found = descendant_actions(&entries, "a");
        assert_eq!(found, vec!["a1".to_string(), "b1".to_string()]);
    }

    #[test]
    fn root_panels_skip_nested_entries() {
        let entries = vec![entry("a", &[], &["b"]), entry("b", &[], &[]), entry("c", &[], &[])];
        assert_eq!(root_panels(&entries), vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn merge_without_actions_is_abandoned() {
        let mut entries = vec![entry("p", &[], &[]), entry("c", &["c1"], &[])];
        let map = boxes(&[("c1", (0.0, 0.0, 5.0, 5.0))]);
        let changed = merge_panels(&mut entries, &map, &MergeThresholds::default(), "p", "c");
        assert!(!changed);
        assert!(entries[0].child_panels.is_empty());
    }

    #[test]
    fn disjoint_panel_becomes_sibling() {
        let mut entries = vec![
            entry("root", &["r1"], &["p"]),
            entry("p", &["p1"], &[]),
            entry("c", &["c1"], &[]),
        ];
        let map = boxes(&[
            ("r1", (0.0, 0.0, 500.0, 500.0)),
            ("p1", (0.0, 0.0, 10.0, 10.0)),
            ("c1", (100.0, 100.0, 10.0, 10.0)),
        ]);
        assert!(merge_panels(&mut entries, &map, &MergeThresholds::default(), "p", "c"));
        assert_eq!(entries[0].child_panels, vec!["p".to_string(), "c".to_string()]);
        assert!(entries[1].child_panels.is_empty());
    }

    #[test]
    fn inverted_roles_are_swapped() {
        let mut entries = vec![entry("small", &["s1"], &[]), entry("big", &["b1", "b2"], &[])];
        let map = boxes(&[
            ("s1", (10.0, 10.0, 20.0, 20.0)),
            ("b1", (0.0, 0.0, 10.0, 10.0)),
            ("b2", (90.0, 90.0, 10.0, 10.0)),
        ]);
        assert!(merge_panels(&mut entries, &map, &MergeThresholds::default(), "small", "big"));
        assert!(entries[0].child_panels.is_empty());
        assert_eq!(entries[1].child_panels, vec!["small".to_string()]);
    }

    #[test]
    fn nesting_propagates_to_existing_children() {
        let mut entries = vec![
            entry("p", &["pa"], &["c"]),
            entry("c", &["ca"], &[]),
            entry("n", &["na"], &[]),
        ];
        let map = boxes(&[
            ("pa", (0.0, 0.0, 100.0, 100.0)),
            ("ca", (0.0, 0.0, 50.0, 50.0)),
            ("na", (10.0, 10.0, 60.0, 30.0)),
        ]);
        assert!(merge_panels(&mut entries, &map, &MergeThresholds::default(), "p", "n"));
        assert_eq!(entries[0].child_panels, vec!["c".to_string(), "n".to_string()]);
        assert_eq!(entries[1].child_panels, vec!["n".to_string()]);
    }

    #[test]
    fn nesting_refuses_to_close_a_cycle() {
        let mut entries = vec![entry("p", &["pa"], &[]), entry("c", &["ca"], &["p"])];
        let map = boxes(&[
            ("p", (0.0, 0.0, 100.0, 100.0)),
            ("c", (50.0, 50.0, 100.0, 100.0)),
            ("pa", (0.0, 0.0, 100.0, 100.0)),
            ("ca", (50.0, 50.0, 100.0, 100.0)),
        ]);
        assert!(!merge_panels(&mut entries, &map, &MergeThresholds::default(), "p", "c"));
        assert!(entries[0].child_panels.is_empty());
    }

    #[test]
    fn near_identical_duplicate_collapses_into_parent() {
        let mut entries = vec![
            entry("home", &["h1", "h2"], &[]),
            entry("home2", &["d1", "d2"], &[]),
        ];
        let map = boxes(&[
            ("h1", (0.0, 0.0, 10.0, 10.0)),
            ("h2", (50.0, 50.0, 10.0, 10.0)),
            ("d1", (0.2, 0.0, 10.0, 10.0)),
            ("d2", (50.0, 50.0, 10.0, 10.0)),
        ]);
        let thresholds = MergeThresholds::default();

        assert!(merge_panels(&mut entries, &map, &thresholds, "home", "home2"));
        assert_eq!(root_panels(&entries), vec!["home".to_string()]);
        assert!(entries[0].child_actions.is_empty());
        assert_eq!(entries[0].child_panels, vec!["home2".to_string()]);
        assert_eq!(entries[1].child_actions, vec!["d1".to_string(), "d2".to_string()]);

        let once = entries.clone();
        assert!(!merge_panels(&mut entries, &map, &thresholds, "home", "home2"));
        assert_eq!(entries, once);
    }

    #[test]
    fn repeated_merge_ignores_hull_shrunk_by_dedupe() {
        let mut entries = vec![
            entry("g", &[], &["p"]),
            entry("p", &["p1", "p2"], &[]),
            entry("c", &["c1", "c2"], &[]),
        ];
        let map = boxes(&[
            ("p1", (0.0, 0.0, 10.0, 10.0)),
            ("p2", (100.0, 100.0, 10.0, 10.0)),
            ("c1", (0.5, 0.0, 10.0, 10.0)),
            ("c2", (20.0, 20.0, 10.0, 10.0)),
        ]);
        let thresholds = MergeThresholds::default();

        assert!(merge_panels(&mut entries, &map, &thresholds, "p", "c"));
        assert_eq!(entries[1].child_actions, vec!["p2".to_string()]);
        assert_eq!(entries[1].child_panels, vec!["c".to_string()]);

        assert!(!merge_panels(&mut entries, &map, &thresholds, "p", "c"));
        assert_eq!(entries[0].child_panels, vec!["p".to_string()]);
        assert_eq!(find_parent_index(&entries, "c"), Some(1));
    }

    async fn seeded_manager(dir: &std::path::Path) -> GraphManager {
        let items = RecordStore::open(dir.join("items.jsonl"));
        let seed = vec![
            Item::new("home", ItemCategory::Panel, "Home"),
            Item::new("home2", ItemCategory::Panel, "Home(2)"),
            Item::new("h1", ItemCategory::Action, "Search")
                .with_bbox(BoundingBox::new(0.0, 0.0, 10.0, 10.0)),
            Item::new("h2", ItemCategory::Action, "Profile")
                .with_bbox(BoundingBox::new(0.0, 50.0, 10.0, 10.0)),
            Item::new("d1", ItemCategory::Action, "Search")
                .with_bbox(BoundingBox::new(0.2, 0.0, 10.0, 10.0)),
            Item::new("d2", ItemCategory::Action, "Cart")
                .with_bbox(BoundingBox::new(50.0, 0.0, 10.0, 10.0)),
        ];
        items.rewrite(seed).await.expect("seed items");

        let graph = GraphManager::new(
            RecordStore::open(dir.join("graph.jsonl")),
            Arc::new(StoreCatalog::new(items)),
        );
        for panel in ["home", "home2"] {
            assert!(graph.create_panel_entry(panel).await.expect("create"));
        }
        for (panel, action) in [("home", "h1"), ("home", "h2"), ("home2", "d1"), ("home2", "d2")] {
            assert!(graph.add_child_action(panel, action).await.expect("add action"));
        }
        graph
    }

    #[tokio::test]
    async fn duplicate_panel_merge_dedupes_actions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let graph = seeded_manager(dir.path()).await;

        assert!(graph.make_child("home", "home2").await.expect("merge"));

        let entries = graph.snapshot().await.expect("snapshot");
        assert_eq!(root_panels(&entries), vec!["home".to_string()]);
        let home = graph.get_entry("home").await.expect("get").expect("home");
        assert_eq!(home.child_actions, vec!["h2".to_string()]);
        assert_eq!(home.child_panels, vec!["home2".to_string()]);
        let home2 = graph.get_entry("home2").await.expect("get").expect("home2");
        assert_eq!(home2.child_actions, vec!["d1".to_string(), "d2".to_string()]);
        assert_eq!(graph.find_my_parent("home2").await.expect("parent").as_deref(), Some("home"));
    }

    #[tokio::test]
    async fn make_child_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let graph = seeded_manager(dir.path()).await;

        graph.make_child("home", "home2").await.expect("first merge");
        let once = graph.snapshot().await.expect("snapshot");
        let changed = graph.make_child("home", "home2").await.expect("second merge");
        let twice = graph.snapshot().await.expect("snapshot");

        assert!(!changed);
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn deleting_a_panel_detaches_it_everywhere() {
        let dir = tempfile::tempdir().expect("tempdir");
        let graph = seeded_manager(dir.path()).await;
        graph.add_child_panel("home", "home2").await.expect("nest");

        assert!(graph.delete_panel_entry("home2").await.expect("delete"));
        let home = graph.get_entry("home").await.expect("get").expect("home");
        assert!(home.child_panels.is_empty());
        assert!(graph.get_entry("home2").await.expect("get").is_none());
        assert!(!graph.add_child_panel("home", "home").await.expect("self"));
    }

    #[tokio::test]
    async fn pages_stay_ordered_and_collect_actions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let graph = seeded_manager(dir.path()).await;

        assert!(graph.add_child_page("home", 2, "pg-2").await.expect("page 2"));
        assert!(graph.add_child_page("home", 1, "pg-1").await.expect("page 1"));
        assert!(!graph.add_child_page("home", 1, "pg-1").await.expect("repeat"));
        assert!(graph.add_child_action_to_page("home", 2, "h2").await.expect("page action"));
        assert!(!graph.add_child_action_to_page("home", 7, "h2").await.expect("missing page"));

        let home = graph.get_entry("home").await.expect("get").expect("home");
        let numbers: Vec<u32> = home.child_pages.iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(home.child_pages[1].child_actions, vec!["h2".to_string()]);

        assert!(graph.remove_child_page("home", 1).await.expect("remove page"));
        assert!(graph.remove_child_action("home", "h1").await.expect("remove action"));
        assert_eq!(
            graph.get_all_descendants("home").await.expect("descendants"),
            vec!["h2".to_string()]
        );
    }
}
