//! Local snapshot → relational mirror.
//!
//! A run opens a new generation by unpublishing every row of the namespace,
//! then republishes whatever the local snapshot contains. Rows are never
//! deleted. A failed row is logged and counted; the run keeps going.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    graph::GraphManager,
    identity::IdentityResolver,
    media::{content_hash, page_file_name, plan_pages, MediaStore, PanelImageSource},
    mirror::{self, CuratedTable, ItemRow, PageRow, RelationRow, StepRow, ValidationRow},
    models::{Page, Step, RECORD_SCHEMA_VERSION},
    pool::ConnectionPool,
    stores::LocalStores,
};

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub session_record_id: String,
    pub page_height: u32,
    pub max_pages_per_panel: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCounts {
    pub processed: usize,
    pub upserted: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCounts {
    pub processed: usize,
    pub uploaded: usize,
    pub reused: usize,
    pub upserted: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub namespace: String,
    pub unpublished: usize,
    pub items: TableCounts,
    pub relations: TableCounts,
    pub steps: TableCounts,
    pub steps_renumbered: bool,
    pub validations: TableCounts,
    pub pages: PageCounts,
    pub backfilled_items: usize,
    pub backfilled_steps: usize,
}

impl SyncReport {
    pub fn failed_rows(&self) -> usize {
        self.items.failed
            + self.relations.failed
            + self.steps.failed
            + self.validations.failed
            + self.pages.failed
    }
}

#[derive(Clone)]
pub struct SyncEngine {
    pool: ConnectionPool,
    identity: IdentityResolver,
    stores: LocalStores,
    graph: GraphManager,
    images: Arc<dyn PanelImageSource>,
    media: Arc<dyn MediaStore>,
    settings: SyncSettings,
}

impl SyncEngine {
    pub fn new(
        pool: ConnectionPool,
        identity: IdentityResolver,
        stores: LocalStores,
        graph: GraphManager,
        images: Arc<dyn PanelImageSource>,
        media: Arc<dyn MediaStore>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            pool,
            identity,
            stores,
            graph,
            images,
            media,
            settings,
        }
    }

    pub async fn run(&self) -> Result<SyncReport> {
        let namespace = self.identity.namespace().to_string();
        let now = Utc::now().to_rfc3339();
        let mut report = SyncReport {
            namespace: namespace.clone(),
            ..Default::default()
        };

        report.unpublished = {
            let namespace = namespace.clone();
            self.pool
                .with_conn(move |conn| mirror::unpublish_namespace(conn, &namespace))
                .await?
        };
        info!(namespace = %namespace, rows = report.unpublished, "Opened mirror generation");

        let items = self.stores.items.snapshot().await?;
        let entries = self.stores.graph.snapshot().await?;
        let codes = self.identity.item_codes(&items, &entries);

        let mut seen_codes: HashMap<&str, &str> = HashMap::new();
        for item in &items {
            report.items.processed += 1;
            let code = &codes[&item.item_id];
            if let Some(previous) = seen_codes.insert(code.as_str(), item.item_id.as_str()) {
                warn!(code = %code, first = %previous, second = %item.item_id, "Two items share one code; the later one wins");
            }
            let row = match ItemRow::from_item(code.clone(), item) {
                Ok(row) => row,
                Err(err) => {
                    warn!(item_id = %item.item_id, "Failed to encode item row: {err}");
                    report.items.failed += 1;
                    continue;
                }
            };
            let (ns, now) = (namespace.clone(), now.clone());
            self.upsert("items", code, &mut report.items, move |conn| {
                mirror::upsert_item(conn, &ns, &row, &now)
            })
            .await;
        }

        for entry in &entries {
            let Some(parent_code) = codes.get(&entry.parent_panel) else {
                warn!(panel = %entry.parent_panel, "Graph entry refers to an unknown panel");
                report.relations.skipped += entry.child_actions.len() + entry.child_panels.len();
                continue;
            };
            for child in entry.child_actions.iter().chain(entry.child_panels.iter()) {
                report.relations.processed += 1;
                let Some(child_code) = codes.get(child) else {
                    warn!(parent = %entry.parent_panel, child = %child, "Relation child has no item");
                    report.relations.skipped += 1;
                    continue;
                };
                let row = RelationRow {
                    code: self.identity.relation_code(child_code, parent_code),
                    child_code: child_code.clone(),
                    parent_code: parent_code.clone(),
                };
                let code = row.code.clone();
                let (ns, now) = (namespace.clone(), now.clone());
                self.upsert("panel_relations", &code, &mut report.relations, move |conn| {
                    mirror::upsert_relation(conn, &ns, &row, &now)
                })
                .await;
            }
        }

        let mut steps = self.stores.steps.snapshot().await?;
        if steps.iter().any(|step| step.step_id.is_none()) {
            steps = self.stores.steps.mutate(renumber_steps).await?;
            report.steps_renumbered = true;
            info!(namespace = %namespace, steps = steps.len(), "Backfilled step ordinals");
        }
        for step in &steps {
            report.steps.processed += 1;
            let Some(row) = self.step_row(step, &codes) else {
                report.steps.skipped += 1;
                continue;
            };
            let code = row.code.clone();
            let (ns, now) = (namespace.clone(), now.clone());
            self.upsert("steps", &code, &mut report.steps, move |conn| {
                mirror::upsert_step(conn, &ns, &row, &now)
            })
            .await;
        }

        let validations = self.stores.validations.snapshot().await?;
        for record in &validations {
            report.validations.processed += 1;
            let Some(item_code) = codes.get(&record.item_id) else {
                warn!(item_id = %record.item_id, "Validation refers to an unknown item");
                report.validations.skipped += 1;
                continue;
            };
            let row = ValidationRow {
                code: item_code.clone(),
                item_code: item_code.clone(),
                created_at: record.created_at.to_rfc3339(),
                day_id: record.day_id.clone(),
                session_id: record.session_id.clone(),
                scene_id: record.scene_id.clone(),
                assignee: record.assignee.clone(),
            };
            let (ns, now) = (namespace.clone(), now.clone());
            self.upsert("validations", item_code, &mut report.validations, move |conn| {
                mirror::upsert_validation(conn, &ns, &row, &now)
            })
            .await;
        }

        report.pages = self.publish_pages(&items, &codes, &namespace, &now).await?;

        let (items_filled, steps_filled) = self.backfill_curated_text(&codes).await?;
        report.backfilled_items = items_filled;
        report.backfilled_steps = steps_filled;

        info!(
            namespace = %namespace,
            items = report.items.upserted,
            relations = report.relations.upserted,
            steps = report.steps.upserted,
            validations = report.validations.upserted,
            pages = report.pages.upserted,
            failed = report.failed_rows(),
            backfilled = items_filled + steps_filled,
            "Mirror sync finished"
        );
        Ok(report)
    }

    fn step_row(&self, step: &Step, codes: &HashMap<String, String>) -> Option<StepRow> {
        let step_id = step.step_id?;
        let (Some(before), Some(action)) = (codes.get(&step.panel_before), codes.get(&step.action))
        else {
            warn!(step_id, before = %step.panel_before, action = %step.action, "Step refers to unknown items");
            return None;
        };
        let after = match &step.panel_after {
            Some(id) => match codes.get(id) {
                Some(code) => Some(code.clone()),
                None => {
                    warn!(step_id, after = %id, "Step target panel is unknown");
                    return None;
                }
            },
            None => None,
        };
        Some(StepRow {
            code: self
                .identity
                .step_code(&self.settings.session_record_id, step_id),
            step_id,
            panel_before_code: before.clone(),
            action_code: action.clone(),
            panel_after_code: after,
            purpose: step.purpose.clone(),
            reason: step.reason.clone(),
        })
    }

    async fn publish_pages(
        &self,
        items: &[crate::models::Item],
        codes: &HashMap<String, String>,
        namespace: &str,
        now: &str,
    ) -> Result<PageCounts> {
        let mut counts = PageCounts::default();
        let local_pages = self.stores.pages.snapshot().await?;
        let mut published = Vec::new();
        // Page numbers each panel keeps. Panels whose image failed to load are absent.
        let mut planned: HashMap<String, HashSet<u32>> = HashMap::new();

        for panel in items.iter().filter(|item| item.is_panel()) {
            let panel_code = &codes[&panel.item_id];
            let image = match self.images.load(panel).await {
                Ok(Some(image)) => image,
                Ok(None) => {
                    planned.insert(panel.item_id.clone(), HashSet::new());
                    continue;
                }
                Err(err) => {
                    warn!(panel = %panel.item_id, "Failed to load panel image: {err:#}");
                    counts.failed += 1;
                    continue;
                }
            };
            let hash = content_hash(&image.bytes);

            let windows = plan_pages(
                image.height,
                self.settings.page_height,
                self.settings.max_pages_per_panel,
            );
            planned.insert(
                panel.item_id.clone(),
                windows.iter().map(|w| w.page_number).collect(),
            );
            for window in windows {
                counts.processed += 1;
                let page_id = format!("{}-page-{}", panel.item_id, window.page_number);
                let reusable = local_pages.iter().find(|p| {
                    p.panel_id == panel.item_id
                        && p.page_number == window.page_number
                        && p.top == window.top
                        && p.height == window.height
                        && p.panel_image_hash.as_deref() == Some(hash.as_str())
                        && p.image_url.is_some()
                });

                let image_url = match reusable {
                    Some(page) => {
                        counts.reused += 1;
                        page.image_url.clone()
                    }
                    None => {
                        let uploaded = match self.images.crop(&image, &window).await {
                            Ok(bytes) => {
                                self.media
                                    .upload(bytes, &page_file_name(panel_code, window.page_number))
                                    .await
                            }
                            Err(err) => Err(err),
                        };
                        match uploaded {
                            Ok(url) => {
                                counts.uploaded += 1;
                                Some(url)
                            }
                            Err(err) => {
                                warn!(panel = %panel.item_id, page = window.page_number, "Failed to render page: {err:#}");
                                counts.failed += 1;
                                continue;
                            }
                        }
                    }
                };

                let page = Page {
                    schema_version: RECORD_SCHEMA_VERSION,
                    page_id: page_id.clone(),
                    panel_id: panel.item_id.clone(),
                    page_number: window.page_number,
                    top: window.top,
                    height: window.height,
                    image_url: image_url.clone(),
                    panel_image_hash: Some(hash.clone()),
                };
                let row = PageRow {
                    code: self.identity.page_code(panel_code, window.page_number),
                    page_id: page_id.clone(),
                    panel_code: panel_code.clone(),
                    page_number: window.page_number,
                    top: window.top,
                    height: window.height,
                    image_url,
                    image_hash: Some(hash.clone()),
                };
                let (ns, now_owned, code) = (namespace.to_string(), now.to_string(), row.code.clone());
                match self
                    .pool
                    .with_conn(move |conn| mirror::upsert_page(conn, &ns, &row, &now_owned))
                    .await
                {
                    Ok(()) => counts.upserted += 1,
                    Err(err) => {
                        warn!(table = "pages", code = %code, "Mirror upsert failed: {err}");
                        counts.failed += 1;
                    }
                }

                self.graph
                    .add_child_page(&panel.item_id, window.page_number, &page_id)
                    .await?;
                published.push(page);
            }
        }

        let keep = planned.clone();
        let pruned = self
            .stores
            .pages
            .mutate(move |pages| {
                let before = pages.len();
                pages.retain(|p| {
                    !matches!(keep.get(&p.panel_id), Some(numbers) if !numbers.contains(&p.page_number))
                });
                let pruned = before - pages.len();
                for page in published {
                    match pages
                        .iter_mut()
                        .find(|p| p.panel_id == page.panel_id && p.page_number == page.page_number)
                    {
                        Some(existing) => *existing = page,
                        None => pages.push(page),
                    }
                }
                pruned
            })
            .await?;
        let detached = self.prune_child_pages(&planned).await?;
        if pruned + detached > 0 {
            info!(pages = pruned, graph_pages = detached, "Pruned pages no longer planned");
        }

        Ok(counts)
    }

    /// Drops `child_pages` whose page number is no longer planned for the panel.
    async fn prune_child_pages(&self, planned: &HashMap<String, HashSet<u32>>) -> Result<usize> {
        let entries = self.graph.snapshot().await?;
        let mut detached = 0;
        for entry in &entries {
            let Some(numbers) = planned.get(&entry.parent_panel) else {
                continue;
            };
            for page in &entry.child_pages {
                if !numbers.contains(&page.page_number)
                    && self
                        .graph
                        .remove_child_page(&entry.parent_panel, page.page_number)
                        .await?
                {
                    detached += 1;
                }
            }
        }
        Ok(detached)
    }

    /// Copies purpose/reason text already curated in the mirror into local
    /// records that left them blank.
    async fn backfill_curated_text(&self, codes: &HashMap<String, String>) -> Result<(usize, usize)> {
        let namespace = self.identity.namespace().to_string();
        let (curated_items, curated_steps) = self
            .pool
            .with_conn(move |conn| {
                Ok((
                    mirror::curated_text(conn, CuratedTable::Items, &namespace)?,
                    mirror::curated_text(conn, CuratedTable::Steps, &namespace)?,
                ))
            })
            .await?;

        let items_filled = if curated_items.is_empty() {
            0
        } else {
            let codes = codes.clone();
            self.stores
                .items
                .mutate(move |items| {
                    let mut filled = 0;
                    for item in items.iter_mut() {
                        let Some(text) = codes.get(&item.item_id).and_then(|c| curated_items.get(c))
                        else {
                            continue;
                        };
                        if fill_blank(&mut item.purpose, &mut item.reason, text) {
                            filled += 1;
                        }
                    }
                    filled
                })
                .await?
        };

        let steps_filled = if curated_steps.is_empty() {
            0
        } else {
            let identity = self.identity.clone();
            let session = self.settings.session_record_id.clone();
            self.stores
                .steps
                .mutate(move |steps| {
                    let mut filled = 0;
                    for step in steps.iter_mut() {
                        let Some(step_id) = step.step_id else {
                            continue;
                        };
                        let Some(text) = curated_steps.get(&identity.step_code(&session, step_id))
                        else {
                            continue;
                        };
                        if fill_blank(&mut step.purpose, &mut step.reason, text) {
                            filled += 1;
                        }
                    }
                    filled
                })
                .await?
        };

        if items_filled + steps_filled > 0 {
            info!(items = items_filled, steps = steps_filled, "Backfilled curated text from mirror");
        }
        Ok((items_filled, steps_filled))
    }

    async fn upsert<F>(&self, table: &'static str, code: &str, counts: &mut TableCounts, op: F)
    where
        F: FnOnce(&mut Connection) -> crate::error::Result<()> + Send + 'static,
    {
        match self.pool.with_conn(op).await {
            Ok(()) => counts.upserted += 1,
            Err(err) => {
                warn!(table, code = %code, "Mirror upsert failed: {err}");
                counts.failed += 1;
            }
        }
    }
}

/// Assigns ordinals 1..N in file order.
pub fn renumber_steps(steps: &mut Vec<Step>) -> Vec<Step> {
    for (idx, step) in steps.iter_mut().enumerate() {
        step.step_id = Some(idx as u64 + 1);
    }
    steps.clone()
}

fn fill_blank(purpose: &mut String, reason: &mut String, text: &(String, String)) -> bool {
    let mut changed = false;
    if purpose.is_empty() && !text.0.is_empty() {
        *purpose = text.0.clone();
        changed = true;
    }
    if reason.is_empty() && !text.1.is_empty() {
        *reason = text.1.clone();
        changed = true;
    }
    changed
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::{
        catalog::StoreCatalog,
        media::{PageWindow, PanelImage},
        models::{GraphEntry, Item, ItemCategory},
    };

    struct FixedImages {
        crops: AtomicUsize,
        height: AtomicU32,
    }

    fn fixed_images(height: u32) -> Arc<FixedImages> {
        Arc::new(FixedImages {
            crops: AtomicUsize::new(0),
            height: AtomicU32::new(height),
        })
    }

    #[async_trait]
    impl PanelImageSource for FixedImages {
        async fn load(&self, _panel: &Item) -> anyhow::Result<Option<PanelImage>> {
            let height = self.height.load(Ordering::SeqCst);
            if height == 0 {
                return Ok(None);
            }
            Ok(Some(PanelImage {
                bytes: b"screenshot".to_vec(),
                width: 400,
                height,
            }))
        }

        async fn crop(&self, _image: &PanelImage, window: &PageWindow) -> anyhow::Result<Vec<u8>> {
            self.crops.fetch_add(1, Ordering::SeqCst);
            Ok(format!("crop-{}", window.page_number).into_bytes())
        }
    }

    struct MemoryMedia;

    #[async_trait]
    impl MediaStore for MemoryMedia {
        async fn upload(&self, _bytes: Vec<u8>, file_name: &str) -> anyhow::Result<String> {
            Ok(format!("mem://{file_name}"))
        }
    }

    async fn engine(dir: &std::path::Path, images: Arc<FixedImages>) -> (SyncEngine, LocalStores) {
        let stores = LocalStores::open(dir.join("data"));
        let pool = ConnectionPool::open(dir.join("mirror.sqlite"), 2)
            .await
            .expect("pool");
        let graph = GraphManager::new(
            stores.graph.clone(),
            Arc::new(StoreCatalog::new(stores.items.clone())),
        );
        let engine = SyncEngine::new(
            pool,
            IdentityResolver::new("ns").expect("namespace"),
            stores.clone(),
            graph,
            images,
            Arc::new(MemoryMedia),
            SyncSettings {
                session_record_id: "rec-1".to_string(),
                page_height: 1000,
                max_pages_per_panel: 2,
            },
        );
        (engine, stores)
    }

    async fn seed(stores: &LocalStores) {
        let mut save = Item::new("a1", ItemCategory::Action, "Save");
        save.purpose = "persist the form".to_string();
        stores
            .items
            .rewrite(vec![Item::new("p1", ItemCategory::Panel, "Editor"), save])
            .await
            .expect("items");
        let mut entry = GraphEntry::new("p1");
        entry.child_actions.push("a1".to_string());
        stores.graph.rewrite(vec![entry]).await.expect("graph");
        stores
            .steps
            .rewrite(vec![
                Step::new("p1", "a1", None),
                Step::new("p1", "a1", Some("p1".to_string())),
            ])
            .await
            .expect("steps");
    }

    #[tokio::test]
    async fn sync_publishes_snapshot_and_renumbers_steps() {
        let dir = tempfile::tempdir().expect("tempdir");
        let images = fixed_images(2500);
        let (engine, stores) = engine(dir.path(), images.clone()).await;
        seed(&stores).await;

        let report = engine.run().await.expect("sync");
        assert_eq!(report.items.upserted, 2);
        assert_eq!(report.relations.upserted, 1);
        assert!(report.steps_renumbered);
        assert_eq!(report.steps.upserted, 2);
        assert_eq!(report.pages.uploaded, 2);
        assert_eq!(report.failed_rows(), 0);

        let ids: Vec<Option<u64>> = stores
            .steps
            .snapshot()
            .await
            .expect("steps")
            .iter()
            .map(|s| s.step_id)
            .collect();
        assert_eq!(ids, vec![Some(1), Some(2)]);

        let entry = stores.graph.snapshot().await.expect("graph").remove(0);
        assert_eq!(entry.child_pages.len(), 2);
        assert_eq!(stores.pages.snapshot().await.expect("pages").len(), 2);
    }

    #[tokio::test]
    async fn rerun_is_idempotent_and_reuses_pages() {
        let dir = tempfile::tempdir().expect("tempdir");
        let images = fixed_images(2500);
        let (engine, stores) = engine(dir.path(), images.clone()).await;
        seed(&stores).await;

        engine.run().await.expect("first sync");
        let published = |engine: &SyncEngine| {
            let pool = engine.pool.clone();
            async move {
                pool.with_conn(|conn| {
                    Ok((
                        mirror::published_items(conn, "ns")?,
                        mirror::published_pages(conn, "ns")?,
                        mirror::published_steps(conn, "ns")?,
                        mirror::published_relations(conn, "ns")?,
                    ))
                })
                .await
                .expect("select")
            }
        };
        let first = published(&engine).await;

        let report = engine.run().await.expect("second sync");
        let second = published(&engine).await;

        assert_eq!(first, second);
        assert_eq!(report.pages.reused, 2);
        assert_eq!(report.pages.uploaded, 0);
        assert_eq!(images.crops.load(Ordering::SeqCst), 2);
        assert!(!report.steps_renumbered);
    }

    #[tokio::test]
    async fn curated_text_flows_back_into_blank_local_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let images = fixed_images(2500);
        let (engine, stores) = engine(dir.path(), images).await;
        seed(&stores).await;
        engine.run().await.expect("first sync");

        stores
            .items
            .mutate(|items| {
                for item in items.iter_mut() {
                    item.purpose.clear();
                }
            })
            .await
            .expect("clear purpose");

        let report = engine.run().await.expect("second sync");
        assert_eq!(report.backfilled_items, 1);
        let items = stores.items.snapshot().await.expect("items");
        let save = items.iter().find(|i| i.item_id == "a1").expect("save");
        assert_eq!(save.purpose, "persist the form");
    }

    #[tokio::test]
    async fn failed_row_is_counted_and_run_continues() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (engine, stores) = engine(dir.path(), fixed_images(2500)).await;
        seed(&stores).await;
        engine
            .pool
            .with_conn(|conn| {
                conn.execute_batch(
                    "CREATE TRIGGER reject_save BEFORE INSERT ON items
                     WHEN NEW.item_id = 'a1'
                     BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
                )?;
                Ok(())
            })
            .await
            .expect("install trigger");

        let report = engine.run().await.expect("sync");
        assert_eq!(report.items.processed, 2);
        assert_eq!(report.items.upserted, 1);
        assert_eq!(report.items.failed, 1);
        assert_eq!(report.failed_rows(), 1);
        assert_eq!(report.relations.upserted, 1);
        assert_eq!(report.steps.upserted, 2);
        assert_eq!(report.pages.upserted, 2);

        let published = engine
            .pool
            .with_conn(|conn| mirror::published_items(conn, "ns"))
            .await
            .expect("select");
        let ids: Vec<&str> = published.iter().map(|row| row.item_id.as_str()).collect();
        assert_eq!(ids, vec!["p1"]);
    }

    #[tokio::test]
    async fn shrunk_or_missing_image_prunes_stale_pages() {
        let dir = tempfile::tempdir().expect("tempdir");
        let images = fixed_images(2500);
        let (engine, stores) = engine(dir.path(), images.clone()).await;
        seed(&stores).await;
        engine.run().await.expect("first sync");
        assert_eq!(stores.pages.snapshot().await.expect("pages").len(), 2);

        images.height.store(800, Ordering::SeqCst);
        let report = engine.run().await.expect("second sync");
        assert_eq!(report.pages.processed, 1);

        let pages = stores.pages.snapshot().await.expect("pages");
        assert_eq!(pages.len(), 1);
        assert_eq!((pages[0].page_number, pages[0].height), (1, 800));
        let entry = stores.graph.snapshot().await.expect("graph").remove(0);
        let numbers: Vec<u32> = entry.child_pages.iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![1]);
        let mirrored = engine
            .pool
            .with_conn(|conn| mirror::published_pages(conn, "ns"))
            .await
            .expect("select");
        assert_eq!(mirrored.len(), 1);

        images.height.store(0, Ordering::SeqCst);
        engine.run().await.expect("third sync");
        assert!(stores.pages.snapshot().await.expect("pages").is_empty());
        let entry = stores.graph.snapshot().await.expect("graph").remove(0);
        assert!(entry.child_pages.is_empty());
    }

    #[test]
    fn fill_blank_keeps_local_text() {
        let mut purpose = "local".to_string();
        let mut reason = String::new();
        let changed = fill_blank(
            &mut purpose,
            &mut reason,
            &("remote".to_string(), "because".to_string()),
        );
        assert!(changed);
        assert_eq!(purpose, "local");
        assert_eq!(reason, "because");
    }
}
