//! Relational mirror surface: schema, generation flip, upserts keyed by code
//! and reads of the published generation.

use std::collections::HashMap;

use rusqlite::{params, Connection, Row};
use serde_json::Value;

use crate::{
    error::Result,
    models::{BoundingBox, Item, ItemCategory, RECORD_SCHEMA_VERSION},
};

pub const MIRRORED_TABLES: [&str; 5] = ["items", "pages", "steps", "panel_relations", "validations"];

pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS items (
            code TEXT PRIMARY KEY,
            namespace TEXT NOT NULL,
            item_id TEXT NOT NULL,
            category TEXT NOT NULL,
            name TEXT NOT NULL,
            item_type TEXT NOT NULL,
            verb TEXT NOT NULL,
            content TEXT NOT NULL,
            bbox_json TEXT,
            image_url TEXT,
            status TEXT,
            bug_flag INTEGER NOT NULL DEFAULT 0,
            bug_note TEXT,
            modality_stacks_json TEXT NOT NULL,
            metadata_json TEXT NOT NULL,
            purpose TEXT NOT NULL DEFAULT '',
            reason TEXT NOT NULL DEFAULT '',
            published INTEGER NOT NULL DEFAULT 1,
            updated_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS pages (
            code TEXT PRIMARY KEY,
            namespace TEXT NOT NULL,
            page_id TEXT NOT NULL,
            panel_code TEXT NOT NULL,
            page_number INTEGER NOT NULL,
            top INTEGER NOT NULL,
            height INTEGER NOT NULL,
            image_url TEXT,
            image_hash TEXT,
            published INTEGER NOT NULL DEFAULT 1,
            updated_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS steps (
            code TEXT PRIMARY KEY,
            namespace TEXT NOT NULL,
            step_id INTEGER NOT NULL,
            panel_before_code TEXT NOT NULL,
            action_code TEXT NOT NULL,
            panel_after_code TEXT,
            purpose TEXT NOT NULL DEFAULT '',
            reason TEXT NOT NULL DEFAULT '',
            published INTEGER NOT NULL DEFAULT 1,
            updated_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS panel_relations (
            code TEXT PRIMARY KEY,
            namespace TEXT NOT NULL,
            child_code TEXT NOT NULL,
            parent_code TEXT NOT NULL,
            published INTEGER NOT NULL DEFAULT 1,
            updated_at TEXT NOT NULL,
            UNIQUE(child_code, parent_code)
        );
        CREATE TABLE IF NOT EXISTS validations (
            code TEXT PRIMARY KEY,
            namespace TEXT NOT NULL,
            item_code TEXT NOT NULL,
            created_at TEXT NOT NULL,
            day_id TEXT,
            session_id TEXT,
            scene_id TEXT,
            assignee TEXT,
            published INTEGER NOT NULL DEFAULT 1,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_items_namespace ON items(namespace, published);
        CREATE INDEX IF NOT EXISTS idx_pages_namespace ON pages(namespace, published);
        CREATE INDEX IF NOT EXISTS idx_steps_namespace ON steps(namespace, published);
        CREATE INDEX IF NOT EXISTS idx_relations_namespace ON panel_relations(namespace, published);
        CREATE INDEX IF NOT EXISTS idx_validations_namespace ON validations(namespace, published);
        ",
    )?;
    Ok(())
}

/// Opens a new generation: every row of the namespace becomes unpublished.
pub fn unpublish_namespace(conn: &mut Connection, namespace: &str) -> Result<usize> {
    let tx = conn.transaction()?;
    let mut touched = 0;
    for table in MIRRORED_TABLES {
        touched += tx.execute(
            &format!("UPDATE {table} SET published = 0 WHERE namespace = ?1"),
            params![namespace],
        )?;
    }
    tx.commit()?;
    Ok(touched)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemRow {
    pub code: String,
    pub item_id: String,
    pub category: String,
    pub name: String,
    pub item_type: String,
    pub verb: String,
    pub content: String,
    pub bbox_json: Option<String>,
    pub image_url: Option<String>,
    pub status: Option<String>,
    pub bug_flag: bool,
    pub bug_note: Option<String>,
    pub modality_stacks_json: String,
    pub metadata_json: String,
    pub purpose: String,
    pub reason: String,
}

impl ItemRow {
    pub fn from_item(code: String, item: &Item) -> Result<Self> {
        Ok(Self {
            code,
            item_id: item.item_id.clone(),
            category: item.item_category.as_str().to_string(),
            name: item.name.clone(),
            item_type: item.item_type.clone(),
            verb: item.verb.clone(),
            content: item.content.clone(),
            bbox_json: item.bbox.map(|b| serde_json::to_string(&b)).transpose()?,
            image_url: item.image_url.clone(),
            status: item.status.clone(),
            bug_flag: item.bug_flag,
            bug_note: item.bug_note.clone(),
            modality_stacks_json: serde_json::to_string(&item.modality_stacks)?,
            metadata_json: item.metadata.to_string(),
            purpose: item.purpose.clone(),
            reason: item.reason.clone(),
        })
    }

    /// `None` when the stored category is not one this crate knows.
    pub fn into_item(self) -> Option<Item> {
        let category = ItemCategory::parse(&self.category)?;
        let bbox = self
            .bbox_json
            .as_deref()
            .and_then(|raw| serde_json::from_str::<BoundingBox>(raw).ok());
        Some(Item {
            schema_version: RECORD_SCHEMA_VERSION,
            item_id: self.item_id,
            item_category: category,
            name: self.name,
            item_type: self.item_type,
            verb: self.verb,
            content: self.content,
            bbox,
            image_url: self.image_url,
            status: self.status,
            bug_flag: self.bug_flag,
            bug_note: self.bug_note,
            modality_stacks: serde_json::from_str(&self.modality_stacks_json).unwrap_or_default(),
            purpose: self.purpose,
            reason: self.reason,
            metadata: serde_json::from_str(&self.metadata_json).unwrap_or(Value::Null),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageRow {
    pub code: String,
    pub page_id: String,
    pub panel_code: String,
    pub page_number: u32,
    pub top: u32,
    pub height: u32,
    pub image_url: Option<String>,
    pub image_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepRow {
    pub code: String,
    pub step_id: u64,
    pub panel_before_code: String,
    pub action_code: String,
    pub panel_after_code: Option<String>,
    pub purpose: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationRow {
    pub code: String,
    pub child_code: String,
    pub parent_code: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationRow {
    pub code: String,
    pub item_code: String,
    pub created_at: String,
    pub day_id: Option<String>,
    pub session_id: Option<String>,
    pub scene_id: Option<String>,
    pub assignee: Option<String>,
}

/// Purpose and reason are only overwritten by non-empty values.
pub fn upsert_item(conn: &Connection, namespace: &str, row: &ItemRow, now: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO items(code,namespace,item_id,category,name,item_type,verb,content,bbox_json,image_url,status,bug_flag,bug_note,modality_stacks_json,metadata_json,purpose,reason,published,updated_at)
         VALUES(?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,1,?18)
         ON CONFLICT(code) DO UPDATE SET
            namespace=excluded.namespace,
            item_id=excluded.item_id,
            category=excluded.category,
            name=excluded.name,
            item_type=excluded.item_type,
            verb=excluded.verb,
            content=excluded.content,
            bbox_json=excluded.bbox_json,
            image_url=excluded.image_url,
            status=excluded.status,
            bug_flag=excluded.bug_flag,
            bug_note=excluded.bug_note,
            modality_stacks_json=excluded.modality_stacks_json,
            metadata_json=excluded.metadata_json,
            purpose=CASE WHEN excluded.purpose <> '' THEN excluded.purpose ELSE items.purpose END,
            reason=CASE WHEN excluded.reason <> '' THEN excluded.reason ELSE items.reason END,
            published=1,
            updated_at=excluded.updated_at",
        params![
            row.code,
            namespace,
            row.item_id,
            row.category,
            row.name,
            row.item_type,
            row.verb,
            row.content,
            row.bbox_json,
            row.image_url,
            row.status,
            row.bug_flag,
            row.bug_note,
            row.modality_stacks_json,
            row.metadata_json,
            row.purpose,
            row.reason,
            now
        ],
    )?;
    Ok(())
}

pub fn upsert_relation(conn: &Connection, namespace: &str, row: &RelationRow, now: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO panel_relations(code,namespace,child_code,parent_code,published,updated_at)
         VALUES(?1,?2,?3,?4,1,?5)
         ON CONFLICT(code) DO UPDATE SET
            namespace=excluded.namespace,
            published=1,
            updated_at=excluded.updated_at",
        params![row.code, namespace, row.child_code, row.parent_code, now],
    )?;
    Ok(())
}

pub fn upsert_step(conn: &Connection, namespace: &str, row: &StepRow, now: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO steps(code,namespace,step_id,panel_before_code,action_code,panel_after_code,purpose,reason,published,updated_at)
         VALUES(?1,?2,?3,?4,?5,?6,?7,?8,1,?9)
         ON CONFLICT(code) DO UPDATE SET
            namespace=excluded.namespace,
            step_id=excluded.step_id,
            panel_before_code=excluded.panel_before_code,
            action_code=excluded.action_code,
            panel_after_code=excluded.panel_after_code,
            purpose=CASE WHEN excluded.purpose <> '' THEN excluded.purpose ELSE steps.purpose END,
            reason=CASE WHEN excluded.reason <> '' THEN excluded.reason ELSE steps.reason END,
            published=1,
            updated_at=excluded.updated_at",
        params![
            row.code,
            namespace,
            row.step_id as i64,
            row.panel_before_code,
            row.action_code,
            row.panel_after_code,
            row.purpose,
            row.reason,
            now
        ],
    )?;
    Ok(())
}

pub fn upsert_page(conn: &Connection, namespace: &str, row: &PageRow, now: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO pages(code,namespace,page_id,panel_code,page_number,top,height,image_url,image_hash,published,updated_at)
         VALUES(?1,?2,?3,?4,?5,?6,?7,?8,?9,1,?10)
         ON CONFLICT(code) DO UPDATE SET
            namespace=excluded.namespace,
            page_id=excluded.page_id,
            panel_code=excluded.panel_code,
            page_number=excluded.page_number,
            top=excluded.top,
            height=excluded.height,
            image_url=excluded.image_url,
            image_hash=excluded.image_hash,
            published=1,
            updated_at=excluded.updated_at",
        params![
            row.code,
            namespace,
            row.page_id,
            row.panel_code,
            row.page_number,
            row.top,
            row.height,
            row.image_url,
            row.image_hash,
            now
        ],
    )?;
    Ok(())
}

pub fn upsert_validation(
    conn: &Connection,
    namespace: &str,
    row: &ValidationRow,
    now: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO validations(code,namespace,item_code,created_at,day_id,session_id,scene_id,assignee,published,updated_at)
         VALUES(?1,?2,?3,?4,?5,?6,?7,?8,1,?9)
         ON CONFLICT(code) DO UPDATE SET
            namespace=excluded.namespace,
            item_code=excluded.item_code,
            created_at=excluded.created_at,
            day_id=excluded.day_id,
            session_id=excluded.session_id,
            scene_id=excluded.scene_id,
            assignee=excluded.assignee,
            published=1,
            updated_at=excluded.updated_at",
        params![
            row.code,
            namespace,
            row.item_code,
            row.created_at,
            row.day_id,
            row.session_id,
            row.scene_id,
            row.assignee,
            now
        ],
    )?;
    Ok(())
}

fn item_row(row: &Row<'_>) -> rusqlite::Result<ItemRow> {
    Ok(ItemRow {
        code: row.get(0)?,
        item_id: row.get(1)?,
        category: row.get(2)?,
        name: row.get(3)?,
        item_type: row.get(4)?,
        verb: row.get(5)?,
        content: row.get(6)?,
        bbox_json: row.get(7)?,
        image_url: row.get(8)?,
        status: row.get(9)?,
        bug_flag: row.get(10)?,
        bug_note: row.get(11)?,
        modality_stacks_json: row.get(12)?,
        metadata_json: row.get(13)?,
        purpose: row.get(14)?,
        reason: row.get(15)?,
    })
}

pub fn published_items(conn: &Connection, namespace: &str) -> Result<Vec<ItemRow>> {
    let mut stmt = conn.prepare(
        "SELECT code,item_id,category,name,item_type,verb,content,bbox_json,image_url,status,bug_flag,bug_note,modality_stacks_json,metadata_json,purpose,reason
         FROM items WHERE namespace = ?1 AND published = 1 ORDER BY rowid",
    )?;
    let rows = stmt.query_map(params![namespace], item_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn published_pages(conn: &Connection, namespace: &str) -> Result<Vec<PageRow>> {
    let mut stmt = conn.prepare(
        "SELECT code,page_id,panel_code,page_number,top,height,image_url,image_hash
         FROM pages WHERE namespace = ?1 AND published = 1 ORDER BY panel_code, page_number",
    )?;
    let rows = stmt.query_map(params![namespace], |row| {
        Ok(PageRow {
            code: row.get(0)?,
            page_id: row.get(1)?,
            panel_code: row.get(2)?,
            page_number: row.get(3)?,
            top: row.get(4)?,
            height: row.get(5)?,
            image_url: row.get(6)?,
            image_hash: row.get(7)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn published_steps(conn: &Connection, namespace: &str) -> Result<Vec<StepRow>> {
    let mut stmt = conn.prepare(
        "SELECT code,step_id,panel_before_code,action_code,panel_after_code,purpose,reason
         FROM steps WHERE namespace = ?1 AND published = 1 ORDER BY step_id",
    )?;
    let rows = stmt.query_map(params![namespace], |row| {
        Ok(StepRow {
            code: row.get(0)?,
            step_id: row.get::<_, i64>(1)? as u64,
            panel_before_code: row.get(2)?,
            action_code: row.get(3)?,
            panel_after_code: row.get(4)?,
            purpose: row.get(5)?,
            reason: row.get(6)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn published_relations(conn: &Connection, namespace: &str) -> Result<Vec<RelationRow>> {
    let mut stmt = conn.prepare(
        "SELECT code,child_code,parent_code
         FROM panel_relations WHERE namespace = ?1 AND published = 1 ORDER BY rowid",
    )?;
    let rows = stmt.query_map(params![namespace], |row| {
        Ok(RelationRow {
            code: row.get(0)?,
            child_code: row.get(1)?,
            parent_code: row.get(2)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn published_validations(conn: &Connection, namespace: &str) -> Result<Vec<ValidationRow>> {
    let mut stmt = conn.prepare(
        "SELECT code,item_code,created_at,day_id,session_id,scene_id,assignee
         FROM validations WHERE namespace = ?1 AND published = 1 ORDER BY rowid",
    )?;
    let rows = stmt.query_map(params![namespace], |row| {
        Ok(ValidationRow {
            code: row.get(0)?,
            item_code: row.get(1)?,
            created_at: row.get(2)?,
            day_id: row.get(3)?,
            session_id: row.get(4)?,
            scene_id: row.get(5)?,
            assignee: row.get(6)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CuratedTable {
    Items,
    Steps,
}

impl CuratedTable {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Items => "items",
            Self::Steps => "steps",
        }
    }
}

/// Non-empty purpose/reason text of published rows, keyed by code.
pub fn curated_text(
    conn: &Connection,
    table: CuratedTable,
    namespace: &str,
) -> Result<HashMap<String, (String, String)>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT code,purpose,reason FROM {} WHERE namespace = ?1 AND published = 1 AND (purpose <> '' OR reason <> '')",
        table.as_str()
    ))?;
    let rows = stmt.query_map(params![namespace], |row| {
        Ok((
            row.get::<_, String>(0)?,
            (row.get::<_, String>(1)?, row.get::<_, String>(2)?),
        ))
    })?;
    let mut out = HashMap::new();
    for row in rows {
        let (code, text) = row?;
        out.insert(code, text);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: &str = "2026-01-01T00:00:00+00:00";

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().expect("open");
        ensure_schema(&conn).expect("schema");
        conn
    }

    fn row(code: &str, purpose: &str) -> ItemRow {
        let mut item = Item::new("i1", ItemCategory::Panel, "Home");
        item.purpose = purpose.to_string();
        ItemRow::from_item(code.to_string(), &item).expect("row")
    }

    #[test]
    fn blank_purpose_does_not_erase_curated_text() {
        let conn = conn();
        upsert_item(&conn, "ns", &row("ns_PANEL-home", "landing page"), NOW).expect("first");
        upsert_item(&conn, "ns", &row("ns_PANEL-home", ""), NOW).expect("second");

        let rows = published_items(&conn, "ns").expect("select");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].purpose, "landing page");

        let curated = curated_text(&conn, CuratedTable::Items, "ns").expect("curated");
        assert_eq!(curated["ns_PANEL-home"].0, "landing page");
    }

    #[test]
    fn unpublish_hides_rows_until_upserted_again() {
        let mut conn = conn();
        upsert_item(&conn, "ns", &row("ns_PANEL-home", ""), NOW).expect("item");
        upsert_item(&conn, "other", &row("other_PANEL-home", ""), NOW).expect("other ns");

        assert_eq!(unpublish_namespace(&mut conn, "ns").expect("unpublish"), 1);
        assert!(published_items(&conn, "ns").expect("select").is_empty());
        assert_eq!(published_items(&conn, "other").expect("select").len(), 1);

        upsert_item(&conn, "ns", &row("ns_PANEL-home", ""), NOW).expect("republish");
        assert_eq!(published_items(&conn, "ns").expect("select").len(), 1);
    }

    #[test]
    fn item_rows_convert_back_to_items() {
        let mut item = Item::new("a1", ItemCategory::Action, "Save")
            .with_bbox(BoundingBox::new(1.0, 2.0, 3.0, 4.0));
        item.modality_stacks = vec!["click".to_string()];
        item.metadata = serde_json::json!({"source": "dom"});
        let back = ItemRow::from_item("c".to_string(), &item)
            .expect("row")
            .into_item()
            .expect("item");
        assert_eq!(back, item);
    }
}
