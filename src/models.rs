use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const RECORD_SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    RECORD_SCHEMA_VERSION
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemCategory {
    Panel,
    Action,
    Page,
}

impl ItemCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Panel => "PANEL",
            Self::Action => "ACTION",
            Self::Page => "PAGE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PANEL" => Some(Self::Panel),
            "ACTION" => Some(Self::Action),
            "PAGE" => Some(Self::Page),
            _ => None,
        }
    }
}

/// Axis-aligned box in screenshot pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Smallest box covering both inputs.
    pub fn hull(&self, other: &BoundingBox) -> BoundingBox {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        BoundingBox {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub item_id: String,
    pub item_category: ItemCategory,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub verb: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, alias = "coordinate")]
    pub bbox: Option<BoundingBox>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub bug_flag: bool,
    #[serde(default)]
    pub bug_note: Option<String>,
    #[serde(default)]
    pub modality_stacks: Vec<String>,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub metadata: Value,
}

impl Item {
    pub fn new(item_id: impl Into<String>, category: ItemCategory, name: impl Into<String>) -> Self {
        Self {
            schema_version: RECORD_SCHEMA_VERSION,
            item_id: item_id.into(),
            item_category: category,
            name: name.into(),
            item_type: String::new(),
            verb: String::new(),
            content: String::new(),
            bbox: None,
            image_url: None,
            status: None,
            bug_flag: false,
            bug_note: None,
            modality_stacks: Vec::new(),
            purpose: String::new(),
            reason: String::new(),
            metadata: Value::Null,
        }
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn is_panel(&self) -> bool {
        self.item_category == ItemCategory::Panel
    }
}

/// Partial update applied through [`crate::catalog::ItemCatalog::update`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub item_type: Option<String>,
    pub verb: Option<String>,
    pub content: Option<String>,
    pub bbox: Option<BoundingBox>,
    pub image_url: Option<String>,
    pub status: Option<String>,
    pub bug_flag: Option<bool>,
    pub bug_note: Option<String>,
    pub modality_stacks: Option<Vec<String>>,
    pub purpose: Option<String>,
    pub reason: Option<String>,
    pub metadata: Option<Value>,
}

impl ItemPatch {
    pub fn apply(self, item: &mut Item) {
        if let Some(v) = self.name {
            item.name = v;
        }
        if let Some(v) = self.item_type {
            item.item_type = v;
        }
        if let Some(v) = self.verb {
            item.verb = v;
        }
        if let Some(v) = self.content {
            item.content = v;
        }
        if let Some(v) = self.bbox {
            item.bbox = Some(v);
        }
        if let Some(v) = self.image_url {
            item.image_url = Some(v);
        }
        if let Some(v) = self.status {
            item.status = Some(v);
        }
        if let Some(v) = self.bug_flag {
            item.bug_flag = v;
        }
        if let Some(v) = self.bug_note {
            item.bug_note = Some(v);
        }
        if let Some(v) = self.modality_stacks {
            item.modality_stacks = v;
        }
        if let Some(v) = self.purpose {
            item.purpose = v;
        }
        if let Some(v) = self.reason {
            item.reason = v;
        }
        if let Some(v) = self.metadata {
            item.metadata = v;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRef {
    pub page_number: u32,
    pub page_id: String,
    #[serde(default)]
    pub child_actions: Vec<String>,
}

/// One node of the panel hierarchy. The child lists have set semantics but
/// keep insertion order so rewritten files stay stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEntry {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub parent_panel: String,
    #[serde(default)]
    pub child_actions: Vec<String>,
    #[serde(default)]
    pub child_panels: Vec<String>,
    #[serde(default)]
    pub child_pages: Vec<PageRef>,
    #[serde(default)]
    pub parent_dom: Vec<Value>,
}

impl GraphEntry {
    pub fn new(parent_panel: impl Into<String>) -> Self {
        Self {
            schema_version: RECORD_SCHEMA_VERSION,
            parent_panel: parent_panel.into(),
            child_actions: Vec::new(),
            child_panels: Vec::new(),
            child_pages: Vec::new(),
            parent_dom: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub step_id: Option<u64>,
    pub panel_before: String,
    pub action: String,
    #[serde(default)]
    pub panel_after: Option<String>,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub reason: String,
}

impl Step {
    pub fn new(
        panel_before: impl Into<String>,
        action: impl Into<String>,
        panel_after: Option<String>,
    ) -> Self {
        Self {
            schema_version: RECORD_SCHEMA_VERSION,
            step_id: None,
            panel_before: panel_before.into(),
            action: action.into(),
            panel_after,
            purpose: String::new(),
            reason: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRecord {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub item_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub day_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub scene_id: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
}

/// Local record of one fixed-height crop of a panel screenshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub page_id: String,
    pub panel_id: String,
    pub page_number: u32,
    pub top: u32,
    pub height: u32,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub panel_image_hash: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Sync,
    Load,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobErrorPayload {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct JobRecord {
    pub job_id: String,
    pub kind: JobKind,
    pub role: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: JobState,
    pub message: Option<String>,
    pub report: Option<Value>,
    pub error: Option<JobErrorPayload>,
}

impl JobRecord {
    pub fn queued(job_id: String, kind: JobKind, role: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            kind,
            role,
            created_at: now,
            updated_at: now,
            status: JobState::Queued,
            message: Some("Queued".to_string()),
            report: None,
            error: None,
        }
    }

    pub fn to_response(&self) -> JobResponse {
        let elapsed = (Utc::now() - self.created_at).num_milliseconds().max(0) as u64;
        JobResponse {
            job_id: self.job_id.clone(),
            kind: self.kind,
            status: self.status.clone(),
            elapsed_ms: elapsed,
            message: self.message.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            report: self.report.clone(),
            error: self.error.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    pub job_id: String,
    pub kind: JobKind,
    pub status: JobState,
    pub elapsed_ms: u64,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobErrorPayload>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_reads_legacy_coordinate_field_and_defaults() {
        let raw = r#"{"item_id":"a1","item_category":"ACTION","name":"Save","type":"button","coordinate":{"x":1.0,"y":2.0,"width":3.0,"height":4.0}}"#;
        let item: Item = serde_json::from_str(raw).expect("parse item");
        assert_eq!(item.schema_version, RECORD_SCHEMA_VERSION);
        assert_eq!(item.item_type, "button");
        assert_eq!(item.bbox, Some(BoundingBox::new(1.0, 2.0, 3.0, 4.0)));
        assert!(item.purpose.is_empty());
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut item = Item::new("p1", ItemCategory::Panel, "Home");
        item.reason = "kept".to_string();
        ItemPatch {
            purpose: Some("open settings".to_string()),
            ..Default::default()
        }
        .apply(&mut item);
        assert_eq!(item.purpose, "open settings");
        assert_eq!(item.reason, "kept");
        assert_eq!(item.name, "Home");
    }

    #[test]
    fn hull_covers_both_boxes() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(20.0, 5.0, 5.0, 30.0);
        assert_eq!(a.hull(&b), BoundingBox::new(0.0, 0.0, 25.0, 35.0));
    }
}
