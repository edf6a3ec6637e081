use std::path::{Path, PathBuf};

use crate::{
    models::{GraphEntry, Item, Page, Step, ValidationRecord},
    record_store::RecordStore,
};

pub const ITEMS_FILE: &str = "items.jsonl";
pub const GRAPH_FILE: &str = "graph.jsonl";
pub const STEPS_FILE: &str = "steps.jsonl";
pub const PAGES_FILE: &str = "pages.jsonl";
pub const VALIDATIONS_FILE: &str = "validations.jsonl";

/// The record files of one namespace. Every component that touches a file
/// must go through the store handed out here so writes share one queue.
#[derive(Debug, Clone)]
pub struct LocalStores {
    pub root: PathBuf,
    pub items: RecordStore<Item>,
    pub graph: RecordStore<GraphEntry>,
    pub steps: RecordStore<Step>,
    pub pages: RecordStore<Page>,
    pub validations: RecordStore<ValidationRecord>,
}

impl LocalStores {
    pub fn open(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            items: RecordStore::open(root.join(ITEMS_FILE)),
            graph: RecordStore::open(root.join(GRAPH_FILE)),
            steps: RecordStore::open(root.join(STEPS_FILE)),
            pages: RecordStore::open(root.join(PAGES_FILE)),
            validations: RecordStore::open(root.join(VALIDATIONS_FILE)),
            root,
        }
    }
}
