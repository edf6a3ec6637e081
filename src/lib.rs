pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod identity;
pub mod loader;
pub mod media;
pub mod mirror;
pub mod models;
pub mod pool;
pub mod record_store;
pub mod stores;
pub mod sync;
pub mod worker;

use std::{collections::HashMap, sync::Arc};

use anyhow::{Context, Result};
use tokio::sync::{mpsc, RwLock};

pub use error::Error;

use crate::{
    catalog::StoreCatalog,
    config::Config,
    graph::GraphManager,
    identity::IdentityResolver,
    loader::DatabaseLoader,
    media::{DirectoryMediaStore, FileImageSource, MediaStore, PanelImageSource},
    models::JobRecord,
    pool::ConnectionPool,
    stores::LocalStores,
    sync::{SyncEngine, SyncSettings},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub jobs: Arc<RwLock<HashMap<String, JobRecord>>>,
    pub queue_tx: mpsc::Sender<String>,
    pub pool: ConnectionPool,
    pub stores: LocalStores,
    pub graph: GraphManager,
    pub sync: SyncEngine,
    pub loader: DatabaseLoader,
}

impl AppState {
    /// Wires stores, pool and engines for `config`, with screenshots read from
    /// the data directory and page crops written under `<data_dir>/media`.
    pub async fn open(config: Config) -> Result<(Self, mpsc::Receiver<String>)> {
        let images = Arc::new(FileImageSource::new(&config.data_dir));
        let media = Arc::new(DirectoryMediaStore::new(config.data_dir.join("media")));
        Self::open_with(config, images, media).await
    }

    pub async fn open_with(
        config: Config,
        images: Arc<dyn PanelImageSource>,
        media: Arc<dyn MediaStore>,
    ) -> Result<(Self, mpsc::Receiver<String>)> {
        let identity = IdentityResolver::new(config.namespace.clone())?;
        let stores = LocalStores::open(&config.data_dir);
        let pool = ConnectionPool::open(&config.mirror_path, config.pool_size)
            .await
            .with_context(|| format!("Failed to open mirror {}", config.mirror_path.display()))?;
        let graph = GraphManager::new(
            stores.graph.clone(),
            Arc::new(StoreCatalog::new(stores.items.clone())),
        );

        let sync = SyncEngine::new(
            pool.clone(),
            identity.clone(),
            stores.clone(),
            graph.clone(),
            images,
            media,
            SyncSettings {
                session_record_id: config.session_record_id.clone(),
                page_height: config.page_height,
                max_pages_per_panel: config.max_pages_per_panel,
            },
        );
        let loader = DatabaseLoader::new(pool.clone(), identity, stores.clone());

        let (queue_tx, queue_rx) = mpsc::channel(config.queue_capacity);
        let state = Self {
            config,
            jobs: Arc::new(RwLock::new(HashMap::new())),
            queue_tx,
            pool,
            stores,
            graph,
            sync,
            loader,
        };
        Ok((state, queue_rx))
    }
}
