use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

use crate::{
    error::{Error, Result},
    loader::LoadRole,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub namespace: String,
    pub session_record_id: String,
    pub data_dir: PathBuf,
    pub mirror_path: PathBuf,
    pub pool_size: usize,
    pub role: LoadRole,
    pub sync_interval: Option<Duration>,
    pub load_interval: Option<Duration>,
    pub page_height: u32,
    pub max_pages_per_panel: usize,
    pub bind_addr: SocketAddr,
    pub queue_capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().trim_matches('"').trim_matches('\'').to_string())
                .filter(|v| !v.is_empty())
        };

        let namespace = var("PANELGRAPH_NAMESPACE")
            .ok_or(Error::MissingNamespace("PANELGRAPH_NAMESPACE"))?;

        let session_record_id =
            var("PANELGRAPH_SESSION_ID").unwrap_or_else(|| namespace.clone());

        let data_dir = PathBuf::from(var("PANELGRAPH_DATA_DIR").unwrap_or_else(|| "./data".to_string()));

        let mirror_path = var("PANELGRAPH_MIRROR_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("mirror.sqlite"));

        let pool_size = var("PANELGRAPH_POOL_SIZE")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(4);

        let role = var("PANELGRAPH_ROLE")
            .map(|v| LoadRole::parse(&v))
            .unwrap_or_default();

        let sync_interval = interval(var("PANELGRAPH_SYNC_INTERVAL_SECONDS"), 300);
        let load_interval = interval(var("PANELGRAPH_LOAD_INTERVAL_SECONDS"), 0);

        let page_height = var("PANELGRAPH_PAGE_HEIGHT")
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(1080);

        let max_pages_per_panel = var("PANELGRAPH_MAX_PAGES_PER_PANEL")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(10);

        let bind_addr = var("PANELGRAPH_BIND_ADDR")
            .and_then(|v| v.parse::<SocketAddr>().ok())
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8787)));

        let queue_capacity = var("PANELGRAPH_QUEUE_CAPACITY")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(32);

        Ok(Self {
            namespace,
            session_record_id,
            data_dir,
            mirror_path,
            pool_size,
            role,
            sync_interval,
            load_interval,
            page_height,
            max_pages_per_panel,
            bind_addr,
            queue_capacity,
        })
    }
}

fn interval(raw: Option<String>, default_seconds: u64) -> Option<Duration> {
    let seconds = raw
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default_seconds);
    (seconds > 0).then(|| Duration::from_secs(seconds))
}
