use anyhow::Result;
use panelgraph_sync::{api, config::Config, models::JobKind, worker, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "panelgraph_sync=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let (state, queue_rx) = AppState::open(config.clone()).await?;

    worker::spawn_job_worker(state.clone(), queue_rx);
    worker::spawn_cleanup_worker(state.clone());
    if let Some(period) = config.sync_interval {
        worker::spawn_periodic(state.clone(), JobKind::Sync, period);
    }
    if let Some(period) = config.load_interval {
        worker::spawn_periodic(state.clone(), JobKind::Load, period);
    }

    let pool = state.pool.clone();
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(
        namespace = %config.namespace,
        role = config.role.as_str(),
        "panelgraph-sync listening on {}",
        config.bind_addr
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    pool.close();
    info!("panelgraph-sync stopped");
    Ok(())
}
