//! Job queue for sync and load runs.
//!
//! One task drains the queue, so at most one run touches the stores and the
//! mirror at any time. Periodic runs are submitted through the same queue.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use tokio::{sync::mpsc, time};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    loader::LoadRole,
    models::{JobErrorPayload, JobKind, JobRecord, JobState},
    AppState,
};

/// Finished jobs are forgotten after this long.
const JOB_RETENTION_HOURS: i64 = 24;

/// Registers a queued job and hands its id to the worker. The record is
/// removed again if the queue is gone.
pub async fn submit_job(state: &AppState, kind: JobKind, role: Option<LoadRole>) -> Result<JobRecord> {
    let job_id = Uuid::new_v4().to_string();
    let role = match kind {
        JobKind::Load => Some(role.unwrap_or(state.config.role).as_str().to_string()),
        JobKind::Sync => None,
    };
    let record = JobRecord::queued(job_id.clone(), kind, role);

    {
        let mut jobs = state.jobs.write().await;
        jobs.insert(job_id.clone(), record.clone());
    }

    if state.queue_tx.send(job_id.clone()).await.is_err() {
        let mut jobs = state.jobs.write().await;
        jobs.remove(&job_id);
        anyhow::bail!("job queue is closed");
    }
    Ok(record)
}

pub fn spawn_job_worker(state: AppState, mut queue_rx: mpsc::Receiver<String>) {
    tokio::spawn(async move {
        while let Some(job_id) = queue_rx.recv().await {
            info!(job_id = %job_id, "Worker picked job");
            if let Err(err) = process_job(&state, &job_id).await {
                error!("Job {job_id} failed: {err:#}");
                let mut jobs = state.jobs.write().await;
                if let Some(job) = jobs.get_mut(&job_id) {
                    let code = match job.kind {
                        JobKind::Sync => "SYNC_FAILED",
                        JobKind::Load => "LOAD_FAILED",
                    };
                    job.status = JobState::Failed;
                    job.updated_at = Utc::now();
                    job.message = Some("Run failed".to_string());
                    job.error = Some(JobErrorPayload {
                        code: code.to_string(),
                        message: format!("{err:#}"),
                    });
                }
            }
        }
        info!("Job queue closed");
    });
}

/// Submits a job of `kind` every `period`. The first run fires immediately.
pub fn spawn_periodic(state: AppState, kind: JobKind, period: Duration) {
    tokio::spawn(async move {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if has_pending(&state, kind).await {
                info!(kind = ?kind, "Skipping periodic run: one is already pending");
                continue;
            }
            if let Err(err) = submit_job(&state, kind, None).await {
                warn!(kind = ?kind, "Failed to submit periodic run: {err:#}");
                return;
            }
        }
    });
}

pub fn spawn_cleanup_worker(state: AppState) {
    tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_secs(600));
        loop {
            interval.tick().await;
            let removed = prune_finished_jobs(&state).await;
            if removed > 0 {
                info!(removed, "Pruned finished jobs");
            }
        }
    });
}

async fn has_pending(state: &AppState, kind: JobKind) -> bool {
    let jobs = state.jobs.read().await;
    jobs.values()
        .any(|job| job.kind == kind && matches!(job.status, JobState::Queued | JobState::Running))
}

async fn prune_finished_jobs(state: &AppState) -> usize {
    let cutoff = Utc::now() - ChronoDuration::hours(JOB_RETENTION_HOURS);
    let mut jobs = state.jobs.write().await;
    let before = jobs.len();
    jobs.retain(|_, job| {
        matches!(job.status, JobState::Queued | JobState::Running) || job.updated_at > cutoff
    });
    before - jobs.len()
}

async fn process_job(state: &AppState, job_id: &str) -> Result<()> {
    let (kind, role) = {
        let mut jobs = state.jobs.write().await;
        let Some(job) = jobs.get_mut(job_id) else {
            anyhow::bail!("Unknown job id: {job_id}");
        };
        job.status = JobState::Running;
        job.message = Some("Running".to_string());
        job.updated_at = Utc::now();
        job.error = None;
        (job.kind, job.role.clone())
    };

    let report = match kind {
        JobKind::Sync => {
            let report = state.sync.run().await.context("Mirror sync failed")?;
            serde_json::to_value(report)?
        }
        JobKind::Load => {
            let role = role
                .as_deref()
                .map(LoadRole::parse)
                .unwrap_or(state.config.role);
            let report = state.loader.run(role).await.context("Mirror load failed")?;
            serde_json::to_value(report)?
        }
    };

    let mut jobs = state.jobs.write().await;
    if let Some(job) = jobs.get_mut(job_id) {
        job.status = JobState::Completed;
        job.message = Some("Completed".to_string());
        job.updated_at = Utc::now();
        job.report = Some(report);
    }
    info!(job_id = %job_id, kind = ?kind, "Job completed");
    Ok(())
}
