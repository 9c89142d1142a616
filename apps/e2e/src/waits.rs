//! Waiting for plans and jobs to reach their target phase.
//!
//! Every wait polls first and then re-fetches once more to assert the final
//! phase, so a transition right after the last poll is still caught.

use jibutest_client::{
    ApiError, BackupJob, BackupPlan, JibuClient, JobListOptions, JobPhase, Resource, ResourcePhase,
    RestoreJob, RestorePlan,
};
use jibutest_core::{poll_for, poll_until, PollSettings};
use std::fmt::Display;
use std::future::Future;
use tracing::debug;

use crate::error::{Result, ScenarioError};

fn phase_label<P: Display>(phase: Option<P>) -> String {
    phase
        .map(|p| p.to_string())
        .unwrap_or_else(|| "<none>".to_string())
}

async fn wait_resource_ready<R, F, Fut>(
    what: String,
    settings: PollSettings,
    mut fetch: F,
    phase_of: fn(&R) -> Option<ResourcePhase>,
) -> Result<R>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<R, ApiError>>,
{
    let label = what.as_str();
    poll_until(settings, || {
        let request = fetch();
        async move {
            let resource = request.await?;
            let phase = phase_of(&resource);
            debug!("{} phase: {}", label, phase_label(phase));
            Ok::<_, ApiError>(phase == Some(ResourcePhase::Ready))
        }
    })
    .await
    .map_err(|e| ScenarioError::from_poll(format!("{} phase Ready", what), e))?;

    let resource = fetch().await?;
    match phase_of(&resource) {
        Some(ResourcePhase::Ready) => Ok(resource),
        actual => Err(ScenarioError::UnexpectedPhase {
            what,
            expected: ResourcePhase::Ready.to_string(),
            actual: phase_label(actual),
        }),
    }
}

async fn wait_job_completed<J, F, Fut>(
    what: String,
    settings: PollSettings,
    mut fetch: F,
    phase_of: fn(&J) -> Option<JobPhase>,
) -> Result<J>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<J, ApiError>>,
{
    let label = what.as_str();
    poll_until(settings, || {
        let request = fetch();
        async move {
            let job = request.await?;
            let phase = phase_of(&job);
            debug!("{} phase: {}", label, phase_label(phase));
            Ok::<_, ApiError>(phase.is_some_and(|p| p.is_terminal()))
        }
    })
    .await
    .map_err(|e| ScenarioError::from_poll(format!("{} terminal phase", what), e))?;

    let job = fetch().await?;
    match phase_of(&job) {
        Some(JobPhase::Completed) => Ok(job),
        actual => Err(ScenarioError::UnexpectedPhase {
            what,
            expected: JobPhase::Completed.to_string(),
            actual: phase_label(actual),
        }),
    }
}

pub async fn wait_backup_plan_ready(
    client: &JibuClient,
    tenant: &str,
    name: &str,
    settings: PollSettings,
) -> Result<BackupPlan> {
    wait_resource_ready(
        format!("backup plan {}", name),
        settings,
        || client.get_backup_plan(tenant, name),
        BackupPlan::phase,
    )
    .await
}

pub async fn wait_restore_plan_ready(
    client: &JibuClient,
    tenant: &str,
    name: &str,
    settings: PollSettings,
) -> Result<RestorePlan> {
    wait_resource_ready(
        format!("restore plan {}", name),
        settings,
        || client.get_restore_plan(tenant, name),
        RestorePlan::phase,
    )
    .await
}

/// Wait until the job stops, then require that it completed.
pub async fn wait_backup_job_complete(
    client: &JibuClient,
    tenant: &str,
    name: &str,
    settings: PollSettings,
) -> Result<BackupJob> {
    wait_job_completed(
        format!("backup job {}", name),
        settings,
        || client.get_backup_job(tenant, name),
        BackupJob::phase,
    )
    .await
}

pub async fn wait_restore_job_complete(
    client: &JibuClient,
    tenant: &str,
    name: &str,
    settings: PollSettings,
) -> Result<RestoreJob> {
    wait_job_completed(
        format!("restore job {}", name),
        settings,
        || client.get_restore_job(tenant, name),
        RestoreJob::phase,
    )
    .await
}

/// Wait for the `index`-th job of a plan (zero-based, oldest first) to exist.
pub async fn wait_nth_backup_job(
    client: &JibuClient,
    tenant: &str,
    plan: &str,
    index: usize,
    settings: PollSettings,
) -> Result<BackupJob> {
    let options = JobListOptions::for_plan_by_creation(plan);
    poll_for(settings, || {
        let request = client.list_backup_jobs(tenant, &options);
        async move {
            let jobs = request.await?;
            debug!("Plan {} has {} job(s), waiting for index {}", plan, jobs.len(), index);
            Ok::<_, ApiError>(jobs.into_iter().nth(index))
        }
    })
    .await
    .map_err(|e| ScenarioError::from_poll(format!("backup job #{} of plan {}", index, plan), e))
}

/// The oldest job of a plan.
pub async fn first_backup_job(client: &JibuClient, tenant: &str, plan: &str) -> Result<BackupJob> {
    let jobs = client
        .list_backup_jobs(tenant, &JobListOptions::for_plan_by_creation(plan))
        .await?;
    jobs.into_iter()
        .next()
        .ok_or_else(|| ScenarioError::NoBackupJob(plan.to_string()))
}

/// Delete every job of a plan. Keeps going past failures and returns the last one.
pub async fn delete_jobs_of_backup_plan(
    client: &JibuClient,
    tenant: &str,
    plan: &str,
) -> std::result::Result<usize, ApiError> {
    let jobs = client
        .list_backup_jobs(tenant, &JobListOptions::for_plan(plan))
        .await?;

    let mut deleted = 0;
    let mut last_error = None;
    for job in &jobs {
        match client.delete_backup_job(tenant, job.name()).await {
            Ok(()) => deleted += 1,
            Err(e) => last_error = Some(e),
        }
    }
    match last_error {
        Some(e) => Err(e),
        None => Ok(deleted),
    }
}
