//! The backup-then-restore scenario.
//!
//! ```text
//! clean up ─► pick cluster ─► pick namespace ─► pick storage ─► backup plan Ready
//!         ─► backup job(s) Completed ─► restore plan ─► restore job Completed ─► clean up
//! ```

use humantime::format_duration;
use jibutest_client::{
    BackupJob, BackupJobSpec, BackupPlan, BackupPlanSpec, BackupPolicy, Cluster, JibuClient,
    Resource, ResourcePhase, RestoreJob, RestoreJobSpec, RestorePlan, RestorePlanSpec, Storage,
    ACTION_START_JOB,
};
use jibutest_core::naming::derive_restore_namespace;
use jibutest_core::{CronTicks, PollSettings, RepeatedJobCoordinator, ResourceSelector, TickContext};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, RepeatSettings, ScenarioConfig};
use crate::error::{Result, ScenarioError};
use crate::namespace;
use crate::sources::{ClusterSource, NamespaceSource, StorageSource};
use crate::waits;

/// What a run picked and created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioReport {
    pub backup_cluster: Option<String>,
    pub backup_namespace: Option<String>,
    pub storage: Option<String>,
    pub backup_plan: String,
    /// Completed backup jobs, oldest first.
    pub backup_jobs: Vec<String>,
    pub restore_cluster: Option<String>,
    pub restore_namespace: Option<String>,
    pub restore_plan: String,
    pub restore_job: Option<String>,
    /// The backup job the restore was made from.
    pub restored_from: Option<String>,
    /// Namespace deleted on the restore cluster during cleanup.
    pub deleted_namespace: Option<String>,
}

impl ScenarioReport {
    /// The restored namespace, if it is safe to delete: it must differ from
    /// the backed-up namespace unless it lives on another known cluster.
    pub fn restored_namespace_to_delete(&self) -> Option<&str> {
        self.restore_job.as_ref()?;
        let restore_namespace = self.restore_namespace.as_deref()?;
        let same_namespace = self.backup_namespace.as_deref() == Some(restore_namespace);
        let same_cluster = match (&self.backup_cluster, &self.restore_cluster) {
            (Some(backup), Some(restore)) => backup == restore,
            _ => true,
        };
        if same_namespace && same_cluster {
            return None;
        }
        Some(restore_namespace)
    }
}

/// Run the scenario described by `config` against its API endpoint.
pub async fn run_scenario(config: &ScenarioConfig) -> Result<ScenarioReport> {
    let client = JibuClient::new(&config.api_endpoint)?;
    Scenario::new(config, client).run().await
}

pub struct Scenario<'a> {
    config: &'a ScenarioConfig,
    client: JibuClient,
    selector: ResourceSelector,
}

/// Mutable progress of one run, kept for the final cleanup even on failure.
#[derive(Debug, Default)]
struct RunState {
    report: ScenarioReport,
    restore_kubeconfig: Option<String>,
}

impl<'a> Scenario<'a> {
    pub fn new(config: &'a ScenarioConfig, client: JibuClient) -> Self {
        Self {
            config,
            client,
            selector: ResourceSelector::new(config.pick_retry_limit),
        }
    }

    pub async fn run(&self) -> Result<ScenarioReport> {
        let mut state = RunState {
            report: ScenarioReport {
                backup_cluster: self.config.backup_cluster.clone(),
                backup_namespace: self.config.backup_namespace.clone(),
                storage: self.config.storage.clone(),
                backup_plan: self.config.names.backup_plan.clone(),
                restore_cluster: self.config.restore_cluster.clone(),
                restore_namespace: self.config.restore_namespace.clone(),
                restore_plan: self.config.names.restore_plan.clone(),
                ..Default::default()
            },
            restore_kubeconfig: None,
        };

        self.clean_up_at_start().await;

        let result = self.execute(&mut state).await;
        if let Err(e) = &result {
            warn!("Scenario failed: {}", e);
        }

        if self.config.clean_up_on_end {
            self.clean_up_at_end(&mut state).await;
        }

        result.map(|()| state.report)
    }

    async fn execute(&self, state: &mut RunState) -> Result<()> {
        if !self.config.skip_backup {
            self.run_backup(&mut state.report).await?;
        }
        if !self.config.skip_restore {
            self.run_restore(state).await?;
        }
        Ok(())
    }

    fn tenant(&self) -> &str {
        &self.config.tenant
    }

    fn settings(&self, timeout: std::time::Duration) -> PollSettings {
        PollSettings::new(self.config.timeouts.poll_interval, timeout)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Backup
    // ─────────────────────────────────────────────────────────────────────────

    async fn run_backup(&self, report: &mut ScenarioReport) -> Result<()> {
        let config = self.config;
        let names = &config.names;

        info!("pick a cluster for backup");
        let cluster = self.pick_cluster(config.backup_cluster.as_deref(), "backup cluster").await?;
        info!(
            "cluster is picked, id={}, display-name={}",
            cluster.name(),
            cluster.spec.display_name
        );
        report.backup_cluster = Some(cluster.name().to_string());

        info!("pick a namespace");
        let namespaces = NamespaceSource {
            client: &self.client,
            tenant: self.tenant(),
            cluster: cluster.name(),
        };
        let namespace = self
            .selector
            .select_excluding(
                config.backup_namespace.as_deref(),
                &namespaces,
                |ns| ns.name(),
                &config.exclude_namespaces,
            )
            .await
            .map_err(ScenarioError::select("backup namespace"))?;
        info!("namespace {} is picked", namespace.name());
        report.backup_namespace = Some(namespace.name().to_string());

        info!("pick a storage");
        let storage = self.pick_storage(config.storage.as_deref()).await?;
        info!(
            "storage is picked, id={}, display-name={}",
            storage.name(),
            storage.spec.display_name
        );
        report.storage = Some(storage.name().to_string());

        info!("create a backup plan");
        let plan = BackupPlan::new(
            &names.backup_plan,
            BackupPlanSpec {
                cluster_name: cluster.name().to_string(),
                copy_method: config.copy_method,
                desc: names.backup_plan.clone(),
                display_name: names.backup_plan.clone(),
                exclude_pv: !config.backup_with_pv,
                namespaces: vec![namespace.name().to_string()],
                policy: BackupPolicy {
                    retention: config.job_retention,
                    repeat: config.repeat.is_some(),
                    frequency: config
                        .repeat
                        .as_ref()
                        .map(|r| r.frequency.clone())
                        .unwrap_or_default(),
                },
                storage_name: storage.name().to_string(),
                tenant: config.tenant.clone(),
            },
        );
        self.client.create_backup_plan(self.tenant(), &plan).await?;
        info!("backup plan {} created", names.backup_plan);

        let timeout = config.timeouts.backup_plan_ready;
        info!("backup plan should be ready in {}", format_duration(timeout));
        waits::wait_backup_plan_ready(
            &self.client,
            self.tenant(),
            &names.backup_plan,
            self.settings(timeout),
        )
        .await?;
        info!("backup plan is ready now");

        match &config.repeat {
            None => {
                report.backup_jobs.push(self.run_backup_job().await?);
            }
            Some(repeat) => {
                report.backup_jobs = self.wait_repeated_backup_jobs(repeat).await?;
            }
        }
        Ok(())
    }

    async fn run_backup_job(&self) -> Result<String> {
        let names = &self.config.names;

        info!("create a backup job");
        let job = BackupJob::new(
            &names.backup_job,
            BackupJobSpec {
                action: ACTION_START_JOB.to_string(),
                backup_name: names.backup_plan.clone(),
                desc: names.backup_job.clone(),
                display_name: names.backup_job.clone(),
                tenant: self.config.tenant.clone(),
            },
        );
        self.client.create_backup_job(self.tenant(), &job).await?;
        info!("backup job {} created", names.backup_job);

        let timeout = self.config.timeouts.backup_job_finished;
        info!("backup job should complete in {}", format_duration(timeout));
        waits::wait_backup_job_complete(
            &self.client,
            self.tenant(),
            &names.backup_job,
            self.settings(timeout),
        )
        .await?;
        info!("backup job succeeded");
        Ok(names.backup_job.clone())
    }

    async fn wait_repeated_backup_jobs(&self, repeat: &RepeatSettings) -> Result<Vec<String>> {
        info!("wait for repeated creation of backup jobs");
        let ticks = CronTicks::parse(&repeat.frequency).map_err(ConfigError::from)?;
        let coordinator = RepeatedJobCoordinator::new(repeat.check_count);

        let client = self.client.clone();
        let tenant = self.config.tenant.clone();
        let plan = self.config.names.backup_plan.clone();
        let timeouts = self.config.timeouts;

        let jobs = coordinator
            .run(ticks, move |ctx: TickContext| {
                let client = client.clone();
                let tenant = tenant.clone();
                let plan = plan.clone();
                async move {
                    let index = ctx.index();
                    info!(
                        "wait for backup job to be created in {}, index: {}",
                        format_duration(timeouts.backup_job_creation),
                        index
                    );
                    let job = waits::wait_nth_backup_job(
                        &client,
                        &tenant,
                        &plan,
                        index,
                        PollSettings::new(timeouts.poll_interval, timeouts.backup_job_creation),
                    )
                    .await?;
                    let name = job.name().to_string();
                    ctx.observing(name.clone());
                    info!("backup job created, index: {}, name: {}", index, name);

                    info!(
                        "backup job should complete in {}, index: {}, name: {}",
                        format_duration(timeouts.backup_job_finished),
                        index,
                        name
                    );
                    waits::wait_backup_job_complete(
                        &client,
                        &tenant,
                        &name,
                        PollSettings::new(timeouts.poll_interval, timeouts.backup_job_finished),
                    )
                    .await?;
                    info!("backup job completed, index: {}, name: {}", index, name);
                    Ok::<_, ScenarioError>(name)
                }
            })
            .await?;

        debug!("Coordinator transitions: {:?}", coordinator.transitions());
        Ok(jobs)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Restore
    // ─────────────────────────────────────────────────────────────────────────

    async fn run_restore(&self, state: &mut RunState) -> Result<()> {
        let config = self.config;
        let names = &config.names;

        info!("pick a cluster for restore");
        let cluster = self
            .pick_cluster(config.restore_cluster.as_deref(), "restore cluster")
            .await?;
        info!(
            "cluster is picked, id={}, display-name={}",
            cluster.name(),
            cluster.spec.display_name
        );
        state.report.restore_cluster = Some(cluster.name().to_string());
        state.restore_kubeconfig = cluster.spec.kubeconfig.clone();

        info!("pick a namespace for restore");
        let backup_namespace = state
            .report
            .backup_namespace
            .clone()
            .ok_or(ConfigError::MissingBackupReference("backup namespace"))?;
        let restore_namespace = match &config.restore_namespace {
            Some(ns) => ns.clone(),
            None => derive_restore_namespace(config.restore_same_namespace, &backup_namespace),
        };
        info!("namespace {} is picked", restore_namespace);
        state.report.restore_namespace = Some(restore_namespace.clone());

        info!("create a restore plan");
        let plan = RestorePlan::new(
            &names.restore_plan,
            RestorePlanSpec {
                backup_name: names.backup_plan.clone(),
                desc: names.restore_plan.clone(),
                dest_cluster_name: cluster.name().to_string(),
                display_name: names.restore_plan.clone(),
                namespace_mappings: vec![format!("{}:{}", backup_namespace, restore_namespace)],
                tenant: config.tenant.clone(),
            },
        );
        self.client.create_restore_plan(self.tenant(), &plan).await?;
        info!("restore plan {} created", names.restore_plan);

        info!("create a restore job");
        let backup_job =
            waits::first_backup_job(&self.client, self.tenant(), &names.backup_plan).await?;
        let job = RestoreJob::new(
            &names.restore_job,
            RestoreJobSpec {
                action: ACTION_START_JOB.to_string(),
                backup_job_name: backup_job.name().to_string(),
                desc: names.restore_job.clone(),
                display_name: names.restore_job.clone(),
                restore_name: names.restore_plan.clone(),
                tenant: config.tenant.clone(),
            },
        );
        self.client.create_restore_job(self.tenant(), &job).await?;
        info!("restore job {} created", names.restore_job);
        state.report.restore_job = Some(names.restore_job.clone());
        state.report.restored_from = Some(backup_job.name().to_string());

        let timeout = config.timeouts.restore_plan_ready;
        info!("restore plan should be ready in {}", format_duration(timeout));
        waits::wait_restore_plan_ready(
            &self.client,
            self.tenant(),
            &names.restore_plan,
            self.settings(timeout),
        )
        .await?;
        info!("restore plan is ready now");

        let timeout = config.timeouts.restore_job_finished;
        info!("restore job should complete in {}", format_duration(timeout));
        waits::wait_restore_job_complete(
            &self.client,
            self.tenant(),
            &names.restore_job,
            self.settings(timeout),
        )
        .await?;
        info!("restore job succeeded");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Picks
    // ─────────────────────────────────────────────────────────────────────────

    async fn pick_cluster(&self, explicit: Option<&str>, what: &'static str) -> Result<Cluster> {
        let source = ClusterSource {
            client: &self.client,
            tenant: self.tenant(),
        };
        self.selector
            .select(explicit, &source, |c: &Cluster| {
                c.phase() == Some(ResourcePhase::Ready)
            })
            .await
            .map_err(ScenarioError::select(what))
    }

    async fn pick_storage(&self, explicit: Option<&str>) -> Result<Storage> {
        let source = StorageSource {
            client: &self.client,
            tenant: self.tenant(),
        };
        self.selector
            .select(explicit, &source, |s: &Storage| {
                s.phase() == Some(ResourcePhase::Ready)
            })
            .await
            .map_err(ScenarioError::select("storage"))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cleanup (best effort)
    // ─────────────────────────────────────────────────────────────────────────

    async fn clean_up_at_start(&self) {
        info!("clean up at the beginning");
        let tenant = self.tenant();
        let names = &self.config.names;

        // A restore-only run refers to an existing backup; leave it alone.
        if !self.config.skip_backup {
            if let Err(e) = self.client.delete_backup_plan(tenant, &names.backup_plan).await {
                debug!("Deleting backup plan {}: {}", names.backup_plan, e);
            }
            if let Err(e) =
                waits::delete_jobs_of_backup_plan(&self.client, tenant, &names.backup_plan).await
            {
                debug!("Deleting jobs of backup plan {}: {}", names.backup_plan, e);
            }
        }
        if let Err(e) = self.client.delete_restore_plan(tenant, &names.restore_plan).await {
            debug!("Deleting restore plan {}: {}", names.restore_plan, e);
        }
        if let Err(e) = self.client.delete_restore_job(tenant, &names.restore_job).await {
            debug!("Deleting restore job {}: {}", names.restore_job, e);
        }
    }

    async fn clean_up_at_end(&self, state: &mut RunState) {
        info!("clean up at the end");
        let tenant = self.tenant();
        let names = &self.config.names;

        if !self.config.skip_backup {
            // An on-demand plan creates no more jobs once the run is over.
            if self.config.repeat.is_some() {
                match self.client.get_backup_plan(tenant, &names.backup_plan).await {
                    Ok(plan) => info!("backup plan: {:#?}", plan),
                    Err(e) => debug!("Fetching backup plan {}: {}", names.backup_plan, e),
                }
                if let Err(e) = self.client.delete_backup_plan(tenant, &names.backup_plan).await {
                    debug!("Deleting backup plan {}: {}", names.backup_plan, e);
                }
            }
            if let Err(e) =
                waits::delete_jobs_of_backup_plan(&self.client, tenant, &names.backup_plan).await
            {
                debug!("Deleting jobs of backup plan {}: {}", names.backup_plan, e);
            }
        }

        match self.client.get_restore_job(tenant, &names.restore_job).await {
            Ok(job) => info!("restore job: {:#?}", job),
            Err(e) => debug!("Fetching restore job {}: {}", names.restore_job, e),
        }
        if let Err(e) = self.client.delete_restore_job(tenant, &names.restore_job).await {
            debug!("Deleting restore job {}: {}", names.restore_job, e);
        }

        let Some(restored) = state.report.restored_namespace_to_delete().map(str::to_string) else {
            return;
        };
        let Some(kubeconfig) = state.restore_kubeconfig.as_deref() else {
            info!(
                "cluster {} exposes no kubeconfig, namespace {} is kept",
                state.report.restore_cluster.as_deref().unwrap_or_default(),
                restored
            );
            return;
        };

        info!("delete restored namespace {}", restored);
        let deleted = match namespace::cluster_client(kubeconfig).await {
            Ok(client) => namespace::delete_namespace(client, &restored).await,
            Err(e) => Err(e),
        };
        match deleted {
            Ok(()) => state.report.deleted_namespace = Some(restored),
            Err(e) => warn!("Deleting namespace {}: {}", restored, e),
        }
    }
}
