//! Command-line flags and the validated scenario configuration built from them.

use chrono::Local;
use clap::{ArgAction, Parser};
use jibutest_client::CopyMethod;
use jibutest_core::naming::{self, format_timestamp};
use jibutest_core::{parse_schedule, ScheduleError, DEFAULT_PICK_RETRY_LIMIT, DEFAULT_REPEAT_CHECK_COUNT};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_ENDPOINT: &str = "http://localhost:31800";
pub const DEFAULT_EXCLUDE_NAMESPACES: &str =
    "kube-system,kube-public,kube-node-lease,qiming-backend,backup-saas-system";
pub const DEFAULT_BACKUP_FREQUENCY: &str = "*/3 * * * *";
pub const DEFAULT_JOB_RETENTION: u32 = 240;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid backup frequency: {0}")]
    Frequency(#[from] ScheduleError),

    #[error("backup repeat check count must be at least 1")]
    RepeatCheckCount,

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("poll interval must be greater than zero")]
    PollInterval,

    #[error("restoring without a backup run requires an explicit {0}")]
    MissingBackupReference(&'static str),
}

#[derive(Debug, Clone, Parser)]
#[command(name = "jibutest")]
#[command(author, version, about = "Backup and restore end-to-end test against the jibu API")]
#[command(args_override_self = true)]
pub struct Cli {
    /// Tenant id
    #[arg(long, env = "JIBU_TENANT", default_value = "1")]
    pub tenant: String,

    /// Backup service API endpoint
    #[arg(long, env = "JIBU_API_ENDPOINT", default_value = DEFAULT_API_ENDPOINT)]
    pub api_endpoint: String,

    /// Namespaces never picked for backup, separated by comma
    #[arg(
        long,
        env = "JIBU_EXCLUDE_NAMESPACES",
        value_delimiter = ',',
        default_value = DEFAULT_EXCLUDE_NAMESPACES
    )]
    pub exclude_namespaces: Vec<String>,

    /// Restore into the namespace that was backed up
    #[arg(long, env = "JIBU_RESTORE_SAME_NAMESPACE")]
    pub restore_same_namespace: bool,

    /// Create a repeated backup plan instead of an on-demand job
    #[arg(long, env = "JIBU_BACKUP_REPEAT_ENABLED")]
    pub backup_repeat_enabled: bool,

    /// Cron schedule of the repeated backup plan
    #[arg(long, env = "JIBU_BACKUP_FREQUENCY", default_value = DEFAULT_BACKUP_FREQUENCY)]
    pub backup_frequency: String,

    /// How many repeated backup jobs to wait for
    #[arg(long, env = "JIBU_BACKUP_REPEAT_CHECK_NUM", default_value_t = DEFAULT_REPEAT_CHECK_COUNT)]
    pub backup_repeat_check_num: usize,

    /// Back up persistent volumes too
    #[arg(long, env = "JIBU_BACKUP_WITH_PV", default_value_t = true, action = ArgAction::Set)]
    pub backup_with_pv: bool,

    /// Copy method for persistent volumes (filesystem or snapshot)
    #[arg(long, env = "JIBU_BACKUP_COPY_METHOD", default_value = "filesystem", value_parser = parse_copy_method)]
    pub backup_copy_method: CopyMethod,

    #[arg(long, env = "JIBU_BACKUP_NAMESPACE")]
    pub backup_namespace: Option<String>,

    #[arg(long, env = "JIBU_RESTORE_NAMESPACE")]
    pub restore_namespace: Option<String>,

    #[arg(long, env = "JIBU_SKIP_BACKUP")]
    pub skip_backup: bool,

    #[arg(long, env = "JIBU_SKIP_RESTORE")]
    pub skip_restore: bool,

    #[arg(long, env = "JIBU_BACKUP_CLUSTER")]
    pub backup_cluster: Option<String>,

    #[arg(long, env = "JIBU_RESTORE_CLUSTER")]
    pub restore_cluster: Option<String>,

    #[arg(long, env = "JIBU_STORAGE")]
    pub storage: Option<String>,

    /// Delete jobs and restored namespaces when the run ends
    #[arg(long, env = "JIBU_CLEAN_UP_ON_END", default_value_t = true, action = ArgAction::Set)]
    pub clean_up_on_end: bool,

    /// Defaults to backup-{timestamp}
    #[arg(long, env = "JIBU_BACKUP_PLAN_NAME")]
    pub backup_plan_name: Option<String>,

    /// Defaults to {backup-plan-name}-{random}
    #[arg(long, env = "JIBU_BACKUP_JOB_NAME")]
    pub backup_job_name: Option<String>,

    /// Defaults to restore-{timestamp}
    #[arg(long, env = "JIBU_RESTORE_PLAN_NAME")]
    pub restore_plan_name: Option<String>,

    /// Defaults to {restore-plan-name}-{random}
    #[arg(long, env = "JIBU_RESTORE_JOB_NAME")]
    pub restore_job_name: Option<String>,

    #[arg(long, env = "JIBU_PICK_RETRY_LIMIT", default_value_t = DEFAULT_PICK_RETRY_LIMIT)]
    pub pick_retry_limit: usize,

    #[arg(long, env = "JIBU_JOB_RETENTION", default_value_t = DEFAULT_JOB_RETENTION)]
    pub job_retention: u32,

    #[arg(long, env = "JIBU_POLL_INTERVAL", default_value = "5s", value_parser = humantime::parse_duration)]
    pub poll_interval: Duration,

    #[arg(long, env = "JIBU_BACKUP_PLAN_READY_TIMEOUT", default_value = "5m", value_parser = humantime::parse_duration)]
    pub backup_plan_ready_timeout: Duration,

    #[arg(long, env = "JIBU_BACKUP_JOB_CREATION_TIMEOUT", default_value = "3m", value_parser = humantime::parse_duration)]
    pub backup_job_creation_timeout: Duration,

    #[arg(long, env = "JIBU_BACKUP_JOB_FINISHED_TIMEOUT", default_value = "2h", value_parser = humantime::parse_duration)]
    pub backup_job_finished_timeout: Duration,

    #[arg(long, env = "JIBU_RESTORE_PLAN_READY_TIMEOUT", default_value = "5m", value_parser = humantime::parse_duration)]
    pub restore_plan_ready_timeout: Duration,

    #[arg(long, env = "JIBU_RESTORE_JOB_FINISHED_TIMEOUT", default_value = "2h", value_parser = humantime::parse_duration)]
    pub restore_job_finished_timeout: Duration,
}

fn parse_copy_method(value: &str) -> Result<CopyMethod, String> {
    value.parse()
}

/// Names of everything the run creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNames {
    pub backup_plan: String,
    pub backup_job: String,
    pub restore_plan: String,
    pub restore_job: String,
}

/// Settings of a repeated backup plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatSettings {
    pub frequency: String,
    pub check_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub poll_interval: Duration,
    pub backup_plan_ready: Duration,
    pub backup_job_creation: Duration,
    pub backup_job_finished: Duration,
    pub restore_plan_ready: Duration,
    pub restore_job_finished: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            backup_plan_ready: Duration::from_secs(5 * 60),
            backup_job_creation: Duration::from_secs(3 * 60),
            backup_job_finished: Duration::from_secs(2 * 60 * 60),
            restore_plan_ready: Duration::from_secs(5 * 60),
            restore_job_finished: Duration::from_secs(2 * 60 * 60),
        }
    }
}

/// Immutable configuration of one scenario run.
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    pub tenant: String,
    pub api_endpoint: String,
    pub names: ResourceNames,
    pub exclude_namespaces: HashSet<String>,
    pub restore_same_namespace: bool,
    /// `None` for an on-demand backup.
    pub repeat: Option<RepeatSettings>,
    pub backup_with_pv: bool,
    pub copy_method: CopyMethod,
    pub backup_namespace: Option<String>,
    pub restore_namespace: Option<String>,
    pub skip_backup: bool,
    pub skip_restore: bool,
    pub backup_cluster: Option<String>,
    pub restore_cluster: Option<String>,
    pub storage: Option<String>,
    pub clean_up_on_end: bool,
    pub pick_retry_limit: usize,
    pub job_retention: u32,
    pub timeouts: Timeouts,
}

impl Cli {
    /// Validate the flags and resolve generated names from the current local time.
    pub fn into_config(self) -> Result<ScenarioConfig, ConfigError> {
        let timestamp = format_timestamp(&Local::now());
        self.into_config_at(&timestamp)
    }

    /// Same as [`into_config`](Self::into_config) with a fixed timestamp.
    pub fn into_config_at(self, timestamp: &str) -> Result<ScenarioConfig, ConfigError> {
        let tenant = self.tenant.trim().to_string();
        if tenant.is_empty() {
            return Err(ConfigError::Empty("tenant"));
        }
        let api_endpoint = self.api_endpoint.trim().to_string();
        if api_endpoint.is_empty() {
            return Err(ConfigError::Empty("api endpoint"));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::PollInterval);
        }

        let repeat = if self.backup_repeat_enabled {
            parse_schedule(&self.backup_frequency)?;
            if self.backup_repeat_check_num == 0 {
                return Err(ConfigError::RepeatCheckCount);
            }
            Some(RepeatSettings {
                frequency: self.backup_frequency.clone(),
                check_count: self.backup_repeat_check_num,
            })
        } else {
            None
        };

        let backup_plan_name = non_empty(self.backup_plan_name);
        let backup_namespace = non_empty(self.backup_namespace);
        if self.skip_backup && !self.skip_restore {
            if backup_plan_name.is_none() {
                return Err(ConfigError::MissingBackupReference("backup plan name"));
            }
            if backup_namespace.is_none() {
                return Err(ConfigError::MissingBackupReference("backup namespace"));
            }
        }

        let backup_plan =
            backup_plan_name.unwrap_or_else(|| naming::backup_plan_name(timestamp));
        let backup_job =
            non_empty(self.backup_job_name).unwrap_or_else(|| naming::job_name(&backup_plan));
        let restore_plan = non_empty(self.restore_plan_name)
            .unwrap_or_else(|| naming::restore_plan_name(timestamp));
        let restore_job =
            non_empty(self.restore_job_name).unwrap_or_else(|| naming::job_name(&restore_plan));

        let exclude_namespaces = self
            .exclude_namespaces
            .iter()
            .map(|ns| ns.trim())
            .filter(|ns| !ns.is_empty())
            .map(str::to_string)
            .collect();

        Ok(ScenarioConfig {
            tenant,
            api_endpoint,
            names: ResourceNames {
                backup_plan,
                backup_job,
                restore_plan,
                restore_job,
            },
            exclude_namespaces,
            restore_same_namespace: self.restore_same_namespace,
            repeat,
            backup_with_pv: self.backup_with_pv,
            copy_method: self.backup_copy_method,
            backup_namespace,
            restore_namespace: non_empty(self.restore_namespace),
            skip_backup: self.skip_backup,
            skip_restore: self.skip_restore,
            backup_cluster: non_empty(self.backup_cluster),
            restore_cluster: non_empty(self.restore_cluster),
            storage: non_empty(self.storage),
            clean_up_on_end: self.clean_up_on_end,
            pick_retry_limit: self.pick_retry_limit,
            job_retention: self.job_retention,
            timeouts: Timeouts {
                poll_interval: self.poll_interval,
                backup_plan_ready: self.backup_plan_ready_timeout,
                backup_job_creation: self.backup_job_creation_timeout,
                backup_job_finished: self.backup_job_finished_timeout,
                restore_plan_ready: self.restore_plan_ready_timeout,
                restore_job_finished: self.restore_job_finished_timeout,
            },
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
