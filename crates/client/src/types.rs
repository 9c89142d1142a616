//! Wire types of the backup service API.
//!
//! Entities follow the Kubernetes object layout (`metadata`, `spec`,
//! `status`). Phases travel as strings and are mapped onto closed enums here,
//! with an `Unknown` fallback so a new server-side phase never breaks polling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Action that starts a job immediately after creation.
pub const ACTION_START_JOB: &str = "StartJob";

/// Sort key for ordering jobs by creation time.
pub const FIELD_CREATION_TIMESTAMP: &str = "creationTimestamp";

// ─────────────────────────────────────────────────────────────────────────────
// Phases
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle phase of clusters, storages and plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourcePhase {
    /// All conditions are met
    Ready,
    /// Reconcile has not succeeded yet
    NotReady,
    /// Reconcile failed or a condition reports not ready
    Error,
    /// Backend resources are already reclaimed
    #[serde(rename = "PhaseDeleted")]
    Deleted,
    /// Deletion has been requested
    #[serde(rename = "PhaseDeleting")]
    Deleting,
    #[serde(other)]
    Unknown,
}

impl ResourcePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "Ready",
            Self::NotReady => "NotReady",
            Self::Error => "Error",
            Self::Deleted => "PhaseDeleted",
            Self::Deleting => "PhaseDeleting",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ResourcePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle phase of backup and restore jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobPhase {
    #[serde(rename = "JobNotStarted")]
    NotStarted,
    #[serde(rename = "JobInProgress")]
    InProgress,
    #[serde(rename = "JobCompleted")]
    Completed,
    #[serde(rename = "JobFailed")]
    Failed,
    #[serde(rename = "JobCanceled")]
    Canceled,
    /// Handed to the backend controller
    #[serde(rename = "JobSubmitted")]
    Submitted,
    #[serde(other)]
    Unknown,
}

impl JobPhase {
    /// Whether the job has stopped, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "JobNotStarted",
            Self::InProgress => "JobInProgress",
            Self::Completed => "JobCompleted",
            Self::Failed => "JobFailed",
            Self::Canceled => "JobCanceled",
            Self::Submitted => "JobSubmitted",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<ResourcePhase>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<JobPhase>,
}

/// How persistent volumes are copied during a backup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyMethod {
    /// File-level copy (restic)
    #[default]
    Filesystem,
    /// Volume snapshots
    Snapshot,
}

impl CopyMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Filesystem => "filesystem",
            Self::Snapshot => "snapshot",
        }
    }
}

impl FromStr for CopyMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "filesystem" => Ok(Self::Filesystem),
            "snapshot" => Ok(Self::Snapshot),
            other => Err(format!("invalid backup copy method: {}", other)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Common
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

impl ObjectMeta {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            creation_timestamp: None,
        }
    }
}

/// Envelope of every list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct List<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// Anything carrying object metadata.
pub trait Resource {
    fn metadata(&self) -> &ObjectMeta;

    fn name(&self) -> &str {
        &self.metadata().name
    }

    fn creation_timestamp(&self) -> Option<DateTime<Utc>> {
        self.metadata().creation_timestamp
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Clusters, namespaces, storages
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    #[serde(default)]
    pub display_name: String,
    /// Kubeconfig of the cluster; the service may strip it from responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ClusterSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ResourceStatus>,
}

impl Cluster {
    pub fn phase(&self) -> Option<ResourcePhase> {
        self.status.as_ref().and_then(|s| s.phase)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub metadata: ObjectMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageSpec {
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storage {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: StorageSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ResourceStatus>,
}

impl Storage {
    pub fn phase(&self) -> Option<ResourcePhase> {
        self.status.as_ref().and_then(|s| s.phase)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backup plans and jobs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BackupPolicy {
    /// Number of jobs kept before the oldest are pruned
    pub retention: u32,
    pub repeat: bool,
    /// Cron expression; only meaningful when `repeat` is set
    pub frequency: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BackupPlanSpec {
    pub cluster_name: String,
    pub copy_method: CopyMethod,
    pub desc: String,
    pub display_name: String,
    #[serde(rename = "excludePV")]
    pub exclude_pv: bool,
    pub namespaces: Vec<String>,
    pub policy: BackupPolicy,
    pub storage_name: String,
    pub tenant: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupPlan {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: BackupPlanSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ResourceStatus>,
}

impl BackupPlan {
    pub fn new(name: impl Into<String>, spec: BackupPlanSpec) -> Self {
        Self {
            metadata: ObjectMeta::named(name),
            spec,
            status: None,
        }
    }

    pub fn phase(&self) -> Option<ResourcePhase> {
        self.status.as_ref().and_then(|s| s.phase)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BackupJobSpec {
    pub action: String,
    /// Name of the backup plan this job runs
    pub backup_name: String,
    pub desc: String,
    pub display_name: String,
    pub tenant: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupJob {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: BackupJobSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
}

impl BackupJob {
    pub fn new(name: impl Into<String>, spec: BackupJobSpec) -> Self {
        Self {
            metadata: ObjectMeta::named(name),
            spec,
            status: None,
        }
    }

    pub fn phase(&self) -> Option<JobPhase> {
        self.status.as_ref().and_then(|s| s.phase)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Restore plans and jobs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RestorePlanSpec {
    /// Name of the backup plan to restore from
    pub backup_name: String,
    pub desc: String,
    pub dest_cluster_name: String,
    pub display_name: String,
    /// `source:destination` namespace pairs
    pub namespace_mappings: Vec<String>,
    pub tenant: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestorePlan {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: RestorePlanSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ResourceStatus>,
}

impl RestorePlan {
    pub fn new(name: impl Into<String>, spec: RestorePlanSpec) -> Self {
        Self {
            metadata: ObjectMeta::named(name),
            spec,
            status: None,
        }
    }

    pub fn phase(&self) -> Option<ResourcePhase> {
        self.status.as_ref().and_then(|s| s.phase)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RestoreJobSpec {
    pub action: String,
    pub backup_job_name: String,
    pub desc: String,
    pub display_name: String,
    /// Name of the restore plan this job runs
    pub restore_name: String,
    pub tenant: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreJob {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: RestoreJobSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
}

impl RestoreJob {
    pub fn new(name: impl Into<String>, spec: RestoreJobSpec) -> Self {
        Self {
            metadata: ObjectMeta::named(name),
            spec,
            status: None,
        }
    }

    pub fn phase(&self) -> Option<JobPhase> {
        self.status.as_ref().and_then(|s| s.phase)
    }
}

impl Resource for Cluster {
    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }
}

impl Resource for Namespace {
    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }
}

impl Resource for Storage {
    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }
}

impl Resource for BackupPlan {
    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }
}

impl Resource for BackupJob {
    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }
}

impl Resource for RestorePlan {
    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }
}

impl Resource for RestoreJob {
    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Query options
// ─────────────────────────────────────────────────────────────────────────────

/// Filters for listing backup jobs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobListOptions {
    pub plan_name: Option<String>,
    pub sort_by: Option<String>,
    pub ascending: Option<bool>,
}

impl JobListOptions {
    pub fn for_plan(plan_name: impl Into<String>) -> Self {
        Self {
            plan_name: Some(plan_name.into()),
            ..Default::default()
        }
    }

    /// Jobs of a plan, oldest first.
    pub fn for_plan_by_creation(plan_name: impl Into<String>) -> Self {
        Self {
            plan_name: Some(plan_name.into()),
            sort_by: Some(FIELD_CREATION_TIMESTAMP.to_string()),
            ascending: Some(true),
        }
    }

    /// Encoded query string, including the leading `?`, or empty.
    pub fn query_string(&self) -> String {
        let mut pairs = Vec::new();
        if let Some(plan) = &self.plan_name {
            pairs.push(format!("planName={}", urlencoding::encode(plan)));
        }
        if let Some(sort_by) = &self.sort_by {
            pairs.push(format!("sortBy={}", urlencoding::encode(sort_by)));
        }
        if let Some(ascending) = self.ascending {
            pairs.push(format!("ascending={}", ascending));
        }
        if pairs.is_empty() {
            String::new()
        } else {
            format!("?{}", pairs.join("&"))
        }
    }
}

/// Error body returned by the service on failures.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub code: String,
    pub message: String,
}
