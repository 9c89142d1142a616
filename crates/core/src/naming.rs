//! Names for the plans, jobs and namespaces a test run creates.

use chrono::{DateTime, TimeZone};

use crate::utils::random::generate_token;

/// Timestamp layout embedded in generated plan names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Length of the random suffix appended to job and namespace names.
pub const NAME_SUFFIX_LEN: usize = 5;

/// Kubernetes namespace names are capped at 63 characters; keep the prefix
/// short enough that `prefix-xxxxx` always fits.
pub const MAX_NAMESPACE_PREFIX_LEN: usize = 55;

pub fn format_timestamp<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn backup_plan_name(timestamp: &str) -> String {
    format!("backup-{}", timestamp).to_lowercase()
}

pub fn restore_plan_name(timestamp: &str) -> String {
    format!("restore-{}", timestamp).to_lowercase()
}

/// `{plan}-{random}` in lowercase.
pub fn job_name(plan_name: &str) -> String {
    format!("{}-{}", plan_name, generate_token(NAME_SUFFIX_LEN)).to_lowercase()
}

/// Pick the namespace a restore should land in.
///
/// With `same_namespace` the backup namespace is reused. Otherwise a fresh
/// name derived from it is returned, which never equals the backup namespace.
pub fn derive_restore_namespace(same_namespace: bool, backup_namespace: &str) -> String {
    if same_namespace {
        return backup_namespace.to_string();
    }

    let prefix: String = backup_namespace
        .chars()
        .take(MAX_NAMESPACE_PREFIX_LEN)
        .collect();
    format!("{}-{}", prefix, generate_token(NAME_SUFFIX_LEN)).to_lowercase()
}
