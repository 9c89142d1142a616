use jibutest_client::ApiError;
use jibutest_core::{CoordinatorError, PollError, SelectError};
use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigError;

pub type Result<T> = std::result::Result<T, ScenarioError>;

/// Everything that can fail a scenario run. All of them are fatal.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("backup service request failed: {0}")]
    Api(#[from] ApiError),

    #[error("failed to pick a {what}: {source}")]
    Select {
        what: &'static str,
        #[source]
        source: SelectError<ApiError>,
    },

    #[error("{what} not reached within {timeout:?}")]
    Timeout { what: String, timeout: Duration },

    #[error("{what} is in phase {actual}, expected {expected}")]
    UnexpectedPhase {
        what: String,
        expected: String,
        actual: String,
    },

    #[error("repeated backup check failed: {0}")]
    Coordinator(#[source] Box<CoordinatorError<ScenarioError>>),

    #[error("no backup job found for plan {0}")]
    NoBackupJob(String),

    #[error("kubernetes request failed: {0}")]
    Kube(#[from] kube::Error),

    #[error("invalid cluster kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),
}

impl ScenarioError {
    pub fn select(what: &'static str) -> impl FnOnce(SelectError<ApiError>) -> Self {
        move |source| Self::Select { what, source }
    }

    /// Map a poller failure: timeouts keep their context, check failures are API errors.
    pub fn from_poll(what: impl Into<String>, error: PollError<ApiError>) -> Self {
        match error {
            PollError::Timeout { timeout, .. } => Self::Timeout {
                what: what.into(),
                timeout,
            },
            PollError::Check(source) => Self::Api(source),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<CoordinatorError<ScenarioError>> for ScenarioError {
    fn from(error: CoordinatorError<ScenarioError>) -> Self {
        Self::Coordinator(Box::new(error))
    }
}
