//! End-to-end backup and restore scenario against the jibu backup service.

pub mod config;
pub mod error;
pub mod namespace;
pub mod scenario;
pub mod sources;
pub mod waits;

pub use config::{Cli, ConfigError, ScenarioConfig};
pub use error::{Result, ScenarioError};
pub use scenario::{run_scenario, Scenario, ScenarioReport};
