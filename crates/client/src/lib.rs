//! Client for the backup service ("jibu") REST API.
//!
//! Covers the resource kinds an end-to-end run touches: clusters, namespaces,
//! storages, backup plans and jobs, restore plans and jobs.

mod client;
mod error;
mod types;

pub use client::JibuClient;
pub use error::{ApiError, Result};
pub use types::*;
