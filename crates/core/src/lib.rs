//! Harness primitives for end-to-end tests against the backup service.
//!
//! Nothing here talks to the network: callers plug their own remote lookups
//! into the selector, poller and coordinator.

pub mod harness;
pub mod naming;
pub mod utils;

pub use harness::*;
