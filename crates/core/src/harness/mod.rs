//! Polling, selection and scheduling primitives shared by the e2e scenarios.

mod coordinator;
mod poller;
mod selector;
mod ticks;

pub use coordinator::*;
pub use poller::*;
pub use selector::*;
pub use ticks::*;
