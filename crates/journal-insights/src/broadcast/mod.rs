//! Broadcasting of job lifecycle events for anything that wants to observe
//! the worker pool (dashboards, tests, log shippers).

pub mod job_events;

pub use job_events::{JobEvent, JobEventBroadcaster, JobEventKind};
