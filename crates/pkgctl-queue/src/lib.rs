//! Named, independently-running retrying task queues.
//!
//! A [`Queue`] is a single FIFO worker loop: tasks that fail are re-pushed
//! to the front with an updated retry time, governed by a pluggable
//! backoff schedule; tasks whose schedule signals *Stop* are abandoned
//! silently. A [`Manager`] owns a set of such queues by name and is the
//! only supported way to tear them down.
//!
//! This crate has no knowledge of `pkgctl-graph`'s scheduling decisions;
//! callers translate a `Scheduler::schedule` result into `Task`s and
//! `Enqueue` them onto whichever named queue fits their execution policy.

mod backoff;
mod manager;
mod queue;
mod task;

pub use backoff::default_schedule;
pub use manager::Manager;
pub use queue::{Handler, Queue};
pub use task::{Task, TaskSnapshot};
