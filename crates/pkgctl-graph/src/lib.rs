//! Dependency graph and policy scheduler for a package-lifecycle controller.
//!
//! This crate decides, given a directed dependency graph of packages and a
//! set of pluggable policy [`Extender`]s, which packages should transition
//! between enabled and disabled states. It does not execute any work
//! itself; `pkgctl-queue` is the complementary crate that runs the
//! resulting enable/disable/update actions reliably.
//!
//! # Key Types
//!
//! - [`Package`]: caller-supplied descriptor participating in the graph
//! - [`Extender`]: pluggable policy evaluator applied to each package
//! - [`Graph`]: the directed graph engine (cycle detection, evaluation, BFS)
//! - [`Scheduler`]: orchestrates `Graph` and assembles an ordered [`ScheduleEntry`] list
//!
//! # Example
//!
//! ```ignore
//! use pkgctl_graph::{Scheduler, Package, Dependency};
//! use std::sync::Arc;
//!
//! let mut scheduler = Scheduler::new(vec![]);
//! scheduler.register(vec![/* Arc<dyn Package> ... */])?;
//! let schedule = scheduler.schedule("some-package")?;
//! ```

mod error;
mod extender;
mod graph;
mod node;
mod package;
mod scheduler;

pub use error::{ExtenderError, GraphError, Result};
pub use extender::{Extender, ExtenderOutcome};
pub use graph::{Diff, Graph, GLOBAL_NODE_NAME};
pub use node::Node;
pub use package::{Dependency, Package};
pub use scheduler::{ScheduleEntry, ScheduleState, Scheduler};
