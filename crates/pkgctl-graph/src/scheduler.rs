//! Orchestrates graph registration/evaluation and assembles schedules.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::Result;
use crate::extender::Extender;
use crate::graph::Graph;
use crate::package::Package;

/// An action a caller should take for a single package, derived from the
/// most recent [`Scheduler::schedule`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleState {
    /// Re-reconcile the package; its own enablement did not change but a
    /// dependency of it did.
    Update,
    /// Enable the package.
    Enable,
    /// Disable the package.
    Disable,
}

/// One entry in an ordered [`Scheduler::schedule`] result.
#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    /// The action to take.
    pub state: ScheduleState,
    /// The package the action applies to.
    pub package: Arc<dyn Package>,
}

/// Orchestrates [`Graph`] evaluation and assembles the ordered schedule of
/// enable/disable/update actions callers should execute.
///
/// Cross-queue execution policy (enforced by callers, not by the
/// `Scheduler` itself): each schedule step waits for the previous one;
/// `"global"` actions and `Calculate` itself run on a dedicated global
/// queue without further scheduling; per-package actions run on per-package
/// queues; enabling *critical* packages is ordered, enabling
/// *functional*/*application* packages is not.
pub struct Scheduler {
    graph: Graph,
}

impl Scheduler {
    /// Create a scheduler wrapping a fresh [`Graph`] with the given ordered
    /// extenders.
    #[must_use]
    pub fn new(extenders: Vec<Box<dyn Extender>>) -> Self {
        Self {
            graph: Graph::new(extenders),
        }
    }

    /// Rebuild the underlying graph for the given packages.
    ///
    /// # Errors
    ///
    /// See [`Graph::register`].
    pub fn register(&mut self, packages: Vec<Arc<dyn Package>>) -> Result<()> {
        self.graph.register(packages)
    }

    /// Recalculate enablement for `name`'s graph and assemble an ordered,
    /// deduplicated schedule: all newly-[`ScheduleState::Enable`]d packages
    /// first, then all newly-[`ScheduleState::Disable`]d packages, then
    /// every dependent of `name` not already emitted, as
    /// [`ScheduleState::Update`]. A package name appears at most once; the
    /// first category that names it wins.
    ///
    /// # Errors
    ///
    /// See [`Graph::calculate`].
    pub fn schedule(&self, name: &str) -> Result<Vec<ScheduleEntry>> {
        let diff = self.graph.calculate()?;

        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for package in diff.enabled {
            if seen.insert(package.name().to_string()) {
                entries.push(ScheduleEntry {
                    state: ScheduleState::Enable,
                    package,
                });
            }
        }

        for package in diff.disabled {
            if seen.insert(package.name().to_string()) {
                entries.push(ScheduleEntry {
                    state: ScheduleState::Disable,
                    package,
                });
            }
        }

        for package in self.graph.dependents(name) {
            if seen.insert(package.name().to_string()) {
                entries.push(ScheduleEntry {
                    state: ScheduleState::Update,
                    package,
                });
            }
        }

        Ok(entries)
    }

    /// Packages reachable from `name` via successor edges, excluding `name`
    /// itself. See [`Graph::dependents`].
    #[must_use]
    pub fn dependents(&self, name: &str) -> Vec<Arc<dyn Package>> {
        self.graph.dependents(name)
    }
}
