//! Policy evaluators applied to packages during `Calculate`.

use crate::error::ExtenderError;
use crate::package::Package;

/// Outcome of applying an [`Extender`] to a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtenderOutcome {
    /// Whether the package should end up enabled.
    pub enabled: bool,
    /// User-visible reason recorded alongside the node's enablement.
    pub reason: String,
}

impl ExtenderOutcome {
    /// Build an outcome from its two fields.
    #[must_use]
    pub fn new(enabled: bool, reason: impl Into<String>) -> Self {
        Self {
            enabled,
            reason: reason.into(),
        }
    }
}

/// A pluggable policy evaluator run against every non-global node during
/// [`crate::Graph::calculate`].
///
/// Extenders are applied in declaration order. A *terminator* extender that
/// disables a node stops evaluation of all later extenders for that node; a
/// terminator that enables a node does not change whether later extenders
/// run. A non-terminator always overwrites the node's tentative enablement.
pub trait Extender: Send + Sync {
    /// Evaluate policy for a single package.
    ///
    /// # Errors
    ///
    /// Any error aborts the in-progress `Calculate` call; it is surfaced to
    /// the caller unchanged via [`crate::GraphError::ExtenderFailed`].
    fn apply(&self, pkg: &dyn Package) -> Result<ExtenderOutcome, ExtenderError>;

    /// Whether this extender can short-circuit evaluation of later
    /// extenders by disabling a node.
    fn is_terminator(&self) -> bool;
}
