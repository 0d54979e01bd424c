//! Error types for graph registration and evaluation.

use thiserror::Error;

/// Boxed source error returned by a caller-supplied [`crate::Extender`].
pub type ExtenderError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced while building or evaluating a [`crate::Graph`].
#[derive(Debug, Error)]
pub enum GraphError {
    /// Registration found a directed cycle among the supplied packages.
    #[error("cycle detected in dependency graph")]
    CycleDetected,

    /// An [`crate::Extender`] returned an error during `Calculate`.
    ///
    /// The calculation aborts immediately; any node state written before the
    /// failing extender ran is not rolled back.
    #[error("extender failed for package '{package}': {source}")]
    ExtenderFailed {
        /// Name of the package being evaluated when the extender failed.
        package: String,
        /// The underlying error returned by the extender.
        #[source]
        source: ExtenderError,
    },

    /// Internal invariant violation: petgraph's toposort rejected a graph
    /// that `has_cycles` already certified as acyclic.
    #[error("topological sort failed unexpectedly: {reason}")]
    TopologicalSortFailed {
        /// Diagnostic detail, not meant to be matched on.
        reason: String,
    },
}

/// Result type for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;
