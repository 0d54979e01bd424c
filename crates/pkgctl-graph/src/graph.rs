//! Directed dependency graph with cycle detection and policy evaluation.

use std::collections::HashMap;
use std::sync::Arc;

use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use petgraph::Direction;
use tracing::{debug, warn};

use crate::error::{GraphError, Result};
use crate::extender::Extender;
use crate::node::Node;
use crate::package::Package;

/// Name reserved for the always-enabled root node.
pub const GLOBAL_NODE_NAME: &str = "global";

/// Packages whose enablement changed during the most recent `Calculate`.
#[derive(Debug, Default)]
pub struct Diff {
    /// Packages that became enabled.
    pub enabled: Vec<Arc<dyn Package>>,
    /// Packages that became disabled.
    pub disabled: Vec<Arc<dyn Package>>,
}

/// Directed graph over packages with pluggable policy extenders.
///
/// Edges run from dependency to dependent, so a topological visit presents
/// dependencies before the packages that require them. Extenders are fixed
/// at construction time and applied, in order, to every non-global node
/// during [`Graph::calculate`].
pub struct Graph {
    inner: DiGraph<Node, ()>,
    index: HashMap<String, NodeIndex>,
    extenders: Vec<Box<dyn Extender>>,
}

impl Graph {
    /// Create an empty graph with the given ordered extenders.
    ///
    /// Extender order is significant: terminator semantics depend on it.
    #[must_use]
    pub fn new(extenders: Vec<Box<dyn Extender>>) -> Self {
        Self {
            inner: DiGraph::new(),
            index: HashMap::new(),
            extenders,
        }
    }

    /// Rebuild the graph from scratch for the given packages.
    ///
    /// Edges whose dependency target is absent from `packages` are silently
    /// omitted (they may still surface as a "required dependency not found"
    /// disablement reason during `Calculate`).
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CycleDetected`] if the resulting graph contains
    /// a directed cycle, including self-loops. On failure the graph is left
    /// in the attempted (partially-built) state; callers must treat
    /// registration as atomic at their layer.
    pub fn register(&mut self, packages: Vec<Arc<dyn Package>>) -> Result<()> {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();

        for pkg in &packages {
            let node_index = graph.add_node(Node::new(Arc::clone(pkg)));
            index.insert(pkg.name().to_string(), node_index);
        }

        for pkg in &packages {
            let Some(&dependent_index) = index.get(pkg.name()) else {
                continue;
            };
            for dep in pkg.dependencies() {
                if let Some(&target_index) = index.get(dep.to()) {
                    graph.add_edge(target_index, dependent_index, ());
                }
            }
        }

        if is_cyclic_directed(&graph) {
            warn!(package_count = packages.len(), "cycle detected during registration");
            return Err(GraphError::CycleDetected);
        }

        debug!(package_count = packages.len(), "graph registered");
        self.inner = graph;
        self.index = index;
        Ok(())
    }

    /// Number of registered nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.node_count()
    }

    /// Whether the graph has no registered nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.node_count() == 0
    }

    fn node(&self, index: NodeIndex) -> &Node {
        &self.inner[index]
    }

    /// Visit nodes in topological order (dependencies before dependents),
    /// evaluate each against its dependencies and the configured extenders,
    /// and collect the set of packages whose enablement changed.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::ExtenderFailed`] if any extender errors; the
    /// calculation aborts immediately and node state already written by
    /// earlier nodes in the traversal is not rolled back.
    pub fn calculate(&self) -> Result<Diff> {
        let order = toposort(&self.inner, None).map_err(|_| GraphError::TopologicalSortFailed {
            reason: "petgraph toposort rejected an already-acyclic graph".to_string(),
        })?;

        let mut diff = Diff::default();

        for index in order {
            let node = self.node(index);
            let name = node.package().name().to_string();

            if name == GLOBAL_NODE_NAME {
                // Always enabled; the transition is intentionally excluded
                // from the diff even on the very first `Calculate`.
                node.set_enabled(true, "Global");
                continue;
            }

            let was_enabled = node.is_enabled();

            let reason = self.disabled_by_dependencies(index, node);
            if !reason.is_empty() {
                node.set_enabled(false, reason);
            } else {
                // A clean dependency check tentatively enables the node;
                // extenders are then free to veto or overwrite that verdict.
                node.set_enabled(true, String::new());
                self.apply_extenders(node)?;
            }

            let is_enabled = node.is_enabled();
            if is_enabled != was_enabled {
                if is_enabled {
                    diff.enabled.push(Arc::clone(node.package()));
                } else {
                    diff.disabled.push(Arc::clone(node.package()));
                }
            }
        }

        Ok(diff)
    }

    fn apply_extenders(&self, node: &Node) -> Result<()> {
        for extender in &self.extenders {
            if !node.is_enabled() && extender.is_terminator() {
                break;
            }

            let outcome =
                extender
                    .apply(node.package().as_ref())
                    .map_err(|source| GraphError::ExtenderFailed {
                        package: node.package().name().to_string(),
                        source,
                    })?;

            if extender.is_terminator() {
                if !outcome.enabled {
                    node.set_enabled(outcome.enabled, outcome.reason);
                    break;
                }
                continue;
            }

            node.set_enabled(outcome.enabled, outcome.reason);
        }

        Ok(())
    }

    /// Compute the disablement reason driven purely by dependency state,
    /// or the empty string if the node's dependencies impose no constraint.
    fn disabled_by_dependencies(&self, index: NodeIndex, node: &Node) -> String {
        let mut remaining: HashMap<&str, &crate::package::Dependency> = node
            .package()
            .dependencies()
            .iter()
            .map(|dep| (dep.to(), dep))
            .collect();

        let mut reason = String::new();

        for parent_index in self.inner.neighbors_directed(index, Direction::Incoming) {
            let parent = self.node(parent_index);
            let parent_name = parent.package().name();

            if !parent.is_enabled() {
                reason = format!("parent disabled: {parent_name}");
            }

            if let Some(dep) = remaining.remove(parent_name) {
                let required = dep.version();
                if !required.is_empty() && required != parent.package().version() {
                    reason = format!(
                        "version mismatch: {parent_name} (required: {required}, found: {})",
                        parent.package().version()
                    );
                }
            }
        }

        for dep in remaining.values() {
            if !dep.is_optional() {
                reason = format!("required dependency not found: {}", dep.to());
            }
        }

        reason
    }

    /// Packages reachable from `name` via successor edges (i.e. packages
    /// that transitively depend on `name`), in breadth-first visitation
    /// order, excluding `name` itself. Returns an empty list for an unknown
    /// name.
    #[must_use]
    pub fn dependents(&self, name: &str) -> Vec<Arc<dyn Package>> {
        let Some(&start) = self.index.get(name) else {
            return Vec::new();
        };

        let mut bfs = Bfs::new(&self.inner, start);
        let mut result = Vec::new();

        while let Some(index) = bfs.next(&self.inner) {
            if index == start {
                continue;
            }
            result.push(Arc::clone(self.node(index).package()));
        }

        result
    }
}
