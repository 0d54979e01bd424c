//! Graph vertices wrapping a [`Package`] with mutable enablement.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::package::Package;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Default)]
struct State {
    enabled: bool,
    reason: String,
}

/// A graph vertex: an immutable [`Package`] plus its mutable enablement.
///
/// `id` is drawn from a process-wide monotonic counter and is stable for the
/// lifetime of the node; it exists purely to give the directed-graph engine
/// a vertex key distinct from the package name. Enablement is guarded by its
/// own lock so concurrent readers observe `(enabled, reason)` atomically
/// without contending with unrelated graph traversal.
pub struct Node {
    id: u64,
    package: Arc<dyn Package>,
    state: Mutex<State>,
}

impl Node {
    /// Wrap `package` in a freshly allocated, initially-disabled node.
    #[must_use]
    pub fn new(package: Arc<dyn Package>) -> Self {
        Self {
            id: NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed),
            package,
            state: Mutex::new(State::default()),
        }
    }

    /// Process-unique, stable vertex identifier.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The wrapped package.
    #[must_use]
    pub fn package(&self) -> &Arc<dyn Package> {
        &self.package
    }

    /// Current enablement.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    /// Current reason string, stable whether the node is enabled or not.
    #[must_use]
    pub fn reason(&self) -> String {
        self.state.lock().reason.clone()
    }

    /// Set enablement and reason, returning whether `enabled` changed.
    pub fn set_enabled(&self, enabled: bool, reason: impl Into<String>) -> bool {
        let mut state = self.state.lock();
        let changed = state.enabled != enabled;
        state.enabled = enabled;
        state.reason = reason.into();
        changed
    }
}
