//! `name → Queue` registry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::queue::{Handler, Queue};

/// Owns a named set of [`Queue`]s. Names are unique; spawning an existing
/// name is a no-op. Stopping via `Manager` is the only supported teardown
/// path for a queue it owns.
#[derive(Default)]
pub struct Manager {
    queues: Mutex<HashMap<String, Queue>>,
}

impl Manager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
        }
    }

    /// Create and start the queue named `name` with `handler`, if absent.
    /// If a queue with this name already exists, this is a no-op and the
    /// existing, already-running queue is left untouched.
    ///
    /// `parent` is the caller's own shutdown signal (e.g. an application's
    /// top-level `CancellationToken`, the way `cuenv`'s coordinator server
    /// holds one). The spawned queue's worker is derived from it via
    /// [`CancellationToken::child_token`], so cancelling `parent` cascades
    /// into every queue ever spawned from it, without requiring callers to
    /// track each queue individually or to use `Manager::stop_all`.
    pub fn spawn(&self, parent: &CancellationToken, name: impl Into<String>, handler: Arc<dyn Handler>) {
        let name = name.into();
        let mut queues = self.queues.lock();
        if queues.contains_key(&name) {
            return;
        }
        let queue = Queue::new(name.clone(), handler);
        queue.start(parent);
        queues.insert(name, queue);
    }

    /// Look up a queue by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Queue> {
        self.queues.lock().get(name).cloned()
    }

    /// Stop and remove the queue named `name`. A no-op if absent.
    pub async fn stop(&self, name: &str) {
        let queue = self.queues.lock().remove(name);
        if let Some(queue) = queue {
            queue.stop().await;
        }
    }

    /// Stop and remove every queue.
    pub async fn stop_all(&self) {
        let queues: Vec<Queue> = self.queues.lock().drain().map(|(_, q)| q).collect();
        for queue in queues {
            queue.stop().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;
    use async_trait::async_trait;

    struct NoopHandler;

    #[async_trait]
    impl Handler for NoopHandler {
        async fn call(
            &self,
            _cancellation: &CancellationToken,
            _task: &mut Task,
        ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn spawn_is_idempotent_by_name() {
        let shutdown = CancellationToken::new();
        let manager = Manager::new();
        manager.spawn(&shutdown, "default", Arc::new(NoopHandler));
        manager.spawn(&shutdown, "default", Arc::new(NoopHandler));

        assert!(manager.get("default").is_some());
        manager.stop_all().await;
    }

    #[tokio::test]
    async fn stop_on_absent_name_is_a_noop() {
        let manager = Manager::new();
        manager.stop("missing").await;
    }

    #[tokio::test]
    async fn get_after_stop_is_none() {
        let shutdown = CancellationToken::new();
        let manager = Manager::new();
        manager.spawn(&shutdown, "q", Arc::new(NoopHandler));
        manager.stop("q").await;
        assert!(manager.get("q").is_none());
    }

    #[tokio::test]
    async fn cancelling_the_shared_parent_cascades_to_every_spawned_queue() {
        let shutdown = CancellationToken::new();
        let manager = Manager::new();
        manager.spawn(&shutdown, "a", Arc::new(NoopHandler));
        manager.spawn(&shutdown, "b", Arc::new(NoopHandler));

        shutdown.cancel();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        // Both queues' workers observe the shared parent's cancellation
        // without an explicit `Manager::stop`/`stop_all` call; the registry
        // itself is untouched, since only `stop`/`stop_all` remove entries.
        let queues = self::names(&manager);
        assert_eq!(queues, vec!["a".to_string(), "b".to_string()]);
        assert!(manager.get("a").unwrap().worker_finished());
        assert!(manager.get("b").unwrap().worker_finished());
    }

    fn names(manager: &Manager) -> Vec<String> {
        let mut names: Vec<String> = manager.queues.lock().keys().cloned().collect();
        names.sort();
        names
    }
}
