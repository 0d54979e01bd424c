//! A single named, independently-running retrying task queue.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::task::{Task, TaskSnapshot};

const TICK_INTERVAL: Duration = Duration::from_secs(1);
const COMPLETED_CAPACITY: usize = 100;
const COMPLETED_RETAIN: usize = 80;

/// Caller-supplied work function invoked for every dequeued task.
///
/// Returning `Ok(())` marks the task completed. Returning `Err` triggers
/// the task's backoff schedule: either a re-enqueue at the front of the
/// queue with an updated `next_retry`, or abandonment if the schedule
/// signals *Stop*. A `Handler` failure is never surfaced synchronously to
/// callers of `Queue` — only observable indirectly via `Snapshots` and the
/// completed-task ring.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Process `task`. `cancellation` mirrors the queue's own shutdown
    /// signal so long-running handlers can observe it cooperatively.
    async fn call(
        &self,
        cancellation: &CancellationToken,
        task: &mut Task,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

struct State {
    pending: VecDeque<Task>,
    completed: Vec<String>,
}

impl State {
    fn record_completed(&mut self, id: String) {
        self.completed.push(id);
        if self.completed.len() > COMPLETED_CAPACITY {
            let drop_to = self.completed.len() - COMPLETED_RETAIN;
            self.completed.drain(0..drop_to);
        }
    }
}

/// A named FIFO queue with a single background worker loop.
///
/// Cloning a `Queue` is cheap and shares the same underlying state and
/// worker; this is how a [`crate::Manager`] hands out lookups without
/// wrapping every queue in an extra `Arc`.
///
/// `Queue::new` gives every queue its own standalone cancellation source, so
/// it behaves sensibly even when constructed and driven without a
/// [`crate::Manager`] (as the tests in this module do). [`Queue::start`]
/// accepts the caller's own `CancellationToken` and re-derives the queue's
/// working token as a [`CancellationToken::child_token`] of it, so cancelling
/// that externally owned token cascades into the worker loop exactly as
/// cancelling the context passed to `Start` does in the original queue.
#[derive(Clone)]
pub struct Queue {
    name: Arc<str>,
    handler: Arc<dyn Handler>,
    state: Arc<Mutex<State>>,
    cancellation: Arc<Mutex<CancellationToken>>,
    started: Arc<std::sync::Once>,
    join: Arc<Mutex<Option<tokio::task::JoinHandle<()>>>>,
}

impl Queue {
    pub(crate) fn new(name: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        Self {
            name: Arc::from(name.into()),
            handler,
            state: Arc::new(Mutex::new(State {
                pending: VecDeque::new(),
                completed: Vec::new(),
            })),
            cancellation: Arc::new(Mutex::new(CancellationToken::new())),
            started: Arc::new(std::sync::Once::new()),
            join: Arc::new(Mutex::new(None)),
        }
    }

    /// This queue's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append `task` to the tail of the FIFO, stamping its `queue` meta
    /// key, and return its ID.
    pub fn enqueue(&self, mut task: Task) -> String {
        task.set("queue", &*self.name);
        let id = task.id().to_string();
        self.state.lock().pending.push_back(task);
        id
    }

    /// Start the background worker loop, if it has not already been
    /// started. Idempotent: only the first call has effect.
    ///
    /// The worker's own cancellation is derived from `parent` via
    /// [`CancellationToken::child_token`], so cancelling `parent` terminates
    /// this queue's loop (and every other queue started from the same
    /// `parent`) at the next tick boundary, without affecting `parent`
    /// itself or sibling queues started from a different parent.
    pub fn start(&self, parent: &CancellationToken) {
        self.started.call_once(|| {
            let token = parent.child_token();
            *self.cancellation.lock() = token.clone();
            let this = self.clone();
            let handle = tokio::spawn(async move { this.run(token).await });
            *self.join.lock() = Some(handle);
        });
    }

    async fn run(&self, cancellation: CancellationToken) {
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancellation.cancelled() => {
                    tracing::debug!(queue = %self.name, "queue worker stopping");
                    return;
                }
                _ = ticker.tick() => {
                    self.process().await;
                }
            }
        }
    }

    async fn process(&self) {
        let mut task = {
            let mut state = self.state.lock();
            let Some(front) = state.pending.front() else {
                return;
            };
            if Instant::now() < front.next_retry() {
                return;
            }
            state
                .pending
                .pop_front()
                .expect("front just confirmed present")
        };

        let id = task.id().to_string();
        let cancellation = self.cancellation.lock().clone();
        let result = self.handler.call(&cancellation, &mut task).await;

        match result {
            Ok(()) => {
                self.state.lock().record_completed(id);
            }
            Err(error) => {
                tracing::warn!(queue = %self.name, task = %id, %error, "handler failed");
                match task.next_backoff() {
                    Some(delay) => {
                        task.set_next_retry(Instant::now() + delay);
                        // A requeued task's ID is recorded in the same ring
                        // as a successful one: `Wait` only needs "this
                        // attempt was processed", and a later retry that
                        // eventually abandons the task will not re-remove
                        // this entry. Only the Stop path below skips it.
                        let mut state = self.state.lock();
                        state.pending.push_front(task);
                        state.record_completed(id);
                    }
                    None => {
                        tracing::warn!(queue = %self.name, task = %id, "backoff exhausted, abandoning task");
                    }
                }
            }
        }
    }

    /// Enqueue `task`, then asynchronously wait until its ID appears in
    /// the completed ring or the queue is cancelled.
    pub async fn wait(&self, task: Task) {
        let id = self.enqueue(task);
        let cancellation = self.cancellation.lock().clone();
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        loop {
            tokio::select! {
                () = cancellation.cancelled() => return,
                _ = ticker.tick() => {
                    if self.state.lock().completed.iter().any(|done| done == &id) {
                        return;
                    }
                }
            }
        }
    }

    /// Cancel the worker loop and join it. A stopped queue must not be
    /// restarted; behaviour of `start` after `stop` is undefined.
    ///
    /// Calling `stop` before the queue was ever `start`ed cancels the
    /// standalone token `new` created, which nothing is subscribed to yet,
    /// and finds no worker to join: a no-op in effect, per the original
    /// queue's own nil-cancel-is-a-no-op behaviour.
    pub async fn stop(&self) {
        self.cancellation.lock().cancel();
        let handle = self.join.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// A snapshot of pending tasks in FIFO order, for observability.
    #[must_use]
    pub fn snapshots(&self) -> Vec<TaskSnapshot> {
        self.state.lock().pending.iter().map(Task::snapshot).collect()
    }

    /// Whether the worker task has exited, for tests that assert on
    /// cascaded cancellation rather than polling `Snapshots`.
    #[cfg(test)]
    pub(crate) fn worker_finished(&self) -> bool {
        self.join.lock().as_ref().is_some_and(tokio::task::JoinHandle::is_finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A backoff schedule that always returns the same fixed delay, never
    /// signalling *Stop*.
    struct FixedBackoff(Duration);

    impl backoff::backoff::Backoff for FixedBackoff {
        fn reset(&mut self) {}

        fn next_backoff(&mut self) -> Option<Duration> {
            Some(self.0)
        }
    }

    /// A backoff schedule that signals *Stop* on the very first call.
    struct StopImmediately;

    impl backoff::backoff::Backoff for StopImmediately {
        fn reset(&mut self) {}

        fn next_backoff(&mut self) -> Option<Duration> {
            None
        }
    }

    /// Fails every call whose task subject is in `fail_subjects`, exactly
    /// once per subject, then succeeds; records every invocation in order.
    struct FlakyHandler {
        fail_once: Mutex<std::collections::HashSet<String>>,
        calls: Mutex<Vec<String>>,
    }

    impl FlakyHandler {
        fn new(fail_once: &[&str]) -> Self {
            Self {
                fail_once: Mutex::new(fail_once.iter().map(|s| (*s).to_string()).collect()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Handler for FlakyHandler {
        async fn call(
            &self,
            _cancellation: &CancellationToken,
            task: &mut Task,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.calls.lock().push(task.subject().to_string());
            if self.fail_once.lock().remove(task.subject()) {
                return Err("simulated failure".into());
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn fifo_with_head_retry() {
        let handler = Arc::new(FlakyHandler::new(&["a"]));
        let queue = Queue::new("test", handler.clone());

        let a = Task::with_backoff("t", "a", Box::new(FixedBackoff(Duration::from_millis(30))));
        let b = Task::with_backoff("t", "b", Box::new(FixedBackoff(Duration::from_millis(30))));
        let a_id = queue.enqueue(a);
        let b_id = queue.enqueue(b);

        // First attempt at A fails and is re-pushed to the front.
        queue.process().await;
        // B sits behind A; A's retry has not matured yet, so no progress.
        queue.process().await;
        assert_eq!(queue.snapshots().len(), 2);

        tokio::time::sleep(Duration::from_millis(60)).await;

        // A's retry matures and succeeds.
        queue.process().await;
        // Then B runs.
        queue.process().await;

        assert_eq!(*handler.calls.lock(), vec!["a", "a", "b"]);
        assert!(queue.snapshots().is_empty());
        let completed = queue.state.lock().completed.clone();
        assert!(completed.contains(&a_id));
        assert!(completed.contains(&b_id));
    }

    #[tokio::test]
    async fn backoff_stop_abandons_task() {
        let handler = Arc::new(FlakyHandler::new(&["doomed"]));
        let queue = Queue::new("test", handler);

        let task = Task::with_backoff("t", "doomed", Box::new(StopImmediately));
        let id = queue.enqueue(task);

        queue.process().await;

        assert!(queue.snapshots().is_empty());
        let completed = queue.state.lock().completed.clone();
        assert!(
            !completed.contains(&id),
            "an abandoned task must not leave a completion record"
        );
    }

    #[tokio::test]
    async fn a_retried_attempt_also_lands_in_the_completed_ring() {
        // A requeue-for-retry still records a completion entry, matching
        // the upstream queue's behaviour of recording unconditionally
        // except on Stop; a caller relying on Wait sees "processed", not
        // "succeeded".
        let handler = Arc::new(FlakyHandler::new(&["a"]));
        let queue = Queue::new("test", handler);

        let task = Task::with_backoff("t", "a", Box::new(FixedBackoff(Duration::from_secs(600))));
        let id = queue.enqueue(task);

        queue.process().await;

        assert_eq!(queue.snapshots().len(), 1, "task was requeued, not dropped");
        let completed = queue.state.lock().completed.clone();
        assert!(completed.contains(&id));
    }

    #[tokio::test]
    async fn completed_ring_bounds_to_newest_eighty() {
        let handler = Arc::new(FlakyHandler::new(&[]));
        let queue = Queue::new("test", handler);

        let ids: Vec<String> = (0..110)
            .map(|i| {
                let task = Task::new("t", format!("s{i}"));
                let id = task.id().to_string();
                queue.enqueue(task);
                id
            })
            .collect();

        for _ in 0..110 {
            queue.process().await;
        }

        let completed = queue.state.lock().completed.clone();
        // 110 successes trigger exactly one trim, at the 101st record: the
        // ring drops its oldest 21 entries (to reach the newest-80 floor)
        // and then grows untrimmed for the remaining 9 pushes.
        assert_eq!(completed.len(), 89);
        assert_eq!(completed, ids[21..].to_vec());
        assert!(completed.len() <= COMPLETED_CAPACITY);
    }

    #[tokio::test]
    async fn completed_ring_stays_bounded_past_n_of_120() {
        // Testable property 11 requires the bound to hold at N >= 120, not
        // merely at some N that happens to land in range after one trim.
        let handler = Arc::new(FlakyHandler::new(&[]));
        let queue = Queue::new("test", handler);

        const N: usize = 150;
        let ids: Vec<String> = (0..N)
            .map(|i| {
                let task = Task::new("t", format!("s{i}"));
                let id = task.id().to_string();
                queue.enqueue(task);
                id
            })
            .collect();

        for _ in 0..N {
            queue.process().await;
        }

        let completed = queue.state.lock().completed.clone();
        assert!(
            (COMPLETED_RETAIN..=COMPLETED_CAPACITY).contains(&completed.len()),
            "expected between {COMPLETED_RETAIN} and {COMPLETED_CAPACITY} retained, got {}",
            completed.len()
        );
        assert_eq!(
            completed,
            ids[N - completed.len()..].to_vec(),
            "ring must retain the most recent entries, oldest-first"
        );
    }

    #[tokio::test]
    async fn start_is_idempotent_and_stop_joins_the_worker() {
        let handler = Arc::new(FlakyHandler::new(&[]));
        let queue = Queue::new("test", handler);
        let shutdown = CancellationToken::new();

        queue.start(&shutdown);
        queue.start(&shutdown); // second call has no effect
        queue.stop().await;
    }

    #[tokio::test]
    async fn cancelling_the_parent_token_stops_the_worker_loop() {
        let handler = Arc::new(FlakyHandler::new(&[]));
        let queue = Queue::new("test", handler);
        let shutdown = CancellationToken::new();

        queue.start(&shutdown);
        queue.enqueue(Task::new("t", "s"));

        shutdown.cancel();
        // The worker observes the parent's cancellation without any
        // explicit `Queue::stop` call.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(queue.worker_finished());
    }
}
