//! Units of deferred work carried by a [`crate::Queue`].

use std::collections::HashMap;
use std::time::Instant;

use backoff::backoff::Backoff as _;
use uuid::Uuid;

use crate::backoff::default_schedule;

/// A unit of deferred work.
///
/// `kind` and `subject` are immutable once set; `meta` is a free-form
/// string map the owning queue and handler may read and write; `backoff`
/// governs retry spacing on handler failure. A `Task` is mutated only by
/// the `Queue` that currently owns it, and is understood to be owned by
/// at most one queue at a time.
pub struct Task {
    id: String,
    kind: String,
    subject: String,
    meta: HashMap<String, String>,
    backoff: Box<dyn backoff::backoff::Backoff + Send>,
    next_retry: Instant,
}

impl Task {
    /// Create a new task with a fresh random ID, the default exponential
    /// backoff schedule, and a `next_retry` of now (so the first attempt is
    /// immediate).
    #[must_use]
    pub fn new(kind: impl Into<String>, subject: impl Into<String>) -> Self {
        Self::with_backoff(kind, subject, Box::new(default_schedule()))
    }

    /// Create a task with an explicit backoff schedule, for tests or
    /// callers that need a non-default retry policy.
    #[must_use]
    pub fn with_backoff(
        kind: impl Into<String>,
        subject: impl Into<String>,
        backoff: Box<dyn backoff::backoff::Backoff + Send>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: kind.into(),
            subject: subject.into(),
            meta: HashMap::new(),
            backoff,
            next_retry: Instant::now(),
        }
    }

    /// Stable identifier, unique for the lifetime of the process.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Immutable task kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Immutable task subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Read a metadata value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.meta.get(key).map(String::as_str)
    }

    /// Set a metadata value by key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.meta.insert(key.into(), value.into());
    }

    /// Remove a metadata value by key.
    pub fn delete(&mut self, key: &str) {
        self.meta.remove(key);
    }

    /// The timestamp before which this task must not be retried.
    #[must_use]
    pub fn next_retry(&self) -> Instant {
        self.next_retry
    }

    /// Set the timestamp before which this task must not be retried.
    pub fn set_next_retry(&mut self, next_retry: Instant) {
        self.next_retry = next_retry;
    }

    /// Ask the backoff schedule for the next delay, or `None` if the
    /// schedule has signalled *Stop* and the task should be abandoned.
    pub(crate) fn next_backoff(&mut self) -> Option<std::time::Duration> {
        self.backoff.next_backoff()
    }

    /// A cheap, `Clone`-able view of this task, safe to hand out from
    /// `Queue::snapshots` without exposing the non-`Clone` backoff schedule.
    #[must_use]
    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            id: self.id.clone(),
            kind: self.kind.clone(),
            subject: self.subject.clone(),
            meta: self.meta.clone(),
            next_retry: self.next_retry,
        }
    }
}

/// A point-in-time, `Clone`-able copy of a [`Task`]'s observable state,
/// omitting the non-`Clone` backoff schedule.
#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    /// The task's stable ID.
    pub id: String,
    /// The task's kind.
    pub kind: String,
    /// The task's subject.
    pub subject: String,
    /// The task's metadata at the time of the snapshot.
    pub meta: HashMap<String, String>,
    /// The task's `next_retry` at the time of the snapshot.
    pub next_retry: Instant,
}
