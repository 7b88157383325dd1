//! Handles for externally driven asynchronous work (dataset fetches).
//!
//! The runtime never executes the work itself. A [`TaskSet`] hands out one
//! [`TaskHandle`] per key; the collaborator doing the fetch carries the handle
//! and reports back through it. Completion order is arbitrary, so a result is
//! accepted only while its handle is still the live task for its key.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone)]
pub struct TaskHandle<K> {
    pub id: TaskId,
    pub key: K,
    token: CancellationToken,
}

impl<K> TaskHandle<K> {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug)]
struct LiveTask {
    id: TaskId,
    token: CancellationToken,
}

/// At most one live task per key; spawning again supersedes the previous one.
#[derive(Debug)]
pub struct TaskSet<K: Ord + Clone> {
    next_id: u64,
    live: BTreeMap<K, LiveTask>,
}

impl<K: Ord + Clone> Default for TaskSet<K> {
    fn default() -> Self {
        Self {
            next_id: 0,
            live: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone> TaskSet<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Starts tracking a new task for `key`, cancelling any task it replaces.
    pub fn spawn(&mut self, key: K) -> TaskHandle<K> {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        let token = CancellationToken::new();
        let previous = self.live.insert(
            key.clone(),
            LiveTask {
                id,
                token: token.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.token.cancel();
            tracing::debug!(superseded = previous.id.0, by = id.0, "task superseded");
        }
        TaskHandle { id, key, token }
    }

    /// Cancels the live task for `key`. Returns `false` if there was none.
    pub fn cancel(&mut self, key: &K) -> bool {
        match self.live.remove(key) {
            Some(task) => {
                task.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_key, task) in std::mem::take(&mut self.live) {
            task.token.cancel();
        }
    }

    pub fn is_live(&self, handle: &TaskHandle<K>) -> bool {
        !handle.is_cancelled()
            && self
                .live
                .get(&handle.key)
                .is_some_and(|task| task.id == handle.id)
    }

    /// Retires a finished task.
    ///
    /// Returns `true` only when `handle` was still live, i.e. its result may be
    /// applied. Stale or cancelled handles return `false` and change nothing.
    pub fn finish(&mut self, handle: &TaskHandle<K>) -> bool {
        if !self.is_live(handle) {
            return false;
        }
        self.live.remove(&handle.key);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::TaskSet;

    #[test]
    fn finish_accepts_live_handle_once() {
        let mut tasks: TaskSet<String> = TaskSet::new();
        let h = tasks.spawn("no2".to_string());
        assert!(tasks.is_live(&h));
        assert!(tasks.finish(&h));
        assert!(!tasks.finish(&h));
        assert!(tasks.is_empty());
    }

    #[test]
    fn cancel_marks_token_and_rejects_late_result() {
        let mut tasks: TaskSet<String> = TaskSet::new();
        let h = tasks.spawn("co2".to_string());
        let token = h.token().clone();
        assert!(tasks.cancel(&"co2".to_string()));
        assert!(token.is_cancelled());
        assert!(!tasks.finish(&h));
        assert!(!tasks.cancel(&"co2".to_string()));
    }

    #[test]
    fn respawn_supersedes_previous_task() {
        let mut tasks: TaskSet<&'static str> = TaskSet::new();
        let first = tasks.spawn("no2");
        let second = tasks.spawn("no2");
        assert!(first.is_cancelled());
        assert!(!tasks.finish(&first));
        assert!(tasks.finish(&second));
    }

    #[test]
    fn completion_order_does_not_matter() {
        let mut tasks: TaskSet<&'static str> = TaskSet::new();
        let a = tasks.spawn("a");
        let b = tasks.spawn("b");
        assert!(tasks.finish(&b));
        assert!(tasks.finish(&a));
    }

    #[test]
    fn cancel_all_cancels_every_token() {
        let mut tasks: TaskSet<&'static str> = TaskSet::new();
        let a = tasks.spawn("a");
        let b = tasks.spawn("b");
        tasks.cancel_all();
        assert!(a.is_cancelled() && b.is_cancelled());
        assert_eq!(tasks.len(), 0);
    }
}
