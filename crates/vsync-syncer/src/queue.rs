//! Deduplicating work queue with per-key retry backoff.
//!
//! Semantics follow the usual controller queue contract:
//! - a key waiting in the queue is stored once no matter how often it is added
//! - a key handed out by [`WorkQueue::get`] is not handed out again until
//!   [`WorkQueue::done`] is called for it
//! - a key added while it is being processed is queued again on `done`

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Retry delay doubling per consecutive failure, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    pub base: Duration,
    pub max: Duration,
}

impl ExponentialBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay before the retry following the `failures`-th consecutive failure.
    pub fn delay(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1).min(127);
        let nanos = self.base.as_nanos().saturating_mul(1u128 << exp);
        if nanos >= self.max.as_nanos() {
            return self.max;
        }
        u64::try_from(nanos)
            .map(Duration::from_nanos)
            .unwrap_or(self.max)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(5), Duration::from_secs(300))
    }
}

#[derive(Debug)]
struct State<K> {
    queue: VecDeque<K>,
    dirty: HashSet<K>,
    processing: HashSet<K>,
    failures: HashMap<K, u32>,
    shutting_down: bool,
}

#[derive(Debug)]
pub struct WorkQueue<K> {
    state: Mutex<State<K>>,
    notify: Notify,
    backoff: ExponentialBackoff,
}

impl<K> WorkQueue<K>
where
    K: Clone + Eq + Hash + Send + 'static,
{
    pub fn new(backoff: ExponentialBackoff) -> Self {
        Self {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                dirty: HashSet::new(),
                processing: HashSet::new(),
                failures: HashMap::new(),
                shutting_down: false,
            }),
            notify: Notify::new(),
            backoff,
        }
    }

    pub fn add(&self, key: K) {
        {
            let mut state = self.state.lock();
            if state.shutting_down || state.dirty.contains(&key) {
                return;
            }
            state.dirty.insert(key.clone());
            if state.processing.contains(&key) {
                return;
            }
            state.queue.push_back(key);
        }
        self.notify.notify_one();
    }

    /// Waits for the next key. Returns `None` once the queue is shut down and drained.
    pub async fn get(&self) -> Option<K> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock();
                if let Some(key) = state.queue.pop_front() {
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    return Some(key);
                }
                if state.shutting_down {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Marks `key` as finished; requeues it if it was added meanwhile.
    pub fn done(&self, key: &K) {
        let requeued = {
            let mut state = self.state.lock();
            state.processing.remove(key);
            if state.dirty.contains(key) {
                state.queue.push_back(key.clone());
                true
            } else {
                false
            }
        };
        if requeued {
            self.notify.notify_one();
        }
    }

    /// Schedules `key` to be added after its backoff delay and returns that delay.
    pub fn add_rate_limited(self: &Arc<Self>, key: K) -> Duration {
        let delay = {
            let mut state = self.state.lock();
            let failures = state.failures.entry(key.clone()).or_insert(0);
            *failures += 1;
            self.backoff.delay(*failures)
        };

        let queue = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(key);
        });
        delay
    }

    /// Clears the failure history of `key`.
    pub fn forget(&self, key: &K) {
        self.state.lock().failures.remove(key);
    }

    pub fn num_requeues(&self, key: &K) -> u32 {
        self.state.lock().failures.get(key).copied().unwrap_or(0)
    }

    pub fn shut_down(&self) {
        self.state.lock().shutting_down = true;
        self.notify.notify_waiters();
    }

    /// Number of keys waiting to be handed out.
    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    fn queue() -> Arc<WorkQueue<String>> {
        Arc::new(WorkQueue::new(ExponentialBackoff::new(
            Duration::from_millis(1),
            Duration::from_millis(20),
        )))
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let b = ExponentialBackoff::new(Duration::from_millis(5), Duration::from_millis(100));
        assert_eq!(b.delay(1), Duration::from_millis(5));
        assert_eq!(b.delay(2), Duration::from_millis(10));
        assert_eq!(b.delay(4), Duration::from_millis(40));
        assert_eq!(b.delay(6), Duration::from_millis(100));
        assert_eq!(b.delay(u32::MAX), Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_queued_keys_are_deduplicated() {
        let q = queue();
        q.add("a".to_string());
        q.add("b".to_string());
        q.add("a".to_string());
        assert_eq!(q.len(), 2);

        assert_eq!(q.get().await.as_deref(), Some("a"));
        assert_eq!(q.get().await.as_deref(), Some("b"));
        assert!(q.is_empty());
    }

    #[tokio::test]
    async fn test_key_added_while_processing_is_requeued_on_done() {
        let q = queue();
        q.add("a".to_string());
        let key = q.get().await.unwrap();

        q.add("a".to_string());
        assert!(q.is_empty(), "key in flight must not be handed out twice");

        q.done(&key);
        assert_eq!(q.len(), 1);
        assert_eq!(q.get().await.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_get_waits_for_add() {
        let q = queue();
        let waiter = {
            let q = Arc::clone(&q);
            tokio::spawn(async move { q.get().await })
        };
        tokio::task::yield_now().await;
        q.add("late".to_string());

        let got = timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
        assert_eq!(got.as_deref(), Some("late"));
    }

    #[tokio::test]
    async fn test_shut_down_releases_waiters() {
        let q = queue();
        let waiter = {
            let q = Arc::clone(&q);
            tokio::spawn(async move { q.get().await })
        };
        tokio::task::yield_now().await;
        q.shut_down();

        let got = timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
        assert_eq!(got, None);
        q.add("ignored".to_string());
        assert!(q.is_empty());
    }

    #[tokio::test]
    async fn test_rate_limited_add_tracks_failures() {
        let q = queue();
        let key = "a".to_string();
        assert_eq!(q.add_rate_limited(key.clone()), Duration::from_millis(1));
        assert_eq!(q.add_rate_limited(key.clone()), Duration::from_millis(2));
        assert_eq!(q.num_requeues(&key), 2);

        let got = timeout(Duration::from_secs(1), q.get()).await.unwrap();
        assert_eq!(got, Some(key.clone()));

        q.forget(&key);
        assert_eq!(q.num_requeues(&key), 0);
    }
}
