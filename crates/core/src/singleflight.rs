//! At most one in-flight operation per key.
//!
//! Concurrent callers asking for the same key join the pending future and
//! all receive a clone of its output. The entry is dropped as soon as the
//! operation finishes, whatever the outcome, so the next call after a
//! failure starts a fresh attempt.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};

type Pending<V> = Shared<BoxFuture<'static, V>>;

/// Keyed single-flight group.
pub struct SingleFlight<K, V>
where
    V: Clone,
{
    inflight: Arc<Mutex<HashMap<K, Pending<V>>>>,
}

impl<K, V> Default for SingleFlight<K, V>
where
    V: Clone,
{
    fn default() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` for `key`, or join the run already in progress.
    ///
    /// When a run is already pending, `work` is dropped without being polled.
    pub async fn run<F>(&self, key: K, work: F) -> V
    where
        F: Future<Output = V> + Send + 'static,
    {
        let pending = {
            let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
            match inflight.get(&key) {
                Some(pending) => pending.clone(),
                None => {
                    let registry = Arc::clone(&self.inflight);
                    let owned_key = key.clone();
                    let pending = async move {
                        let output = work.await;
                        registry
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .remove(&owned_key);
                        output
                    }
                    .boxed()
                    .shared();
                    inflight.insert(key, pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    /// Whether an operation for `key` is currently pending.
    pub fn is_in_flight(&self, key: &K) -> bool {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }
}
