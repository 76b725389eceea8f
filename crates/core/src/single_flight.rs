//! At most one in-flight upstream fetch per key.
//!
//! The first caller for a key spawns the work on the runtime and registers
//! a shared handle to its result; later callers for the same key wait on
//! that handle instead of starting their own fetch. The work runs to
//! completion even if every waiter gives up, so the cache still gets
//! populated. The registry entry is removed when the work finishes.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, warn};

use crate::errors::{Error, Result};

type SharedResult<T> = Shared<BoxFuture<'static, Result<T>>>;

struct InFlight<T: Clone> {
    id: u64,
    result: SharedResult<T>,
}

struct Registry<T: Clone> {
    next_id: u64,
    calls: HashMap<String, InFlight<T>>,
}

/// Per-key registry of shared in-flight futures.
pub struct SingleFlight<T: Clone> {
    registry: Arc<Mutex<Registry<T>>>,
    wait_ceiling: Duration,
}

fn lock<T: Clone>(registry: &Mutex<Registry<T>>) -> MutexGuard<'_, Registry<T>> {
    registry.lock().unwrap_or_else(|poisoned| {
        warn!("Single-flight registry lock was poisoned, recovering");
        poisoned.into_inner()
    })
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(wait_ceiling: Duration) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                calls: HashMap::new(),
            })),
            wait_ceiling,
        }
    }

    /// Run `work` for `key`, or join the call already in flight for it.
    ///
    /// Waiting is bounded by the wait ceiling; past it the caller gets
    /// `FetchTimeout` while the work itself keeps running.
    pub async fn run<F, Fut>(&self, key: &str, work: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let shared = {
            let mut registry = lock(&self.registry);
            match registry.calls.get(key) {
                Some(call) => {
                    debug!("Joining in-flight fetch for {}", key);
                    call.result.clone()
                }
                None => {
                    registry.next_id += 1;
                    let id = registry.next_id;
                    let shared = self.spawn(key.to_string(), id, work());
                    registry.calls.insert(
                        key.to_string(),
                        InFlight {
                            id,
                            result: shared.clone(),
                        },
                    );
                    shared
                }
            }
        };

        tokio::time::timeout(self.wait_ceiling, shared)
            .await
            .map_err(|_| Error::FetchTimeout {
                key: key.to_string(),
                waited: self.wait_ceiling,
            })?
    }

    fn spawn<Fut>(&self, key: String, id: u64, fut: Fut) -> SharedResult<T>
    where
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let registry = Arc::clone(&self.registry);
        let handle = tokio::spawn(async move {
            let result = fut.await;
            let mut guard = lock(&registry);
            // A newer call may own the slot if this one was abandoned and replaced
            if guard.calls.get(&key).is_some_and(|c| c.id == id) {
                guard.calls.remove(&key);
            }
            result
        });

        async move {
            handle
                .await
                .unwrap_or_else(|e| Err(Error::Unexpected(format!("fetch task failed: {}", e))))
        }
        .boxed()
        .shared()
    }

    /// Number of keys with a fetch in flight.
    pub fn in_flight(&self) -> usize {
        lock(&self.registry).calls.len()
    }
}
