//! Request coalescing for idempotent cache reads/deletes.
//!
//! Concurrent callers asking for the same key share one underlying backend
//! call. The first caller spawns the call and registers a shared future;
//! callers arriving before it completes attach to that future. The spawned
//! task removes its own registration as soon as the backend answers, so a
//! caller arriving afterwards starts a fresh call.
use std::{future::Future, sync::Arc};

use dashmap::{DashMap, mapref::entry::Entry};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

use crate::services::cache::client::{CacheError, CacheResult};

type Flight<T> = Shared<BoxFuture<'static, CacheResult<T>>>;

pub struct Coalescer<T> {
    in_flight: Arc<DashMap<String, Flight<T>>>,
}

impl<T> Coalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Number of keys with an outstanding operation.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Runs `op` for `key` unless an operation for `key` is already running,
    /// in which case its result is awaited instead.
    ///
    /// The operation runs on its own task: a waiter that stops polling (its
    /// context was cancelled) does not abort the call for the others.
    pub async fn run<F, Fut>(&self, key: &str, op: F) -> CacheResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CacheResult<T>> + Send + 'static,
    {
        // Check-and-insert happens under the shard lock, and the spawned task
        // needs the same lock to deregister, so it cannot remove the entry
        // before it is inserted.
        let flight = match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(existing) => {
                debug!(key, "joining in-flight cache operation");
                existing.get().clone()
            }
            Entry::Vacant(slot) => {
                let registry = self.in_flight.clone();
                let owned_key = key.to_string();
                let work = op();

                let handle = tokio::spawn(async move {
                    let result = work.await;
                    registry.remove(&owned_key);
                    result
                });

                let flight = async move {
                    handle.await.unwrap_or_else(|e| {
                        Err(CacheError::BackendCommand(format!("cache task failed: {e}")))
                    })
                }
                .boxed()
                .shared();

                slot.insert(flight.clone());
                flight
            }
        };

        flight.await
    }
}

impl<T> Default for Coalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Coalescer<T> {
    fn clone(&self) -> Self {
        Self {
            in_flight: self.in_flight.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future::join_all;
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };
    use tokio::sync::Barrier;

    #[tokio::test]
    async fn concurrent_callers_share_one_call() {
        let coalescer = Coalescer::<String>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let waiters = (0..16).map(|_| {
            let calls = calls.clone();
            let coalescer = coalescer.clone();
            async move {
                coalescer
                    .run("anime:1", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok("doc".to_string())
                    })
                    .await
            }
        });

        let results = join_all(waiters).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| r.as_deref() == Ok("doc")));
        assert_eq!(coalescer.in_flight(), 0);
    }

    #[tokio::test]
    async fn errors_fan_out_to_every_waiter() {
        let coalescer = Coalescer::<String>::new();

        let waiters = (0..4).map(|_| {
            let coalescer = coalescer.clone();
            async move {
                coalescer
                    .run("k", || async {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Err(CacheError::BackendCommand("down".into()))
                    })
                    .await
            }
        });

        for res in join_all(waiters).await {
            assert_eq!(res, Err(CacheError::BackendCommand("down".into())));
        }
    }

    #[tokio::test]
    async fn late_joiner_gets_running_result() {
        let coalescer = Coalescer::<u64>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = {
            let coalescer = coalescer.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                coalescer
                    .run("k", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(80)).await;
                        Ok(1)
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(coalescer.in_flight(), 1);

        let calls2 = calls.clone();
        let second = coalescer
            .run("k", || async move {
                calls2.fetch_add(1, Ordering::SeqCst);
                Ok(2)
            })
            .await;

        assert_eq!(second, Ok(1));
        assert_eq!(first.await.unwrap(), Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn completed_group_is_not_reused() {
        let coalescer = Coalescer::<u64>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for expected in 1..=2u64 {
            let calls = calls.clone();
            let got = coalescer
                .run("k", || async move {
                    Ok(calls.fetch_add(1, Ordering::SeqCst) as u64 + 1)
                })
                .await;
            assert_eq!(got, Ok(expected));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn different_keys_run_in_parallel() {
        let coalescer = Coalescer::<()>::new();
        // Both operations must be running at once to get past the barrier.
        let barrier = Arc::new(Barrier::new(2));

        let run = |key: &'static str| {
            let coalescer = coalescer.clone();
            let barrier = barrier.clone();
            async move {
                coalescer
                    .run(key, || async move {
                        barrier.wait().await;
                        Ok(())
                    })
                    .await
            }
        };

        let both = futures_util::future::join(run("a"), run("b"));
        let (a, b) = tokio::time::timeout(Duration::from_secs(2), both)
            .await
            .expect("keys must not block each other");
        assert_eq!(a, Ok(()));
        assert_eq!(b, Ok(()));
    }

    #[tokio::test]
    async fn abandoned_waiter_does_not_abort_the_call() {
        let coalescer = Coalescer::<u64>::new();

        let dropped = coalescer.run("k", || async {
            tokio::time::sleep(Duration::from_millis(40)).await;
            Ok(9)
        });
        // Poll once so the call is registered, then give up on it.
        let _ = tokio::time::timeout(Duration::from_millis(5), dropped).await;

        let joined = coalescer.run("k", || async { Ok(0) }).await;
        assert_eq!(joined, Ok(9));
    }
}
