//! Idempotency coordinator.
//!
//! Maps a client token to the response produced by the first successful
//! execution, retained for 24 hours. Records live in the response cache under
//! `idempotency:{resource}:user:{principal}:{token}` and are never updated.
//!
//! Within one process, [`IdempotencyCoordinator::execute`] serializes requests
//! carrying the same token, so concurrent duplicates replay instead of
//! executing twice. Across processes two first-time requests with the same
//! token can still both miss the lookup; that window is accepted.

use super::keys::idempotency_key;
use super::store::CacheStore;
use crate::constants::ttl;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Result of a guarded execution
#[derive(Debug, Clone, PartialEq)]
pub enum Execution<T> {
    /// The operation ran and its result was recorded
    Fresh(T),
    /// A stored response was returned without running the operation
    Replayed(T),
}

impl<T> Execution<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Fresh(v) | Self::Replayed(v) => v,
        }
    }

    pub fn is_replay(&self) -> bool {
        matches!(self, Self::Replayed(_))
    }
}

type SlotMap = Arc<DashMap<String, Arc<Mutex<()>>>>;

#[derive(Debug, Clone)]
pub struct IdempotencyCoordinator {
    cache: CacheStore,
    in_flight: SlotMap,
}

/// A request's hold on its token's slot. The map entry is released when the
/// last lease drops, including when the request future is cancelled.
struct SlotLease {
    map: SlotMap,
    key: String,
    slot: Arc<Mutex<()>>,
}

impl SlotLease {
    fn acquire(map: &SlotMap, key: String) -> Self {
        let slot = map
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        Self {
            map: Arc::clone(map),
            key,
            slot,
        }
    }
}

impl Drop for SlotLease {
    fn drop(&mut self) {
        // Only the map and this lease still reference the slot
        self.map.remove_if(&self.key, |_, m| {
            Arc::ptr_eq(m, &self.slot) && Arc::strong_count(m) == 2
        });
    }
}

impl IdempotencyCoordinator {
    pub fn new(cache: CacheStore) -> Self {
        Self {
            cache,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    pub async fn lookup<T: DeserializeOwned>(
        &self,
        resource: &str,
        principal_id: i64,
        token: &str,
    ) -> Option<T> {
        self.cache
            .get(&idempotency_key(resource, principal_id, token))
            .await
    }

    pub async fn record<T: Serialize>(
        &self,
        resource: &str,
        principal_id: i64,
        token: &str,
        response: &T,
    ) -> bool {
        self.cache
            .set(
                &idempotency_key(resource, principal_id, token),
                response,
                ttl::IDEMPOTENCY,
            )
            .await
    }

    /// Run `operation` at most once per token within the retention window.
    ///
    /// Without a token the operation simply runs. Failed operations are not
    /// recorded, so a retry with the same token executes again.
    pub async fn execute<T, E, F, Fut>(
        &self,
        resource: &str,
        principal_id: i64,
        token: Option<&str>,
        operation: F,
    ) -> Result<Execution<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(token) = token else {
            return operation().await.map(Execution::Fresh);
        };

        let lease = SlotLease::acquire(
            &self.in_flight,
            idempotency_key(resource, principal_id, token),
        );
        let _guard = lease.slot.lock().await;
        self.execute_locked(resource, principal_id, token, operation)
            .await
    }

    async fn execute_locked<T, E, F, Fut>(
        &self,
        resource: &str,
        principal_id: i64,
        token: &str,
        operation: F,
    ) -> Result<Execution<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(stored) = self.lookup::<T>(resource, principal_id, token).await {
            info!(
                resource = resource,
                principal_id = principal_id,
                "Idempotent replay, returning stored response"
            );
            return Ok(Execution::Replayed(stored));
        }

        let response = operation().await?;
        if !self.record(resource, principal_id, token, &response).await {
            debug!(
                resource = resource,
                principal_id = principal_id,
                "Idempotency record not stored; duplicate retries will re-execute"
            );
        }
        Ok(Execution::Fresh(response))
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::providers::InMemoryCacheService;
    use crate::cache::CacheProvider;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn coordinator() -> (IdempotencyCoordinator, InMemoryCacheService) {
        let memory = InMemoryCacheService::default();
        let store = CacheStore::new(CacheProvider::memory(memory.clone()));
        (IdempotencyCoordinator::new(store), memory)
    }

    #[tokio::test]
    async fn test_second_call_replays() {
        let (coord, _) = coordinator();
        let counter = AtomicU32::new(0);
        let runs = &counter;

        let run = move || async move {
            runs.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(serde_json::json!({"id": 1}))
        };

        let first = coord.execute("tasks", 7, Some("abc"), run).await.unwrap();
        let second = coord.execute("tasks", 7, Some("abc"), run).await.unwrap();

        assert!(!first.is_replay());
        assert!(second.is_replay());
        assert_eq!(first.into_inner(), second.into_inner());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(coord.in_flight_len(), 0);
    }

    #[tokio::test]
    async fn test_tokens_are_scoped_per_principal() {
        let (coord, _) = coordinator();
        coord.record("tasks", 7, "abc", &1).await;

        assert_eq!(coord.lookup::<i32>("tasks", 7, "abc").await, Some(1));
        assert_eq!(coord.lookup::<i32>("tasks", 8, "abc").await, None);
        assert_eq!(coord.lookup::<i32>("comments", 7, "abc").await, None);
    }

    #[tokio::test]
    async fn test_failures_are_not_recorded() {
        let (coord, _) = coordinator();
        let failed: Result<Execution<i32>, String> = coord
            .execute("tasks", 7, Some("abc"), || async { Err("boom".to_string()) })
            .await;
        assert!(failed.is_err());

        let retried = coord
            .execute("tasks", 7, Some("abc"), || async { Ok::<_, String>(5) })
            .await
            .unwrap();
        assert_eq!(retried, Execution::Fresh(5));
    }

    #[tokio::test]
    async fn test_without_token_always_runs() {
        let (coord, memory) = coordinator();
        for _ in 0..2 {
            let out = coord
                .execute("tasks", 7, None, || async { Ok::<_, String>(1) })
                .await
                .unwrap();
            assert_eq!(out, Execution::Fresh(1));
        }
        assert!(memory.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_duplicates_execute_once() {
        let (coord, _) = coordinator();
        let runs = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let coord = coord.clone();
            let runs = runs.clone();
            handles.push(tokio::spawn(async move {
                coord
                    .execute("tasks", 7, Some("same"), || async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        Ok::<_, String>(42)
                    })
                    .await
                    .unwrap()
                    .into_inner()
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 42);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_requests_release_their_slots() {
        let (coord, _) = coordinator();

        for i in 0..5 {
            let token = format!("t{i}");
            let abandoned = tokio::time::timeout(
                std::time::Duration::from_millis(10),
                coord.execute("tasks", 7, Some(token.as_str()), || async {
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    Ok::<_, String>(1)
                }),
            )
            .await;
            assert!(abandoned.is_err());
        }

        assert_eq!(coord.in_flight_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_waiter_leaves_holder_slot_intact() {
        let (coord, _) = coordinator();

        let holder = {
            let coord = coord.clone();
            tokio::spawn(async move {
                coord
                    .execute("tasks", 7, Some("shared"), || async {
                        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                        Ok::<_, String>(9)
                    })
                    .await
            })
        };
        tokio::task::yield_now().await;

        let waiter = tokio::time::timeout(
            std::time::Duration::from_millis(10),
            coord.execute("tasks", 7, Some("shared"), || async { Ok::<_, String>(0) }),
        )
        .await;
        assert!(waiter.is_err());
        assert_eq!(coord.in_flight_len(), 1);

        assert_eq!(holder.await.unwrap().unwrap(), Execution::Fresh(9));
        assert_eq!(coord.in_flight_len(), 0);
    }

    #[tokio::test]
    async fn test_retention_window_is_24h() {
        let (coord, memory) = coordinator();
        coord.record("tasks", 7, "abc", &1).await;
        assert!(memory.contains_key("idempotency:tasks:user:7:abc"));
        assert_eq!(ttl::IDEMPOTENCY.as_secs(), 86_400);
    }
}
