use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryPolicy {
    pub stale_time_secs: u64,
    pub retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for QueryPolicy {
    fn default() -> Self {
        Self {
            stale_time_secs: 120,
            retries: 2,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }
}

impl QueryPolicy {
    pub fn stale_time(&self) -> Duration {
        Duration::from_secs(self.stale_time_secs)
    }

    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms))
    }
}

pub async fn with_retry<T, E, F, Fut>(policy: &QueryPolicy, label: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.retries => {
                let delay = policy.retry_delay(attempt);
                tracing::warn!(
                    query = label,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "query failed, retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                tracing::warn!(query = label, error = %err, "query failed, giving up");
                return Err(err);
            }
        }
    }
}

struct Slot<T> {
    value: Option<(T, Instant)>,
    generation: u64,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            value: None,
            generation: 0,
        }
    }
}

/// Keyed results with a staleness window. A fetch started later for the same
/// key supersedes an earlier one: only the newest fetch writes the cache.
pub struct QueryCache<T> {
    policy: QueryPolicy,
    slots: Mutex<HashMap<String, Slot<T>>>,
}

impl<T: Clone> QueryCache<T> {
    pub fn new(policy: QueryPolicy) -> Self {
        Self {
            policy,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &QueryPolicy {
        &self.policy
    }

    pub fn fresh(&self, key: &str) -> Option<T> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let (value, fetched_at) = slots.get(key)?.value.as_ref()?;
        (fetched_at.elapsed() < self.policy.stale_time()).then(|| value.clone())
    }

    pub fn peek(&self, key: &str) -> Option<T> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(key)?.value.as_ref().map(|(value, _)| value.clone())
    }

    pub fn invalidate(&self, key: &str) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.get_mut(key) {
            slot.value = None;
        }
    }

    pub fn clear(&self) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub async fn fetch<E, F, Fut>(&self, key: &str, op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        if let Some(value) = self.fresh(key) {
            tracing::debug!(query = key, "query cache hit");
            return Ok(value);
        }

        let generation = self.begin(key);
        let value = with_retry(&self.policy, key, op).await?;
        self.complete(key, generation, value.clone());
        Ok(value)
    }

    fn begin(&self, key: &str) -> u64 {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = slots.entry(key.to_string()).or_default();
        slot.generation += 1;
        slot.generation
    }

    fn complete(&self, key: &str, generation: u64, value: T) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = slots.entry(key.to_string()).or_default();
        if slot.generation == generation {
            slot.value = Some((value, Instant::now()));
        } else {
            tracing::debug!(query = key, "superseded query result discarded");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fast_policy(retries: u32) -> QueryPolicy {
        QueryPolicy {
            stale_time_secs: 60,
            retries,
            base_delay_ms: 1,
            max_delay_ms: 2,
        }
    }

    #[test]
    fn backoff_doubles_up_to_cap() {
        let policy = QueryPolicy::default();
        assert_eq!(policy.retry_delay(0), Duration::from_secs(1));
        assert_eq!(policy.retry_delay(1), Duration::from_secs(2));
        assert_eq!(policy.retry_delay(4), Duration::from_secs(16));
        assert_eq!(policy.retry_delay(5), Duration::from_secs(30));
        assert_eq!(policy.retry_delay(80), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = with_retry(&fast_policy(2), "flaky", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("down".to_string()) }
        })
        .await;
        assert_eq!(result, Err("down".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn recovers_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = with_retry(&fast_policy(2), "flaky", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err("blip".to_string())
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn serves_fresh_values_from_cache() {
        let cache: QueryCache<Vec<u32>> = QueryCache::new(fast_policy(0));
        let calls = AtomicU32::new(0);
        for _ in 0..3 {
            let value = cache
                .fetch("events", || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok::<_, String>(vec![1, 2]) }
                })
                .await
                .unwrap();
            assert_eq!(value, vec![1, 2]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.invalidate("events");
        assert!(cache.fresh("events").is_none());
        cache
            .fetch("events", || async { Ok::<_, String>(vec![3]) })
            .await
            .unwrap();
        assert_eq!(cache.peek("events"), Some(vec![3]));
    }

    #[tokio::test]
    async fn stale_entries_refetch() {
        let cache: QueryCache<u32> = QueryCache::new(QueryPolicy {
            stale_time_secs: 0,
            ..fast_policy(0)
        });
        cache.fetch("k", || async { Ok::<_, String>(1) }).await.unwrap();
        let second = cache.fetch("k", || async { Ok::<_, String>(2) }).await.unwrap();
        assert_eq!(second, 2);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_invalidated_key_empty() {
        let cache: QueryCache<u32> = QueryCache::new(fast_policy(0));
        cache.fetch("k", || async { Ok::<_, String>(1) }).await.unwrap();
        cache.invalidate("k");
        let err = cache
            .fetch("k", || async { Err::<u32, _>("offline".to_string()) })
            .await;
        assert!(err.is_err());
        assert_eq!(cache.peek("k"), None);
    }

    #[test]
    fn older_fetch_does_not_overwrite_newer() {
        let cache: QueryCache<u32> = QueryCache::new(fast_policy(0));
        let first = cache.begin("k");
        let second = cache.begin("k");
        cache.complete("k", second, 2);
        cache.complete("k", first, 1);
        assert_eq!(cache.peek("k"), Some(2));
    }
}
