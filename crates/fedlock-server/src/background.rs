//! Background tasks for the fedlock server.

use fedlock_federation::FederationCache;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

/// Periodically evicts federation records older than `ttl_seconds`.
///
/// Runs until the process exits. A TTL of zero disables the task.
pub async fn start_cache_prune_task(cache: Arc<dyn FederationCache>, ttl_seconds: u64) {
    if ttl_seconds == 0 {
        tracing::info!("federation cache pruning disabled (ttl=0)");
        return;
    }

    // Check every ttl/4, clamped to [1s, 1h].
    let interval_seconds = (ttl_seconds / 4).clamp(1, 3600);
    let interval = Duration::from_secs(interval_seconds);

    tracing::info!(
        ttl_seconds,
        interval_seconds,
        "starting federation cache prune task"
    );

    loop {
        sleep(interval).await;
        if let Err(e) = cache.prune().await {
            tracing::error!("failed to prune federation cache: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedlock_federation::MemoryFederationCache;
    use fedlock_types::{FederationRecord, SrvTarget};

    #[tokio::test]
    async fn zero_ttl_returns_immediately() {
        let cache: Arc<dyn FederationCache> = Arc::new(MemoryFederationCache::new(None));
        start_cache_prune_task(cache, 0).await;
    }

    #[tokio::test(start_paused = true)]
    async fn prunes_expired_records_on_interval() {
        let cache: Arc<dyn FederationCache> =
            Arc::new(MemoryFederationCache::new(Some(std::time::Duration::from_secs(60))));
        let mut stale =
            FederationRecord::new("old.example", "a2V5", vec![SrvTarget::new("fed", 443)]);
        stale.created = stale.created - chrono::Duration::hours(2);
        cache.set("old.example", stale).await.unwrap();

        let task = tokio::spawn(start_cache_prune_task(cache.clone(), 60));
        tokio::time::sleep(Duration::from_secs(16)).await;
        tokio::task::yield_now().await;

        assert!(cache.get("old.example").await.is_empty());
        task.abort();
    }
}
