use async_trait::async_trait;
use comments::{CacheKey, CommentCache, CommentView};
use moka::Expiry;
use moka::future::Cache;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cached comment list together with the TTL it was stored with
#[derive(Debug, Clone)]
struct CachedComments {
    comments: Arc<Vec<CommentView>>,
    ttl: Duration,
}

/// Expires each entry after the TTL it was inserted with
struct PerEntryTtl;

impl Expiry<CacheKey, CachedComments> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &CachedComments,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    // An overwrite restarts the clock with the new value's TTL
    fn expire_after_update(
        &self,
        _key: &CacheKey,
        value: &CachedComments,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Moka-based comment cache with per-entry TTL
/// Provides lock-free, concurrent cache with optional size bound
pub struct MokaCommentCache {
    cache: Cache<CacheKey, CachedComments>,
}

impl MokaCommentCache {
    /// Create a new unbounded cache
    pub fn new_unbounded() -> Self {
        Self::new(None)
    }

    /// Create a new bounded cache with max entries
    pub fn new_bounded(max_entries: u64) -> Self {
        Self::new(Some(max_entries))
    }

    pub fn new(max_entries: Option<u64>) -> Self {
        let mut builder = Cache::builder()
            .name("comments")
            .expire_after(PerEntryTtl);

        if let Some(capacity) = max_entries {
            builder = builder.max_capacity(capacity);
        }

        Self {
            cache: builder.build(),
        }
    }
}

#[async_trait]
impl CommentCache for MokaCommentCache {
    async fn set(&self, key: CacheKey, comments: Vec<CommentView>, ttl: Duration) {
        self.cache
            .insert(
                key,
                CachedComments {
                    comments: Arc::new(comments),
                    ttl,
                },
            )
            .await;
    }

    async fn get(&self, key: &CacheKey) -> Option<Vec<CommentView>> {
        // Either doesn't exist or TTL expired
        self.cache
            .get(key)
            .await
            .map(|entry| entry.comments.as_ref().clone())
    }

    async fn remove(&self, key: &CacheKey) {
        if self.cache.remove(key).await.is_some() {
            tracing::debug!("Invalidated {}", key);
        }
    }
}

impl Debug for MokaCommentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaCommentCache")
            .field("entry_count", &self.cache.entry_count())
            .field("weighted_size", &self.cache.weighted_size())
            .finish()
    }
}
