use crate::error::{CommentError, Operation};
use crate::mapper::{merge_view, to_views};
use crate::models::{CommentId, CommentView, CustomerId, NewComment, ProductId, Rating};
use crate::ports::{CacheKey, CommentCache, Store};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Application service for product comments.
/// Every write runs in its own unit of work and drops the affected cache slots after commit.
pub struct CommentService {
    store: Arc<dyn Store>,
    cache: Arc<dyn CommentCache>,
    cache_ttl: Duration,
    // Bumped before every invalidation; a rating load that overlaps a bump is not kept
    writes: AtomicU64,
}

impl CommentService {
    pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

    pub fn new(store: Arc<dyn Store>, cache: Arc<dyn CommentCache>) -> Self {
        Self {
            store,
            cache,
            cache_ttl: Self::DEFAULT_CACHE_TTL,
            writes: AtomicU64::new(0),
        }
    }

    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    /// Add a comment for a product the customer has received
    pub async fn add_comment(&self, view: CommentView) -> Result<CommentView, CommentError> {
        let uow = self.store.begin();

        let eligible = uow
            .order_details()
            .has_completed_purchase(view.customer_id, view.product_id)
            .await
            .map_err(|e| self.failure(Operation::Add, e))?;

        if !eligible {
            warn!(
                "ADD_COMMENT rejected: customer={} has no completed purchase of product={}",
                view.customer_id, view.product_id
            );
            return Err(CommentError::NotEligible {
                customer_id: view.customer_id,
                product_id: view.product_id,
            });
        }

        let comment = uow
            .comments()
            .add(NewComment::from(view))
            .await
            .map_err(|e| self.failure(Operation::Add, e))?;

        uow.commit()
            .await
            .map_err(|e| self.failure(Operation::Add, e))?;

        self.invalidate_product(comment.product_id).await;

        info!(
            "ADD_COMMENT: id={}, customer={}, product={}, rating={}",
            comment.id, comment.customer_id, comment.product_id, comment.rating
        );

        Ok(comment.into())
    }

    /// Delete a comment by id
    pub async fn delete_comment(&self, id: CommentId) -> Result<(), CommentError> {
        let uow = self.store.begin();

        let comment = uow
            .comments()
            .get_by_id(id)
            .await
            .map_err(|e| self.failure(Operation::Delete, e))?
            .ok_or_else(|| {
                warn!("DELETE_COMMENT: comment {} not found", id);
                CommentError::NotFound(id)
            })?;

        uow.comments()
            .delete(&comment)
            .await
            .map_err(|e| self.failure(Operation::Delete, e))?;

        uow.commit()
            .await
            .map_err(|e| self.failure(Operation::Delete, e))?;

        self.invalidate_product(comment.product_id).await;

        info!(
            "DELETE_COMMENT: id={}, product={}",
            comment.id, comment.product_id
        );

        Ok(())
    }

    /// All comments of a product
    pub async fn get_comments_by_product_id(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<CommentView>, CommentError> {
        let comments = self
            .store
            .begin()
            .comments()
            .get_by_product(product_id)
            .await
            .map_err(|e| self.failure(Operation::ListByProduct, e))?;

        Ok(to_views(comments))
    }

    /// Comments of a product with one rating, served from the cache when present
    pub async fn get_comments_by_rating(
        &self,
        product_id: ProductId,
        rating: Rating,
    ) -> Result<Vec<CommentView>, CommentError> {
        let key = CacheKey::by_rating(product_id, rating);

        if let Some(cached) = self.cache.get(&key).await {
            debug!("Cache hit for {}", key);
            return Ok(cached);
        }
        debug!("Cache miss for {}", key);

        let writes_seen = self.writes.load(Ordering::SeqCst);
        let comments = self
            .store
            .begin()
            .comments()
            .get_by_rating(product_id, rating)
            .await
            .map_err(|e| self.failure(Operation::ListByRating, e))?;

        let views = to_views(comments);
        self.cache.set(key, views.clone(), self.cache_ttl).await;

        if self.writes.load(Ordering::SeqCst) != writes_seen {
            debug!("A write overlapped the load of {}, dropping it", key);
            self.cache.remove(&key).await;
        }

        Ok(views)
    }

    /// Update a comment owned by `customer_id`
    pub async fn update_comment(
        &self,
        mut view: CommentView,
        customer_id: CustomerId,
    ) -> Result<CommentView, CommentError> {
        let uow = self.store.begin();

        let mut comment = uow
            .comments()
            .get_by_id(view.id)
            .await
            .map_err(|e| self.failure(Operation::Update, e))?
            .ok_or_else(|| {
                warn!("UPDATE_COMMENT: comment {} not found", view.id);
                CommentError::NotFound(view.id)
            })?;

        if comment.customer_id != customer_id {
            warn!(
                "UPDATE_COMMENT rejected: comment={} belongs to customer={}, requested_by={}",
                comment.id, comment.customer_id, customer_id
            );
            return Err(CommentError::NotOwner {
                comment_id: comment.id,
                customer_id,
            });
        }

        let previous_product = comment.product_id;
        view.customer_id = customer_id;
        merge_view(view, &mut comment);

        uow.comments()
            .update(comment.clone())
            .await
            .map_err(|e| match e {
                shared::Error::NotFound => {
                    warn!("UPDATE_COMMENT: comment {} disappeared", comment.id);
                    CommentError::NotFound(comment.id)
                }
                e => self.failure(Operation::Update, e),
            })?;

        uow.commit()
            .await
            .map_err(|e| self.failure(Operation::Update, e))?;

        self.invalidate_product(previous_product).await;
        if comment.product_id != previous_product {
            self.invalidate_product(comment.product_id).await;
        }

        info!(
            "UPDATE_COMMENT: id={}, customer={}, product={}, rating={}",
            comment.id, comment.customer_id, comment.product_id, comment.rating
        );

        Ok(comment.into())
    }

    async fn invalidate_product(&self, product_id: ProductId) {
        self.writes.fetch_add(1, Ordering::SeqCst);
        for key in CacheKey::all_for_product(product_id) {
            self.cache.remove(&key).await;
        }
    }

    fn failure(&self, operation: Operation, source: shared::Error) -> CommentError {
        error!("Error while {}: {}", operation, source);
        CommentError::failed(operation)(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderDetail, OrderStatus};
    use crate::persistence::SledStore;
    use crate::ports::{CommentRepository, OrderDetailRepository, UnitOfWork};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use tempfile::TempDir;
    use tokio::sync::Notify;

    /// In-memory cache that records removals
    #[derive(Default)]
    struct RecordingCache {
        entries: Mutex<HashMap<CacheKey, Vec<CommentView>>>,
        ttls: Mutex<Vec<Duration>>,
        removed: Mutex<Vec<CacheKey>>,
    }

    #[async_trait]
    impl CommentCache for RecordingCache {
        async fn set(&self, key: CacheKey, comments: Vec<CommentView>, ttl: Duration) {
            self.ttls.lock().push(ttl);
            self.entries.lock().insert(key, comments);
        }

        async fn get(&self, key: &CacheKey) -> Option<Vec<CommentView>> {
            self.entries.lock().get(key).cloned()
        }

        async fn remove(&self, key: &CacheKey) {
            self.removed.lock().push(*key);
            self.entries.lock().remove(key);
        }
    }

    /// Store whose every call fails
    struct BrokenStore;

    struct BrokenUnitOfWork;

    #[async_trait]
    impl CommentRepository for BrokenUnitOfWork {
        async fn add(&self, _: NewComment) -> shared::Result<crate::models::Comment> {
            Err(shared::Error::Storage("disk on fire".into()))
        }
        async fn get_by_id(&self, _: CommentId) -> shared::Result<Option<crate::models::Comment>> {
            Err(shared::Error::Storage("disk on fire".into()))
        }
        async fn update(&self, _: crate::models::Comment) -> shared::Result<()> {
            Err(shared::Error::Storage("disk on fire".into()))
        }
        async fn delete(&self, _: &crate::models::Comment) -> shared::Result<()> {
            Err(shared::Error::Storage("disk on fire".into()))
        }
        async fn get_by_product(&self, _: ProductId) -> shared::Result<Vec<crate::models::Comment>> {
            Err(shared::Error::Storage("disk on fire".into()))
        }
        async fn get_by_rating(
            &self,
            _: ProductId,
            _: Rating,
        ) -> shared::Result<Vec<crate::models::Comment>> {
            Err(shared::Error::Storage("disk on fire".into()))
        }
    }

    #[async_trait]
    impl OrderDetailRepository for BrokenUnitOfWork {
        async fn has_completed_purchase(&self, _: CustomerId, _: ProductId) -> shared::Result<bool> {
            Err(shared::Error::Storage("disk on fire".into()))
        }
        async fn save(&self, _: OrderDetail) -> shared::Result<()> {
            Err(shared::Error::Storage("disk on fire".into()))
        }
    }

    #[async_trait]
    impl UnitOfWork for BrokenUnitOfWork {
        fn comments(&self) -> &dyn CommentRepository {
            self
        }
        fn order_details(&self) -> &dyn OrderDetailRepository {
            self
        }
        async fn commit(&self) -> shared::Result<()> {
            Err(shared::Error::Storage("disk on fire".into()))
        }
    }

    impl Store for BrokenStore {
        fn begin(&self) -> Box<dyn UnitOfWork> {
            Box::new(BrokenUnitOfWork)
        }
    }

    struct Fixture {
        _temp_dir: TempDir,
        store: Arc<SledStore>,
        cache: Arc<RecordingCache>,
        service: CommentService,
    }

    fn fixture() -> Fixture {
        fixture_with_ttl(CommentService::DEFAULT_CACHE_TTL)
    }

    fn fixture_with_ttl(ttl: Duration) -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(SledStore::open(temp_dir.path().join("comments.sled")).unwrap());
        let cache = Arc::new(RecordingCache::default());
        let service = CommentService::new(store.clone(), cache.clone()).with_cache_ttl(ttl);
        Fixture {
            _temp_dir: temp_dir,
            store,
            cache,
            service,
        }
    }

    async fn complete_purchase(store: &SledStore, customer_id: CustomerId, product_id: ProductId) {
        let uow = store.begin();
        uow.order_details()
            .save(OrderDetail::new(
                customer_id * 1000 + product_id,
                customer_id,
                product_id,
                OrderStatus::Completed,
            ))
            .await
            .unwrap();
        uow.commit().await.unwrap();
    }

    fn rating(value: u8) -> Rating {
        Rating::new(value).unwrap()
    }

    #[tokio::test]
    async fn test_add_rejects_customer_without_completed_purchase() {
        let f = fixture();

        // Customer 5 only has a shipped order for product 10
        let uow = f.store.begin();
        uow.order_details()
            .save(OrderDetail::new(1, 5, 10, OrderStatus::Shipped))
            .await
            .unwrap();
        uow.commit().await.unwrap();

        let result = f
            .service
            .add_comment(CommentView::draft(5, 10, rating(4), "ok"))
            .await;

        assert!(matches!(
            result,
            Err(CommentError::NotEligible {
                customer_id: 5,
                product_id: 10
            })
        ));
        assert!(f.service.get_comments_by_product_id(10).await.unwrap().is_empty());
        assert!(f.cache.removed.lock().is_empty());
    }

    #[tokio::test]
    async fn test_add_rejects_every_ineligible_pair() {
        let f = fixture();
        complete_purchase(&f.store, 1, 1).await;

        for (customer, product) in [(1, 2), (2, 1), (2, 2), (0, 0)] {
            let result = f
                .service
                .add_comment(CommentView::draft(customer, product, rating(3), "nope"))
                .await;
            assert!(matches!(result, Err(CommentError::NotEligible { .. })));
        }
    }

    #[tokio::test]
    async fn test_add_persists_one_comment_and_invalidates_cache() {
        let f = fixture();
        complete_purchase(&f.store, 5, 10).await;

        // Prime the slot the new comment belongs to
        let before = f.service.get_comments_by_rating(10, rating(4)).await.unwrap();
        assert!(before.is_empty());
        assert!(
            f.cache
                .get(&CacheKey::by_rating(10, rating(4)))
                .await
                .is_some()
        );

        let created = f
            .service
            .add_comment(CommentView::draft(5, 10, rating(4), "ok"))
            .await
            .unwrap();

        assert!(created.id >= 1);
        assert_eq!(created.customer_id, 5);
        assert!(created.created_at.is_some());

        let listed = f.service.get_comments_by_product_id(10).await.unwrap();
        assert_eq!(listed, vec![created.clone()]);

        let removed = f.cache.removed.lock().clone();
        assert_eq!(removed, CacheKey::all_for_product(10).collect::<Vec<_>>());

        // The next rating query reloads from the store
        let after = f.service.get_comments_by_rating(10, rating(4)).await.unwrap();
        assert_eq!(after, vec![created]);
    }

    #[tokio::test]
    async fn test_delete_missing_comment_is_not_found() {
        let f = fixture();

        let result = f.service.delete_comment(404).await;

        assert!(matches!(result, Err(CommentError::NotFound(404))));
        assert!(f.cache.removed.lock().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_comment_without_owner_check() {
        let f = fixture();
        complete_purchase(&f.store, 5, 10).await;

        let created = f
            .service
            .add_comment(CommentView::draft(5, 10, rating(2), "bad"))
            .await
            .unwrap();
        f.cache.removed.lock().clear();

        f.service.delete_comment(created.id).await.unwrap();

        assert!(f.service.get_comments_by_product_id(10).await.unwrap().is_empty());
        assert_eq!(f.cache.removed.lock().len(), 5);
        assert!(matches!(
            f.service.delete_comment(created.id).await,
            Err(CommentError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_by_other_customer_fails() {
        let f = fixture();
        complete_purchase(&f.store, 5, 10).await;

        let created = f
            .service
            .add_comment(CommentView::draft(5, 10, rating(4), "ok"))
            .await
            .unwrap();

        let mut edit = created.clone();
        edit.text = "hijacked".to_string();
        let result = f.service.update_comment(edit, 6).await;

        assert!(matches!(
            result,
            Err(CommentError::NotOwner {
                customer_id: 6,
                ..
            })
        ));
        assert!(result.unwrap_err().is_not_found());

        let listed = f.service.get_comments_by_product_id(10).await.unwrap();
        assert_eq!(listed[0].text, "ok");
    }

    #[tokio::test]
    async fn test_update_by_owner_merges_and_reassigns_owner() {
        let f = fixture();
        complete_purchase(&f.store, 5, 10).await;

        let created = f
            .service
            .add_comment(CommentView::draft(5, 10, rating(4), "ok"))
            .await
            .unwrap();

        // The view claims another owner; the acting customer wins
        let mut edit = created.clone();
        edit.customer_id = 77;
        edit.rating = rating(5);
        edit.text = "better than expected".to_string();

        let updated = f.service.update_comment(edit, 5).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.customer_id, 5);
        assert_eq!(updated.rating, rating(5));
        assert_eq!(updated.text, "better than expected");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at.is_some());

        let listed = f.service.get_comments_by_product_id(10).await.unwrap();
        assert_eq!(listed, vec![updated]);
    }

    #[tokio::test]
    async fn test_update_missing_comment_is_not_found() {
        let f = fixture();

        let mut edit = CommentView::draft(5, 10, rating(4), "ghost");
        edit.id = 12;

        assert!(matches!(
            f.service.update_comment(edit, 5).await,
            Err(CommentError::NotFound(12))
        ));
    }

    #[tokio::test]
    async fn test_update_moving_product_invalidates_both_products() {
        let f = fixture();
        complete_purchase(&f.store, 5, 10).await;

        let created = f
            .service
            .add_comment(CommentView::draft(5, 10, rating(4), "ok"))
            .await
            .unwrap();
        f.cache.removed.lock().clear();

        let mut edit = created.clone();
        edit.product_id = 11;
        f.service.update_comment(edit, 5).await.unwrap();

        let removed = f.cache.removed.lock().clone();
        assert_eq!(removed.len(), 10);
        assert!(removed.iter().any(|k| k.product_id == 10));
        assert!(removed.iter().any(|k| k.product_id == 11));
    }

    #[tokio::test]
    async fn test_rating_queries_use_separate_slots() {
        let f = fixture_with_ttl(Duration::from_secs(60));
        complete_purchase(&f.store, 1, 10).await;
        complete_purchase(&f.store, 2, 10).await;

        let four = f
            .service
            .add_comment(CommentView::draft(1, 10, rating(4), "four"))
            .await
            .unwrap();
        let two = f
            .service
            .add_comment(CommentView::draft(2, 10, rating(2), "two"))
            .await
            .unwrap();

        assert_eq!(
            f.service.get_comments_by_rating(10, rating(4)).await.unwrap(),
            vec![four.clone()]
        );
        assert_eq!(
            f.service.get_comments_by_rating(10, rating(2)).await.unwrap(),
            vec![two]
        );

        // The second query did not overwrite the first slot
        assert_eq!(
            f.cache.get(&CacheKey::by_rating(10, rating(4))).await,
            Some(vec![four])
        );
        assert_eq!(*f.cache.ttls.lock(), vec![Duration::from_secs(60); 2]);
    }

    #[tokio::test]
    async fn test_rating_query_serves_cached_result() {
        let f = fixture();
        let key = CacheKey::by_rating(10, rating(3));
        let cached = vec![CommentView::draft(9, 10, rating(3), "from cache")];
        f.cache.set(key, cached.clone(), Duration::from_secs(5)).await;

        let result = f.service.get_comments_by_rating(10, rating(3)).await.unwrap();

        assert_eq!(result, cached);
    }

    #[tokio::test]
    async fn test_default_ttl_is_thirty_minutes() {
        let f = fixture();
        f.service.get_comments_by_rating(1, rating(1)).await.unwrap();

        assert_eq!(*f.cache.ttls.lock(), vec![Duration::from_secs(1800)]);
    }

    #[tokio::test]
    async fn test_store_failures_are_wrapped() {
        let cache = Arc::new(RecordingCache::default());
        let service = CommentService::new(Arc::new(BrokenStore), cache.clone());

        let add = service
            .add_comment(CommentView::draft(1, 1, rating(5), "x"))
            .await
            .unwrap_err();
        assert!(matches!(
            add,
            CommentError::OperationFailed {
                operation: Operation::Add,
                ..
            }
        ));
        assert_eq!(add.to_string(), "An error occurred while adding the comment");

        assert!(matches!(
            service.delete_comment(1).await,
            Err(CommentError::OperationFailed {
                operation: Operation::Delete,
                ..
            })
        ));
        assert!(matches!(
            service
                .update_comment(CommentView::draft(1, 1, rating(5), "x"), 1)
                .await,
            Err(CommentError::OperationFailed {
                operation: Operation::Update,
                ..
            })
        ));
        assert!(matches!(
            service.get_comments_by_product_id(1).await,
            Err(CommentError::OperationFailed {
                operation: Operation::ListByProduct,
                ..
            })
        ));
        assert!(matches!(
            service.get_comments_by_rating(1, rating(1)).await,
            Err(CommentError::OperationFailed {
                operation: Operation::ListByRating,
                ..
            })
        ));

        // Nothing was cached or invalidated
        assert!(cache.entries.lock().is_empty());
        assert!(cache.removed.lock().is_empty());
    }

    /// Unit of work whose comment is deleted between the read and the write
    struct VanishingStore;

    struct VanishingUnitOfWork;

    #[async_trait]
    impl CommentRepository for VanishingUnitOfWork {
        async fn add(&self, _: NewComment) -> shared::Result<crate::models::Comment> {
            Err(shared::Error::Internal("not used".into()))
        }
        async fn get_by_id(&self, id: CommentId) -> shared::Result<Option<crate::models::Comment>> {
            let view = CommentView::draft(5, 10, rating(4), "soon gone");
            Ok(Some(NewComment::from(view).into_comment(id)))
        }
        async fn update(&self, _: crate::models::Comment) -> shared::Result<()> {
            Err(shared::Error::NotFound)
        }
        async fn delete(&self, _: &crate::models::Comment) -> shared::Result<()> {
            Err(shared::Error::NotFound)
        }
        async fn get_by_product(&self, _: ProductId) -> shared::Result<Vec<crate::models::Comment>> {
            Ok(Vec::new())
        }
        async fn get_by_rating(
            &self,
            _: ProductId,
            _: Rating,
        ) -> shared::Result<Vec<crate::models::Comment>> {
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl OrderDetailRepository for VanishingUnitOfWork {
        async fn has_completed_purchase(&self, _: CustomerId, _: ProductId) -> shared::Result<bool> {
            Ok(true)
        }
        async fn save(&self, _: OrderDetail) -> shared::Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl UnitOfWork for VanishingUnitOfWork {
        fn comments(&self) -> &dyn CommentRepository {
            self
        }
        fn order_details(&self) -> &dyn OrderDetailRepository {
            self
        }
        async fn commit(&self) -> shared::Result<()> {
            Ok(())
        }
    }

    impl Store for VanishingStore {
        fn begin(&self) -> Box<dyn UnitOfWork> {
            Box::new(VanishingUnitOfWork)
        }
    }

    #[tokio::test]
    async fn test_update_of_vanished_comment_is_not_found() {
        let cache = Arc::new(RecordingCache::default());
        let service = CommentService::new(Arc::new(VanishingStore), cache.clone());

        let mut edit = CommentView::draft(5, 10, rating(1), "too late");
        edit.id = 7;

        assert!(matches!(
            service.update_comment(edit, 5).await,
            Err(CommentError::NotFound(7))
        ));
        assert!(cache.removed.lock().is_empty());
    }

    /// Pauses the first rating load after it has read the store
    #[derive(Default)]
    struct Gate {
        loaded: Notify,
        resume: Notify,
    }

    struct GatedStore {
        inner: SledStore,
        gate: Arc<Mutex<Option<Arc<Gate>>>>,
    }

    struct GatedUnitOfWork {
        inner: Box<dyn UnitOfWork>,
        gate: Arc<Mutex<Option<Arc<Gate>>>>,
    }

    #[async_trait]
    impl CommentRepository for GatedUnitOfWork {
        async fn add(&self, comment: NewComment) -> shared::Result<crate::models::Comment> {
            self.inner.comments().add(comment).await
        }
        async fn get_by_id(&self, id: CommentId) -> shared::Result<Option<crate::models::Comment>> {
            self.inner.comments().get_by_id(id).await
        }
        async fn update(&self, comment: crate::models::Comment) -> shared::Result<()> {
            self.inner.comments().update(comment).await
        }
        async fn delete(&self, comment: &crate::models::Comment) -> shared::Result<()> {
            self.inner.comments().delete(comment).await
        }
        async fn get_by_product(
            &self,
            product_id: ProductId,
        ) -> shared::Result<Vec<crate::models::Comment>> {
            self.inner.comments().get_by_product(product_id).await
        }
        async fn get_by_rating(
            &self,
            product_id: ProductId,
            rating: Rating,
        ) -> shared::Result<Vec<crate::models::Comment>> {
            let comments = self
                .inner
                .comments()
                .get_by_rating(product_id, rating)
                .await?;

            let gate = self.gate.lock().take();
            if let Some(gate) = gate {
                gate.loaded.notify_one();
                gate.resume.notified().await;
            }
            Ok(comments)
        }
    }

    #[async_trait]
    impl UnitOfWork for GatedUnitOfWork {
        fn comments(&self) -> &dyn CommentRepository {
            self
        }
        fn order_details(&self) -> &dyn OrderDetailRepository {
            self.inner.order_details()
        }
        async fn commit(&self) -> shared::Result<()> {
            self.inner.commit().await
        }
    }

    impl Store for GatedStore {
        fn begin(&self) -> Box<dyn UnitOfWork> {
            Box::new(GatedUnitOfWork {
                inner: self.inner.begin(),
                gate: self.gate.clone(),
            })
        }
    }

    #[tokio::test]
    async fn test_write_during_rating_load_is_not_cached() {
        let temp_dir = TempDir::new().unwrap();
        let inner = SledStore::open(temp_dir.path().join("comments.sled")).unwrap();
        complete_purchase(&inner, 5, 10).await;

        let gate = Arc::new(Gate::default());
        let store = Arc::new(GatedStore {
            inner,
            gate: Arc::new(Mutex::new(Some(gate.clone()))),
        });
        let cache = Arc::new(RecordingCache::default());
        let service = Arc::new(CommentService::new(store, cache.clone()));

        let reader = tokio::spawn({
            let service = service.clone();
            async move { service.get_comments_by_rating(10, rating(4)).await }
        });

        // The reader holds an empty list while the comment lands
        gate.loaded.notified().await;
        let created = service
            .add_comment(CommentView::draft(5, 10, rating(4), "raced"))
            .await
            .unwrap();
        gate.resume.notify_one();

        assert!(reader.await.unwrap().unwrap().is_empty());
        assert_eq!(cache.get(&CacheKey::by_rating(10, rating(4))).await, None);

        assert_eq!(
            service.get_comments_by_rating(10, rating(4)).await.unwrap(),
            vec![created]
        );
    }
}
