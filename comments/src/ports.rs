use crate::models::{
    Comment, CommentId, CommentView, CustomerId, NewComment, OrderDetail, ProductId, Rating,
};
use async_trait::async_trait;
use shared::Result;
use std::fmt;
use std::time::Duration;

// Ports are the pluggable extension points for storage and caching backends

/// Record-level access to comments.
/// Writes are staged in the owning unit of work until it commits.
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Stage a new comment; the returned record carries its allocated id
    async fn add(&self, comment: NewComment) -> Result<Comment>;

    async fn get_by_id(&self, id: CommentId) -> Result<Option<Comment>>;

    /// Stage the replacement of an existing comment
    async fn update(&self, comment: Comment) -> Result<()>;

    /// Stage the removal of a comment
    async fn delete(&self, comment: &Comment) -> Result<()>;

    /// All comments of a product, oldest id first
    async fn get_by_product(&self, product_id: ProductId) -> Result<Vec<Comment>>;

    /// Comments of a product with exactly the given rating
    async fn get_by_rating(&self, product_id: ProductId, rating: Rating) -> Result<Vec<Comment>>;
}

#[async_trait]
pub trait OrderDetailRepository: Send + Sync {
    /// Whether the customer has a completed order line for the product
    async fn has_completed_purchase(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
    ) -> Result<bool>;

    /// Stage an insert or replacement of an order line
    async fn save(&self, detail: OrderDetail) -> Result<()>;
}

/// One request's view of the store: repositories plus an atomic commit
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    fn comments(&self) -> &dyn CommentRepository;

    fn order_details(&self) -> &dyn OrderDetailRepository;

    /// Apply every staged change atomically
    async fn commit(&self) -> Result<()>;
}

/// Port for opening units of work against a backing store
pub trait Store: Send + Sync + 'static {
    fn begin(&self) -> Box<dyn UnitOfWork>;
}

/// Cache slot for the rating-filtered comment list of one product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub product_id: ProductId,
    pub rating: Rating,
}

impl CacheKey {
    pub fn by_rating(product_id: ProductId, rating: Rating) -> Self {
        Self { product_id, rating }
    }

    /// Every slot that may hold comments of `product_id`
    pub fn all_for_product(product_id: ProductId) -> impl Iterator<Item = CacheKey> {
        Rating::all().map(move |rating| CacheKey::by_rating(product_id, rating))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "comments:product:{}:rating:{}",
            self.product_id, self.rating
        )
    }
}

/// Port for the best-effort comment list cache
#[async_trait]
pub trait CommentCache: Send + Sync + 'static {
    async fn set(&self, key: CacheKey, comments: Vec<CommentView>, ttl: Duration);
    async fn get(&self, key: &CacheKey) -> Option<Vec<CommentView>>;
    async fn remove(&self, key: &CacheKey);
}
