#![deny(clippy::all)]

pub mod error;
pub mod mapper;
pub mod models;
pub mod persistence;
pub mod ports;
pub mod service;

// Re-export commonly used types
pub use error::{CommentError, Operation};
pub use models::{
    Comment, CommentId, CommentView, CustomerId, NewComment, OrderDetail, OrderId, OrderStatus,
    ProductId, Rating,
};
pub use persistence::sled_store::SledStore;
pub use ports::{CacheKey, CommentCache, CommentRepository, OrderDetailRepository, Store, UnitOfWork};
pub use service::CommentService;
