pub mod requests;
pub mod responses;

pub use requests::{CreateCommentRequest, ListCommentsQuery, UpdateCommentRequest};
pub use responses::{ErrorResponse, HealthResponse, ListCommentsResponse};
