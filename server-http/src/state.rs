use comments::CommentService;
use std::sync::Arc;

/// Server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub comment_service: Arc<CommentService>,
}

impl AppState {
    pub fn new(comment_service: Arc<CommentService>) -> Self {
        Self { comment_service }
    }
}
