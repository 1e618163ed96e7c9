use comments::CommentView;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ListCommentsResponse {
    pub comments: Vec<CommentView>,
    pub count: usize,
}

impl From<Vec<CommentView>> for ListCommentsResponse {
    fn from(comments: Vec<CommentView>) -> Self {
        Self {
            count: comments.len(),
            comments,
        }
    }
}

// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
