use comments::ProductId;
use serde::Deserialize;

/// Body of POST /products/{product_id}/comments
#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub rating: i64,
    pub text: String,
}

/// Body of PUT /comments/{id}
#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub product_id: ProductId,
    pub rating: i64,
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListCommentsQuery {
    #[serde(default)]
    pub rating: Option<i64>,
}
