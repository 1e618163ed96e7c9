//! Conversions between the persisted `Comment` and its transfer shape

use crate::models::{Comment, CommentView, NewComment};
use chrono::Utc;

impl From<Comment> for CommentView {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            customer_id: comment.customer_id,
            product_id: comment.product_id,
            rating: comment.rating,
            text: comment.text,
            created_at: Some(comment.created_at),
            updated_at: comment.updated_at,
        }
    }
}

impl From<CommentView> for NewComment {
    fn from(view: CommentView) -> Self {
        Self {
            customer_id: view.customer_id,
            product_id: view.product_id,
            rating: view.rating,
            text: view.text,
        }
    }
}

pub fn to_views(comments: Vec<Comment>) -> Vec<CommentView> {
    comments.into_iter().map(CommentView::from).collect()
}

/// Copy the editable fields of `view` onto a stored comment.
/// Identity and creation time stay with the stored record.
pub fn merge_view(view: CommentView, comment: &mut Comment) {
    comment.customer_id = view.customer_id;
    comment.product_id = view.product_id;
    comment.rating = view.rating;
    comment.text = view.text;
    comment.updated_at = Some(Utc::now());
}
