use crate::models::{CommentId, CustomerId, ProductId};
use std::fmt;
use thiserror::Error;

/// The service operation a wrapped store failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Delete,
    Update,
    ListByProduct,
    ListByRating,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self {
            Operation::Add => "adding the comment",
            Operation::Delete => "deleting the comment",
            Operation::Update => "updating the comment",
            Operation::ListByProduct => "loading the product's comments",
            Operation::ListByRating => "loading the product's comments by rating",
        };
        f.write_str(action)
    }
}

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("You can only comment on products you have purchased")]
    NotEligible {
        customer_id: CustomerId,
        product_id: ProductId,
    },

    #[error("Comment {0} not found")]
    NotFound(CommentId),

    // Not-found family: the boundary answers 404
    #[error("You can only update your own comment")]
    NotOwner {
        comment_id: CommentId,
        customer_id: CustomerId,
    },

    #[error("Rating {0} is out of range (1-5)")]
    InvalidRating(u8),

    #[error("An error occurred while {operation}")]
    OperationFailed {
        operation: Operation,
        #[source]
        source: shared::Error,
    },
}

impl CommentError {
    pub fn failed(operation: Operation) -> impl FnOnce(shared::Error) -> CommentError {
        move |source| CommentError::OperationFailed { operation, source }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CommentError::NotFound(_) | CommentError::NotOwner { .. })
    }
}
