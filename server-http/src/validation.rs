use crate::api::{CreateCommentRequest, UpdateCommentRequest};
use comments::{CommentId, CommentView, CustomerId, ProductId, Rating};

// Constants for validation ranges
pub const MAX_TEXT_CHARS: usize = 2000;

#[derive(Debug, PartialEq, Eq)]
pub enum ValidationError {
    RatingOutOfRange(i64),
    EmptyText,
    TextTooLong { length: usize, max: usize },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::RatingOutOfRange(rating) => {
                write!(
                    f,
                    "Rating {} is out of range (min: {}, max: {})",
                    rating,
                    Rating::MIN,
                    Rating::MAX
                )
            }
            ValidationError::EmptyText => write!(f, "Comment text must not be empty"),
            ValidationError::TextTooLong { length, max } => {
                write!(
                    f,
                    "Comment text is {} characters long (max: {})",
                    length, max
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

pub fn validate_rating(raw: i64) -> Result<Rating, ValidationError> {
    u8::try_from(raw)
        .ok()
        .and_then(|value| Rating::new(value).ok())
        .ok_or(ValidationError::RatingOutOfRange(raw))
}

fn validate_text(text: String) -> Result<String, ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::EmptyText);
    }

    let length = text.chars().count();
    if length > MAX_TEXT_CHARS {
        return Err(ValidationError::TextTooLong {
            length,
            max: MAX_TEXT_CHARS,
        });
    }

    Ok(text)
}

pub struct CommentViewFactory;

impl CommentViewFactory {
    /// Validate a create request and build the view for a new comment
    pub fn from_create_request(
        customer_id: CustomerId,
        product_id: ProductId,
        req: CreateCommentRequest,
    ) -> Result<CommentView, ValidationError> {
        let rating = validate_rating(req.rating)?;
        let text = validate_text(req.text)?;

        Ok(CommentView::draft(customer_id, product_id, rating, text))
    }

    /// Validate an update request and build the view carrying the edit
    pub fn from_update_request(
        customer_id: CustomerId,
        comment_id: CommentId,
        req: UpdateCommentRequest,
    ) -> Result<CommentView, ValidationError> {
        let rating = validate_rating(req.rating)?;
        let text = validate_text(req.text)?;

        let mut view = CommentView::draft(customer_id, req.product_id, rating, text);
        view.id = comment_id;
        Ok(view)
    }
}
