use crate::error::CommentError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type CommentId = u64;
pub type CustomerId = u64;
pub type ProductId = u64;
pub type OrderId = u64;

/// Star rating attached to a comment, always within 1..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Result<Self, CommentError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(CommentError::InvalidRating(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Every valid rating, lowest first
    pub fn all() -> impl Iterator<Item = Rating> {
        (Self::MIN..=Self::MAX).map(Rating)
    }
}

impl TryFrom<u8> for Rating {
    type Error = CommentError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rating::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persisted comment record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub customer_id: CustomerId,
    pub product_id: ProductId,
    pub rating: Rating,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Insert shape of a comment; the store assigns the id
#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub customer_id: CustomerId,
    pub product_id: ProductId,
    pub rating: Rating,
    pub text: String,
}

impl NewComment {
    pub fn into_comment(self, id: CommentId) -> Comment {
        Comment {
            id,
            customer_id: self.customer_id,
            product_id: self.product_id,
            rating: self.rating,
            text: self.text,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

/// Transfer shape of a comment used at the service boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentView {
    #[serde(default)]
    pub id: CommentId,
    pub customer_id: CustomerId,
    pub product_id: ProductId,
    pub rating: Rating,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CommentView {
    /// A view for a comment that does not exist yet
    pub fn draft(
        customer_id: CustomerId,
        product_id: ProductId,
        rating: Rating,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            customer_id,
            product_id,
            rating,
            text: text.into(),
            created_at: None,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Shipped,
    Completed,
    Cancelled,
}

/// One product line of a customer's order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub product_id: ProductId,
    pub status: OrderStatus,
}

impl OrderDetail {
    pub fn new(
        order_id: OrderId,
        customer_id: CustomerId,
        product_id: ProductId,
        status: OrderStatus,
    ) -> Self {
        Self {
            order_id,
            customer_id,
            product_id,
            status,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == OrderStatus::Completed
    }
}
