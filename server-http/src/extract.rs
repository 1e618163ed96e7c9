use crate::api::ErrorResponse;
use axum::{extract::FromRequestParts, http::request::Parts, http::StatusCode, Json};
use comments::CustomerId;

/// Header carrying the id of the customer acting on a write route
pub const CUSTOMER_ID_HEADER: &str = "x-customer-id";

/// The acting customer, taken from the `X-Customer-Id` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Customer(pub CustomerId);

/// Parse the header value into a customer id
fn parse_customer_id(value: &str) -> Option<CustomerId> {
    value.trim().parse::<CustomerId>().ok()
}

fn unauthorized(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::UNAUTHORIZED, Json(ErrorResponse::new(message)))
}

impl<S> FromRequestParts<S> for Customer
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(CUSTOMER_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| unauthorized("Missing X-Customer-Id header"))?;

        parse_customer_id(value)
            .map(Customer)
            .ok_or_else(|| unauthorized("Invalid X-Customer-Id header"))
    }
}
