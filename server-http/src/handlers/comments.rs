use crate::api::{
    CreateCommentRequest, ErrorResponse, ListCommentsQuery, ListCommentsResponse,
    UpdateCommentRequest,
};
use crate::extract::Customer;
use crate::state::AppState;
use crate::validation::{validate_rating, CommentViewFactory, ValidationError};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use comments::{CommentError, CommentId, CommentView, ProductId};
use tracing::{error, info, warn};

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Translate a service error into its HTTP status and body
pub fn error_response(err: CommentError) -> ApiError {
    let status = match &err {
        CommentError::NotEligible { .. } => StatusCode::FORBIDDEN,
        CommentError::NotFound(_) | CommentError::NotOwner { .. } => StatusCode::NOT_FOUND,
        CommentError::InvalidRating(_) => StatusCode::BAD_REQUEST,
        CommentError::OperationFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!("Comment request failed: {}", err);
    }

    (status, Json(ErrorResponse::new(err.to_string())))
}

fn bad_request(err: ValidationError) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(err.to_string())))
}

/// Malformed path, query or body: 400 with the usual error body
fn rejected(rejection: impl std::fmt::Display) -> ApiError {
    warn!("Rejected malformed request: {}", rejection);
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(rejection.to_string())),
    )
}

/// GET /products/{product_id}/comments - List a product's comments, optionally by rating
pub async fn list_comments(
    State(state): State<AppState>,
    path: Result<Path<ProductId>, PathRejection>,
    query: Result<Query<ListCommentsQuery>, QueryRejection>,
) -> Result<Json<ListCommentsResponse>, ApiError> {
    let Path(product_id) = path.map_err(rejected)?;
    let Query(query) = query.map_err(rejected)?;

    let result = match query.rating {
        Some(raw) => {
            let rating = validate_rating(raw).map_err(bad_request)?;
            state
                .comment_service
                .get_comments_by_rating(product_id, rating)
                .await
        }
        None => {
            state
                .comment_service
                .get_comments_by_product_id(product_id)
                .await
        }
    };

    result
        .map(|comments| Json(comments.into()))
        .map_err(error_response)
}

/// POST /products/{product_id}/comments - Comment on a purchased product
pub async fn add_comment(
    State(state): State<AppState>,
    Customer(customer_id): Customer,
    path: Result<Path<ProductId>, PathRejection>,
    body: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CommentView>), ApiError> {
    let Path(product_id) = path.map_err(rejected)?;
    let Json(req) = body.map_err(rejected)?;

    info!(
        "ADD_COMMENT request: product={}, requested_by={}",
        product_id, customer_id
    );

    let view = CommentViewFactory::from_create_request(customer_id, product_id, req)
        .map_err(bad_request)?;

    match state.comment_service.add_comment(view).await {
        Ok(created) => Ok((StatusCode::CREATED, Json(created))),
        Err(e) => Err(error_response(e)),
    }
}

/// PUT /comments/{id} - Edit one of the customer's own comments
pub async fn update_comment(
    State(state): State<AppState>,
    Customer(customer_id): Customer,
    path: Result<Path<CommentId>, PathRejection>,
    body: Result<Json<UpdateCommentRequest>, JsonRejection>,
) -> Result<Json<CommentView>, ApiError> {
    let Path(id) = path.map_err(rejected)?;
    let Json(req) = body.map_err(rejected)?;

    info!(
        "UPDATE_COMMENT request: id={}, requested_by={}",
        id, customer_id
    );

    let view =
        CommentViewFactory::from_update_request(customer_id, id, req).map_err(bad_request)?;

    match state.comment_service.update_comment(view, customer_id).await {
        Ok(updated) => Ok(Json(updated)),
        Err(e) => Err(error_response(e)),
    }
}

/// DELETE /comments/{id} - Delete a comment
pub async fn delete_comment(
    State(state): State<AppState>,
    Customer(customer_id): Customer,
    path: Result<Path<CommentId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path.map_err(rejected)?;

    info!(
        "DELETE_COMMENT request: id={}, requested_by={}",
        id, customer_id
    );

    match state.comment_service.delete_comment(id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(error_response(e)),
    }
}
