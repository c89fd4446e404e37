//! Book endpoints, including the loan and return actions

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::{
    error::{AppResult, LoanError},
    models::book::{Book, CreateBook, UpdateBook},
};

use super::{integer_value, JsonBody, LoanActionResponse};

/// Member acting on a book
#[derive(Debug, Deserialize, ToSchema)]
pub struct MemberActionRequest {
    /// Member ID, as an integer or a string holding one
    #[serde(default)]
    #[schema(value_type = i32)]
    pub member_id: Value,
}

impl MemberActionRequest {
    /// `None` when missing or not an integer: no such member
    fn member_id(&self) -> Option<i32> {
        integer_value(&self.member_id).and_then(|id| i32::try_from(id).ok())
    }
}

/// List all books
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    responses(
        (status = 200, description = "Book list", body = Vec<Book>)
    )
)]
pub async fn list_books(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Book>>> {
    let books = state.services.catalog.list_books().await?;
    Ok(Json(books))
}

/// Get book by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Create book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "ISBN already used")
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    JsonBody(data): JsonBody<CreateBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let book = state.services.catalog.create_book(&data).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// Update book
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    params(("id" = i32, Path, description = "Book ID")),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Fewer copies than are on loan"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    JsonBody(data): JsonBody<UpdateBook>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.update_book(id, &data).await?;
    Ok(Json(book))
}

/// Delete book
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book has active loans")
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_book(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Lend a copy of the book to a member
#[utoipa::path(
    post,
    path = "/books/{id}/loan",
    tag = "books",
    params(("id" = i32, Path, description = "Book ID")),
    request_body = MemberActionRequest,
    responses(
        (status = 201, description = "Book loaned", body = LoanActionResponse),
        (status = 400, description = "No copy available or unknown member", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn loan_book(
    State(state): State<crate::AppState>,
    Path(book_id): Path<i32>,
    JsonBody(request): JsonBody<MemberActionRequest>,
) -> AppResult<(StatusCode, Json<LoanActionResponse>)> {
    let member_id = request.member_id().ok_or(LoanError::MemberNotFound)?;
    let loan = state.services.lend_book(book_id, member_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(LoanActionResponse {
            status: "Book loaned successfully.".to_string(),
            data: loan,
        }),
    ))
}

/// Return the member's active loan of the book
#[utoipa::path(
    post,
    path = "/books/{id}/return_book",
    tag = "books",
    params(("id" = i32, Path, description = "Book ID")),
    request_body = MemberActionRequest,
    responses(
        (status = 200, description = "Book returned", body = LoanActionResponse),
        (status = 400, description = "No active loan", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    Path(book_id): Path<i32>,
    JsonBody(request): JsonBody<MemberActionRequest>,
) -> AppResult<Json<LoanActionResponse>> {
    // Without a member there is no loan to look for
    let member_id = request.member_id().ok_or(LoanError::NoActiveLoan)?;
    let loan = state.services.ledger.return_loan(book_id, member_id).await?;

    Ok(Json(LoanActionResponse {
        status: "Book returned successfully.".to_string(),
        data: loan,
    }))
}
