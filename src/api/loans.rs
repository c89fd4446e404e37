//! Loan endpoints

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
    models::Loan,
};

use super::{integer_value, JsonBody, LoanActionResponse};

/// Create loan request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLoanRequest {
    pub book_id: i32,
    pub member_id: i32,
}

/// Extend due date request
#[derive(Debug, Deserialize, ToSchema)]
pub struct ExtendDueDateRequest {
    /// Days to add, as an integer or a string holding one
    #[serde(default)]
    #[schema(value_type = i64)]
    pub additional_days: Value,
}

/// Accept `5` and `"5"`; anything else is unparsable
fn parse_additional_days(value: &Value) -> Result<i64, LoanError> {
    integer_value(value).ok_or(LoanError::UnparsableDuration)
}

/// List all loans
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    responses(
        (status = 200, description = "Loan list", body = Vec<Loan>)
    )
)]
pub async fn list_loans(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Loan>>> {
    let loans = state.services.catalog.list_loans().await?;
    Ok(Json(loans))
}

/// Get loan by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan details", body = Loan),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.catalog.get_loan(id).await?;
    Ok(Json(loan))
}

/// Create a loan; same rules as the book loan action
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = CreateLoanRequest,
    responses(
        (status = 201, description = "Loan created", body = Loan),
        (status = 400, description = "No copy available or unknown member", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    JsonBody(request): JsonBody<CreateLoanRequest>,
) -> AppResult<(StatusCode, Json<Loan>)> {
    let loan = state
        .services
        .lend_book(request.book_id, request.member_id)
        .await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Delete a returned loan record
#[utoipa::path(
    delete,
    path = "/loans/{id}",
    tag = "loans",
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 204, description = "Loan deleted"),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan is still active")
    )
)]
pub async fn delete_loan(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_loan(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Extend the due date of an active loan
#[utoipa::path(
    post,
    path = "/loans/{id}/extend_due_date",
    tag = "loans",
    params(("id" = i32, Path, description = "Loan ID")),
    request_body = ExtendDueDateRequest,
    responses(
        (status = 200, description = "Due date extended", body = LoanActionResponse),
        (status = 400, description = "Loan returned, overdue, or invalid duration", body = crate::error::ErrorResponse),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn extend_due_date(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    JsonBody(request): JsonBody<ExtendDueDateRequest>,
) -> AppResult<Json<LoanActionResponse>> {
    // Loan state is reported before a bad duration
    state.services.ledger.extendable_loan(id).await?;
    let additional_days = parse_additional_days(&request.additional_days)?;
    let loan = state.services.ledger.extend(id, additional_days).await?;

    Ok(Json(LoanActionResponse {
        status: format!("Successfully extended loan by {} days", additional_days),
        data: loan,
    }))
}
