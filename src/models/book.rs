//! Book model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Book model from database
///
/// `available_copies` always stays within `0..=total_copies`; the loan ledger
/// is the only writer of `available_copies` after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author_id: Option<i32>,
    pub isbn: Option<String>,
    pub genre: Option<String>,
    pub total_copies: i32,
    pub available_copies: i32,
}

impl Book {
    pub fn has_available_copy(&self) -> bool {
        self.available_copies >= 1
    }

    pub fn copies_on_loan(&self) -> i32 {
        self.total_copies - self.available_copies
    }

    /// Available copies once the total becomes `total_copies`.
    ///
    /// Copies on loan stay on loan, so the available count moves by the same
    /// amount as the total. `None` when the new total is below the copies on
    /// loan.
    pub fn available_after_resize(&self, total_copies: i32) -> Option<i32> {
        let available = total_copies.checked_sub(self.copies_on_loan())?;
        (available >= 0).then_some(available)
    }
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,
    pub author_id: Option<i32>,
    #[validate(length(min = 10, max = 13, message = "ISBN must be 10 to 13 characters"))]
    pub isbn: Option<String>,
    pub genre: Option<String>,
    #[validate(range(min = 0, message = "total_copies can not be negative"))]
    pub total_copies: i32,
    /// Defaults to `total_copies`
    #[validate(range(min = 0, message = "available_copies can not be negative"))]
    pub available_copies: Option<i32>,
}

/// Update book request
///
/// Changing `total_copies` shifts `available_copies` by the same amount.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: Option<String>,
    pub author_id: Option<i32>,
    #[validate(length(min = 10, max = 13, message = "ISBN must be 10 to 13 characters"))]
    pub isbn: Option<String>,
    pub genre: Option<String>,
    #[validate(range(min = 0, message = "total_copies can not be negative"))]
    pub total_copies: Option<i32>,
}
