//! Loan model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Loan model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub book_id: i32,
    pub member_id: i32,
    pub loan_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub is_returned: bool,
}

impl Loan {
    pub fn is_active(&self) -> bool {
        !self.is_returned
    }

    /// Active and due strictly before `today`
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_active() && self.due_date < today
    }
}

/// Values for a loan about to be recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoan {
    pub book_id: i32,
    pub member_id: i32,
    pub loan_date: NaiveDate,
    pub due_date: NaiveDate,
}

/// Loan with the member and book fields needed to write to the borrower
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct LoanNotice {
    pub loan_id: i32,
    pub username: String,
    pub email: String,
    pub book_title: String,
    pub due_date: NaiveDate,
}
