//! Loan ledger: issuing, returning and extending loans
//!
//! The ledger owns every change to a loan and to a book's available copy
//! count. It does not talk to the job queue; callers decide what to notify.

use std::sync::Arc;

use chrono::Days;

use crate::{
    config::LoansConfig,
    error::{AppError, AppResult, LoanError},
    models::{ActiveMember, Loan, NewLoan},
    repository::LedgerStore,
    services::clock::Clock,
};

/// Number of members returned by [`LoanLedger::top_active_members`]
pub const TOP_ACTIVE_LIMIT: i64 = 5;

#[derive(Clone)]
pub struct LoanLedger {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    loan_period: Days,
}

impl LoanLedger {
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>, config: &LoansConfig) -> Self {
        Self {
            store,
            clock,
            loan_period: Days::new(u64::from(config.loan_period_days)),
        }
    }

    /// Lend one copy of a book to a member
    pub async fn create_loan(&self, book_id: i32, member_id: i32) -> AppResult<Loan> {
        let book = self
            .store
            .find_book(book_id)
            .await?
            .ok_or(LoanError::BookNotFound(book_id))?;

        if !book.has_available_copy() {
            return Err(LoanError::NoCopiesAvailable.into());
        }

        let member = self
            .store
            .find_member(member_id)
            .await?
            .ok_or(LoanError::MemberNotFound)?;

        let today = self.clock.today();
        let due_date = today
            .checked_add_days(self.loan_period)
            .ok_or_else(|| AppError::Internal("Loan period overflows the calendar".to_string()))?;

        let new_loan = NewLoan {
            book_id: book.id,
            member_id: member.id,
            loan_date: today,
            due_date,
        };

        // The last copy may have gone between the read above and this write.
        let loan = self
            .store
            .open_loan(&new_loan)
            .await?
            .ok_or(LoanError::NoCopiesAvailable)?;

        tracing::info!(loan_id = loan.id, book_id, member_id, %due_date, "Loan created");
        Ok(loan)
    }

    /// Return the active loan a member holds on a book
    pub async fn return_loan(&self, book_id: i32, member_id: i32) -> AppResult<Loan> {
        let active = self
            .store
            .find_active_loan(book_id, member_id)
            .await?
            .ok_or(LoanError::NoActiveLoan)?;

        let loan = self
            .store
            .close_loan(active.id, self.clock.today())
            .await?
            .ok_or(LoanError::NoActiveLoan)?;

        tracing::info!(loan_id = loan.id, book_id, member_id, "Loan returned");
        Ok(loan)
    }

    /// The loan if its due date may still be pushed, whatever the duration
    pub async fn extendable_loan(&self, loan_id: i32) -> AppResult<Loan> {
        let loan = self
            .store
            .find_loan(loan_id)
            .await?
            .ok_or(LoanError::LoanNotFound(loan_id))?;

        if loan.is_returned {
            return Err(LoanError::AlreadyReturned.into());
        }
        if loan.is_overdue(self.clock.today()) {
            return Err(LoanError::AlreadyOverdue.into());
        }
        Ok(loan)
    }

    /// Push the due date of an active, not yet overdue loan
    pub async fn extend(&self, loan_id: i32, additional_days: i64) -> AppResult<Loan> {
        let loan = self.extendable_loan(loan_id).await?;

        let days = u64::try_from(additional_days)
            .ok()
            .filter(|days| *days > 0)
            .ok_or(LoanError::InvalidDuration)?;
        let due_date = loan
            .due_date
            .checked_add_days(Days::new(days))
            .ok_or(LoanError::InvalidDuration)?;

        let loan = self
            .store
            .set_due_date(loan_id, due_date)
            .await?
            .ok_or(LoanError::AlreadyReturned)?;

        tracing::info!(loan_id, additional_days, %due_date, "Loan extended");
        Ok(loan)
    }

    /// Members holding the most active loans
    pub async fn top_active_members(&self) -> AppResult<Vec<ActiveMember>> {
        self.store.top_active_members(TOP_ACTIVE_LIMIT).await
    }
}
