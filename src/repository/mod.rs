//! Repository layer for database operations

pub mod authors;
pub mod books;
pub mod loans;
pub mod members;
pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{ActiveMember, Book, Loan, LoanNotice, Member, NewLoan},
};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub authors: authors::AuthorsRepository,
    pub books: books::BooksRepository,
    pub members: members::MembersRepository,
    pub loans: loans::LoansRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            authors: authors::AuthorsRepository::new(pool.clone()),
            books: books::BooksRepository::new(pool.clone()),
            members: members::MembersRepository::new(pool.clone()),
            loans: loans::LoansRepository::new(pool.clone()),
            pool,
        }
    }
}

/// Storage used by the loan ledger, the notification dispatcher and the
/// overdue sweeper.
///
/// Every mutating method is a single conditional write: it either applies
/// completely or reports (through `None`) that the row was no longer in the
/// expected state.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn find_book(&self, book_id: i32) -> AppResult<Option<Book>>;

    async fn find_member(&self, member_id: i32) -> AppResult<Option<Member>>;

    async fn find_loan(&self, loan_id: i32) -> AppResult<Option<Loan>>;

    /// Take one copy of the book and record the loan.
    ///
    /// Returns `None` without writing anything when no copy is left.
    async fn open_loan(&self, new_loan: &NewLoan) -> AppResult<Option<Loan>>;

    /// Oldest active loan of `book_id` held by `member_id`
    async fn find_active_loan(&self, book_id: i32, member_id: i32) -> AppResult<Option<Loan>>;

    /// Mark an active loan returned and give its copy back.
    ///
    /// Returns `None` when the loan was already returned.
    async fn close_loan(&self, loan_id: i32, return_date: NaiveDate) -> AppResult<Option<Loan>>;

    /// Move the due date of an active loan.
    ///
    /// Returns `None` when the loan is missing or already returned.
    async fn set_due_date(&self, loan_id: i32, due_date: NaiveDate) -> AppResult<Option<Loan>>;

    async fn loan_notice(&self, loan_id: i32) -> AppResult<Option<LoanNotice>>;

    /// Active loans due strictly before `today`, with member and book fields
    /// resolved in the same query.
    async fn overdue_loans(&self, today: NaiveDate) -> AppResult<Vec<LoanNotice>>;

    /// Members with at least one active loan, most active first, ties by id
    async fn top_active_members(&self, limit: i64) -> AppResult<Vec<ActiveMember>>;
}
