//! Loans repository for database operations

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use super::{members::MEMBER_SELECT, LedgerStore};
use crate::{
    error::{AppError, AppResult},
    models::{ActiveMember, Book, Loan, LoanNotice, Member, NewLoan},
};

/// Loan joined with the borrower and the book title
const NOTICE_SELECT: &str = r#"
    SELECT l.id AS loan_id, u.username, u.email, b.title AS book_title, l.due_date
    FROM loans l
    JOIN members m ON m.id = l.member_id
    JOIN users u ON u.id = m.user_id
    JOIN books b ON b.id = l.book_id
"#;

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List all loans
    pub async fn list(&self) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>("SELECT * FROM loans ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(loans)
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        self.find_loan(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Delete a returned loan. Active loans hold a copy and must be returned first.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM loans WHERE id = $1 AND is_returned = TRUE")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            self.get_by_id(id).await?;
            return Err(AppError::Conflict(
                "Active loans must be returned before they can be deleted".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for LoansRepository {
    async fn find_book(&self, book_id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn find_member(&self, member_id: i32) -> AppResult<Option<Member>> {
        let member = sqlx::query_as::<_, Member>(&format!("{} WHERE m.id = $1", MEMBER_SELECT))
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(member)
    }

    async fn find_loan(&self, loan_id: i32) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(loan_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(loan)
    }

    async fn open_loan(&self, new_loan: &NewLoan) -> AppResult<Option<Loan>> {
        let mut tx = self.pool.begin().await?;

        // Check-and-decrement in one statement so concurrent loans can not
        // drain the book below zero.
        let taken = sqlx::query(
            r#"
            UPDATE books SET available_copies = available_copies - 1
            WHERE id = $1 AND available_copies >= 1
            "#,
        )
        .bind(new_loan.book_id)
        .execute(&mut *tx)
        .await?;

        if taken.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (book_id, member_id, loan_date, due_date, is_returned)
            VALUES ($1, $2, $3, $4, FALSE)
            RETURNING *
            "#,
        )
        .bind(new_loan.book_id)
        .bind(new_loan.member_id)
        .bind(new_loan.loan_date)
        .bind(new_loan.due_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(loan))
    }

    async fn find_active_loan(&self, book_id: i32, member_id: i32) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            SELECT * FROM loans
            WHERE book_id = $1 AND member_id = $2 AND is_returned = FALSE
            ORDER BY loan_date, id
            LIMIT 1
            "#,
        )
        .bind(book_id)
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(loan)
    }

    async fn close_loan(&self, loan_id: i32, return_date: NaiveDate) -> AppResult<Option<Loan>> {
        let mut tx = self.pool.begin().await?;

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans SET is_returned = TRUE, return_date = $2
            WHERE id = $1 AND is_returned = FALSE
            RETURNING *
            "#,
        )
        .bind(loan_id)
        .bind(return_date)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(loan) = loan else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            r#"
            UPDATE books SET available_copies = available_copies + 1
            WHERE id = $1 AND available_copies < total_copies
            "#,
        )
        .bind(loan.book_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(loan))
    }

    async fn set_due_date(&self, loan_id: i32, due_date: NaiveDate) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(
            "UPDATE loans SET due_date = $2 WHERE id = $1 AND is_returned = FALSE RETURNING *",
        )
        .bind(loan_id)
        .bind(due_date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(loan)
    }

    async fn loan_notice(&self, loan_id: i32) -> AppResult<Option<LoanNotice>> {
        let notice = sqlx::query_as::<_, LoanNotice>(&format!("{} WHERE l.id = $1", NOTICE_SELECT))
            .bind(loan_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(notice)
    }

    async fn overdue_loans(&self, today: NaiveDate) -> AppResult<Vec<LoanNotice>> {
        let notices = sqlx::query_as::<_, LoanNotice>(&format!(
            "{} WHERE l.is_returned = FALSE AND l.due_date < $1 ORDER BY l.due_date, l.id",
            NOTICE_SELECT
        ))
        .bind(today)
        .fetch_all(&self.pool)
        .await?;
        Ok(notices)
    }

    async fn top_active_members(&self, limit: i64) -> AppResult<Vec<ActiveMember>> {
        let members = sqlx::query_as::<_, ActiveMember>(
            r#"
            SELECT m.id, u.username, u.email, COUNT(l.id) AS active_loans
            FROM members m
            JOIN users u ON u.id = m.user_id
            JOIN loans l ON l.member_id = m.id AND l.is_returned = FALSE
            GROUP BY m.id, u.username, u.email
            ORDER BY active_loans DESC, m.id ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }
}
