//! In-memory ledger store
//!
//! Backs the ledger, the dispatcher and the sweeper without a database. Used
//! by the test suites and handy for local experiments.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;

use super::LedgerStore;
use crate::{
    error::AppResult,
    models::{ActiveMember, Book, Loan, LoanNotice, Member, NewLoan},
};

#[derive(Default)]
struct State {
    books: BTreeMap<i32, Book>,
    members: BTreeMap<i32, Member>,
    loans: BTreeMap<i32, Loan>,
    next_id: i32,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn notice(&self, loan: &Loan) -> Option<LoanNotice> {
        let member = self.members.get(&loan.member_id)?;
        let book = self.books.get(&loan.book_id)?;
        Some(LoanNotice {
            loan_id: loan.id,
            username: member.username.clone(),
            email: member.email.clone(),
            book_title: book.title.clone(),
            due_date: loan.due_date,
        })
    }
}

#[derive(Default)]
pub struct MemoryLedgerStore {
    state: Mutex<State>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock can not leave a half-written row.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_book(&self, title: &str, total_copies: i32, available_copies: i32) -> Book {
        let mut state = self.state();
        let book = Book {
            id: state.next_id(),
            title: title.to_string(),
            author_id: None,
            isbn: None,
            genre: None,
            total_copies,
            available_copies,
        };
        state.books.insert(book.id, book.clone());
        book
    }

    pub fn add_member(&self, username: &str, email: &str) -> Member {
        let mut state = self.state();
        let id = state.next_id();
        let member = Member {
            id,
            user_id: id,
            username: username.to_string(),
            email: email.to_string(),
            membership_date: NaiveDate::default(),
        };
        state.members.insert(member.id, member.clone());
        member
    }

    /// Record an active loan as-is, e.g. one that is already overdue.
    /// The book's copy count is not touched.
    pub fn add_loan(&self, book_id: i32, member_id: i32, loan_date: NaiveDate, due_date: NaiveDate) -> Loan {
        let mut state = self.state();
        let loan = Loan {
            id: state.next_id(),
            book_id,
            member_id,
            loan_date,
            due_date,
            return_date: None,
            is_returned: false,
        };
        state.loans.insert(loan.id, loan.clone());
        loan
    }

    pub fn remove_loan(&self, loan_id: i32) -> Option<Loan> {
        self.state().loans.remove(&loan_id)
    }

    pub fn book(&self, book_id: i32) -> Option<Book> {
        self.state().books.get(&book_id).cloned()
    }

    pub fn loan(&self, loan_id: i32) -> Option<Loan> {
        self.state().loans.get(&loan_id).cloned()
    }

    pub fn loans(&self) -> Vec<Loan> {
        self.state().loans.values().cloned().collect()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn find_book(&self, book_id: i32) -> AppResult<Option<Book>> {
        Ok(self.book(book_id))
    }

    async fn find_member(&self, member_id: i32) -> AppResult<Option<Member>> {
        Ok(self.state().members.get(&member_id).cloned())
    }

    async fn find_loan(&self, loan_id: i32) -> AppResult<Option<Loan>> {
        Ok(self.loan(loan_id))
    }

    async fn open_loan(&self, new_loan: &NewLoan) -> AppResult<Option<Loan>> {
        let mut state = self.state();

        match state.books.get_mut(&new_loan.book_id) {
            Some(book) if book.available_copies >= 1 => book.available_copies -= 1,
            _ => return Ok(None),
        }

        let loan = Loan {
            id: state.next_id(),
            book_id: new_loan.book_id,
            member_id: new_loan.member_id,
            loan_date: new_loan.loan_date,
            due_date: new_loan.due_date,
            return_date: None,
            is_returned: false,
        };
        state.loans.insert(loan.id, loan.clone());
        Ok(Some(loan))
    }

    async fn find_active_loan(&self, book_id: i32, member_id: i32) -> AppResult<Option<Loan>> {
        Ok(self
            .state()
            .loans
            .values()
            .filter(|l| l.book_id == book_id && l.member_id == member_id && l.is_active())
            .min_by_key(|l| (l.loan_date, l.id))
            .cloned())
    }

    async fn close_loan(&self, loan_id: i32, return_date: NaiveDate) -> AppResult<Option<Loan>> {
        let mut state = self.state();

        let loan = match state.loans.get_mut(&loan_id) {
            Some(loan) if loan.is_active() => {
                loan.is_returned = true;
                loan.return_date = Some(return_date);
                loan.clone()
            }
            _ => return Ok(None),
        };

        if let Some(book) = state.books.get_mut(&loan.book_id) {
            if book.available_copies < book.total_copies {
                book.available_copies += 1;
            }
        }
        Ok(Some(loan))
    }

    async fn set_due_date(&self, loan_id: i32, due_date: NaiveDate) -> AppResult<Option<Loan>> {
        let mut state = self.state();
        Ok(match state.loans.get_mut(&loan_id) {
            Some(loan) if loan.is_active() => {
                loan.due_date = due_date;
                Some(loan.clone())
            }
            _ => None,
        })
    }

    async fn loan_notice(&self, loan_id: i32) -> AppResult<Option<LoanNotice>> {
        let state = self.state();
        Ok(state.loans.get(&loan_id).and_then(|loan| state.notice(loan)))
    }

    async fn overdue_loans(&self, today: NaiveDate) -> AppResult<Vec<LoanNotice>> {
        let state = self.state();
        Ok(state
            .loans
            .values()
            .filter(|loan| loan.is_overdue(today))
            .filter_map(|loan| state.notice(loan))
            .collect())
    }

    async fn top_active_members(&self, limit: i64) -> AppResult<Vec<ActiveMember>> {
        let state = self.state();

        let mut counts: BTreeMap<i32, i64> = BTreeMap::new();
        for loan in state.loans.values().filter(|l| l.is_active()) {
            *counts.entry(loan.member_id).or_default() += 1;
        }

        let mut ranked: Vec<ActiveMember> = counts
            .into_iter()
            .filter_map(|(member_id, active_loans)| {
                state.members.get(&member_id).map(|m| ActiveMember {
                    id: m.id,
                    username: m.username.clone(),
                    email: m.email.clone(),
                    active_loans,
                })
            })
            .collect();
        ranked.sort_by(|a, b| b.active_loans.cmp(&a.active_loans).then(a.id.cmp(&b.id)));
        ranked.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(ranked)
    }
}
