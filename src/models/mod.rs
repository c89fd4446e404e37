//! Data models for Lectern

pub mod author;
pub mod book;
pub mod loan;
pub mod member;

// Re-export commonly used types
pub use author::Author;
pub use book::Book;
pub use loan::{Loan, LoanNotice, NewLoan};
pub use member::{ActiveMember, Member};
