//! Loan confirmation notifications

use std::sync::Arc;

use crate::{
    error::AppResult,
    repository::LedgerStore,
    services::email::{MailTransport, OutgoingMail},
};

/// What happened to a confirmation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent,
    /// The loan disappeared between enqueue and execution
    LoanMissing,
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    store: Arc<dyn LedgerStore>,
    mailer: Arc<dyn MailTransport>,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn LedgerStore>, mailer: Arc<dyn MailTransport>) -> Self {
        Self { store, mailer }
    }

    /// Send the "loan confirmed" message for `loan_id`.
    ///
    /// Transport failures are returned to the caller so the job worker can
    /// retry them.
    pub async fn notify_loan_created(&self, loan_id: i32) -> AppResult<NotifyOutcome> {
        let Some(notice) = self.store.loan_notice(loan_id).await? else {
            tracing::debug!(loan_id, "Loan vanished before its confirmation was sent");
            return Ok(NotifyOutcome::LoanMissing);
        };

        self.mailer.send(&OutgoingMail::loan_confirmation(&notice)).await?;

        tracing::info!(loan_id, recipient = %notice.email, "Loan confirmation sent");
        Ok(NotifyOutcome::Sent)
    }
}
