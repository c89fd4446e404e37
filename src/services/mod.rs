//! Business logic services

pub mod catalog;
pub mod clock;
pub mod email;
pub mod ledger;
pub mod notifications;
pub mod sweeper;

use std::sync::Arc;

use crate::{
    config::{JobsConfig, LoansConfig},
    error::AppResult,
    jobs::{worker::JobWorker, Job, JobQueue},
    models::Loan,
    repository::{LedgerStore, Repository},
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub ledger: ledger::LoanLedger,
    pub notifications: notifications::NotificationDispatcher,
    pub sweeper: sweeper::OverdueSweeper,
    pub jobs: Arc<dyn JobQueue>,
}

impl Services {
    /// Wire all services around the given stores, queue and mail transport
    pub fn new(
        repository: Repository,
        ledger_store: Arc<dyn LedgerStore>,
        mailer: Arc<dyn email::MailTransport>,
        jobs: Arc<dyn JobQueue>,
        clock: Arc<dyn clock::Clock>,
        loans_config: &LoansConfig,
    ) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository),
            ledger: ledger::LoanLedger::new(ledger_store.clone(), clock.clone(), loans_config),
            notifications: notifications::NotificationDispatcher::new(
                ledger_store.clone(),
                mailer.clone(),
            ),
            sweeper: sweeper::OverdueSweeper::new(ledger_store, mailer, clock),
            jobs,
        }
    }

    /// Issue a loan and queue its confirmation email.
    ///
    /// The loan stands even if the confirmation can not be queued.
    pub async fn lend_book(&self, book_id: i32, member_id: i32) -> AppResult<Loan> {
        let loan = self.ledger.create_loan(book_id, member_id).await?;

        if let Err(e) = self.jobs.enqueue(Job::NotifyLoanCreated { loan_id: loan.id }).await {
            tracing::error!(loan_id = loan.id, error = %e, "Failed to queue loan confirmation");
        }

        Ok(loan)
    }

    /// Worker executing the jobs queued by these services
    pub fn job_worker(&self, config: &JobsConfig) -> JobWorker {
        JobWorker::new(
            self.jobs.clone(),
            self.notifications.clone(),
            self.sweeper.clone(),
            config,
        )
    }
}
