//! Overdue loan reminder sweep

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    repository::LedgerStore,
    services::{
        clock::Clock,
        email::{overdue_days, MailTransport, OutgoingMail},
    },
};

/// Outcome of one sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SweepReport {
    pub sent_count: usize,
    pub total_count: usize,
    pub status: String,
}

impl SweepReport {
    pub fn failed_count(&self) -> usize {
        self.total_count - self.sent_count
    }
}

#[derive(Clone)]
pub struct OverdueSweeper {
    store: Arc<dyn LedgerStore>,
    mailer: Arc<dyn MailTransport>,
    clock: Arc<dyn Clock>,
}

impl OverdueSweeper {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        mailer: Arc<dyn MailTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { store, mailer, clock }
    }

    /// Send one reminder per overdue loan.
    ///
    /// A failed send is logged and skipped; it only lowers `sent_count`.
    /// Running twice before a due date moves sends the reminder twice.
    pub async fn sweep_overdue(&self) -> AppResult<SweepReport> {
        let today = self.clock.today();
        let overdue = self.store.overdue_loans(today).await?;

        if overdue.is_empty() {
            tracing::info!(%today, "No overdue loans");
            return Ok(SweepReport {
                sent_count: 0,
                total_count: 0,
                status: format!("No overdue loans as of {}", today),
            });
        }

        let mut sent_count = 0;
        for notice in &overdue {
            let days = overdue_days(notice.due_date, today);
            let mail = OutgoingMail::overdue_reminder(notice, days);

            match self.mailer.send(&mail).await {
                Ok(()) => sent_count += 1,
                Err(e) => {
                    tracing::warn!(
                        loan_id = notice.loan_id,
                        recipient = %notice.email,
                        error = %e,
                        "Failed to send overdue reminder"
                    );
                }
            }
        }

        let report = SweepReport {
            sent_count,
            total_count: overdue.len(),
            status: format!("Sent {} emails for {} loans", sent_count, overdue.len()),
        };
        tracing::info!(
            sent = report.sent_count,
            total = report.total_count,
            "Overdue sweep finished"
        );
        Ok(report)
    }
}
