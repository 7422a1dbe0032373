//! The recurring-expense job.
//!
//! One run is a single linear pass over the due templates:
//!
//! 1. Query every template whose `nextDueDate` is at or before `now`.
//! 2. Decode and validate each one; bad templates are logged and skipped
//!    without blocking the rest.
//! 3. Stage an expense and a due-date advance per valid template.
//! 4. Spawn a WhatsApp reminder per template that asks for one.
//! 5. Commit all staged writes as one atomic batch.
//! 6. Wait for every reminder to settle.
//!
//! A failed commit loses the whole batch; the templates stay due and the
//! next run picks them up again. Reminder failures never touch the store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use expensease_core::{
    Expense, RecurringTemplate, TemplateDocument, TemplateFields, advance_due_date,
    reminder_message, whatsapp_address,
};
use expensease_notify::Notifier;
use expensease_store::{LedgerStore, StoreError, WriteBatch};
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{DailySchedule, ReminderOutcome, RunReport, TemplateOutcome};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to query due templates: {0}")]
    Query(#[source] StoreError),
}

/// Materializes due recurring-expense templates into group expenses.
///
/// Collaborators are injected; a `None` notifier disables reminders.
pub struct Materializer {
    store: Arc<dyn LedgerStore>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl Materializer {
    pub fn new(store: Arc<dyn LedgerStore>, notifier: Option<Arc<dyn Notifier>>) -> Self {
        if notifier.is_none() {
            warn!("no messaging provider configured, WhatsApp reminders are disabled");
        }
        Self { store, notifier }
    }

    /// Run the job once as of `now`.
    ///
    /// Only a failed due query is an error. Everything else, including a
    /// failed commit, is recorded in the returned [`RunReport`].
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunReport, RunError> {
        info!(now = %now.to_rfc3339(), "running recurring expense job");

        let due = match self.store.due_templates(now).await {
            Ok(due) => due,
            Err(e) => {
                error!(error = %e, "error querying recurring expenses");
                return Err(RunError::Query(e));
            }
        };
        info!(count = due.len(), "recurring expense templates due");
        if due.is_empty() {
            info!("no recurring expenses due");
            return Ok(RunReport::empty());
        }

        let mut batch = WriteBatch::new();
        let mut reminders = JoinSet::new();
        let outcomes: Vec<TemplateOutcome> = due
            .iter()
            .map(|doc| self.process(doc, now, &mut batch, &mut reminders))
            .collect();

        let commit_error = if batch.is_empty() {
            None
        } else {
            let staged = batch.expense_count();
            match self.store.commit(batch).await {
                Ok(()) => {
                    info!(expenses = staged, "committed recurring expense batch");
                    None
                }
                Err(e) => {
                    error!(error = %e, expenses = staged, "error committing batch, templates remain due");
                    Some(e.to_string())
                }
            }
        };

        let mut reminder_outcomes = Vec::with_capacity(reminders.len());
        while let Some(joined) = reminders.join_next().await {
            match joined {
                Ok(outcome) => reminder_outcomes.push(outcome),
                Err(e) => error!(error = %e, "reminder task did not complete"),
            }
        }
        if !reminder_outcomes.is_empty() {
            info!(
                count = reminder_outcomes.len(),
                "completed WhatsApp reminder attempts"
            );
        }

        let report = RunReport {
            due: due.len(),
            outcomes,
            committed: commit_error.is_none(),
            commit_error,
            reminders: reminder_outcomes,
        };
        report.log_summary();
        Ok(report)
    }

    fn process(
        &self,
        doc: &TemplateDocument,
        now: DateTime<Utc>,
        batch: &mut WriteBatch,
        reminders: &mut JoinSet<ReminderOutcome>,
    ) -> TemplateOutcome {
        let fields = match TemplateFields::decode(doc) {
            Ok(fields) => fields,
            Err(e) => {
                error!(template_id = %doc.id, error = %e, "error processing template");
                return TemplateOutcome::Failed {
                    template_id: doc.id.clone(),
                    error: e.to_string(),
                };
            }
        };

        let group_hint = fields
            .group_id
            .clone()
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| "UNKNOWN".to_string());
        let template = match fields.validate(&doc.id) {
            Ok(template) => template,
            Err(e) => {
                error!(
                    template_id = %doc.id,
                    group_id = %group_hint,
                    missing = e.field,
                    "skipping invalid template"
                );
                return TemplateOutcome::Skipped {
                    template_id: doc.id.clone(),
                    reason: e.to_string(),
                };
            }
        };
        info!(template_id = %template.id, group_id = %template.group_id, "processing template");

        let expense_id = Uuid::new_v4().simple().to_string();
        batch.create_expense(
            template.group_id.clone(),
            expense_id.clone(),
            Expense::from_template(&template, now),
        );
        info!(expense_id = %expense_id, "staged new expense");

        let next_due = advance_due_date(template.next_due_date, &template.frequency);
        batch.advance_due_date(doc.reference(), template.next_due_date, next_due);
        info!(next_due = %next_due.to_rfc3339(), "staged next due date");

        self.queue_reminder(&template, reminders);

        TemplateOutcome::Materialized {
            template_id: template.id,
            group_id: template.group_id,
            expense_id,
            next_due,
        }
    }

    fn queue_reminder(
        &self,
        template: &RecurringTemplate,
        reminders: &mut JoinSet<ReminderOutcome>,
    ) {
        let Some(number) = template.whatsapp_number.as_deref() else {
            return;
        };
        let Some(notifier) = self.notifier.clone() else {
            warn!(
                template_id = %template.id,
                "cannot send WhatsApp reminder, messaging provider not configured"
            );
            return;
        };

        let to = whatsapp_address(number);
        let body = reminder_message(&template.description, template.total_amount);
        let template_id = template.id.clone();
        info!(to = %to, "queueing WhatsApp reminder");

        reminders.spawn(async move {
            let result = match notifier.send_whatsapp(&to, &body).await {
                Ok(receipt) => {
                    info!(to = %to, sid = %receipt.sid, "WhatsApp reminder sent");
                    Ok(receipt.sid)
                }
                Err(e) => {
                    error!(to = %to, error = %e, "failed to send WhatsApp reminder");
                    Err(e.to_string())
                }
            };
            ReminderOutcome {
                template_id,
                to,
                result,
            }
        });
    }

    /// Run once a day according to `schedule` until `shutdown` resolves.
    ///
    /// Runs are strictly sequential, so one process never overlaps itself.
    pub async fn serve<F>(&self, schedule: DailySchedule, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            let now = Utc::now();
            let next = schedule.next_after(now);
            let wait = (next - now).to_std().unwrap_or_default();
            info!(next_run = %next.to_rfc3339(), "waiting for next scheduled run");

            tokio::select! {
                _ = &mut shutdown => {
                    info!("scheduler shutting down");
                    return;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            // Errors are already logged inside `run`.
            let _ = self.run(Utc::now()).await;
        }
    }
}
