//! Per-template and per-reminder results of one run.

use chrono::{DateTime, Utc};
use tracing::info;

/// What happened to one due template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateOutcome {
    /// Expense and due-date advance were staged for commit.
    Materialized {
        template_id: String,
        group_id: String,
        expense_id: String,
        next_due: DateTime<Utc>,
    },
    /// A required field was missing or empty.
    Skipped {
        template_id: String,
        reason: String,
    },
    /// The document could not be read as a template.
    Failed {
        template_id: String,
        error: String,
    },
}

impl TemplateOutcome {
    pub fn template_id(&self) -> &str {
        match self {
            Self::Materialized { template_id, .. }
            | Self::Skipped { template_id, .. }
            | Self::Failed { template_id, .. } => template_id,
        }
    }
}

/// Result of one reminder send. `result` holds the provider message id or the error text.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderOutcome {
    pub template_id: String,
    pub to: String,
    pub result: Result<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// Number of templates returned by the due query.
    pub due: usize,
    pub outcomes: Vec<TemplateOutcome>,
    /// `false` when the batch commit failed and every staged write was lost.
    pub committed: bool,
    pub commit_error: Option<String>,
    /// Reminder results in completion order.
    pub reminders: Vec<ReminderOutcome>,
}

impl RunReport {
    pub(crate) fn empty() -> Self {
        Self {
            committed: true,
            ..Self::default()
        }
    }

    pub fn materialized(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, TemplateOutcome::Materialized { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, TemplateOutcome::Skipped { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, TemplateOutcome::Failed { .. }))
            .count()
    }

    /// Expenses that actually reached the store.
    pub fn expenses_created(&self) -> usize {
        if self.committed { self.materialized() } else { 0 }
    }

    pub fn reminders_failed(&self) -> usize {
        self.reminders.iter().filter(|r| r.result.is_err()).count()
    }

    pub(crate) fn log_summary(&self) {
        info!(
            due = self.due,
            created = self.expenses_created(),
            skipped = self.skipped(),
            failed = self.failed(),
            committed = self.committed,
            reminders = self.reminders.len(),
            reminders_failed = self.reminders_failed(),
            "recurring expense run finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn materialized(id: &str) -> TemplateOutcome {
        TemplateOutcome::Materialized {
            template_id: id.into(),
            group_id: "g".into(),
            expense_id: format!("e-{id}"),
            next_due: Utc::now(),
        }
    }

    #[test]
    fn counts_by_outcome() {
        let report = RunReport {
            due: 4,
            outcomes: vec![
                materialized("a"),
                materialized("b"),
                TemplateOutcome::Skipped {
                    template_id: "c".into(),
                    reason: "missing essential field `split`".into(),
                },
                TemplateOutcome::Failed {
                    template_id: "d".into(),
                    error: "bad shape".into(),
                },
            ],
            committed: true,
            commit_error: None,
            reminders: vec![ReminderOutcome {
                template_id: "a".into(),
                to: "whatsapp:+1".into(),
                result: Err("boom".into()),
            }],
        };
        assert_eq!(report.materialized(), 2);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.expenses_created(), 2);
        assert_eq!(report.reminders_failed(), 1);
        assert_eq!(report.outcomes[3].template_id(), "d");
    }

    #[test]
    fn nothing_created_without_commit() {
        let report = RunReport {
            due: 1,
            outcomes: vec![materialized("a")],
            committed: false,
            commit_error: Some("unavailable".into()),
            reminders: vec![],
        };
        assert_eq!(report.materialized(), 1);
        assert_eq!(report.expenses_created(), 0);
    }

    #[test]
    fn empty_report_counts_as_committed() {
        let report = RunReport::empty();
        assert!(report.committed);
        assert_eq!(report.due, 0);
    }
}
