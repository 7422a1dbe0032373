//! Writes staged by one job invocation.

use chrono::{DateTime, Utc};
use expensease_core::{Expense, TemplateRef};

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create `groups/{group_id}/expenses/{expense_id}`.
    CreateExpense {
        group_id: String,
        expense_id: String,
        expense: Expense,
    },
    /// Move a template's `nextDueDate` from `expected` to `next`.
    ///
    /// Fails the whole batch if the stored value is no longer `expected`.
    AdvanceDueDate {
        template: TemplateRef,
        expected: DateTime<Utc>,
        next: DateTime<Utc>,
    },
}

/// An ordered set of writes committed atomically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_expense(
        &mut self,
        group_id: impl Into<String>,
        expense_id: impl Into<String>,
        expense: Expense,
    ) {
        self.ops.push(WriteOp::CreateExpense {
            group_id: group_id.into(),
            expense_id: expense_id.into(),
            expense,
        });
    }

    pub fn advance_due_date(
        &mut self,
        template: TemplateRef,
        expected: DateTime<Utc>,
        next: DateTime<Utc>,
    ) {
        self.ops.push(WriteOp::AdvanceDueDate {
            template,
            expected,
            next,
        });
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of staged expense creations.
    pub fn expense_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, WriteOp::CreateExpense { .. }))
            .count()
    }
}
