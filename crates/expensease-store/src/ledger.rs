use async_trait::async_trait;
use chrono::{DateTime, Utc};
use expensease_core::{Expense, TemplateDocument, TemplateRef};

use crate::{StoreError, WriteBatch};

/// The document store shared with the mobile client.
///
/// Templates live at `groups/{group}/recurringExpenses/{id}` and expenses at
/// `groups/{group}/expenses/{id}`.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Every template, across all groups, whose `nextDueDate` is at or before `now`.
    ///
    /// Documents without a readable `nextDueDate` are never returned.
    async fn due_templates(&self, now: DateTime<Utc>) -> Result<Vec<TemplateDocument>, StoreError>;

    /// Apply every write in `batch`, or none of them.
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;

    /// Create or replace a template document.
    async fn put_template(&self, template: TemplateDocument) -> Result<(), StoreError>;

    async fn template(&self, reference: &TemplateRef)
    -> Result<Option<TemplateDocument>, StoreError>;

    /// Expenses of one group keyed by expense id, in id order.
    async fn expenses(&self, group_id: &str) -> Result<Vec<(String, Expense)>, StoreError>;
}
