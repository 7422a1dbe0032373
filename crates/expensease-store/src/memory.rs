//! In-process ledger store.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use expensease_core::{Expense, TemplateDocument, TemplateRef};
use tokio::sync::RwLock;
use tracing::debug;

use crate::{LedgerStore, StoreError, WriteBatch, WriteOp};

#[derive(Debug, Default)]
struct Ledger {
    templates: BTreeMap<TemplateRef, TemplateDocument>,
    /// group id -> expense id -> expense
    expenses: BTreeMap<String, BTreeMap<String, Expense>>,
}

/// Ledger held entirely in memory.
///
/// Used when no database path is configured and as the test double for the
/// job. [`fail_next_query`](Self::fail_next_query) and
/// [`fail_next_commit`](Self::fail_next_commit) inject one-shot failures.
#[derive(Debug, Default)]
pub struct MemoryStore {
    ledger: RwLock<Ledger>,
    fail_next_query: AtomicBool,
    fail_next_commit: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next [`due_templates`](LedgerStore::due_templates) call fail.
    pub fn fail_next_query(&self) {
        self.fail_next_query.store(true, Ordering::SeqCst);
    }

    /// Make the next [`commit`](LedgerStore::commit) call fail without writing.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Total number of expenses across all groups.
    pub async fn expense_count(&self) -> usize {
        let ledger = self.ledger.read().await;
        ledger.expenses.values().map(BTreeMap::len).sum()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn due_templates(&self, now: DateTime<Utc>) -> Result<Vec<TemplateDocument>, StoreError> {
        if self.fail_next_query.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected query failure".into()));
        }
        let ledger = self.ledger.read().await;
        Ok(ledger
            .templates
            .values()
            .filter(|doc| doc.next_due_date().is_some_and(|due| due <= now))
            .cloned()
            .collect())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected commit failure".into()));
        }
        let mut ledger = self.ledger.write().await;

        // Check every precondition before touching anything.
        let mut staged_due: BTreeMap<&TemplateRef, DateTime<Utc>> = BTreeMap::new();
        let mut staged_expenses: BTreeSet<(&str, &str)> = BTreeSet::new();
        for op in batch.ops() {
            match op {
                WriteOp::CreateExpense {
                    group_id,
                    expense_id,
                    ..
                } => {
                    let exists = ledger
                        .expenses
                        .get(group_id)
                        .is_some_and(|g| g.contains_key(expense_id));
                    let staged_twice =
                        !staged_expenses.insert((group_id.as_str(), expense_id.as_str()));
                    if exists || staged_twice {
                        return Err(StoreError::AlreadyExists {
                            group_id: group_id.clone(),
                            expense_id: expense_id.clone(),
                        });
                    }
                }
                WriteOp::AdvanceDueDate {
                    template,
                    expected,
                    next,
                } => {
                    let current = match staged_due.get(template) {
                        Some(due) => Some(*due),
                        None => ledger
                            .templates
                            .get(template)
                            .ok_or_else(|| StoreError::Precondition {
                                template: template.clone(),
                                detail: "template no longer exists".into(),
                            })?
                            .next_due_date(),
                    };
                    if current != Some(*expected) {
                        return Err(StoreError::Precondition {
                            template: template.clone(),
                            detail: format!("nextDueDate is {current:?}, expected {expected}"),
                        });
                    }
                    staged_due.insert(template, *next);
                }
            }
        }

        let count = batch.len();
        for op in batch.into_ops() {
            match op {
                WriteOp::CreateExpense {
                    group_id,
                    expense_id,
                    expense,
                } => {
                    ledger
                        .expenses
                        .entry(group_id)
                        .or_default()
                        .insert(expense_id, expense);
                }
                WriteOp::AdvanceDueDate { template, next, .. } => {
                    if let Some(doc) = ledger.templates.get_mut(&template) {
                        doc.set_next_due_date(next);
                    }
                }
            }
        }
        debug!(count, "memory batch committed");
        Ok(())
    }

    async fn put_template(&self, template: TemplateDocument) -> Result<(), StoreError> {
        let mut ledger = self.ledger.write().await;
        ledger.templates.insert(template.reference(), template);
        Ok(())
    }

    async fn template(
        &self,
        reference: &TemplateRef,
    ) -> Result<Option<TemplateDocument>, StoreError> {
        let ledger = self.ledger.read().await;
        Ok(ledger.templates.get(reference).cloned())
    }

    async fn expenses(&self, group_id: &str) -> Result<Vec<(String, Expense)>, StoreError> {
        let ledger = self.ledger.read().await;
        Ok(ledger
            .expenses
            .get(group_id)
            .map(|g| g.iter().map(|(id, e)| (id.clone(), e.clone())).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn template(group: &str, id: &str, due: &str) -> TemplateDocument {
        TemplateDocument {
            group_path: group.into(),
            id: id.into(),
            data: json!({ "groupId": group, "nextDueDate": due }),
        }
    }

    fn expense(source: &str) -> Expense {
        Expense {
            description: "Rent".into(),
            total_amount: 100.0,
            paid_by_id: "alice".into(),
            split_between: BTreeMap::from([("alice".into(), 100.0)]),
            date: at(2024, 1, 15),
            category: "Bill".into(),
            created_at: at(2024, 1, 15),
            notes: None,
            receipt_url: None,
            recurring_source_id: source.into(),
        }
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for doc in [
            template("g1", "past", "2024-01-10T00:00:00Z"),
            template("g1", "exact", "2024-01-15T00:00:00Z"),
            template("g2", "future", "2024-02-01T00:00:00Z"),
            template("g2", "undated", "not a date"),
        ] {
            store.put_template(doc).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn due_query_includes_boundary_and_skips_undated() {
        let store = seeded().await;
        let due = store.due_templates(at(2024, 1, 15)).await.unwrap();
        let ids: Vec<_> = due.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "past"]);
    }

    #[tokio::test]
    async fn commit_applies_all_writes() {
        let store = seeded().await;
        let mut batch = WriteBatch::new();
        batch.create_expense("g1", "e1", expense("past"));
        batch.advance_due_date(TemplateRef::new("g1", "past"), at(2024, 1, 10), at(2024, 2, 10));
        store.commit(batch).await.unwrap();

        assert_eq!(store.expenses("g1").await.unwrap().len(), 1);
        let doc = store
            .template(&TemplateRef::new("g1", "past"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.next_due_date(), Some(at(2024, 2, 10)));
    }

    #[tokio::test]
    async fn stale_precondition_rejects_whole_batch() {
        let store = seeded().await;
        let mut batch = WriteBatch::new();
        batch.create_expense("g1", "e1", expense("past"));
        batch.advance_due_date(TemplateRef::new("g1", "past"), at(2024, 1, 10), at(2024, 2, 10));
        batch.create_expense("g1", "e2", expense("exact"));
        batch.advance_due_date(TemplateRef::new("g1", "exact"), at(2024, 1, 1), at(2024, 2, 1));

        let err = store.commit(batch).await.unwrap_err();
        assert!(matches!(err, StoreError::Precondition { .. }));
        assert_eq!(store.expense_count().await, 0);
        let doc = store
            .template(&TemplateRef::new("g1", "past"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.next_due_date(), Some(at(2024, 1, 10)));
    }

    #[tokio::test]
    async fn missing_template_is_a_precondition_failure() {
        let store = seeded().await;
        let mut batch = WriteBatch::new();
        batch.advance_due_date(TemplateRef::new("g9", "gone"), at(2024, 1, 10), at(2024, 2, 10));
        assert!(matches!(
            store.commit(batch).await,
            Err(StoreError::Precondition { .. })
        ));
    }

    #[tokio::test]
    async fn duplicate_expense_id_rejected() {
        let store = seeded().await;
        let mut batch = WriteBatch::new();
        batch.create_expense("g1", "e1", expense("past"));
        store.commit(batch.clone()).await.unwrap();
        assert!(matches!(
            store.commit(batch).await,
            Err(StoreError::AlreadyExists { .. })
        ));
        assert_eq!(store.expense_count().await, 1);
    }

    #[tokio::test]
    async fn duplicate_expense_id_within_one_batch_rejected() {
        let store = seeded().await;
        let mut batch = WriteBatch::new();
        batch.create_expense("g1", "e1", expense("past"));
        batch.create_expense("g1", "e1", expense("exact"));
        assert!(matches!(
            store.commit(batch).await,
            Err(StoreError::AlreadyExists { .. })
        ));
        assert_eq!(store.expense_count().await, 0);

        // Same id in different groups is fine.
        let mut batch = WriteBatch::new();
        batch.create_expense("g1", "e1", expense("past"));
        batch.create_expense("g2", "e1", expense("future"));
        store.commit(batch).await.unwrap();
        assert_eq!(store.expense_count().await, 2);
    }

    #[tokio::test]
    async fn injected_failures_fire_once() {
        let store = seeded().await;
        store.fail_next_query();
        assert!(store.due_templates(at(2024, 1, 15)).await.is_err());
        assert!(store.due_templates(at(2024, 1, 15)).await.is_ok());

        store.fail_next_commit();
        let mut batch = WriteBatch::new();
        batch.create_expense("g1", "e1", expense("past"));
        assert!(store.commit(batch.clone()).await.is_err());
        assert_eq!(store.expense_count().await, 0);
        store.commit(batch).await.unwrap();
        assert_eq!(store.expense_count().await, 1);
    }
}
