//! DuckDB-backed ledger store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duckdb::{Connection, params};
use expensease_core::{Expense, TemplateDocument, TemplateRef};
use tracing::{debug, info};

use crate::{LedgerStore, StoreError, WriteBatch, WriteOp};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS recurring_expenses (
    group_path  VARCHAR NOT NULL,
    id          VARCHAR NOT NULL,
    next_due_ms BIGINT,
    data        VARCHAR NOT NULL,
    PRIMARY KEY (group_path, id)
);
CREATE TABLE IF NOT EXISTS expenses (
    group_id VARCHAR NOT NULL,
    id       VARCHAR NOT NULL,
    data     VARCHAR NOT NULL,
    PRIMARY KEY (group_id, id)
);
";

/// DuckDB store holding template and expense documents as JSON.
///
/// `recurring_expenses.next_due_ms` mirrors the document's `nextDueDate` so
/// the due query is a plain range scan. A batch commit runs in a single
/// DuckDB transaction.
///
/// Supports both in-memory (ephemeral) and persistent (file-backed) modes.
pub struct DuckStore {
    conn: Mutex<Connection>,
}

impl DuckStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let store = Self::init(Connection::open(path)?)?;
        info!(path = %path.display(), "opened ledger database");
        Ok(store)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Other("ledger connection lock poisoned".into()))
    }

    /// Number of rows in the `recurring_expenses` table.
    pub fn template_count(&self) -> Result<usize, StoreError> {
        self.count_table("recurring_expenses")
    }

    /// Number of rows in the `expenses` table.
    pub fn expense_count(&self) -> Result<usize, StoreError> {
        self.count_table("expenses")
    }

    fn count_table(&self, table: &str) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let sql = format!("SELECT count(*)::BIGINT FROM {table}");
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn apply(conn: &Connection, op: WriteOp) -> Result<(), StoreError> {
    match op {
        WriteOp::CreateExpense {
            group_id,
            expense_id,
            expense,
        } => {
            let existing: i64 = conn.query_row(
                "SELECT count(*)::BIGINT FROM expenses WHERE group_id = ? AND id = ?",
                params![group_id, expense_id],
                |row| row.get(0),
            )?;
            if existing > 0 {
                return Err(StoreError::AlreadyExists {
                    group_id,
                    expense_id,
                });
            }
            conn.execute(
                "INSERT INTO expenses (group_id, id, data) VALUES (?, ?, ?)",
                params![group_id, expense_id, serde_json::to_string(&expense)?],
            )?;
        }
        WriteOp::AdvanceDueDate {
            template,
            expected,
            next,
        } => {
            let stored: Option<(Option<i64>, String)> = {
                let mut stmt = conn.prepare(
                    "SELECT next_due_ms, data FROM recurring_expenses WHERE group_path = ? AND id = ?",
                )?;
                let mut rows = stmt.query(params![template.group_path, template.id])?;
                match rows.next()? {
                    Some(row) => Some((row.get(0)?, row.get(1)?)),
                    None => None,
                }
            };
            let Some((current_ms, data)) = stored else {
                return Err(StoreError::Precondition {
                    template,
                    detail: "template no longer exists".into(),
                });
            };
            if current_ms != Some(expected.timestamp_millis()) {
                return Err(StoreError::Precondition {
                    template,
                    detail: format!("nextDueDate is {current_ms:?} ms, expected {expected}"),
                });
            }

            let mut doc = TemplateDocument {
                group_path: template.group_path.clone(),
                id: template.id.clone(),
                data: serde_json::from_str(&data)?,
            };
            doc.set_next_due_date(next);
            conn.execute(
                "UPDATE recurring_expenses SET next_due_ms = ?, data = ? WHERE group_path = ? AND id = ?",
                params![
                    next.timestamp_millis(),
                    serde_json::to_string(&doc.data)?,
                    template.group_path,
                    template.id
                ],
            )?;
        }
    }
    Ok(())
}

#[async_trait]
impl LedgerStore for DuckStore {
    async fn due_templates(&self, now: DateTime<Utc>) -> Result<Vec<TemplateDocument>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT group_path, id, data FROM recurring_expenses
             WHERE next_due_ms <= ?
             ORDER BY group_path, id",
        )?;
        let rows = stmt.query_map(params![now.timestamp_millis()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut docs = Vec::new();
        for row in rows {
            let (group_path, id, data) = row?;
            docs.push(TemplateDocument {
                group_path,
                id,
                data: serde_json::from_str(&data)?,
            });
        }
        debug!(count = docs.len(), "due templates loaded");
        Ok(docs)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let count = batch.len();
        let tx = conn.transaction()?;
        for op in batch.into_ops() {
            // An early return drops `tx`, which rolls back.
            apply(&tx, op)?;
        }
        tx.commit()?;
        debug!(count, "duckdb batch committed");
        Ok(())
    }

    async fn put_template(&self, template: TemplateDocument) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let next_due_ms = template.next_due_date().map(|d| d.timestamp_millis());
        conn.execute(
            "INSERT OR REPLACE INTO recurring_expenses (group_path, id, next_due_ms, data)
             VALUES (?, ?, ?, ?)",
            params![
                template.group_path,
                template.id,
                next_due_ms,
                serde_json::to_string(&template.data)?
            ],
        )?;
        Ok(())
    }

    async fn template(
        &self,
        reference: &TemplateRef,
    ) -> Result<Option<TemplateDocument>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT data FROM recurring_expenses WHERE group_path = ? AND id = ?")?;
        let mut rows = stmt.query(params![reference.group_path, reference.id])?;
        match rows.next()? {
            Some(row) => {
                let data: String = row.get(0)?;
                Ok(Some(TemplateDocument {
                    group_path: reference.group_path.clone(),
                    id: reference.id.clone(),
                    data: serde_json::from_str(&data)?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn expenses(&self, group_id: &str) -> Result<Vec<(String, Expense)>, StoreError> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT id, data FROM expenses WHERE group_id = ? ORDER BY id")?;
        let rows = stmt.query_map(params![group_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut expenses = Vec::new();
        for row in rows {
            let (id, data) = row?;
            expenses.push((id, serde_json::from_str(&data)?));
        }
        Ok(expenses)
    }
}
