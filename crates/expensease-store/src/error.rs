use expensease_core::TemplateRef;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("precondition failed for {template}: {detail}")]
    Precondition { template: TemplateRef, detail: String },

    #[error("expense {group_id}/{expense_id} already exists")]
    AlreadyExists { group_id: String, expense_id: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] ::duckdb::Error),

    #[error("{0}")]
    Other(String),
}
