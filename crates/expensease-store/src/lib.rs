//! Storage layer: the ledger seen by the recurring-expense job.
//!
//! [`MemoryStore`] keeps everything in process; [`DuckStore`] (feature
//! `duckdb`) persists template and expense documents in DuckDB.

mod batch;
mod error;
mod ledger;
mod memory;

pub use batch::{WriteBatch, WriteOp};
pub use error::StoreError;
pub use ledger::LedgerStore;
pub use memory::MemoryStore;

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::DuckStore;
