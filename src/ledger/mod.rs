//! Result Ledger - append-only record of completed evaluations
//!
//! The ledger is both the resumability checkpoint and the final output of a
//! sweep. One ledger per subject.
//!
//! **Append-Only Design**:
//! - `append` writes exactly one complete line and returns only once it is
//!   durable
//! - Existing lines are never rewritten, truncated or deleted
//! - Corrections need a new record or a reconciliation pass outside the sweep
//!
//! ## Backends
//!
//! - [`JsonlLedger`] - newline-delimited JSON file (production)
//! - [`MemoryLedger`] - in-memory fake with the same semantics (tests)
//!
//! # Example
//!
//! ```rust
//! use trueno_sweep::data::DomainId;
//! use trueno_sweep::ledger::{Ledger, MemoryLedger, ResultRecord};
//!
//! # fn main() -> trueno_sweep::Result<()> {
//! let mut ledger = MemoryLedger::new();
//! let record = ResultRecord::new(0, "EA-CSP", 0.81, 2.4, 0.1, DomainId::from_position(1), 128.0);
//!
//! ledger.append(&record)?;
//! assert!(ledger.exists("EA-CSP")?);
//! assert!(!ledger.exists("RA-CSP")?);
//! # Ok(())
//! # }
//! ```

mod file;
mod memory;
mod record;

pub use file::{subject_file_name, JsonlLedger};
pub use memory::MemoryLedger;
pub use record::ResultRecord;

use crate::Result;
use rustc_hash::FxHashSet;

/// Append-only store of result records.
///
/// Implementations re-read their backing store on every call; nothing is
/// cached between calls, so records appended by another writer are seen.
pub trait Ledger {
    /// All records in append order.
    ///
    /// # Errors
    ///
    /// [`crate::Error::LedgerIo`] / [`crate::Error::LedgerCorrupt`].
    fn records(&self) -> Result<Vec<ResultRecord>>;

    /// Append one record durably.
    ///
    /// # Errors
    ///
    /// [`crate::Error::LedgerIo`] if the record could not be persisted.
    fn append(&mut self, record: &ResultRecord) -> Result<()>;

    /// Whether a record with `model_name` exists.
    ///
    /// # Errors
    ///
    /// Same as [`Ledger::records`].
    fn exists(&self, model_name: &str) -> Result<bool> {
        Ok(self
            .records()?
            .iter()
            .any(|r| r.model_name() == model_name))
    }

    /// Names of every recorded model.
    ///
    /// # Errors
    ///
    /// Same as [`Ledger::records`].
    fn completed_names(&self) -> Result<FxHashSet<String>> {
        Ok(self
            .records()?
            .into_iter()
            .map(|r| r.model_name().to_string())
            .collect())
    }
}
