//! In-memory ledger.
//!
//! Data is lost on process restart. Use [`super::JsonlLedger`] for sweeps.

use super::{Ledger, ResultRecord};
use crate::Result;

/// Vector-backed ledger for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    records: Vec<ResultRecord>,
}

impl MemoryLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger pre-populated with `records` (simulates a resumed run).
    #[must_use]
    pub fn with_records(records: Vec<ResultRecord>) -> Self {
        Self { records }
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the ledger is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Ledger for MemoryLedger {
    fn records(&self) -> Result<Vec<ResultRecord>> {
        Ok(self.records.clone())
    }

    fn append(&mut self, record: &ResultRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn exists(&self, model_name: &str) -> Result<bool> {
        Ok(self.records.iter().any(|r| r.model_name() == model_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DomainId;

    fn record(name: &str) -> ResultRecord {
        ResultRecord::new(0, name, 0.5, 0.0, 0.0, DomainId::from_position(1), 128.0)
    }

    #[test]
    fn test_memory_ledger_append_and_exists() {
        let mut ledger = MemoryLedger::new();
        assert!(ledger.is_empty());
        assert!(!ledger.exists("A").unwrap());

        ledger.append(&record("A")).unwrap();
        assert_eq!(ledger.len(), 1);
        assert!(ledger.exists("A").unwrap());
        assert!(!ledger.exists("B").unwrap());
    }

    #[test]
    fn test_memory_ledger_preserves_order() {
        let mut ledger = MemoryLedger::with_records(vec![record("A")]);
        ledger.append(&record("C")).unwrap();
        let names: Vec<String> = ledger
            .records()
            .unwrap()
            .iter()
            .map(|r| r.model_name().to_string())
            .collect();
        assert_eq!(names, vec!["A", "C"]);
        assert_eq!(ledger.completed_names().unwrap().len(), 2);
    }
}
