//! Result Report - per-subject ledgers as one Arrow table
//!
//! A dataset's results directory holds one `result_subNN.json` ledger per
//! subject. [`collect_dataset`] reads all of them into a single
//! [`RecordBatch`] (one row per record, plus the subject id), which can be
//! written to Parquet for analysis or reduced to per-model means.
//!
//! Reports are read-only over the ledgers; nothing here writes to them.

use crate::data::SubjectId;
use crate::ledger::{JsonlLedger, Ledger, ResultRecord};
use crate::{Error, Result};
use arrow::array::{Array, Float64Array, StringArray, UInt32Array, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

/// Schema of a collected report.
#[must_use]
pub fn report_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("subject", DataType::UInt32, false),
        Field::new("index", DataType::UInt64, false),
        Field::new("model_name", DataType::Utf8, false),
        Field::new("score", DataType::Float64, false),
        Field::new("train_time", DataType::Float64, false),
        Field::new("test_time", DataType::Float64, false),
        Field::new("target_domain", DataType::Utf8, false),
        Field::new("fs", DataType::Float64, false),
    ]))
}

/// Subject id encoded in a ledger file name (`result_sub07.json` -> 7).
#[must_use]
pub fn subject_from_file_name(name: &str) -> Option<SubjectId> {
    name.strip_prefix("result_sub")?
        .strip_suffix(".json")?
        .parse()
        .ok()
        .map(SubjectId)
}

/// Build a report batch from `(subject, record)` rows.
///
/// # Errors
///
/// Arrow errors from batch construction.
pub fn records_to_batch(rows: &[(SubjectId, ResultRecord)]) -> Result<RecordBatch> {
    let subject = UInt32Array::from_iter_values(rows.iter().map(|(s, _)| s.0));
    let index = UInt64Array::from_iter_values(rows.iter().map(|(_, r)| r.index() as u64));
    let model_name = StringArray::from_iter_values(rows.iter().map(|(_, r)| r.model_name()));
    let score = Float64Array::from_iter_values(rows.iter().map(|(_, r)| r.score()));
    let train_time = Float64Array::from_iter_values(rows.iter().map(|(_, r)| r.train_time()));
    let test_time = Float64Array::from_iter_values(rows.iter().map(|(_, r)| r.test_time()));
    let target_domain =
        StringArray::from_iter_values(rows.iter().map(|(_, r)| r.target_domain().to_string()));
    let fs = Float64Array::from_iter_values(rows.iter().map(|(_, r)| r.fs()));

    Ok(RecordBatch::try_new(
        report_schema(),
        vec![
            Arc::new(subject),
            Arc::new(index),
            Arc::new(model_name),
            Arc::new(score),
            Arc::new(train_time),
            Arc::new(test_time),
            Arc::new(target_domain),
            Arc::new(fs),
        ],
    )?)
}

/// Collect every subject ledger in `dir`, ordered by subject id and then by
/// ledger order.
///
/// Files that are not subject ledgers are ignored. A missing directory
/// yields an empty batch.
///
/// # Errors
///
/// Ledger read errors ([`Error::LedgerIo`], [`Error::LedgerCorrupt`]) or
/// Arrow errors.
pub fn collect_dataset(dir: impl AsRef<Path>) -> Result<RecordBatch> {
    let dir = dir.as_ref();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return records_to_batch(&[]),
        Err(source) => {
            return Err(Error::LedgerIo {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut ledgers = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| Error::LedgerIo {
            path: dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name();
        if let Some(subject) = name.to_str().and_then(subject_from_file_name) {
            ledgers.push((subject, JsonlLedger::new(entry.path())));
        }
    }
    ledgers.sort_by_key(|(subject, _)| *subject);

    let mut rows = Vec::new();
    for (subject, ledger) in &ledgers {
        rows.extend(ledger.records()?.into_iter().map(|r| (*subject, r)));
    }
    records_to_batch(&rows)
}

/// Write `batch` to a Parquet file at `path`.
///
/// # Errors
///
/// I/O or Parquet errors.
pub fn write_parquet(batch: &RecordBatch, path: impl AsRef<Path>) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

/// Read every record batch of a Parquet file.
///
/// # Errors
///
/// I/O, Parquet or Arrow errors.
pub fn read_parquet(path: impl AsRef<Path>) -> Result<Vec<RecordBatch>> {
    let file = File::open(path.as_ref())?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    Ok(reader.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Mean score of one model across subjects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    /// Catalog position.
    pub index: usize,
    /// Model display name.
    pub model_name: String,
    /// Number of records averaged.
    pub count: usize,
    /// Mean score.
    pub mean_score: f64,
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| {
            Error::Arrow(ArrowError::SchemaError(format!(
                "report column {name:?} missing or mistyped"
            )))
        })
}

/// Per-model mean score, in catalog order.
///
/// # Errors
///
/// Returns [`Error::Arrow`] if `batch` does not have the report schema.
pub fn mean_scores(batch: &RecordBatch) -> Result<Vec<ModelSummary>> {
    let index = column::<UInt64Array>(batch, "index")?;
    let names = column::<StringArray>(batch, "model_name")?;
    let scores = column::<Float64Array>(batch, "score")?;

    let mut position: FxHashMap<&str, usize> = FxHashMap::default();
    let mut sums: Vec<(usize, String, usize, f64)> = Vec::new();
    for row in 0..batch.num_rows() {
        let name = names.value(row);
        let slot = *position.entry(name).or_insert_with(|| {
            #[allow(clippy::cast_possible_truncation)]
            let catalog_index = index.value(row) as usize;
            sums.push((catalog_index, name.to_string(), 0, 0.0));
            sums.len() - 1
        });
        sums[slot].2 += 1;
        sums[slot].3 += scores.value(row);
    }

    let mut summaries: Vec<ModelSummary> = sums
        .into_iter()
        .map(|(index, model_name, count, total)| {
            #[allow(clippy::cast_precision_loss)]
            let mean_score = total / count as f64;
            ModelSummary {
                index,
                model_name,
                count,
                mean_score,
            }
        })
        .collect();
    summaries.sort_by_key(|s| s.index);
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DomainId;
    use tempfile::TempDir;

    fn record(index: usize, name: &str, score: f64) -> ResultRecord {
        ResultRecord::new(index, name, score, 1.0, 0.1, DomainId::from_position(1), 128.0)
    }

    #[test]
    fn test_subject_from_file_name() {
        assert_eq!(subject_from_file_name("result_sub07.json"), Some(SubjectId(7)));
        assert_eq!(subject_from_file_name("result_sub12.json"), Some(SubjectId(12)));
        assert_eq!(subject_from_file_name("summary.json"), None);
        assert_eq!(subject_from_file_name("result_subXX.json"), None);
    }

    #[test]
    fn test_records_to_batch_schema() {
        let rows = vec![(SubjectId(1), record(0, "EA-CSP", 0.8))];
        let batch = records_to_batch(&rows).unwrap();
        assert_eq!(batch.num_rows(), 1);
        assert_eq!(batch.schema(), report_schema());

        let domain = column::<StringArray>(&batch, "target_domain").unwrap();
        assert_eq!(domain.value(0), "S2");
    }

    #[test]
    fn test_missing_dir_is_empty_report() {
        let dir = TempDir::new().unwrap();
        let batch = collect_dataset(dir.path().join("nope")).unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert!(mean_scores(&batch).unwrap().is_empty());
    }

    #[test]
    fn test_mean_scores_in_catalog_order() {
        let rows = vec![
            (SubjectId(1), record(2, "TSM", 0.6)),
            (SubjectId(1), record(0, "EA-CSP", 0.8)),
            (SubjectId(2), record(0, "EA-CSP", 0.6)),
        ];
        let batch = records_to_batch(&rows).unwrap();
        let summaries = mean_scores(&batch).unwrap();

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].model_name, "EA-CSP");
        assert_eq!(summaries[0].count, 2);
        assert!((summaries[0].mean_score - 0.7).abs() < 1e-12);
        assert_eq!(summaries[1].model_name, "TSM");
    }

    #[test]
    fn test_mean_scores_rejects_foreign_schema() {
        let schema = Arc::new(Schema::new(vec![Field::new("id", DataType::UInt32, false)]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(UInt32Array::from_iter_values([1, 2]))],
        )
        .unwrap();
        assert!(matches!(mean_scores(&batch), Err(Error::Arrow(_))));
    }
}
