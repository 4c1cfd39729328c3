//! Resumable Execution Loop
//!
//! Runs every catalog entry against one train/test task and guarantees:
//!
//! - **At-most-once**: a model whose name is already in the ledger is skipped
//! - **Fault isolation**: a model that fails (error or panic) in resolve,
//!   `fit` or `score` is logged and the loop moves on
//! - **Durability**: each success is appended before the next model starts,
//!   so a crash after model *k* leaves exactly *k* records
//!
//! Ledger failures are the only errors that escape; they halt the loop
//! because resumability can no longer be trusted.
//!
//! ```text
//! for entry in catalog:
//!     ledger.exists(name)?  ── yes ──> Skipped
//!            │ no
//!     attempt(entry) ── Failed ──> warn!, continue
//!            │ Completed(record)
//!     ledger.append(record)?
//! ```

use crate::catalog::{Catalog, CatalogEntry, EstimatorFactory};
use crate::data::{EncodedDataset, Label, Trial};
use crate::ledger::{Ledger, ResultRecord};
use crate::split::Split;
use crate::Result;
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use tracing::{info, warn};

/// Train and test data for one split.
#[derive(Debug, Clone, Default)]
pub struct EvaluationTask {
    /// Training trials.
    pub train_trials: Vec<Trial>,
    /// Training labels.
    pub train_labels: Vec<Label>,
    /// Test trials.
    pub test_trials: Vec<Trial>,
    /// Test labels.
    pub test_labels: Vec<Label>,
}

impl EvaluationTask {
    /// Gather the train and test sides of `split` from `dataset`.
    #[must_use]
    pub fn from_split(dataset: &EncodedDataset, split: &Split) -> Self {
        let (train_trials, train_labels) = dataset.select(&split.train);
        let (test_trials, test_labels) = dataset.select(&split.test);
        Self {
            train_trials,
            train_labels,
            test_trials,
            test_labels,
        }
    }
}

/// Outcome of trying one catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt {
    /// Trained and scored; the record is ready to append.
    Completed(ResultRecord),
    /// Resolve, `fit` or `score` failed. Not retried.
    Failed {
        /// Model display name.
        name: String,
        /// Failure reason for the log.
        reason: String,
    },
}

/// Per-outcome model names of one loop run, in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionSummary {
    /// Models trained, scored and appended.
    pub completed: Vec<String>,
    /// Models already present in the ledger.
    pub skipped: Vec<String>,
    /// Models that failed, with the reason.
    pub failed: Vec<(String, String)>,
}

impl ExecutionSummary {
    /// Number of models attempted (completed + failed).
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.completed.len() + self.failed.len()
    }

    /// Fold another split's summary into this one.
    pub fn merge(&mut self, other: Self) {
        self.completed.extend(other.completed);
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Resolve, train and score one entry.
///
/// Never fails: every collaborator error or panic becomes
/// [`Attempt::Failed`]. Does not consult or touch any ledger.
pub fn attempt<F>(
    entry: &CatalogEntry,
    catalog: &Catalog,
    task: &EvaluationTask,
    factory: &F,
) -> Attempt
where
    F: EstimatorFactory + ?Sized,
{
    let run = || -> anyhow::Result<(f64, f64, f64)> {
        let mut estimator = entry.config().resolve(factory)?;

        let start = Instant::now();
        estimator.fit(&task.train_trials, &task.train_labels)?;
        let train_time = start.elapsed().as_secs_f64();

        let start = Instant::now();
        let score = estimator.score(&task.test_trials, &task.test_labels)?;
        let test_time = start.elapsed().as_secs_f64();

        anyhow::ensure!(score.is_finite(), "non-finite score {score}");
        Ok((score, train_time, test_time))
    };

    let outcome = match panic::catch_unwind(AssertUnwindSafe(run)) {
        Ok(result) => result.map_err(|e| format!("{e:#}")),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    };

    match outcome {
        Ok((score, train_time, test_time)) => Attempt::Completed(ResultRecord::new(
            entry.index(),
            entry.name(),
            score,
            train_time,
            test_time,
            catalog.target_domain(),
            catalog.sampling_rate(),
        )),
        Err(reason) => Attempt::Failed {
            name: entry.name().to_string(),
            reason,
        },
    }
}

/// Run every catalog entry not yet in `ledger`, appending each success.
///
/// The ledger is re-read before every entry, so records appended by another
/// writer between iterations are honoured (best effort, no locking).
///
/// # Errors
///
/// Only ledger failures ([`crate::Error::LedgerIo`],
/// [`crate::Error::LedgerCorrupt`]). Model failures are reported in the
/// returned summary.
pub fn run_catalog<L, F>(
    catalog: &Catalog,
    task: &EvaluationTask,
    factory: &F,
    ledger: &mut L,
) -> Result<ExecutionSummary>
where
    L: Ledger + ?Sized,
    F: EstimatorFactory + ?Sized,
{
    let mut summary = ExecutionSummary::default();

    for entry in catalog.entries() {
        if ledger.exists(entry.name())? {
            info!(model = entry.name(), "model has been trained, skipping");
            summary.skipped.push(entry.name().to_string());
            continue;
        }

        info!(
            model = entry.name(),
            family = entry.config().family().kind(),
            "training model"
        );
        match attempt(entry, catalog, task, factory) {
            Attempt::Completed(record) => {
                ledger.append(&record)?;
                info!(
                    model = record.model_name(),
                    score = record.score(),
                    train_time = format_args!("{:.2}s", record.train_time()),
                    test_time = format_args!("{:.2}s", record.test_time()),
                    "model completed"
                );
                summary.completed.push(record.model_name().to_string());
            }
            Attempt::Failed { name, reason } => {
                warn!(model = %name, %reason, "model failed");
                summary.failed.push((name, reason));
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        Alignment, EnsemblePipeline, Estimator, FeatureExtractor, ModelConfig, Stages,
        TransferPipeline,
    };
    use crate::data::DomainId;
    use crate::ledger::MemoryLedger;

    enum Behaviour {
        Score(f64),
        FitError,
        Panic,
    }

    struct Scripted(Behaviour);

    impl Estimator for Scripted {
        fn fit(&mut self, _: &[Trial], _: &[Label]) -> anyhow::Result<()> {
            match self.0 {
                Behaviour::FitError => anyhow::bail!("singular covariance"),
                Behaviour::Panic => panic!("index out of bounds"),
                Behaviour::Score(_) => Ok(()),
            }
        }

        fn score(&self, _: &[Trial], _: &[Label]) -> anyhow::Result<f64> {
            match self.0 {
                Behaviour::Score(s) => Ok(s),
                _ => unreachable!(),
            }
        }
    }

    /// Transfer pipelines score 0.5, ensembles cannot be built.
    struct ByName;

    impl EstimatorFactory for ByName {
        fn transfer(&self, _: &TransferPipeline) -> anyhow::Result<Box<dyn Estimator>> {
            Ok(Box::new(Scripted(Behaviour::Score(0.5))))
        }

        fn ensemble(&self, _: &EnsemblePipeline) -> anyhow::Result<Box<dyn Estimator>> {
            anyhow::bail!("ensembles unavailable")
        }
    }

    fn catalog(names: &[&str]) -> Catalog {
        let t = DomainId::from_position(1);
        let stages = Stages::staged(Alignment::Ra, FeatureExtractor::Csp);
        let configs = names
            .iter()
            .map(|n| ModelConfig::transfer(*n, t, stages, None))
            .collect();
        Catalog::from_configs(t, 128.0, configs).unwrap()
    }

    struct Fixed(fn() -> Behaviour);

    impl EstimatorFactory for Fixed {
        fn transfer(&self, _: &TransferPipeline) -> anyhow::Result<Box<dyn Estimator>> {
            Ok(Box::new(Scripted((self.0)())))
        }

        fn ensemble(&self, _: &EnsemblePipeline) -> anyhow::Result<Box<dyn Estimator>> {
            Ok(Box::new(Scripted((self.0)())))
        }
    }

    #[test]
    fn test_attempt_completed_record() {
        let catalog = catalog(&["A"]);
        let entry = &catalog.entries()[0];
        let outcome = attempt(entry, &catalog, &EvaluationTask::default(), &ByName);
        match outcome {
            Attempt::Completed(record) => {
                assert_eq!(record.model_name(), "A");
                assert_eq!(record.index(), 0);
                assert_eq!(record.target_domain().to_string(), "S2");
                assert!((record.score() - 0.5).abs() < f64::EPSILON);
                assert!(record.train_time() >= 0.0);
            }
            Attempt::Failed { reason, .. } => panic!("unexpected failure: {reason}"),
        }
    }

    #[test]
    fn test_attempt_fit_error_is_failure() {
        let catalog = catalog(&["A"]);
        let factory = Fixed(|| Behaviour::FitError);
        let task = EvaluationTask::default();
        let outcome = attempt(&catalog.entries()[0], &catalog, &task, &factory);
        assert!(matches!(
            outcome,
            Attempt::Failed { ref reason, .. } if reason.contains("singular covariance")
        ));
    }

    #[test]
    fn test_attempt_panic_is_failure() {
        let catalog = catalog(&["A"]);
        let factory = Fixed(|| Behaviour::Panic);
        let task = EvaluationTask::default();
        let outcome = attempt(&catalog.entries()[0], &catalog, &task, &factory);
        assert!(matches!(
            outcome,
            Attempt::Failed { ref reason, .. } if reason.contains("index out of bounds")
        ));
    }

    #[test]
    fn test_attempt_non_finite_score_is_failure() {
        let catalog = catalog(&["A"]);
        let factory = Fixed(|| Behaviour::Score(f64::NAN));
        let task = EvaluationTask::default();
        let outcome = attempt(&catalog.entries()[0], &catalog, &task, &factory);
        assert!(matches!(outcome, Attempt::Failed { .. }));
    }

    #[test]
    fn test_resolve_failure_is_isolated() {
        let t = DomainId::from_position(1);
        let stages = Stages::staged(Alignment::Ra, FeatureExtractor::TangentSpace);
        let jobs = crate::catalog::JobParallelism::AllCores;
        let configs = vec![
            ModelConfig::transfer("A", t, stages, None),
            ModelConfig::ensemble("E", t, stages, 128.0, None, jobs),
            ModelConfig::transfer("C", t, stages, None),
        ];
        let catalog = Catalog::from_configs(t, 128.0, configs).unwrap();
        let mut ledger = MemoryLedger::new();

        let task = EvaluationTask::default();
        let summary = run_catalog(&catalog, &task, &ByName, &mut ledger).unwrap();
        assert_eq!(summary.completed, vec!["A", "C"]);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "E");
        assert!(summary.failed[0].1.contains("ensembles unavailable"));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_second_run_skips_everything() {
        let catalog = catalog(&["A", "B"]);
        let mut ledger = MemoryLedger::new();
        let task = EvaluationTask::default();

        let first = run_catalog(&catalog, &task, &ByName, &mut ledger).unwrap();
        assert_eq!(first.attempted(), 2);

        let second = run_catalog(&catalog, &task, &ByName, &mut ledger).unwrap();
        assert_eq!(second.attempted(), 0);
        assert_eq!(second.skipped, vec!["A", "B"]);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_summary_merge() {
        let mut a = ExecutionSummary {
            completed: vec!["A".into()],
            ..ExecutionSummary::default()
        };
        a.merge(ExecutionSummary {
            skipped: vec!["B".into()],
            failed: vec![("C".into(), "boom".into())],
            ..ExecutionSummary::default()
        });
        assert_eq!(a.attempted(), 2);
        assert_eq!(a.skipped, vec!["B"]);
    }
}
