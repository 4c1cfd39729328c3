//! Sweep Driver - datasets × subjects × splits × catalog
//!
//! For every configured dataset, every subject is loaded, grouped into at
//! most `max_sessions` sessions, encoded into domains and split into
//! calibration/test sets. Each split then runs the catalog through
//! [`run_catalog`] against the subject's ledger file.
//!
//! ## Failure Scope
//!
//! | Failure | Scope |
//! |---------|-------|
//! | model `fit`/`score` error or panic | that model (inside the loop) |
//! | dataset load, shape, too few sessions or calibration trials | that subject |
//! | ledger I/O or corruption | the whole sweep |
//!
//! Re-running a sweep over the same results directory skips every model
//! already recorded, so an interrupted sweep resumes where it stopped.

mod subject_run;

pub use subject_run::{SubjectRun, SubjectStatus};

use crate::catalog::{build_catalog, EstimatorFactory};
use crate::config::SweepConfig;
use crate::data::{encode_sessions, Dataset, SubjectId};
use crate::ledger::JsonlLedger;
use crate::runner::{run_catalog, EvaluationTask, ExecutionSummary};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{error, info, info_span, warn};

/// Outcome of one dataset's pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetReport {
    dataset: String,
    results_dir: PathBuf,
    subjects: Vec<SubjectRun>,
}

impl DatasetReport {
    /// Dataset name.
    #[must_use]
    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// Directory holding the subject ledgers.
    #[must_use]
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Subject runs in sweep order.
    #[must_use]
    pub fn subjects(&self) -> &[SubjectRun] {
        &self.subjects
    }

    /// Subjects whose catalog loop finished.
    #[must_use]
    pub fn completed_subjects(&self) -> Vec<SubjectId> {
        self.with_status(SubjectStatus::Completed)
    }

    /// Subjects that were aborted.
    #[must_use]
    pub fn failed_subjects(&self) -> Vec<SubjectId> {
        self.with_status(SubjectStatus::Failed)
    }

    fn with_status(&self, status: SubjectStatus) -> Vec<SubjectId> {
        self.subjects
            .iter()
            .filter(|r| r.status() == status)
            .map(SubjectRun::subject)
            .collect()
    }
}

/// Cross-session sweep over a config and an estimator factory.
pub struct Sweep<'a, F: ?Sized> {
    config: &'a SweepConfig,
    factory: &'a F,
}

impl<'a, F> Sweep<'a, F>
where
    F: EstimatorFactory + ?Sized,
{
    /// Create a sweep.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the config does not validate.
    pub fn new(config: &'a SweepConfig, factory: &'a F) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, factory })
    }

    /// Sweep every configured dataset, loading each through `load`.
    ///
    /// A dataset that fails to load is logged and skipped.
    ///
    /// # Errors
    ///
    /// Ledger failures, which halt the sweep.
    pub fn run<L>(&self, mut load: L) -> Result<Vec<DatasetReport>>
    where
        L: FnMut(&str) -> anyhow::Result<Box<dyn Dataset>>,
    {
        let mut reports = Vec::with_capacity(self.config.datasets.len());
        for name in &self.config.datasets {
            let dataset = match load(name) {
                Ok(dataset) => dataset,
                Err(e) => {
                    let reason = format!("{e:#}");
                    warn!(dataset = %name, error = %reason, "dataset unavailable, skipping");
                    continue;
                }
            };
            reports.push(self.run_dataset(dataset.as_ref())?);
        }
        Ok(reports)
    }

    /// Sweep every subject of one dataset.
    ///
    /// # Errors
    ///
    /// Ledger failures, which halt the sweep. Subject-scoped failures are
    /// recorded in the report instead.
    pub fn run_dataset<D>(&self, dataset: &D) -> Result<DatasetReport>
    where
        D: Dataset + ?Sized,
    {
        let results_dir = self.config.results_dir(dataset.name());
        std::fs::create_dir_all(&results_dir).map_err(|source| Error::LedgerIo {
            path: results_dir.clone(),
            source,
        })?;
        info!(
            dataset = dataset.name(),
            dir = %results_dir.display(),
            "sweeping dataset"
        );

        let mut subjects = Vec::new();
        for subject in dataset.subject_list() {
            let span = info_span!("subject", dataset = dataset.name(), subject = subject.0);
            let _enter = span.enter();

            let mut run = SubjectRun::new(subject);
            run.start();
            match self.run_subject(dataset, subject, &results_dir) {
                Ok(summary) => {
                    info!(
                        completed = summary.completed.len(),
                        skipped = summary.skipped.len(),
                        failed = summary.failed.len(),
                        "subject finished"
                    );
                    run.complete(summary);
                }
                Err(e) if e.is_fatal_for_sweep() => {
                    error!(error = %e, "ledger failure, halting sweep");
                    return Err(e);
                }
                Err(e) => {
                    warn!(error = %e, "subject skipped");
                    run.fail(e.to_string());
                }
            }
            subjects.push(run);
        }

        Ok(DatasetReport {
            dataset: dataset.name().to_string(),
            results_dir,
            subjects,
        })
    }

    /// Load, encode, split and run the catalog for one subject.
    ///
    /// With more than one split, every split writes to the same ledger, so
    /// a model recorded by an earlier split is skipped by later ones.
    ///
    /// # Errors
    ///
    /// Any subject-scoped error, or a ledger failure.
    pub fn run_subject<D>(
        &self,
        dataset: &D,
        subject: SubjectId,
        results_dir: &Path,
    ) -> Result<ExecutionSummary>
    where
        D: Dataset + ?Sized,
    {
        let data = dataset
            .get_data(&[subject])
            .map_err(|e| Error::Dataset(format!("{}: subject {subject}: {e:#}", dataset.name())))?;
        info!(
            trials = data.len(),
            sessions = ?data
                .session_order()
                .iter()
                .map(|s| s.as_str().to_string())
                .collect::<Vec<_>>(),
            "subject loaded"
        );

        let encoded = encode_sessions(data.into_sessions(self.config.max_sessions)?)?;
        let target = encoded.target_domain();

        let mut catalog = build_catalog(target, self.config.sampling_rate, self.config.jobs)?;
        if let Some(models) = &self.config.models {
            catalog = catalog.retain_names(models);
        }

        let splitter = self.config.splitter(target)?;
        let mut ledger = JsonlLedger::for_subject(results_dir, subject);
        let mut summary = ExecutionSummary::default();

        for (i, split) in splitter.split(encoded.domains(), encoded.labels())?.enumerate() {
            info!(
                split = i,
                target = %target,
                train = split.train.len(),
                test = split.test.len(),
                "running catalog"
            );
            let task = EvaluationTask::from_split(&encoded, &split);
            summary.merge(run_catalog(&catalog, &task, self.factory, &mut ledger)?);
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EnsemblePipeline, Estimator, TransferPipeline};
    use crate::data::{Label, SessionId, SubjectData, Trial};
    use crate::ledger::Ledger;
    use tempfile::TempDir;

    struct Constant;

    impl Estimator for Constant {
        fn fit(&mut self, _: &[Trial], _: &[Label]) -> anyhow::Result<()> {
            Ok(())
        }

        fn score(&self, _: &[Trial], _: &[Label]) -> anyhow::Result<f64> {
            Ok(0.5)
        }
    }

    struct ConstantFactory;

    impl EstimatorFactory for ConstantFactory {
        fn transfer(&self, _: &TransferPipeline) -> anyhow::Result<Box<dyn Estimator>> {
            Ok(Box::new(Constant))
        }

        fn ensemble(&self, _: &EnsemblePipeline) -> anyhow::Result<Box<dyn Estimator>> {
            Ok(Box::new(Constant))
        }
    }

    /// Subject 1 has two sessions, subject 2 only one.
    struct TwoSubjects;

    impl Dataset for TwoSubjects {
        fn name(&self) -> &str {
            "Toy"
        }

        fn subject_list(&self) -> Vec<SubjectId> {
            vec![SubjectId(1), SubjectId(2)]
        }

        fn get_data(&self, subjects: &[SubjectId]) -> anyhow::Result<SubjectData> {
            let sessions: &[&str] = if subjects == [SubjectId(1)] {
                &["0train", "1test"]
            } else {
                &["0train"]
            };
            let mut data = SubjectData::default();
            for session in sessions {
                for i in 0..10 {
                    data.trials.push(Trial::from_vector(vec![0.0; 4]));
                    data.labels.push(Label::new(if i % 2 == 0 { "left" } else { "right" }));
                    data.sessions.push(SessionId::new(*session));
                }
            }
            Ok(data)
        }
    }

    fn config(root: &Path) -> SweepConfig {
        SweepConfig {
            datasets: vec!["Toy".to_string()],
            results_root: root.to_path_buf(),
            models: Some(vec!["EA-CSP".to_string(), "RAVE".to_string()]),
            ..SweepConfig::default()
        }
    }

    #[test]
    fn test_subject_failure_does_not_stop_dataset() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path());
        let sweep = Sweep::new(&config, &ConstantFactory).unwrap();

        let report = sweep.run_dataset(&TwoSubjects).unwrap();
        assert_eq!(report.completed_subjects(), vec![SubjectId(1)]);
        assert_eq!(report.failed_subjects(), vec![SubjectId(2)]);

        let failed = &report.subjects()[1];
        assert!(failed.error().unwrap().contains("session"));
    }

    #[test]
    fn test_ledger_written_under_results_dir() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path());
        let sweep = Sweep::new(&config, &ConstantFactory).unwrap();

        let report = sweep.run_dataset(&TwoSubjects).unwrap();
        assert_eq!(report.results_dir(), dir.path().join("cross_sessions_0.2_new/Toy"));

        let ledger = JsonlLedger::for_subject(report.results_dir(), SubjectId(1));
        let names: Vec<String> = ledger
            .records()
            .unwrap()
            .iter()
            .map(|r| r.model_name().to_string())
            .collect();
        assert_eq!(names, vec!["EA-CSP", "RAVE"]);
        assert_eq!(ledger.records().unwrap()[0].target_domain().to_string(), "S2");
    }

    #[test]
    fn test_run_skips_unloadable_dataset() {
        let dir = TempDir::new().unwrap();
        let mut config = config(dir.path());
        config.datasets = vec!["Missing".to_string(), "Toy".to_string()];
        let sweep = Sweep::new(&config, &ConstantFactory).unwrap();

        let reports = sweep
            .run(|name| {
                if name == "Toy" {
                    Ok(Box::new(TwoSubjects) as Box<dyn Dataset>)
                } else {
                    anyhow::bail!("no such dataset: {name}")
                }
            })
            .unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].dataset(), "Toy");
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = SweepConfig {
            calibration_ratio: 0.0,
            ..SweepConfig::default()
        };
        assert!(Sweep::new(&config, &ConstantFactory).is_err());
    }
}
