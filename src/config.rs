//! Sweep configuration
//!
//! Process-level constants of a sweep: which datasets, how much of the
//! target domain to calibrate on, the sampling rate and where results go.
//! Every field has a default matching the cross-session study, so a config
//! file only needs the fields it changes:
//!
//! ```json
//! { "datasets": ["BNCI2014_001"], "calibration_ratio": 0.1 }
//! ```

use crate::catalog::{build_catalog, JobParallelism};
use crate::data::DomainId;
use crate::split::{TransferSplitter, DEFAULT_SPLIT_SEED};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for a cross-session sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Dataset names, swept in order.
    pub datasets: Vec<String>,
    /// Fraction of target-domain trials used for calibration.
    pub calibration_ratio: f64,
    /// Keep calibration trials out of training (unsupervised transfer).
    pub no_calibration: bool,
    /// Calibration draws per subject.
    pub n_splits: usize,
    /// Seed for the calibration draw.
    pub split_seed: u64,
    /// Sampling rate (Hz) trials are resampled to.
    pub sampling_rate: f64,
    /// Sessions consumed per subject, in encounter order.
    pub max_sessions: usize,
    /// Root directory for result ledgers.
    pub results_root: PathBuf,
    /// Worker pool handed to ensemble estimators.
    pub jobs: JobParallelism,
    /// Restrict the catalog to these model names (`None` = all).
    ///
    /// Must be non-empty and name catalog entries only.
    pub models: Option<Vec<String>>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            datasets: vec![
                "Pan2023".to_string(),
                "BNCI2014_001".to_string(),
                "BNCI2015_001".to_string(),
            ],
            calibration_ratio: 0.2,
            no_calibration: false,
            n_splits: 1,
            split_seed: DEFAULT_SPLIT_SEED,
            sampling_rate: 128.0,
            max_sessions: 2,
            results_root: PathBuf::from("results_for_paper2024"),
            jobs: JobParallelism::AllCores,
            models: None,
        }
    }
}

impl SweepConfig {
    /// Load and validate a JSON config file.
    ///
    /// # Errors
    ///
    /// I/O, JSON or validation errors.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        if !(self.calibration_ratio > 0.0 && self.calibration_ratio < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "calibration_ratio must be in (0, 1), got {}",
                self.calibration_ratio
            )));
        }
        if !(self.sampling_rate.is_finite() && self.sampling_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "sampling_rate must be positive, got {}",
                self.sampling_rate
            )));
        }
        if self.max_sessions < 2 {
            return Err(Error::InvalidConfig(format!(
                "max_sessions must be at least 2, got {}",
                self.max_sessions
            )));
        }
        if self.n_splits == 0 {
            return Err(Error::InvalidConfig("n_splits must be at least 1".to_string()));
        }
        if let JobParallelism::Fixed(0) = self.jobs {
            return Err(Error::InvalidConfig("jobs must be at least 1".to_string()));
        }
        if let Some(models) = &self.models {
            self.validate_models(models)?;
        }
        Ok(())
    }

    fn validate_models(&self, models: &[String]) -> Result<()> {
        if models.is_empty() {
            return Err(Error::InvalidConfig(
                "models must name at least one model (omit it to run all)".to_string(),
            ));
        }
        // names do not depend on the target domain
        let catalog = build_catalog(DomainId::from_position(1), self.sampling_rate, self.jobs)?;
        let unknown: Vec<&str> = models
            .iter()
            .map(String::as_str)
            .filter(|name| catalog.get(name).is_none())
            .collect();
        if !unknown.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "unknown models {unknown:?}, expected any of {:?}",
                catalog.names()
            )));
        }
        Ok(())
    }

    /// Result directory of `dataset`: `{root}/cross_sessions_{ratio}_new/{dataset}`.
    ///
    /// The `_new` suffix matches the directories of existing study results,
    /// which a sweep resumes from.
    #[must_use]
    pub fn results_dir(&self, dataset: &str) -> PathBuf {
        self.results_root
            .join(format!("cross_sessions_{}_new", self.calibration_ratio))
            .join(dataset)
    }

    /// Split generator for `target_domain` with this config's knobs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for an out-of-range ratio.
    pub fn splitter(&self, target_domain: DomainId) -> Result<TransferSplitter> {
        Ok(TransferSplitter::new(target_domain, self.calibration_ratio)?
            .no_calibration(self.no_calibration)
            .n_splits(self.n_splits)
            .seed(self.split_seed))
    }
}
