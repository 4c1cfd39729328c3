//! Estimator collaborator contract
//!
//! Concrete classifiers (linear, Riemannian, deep) live outside this crate.
//! The sweep only needs to build them from a [`ModelConfig`], train them and
//! score them. Collaborator failures are reported as [`anyhow::Error`] and are
//! downgraded to per-model failures by the execution loop.

use super::{EnsemblePipeline, Family, ModelConfig, TransferPipeline};
use crate::data::{Label, Trial};

/// Trainable classifier.
///
/// Both calls block until done; implementations may parallelize internally.
pub trait Estimator {
    /// Train on `trials`/`labels`.
    ///
    /// # Errors
    ///
    /// Any training failure.
    fn fit(&mut self, trials: &[Trial], labels: &[Label]) -> anyhow::Result<()>;

    /// Mean accuracy (or another scalar score) on `trials`/`labels`.
    ///
    /// # Errors
    ///
    /// Any scoring failure.
    fn score(&self, trials: &[Trial], labels: &[Label]) -> anyhow::Result<f64>;
}

/// Builds estimators from declarative pipelines, one method per family.
///
/// Building allocates model state only; it must not train.
pub trait EstimatorFactory {
    /// Build a single transfer pipeline.
    ///
    /// # Errors
    ///
    /// Unsupported stage combinations or allocation failures.
    fn transfer(&self, pipeline: &TransferPipeline) -> anyhow::Result<Box<dyn Estimator>>;

    /// Build an ensemble pipeline.
    ///
    /// # Errors
    ///
    /// Unsupported stage combinations or allocation failures.
    fn ensemble(&self, pipeline: &EnsemblePipeline) -> anyhow::Result<Box<dyn Estimator>>;
}

impl ModelConfig {
    /// Resolve into a trainable estimator via `factory`.
    ///
    /// # Errors
    ///
    /// Whatever the factory reports.
    pub fn resolve<F>(&self, factory: &F) -> anyhow::Result<Box<dyn Estimator>>
    where
        F: EstimatorFactory + ?Sized,
    {
        match self.family() {
            Family::Transfer(pipeline) => factory.transfer(pipeline),
            Family::Ensemble(pipeline) => factory.ensemble(pipeline),
        }
    }
}
