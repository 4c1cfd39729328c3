//! Result Record - one completed (subject, model) evaluation

use crate::data::DomainId;
use serde::{Deserialize, Serialize};

/// Result Record represents one successful model evaluation.
///
/// Serialized as one JSON object per ledger line with exactly these fields
/// (wrapped here for width):
///
/// ```text
/// {"index":0,"model_name":"EA-CSP","score":0.8,"train_time":1.2,"test_time":0.05,
///  "target_domain":"S2","fs":128.0}
/// ```
///
/// Records are immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultRecord {
    index: usize,
    model_name: String,
    score: f64,
    train_time: f64,
    test_time: f64,
    target_domain: DomainId,
    fs: f64,
}

impl ResultRecord {
    /// Create a new result record.
    ///
    /// # Arguments
    ///
    /// * `index` - Catalog position of the model
    /// * `model_name` - Catalog display name
    /// * `score` - Score on the test split
    /// * `train_time` - Wall-clock `fit` time in seconds
    /// * `test_time` - Wall-clock `score` time in seconds
    /// * `target_domain` - Domain evaluated on
    /// * `fs` - Sampling rate (Hz)
    #[must_use]
    pub fn new(
        index: usize,
        model_name: impl Into<String>,
        score: f64,
        train_time: f64,
        test_time: f64,
        target_domain: DomainId,
        fs: f64,
    ) -> Self {
        Self {
            index,
            model_name: model_name.into(),
            score,
            train_time,
            test_time,
            target_domain,
            fs,
        }
    }

    /// Catalog position.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Model display name.
    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Test-split score.
    #[must_use]
    pub const fn score(&self) -> f64 {
        self.score
    }

    /// Training time in seconds.
    #[must_use]
    pub const fn train_time(&self) -> f64 {
        self.train_time
    }

    /// Scoring time in seconds.
    #[must_use]
    pub const fn test_time(&self) -> f64 {
        self.test_time
    }

    /// Target domain.
    #[must_use]
    pub const fn target_domain(&self) -> DomainId {
        self.target_domain
    }

    /// Sampling rate (Hz).
    #[must_use]
    pub const fn fs(&self) -> f64 {
        self.fs
    }
}
