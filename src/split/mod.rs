//! Transfer-learning split generator
//!
//! **Transfer evaluation**: the classifier is adapted on every source-domain
//! trial plus a small calibration subset of the target domain, then scored
//! on the remaining target-domain trials.
//!
//! ```text
//! domains:  S1 S1 S1 S1 S1 S1 | S2 S2 S2 S2 S2 S2 S2 S2 S2 S2
//!           ───── source ──── | ───────── target ──────────
//! train:    ■  ■  ■  ■  ■  ■  | ■        ■                      (r = 0.2)
//! test:                       |    ■  ■     ■  ■  ■  ■  ■  ■
//! ```
//!
//! ## Calibration Size
//!
//! `n_cal = floor(r · n_target)`, clamped to `[1, n_target - 1]` so both the
//! calibration and the test subsets are non-empty. The draw is stratified by
//! label (largest-remainder quotas) and seeded, so identical inputs always
//! produce identical partitions.

use crate::data::{DomainId, Label};
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

/// Default seed for the calibration draw.
pub const DEFAULT_SPLIT_SEED: u64 = 42;

/// Guards `floor(r * n)` against representation error (e.g. `0.7 * 10`).
const RATIO_EPSILON: f64 = 1e-9;

/// One train/test partition over the full trial index range.
///
/// Index lists are sorted ascending and pairwise disjoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    /// Source-domain indices plus (in calibrated mode) the calibration subset.
    pub train: Vec<usize>,
    /// Target-domain indices held out for scoring.
    pub test: Vec<usize>,
    /// Calibration subset kept out of training in no-calibration mode.
    /// Always empty in calibrated mode.
    pub withheld: Vec<usize>,
}

/// Split generator for one target domain.
#[derive(Debug, Clone)]
pub struct TransferSplitter {
    target_domain: DomainId,
    calibration_ratio: f64,
    no_calibration: bool,
    n_splits: usize,
    seed: u64,
}

impl TransferSplitter {
    /// Create a splitter moving `calibration_ratio` of the target domain into
    /// training.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] unless `0 < calibration_ratio < 1`.
    pub fn new(target_domain: DomainId, calibration_ratio: f64) -> Result<Self> {
        if !(calibration_ratio > 0.0 && calibration_ratio < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "calibration ratio must be in (0, 1), got {calibration_ratio}"
            )));
        }
        Ok(Self {
            target_domain,
            calibration_ratio,
            no_calibration: false,
            n_splits: 1,
            seed: DEFAULT_SPLIT_SEED,
        })
    }

    /// Keep the calibration subset out of training (fully unsupervised
    /// transfer). The test subset is identical to calibrated mode.
    #[must_use]
    pub const fn no_calibration(mut self, no_calibration: bool) -> Self {
        self.no_calibration = no_calibration;
        self
    }

    /// Number of repeated draws (default 1). Zero is treated as one.
    #[must_use]
    pub const fn n_splits(mut self, n_splits: usize) -> Self {
        self.n_splits = if n_splits == 0 { 1 } else { n_splits };
        self
    }

    /// Seed for the calibration draw.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Target domain this splitter evaluates.
    #[must_use]
    pub const fn target_domain(&self) -> DomainId {
        self.target_domain
    }

    /// Calibration subset size for a target domain of `n_target` trials.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientCalibrationData`] when `n_target < 2`.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn calibration_size(&self, n_target: usize) -> Result<usize> {
        if n_target < 2 {
            return Err(Error::InsufficientCalibrationData {
                target_trials: n_target,
            });
        }
        let raw = (self.calibration_ratio * n_target as f64 + RATIO_EPSILON).floor() as usize;
        Ok(raw.clamp(1, n_target - 1))
    }

    /// Partition the trial range described by `domains`/`labels`.
    ///
    /// Returns a lazy iterator yielding `n_splits` partitions.
    ///
    /// # Errors
    ///
    /// - [`Error::ShapeMismatch`] if `domains` and `labels` differ in length
    /// - [`Error::InsufficientCalibrationData`] if the target domain has fewer
    ///   than two trials
    pub fn split(&self, domains: &[DomainId], labels: &[Label]) -> Result<Splits> {
        if domains.len() != labels.len() {
            return Err(Error::ShapeMismatch(format!(
                "{} domain ids but {} labels",
                domains.len(),
                labels.len()
            )));
        }

        let mut source = Vec::new();
        let mut by_label: BTreeMap<&Label, Vec<usize>> = BTreeMap::new();
        for (idx, (domain, label)) in domains.iter().zip(labels).enumerate() {
            if *domain == self.target_domain {
                by_label.entry(label).or_default().push(idx);
            } else {
                source.push(idx);
            }
        }

        let n_target: usize = by_label.values().map(Vec::len).sum();
        let n_cal = self.calibration_size(n_target)?;
        let strata: Vec<Vec<usize>> = by_label.into_values().collect();
        let quotas = stratified_quotas(&strata, n_cal, n_target);

        Ok(Splits {
            source,
            strata,
            quotas,
            no_calibration: self.no_calibration,
            seed: self.seed,
            n_splits: self.n_splits,
            next: 0,
        })
    }
}

/// Per-stratum calibration counts summing to `n_cal` (largest remainder).
fn stratified_quotas(strata: &[Vec<usize>], n_cal: usize, n_target: usize) -> Vec<usize> {
    let mut quotas: Vec<usize> = Vec::with_capacity(strata.len());
    let mut remainders: Vec<(usize, usize)> = Vec::with_capacity(strata.len());
    for (i, stratum) in strata.iter().enumerate() {
        let scaled = n_cal * stratum.len();
        quotas.push(scaled / n_target);
        remainders.push((scaled % n_target, i));
    }

    let assigned: usize = quotas.iter().sum();
    // Largest remainder first, ties broken by stratum order.
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    for &(_, i) in remainders.iter().take(n_cal - assigned) {
        quotas[i] += 1;
    }
    quotas
}

/// Lazy sequence of [`Split`]s produced by [`TransferSplitter::split`].
#[derive(Debug, Clone)]
pub struct Splits {
    source: Vec<usize>,
    strata: Vec<Vec<usize>>,
    quotas: Vec<usize>,
    no_calibration: bool,
    seed: u64,
    n_splits: usize,
    next: usize,
}

impl Iterator for Splits {
    type Item = Split;

    fn next(&mut self) -> Option<Split> {
        if self.next >= self.n_splits {
            return None;
        }
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(self.next as u64));
        self.next += 1;

        let mut calibration = Vec::new();
        let mut test = Vec::new();
        for (stratum, &quota) in self.strata.iter().zip(&self.quotas) {
            let mut shuffled = stratum.clone();
            shuffled.shuffle(&mut rng);
            let (cal, rest) = shuffled.split_at(quota);
            calibration.extend_from_slice(cal);
            test.extend_from_slice(rest);
        }
        calibration.sort_unstable();
        test.sort_unstable();

        let mut train = self.source.clone();
        let withheld = if self.no_calibration {
            calibration
        } else {
            train.extend(calibration);
            train.sort_unstable();
            Vec::new()
        };

        Some(Split {
            train,
            test,
            withheld,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.n_splits.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Splits {}
