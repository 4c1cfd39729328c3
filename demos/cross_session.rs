//! Cross-session sweep over a synthetic two-class dataset.
//!
//! Every catalog entry is backed by a nearest-class-mean classifier, so the
//! whole sweep runs in well under a second. Run it twice to see the second
//! pass skip everything:
//!
//! ```text
//! cargo run --example cross_session -- target/demo_results
//! RUST_LOG=debug cargo run --example cross_session
//! ```

use anyhow::Context;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use std::path::PathBuf;
use trueno_sweep::catalog::{EnsemblePipeline, Estimator, EstimatorFactory, TransferPipeline};
use trueno_sweep::config::SweepConfig;
use trueno_sweep::data::{Dataset, Label, SessionId, SubjectData, SubjectId, Trial};
use trueno_sweep::report::{collect_dataset, mean_scores, write_parquet};
use trueno_sweep::sweep::Sweep;
use trueno_sweep::telemetry;

const CHANNELS: usize = 8;
const SAMPLES: usize = 32;
const TRIALS_PER_SESSION: usize = 40;

/// Two sessions per subject; the second session drifts by a per-subject offset.
struct SyntheticMotorImagery {
    subjects: u32,
}

impl Dataset for SyntheticMotorImagery {
    fn name(&self) -> &str {
        "SyntheticMI"
    }

    fn subject_list(&self) -> Vec<SubjectId> {
        (1..=self.subjects).map(SubjectId).collect()
    }

    fn get_data(&self, subjects: &[SubjectId]) -> anyhow::Result<SubjectData> {
        let mut data = SubjectData::default();
        for subject in subjects {
            let mut rng = StdRng::seed_from_u64(u64::from(subject.0));
            let drift: f32 = rng.gen_range(-0.5..0.5);
            for (s, session) in ["0train", "1test"].iter().enumerate() {
                for i in 0..TRIALS_PER_SESSION {
                    let class = i % 2;
                    #[allow(clippy::cast_precision_loss)]
                    let mean = if class == 0 { -1.0 } else { 1.0 } + drift * s as f32;
                    let values = (0..CHANNELS * SAMPLES)
                        .map(|_| mean + rng.gen_range(-2.0..2.0))
                        .collect();
                    data.trials.push(Trial::new(vec![CHANNELS, SAMPLES], values)?);
                    data.labels
                        .push(Label::new(if class == 0 { "left_hand" } else { "right_hand" }));
                    data.sessions.push(SessionId::new(*session));
                }
            }
        }
        Ok(data)
    }
}

/// Classifies a trial by the closest class-mean of its average amplitude.
#[derive(Default)]
struct NearestMean {
    means: FxHashMap<Label, f32>,
}

fn amplitude(trial: &Trial) -> f32 {
    #[allow(clippy::cast_precision_loss)]
    let n = trial.values().len().max(1) as f32;
    trial.values().iter().sum::<f32>() / n
}

impl Estimator for NearestMean {
    fn fit(&mut self, trials: &[Trial], labels: &[Label]) -> anyhow::Result<()> {
        anyhow::ensure!(!trials.is_empty(), "no training trials");
        let mut sums: FxHashMap<Label, (f32, f32)> = FxHashMap::default();
        for (trial, label) in trials.iter().zip(labels) {
            let entry = sums.entry(label.clone()).or_default();
            entry.0 += amplitude(trial);
            entry.1 += 1.0;
        }
        self.means = sums.into_iter().map(|(l, (sum, n))| (l, sum / n)).collect();
        Ok(())
    }

    fn score(&self, trials: &[Trial], labels: &[Label]) -> anyhow::Result<f64> {
        anyhow::ensure!(!trials.is_empty(), "no test trials");
        let correct = trials
            .iter()
            .zip(labels)
            .filter(|(trial, label)| {
                let a = amplitude(trial);
                self.means
                    .iter()
                    .min_by(|x, y| (x.1 - a).abs().total_cmp(&(y.1 - a).abs()))
                    .is_some_and(|(predicted, _)| predicted == *label)
            })
            .count();
        #[allow(clippy::cast_precision_loss)]
        Ok(correct as f64 / trials.len() as f64)
    }
}

struct NearestMeanFactory;

impl EstimatorFactory for NearestMeanFactory {
    fn transfer(&self, _: &TransferPipeline) -> anyhow::Result<Box<dyn Estimator>> {
        Ok(Box::<NearestMean>::default())
    }

    fn ensemble(&self, _: &EnsemblePipeline) -> anyhow::Result<Box<dyn Estimator>> {
        Ok(Box::<NearestMean>::default())
    }
}

fn main() -> anyhow::Result<()> {
    telemetry::init();

    let results_root = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from("target/demo_results"), PathBuf::from);
    let config = SweepConfig {
        datasets: vec!["SyntheticMI".to_string()],
        results_root,
        ..SweepConfig::default()
    };

    let sweep = Sweep::new(&config, &NearestMeanFactory)?;
    let reports = sweep.run(|name| match name {
        "SyntheticMI" => Ok(Box::new(SyntheticMotorImagery { subjects: 3 }) as Box<dyn Dataset>),
        other => anyhow::bail!("unknown dataset {other}"),
    })?;

    for report in &reports {
        let batch = collect_dataset(report.results_dir())
            .with_context(|| format!("collecting {}", report.dataset()))?;
        let parquet = report.results_dir().join("summary.parquet");
        write_parquet(&batch, &parquet)?;

        println!("{} ({} records -> {})", report.dataset(), batch.num_rows(), parquet.display());
        for summary in mean_scores(&batch)? {
            println!(
                "  {:>2}  {:<14} {:.3}  (n={})",
                summary.index, summary.model_name, summary.mean_score, summary.count
            );
        }
    }
    Ok(())
}
