//! Model Catalog - the fixed, ordered set of pipelines under comparison
//!
//! ## Catalog Layout
//!
//! ```text
//! index  name            family    stages
//! ─────  ──────────────  ────────  ─────────────────────────────
//!   0    EA-CSP          transfer  EA  -> CSP -> LDA              ┐
//!   1    RA-CSP          transfer  RA  -> CSP -> LDA              │
//!   2    TSM             transfer  RA  -> TS  -> LDA              │
//!   3    MEKT            transfer  RA  -> MEKT-LDA                │ contrast
//!   4    RAVE            ensemble  RA  -> ABC-MDM                 │ baselines
//!   5    RAVE+           ensemble  RA  -> ABC-TS-LDA              │
//!   6    EEGNet          transfer  RA  -> EEGNet                  │
//!   7    LMDA-Net        transfer  RA  -> LMDA-Net                │
//!   8    Tensor-CSPNet   transfer  RA  -> Tensor-CSPNet           ┘
//!   9    RSFDA           ensemble  RSF + RA -> MEKT-P-MIC-K-LDA     proposed
//!  10..  RSFDA-*         mixed     one or two sub-stages removed    ablations
//! ```
//!
//! Order only matters for display. Result records echo the catalog name, so
//! names are unique within a catalog and stable across builds.

mod estimator;
mod model;

pub use estimator::{Estimator, EstimatorFactory};
pub use model::{
    Alignment, ChannelSelection, Classifier, DeepNetwork, EndToEndMethod, EnsemblePipeline,
    Family, FeatureExtractor, JobParallelism, ModelConfig, NetworkKind, Preprocessing, Stages,
    TransferPipeline,
};

use crate::data::DomainId;
use crate::{Error, Result};
use rustc_hash::FxHashSet;
use tracing::warn;

/// Number of features kept by the MIC selection stage of the proposed method.
pub const RSFDA_FEATURE_COUNT: usize = 30;

/// Catalog entry: a configuration plus its position in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    index: usize,
    config: ModelConfig,
}

impl CatalogEntry {
    /// Position in the full catalog (stable under [`Catalog::retain_names`]).
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Model display name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.config.name()
    }

    /// Declarative configuration.
    #[must_use]
    pub const fn config(&self) -> &ModelConfig {
        &self.config
    }
}

/// Ordered, name-unique list of model configurations for one target domain.
#[derive(Debug, Clone)]
pub struct Catalog {
    target_domain: DomainId,
    sampling_rate: f64,
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Build a catalog from configurations in display order.
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateModelName`] if two configurations share a name
    /// - [`Error::InvalidConfig`] if `sampling_rate` is not positive and finite
    pub fn from_configs(
        target_domain: DomainId,
        sampling_rate: f64,
        configs: Vec<ModelConfig>,
    ) -> Result<Self> {
        if !(sampling_rate.is_finite() && sampling_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "sampling rate must be positive, got {sampling_rate}"
            )));
        }

        let mut seen = FxHashSet::default();
        for config in &configs {
            if !seen.insert(config.name()) {
                return Err(Error::DuplicateModelName(config.name().to_string()));
            }
        }

        let entries = configs
            .into_iter()
            .enumerate()
            .map(|(index, config)| CatalogEntry { index, config })
            .collect();

        Ok(Self {
            target_domain,
            sampling_rate,
            entries,
        })
    }

    /// Target domain every entry is evaluated on.
    #[must_use]
    pub const fn target_domain(&self) -> DomainId {
        self.target_domain
    }

    /// Sampling rate echoed into result records.
    #[must_use]
    pub const fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    /// Entries in catalog order.
    #[must_use]
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names in catalog order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(CatalogEntry::name).collect()
    }

    /// Look up an entry by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.name() == name)
    }

    /// Keep only entries whose name is in `names`.
    ///
    /// Indices are preserved so records stay comparable with full runs.
    /// Names missing from the catalog are logged and ignored.
    #[must_use]
    pub fn retain_names(mut self, names: &[String]) -> Self {
        let wanted: FxHashSet<&str> = names.iter().map(String::as_str).collect();
        for name in &wanted {
            if self.get(name).is_none() {
                warn!(model = %name, "requested model is not in the catalog");
            }
        }
        self.entries.retain(|e| wanted.contains(e.name()));
        self
    }

    /// Lazily resolve every entry into `(name, estimator)`.
    ///
    /// Each estimator is built only when the iterator reaches it.
    pub fn resolve<'a, F>(
        &'a self,
        factory: &'a F,
    ) -> impl Iterator<Item = (&'a str, anyhow::Result<Box<dyn Estimator>>)> + 'a
    where
        F: EstimatorFactory + ?Sized,
    {
        self.entries
            .iter()
            .map(move |e| (e.name(), e.config().resolve(factory)))
    }
}

/// Build the cross-session comparison catalog: contrast baselines, the
/// proposed RSFDA method and its ablations.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] if `sampling_rate` is not positive.
pub fn build_catalog(
    target_domain: DomainId,
    sampling_rate: f64,
    jobs: JobParallelism,
) -> Result<Catalog> {
    let t = target_domain;
    let fs = sampling_rate;
    let pre = Some(Preprocessing::baseline(fs));
    let pre_rsf = Some(Preprocessing::baseline(fs).with_channel_selection(ChannelSelection::Rsf));
    let rsf = Some(ChannelSelection::Rsf);

    let ra_ts_lda = Stages::staged(Alignment::Ra, FeatureExtractor::TangentSpace);
    let ra_mekt_p = Stages::end_to_end(
        Alignment::Ra,
        EndToEndMethod::MektPMicKLda {
            feature_count: RSFDA_FEATURE_COUNT,
        },
    );
    let deep = |kind| Stages::deep(Alignment::Ra, DeepNetwork::binary(kind, fs));

    let ea_csp = Stages::staged(Alignment::Ea, FeatureExtractor::Csp);
    let ra_csp = Stages::staged(Alignment::Ra, FeatureExtractor::Csp);
    let ra_mekt = Stages::end_to_end(Alignment::Ra, EndToEndMethod::MektLda);
    let ra_abc_mdm = Stages::end_to_end(Alignment::Ra, EndToEndMethod::AbcMdm);
    let ra_abc_ts = Stages::end_to_end(Alignment::Ra, EndToEndMethod::AbcTsLda);
    let tensor_cspnet = Stages::deep(
        Alignment::Ra,
        DeepNetwork::binary(NetworkKind::TensorCspNet, fs).max_epochs(100),
    );

    let configs = vec![
        // contrast baselines
        ModelConfig::transfer("EA-CSP", t, ea_csp, pre),
        ModelConfig::transfer("RA-CSP", t, ra_csp, pre),
        ModelConfig::transfer("TSM", t, ra_ts_lda, pre),
        ModelConfig::transfer("MEKT", t, ra_mekt, pre),
        ModelConfig::ensemble("RAVE", t, ra_abc_mdm, fs, None, jobs),
        ModelConfig::ensemble("RAVE+", t, ra_abc_ts, fs, None, jobs),
        ModelConfig::transfer("EEGNet", t, deep(NetworkKind::EegNet), pre),
        ModelConfig::transfer("LMDA-Net", t, deep(NetworkKind::LmdaNet), pre),
        ModelConfig::transfer("Tensor-CSPNet", t, tensor_cspnet, None),
        // proposed
        ModelConfig::ensemble("RSFDA", t, ra_mekt_p, fs, rsf, jobs),
        // ablations
        ModelConfig::transfer("RSFDA-1", t, ra_mekt_p, pre_rsf),
        ModelConfig::ensemble("RSFDA-2", t, ra_mekt_p, fs, None, jobs),
        ModelConfig::ensemble("RSFDA-3", t, ra_ts_lda, fs, rsf, jobs),
        ModelConfig::transfer("RSFDA-12", t, ra_mekt_p, pre),
        ModelConfig::transfer("RSFDA-13", t, ra_ts_lda, pre_rsf),
        ModelConfig::ensemble("RSFDA-23", t, ra_ts_lda, fs, None, jobs),
    ];

    Catalog::from_configs(target_domain, sampling_rate, configs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Label, Trial};

    fn catalog() -> Catalog {
        build_catalog(DomainId::from_position(1), 128.0, JobParallelism::AllCores).unwrap()
    }

    #[test]
    fn test_catalog_order_and_size() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 16);
        assert_eq!(
            catalog.names(),
            vec![
                "EA-CSP", "RA-CSP", "TSM", "MEKT", "RAVE", "RAVE+", "EEGNet", "LMDA-Net",
                "Tensor-CSPNet", "RSFDA", "RSFDA-1", "RSFDA-2", "RSFDA-3", "RSFDA-12",
                "RSFDA-13", "RSFDA-23",
            ]
        );
        for (i, entry) in catalog.entries().iter().enumerate() {
            assert_eq!(entry.index(), i);
        }
    }

    #[test]
    fn test_catalog_is_deterministic() {
        let a = catalog();
        let b = catalog();
        assert_eq!(a.entries(), b.entries());
    }

    #[test]
    fn test_proposed_method_shape() {
        let catalog = catalog();
        let rsfda = catalog.get("RSFDA").unwrap();
        match rsfda.config().family() {
            Family::Ensemble(p) => {
                assert_eq!(p.channel_selection, Some(ChannelSelection::Rsf));
                assert_eq!(p.jobs, JobParallelism::AllCores);
                assert_eq!(
                    p.stages,
                    Stages::end_to_end(
                        Alignment::Ra,
                        EndToEndMethod::MektPMicKLda { feature_count: 30 }
                    )
                );
            }
            Family::Transfer(_) => panic!("RSFDA must be an ensemble"),
        }
    }

    #[test]
    fn test_tensor_cspnet_has_no_preprocessing() {
        let catalog = catalog();
        match catalog.get("Tensor-CSPNet").unwrap().config().family() {
            Family::Transfer(p) => {
                assert!(p.preprocessing.is_none());
                match p.stages {
                    Stages::Deep { network, .. } => assert_eq!(network.max_epochs, 100),
                    _ => panic!("Tensor-CSPNet must be a deep pipeline"),
                }
            }
            Family::Ensemble(_) => panic!("Tensor-CSPNet must be a transfer pipeline"),
        }
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let t = DomainId::from_position(1);
        let stages = Stages::staged(Alignment::Ra, FeatureExtractor::Csp);
        let configs = vec![
            ModelConfig::transfer("A", t, stages, None),
            ModelConfig::transfer("A", t, stages, None),
        ];
        let err = Catalog::from_configs(t, 128.0, configs).unwrap_err();
        assert!(matches!(err, Error::DuplicateModelName(name) if name == "A"));
    }

    #[test]
    fn test_invalid_sampling_rate() {
        let err = build_catalog(DomainId::from_position(1), 0.0, JobParallelism::AllCores)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_retain_names_preserves_indices() {
        let subset = catalog().retain_names(&["TSM".to_string(), "RSFDA".to_string()]);
        assert_eq!(subset.names(), vec!["TSM", "RSFDA"]);
        assert_eq!(subset.entries()[0].index(), 2);
        assert_eq!(subset.entries()[1].index(), 9);
    }

    // =========================================================================
    // Lazy resolution
    // =========================================================================

    struct Untrained;

    impl Estimator for Untrained {
        fn fit(&mut self, _: &[Trial], _: &[Label]) -> anyhow::Result<()> {
            Ok(())
        }

        fn score(&self, _: &[Trial], _: &[Label]) -> anyhow::Result<f64> {
            Ok(0.0)
        }
    }

    /// Counts builds; deep networks fail to build.
    #[derive(Default)]
    struct CountingFactory {
        built: std::cell::Cell<usize>,
    }

    impl EstimatorFactory for CountingFactory {
        fn transfer(&self, pipeline: &TransferPipeline) -> anyhow::Result<Box<dyn Estimator>> {
            self.built.set(self.built.get() + 1);
            if let Stages::Deep { network, .. } = pipeline.stages {
                anyhow::bail!("no GPU for {:?}", network.kind);
            }
            Ok(Box::new(Untrained))
        }

        fn ensemble(&self, _: &EnsemblePipeline) -> anyhow::Result<Box<dyn Estimator>> {
            self.built.set(self.built.get() + 1);
            Ok(Box::new(Untrained))
        }
    }

    #[test]
    fn test_resolve_follows_catalog_order() {
        let catalog = catalog();
        let factory = CountingFactory::default();

        let resolved: Vec<(&str, bool)> = catalog
            .resolve(&factory)
            .map(|(name, estimator)| (name, estimator.is_ok()))
            .collect();

        assert_eq!(
            resolved.iter().map(|(name, _)| *name).collect::<Vec<_>>(),
            catalog.names()
        );
        let failed: Vec<&str> = resolved
            .iter()
            .filter(|(_, ok)| !ok)
            .map(|(name, _)| *name)
            .collect();
        assert_eq!(failed, vec!["EEGNet", "LMDA-Net", "Tensor-CSPNet"]);
        assert_eq!(factory.built.get(), 16);
    }

    #[test]
    fn test_resolve_builds_only_what_is_consumed() {
        let catalog = catalog();
        let factory = CountingFactory::default();

        let mut resolved = catalog.resolve(&factory);
        assert_eq!(factory.built.get(), 0);

        let (name, estimator) = resolved.next().unwrap();
        assert_eq!(name, "EA-CSP");
        assert!(estimator.is_ok());
        assert_eq!(factory.built.get(), 1);
    }
}
