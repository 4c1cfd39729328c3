//! Model configuration records - declarative, immutable pipeline descriptions

use crate::data::DomainId;
use serde::{Deserialize, Serialize};

/// Inter-session alignment applied before feature extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    /// Euclidean alignment.
    Ea,
    /// Riemannian alignment (re-centering).
    Ra,
}

/// Feature extraction stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureExtractor {
    /// Common spatial patterns.
    Csp,
    /// Riemannian tangent-space mapping.
    TangentSpace,
}

/// Final classifier of a staged pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classifier {
    /// Linear discriminant analysis.
    Lda,
}

/// Methods that cover extraction, adaptation and classification in one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndToEndMethod {
    /// Manifold embedded knowledge transfer + LDA.
    MektLda,
    /// Adaptive band-channel ensemble with minimum distance to mean.
    AbcMdm,
    /// Adaptive band-channel ensemble with tangent space + LDA.
    AbcTsLda,
    /// MEKT with MIC-based feature selection and LDA.
    MektPMicKLda {
        /// Number of features kept by MIC selection.
        feature_count: usize,
    },
}

/// Deep network architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkKind {
    /// `EEGNet`
    EegNet,
    /// LMDA-Net
    LmdaNet,
    /// Tensor-CSPNet
    TensorCspNet,
}

/// Deep-learning training hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeepNetwork {
    /// Architecture.
    pub kind: NetworkKind,
    /// Number of output classes.
    pub n_classes: usize,
    /// Input sampling rate (Hz).
    pub sampling_rate: f64,
    /// Mini-batch size.
    pub batch_size: usize,
    /// Optimizer learning rate.
    pub learning_rate: f64,
    /// Training epochs.
    pub max_epochs: usize,
}

impl DeepNetwork {
    /// Binary motor-imagery defaults (batch 32, lr 1e-3, 300 epochs).
    #[must_use]
    pub const fn binary(kind: NetworkKind, sampling_rate: f64) -> Self {
        Self {
            kind,
            n_classes: 2,
            sampling_rate,
            batch_size: 32,
            learning_rate: 0.001,
            max_epochs: 300,
        }
    }

    /// Override the epoch budget.
    #[must_use]
    pub const fn max_epochs(mut self, max_epochs: usize) -> Self {
        self.max_epochs = max_epochs;
        self
    }
}

/// Pipeline stages.
///
/// Each variant is a complete, valid stage combination. A staged pipeline
/// cannot carry an end-to-end method and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Stages {
    /// Alignment -> extraction -> classifier.
    Staged {
        /// Alignment method.
        alignment: Alignment,
        /// Feature extractor.
        extractor: FeatureExtractor,
        /// Classifier.
        classifier: Classifier,
    },
    /// Alignment -> end-to-end method.
    EndToEnd {
        /// Alignment method.
        alignment: Alignment,
        /// End-to-end method.
        method: EndToEndMethod,
    },
    /// Alignment -> deep network.
    Deep {
        /// Alignment method.
        alignment: Alignment,
        /// Network and training settings.
        network: DeepNetwork,
    },
}

impl Stages {
    /// Alignment -> extractor -> LDA.
    #[must_use]
    pub const fn staged(alignment: Alignment, extractor: FeatureExtractor) -> Self {
        Self::Staged {
            alignment,
            extractor,
            classifier: Classifier::Lda,
        }
    }

    /// Alignment -> end-to-end method.
    #[must_use]
    pub const fn end_to_end(alignment: Alignment, method: EndToEndMethod) -> Self {
        Self::EndToEnd { alignment, method }
    }

    /// Alignment -> deep network.
    #[must_use]
    pub const fn deep(alignment: Alignment, network: DeepNetwork) -> Self {
        Self::Deep { alignment, network }
    }

    /// Alignment stage shared by every variant.
    #[must_use]
    pub const fn alignment(&self) -> Alignment {
        match self {
            Self::Staged { alignment, .. }
            | Self::EndToEnd { alignment, .. }
            | Self::Deep { alignment, .. } => *alignment,
        }
    }
}

/// Channel selection applied during preprocessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelSelection {
    /// Riemannian spatial filtering.
    Rsf,
}

/// Band-pass / epoch window preprocessing for transfer pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Preprocessing {
    /// Resample rate (Hz).
    pub resample_rate: f64,
    /// Epoch window start (s).
    pub start_time: f64,
    /// Epoch window end (s).
    pub end_time: f64,
    /// Band-pass low cutoff (Hz).
    pub lowcut: f64,
    /// Band-pass high cutoff (Hz).
    pub highcut: f64,
    /// Optional channel selection.
    pub channel_selection: Option<ChannelSelection>,
}

impl Preprocessing {
    /// Motor-imagery baseline: 0-4 s window, 8-30 Hz band.
    #[must_use]
    pub const fn baseline(resample_rate: f64) -> Self {
        Self {
            resample_rate,
            start_time: 0.0,
            end_time: 4.0,
            lowcut: 8.0,
            highcut: 30.0,
            channel_selection: None,
        }
    }

    /// Same preprocessing with channel selection enabled.
    #[must_use]
    pub const fn with_channel_selection(mut self, selection: ChannelSelection) -> Self {
        self.channel_selection = Some(selection);
        self
    }
}

/// Worker-pool size handed opaquely to ensemble estimators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobParallelism {
    /// Use every available core.
    #[default]
    AllCores,
    /// Use exactly this many workers.
    Fixed(usize),
}

/// Single transfer pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferPipeline {
    /// Domain the pipeline is evaluated on.
    pub target_domain: DomainId,
    /// Stages.
    pub stages: Stages,
    /// Explicit preprocessing, `None` to feed trials as-is.
    pub preprocessing: Option<Preprocessing>,
}

/// Ensemble over sub-bands/channel subsets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsemblePipeline {
    /// Domain the ensemble is evaluated on.
    pub target_domain: DomainId,
    /// Stages of every ensemble member.
    pub stages: Stages,
    /// Resample rate (Hz).
    pub resample_rate: f64,
    /// Optional channel selection.
    pub channel_selection: Option<ChannelSelection>,
    /// Worker-pool size.
    pub jobs: JobParallelism,
}

/// Classifier family of a catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Family {
    /// Single transfer pipeline.
    Transfer(TransferPipeline),
    /// Ensemble of transfer pipelines.
    Ensemble(EnsemblePipeline),
}

impl Family {
    /// Short family name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Transfer(_) => "transfer",
            Self::Ensemble(_) => "ensemble",
        }
    }

    /// Stages of the pipeline.
    #[must_use]
    pub const fn stages(&self) -> &Stages {
        match self {
            Self::Transfer(p) => &p.stages,
            Self::Ensemble(p) => &p.stages,
        }
    }
}

/// Named model configuration.
///
/// Constructed once per catalog build and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    name: String,
    family: Family,
}

impl ModelConfig {
    /// Create a configuration.
    #[must_use]
    pub fn new(name: impl Into<String>, family: Family) -> Self {
        Self {
            name: name.into(),
            family,
        }
    }

    /// Transfer pipeline shorthand.
    #[must_use]
    pub fn transfer(
        name: impl Into<String>,
        target_domain: DomainId,
        stages: Stages,
        preprocessing: Option<Preprocessing>,
    ) -> Self {
        Self::new(
            name,
            Family::Transfer(TransferPipeline {
                target_domain,
                stages,
                preprocessing,
            }),
        )
    }

    /// Ensemble pipeline shorthand.
    #[must_use]
    pub fn ensemble(
        name: impl Into<String>,
        target_domain: DomainId,
        stages: Stages,
        resample_rate: f64,
        channel_selection: Option<ChannelSelection>,
        jobs: JobParallelism,
    ) -> Self {
        Self::new(
            name,
            Family::Ensemble(EnsemblePipeline {
                target_domain,
                stages,
                resample_rate,
                channel_selection,
                jobs,
            }),
        )
    }

    /// Display name, echoed verbatim into result records.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Classifier family.
    #[must_use]
    pub const fn family(&self) -> &Family {
        &self.family
    }
}
