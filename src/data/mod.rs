//! Trial data, session grouping and the dataset collaborator contract
//!
//! ## Data Model
//!
//! ```text
//! Dataset ──get_data──> SubjectData (trials, labels, session per trial)
//!                            │ into_sessions(max_sessions)
//!                            ▼
//!                    [SessionData; N] ──encode_sessions──> EncodedDataset
//! ```
//!
//! Dataset file I/O, filtering and epoching live outside this crate. A
//! [`Dataset`] implementation only has to hand back trial tensors with a
//! session label per trial.

mod encoder;

pub use encoder::{encode_sessions, EncodedDataset};

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// One recorded trial: a dense `f32` tensor with an explicit shape.
///
/// For EEG this is usually `[channels, samples]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    shape: Vec<usize>,
    values: Vec<f32>,
}

impl Trial {
    /// Create a trial from a shape and row-major values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if the number of values does not
    /// match the product of the shape.
    pub fn new(shape: Vec<usize>, values: Vec<f32>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(Error::ShapeMismatch(format!(
                "trial shape {shape:?} needs {expected} values, got {}",
                values.len()
            )));
        }
        Ok(Self { shape, values })
    }

    /// Create a rank-1 trial (feature vector).
    #[must_use]
    pub fn from_vector(values: Vec<f32>) -> Self {
        Self {
            shape: vec![values.len()],
            values,
        }
    }

    /// Per-trial shape.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Row-major values.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// Categorical trial label (e.g. `left_hand`, `right_hand`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(String);

impl Label {
    /// Create a label.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the label text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Recording session identifier as reported by the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Create a session identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Subject identifier within a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub u32);

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transfer-learning domain, one per consumed session.
///
/// Holds the one-based ordinal of the session in encounter order and renders
/// as `S1`, `S2`, ... On the wire it is written as that string; bare integers
/// are accepted when reading older ledgers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomainId(u32);

impl DomainId {
    /// Domain for the session at zero-based encounter position `position`.
    #[must_use]
    pub fn from_position(position: usize) -> Self {
        Self(u32::try_from(position + 1).unwrap_or(u32::MAX))
    }

    /// One-based ordinal.
    #[must_use]
    pub const fn ordinal(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

impl FromStr for DomainId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s.strip_prefix('S').unwrap_or(s);
        digits
            .parse::<u32>()
            .map(Self)
            .map_err(|e| Error::InvalidConfig(format!("invalid domain id {s:?}: {e}")))
    }
}

impl Serialize for DomainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DomainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Self(n)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Trials and labels of one session.
#[derive(Debug, Clone)]
pub struct SessionData {
    /// Session the trials were recorded in.
    pub session: SessionId,
    /// Trials in recording order.
    pub trials: Vec<Trial>,
    /// One label per trial.
    pub labels: Vec<Label>,
}

/// Everything a dataset returns for one subject.
#[derive(Debug, Clone, Default)]
pub struct SubjectData {
    /// All trials of the subject.
    pub trials: Vec<Trial>,
    /// One label per trial.
    pub labels: Vec<Label>,
    /// One session per trial.
    pub sessions: Vec<SessionId>,
}

impl SubjectData {
    /// Number of trials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    /// Whether the subject has no trials.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Distinct sessions in order of first appearance.
    #[must_use]
    pub fn session_order(&self) -> Vec<SessionId> {
        let mut order: Vec<SessionId> = Vec::new();
        for session in &self.sessions {
            if !order.contains(session) {
                order.push(session.clone());
            }
        }
        order
    }

    /// Group trials by session, keeping at most the first `max_sessions`
    /// sessions encountered. Within-session trial order is preserved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if trials, labels and sessions do not
    /// have the same length.
    pub fn into_sessions(self, max_sessions: usize) -> Result<Vec<SessionData>> {
        if self.labels.len() != self.trials.len() || self.sessions.len() != self.trials.len() {
            return Err(Error::ShapeMismatch(format!(
                "subject data has {} trials, {} labels, {} session tags",
                self.trials.len(),
                self.labels.len(),
                self.sessions.len()
            )));
        }

        let mut groups: Vec<SessionData> = self
            .session_order()
            .into_iter()
            .take(max_sessions)
            .map(|session| SessionData {
                session,
                trials: Vec::new(),
                labels: Vec::new(),
            })
            .collect();

        let rows = self.trials.into_iter().zip(self.labels).zip(self.sessions);
        for ((trial, label), session) in rows {
            if let Some(group) = groups.iter_mut().find(|g| g.session == session) {
                group.trials.push(trial);
                group.labels.push(label);
            }
        }

        Ok(groups)
    }
}

/// Dataset collaborator contract.
///
/// Implementations own download, caching, filtering and epoching.
pub trait Dataset {
    /// Dataset name, used for the results directory.
    fn name(&self) -> &str;

    /// Subjects in sweep order.
    fn subject_list(&self) -> Vec<SubjectId>;

    /// Load the trials of the given subjects.
    ///
    /// # Errors
    ///
    /// Any loading failure; the sweep skips the subject.
    fn get_data(&self, subjects: &[SubjectId]) -> anyhow::Result<SubjectData>;
}
