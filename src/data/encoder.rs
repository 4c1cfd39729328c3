//! Domain encoder: per-session arrays -> one dataset + domain ids

use super::{DomainId, Label, SessionData, Trial};
use crate::{Error, Result};

/// Concatenated trials of all consumed sessions with one domain id per trial.
#[derive(Debug, Clone)]
pub struct EncodedDataset {
    trials: Vec<Trial>,
    labels: Vec<Label>,
    domains: Vec<DomainId>,
}

/// Concatenate sessions in input order and tag every trial with the domain of
/// its session.
///
/// Session `i` (zero-based) becomes domain `S{i+1}`. No reordering, no
/// randomization.
///
/// # Errors
///
/// - [`Error::InsufficientSessions`] with fewer than two sessions
/// - [`Error::ShapeMismatch`] if a session is empty, has a label count that
///   differs from its trial count, or any trial shape differs from the first
pub fn encode_sessions(sessions: Vec<SessionData>) -> Result<EncodedDataset> {
    if sessions.len() < 2 {
        return Err(Error::InsufficientSessions {
            found: sessions.len(),
        });
    }

    let reference_shape = sessions
        .iter()
        .find_map(|s| s.trials.first())
        .map(|t| t.shape().to_vec())
        .unwrap_or_default();

    let total: usize = sessions.iter().map(|s| s.trials.len()).sum();
    let mut trials = Vec::with_capacity(total);
    let mut labels = Vec::with_capacity(total);
    let mut domains = Vec::with_capacity(total);

    for (position, session) in sessions.into_iter().enumerate() {
        if session.trials.is_empty() {
            return Err(Error::ShapeMismatch(format!(
                "session {} has no trials",
                session.session
            )));
        }
        if session.labels.len() != session.trials.len() {
            return Err(Error::ShapeMismatch(format!(
                "session {} has {} trials but {} labels",
                session.session,
                session.trials.len(),
                session.labels.len()
            )));
        }
        if let Some(bad) = session.trials.iter().find(|t| t.shape() != reference_shape.as_slice()) {
            return Err(Error::ShapeMismatch(format!(
                "session {} has trial shape {:?}, expected {:?}",
                session.session,
                bad.shape(),
                reference_shape
            )));
        }

        let domain = DomainId::from_position(position);
        domains.extend(std::iter::repeat(domain).take(session.trials.len()));
        trials.extend(session.trials);
        labels.extend(session.labels);
    }

    Ok(EncodedDataset {
        trials,
        labels,
        domains,
    })
}

impl EncodedDataset {
    /// Number of trials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    /// Whether there are no trials (never true for an encoded dataset).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// All trials.
    #[must_use]
    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    /// All labels.
    #[must_use]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Domain id per trial.
    #[must_use]
    pub fn domains(&self) -> &[DomainId] {
        &self.domains
    }

    /// Distinct domains in encounter order.
    #[must_use]
    pub fn unique_domains(&self) -> Vec<DomainId> {
        let mut unique = self.domains.clone();
        unique.dedup();
        unique
    }

    /// Domain of the last consumed session.
    #[must_use]
    pub fn target_domain(&self) -> DomainId {
        // Non-empty by construction.
        self.domains
            .last()
            .copied()
            .unwrap_or_else(|| DomainId::from_position(0))
    }

    /// Indices of trials outside `target`.
    #[must_use]
    pub fn source_indices(&self, target: DomainId) -> Vec<usize> {
        self.indices_where(|d| d != target)
    }

    /// Indices of trials inside `target`.
    #[must_use]
    pub fn target_indices(&self, target: DomainId) -> Vec<usize> {
        self.indices_where(|d| d == target)
    }

    fn indices_where(&self, keep: impl Fn(DomainId) -> bool) -> Vec<usize> {
        self.domains
            .iter()
            .enumerate()
            .filter(|(_, d)| keep(**d))
            .map(|(i, _)| i)
            .collect()
    }

    /// Gather trials and labels at `indices`, in the given order.
    ///
    /// Indices come from a split over this dataset, so they are in range.
    #[must_use]
    pub fn select(&self, indices: &[usize]) -> (Vec<Trial>, Vec<Label>) {
        indices
            .iter()
            .filter_map(|&i| Some((self.trials.get(i)?.clone(), self.labels.get(i)?.clone())))
            .unzip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SessionId;

    fn session(name: &str, n: usize, width: usize) -> SessionData {
        SessionData {
            session: SessionId::new(name),
            trials: (0..n).map(|_| Trial::from_vector(vec![0.0; width])).collect(),
            labels: (0..n)
                .map(|i| Label::new(if i % 2 == 0 { "left_hand" } else { "right_hand" }))
                .collect(),
        }
    }

    #[test]
    fn test_encode_two_sessions() {
        let sessions = vec![session("0train", 3, 4), session("1test", 2, 4)];
        let encoded = encode_sessions(sessions).unwrap();
        assert_eq!(encoded.len(), 5);
        assert_eq!(encoded.labels().len(), 5);
        let names: Vec<String> = encoded.domains().iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["S1", "S1", "S1", "S2", "S2"]);
        assert_eq!(encoded.unique_domains().len(), 2);
        assert_eq!(encoded.target_domain().to_string(), "S2");
        assert_eq!(encoded.source_indices(encoded.target_domain()), vec![0, 1, 2]);
        assert_eq!(encoded.target_indices(encoded.target_domain()), vec![3, 4]);
    }

    #[test]
    fn test_encode_rejects_empty_session() {
        let err = encode_sessions(vec![session("a", 3, 4), session("b", 0, 4)]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch(_)));
    }

    #[test]
    fn test_encode_rejects_shape_mismatch() {
        let err = encode_sessions(vec![session("a", 3, 4), session("b", 3, 5)]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch(_)));
    }

    #[test]
    fn test_encode_rejects_single_session() {
        let err = encode_sessions(vec![session("a", 3, 4)]).unwrap_err();
        assert!(matches!(err, Error::InsufficientSessions { found: 1 }));
    }

    #[test]
    fn test_select_preserves_order() {
        let mut first = session("a", 2, 1);
        first.labels = vec![Label::new("x"), Label::new("y")];
        let encoded = encode_sessions(vec![first, session("b", 2, 1)]).unwrap();
        let (trials, labels) = encoded.select(&[1, 0]);
        assert_eq!(trials.len(), 2);
        assert_eq!(labels[0].as_str(), "y");
        assert_eq!(labels[1].as_str(), "x");
    }
}
