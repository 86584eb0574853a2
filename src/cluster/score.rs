//! Bayesian merge scoring.
//!
//! For clusters `A` and `B` with union `D = A ∪ B`, BHC compares the hypothesis that
//! `D` was generated by a single model, weighted by the merge prior `π`, against
//! every tree-consistent split of `D`:
//!
//! ```text
//! p_merged = π · P(D | H₁)
//! p_tree   = p_merged + (1 − π) · p_tree(A) · p_tree(B)
//! r        = p_merged / p_tree
//! ```
//!
//! `r` is the posterior probability of the merge; the engine merges the pair with the
//! largest `r` first.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use super::bhc::Cluster;
use super::model::MarginalLikelihood;
use super::traits::Scorer;
use crate::error::{Error, Result};

/// Default merge prior `π`.
pub const DEFAULT_MERGE_PRIOR: f64 = 0.5;

/// Merged-hypothesis and total evidence for one cluster.
///
/// Both fields are plain probabilities, not logs. For large clusters of
/// high-dimensional data they can underflow to zero; such a score is degenerate,
/// ranks below every other score, and reports a merge posterior of 0 even though the
/// true ratio is well defined.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClusterScore {
    /// `P(D | merged hypothesis)`, already weighted by the merge prior.
    pub p_merged: f64,
    /// `P(D | tree)`: evidence summed over the merged and split hypotheses.
    pub p_tree: f64,
}

impl ClusterScore {
    /// Compares lower than every score computed from data.
    pub const MIN: ClusterScore = ClusterScore {
        p_merged: -1.0,
        p_tree: 1.0,
    };

    /// A score whose two fields coincide, as for a singleton.
    pub fn singleton(p: f64) -> Self {
        Self {
            p_merged: p,
            p_tree: p,
        }
    }

    /// Whether the score cannot be ranked (zero total evidence).
    pub fn is_degenerate(&self) -> bool {
        self.p_tree == 0.0
    }

    /// `p_merged / p_tree`, or 0 for a degenerate score.
    pub fn merge_posterior(&self) -> f64 {
        if self.is_degenerate() {
            0.0
        } else {
            self.p_merged / self.p_tree
        }
    }

    /// Order by merge posterior. A degenerate score is below every other score and
    /// equal to any other degenerate score.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self.is_degenerate(), other.is_degenerate()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => {
                let ours = self.p_merged / self.p_tree;
                let theirs = other.p_merged / other.p_tree;
                ours.total_cmp(&theirs)
            }
        }
    }

    /// Strictly greater under [`compare`](Self::compare).
    pub fn is_better_than(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Greater
    }
}

/// Scores clusters with a marginal-likelihood model and a fixed merge prior.
#[derive(Clone, Debug)]
pub struct BayesianScorer<M> {
    model: M,
    merge_prior: f64,
}

impl<M> BayesianScorer<M> {
    /// Create a scorer with the default merge prior of 0.5.
    pub fn new(model: M) -> Self {
        Self {
            model,
            merge_prior: DEFAULT_MERGE_PRIOR,
        }
    }

    /// Set the merge prior `π`; must lie strictly between 0 and 1.
    pub fn with_merge_prior(mut self, merge_prior: f64) -> Self {
        self.merge_prior = merge_prior;
        self
    }

    /// The configured merge prior.
    pub fn merge_prior(&self) -> f64 {
        self.merge_prior
    }

    /// The underlying model.
    pub fn model(&self) -> &M {
        &self.model
    }

    pub(crate) fn check_merge_prior(&self) -> Result<()> {
        if self.merge_prior > 0.0 && self.merge_prior < 1.0 {
            Ok(())
        } else {
            Err(Error::InvalidParameter {
                name: "merge_prior",
                message: "must lie strictly between 0 and 1",
            })
        }
    }
}

fn gather<'a, T>(data: &'a [T], handles: &BTreeSet<usize>) -> Result<Vec<&'a T>> {
    handles
        .iter()
        .map(|&i| {
            data.get(i).ok_or(Error::InvalidParameter {
                name: "data_set",
                message: "data point handle out of range",
            })
        })
        .collect()
}

impl<T, M: MarginalLikelihood<T>> Scorer<T> for BayesianScorer<M> {
    fn score_one(&self, data: &[T], cluster: &Cluster) -> Result<ClusterScore> {
        let points = gather(data, cluster.data_set())?;
        Ok(ClusterScore::singleton(self.model.evaluate(&points)?))
    }

    fn score_pair(&self, data: &[T], left: &Cluster, right: &Cluster) -> Result<ClusterScore> {
        self.check_merge_prior()?;
        debug_assert_ne!(left.id(), right.id(), "a cluster cannot merge with itself");

        // Set union: a handle present in both clusters is counted once.
        let union: BTreeSet<usize> = left.data_set().union(right.data_set()).copied().collect();
        let points = gather(data, &union)?;

        let pi = self.merge_prior;
        let p_merged = pi * self.model.evaluate(&points)?;
        let p_tree = p_merged + (1.0 - pi) * left.score().p_tree * right.score().p_tree;
        Ok(ClusterScore { p_merged, p_tree })
    }
}
