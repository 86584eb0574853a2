//! BHC: Bayesian Hierarchical Clustering.
//!
//! BHC (Heller & Ghahramani, 2005) is agglomerative clustering where the merge
//! criterion is a marginal-likelihood ratio instead of a distance. Every round scores
//! all pairs of active clusters and merges the pair whose union is most probable under
//! a single generative model, relative to keeping the two apart.
//!
//! # Algorithm Outline
//!
//! 1. **Leaves**: one cluster per data point, scored on its own and reported to the
//!    [`TreeBuilder`] with `on_leaf`.
//!
//! 2. **Best pair**: score every unordered pair of active clusters. The first pair
//!    encountered in iteration order wins ties.
//!
//! 3. **Merge**: the winning pair becomes one cluster whose data set is the union of
//!    the parents and whose score is the winning score. The builder sees `on_merge`,
//!    the parents are dropped, and the merged cluster joins the end of the active list.
//!
//! 4. Repeat until one cluster remains.
//!
//! # Complexity
//!
//! O(n²) pair scores per round and n − 1 rounds, so O(n³) model evaluations overall.
//! A [`CancellationToken`] is polled once per round.
//!
//! # References
//!
//! Heller, K. A., Ghahramani, Z. (2005). "Bayesian Hierarchical Clustering." ICML 2005.

use std::collections::BTreeSet;

use super::hierarchy::ClusterHierarchy;
use super::model::MarginalLikelihood;
use super::score::{BayesianScorer, ClusterScore, DEFAULT_MERGE_PRIOR};
use super::traits::{Clustering, Scorer, TreeBuilder};
use crate::cancel::{self, CancellationToken};
use crate::error::{Error, Result};

/// A set of data points (indices into the caller's slice) and its score.
#[derive(Clone, Debug, PartialEq)]
pub struct Cluster {
    id: usize,
    data_set: BTreeSet<usize>,
    score: ClusterScore,
}

impl Cluster {
    /// A singleton cluster holding data point `point`.
    pub fn leaf(id: usize, point: usize, score: ClusterScore) -> Self {
        Self {
            id,
            data_set: BTreeSet::from([point]),
            score,
        }
    }

    /// A cluster with an explicit data set.
    pub fn from_parts(id: usize, data_set: BTreeSet<usize>, score: ClusterScore) -> Self {
        Self {
            id,
            data_set,
            score,
        }
    }

    /// Creation-order identifier: leaves are `0..n`, merges follow.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Data point handles in this cluster.
    pub fn data_set(&self) -> &BTreeSet<usize> {
        &self.data_set
    }

    /// Number of data points.
    pub fn len(&self) -> usize {
        self.data_set.len()
    }

    /// Whether the cluster holds no points.
    pub fn is_empty(&self) -> bool {
        self.data_set.is_empty()
    }

    /// The cluster's score.
    pub fn score(&self) -> ClusterScore {
        self.score
    }

    fn merge(id: usize, left: &Cluster, right: &Cluster, score: ClusterScore) -> Self {
        let data_set: BTreeSet<usize> = left.data_set.union(&right.data_set).copied().collect();
        debug_assert_eq!(data_set.len(), left.len() + right.len());
        Self {
            id,
            data_set,
            score,
        }
    }
}

/// Run BHC over `data`, reporting the merge history to `builder`.
///
/// Returns the root cluster. Fails with [`Error::EmptyInput`] when `data` is empty,
/// with [`Error::Cancelled`] if `cancel` fires, or with whatever the scorer reports.
pub fn cluster<T, S, B>(
    data: &[T],
    scorer: &S,
    builder: &mut B,
    cancel: Option<&CancellationToken>,
) -> Result<Cluster>
where
    S: Scorer<T> + ?Sized,
    B: TreeBuilder + ?Sized,
{
    let n = data.len();
    if n == 0 {
        return Err(Error::EmptyInput);
    }
    log::info!("bhc: clustering {n} points");

    let mut active: Vec<Cluster> = Vec::with_capacity(n);
    for point in 0..n {
        let mut leaf = Cluster::leaf(point, point, ClusterScore::MIN);
        leaf.score = scorer.score_one(data, &leaf)?;
        builder.on_leaf(&leaf);
        active.push(leaf);
    }

    let mut next_id = n;
    while active.len() > 1 {
        cancel::check(cancel)?;

        let mut best_score = scorer.min_score();
        let mut best: Option<(usize, usize, ClusterScore)> = None;
        let mut first: Option<(usize, usize, ClusterScore)> = None;
        for i in 0..active.len() {
            for j in (i + 1)..active.len() {
                let score = scorer.score_pair(data, &active[i], &active[j])?;
                first.get_or_insert((i, j, score));
                if score.is_better_than(&best_score) {
                    best_score = score;
                    best = Some((i, j, score));
                }
            }
        }

        // Nothing beat the floor (every pair degenerate): merge the first pair anyway.
        let Some((i, j, best_score)) = best.or(first) else {
            break;
        };

        // j > i, so removing j first leaves i in place.
        let right = active.remove(j);
        let left = active.remove(i);
        let merged = Cluster::merge(next_id, &left, &right, best_score);
        next_id += 1;

        log::debug!(
            "bhc: merged {} ({} pts) + {} ({} pts) -> {} (r = {:.4})",
            left.id,
            left.len(),
            right.id,
            right.len(),
            merged.id,
            best_score.merge_posterior()
        );

        builder.on_merge(&left, &right, &merged);
        active.push(merged);
    }

    let root = active.pop().ok_or(Error::EmptyInput)?;
    debug_assert_eq!(root.len(), n);
    Ok(root)
}

/// BHC parameters.
#[derive(Clone, Debug)]
pub struct BhcParams {
    /// Prior probability `π` that two clusters come from one component.
    pub merge_prior: f64,

    /// Merge posterior at or above which a subtree is kept as one flat cluster.
    pub cut_threshold: f64,
}

impl Default for BhcParams {
    fn default() -> Self {
        Self {
            merge_prior: DEFAULT_MERGE_PRIOR,
            cut_threshold: 0.5,
        }
    }
}

/// Bayesian hierarchical clustering with a fixed marginal-likelihood model.
#[derive(Clone, Debug)]
pub struct Bhc<M> {
    model: M,
    params: BhcParams,
    cancel: Option<CancellationToken>,
}

impl<M> Bhc<M> {
    /// Create a BHC clusterer with default parameters.
    ///
    /// Defaults: `merge_prior = 0.5`, `cut_threshold = 0.5`.
    pub fn new(model: M) -> Self {
        Self::with_params(model, BhcParams::default())
    }

    /// Create a BHC clusterer with explicit parameters.
    pub fn with_params(model: M, params: BhcParams) -> Self {
        Self {
            model,
            params,
            cancel: None,
        }
    }

    /// Set the merge prior `π`.
    pub fn with_merge_prior(mut self, merge_prior: f64) -> Self {
        self.params.merge_prior = merge_prior;
        self
    }

    /// Set the merge posterior used to cut the tree into flat clusters.
    pub fn with_cut_threshold(mut self, cut_threshold: f64) -> Self {
        self.params.cut_threshold = cut_threshold;
        self
    }

    /// Poll `token` once per merge round.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Current parameters.
    pub fn params(&self) -> &BhcParams {
        &self.params
    }

    /// Build the full merge tree.
    ///
    /// The merge prior is checked up front, so a bad value is reported even when the
    /// input has a single point and nothing is merged.
    pub fn fit<T>(&self, data: &[T]) -> Result<ClusterHierarchy>
    where
        M: MarginalLikelihood<T>,
    {
        let scorer = BayesianScorer::new(&self.model).with_merge_prior(self.params.merge_prior);
        scorer.check_merge_prior()?;
        let mut hierarchy = ClusterHierarchy::with_capacity(data.len());
        cluster(data, &scorer, &mut hierarchy, self.cancel.as_ref())?;
        Ok(hierarchy)
    }
}

impl<T, M: MarginalLikelihood<T>> Clustering<T> for Bhc<M> {
    fn fit_predict(&self, data: &[T]) -> Result<Vec<usize>> {
        if !(0.0..=1.0).contains(&self.params.cut_threshold) {
            return Err(Error::InvalidParameter {
                name: "cut_threshold",
                message: "must lie in [0, 1]",
            });
        }
        Ok(self.fit(data)?.partition(self.params.cut_threshold))
    }

    /// BHC discovers the number of clusters, so this returns 0.
    fn n_clusters(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::model::{BernoulliBeta, NormalWishart};

    /// Records callbacks as (kind, ids) for inspection.
    #[derive(Default)]
    struct Recorder {
        leaves: Vec<usize>,
        merges: Vec<(usize, usize, usize, BTreeSet<usize>)>,
    }

    impl TreeBuilder for Recorder {
        fn on_leaf(&mut self, leaf: &Cluster) {
            self.leaves.push(leaf.id());
        }

        fn on_merge(&mut self, left: &Cluster, right: &Cluster, merged: &Cluster) {
            self.merges
                .push((left.id(), right.id(), merged.id(), merged.data_set().clone()));
        }
    }

    fn two_groups() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.0],
            vec![10.0, 10.0],
            vec![0.1, 0.1],
            vec![10.1, 10.1],
        ]
    }

    #[test]
    fn five_points_merge_four_times() {
        let data = vec![
            vec![1.0, 1.0],
            vec![-1.0, 1.0],
            vec![1.0, -1.0],
            vec![-1.0, -1.0],
            vec![0.0, 0.0],
        ];
        let model = NormalWishart::new(
            vec![0.0, 0.0],
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            1.0,
            3.0,
        )
        .unwrap();
        let scorer = BayesianScorer::new(model);
        let mut rec = Recorder::default();

        let root = cluster(&data, &scorer, &mut rec, None).unwrap();

        assert_eq!(rec.leaves, vec![0, 1, 2, 3, 4]);
        assert_eq!(rec.merges.len(), 4);
        let merged_ids: Vec<usize> = rec.merges.iter().map(|m| m.2).collect();
        assert_eq!(merged_ids, vec![5, 6, 7, 8]);
        assert_eq!(root.id(), 8);
        assert_eq!(root.data_set(), &(0..5).collect::<BTreeSet<_>>());
    }

    #[test]
    fn separated_groups_merge_internally_first() {
        let data = two_groups();
        let scorer = BayesianScorer::new(NormalWishart::standard(2).unwrap());
        let mut rec = Recorder::default();

        cluster(&data, &scorer, &mut rec, None).unwrap();

        let group_a: BTreeSet<usize> = [0, 2].into_iter().collect();
        let group_b: BTreeSet<usize> = [1, 3].into_iter().collect();
        let first_two: Vec<&BTreeSet<usize>> = rec.merges[..2].iter().map(|m| &m.3).collect();
        assert!(first_two.contains(&&group_a));
        assert!(first_two.contains(&&group_b));
    }

    #[test]
    fn single_point_has_no_merges() {
        let data = vec![vec![true, false]];
        let scorer = BayesianScorer::new(BernoulliBeta::uniform(2).unwrap());
        let mut rec = Recorder::default();

        let root = cluster(&data, &scorer, &mut rec, None).unwrap();
        assert_eq!(rec.leaves, vec![0]);
        assert!(rec.merges.is_empty());
        assert_eq!(root.len(), 1);
        assert!((root.score().p_tree - 0.25).abs() < 1e-12);
    }

    #[test]
    fn empty_input() {
        let data: Vec<Vec<f64>> = vec![];
        let scorer = BayesianScorer::new(NormalWishart::standard(2).unwrap());
        let mut rec = Recorder::default();
        assert!(matches!(
            cluster(&data, &scorer, &mut rec, None),
            Err(Error::EmptyInput)
        ));
    }

    #[test]
    fn dimension_mismatch_surfaces() {
        let data = vec![vec![0.0, 0.0], vec![1.0]];
        let scorer = BayesianScorer::new(NormalWishart::standard(2).unwrap());
        let mut rec = Recorder::default();
        assert!(matches!(
            cluster(&data, &scorer, &mut rec, None),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn cancelled_run_stops() {
        let data = two_groups();
        let token = CancellationToken::new();
        token.cancel();

        let bhc = Bhc::new(NormalWishart::standard(2).unwrap()).with_cancellation(token);
        assert!(matches!(bhc.fit(&data), Err(Error::Cancelled)));
    }

    #[test]
    fn identical_points_still_build_a_tree() {
        let data = vec![vec![true; 3]; 4];
        let scorer = BayesianScorer::new(BernoulliBeta::uniform(3).unwrap());
        let mut rec = Recorder::default();

        let root = cluster(&data, &scorer, &mut rec, None).unwrap();
        assert_eq!(rec.merges.len(), 3);
        assert_eq!(root.len(), 4);
    }

    #[test]
    fn ties_go_to_the_first_pair() {
        // All points identical: every first-round pair scores the same.
        let data = vec![vec![false]; 3];
        let scorer = BayesianScorer::new(BernoulliBeta::uniform(1).unwrap());
        let mut rec = Recorder::default();

        cluster(&data, &scorer, &mut rec, None).unwrap();
        assert_eq!((rec.merges[0].0, rec.merges[0].1), (0, 1));
        assert_eq!((rec.merges[1].0, rec.merges[1].1), (2, 3));
    }

    #[test]
    fn fit_predict_recovers_two_groups() {
        let data = two_groups();
        let bhc = Bhc::new(NormalWishart::standard(2).unwrap());
        let labels = bhc.fit_predict(&data).unwrap();

        assert_eq!(labels.len(), 4);
        assert_eq!(labels[0], labels[2]);
        assert_eq!(labels[1], labels[3]);
        assert_ne!(labels[0], labels[1]);
        assert_eq!(Clustering::<Vec<f64>>::n_clusters(&bhc), 0);
    }

    #[test]
    fn fit_predict_rejects_bad_params() {
        let data = two_groups();
        let bhc = Bhc::new(NormalWishart::standard(2).unwrap()).with_cut_threshold(1.5);
        assert!(bhc.fit_predict(&data).is_err());

        let bhc = Bhc::new(NormalWishart::standard(2).unwrap()).with_merge_prior(0.0);
        assert!(bhc.fit_predict(&data).is_err());
    }

    #[test]
    fn merge_prior_is_checked_without_any_merge() {
        let data = vec![vec![0.0, 0.0]];
        let bhc = Bhc::new(NormalWishart::standard(2).unwrap()).with_merge_prior(0.0);
        assert!(matches!(
            bhc.fit_predict(&data),
            Err(Error::InvalidParameter { name: "merge_prior", .. })
        ));
        assert!(bhc.fit(&data).is_err());
    }

    /// Every pair scores zero total evidence.
    struct Degenerate;

    impl Scorer<u8> for Degenerate {
        fn score_one(&self, _data: &[u8], _cluster: &Cluster) -> Result<ClusterScore> {
            Ok(ClusterScore::singleton(1.0))
        }

        fn score_pair(
            &self,
            _data: &[u8],
            _left: &Cluster,
            _right: &Cluster,
        ) -> Result<ClusterScore> {
            Ok(ClusterScore::singleton(0.0))
        }
    }

    #[test]
    fn all_degenerate_rounds_merge_the_first_pair() {
        let data = [1u8, 2, 3, 4];
        let mut rec = Recorder::default();

        let root = cluster(&data, &Degenerate, &mut rec, None).unwrap();
        assert_eq!(root.len(), 4);
        let pairs: Vec<(usize, usize)> = rec.merges.iter().map(|m| (m.0, m.1)).collect();
        assert_eq!(pairs, vec![(0, 1), (2, 3), (4, 5)]);
        assert!(root.score().is_degenerate());
    }
}
