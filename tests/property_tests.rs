use std::collections::BTreeSet;

use bhc::cluster::{
    cluster, BayesianScorer, BernoulliBeta, Cluster, ClusterHierarchy, MarginalLikelihood,
    NormalWishart, Scorer, TreeBuilder,
};
use bhc::lcs::{lcs_pairs, FnExtract, MultiLcs};
use bhc::math::{determinant, normalize_discrete};
use proptest::prelude::*;

#[derive(Default)]
struct Counter {
    leaves: usize,
    merges: usize,
    order: Vec<(usize, usize, usize)>,
}

impl TreeBuilder for Counter {
    fn on_leaf(&mut self, _leaf: &Cluster) {
        self.leaves += 1;
    }

    fn on_merge(&mut self, left: &Cluster, right: &Cluster, merged: &Cluster) {
        assert_eq!(merged.len(), left.len() + right.len());
        assert!(left.data_set().is_disjoint(right.data_set()));
        self.merges += 1;
        self.order.push((left.id(), right.id(), merged.id()));
    }
}

proptest! {
    #[test]
    fn prop_tree_shape(
        data in prop::collection::vec(prop::collection::vec(-10.0f64..10.0, 2), 1..12)
    ) {
        let scorer = BayesianScorer::new(NormalWishart::standard(2).unwrap());
        let mut counter = Counter::default();
        let root = cluster(&data, &scorer, &mut counter, None).unwrap();

        prop_assert_eq!(counter.leaves, data.len());
        prop_assert_eq!(counter.merges, data.len() - 1);
        prop_assert_eq!(root.data_set(), &(0..data.len()).collect::<BTreeSet<_>>());
    }

    #[test]
    fn prop_clustering_is_deterministic(
        data in prop::collection::vec(prop::collection::vec(any::<bool>(), 4), 1..10)
    ) {
        let scorer = BayesianScorer::new(BernoulliBeta::uniform(4).unwrap());
        let mut first = Counter::default();
        let mut second = Counter::default();
        cluster(&data, &scorer, &mut first, None).unwrap();
        cluster(&data, &scorer, &mut second, None).unwrap();
        prop_assert_eq!(first.order, second.order);
    }

    #[test]
    fn prop_tree_evidence_bounds_merged_evidence(
        data in prop::collection::vec(prop::collection::vec(-5.0f64..5.0, 1), 2..10),
        split in 1usize..9,
        pi in 0.05f64..0.95,
    ) {
        let split = split.min(data.len() - 1);
        let model = NormalWishart::standard(1).unwrap();
        let scorer = BayesianScorer::new(model.clone()).with_merge_prior(pi);

        let n = data.len();
        let left = Cluster::from_parts(0, (0..split).collect(), scorer_one(&scorer, &data, 0..split));
        let right = Cluster::from_parts(1, (split..n).collect(), scorer_one(&scorer, &data, split..n));
        let s = scorer.score_pair(&data, &left, &right).unwrap();

        let refs: Vec<&Vec<f64>> = data.iter().collect();
        let merged = pi * model.evaluate(&refs).unwrap();
        prop_assert!(s.p_tree >= merged);
        prop_assert!((s.p_merged - merged).abs() <= 1e-12 * merged.max(1e-300));
    }

    #[test]
    fn prop_hierarchy_partition_labels_every_point(
        data in prop::collection::vec(prop::collection::vec(any::<bool>(), 3), 1..10),
        threshold in 0.0f64..1.0,
    ) {
        let scorer = BayesianScorer::new(BernoulliBeta::uniform(3).unwrap());
        let mut tree = ClusterHierarchy::with_capacity(data.len());
        cluster(&data, &scorer, &mut tree, None).unwrap();

        let labels = tree.partition(threshold);
        prop_assert_eq!(labels.len(), data.len());
        let distinct: BTreeSet<usize> = labels.iter().copied().collect();
        prop_assert_eq!(distinct, (0..distinct_len(&labels)).collect::<BTreeSet<_>>());

        let mut leaves = tree.leaves();
        leaves.sort_unstable();
        prop_assert_eq!(leaves, (0..data.len()).collect::<Vec<_>>());
    }

    #[test]
    fn prop_lcs_of_identical_sequences(seq in prop::collection::vec(0u8..4, 0..40)) {
        let pairs = lcs_pairs(&seq, &seq, |a, b| a == b);
        prop_assert_eq!(pairs.len(), seq.len());
        let recovered: Vec<u8> = pairs.iter().map(|(a, _)| **a).collect();
        prop_assert_eq!(recovered, seq);
    }

    #[test]
    fn prop_lcs_is_symmetric_in_length(
        x in prop::collection::vec(0u8..4, 0..30),
        y in prop::collection::vec(0u8..4, 0..30),
    ) {
        let xy = lcs_pairs(&x, &y, |a, b| a == b).len();
        let yx = lcs_pairs(&y, &x, |a, b| a == b).len();
        prop_assert_eq!(xy, yx);
        prop_assert!(xy <= x.len().min(y.len()));
    }

    #[test]
    fn prop_multi_lcs_matches_classic_on_unit_hits(
        x in prop::collection::vec(0u8..4, 0..12),
        y in prop::collection::vec(0u8..4, 0..12),
    ) {
        let to_hits = |s: &[u8]| -> Vec<(u8, i64)> {
            s.iter().enumerate().map(|(i, &c)| (c, i as i64)).collect()
        };
        let (hx, hy) = (to_hits(&x), to_hits(&y));
        let extract = FnExtract::new(
            |h: &(u8, i64)| h.0,
            |h: &(u8, i64)| h.1,
            |h: &(u8, i64)| h.1,
            |_: &(u8, i64)| 1.0,
        );
        let mut lcs = MultiLcs::new([hx.as_slice(), hy.as_slice()], extract).unwrap();
        let best = lcs.calculate_best().unwrap();

        let classic = lcs_pairs(&x, &y, |a, b| a == b).len();
        prop_assert_eq!(best.len(), classic);
        prop_assert!((best.score - classic as f64).abs() < 1e-9);
    }

    #[test]
    fn prop_normalize_discrete_sums_to_one(
        w in prop::collection::vec(-2000.0f64..50.0, 1..20)
    ) {
        let p = normalize_discrete(&w);
        let sum: f64 = p.iter().sum();
        prop_assert!((sum - 1.0).abs() < 1e-9);
        prop_assert!(p.iter().all(|&x| (0.0..=1.0).contains(&x)));
    }

    #[test]
    fn prop_determinant_of_scaled_identity(k in 1usize..8, c in 0.5f64..2.0) {
        let m: Vec<Vec<f64>> = (0..k)
            .map(|i| (0..k).map(|j| if i == j { c } else { 0.0 }).collect())
            .collect();
        let det = determinant(&m).unwrap();
        prop_assert!((det - c.powi(k as i32)).abs() < 1e-9 * c.powi(k as i32).max(1.0));
    }
}

fn scorer_one<M: MarginalLikelihood<Vec<f64>>>(
    scorer: &BayesianScorer<M>,
    data: &[Vec<f64>],
    range: std::ops::Range<usize>,
) -> bhc::ClusterScore {
    let c = Cluster::from_parts(0, range.collect(), bhc::ClusterScore::MIN);
    scorer.score_one(data, &c).unwrap()
}

fn distinct_len(labels: &[usize]) -> usize {
    labels.iter().copied().collect::<BTreeSet<_>>().len()
}
