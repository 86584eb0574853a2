use super::bhc::Cluster;
use super::score::ClusterScore;
use crate::error::Result;

/// Common interface for hard clustering algorithms (one label per point).
pub trait Clustering<T> {
    /// Fit the model (if needed) and return one cluster label per input point.
    fn fit_predict(&self, data: &[T]) -> Result<Vec<usize>>;

    /// The configured number of clusters (if applicable).
    ///
    /// For algorithms that discover the number of clusters dynamically (e.g. BHC),
    /// this returns 0.
    fn n_clusters(&self) -> usize;
}

/// Scores clusters of data points drawn from a caller-owned slice.
///
/// Cluster data sets hold indices into `data`.
pub trait Scorer<T> {
    /// Score a cluster on its own; both score fields carry the same likelihood.
    fn score_one(&self, data: &[T], cluster: &Cluster) -> Result<ClusterScore>;

    /// Score the hypothesis of merging `left` and `right`.
    fn score_pair(&self, data: &[T], left: &Cluster, right: &Cluster) -> Result<ClusterScore>;

    /// A score every real score compares greater than.
    fn min_score(&self) -> ClusterScore {
        ClusterScore::MIN
    }
}

/// Receives the merge history of a clustering run.
///
/// `on_leaf` is called once per input point and `on_merge` once per merge, in the
/// order the clusters are created. Clusters passed in are never mutated afterwards.
pub trait TreeBuilder {
    /// A singleton cluster was created for one input point.
    fn on_leaf(&mut self, leaf: &Cluster);

    /// `left` and `right` were merged into `merged`.
    fn on_merge(&mut self, left: &Cluster, right: &Cluster, merged: &Cluster);
}

impl<B: TreeBuilder + ?Sized> TreeBuilder for &mut B {
    fn on_leaf(&mut self, leaf: &Cluster) {
        (**self).on_leaf(leaf);
    }

    fn on_merge(&mut self, left: &Cluster, right: &Cluster, merged: &Cluster) {
        (**self).on_merge(left, right, merged);
    }
}
