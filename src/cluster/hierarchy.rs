use super::bhc::Cluster;
use super::score::ClusterScore;
use super::traits::TreeBuilder;

/// A node in a BHC merge tree.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterNode {
    /// Node identifier (also the index into the hierarchy's `nodes` array).
    pub id: usize,

    /// Child node ids (empty for leaves, length 2 for internal merge nodes).
    pub children: Vec<usize>,

    /// The data point a leaf stands for (`None` for internal nodes).
    pub point: Option<usize>,

    /// Score of the cluster this node represents.
    pub score: ClusterScore,

    /// Number of leaf points under this node.
    pub size: usize,
}

impl ClusterNode {
    /// Whether this node is a leaf.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Append-only merge tree built from [`TreeBuilder`] callbacks.
///
/// Node ids equal cluster ids, so for `n` points the leaves are `0..n` and the
/// `n - 1` merge nodes follow in merge order; the last node is the root.
#[derive(Clone, Debug, Default)]
pub struct ClusterHierarchy {
    nodes: Vec<ClusterNode>,
}

impl ClusterHierarchy {
    /// Create an empty hierarchy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty hierarchy sized for `num_points` leaves.
    pub fn with_capacity(num_points: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(num_points.saturating_mul(2).saturating_sub(1)),
        }
    }

    /// Return the root node id (if any).
    pub fn root(&self) -> Option<usize> {
        self.nodes.len().checked_sub(1)
    }

    /// Access all nodes.
    pub fn nodes(&self) -> &[ClusterNode] {
        &self.nodes
    }

    /// Number of leaves.
    pub fn num_points(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Data points in left-to-right leaf order (a dendrogram ordering).
    pub fn leaves(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.num_points());
        let mut stack: Vec<usize> = self.root().into_iter().collect();
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if let Some(point) = node.point {
                out.push(point);
            }
            // Push right first so the left subtree is visited first.
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Merge posteriors `r_k` of the internal nodes, in merge order.
    pub fn merge_posteriors(&self) -> Vec<f64> {
        self.nodes
            .iter()
            .filter(|n| !n.is_leaf())
            .map(|n| n.score.merge_posterior())
            .collect()
    }

    /// Cut the tree into flat clusters and return one label per data point.
    ///
    /// Starting at the root, a subtree becomes one cluster when it is a leaf or its
    /// merge posterior is at least `threshold`; otherwise both children are cut
    /// recursively. Labels are numbered in left-to-right order.
    pub fn partition(&self, threshold: f64) -> Vec<usize> {
        let n = self.num_points();
        let mut labels = vec![0usize; n];
        let mut next_label = 0;

        let mut stack: Vec<usize> = self.root().into_iter().collect();
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if node.is_leaf() || node.score.merge_posterior() >= threshold {
                for point in self.points_under(id) {
                    labels[point] = next_label;
                }
                next_label += 1;
            } else {
                stack.extend(node.children.iter().rev());
            }
        }
        labels
    }

    fn points_under(&self, id: usize) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.nodes[id].size);
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if let Some(point) = node.point {
                out.push(point);
            }
            stack.extend(node.children.iter().copied());
        }
        out
    }
}

impl TreeBuilder for ClusterHierarchy {
    fn on_leaf(&mut self, leaf: &Cluster) {
        debug_assert_eq!(leaf.id(), self.nodes.len());
        self.nodes.push(ClusterNode {
            id: leaf.id(),
            children: Vec::new(),
            point: leaf.data_set().iter().next().copied(),
            score: leaf.score(),
            size: leaf.len(),
        });
    }

    fn on_merge(&mut self, left: &Cluster, right: &Cluster, merged: &Cluster) {
        debug_assert_eq!(merged.id(), self.nodes.len());
        self.nodes.push(ClusterNode {
            id: merged.id(),
            children: vec![left.id(), right.id()],
            point: None,
            score: merged.score(),
            size: merged.len(),
        });
    }
}
