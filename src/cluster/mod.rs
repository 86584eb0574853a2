//! Bayesian hierarchical clustering.
//!
//! ## Marginal likelihood instead of distance
//!
//! Classical agglomerative clustering merges the two closest clusters under some
//! linkage rule. BHC instead asks a probabilistic question for every candidate pair:
//! *is the union better explained by one generative model than by the two subtrees
//! kept apart?* The answer is a posterior probability `r ∈ [0, 1]`, and the pair with
//! the highest `r` is merged.
//!
//! This has two practical consequences:
//!
//! - No distance metric or linkage needs choosing; the model's prior does that work.
//! - The tree carries its own stopping rule: subtrees whose merges have `r ≥ 0.5`
//!   are coherent clusters, so a flat partition falls out without picking `k`.
//!
//! ## Pieces
//!
//! - [`MarginalLikelihood`]: `P(D)` for a set of points under a conjugate prior
//!   ([`NormalWishart`], [`BernoulliBeta`], [`DirichletMultinomial`]).
//! - [`BayesianScorer`]: turns a model and a merge prior into [`ClusterScore`]s.
//! - [`cluster`](fn@cluster): the O(n³) engine, reporting to any [`TreeBuilder`].
//! - [`ClusterHierarchy`]: the standard tree builder, with a posterior cut.
//! - [`Bhc`]: all of the above behind the [`Clustering`] trait.
//!
//! ## Usage
//!
//! ```rust
//! use bhc::cluster::{Bhc, Clustering, NormalWishart};
//!
//! let data = vec![
//!     vec![0.0, 0.0],
//!     vec![0.1, 0.1],
//!     vec![10.0, 10.0],
//!     vec![10.1, 10.1],
//! ];
//!
//! let bhc = Bhc::new(NormalWishart::standard(2).unwrap());
//! let labels = bhc.fit_predict(&data).unwrap();
//! assert_eq!(labels[0], labels[1]);
//! assert_ne!(labels[0], labels[2]);
//!
//! // The whole merge tree is available too.
//! let tree = bhc.fit(&data).unwrap();
//! assert_eq!(tree.nodes().len(), 2 * data.len() - 1);
//! ```

mod bhc;
mod hierarchy;
mod model;
mod score;
mod traits;

pub use bhc::{cluster, Bhc, BhcParams, Cluster};
pub use hierarchy::{ClusterHierarchy, ClusterNode};
pub use model::{BernoulliBeta, DirichletMultinomial, MarginalLikelihood, NormalWishart};
pub use score::{BayesianScorer, ClusterScore, DEFAULT_MERGE_PRIOR};
pub use traits::{Clustering, Scorer, TreeBuilder};
