//! Bayesian clustering and alignment primitives for motif analysis.
//!
//! `bhc` scores how well groups of observations (binding-site feature vectors, motif
//! hit profiles, count vectors) are explained by a single generative model, and uses
//! that score to build a Bayesian hierarchical clustering. It also aligns ordered motif
//! hits between sequences with longest-common-subsequence dynamic programming.
//!
//! The public API is split into:
//! - [`cluster`]: marginal-likelihood models, the Bayesian merge scorer, and the BHC engine
//! - [`lcs`]: two-sequence and multi-sequence LCS over hits
//! - [`math`]: log-domain numeric helpers shared by both
//!
//! Everything is synchronous and deterministic; long runs accept a
//! [`CancellationToken`].

#![forbid(unsafe_code)]

pub mod cancel;
pub mod cluster;
pub mod error;
pub mod lcs;
pub mod math;

pub use cancel::CancellationToken;
pub use cluster::{
    BayesianScorer, BernoulliBeta, Bhc, BhcParams, Cluster, ClusterHierarchy, ClusterNode,
    ClusterScore, Clustering, DirichletMultinomial, MarginalLikelihood, NormalWishart, Scorer,
    TreeBuilder,
};
pub use error::{Error, Result};
pub use lcs::{lcs_delta, lcs_pairs, Extract, FnExtract, LcsResult, LcsValue, MultiLcs};
