//! Longest-common-subsequence alignment of motif hits.
//!
//! Two flavours:
//!
//! - [`lcs_delta`] / [`lcs_pairs`]: the classical O(m·n) table over two sequences, with
//!   a caller-supplied equality predicate so that related-but-different labels can be
//!   paired.
//! - [`MultiLcs`]: N sequences of positioned, scored hits. Matches are hits that share
//!   a character in every sequence; the best chain maximizes summed average score
//!   rather than length.
//!
//! ## Usage
//!
//! ```rust
//! use bhc::lcs::{lcs_pairs, FnExtract, MultiLcs};
//!
//! let x = ["SP1", "AP1", "NFKB"];
//! let y = ["sp1", "p53", "nfkb"];
//! let pairs = lcs_pairs(&x, &y, |a, b| a.eq_ignore_ascii_case(b));
//! assert_eq!(pairs.len(), 2);
//!
//! // (factor, start, end, score)
//! let a = vec![('A', 0, 5, 1.0), ('B', 10, 15, 2.0)];
//! let b = vec![('A', 3, 8, 1.0), ('B', 20, 30, 4.0)];
//! let extract = FnExtract::new(
//!     |h: &(char, i64, i64, f64)| h.0,
//!     |h: &(char, i64, i64, f64)| h.1,
//!     |h: &(char, i64, i64, f64)| h.2,
//!     |h: &(char, i64, i64, f64)| h.3,
//! );
//! let mut lcs = MultiLcs::new([a.as_slice(), b.as_slice()], extract).unwrap();
//! let best = lcs.calculate_best().unwrap();
//! assert_eq!(best.characters(), vec!['A', 'B']);
//! assert_eq!(best.score, 1.0 + 3.0);
//! ```

mod delta;
mod multi;

pub use delta::{lcs_delta, lcs_pairs};
pub use multi::{Extract, FnExtract, LcsResult, LcsValue, MultiLcs};
