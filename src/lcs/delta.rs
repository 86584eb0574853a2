//! Two-sequence LCS with a caller-supplied equality predicate.

/// Longest common subsequence of `x` and `y` under `eq`.
///
/// `eq` need not be an identity: a relaxed predicate (e.g. "both hits belong to the
/// same transcription factor") lets different elements on each side pair up, which is
/// why matches are reported as `(x_elem, y_elem)` pairs rather than a single sequence.
///
/// Matched pairs are passed to `inserter` in reverse order (from the end of both
/// sequences towards the start). Returns the number of pairs.
pub fn lcs_delta<'x, 'y, X, Y, O, F>(x: &'x [X], y: &'y [Y], mut inserter: O, mut eq: F) -> usize
where
    O: FnMut(&'x X, &'y Y),
    F: FnMut(&X, &Y) -> bool,
{
    let m = x.len();
    let n = y.len();
    let width = n + 1;

    // Flat (m + 1) × (n + 1) tables; row 0 and column 0 are the empty prefixes.
    let mut len = vec![0usize; (m + 1) * width];
    let mut matched = vec![false; (m + 1) * width];

    for i in 1..=m {
        for j in 1..=n {
            let cell = i * width + j;
            if eq(&x[i - 1], &y[j - 1]) {
                len[cell] = len[cell - width - 1] + 1;
                matched[cell] = true;
            } else {
                len[cell] = len[cell - width].max(len[cell - 1]);
            }
        }
    }

    let total = len[m * width + n];
    let (mut i, mut j) = (m, n);
    let mut emitted = 0;
    while i > 0 && j > 0 {
        let cell = i * width + j;
        if matched[cell] {
            debug_assert!(len[cell] > 0, "matched cell with zero length");
            inserter(&x[i - 1], &y[j - 1]);
            emitted += 1;
            i -= 1;
            j -= 1;
        } else if len[cell - width] >= len[cell - 1] {
            i -= 1;
        } else {
            j -= 1;
        }
    }
    debug_assert_eq!(emitted, total);
    total
}

/// [`lcs_delta`] collected into a vector in forward order.
pub fn lcs_pairs<'x, 'y, X, Y, F>(x: &'x [X], y: &'y [Y], eq: F) -> Vec<(&'x X, &'y Y)>
where
    F: FnMut(&X, &Y) -> bool,
{
    let mut pairs = Vec::new();
    lcs_delta(x, y, |a, b| pairs.push((a, b)), eq);
    pairs.reverse();
    pairs
}
