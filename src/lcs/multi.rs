//! Common subsequence of scored, positioned hits across any number of sequences.
//!
//! Each sequence is a list of elements (e.g. binding-site hits) with a start, an end,
//! a character (the factor the hit belongs to), and a score. A *common element* is one
//! element from every sequence, all sharing a character; a common subsequence is a
//! chain of common elements that do not overlap within any sequence. The best chain
//! maximizes the sum of per-element average scores.
//!
//! # Index space
//!
//! For sequence `s`, let `ends_s` be its distinct element end positions, sorted. A cell
//! is one index `i_s ∈ 0..=K_s` per sequence, where `i_s` covers the prefix of
//! sequence `s` up to and including `ends_s[i_s − 1]` (`0` is the empty prefix). The
//! cell store is sized to `Π (K_s + 1)` once and never resized.
//!
//! Every cell first inherits the best chain among its one-step-back neighbours, then
//! tries each common element ending exactly at the cell's end positions. A candidate
//! replaces the current best only when strictly better, so the first chain found with
//! a given score stands. The answer lives in the cell where every `i_s = K_s`.
//!
//! The index space grows exponentially in the number of sequences.

use std::marker::PhantomData;

use crate::cancel::{self, CancellationToken};
use crate::error::{Error, Result};

/// Reads the four properties the alignment needs from an element.
pub trait Extract<E> {
    /// The label elements must share to be matched.
    type Character: Eq + Clone;

    /// Label of `element`.
    fn character(&self, element: &E) -> Self::Character;
    /// First position covered by `element`.
    fn start(&self, element: &E) -> i64;
    /// Last position covered by `element`; must not precede the start.
    fn end(&self, element: &E) -> i64;
    /// Score contributed by `element`.
    fn score(&self, element: &E) -> f64;
}

/// [`Extract`] built from four closures.
pub struct FnExtract<C, FC, FS, FE, FX> {
    character: FC,
    start: FS,
    end: FE,
    score: FX,
    _character: PhantomData<fn() -> C>,
}

impl<C, FC, FS, FE, FX> FnExtract<C, FC, FS, FE, FX> {
    /// Bundle character, start, end, and score extractors.
    pub fn new(character: FC, start: FS, end: FE, score: FX) -> Self {
        Self {
            character,
            start,
            end,
            score,
            _character: PhantomData,
        }
    }
}

impl<C, FC: Clone, FS: Clone, FE: Clone, FX: Clone> Clone for FnExtract<C, FC, FS, FE, FX> {
    fn clone(&self) -> Self {
        Self::new(
            self.character.clone(),
            self.start.clone(),
            self.end.clone(),
            self.score.clone(),
        )
    }
}

impl<E, C, FC, FS, FE, FX> Extract<E> for FnExtract<C, FC, FS, FE, FX>
where
    C: Eq + Clone,
    FC: Fn(&E) -> C,
    FS: Fn(&E) -> i64,
    FE: Fn(&E) -> i64,
    FX: Fn(&E) -> f64,
{
    type Character = C;

    fn character(&self, element: &E) -> C {
        (self.character)(element)
    }

    fn start(&self, element: &E) -> i64 {
        (self.start)(element)
    }

    fn end(&self, element: &E) -> i64 {
        (self.end)(element)
    }

    fn score(&self, element: &E) -> f64 {
        (self.score)(element)
    }
}

/// One common element of the best chain.
#[derive(Clone, Debug, PartialEq)]
pub struct LcsValue<C> {
    /// Earliest start among the matched elements.
    pub start: i64,
    /// Latest end among the matched elements.
    pub end: i64,
    /// Shared character.
    pub character: C,
    /// Average score of the matched elements.
    pub score: f64,
    /// `elements[s]` is the index of the matched element within sequence `s`.
    pub elements: Vec<usize>,
}

/// The best common subsequence, in sequence order.
#[derive(Clone, Debug, PartialEq)]
pub struct LcsResult<C> {
    /// Matched common elements.
    pub values: Vec<LcsValue<C>>,
    /// Sum of the values' scores.
    pub score: f64,
}

impl<C: Clone> LcsResult<C> {
    /// The shared-character subsequence.
    pub fn characters(&self) -> Vec<C> {
        self.values.iter().map(|v| v.character.clone()).collect()
    }

    /// Number of common elements.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no common element was found.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A chain link in the node arena.
#[derive(Clone, Debug)]
struct Node<C> {
    value: LcsValue<C>,
    prev: Option<usize>,
    total: f64,
}

/// Per-sequence view of the elements, grouped by end position.
#[derive(Debug)]
struct Track {
    /// Distinct end positions, ascending.
    ends: Vec<i64>,
    /// `by_end[k]` lists element indices whose end is `ends[k]`.
    by_end: Vec<Vec<usize>>,
    starts: Vec<i64>,
}

/// Multi-sequence LCS solver.
pub struct MultiLcs<'a, E, X: Extract<E>> {
    sequences: Vec<&'a [E]>,
    extract: X,
    tracks: Vec<Track>,
    /// Row-major strides of the index space; the last sequence varies fastest.
    strides: Vec<usize>,
    num_cells: usize,
    cancel: Option<CancellationToken>,
    best: Option<LcsResult<X::Character>>,
}

impl<'a, E, X: Extract<E>> MultiLcs<'a, E, X> {
    /// Prepare the index space for `sequences`.
    ///
    /// Fails for zero sequences, an element whose end precedes its start, or an index
    /// space too large to address.
    pub fn new<I>(sequences: I, extract: X) -> Result<Self>
    where
        I: IntoIterator<Item = &'a [E]>,
    {
        let sequences: Vec<&'a [E]> = sequences.into_iter().collect();
        if sequences.is_empty() {
            return Err(Error::EmptyInput);
        }

        let mut tracks = Vec::with_capacity(sequences.len());
        for seq in &sequences {
            let mut starts = Vec::with_capacity(seq.len());
            let mut elem_ends = Vec::with_capacity(seq.len());
            for e in seq.iter() {
                let (start, end) = (extract.start(e), extract.end(e));
                if end < start {
                    return Err(Error::InvalidParameter {
                        name: "sequences",
                        message: "element end precedes its start",
                    });
                }
                starts.push(start);
                elem_ends.push(end);
            }

            let mut ends = elem_ends.clone();
            ends.sort_unstable();
            ends.dedup();

            let mut by_end = vec![Vec::new(); ends.len()];
            for (idx, end) in elem_ends.iter().enumerate() {
                // Present by construction.
                if let Ok(k) = ends.binary_search(end) {
                    by_end[k].push(idx);
                }
            }
            tracks.push(Track {
                ends,
                by_end,
                starts,
            });
        }

        let mut strides = vec![0usize; tracks.len()];
        let mut num_cells: usize = 1;
        for (s, track) in tracks.iter().enumerate().rev() {
            strides[s] = num_cells;
            num_cells = num_cells
                .checked_mul(track.ends.len() + 1)
                .ok_or(Error::InvalidParameter {
                    name: "sequences",
                    message: "index space too large",
                })?;
        }

        Ok(Self {
            sequences,
            extract,
            tracks,
            strides,
            num_cells,
            cancel: None,
            best: None,
        })
    }

    /// Poll `token` once per cell of the first sequence's end-position axis.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Number of sequences.
    pub fn num_sequences(&self) -> usize {
        self.sequences.len()
    }

    /// Size of the end-position index space.
    pub fn num_cells(&self) -> usize {
        self.num_cells
    }

    /// The result of the last [`calculate_best`](Self::calculate_best), if any.
    pub fn get_best(&self) -> Option<&LcsResult<X::Character>> {
        self.best.as_ref()
    }

    /// Run the dynamic program and return the best common subsequence.
    pub fn calculate_best(&mut self) -> Result<&LcsResult<X::Character>> {
        log::debug!(
            "lcs: {} sequences, {} cells",
            self.sequences.len(),
            self.num_cells
        );

        let dims = self.sequences.len();
        let mut cells: Vec<Option<usize>> = vec![None; self.num_cells];
        let mut arena: Vec<Node<X::Character>> = Vec::new();
        let mut index = vec![0usize; dims];

        for cell in 0..self.num_cells {
            if index[1..].iter().all(|&i| i == 0) {
                cancel::check(self.cancel.as_ref())?;
            }

            let mut best = self.inherit(&cells, &arena, &index, cell);
            if index.iter().all(|&i| i > 0) {
                best = self.try_matches(&cells, &mut arena, &index, best);
            }
            cells[cell] = best;

            // Odometer increment, last sequence fastest.
            for s in (0..dims).rev() {
                index[s] += 1;
                if index[s] <= self.tracks[s].ends.len() {
                    break;
                }
                index[s] = 0;
            }
        }

        let result = collect_chain(&arena, cells[self.num_cells - 1]);
        Ok(&*self.best.insert(result))
    }

    fn total(arena: &[Node<X::Character>], node: Option<usize>) -> f64 {
        node.map_or(0.0, |n| arena[n].total)
    }

    /// Best chain among the cells one step back in each dimension.
    fn inherit(
        &self,
        cells: &[Option<usize>],
        arena: &[Node<X::Character>],
        index: &[usize],
        cell: usize,
    ) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (s, &i) in index.iter().enumerate() {
            if i == 0 {
                continue;
            }
            let candidate = cells[cell - self.strides[s]];
            if Self::total(arena, candidate) > Self::total(arena, best) {
                best = candidate;
            }
        }
        best
    }

    /// Try every common element ending exactly at this cell.
    fn try_matches(
        &self,
        cells: &[Option<usize>],
        arena: &mut Vec<Node<X::Character>>,
        index: &[usize],
        mut best: Option<usize>,
    ) -> Option<usize> {
        let dims = index.len();
        let ending: Vec<&[usize]> = index
            .iter()
            .zip(&self.tracks)
            .map(|(&i, t)| t.by_end[i - 1].as_slice())
            .collect();

        for &first in ending[0] {
            let character = self.extract.character(&self.sequences[0][first]);

            let mut candidates: Vec<Vec<usize>> = Vec::with_capacity(dims);
            candidates.push(vec![first]);
            for s in 1..dims {
                let same: Vec<usize> = ending[s]
                    .iter()
                    .copied()
                    .filter(|&e| self.extract.character(&self.sequences[s][e]) == character)
                    .collect();
                if same.is_empty() {
                    break;
                }
                candidates.push(same);
            }
            if candidates.len() < dims {
                continue;
            }

            // Walk the Cartesian product of per-sequence candidates.
            let mut choice = vec![0usize; dims];
            loop {
                let elements: Vec<usize> =
                    choice.iter().zip(&candidates).map(|(&c, cs)| cs[c]).collect();

                let mut prefix = 0usize;
                let mut score_sum = 0.0;
                let mut start = i64::MAX;
                let mut end = i64::MIN;
                for (s, &e) in elements.iter().enumerate() {
                    let track = &self.tracks[s];
                    let elem_start = track.starts[e];
                    // Distinct ends strictly before the element's start.
                    let j = track.ends.partition_point(|&x| x < elem_start);
                    debug_assert!(j < index[s]);
                    prefix += j * self.strides[s];

                    let elem = &self.sequences[s][e];
                    score_sum += self.extract.score(elem);
                    start = start.min(elem_start);
                    end = end.max(self.extract.end(elem));
                }

                let average = score_sum / dims as f64;
                let before = cells[prefix];
                let total = average + Self::total(arena, before);
                if total > Self::total(arena, best) {
                    log::trace!("lcs: cell {:?} improved to {:.4}", index, total);
                    arena.push(Node {
                        value: LcsValue {
                            start,
                            end,
                            character: character.clone(),
                            score: average,
                            elements,
                        },
                        prev: before,
                        total,
                    });
                    best = Some(arena.len() - 1);
                }

                // Next combination; done once every position has wrapped.
                let mut s = dims;
                let advanced = loop {
                    if s == 0 {
                        break false;
                    }
                    s -= 1;
                    choice[s] += 1;
                    if choice[s] < candidates[s].len() {
                        break true;
                    }
                    choice[s] = 0;
                };
                if !advanced {
                    break;
                }
            }
        }
        best
    }
}

fn collect_chain<C: Clone>(arena: &[Node<C>], tail: Option<usize>) -> LcsResult<C> {
    let mut values = Vec::new();
    let mut score = 0.0;
    let mut cursor = tail;
    while let Some(idx) = cursor {
        let node = &arena[idx];
        score += node.value.score;
        values.push(node.value.clone());
        cursor = node.prev;
    }
    values.reverse();
    LcsResult { values, score }
}
