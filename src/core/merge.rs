//! Greedy score-driven bigram merge.
//!
//! The encode path works in four steps over one reusable scratch space:
//!
//! 1. Split the input into one symbol per UTF-8 code point.
//! 2. Seed the agenda with every adjacent pair whose concatenation is a
//!    scored vocabulary piece.
//! 3. Repeatedly apply the best-scoring candidate. Candidates invalidated by
//!    earlier merges are detected when popped and discarded, so the agenda
//!    never needs eager purging. Each merge creates at most two new
//!    adjacencies, which bounds agenda growth and guarantees termination
//!    after at most n-1 merges.
//! 4. Walk the surviving chain and expand each symbol into output tokens.
//!
//! Candidates are resolved in strict score order, not left-to-right order: a
//! confident merge elsewhere in the string wins over a weaker one at the
//! front. A long piece is only reachable if every intermediate pairwise
//! merge on the way to it is itself a scored piece; the full span is looked
//! up directly only at the final expansion step.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rustc_hash::FxHashMap;

use super::symbols::{SymbolArena, NIL};
use super::vocab::{TokenId, Vocabulary};

/// A proposed merge of two adjacent live symbols.
///
/// `size` is the combined byte length at proposal time and doubles as the
/// staleness fingerprint: if either symbol has since died or changed length,
/// the combined length no longer matches and the candidate is discarded.
#[derive(Debug, Clone, Copy)]
struct Bigram {
    left: usize,
    right: usize,
    score: f32,
    size: usize,
}

// Max-heap on score; equal scores resolve lower-left-index-first so the heap
// order, and therefore the output, is fully deterministic.
impl Ord for Bigram {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.left.cmp(&self.left))
    }
}

impl PartialOrd for Bigram {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Bigram {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Bigram {}

/// Reusable per-call scratch: symbol arena, candidate agenda, merge
/// provenance, and the expansion work stack.
///
/// One encode call fully owns the scratch; `reset` clears every structure
/// while keeping its allocation, so a long-lived session does not churn the
/// allocator.
#[derive(Debug, Default)]
pub(crate) struct MergeScratch {
    arena: SymbolArena,
    agenda: BinaryHeap<Bigram>,
    rev_merge: FxHashMap<Vec<u8>, (usize, usize)>,
    stack: Vec<usize>,
}

impl MergeScratch {
    fn reset(&mut self) {
        self.arena.clear();
        self.agenda.clear();
        self.rev_merge.clear();
        self.stack.clear();
    }

    /// Propose merging two adjacent symbols. No-op unless both are live and
    /// their concatenated span is a valid scored piece. Records provenance
    /// for the span so the expansion step can reconstruct the decomposition.
    fn propose<V: Vocabulary>(&mut self, vocab: &V, input: &[u8], left: usize, right: usize) {
        let l = self.arena[left];
        let r = self.arena[right];
        if l.is_dead() || r.is_dead() {
            return;
        }
        debug_assert_eq!(l.start + l.len, r.start, "proposing non-adjacent symbols");

        let text = &input[l.start..r.start + r.len];
        let Some(token) = vocab.token_for_text(text) else {
            return;
        };
        if !vocab.is_valid(token) {
            return;
        }

        self.agenda.push(Bigram {
            left,
            right,
            score: vocab.score(token),
            size: text.len(),
        });
        self.rev_merge.insert(text.to_vec(), (left, right));
    }

    /// Expand one surviving symbol into output tokens.
    ///
    /// Strategy order: direct vocabulary hit (the only place a full merged
    /// span is matched), recorded merge provenance, then one byte-fallback
    /// token per byte. The work stack replaces call-stack recursion; the
    /// right child is pushed before the left so output stays left-to-right.
    fn resegment<V: Vocabulary>(
        &mut self,
        vocab: &V,
        input: &[u8],
        root: usize,
        output: &mut Vec<TokenId>,
    ) {
        self.stack.clear();
        self.stack.push(root);

        while let Some(idx) = self.stack.pop() {
            let text = self.arena[idx].text(input);

            if let Some(token) = vocab.token_for_text(text) {
                if vocab.is_valid(token) {
                    output.push(token);
                    continue;
                }
            }

            if let Some(&(left, right)) = self.rev_merge.get(text) {
                self.stack.push(right);
                self.stack.push(left);
                continue;
            }

            for &b in text {
                output.push(vocab.token_for_byte(b));
            }
        }
    }
}

/// Encode input bytes into token ids with the greedy scored-merge loop.
///
/// Deterministic for a fixed vocabulary and input. Never fails: lookup
/// misses fall through to byte fallback, and ill-formed UTF-8 degrades to
/// one-byte symbols at split time.
pub(crate) fn greedy_encode<V: Vocabulary>(
    vocab: &V,
    input: &[u8],
    scratch: &mut MergeScratch,
) -> Vec<TokenId> {
    scratch.reset();
    if input.is_empty() {
        return Vec::new();
    }

    scratch.arena.split(input);

    for i in 1..scratch.arena.len() {
        scratch.propose(vocab, input, i - 1, i);
    }

    while let Some(bigram) = scratch.agenda.pop() {
        let left = scratch.arena[bigram.left];
        let right = scratch.arena[bigram.right];

        // Stale: a symbol died or changed size since the proposal.
        if left.is_dead() || right.is_dead() || left.len + right.len != bigram.size {
            continue;
        }

        scratch.arena.merge_into(bigram.left, bigram.right);

        let merged = scratch.arena[bigram.left];
        if merged.prev != NIL {
            scratch.propose(vocab, input, merged.prev, bigram.left);
        }
        if merged.next != NIL {
            scratch.propose(vocab, input, bigram.left, merged.next);
        }
    }

    // Index 0 is always the live head: it can never be the right-hand side
    // of a merge.
    let mut output = Vec::with_capacity(scratch.arena.len());
    let mut idx = 0;
    while idx != NIL && idx < scratch.arena.len() {
        let sym = scratch.arena[idx];
        if !sym.is_dead() {
            scratch.resegment(vocab, input, idx, &mut output);
        }
        idx = sym.next;
    }

    output
}
