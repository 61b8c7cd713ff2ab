//! Core tokenization engine for smeltr.
//!
//! This module contains the greedy scored-merge tokenizer implementation:
//! one symbol per UTF-8 code point, a max-heap of merge candidates ranked by
//! vocabulary score, and byte fallback so every input byte is always covered.
//!
//! # Architecture
//!
//! The core is organized into four components:
//!
//! - [`Vocabulary`]: the lookup surface the engine consumes, with
//!   [`ScoredVocab`] as the built-in in-memory implementation and a loader
//!   for the scored-piece text format
//! - `symbols`: array-backed doubly linked list partitioning the input into
//!   live segments, with O(1) adjacent merge
//! - `merge`: the greedy merge loop (seed adjacent pairs, pop the best
//!   candidate, discard stale entries, merge, reseed the new adjacencies)
//!   plus the final expansion of surviving symbols into tokens
//! - [`Tokenizer`]: shared surface with special-token matching, an LRU
//!   result cache, Rayon batch encoding, and reusable [`Session`] scratch

mod merge;
mod symbols;
mod tokenizer;
mod vocab;

pub use tokenizer::{Session, Tokenizer, TokenizerError};
pub use vocab::{
    load_scored_pieces, load_scored_pieces_file, ScoredVocab, ScoredVocabBuilder, TokenId,
    VocabError, Vocabulary,
};
