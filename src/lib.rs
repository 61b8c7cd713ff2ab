//! Smeltr - greedy score-driven subword tokenizer
//!
//! A SentencePiece-style bigram-merge tokenizer featuring:
//! - Linked-list symbol arena over the input (O(1) merges, no node churn)
//! - Max-heap candidate agenda with staleness detection
//! - Byte fallback guaranteeing every input byte maps to a token
//! - Pluggable [`Vocabulary`] trait with an in-memory scored-piece table
//! - FxHashMap for fast lookups
//! - Aho-Corasick for fast special token matching
//! - LRU cache for repeated inputs
//! - Rayon parallelism for batch encoding
//!
//! # Example
//!
//! ```
//! use smeltr::{ScoredVocab, Tokenizer};
//!
//! let mut builder = ScoredVocab::builder();
//! builder.piece("he", 9.0);
//! builder.piece("ll", 8.0);
//! builder.piece("llo", 7.0);
//! let tokenizer = Tokenizer::new(builder.build());
//!
//! let mut session = tokenizer.session();
//! let tokens = session.tokenize("hello");
//! assert_eq!(tokens.len(), 2);
//! ```

pub mod core;

pub use core::{
    load_scored_pieces, load_scored_pieces_file, ScoredVocab, ScoredVocabBuilder, Session, TokenId,
    Tokenizer, TokenizerError, VocabError, Vocabulary,
};
