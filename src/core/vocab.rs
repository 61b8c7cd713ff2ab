//! Vocabulary lookups for the merge engine.
//!
//! The merge engine never owns a vocabulary; it consumes the [`Vocabulary`]
//! trait, a small read-only lookup surface. Any concrete source (an in-memory
//! table, a store backed by a model file) can implement it.
//!
//! This module also provides [`ScoredVocab`], the built-in in-memory
//! implementation, and a loader for the scored-piece text format:
//!
//! ```text
//! aGU= 9.0
//! aGVsbG8= 12.0
//! ```
//!
//! Each line holds a base64-encoded piece and its merge score, separated by a
//! space. The token id is the zero-based line index. The 256 byte-fallback
//! ids follow the last piece id, so every possible byte always has a token.

use base64::{engine::general_purpose::STANDARD, Engine};
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::debug;

/// Integer identifier the vocabulary assigns to a piece or a raw byte.
pub type TokenId = u32;

/// Read-only lookup surface consumed by the merge engine.
///
/// Implementations must answer every call; "not found" is `None` or `false`,
/// never a panic. `token_for_byte` is total over all 256 byte values; it is
/// the last-resort fallback that guarantees every input byte can be emitted
/// as some token.
pub trait Vocabulary {
    /// Exact-match lookup of a piece by its byte content. No prefix or
    /// partial matching.
    fn token_for_text(&self, text: &[u8]) -> Option<TokenId>;

    /// Fallback token for a single raw byte. Total: must return a usable
    /// token for every byte value.
    fn token_for_byte(&self, byte: u8) -> TokenId;

    /// Merge-priority score for a token. Higher scores merge earlier.
    fn score(&self, token: TokenId) -> f32;

    /// Whether a token id is usable. Guards against accepting an id that is
    /// scored but otherwise invalid.
    fn is_valid(&self, token: TokenId) -> bool;
}

/// Errors that can occur when loading a scored-piece vocabulary.
#[derive(Error, Debug)]
pub enum VocabError {
    #[error("Invalid base64 encoding: {0}")]
    Base64Error(#[from] base64::DecodeError),
    #[error("Invalid line format: {0}")]
    ParseError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// In-memory scored-piece vocabulary.
///
/// Pieces get ids `0..n` in insertion order; the 256 byte-fallback tokens
/// occupy `n..n+256`. Byte tokens are not present in the piece table, so
/// they are never proposed as merges; they only appear through the byte
/// fallback path.
#[derive(Debug, Clone)]
pub struct ScoredVocab {
    pieces: FxHashMap<Vec<u8>, TokenId>,
    scores: Vec<f32>,
    byte_base: TokenId,
}

impl ScoredVocab {
    /// Start building a vocabulary.
    pub fn builder() -> ScoredVocabBuilder {
        ScoredVocabBuilder::default()
    }

    /// Number of token ids, including the 256 byte-fallback tokens.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// True when the vocabulary holds no pieces (byte tokens still exist).
    pub fn is_empty(&self) -> bool {
        self.byte_base == 0
    }

    /// First id of the byte-fallback range.
    pub fn byte_base(&self) -> TokenId {
        self.byte_base
    }
}

impl Vocabulary for ScoredVocab {
    fn token_for_text(&self, text: &[u8]) -> Option<TokenId> {
        self.pieces.get(text).copied()
    }

    fn token_for_byte(&self, byte: u8) -> TokenId {
        self.byte_base + byte as TokenId
    }

    fn score(&self, token: TokenId) -> f32 {
        self.scores
            .get(token as usize)
            .copied()
            .unwrap_or(f32::NEG_INFINITY)
    }

    fn is_valid(&self, token: TokenId) -> bool {
        (token as usize) < self.scores.len()
    }
}

/// Builder for [`ScoredVocab`].
///
/// Duplicate piece text keeps the first (lowest) id, matching the loader's
/// behavior for vocabulary files with repeated entries.
#[derive(Debug, Default)]
pub struct ScoredVocabBuilder {
    pieces: FxHashMap<Vec<u8>, TokenId>,
    scores: Vec<f32>,
}

impl ScoredVocabBuilder {
    /// Add a piece with its merge score, returning its id. If the piece text
    /// was already added, the existing id is returned and the score is kept.
    pub fn piece(&mut self, text: impl Into<Vec<u8>>, score: f32) -> TokenId {
        let id = self.scores.len() as TokenId;
        match self.pieces.entry(text.into()) {
            std::collections::hash_map::Entry::Occupied(e) => *e.get(),
            std::collections::hash_map::Entry::Vacant(e) => {
                e.insert(id);
                self.scores.push(score);
                id
            }
        }
    }

    /// Finish the vocabulary, appending the 256 byte-fallback tokens after
    /// the last piece id.
    pub fn build(mut self) -> ScoredVocab {
        let byte_base = self.scores.len() as TokenId;
        // Byte tokens never rank merges; their score is inert.
        self.scores.extend(std::iter::repeat(0.0).take(256));
        ScoredVocab {
            pieces: self.pieces,
            scores: self.scores,
            byte_base,
        }
    }
}

/// Load a scored-piece vocabulary from raw bytes.
///
/// Format: `base64_piece score\n` per line, id = line index.
/// Example: `aGU= 9.0` (where `aGU=` decodes to `he`). Blank lines are
/// skipped without consuming an id.
pub fn load_scored_pieces(data: &[u8]) -> Result<ScoredVocab, VocabError> {
    let mut builder = ScoredVocab::builder();

    for line in data.split(|&b| b == b'\n') {
        if line.is_empty() {
            continue;
        }

        let space_pos = line
            .iter()
            .rposition(|&b| b == b' ')
            .ok_or_else(|| VocabError::ParseError("Missing space separator".to_string()))?;

        let piece_b64 = &line[..space_pos];
        let score_str = &line[space_pos + 1..];

        let piece = STANDARD.decode(piece_b64)?;

        let score_str = std::str::from_utf8(score_str)
            .map_err(|_| VocabError::ParseError("Invalid UTF-8 in score".to_string()))?;
        let score: f32 = score_str
            .trim()
            .parse()
            .map_err(|_| VocabError::ParseError(format!("Invalid score: {}", score_str)))?;

        builder.piece(piece, score);
    }

    let vocab = builder.build();
    debug!(
        pieces = vocab.byte_base(),
        "loaded scored-piece vocabulary"
    );
    Ok(vocab)
}

/// Load a scored-piece vocabulary from a file path.
pub fn load_scored_pieces_file(path: &str) -> Result<ScoredVocab, VocabError> {
    let data = std::fs::read(path)?;
    load_scored_pieces(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_assigns_sequential_ids() {
        let mut builder = ScoredVocab::builder();
        assert_eq!(builder.piece("he", 9.0), 0);
        assert_eq!(builder.piece("llo", 7.0), 1);
        let vocab = builder.build();

        assert_eq!(vocab.token_for_text(b"he"), Some(0));
        assert_eq!(vocab.token_for_text(b"llo"), Some(1));
        assert_eq!(vocab.token_for_text(b"xyz"), None);
    }

    #[test]
    fn test_builder_keeps_first_id_for_duplicates() {
        let mut builder = ScoredVocab::builder();
        let first = builder.piece("ab", 5.0);
        let second = builder.piece("ab", 99.0);
        assert_eq!(first, second);

        let vocab = builder.build();
        assert_eq!(vocab.score(first), 5.0);
        assert_eq!(vocab.byte_base(), 1);
    }

    #[test]
    fn test_byte_tokens_cover_all_bytes() {
        let vocab = ScoredVocab::builder().build();
        assert_eq!(vocab.byte_base(), 0);
        for b in 0u8..=255 {
            let token = vocab.token_for_byte(b);
            assert_eq!(token, b as TokenId);
            assert!(vocab.is_valid(token));
        }
    }

    #[test]
    fn test_byte_tokens_follow_pieces() {
        let mut builder = ScoredVocab::builder();
        builder.piece("he", 9.0);
        builder.piece("th", 10.0);
        let vocab = builder.build();

        assert_eq!(vocab.byte_base(), 2);
        assert_eq!(vocab.token_for_byte(0), 2);
        assert_eq!(vocab.token_for_byte(255), 257);
        assert_eq!(vocab.len(), 258);
    }

    #[test]
    fn test_invalid_token_rejected() {
        let mut builder = ScoredVocab::builder();
        builder.piece("he", 9.0);
        let vocab = builder.build();

        assert!(vocab.is_valid(0));
        assert!(vocab.is_valid(256)); // last byte token
        assert!(!vocab.is_valid(257));
        assert_eq!(vocab.score(9999), f32::NEG_INFINITY);
    }

    #[test]
    fn test_load_scored_pieces() {
        // "he" base64 = "aGU=", "hello" base64 = "aGVsbG8="
        let data = b"aGU= 9.0\naGVsbG8= 12.5\n";
        let vocab = load_scored_pieces(data).unwrap();

        assert_eq!(vocab.token_for_text(b"he"), Some(0));
        assert_eq!(vocab.token_for_text(b"hello"), Some(1));
        assert_eq!(vocab.score(0), 9.0);
        assert_eq!(vocab.score(1), 12.5);
        assert_eq!(vocab.byte_base(), 2);
    }

    #[test]
    fn test_load_rejects_missing_separator() {
        let data = b"aGU=\n";
        assert!(matches!(
            load_scored_pieces(data),
            Err(VocabError::ParseError(_))
        ));
    }

    #[test]
    fn test_load_rejects_bad_score() {
        let data = b"aGU= not-a-number\n";
        assert!(matches!(
            load_scored_pieces(data),
            Err(VocabError::ParseError(_))
        ));
    }

    #[test]
    fn test_load_rejects_bad_base64() {
        let data = b"!!!! 1.0\n";
        assert!(matches!(
            load_scored_pieces(data),
            Err(VocabError::Base64Error(_))
        ));
    }
}
