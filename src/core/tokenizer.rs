//! Tokenizer surface: shared state plus reusable sessions.
//!
//! [`Tokenizer`] owns the read-only state (vocabulary, special-token
//! matcher, result cache) and can be shared across threads. [`Session`]
//! owns the mutable per-call scratch (symbol arena, candidate agenda,
//! provenance map) and is the cheap, reusable handle that actually encodes.
//! One-shot and batch entry points on [`Tokenizer`] create sessions
//! internally.

use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Mutex;

use aho_corasick::AhoCorasick;
use lru::LruCache;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHasher};
use thiserror::Error;
use tracing::debug;

use super::merge::{greedy_encode, MergeScratch};
use super::vocab::{TokenId, Vocabulary};

/// Errors that can occur when constructing a tokenizer.
#[derive(Error, Debug)]
pub enum TokenizerError {
    #[error("Aho-Corasick build error: {0}")]
    AhoCorasickError(#[from] aho_corasick::BuildError),
}

/// Default cache size for encoded inputs.
const DEFAULT_CACHE_SIZE: usize = 4096;

/// Greedy scored-merge tokenizer.
///
/// Holds the vocabulary and everything derived from configuration: the
/// Aho-Corasick automaton for special-token matching and an LRU cache of
/// encode results keyed by input hash. All of it is shared, read-only state
/// (the cache sits behind a `Mutex`), so one `Tokenizer` serves any number
/// of concurrent [`Session`]s.
pub struct Tokenizer<V> {
    vocab: V,
    special_tokens: FxHashMap<String, TokenId>,
    special_strings: Vec<String>,
    special_matcher: Option<AhoCorasick>,
    cache: Mutex<LruCache<u64, Vec<TokenId>>>,
}

impl<V: Vocabulary> Tokenizer<V> {
    /// Create a tokenizer with no special tokens and the default cache size.
    pub fn new(vocab: V) -> Self {
        Self {
            vocab,
            special_tokens: FxHashMap::default(),
            special_strings: Vec::new(),
            special_matcher: None,
            cache: Mutex::new(LruCache::new(nonzero_cache_size(DEFAULT_CACHE_SIZE))),
        }
    }

    /// Create a tokenizer that recognizes literal special-token strings.
    ///
    /// Special tokens are matched before the merge loop and emitted as their
    /// fixed ids; the text between matches is tokenized normally.
    pub fn with_special_tokens(
        vocab: V,
        special_tokens: FxHashMap<String, TokenId>,
    ) -> Result<Self, TokenizerError> {
        Self::with_options(vocab, special_tokens, DEFAULT_CACHE_SIZE)
    }

    /// Create a tokenizer with full configuration.
    pub fn with_options(
        vocab: V,
        special_tokens: FxHashMap<String, TokenId>,
        cache_size: usize,
    ) -> Result<Self, TokenizerError> {
        let special_strings: Vec<String> = special_tokens.keys().cloned().collect();
        let special_matcher = if special_strings.is_empty() {
            None
        } else {
            debug!(count = special_strings.len(), "building special-token matcher");
            Some(AhoCorasick::new(&special_strings)?)
        };

        Ok(Self {
            vocab,
            special_tokens,
            special_strings,
            special_matcher,
            cache: Mutex::new(LruCache::new(nonzero_cache_size(cache_size))),
        })
    }

    /// Borrow the vocabulary.
    pub fn vocab(&self) -> &V {
        &self.vocab
    }

    /// The special-token map.
    pub fn special_tokens(&self) -> &FxHashMap<String, TokenId> {
        &self.special_tokens
    }

    /// Open a session: a reusable handle owning the mutable encode scratch.
    ///
    /// Sessions amortize scratch allocations across calls. A session must
    /// not be shared between threads; open one per thread instead.
    pub fn session(&self) -> Session<'_, V> {
        Session {
            tokenizer: self,
            scratch: MergeScratch::default(),
        }
    }

    /// One-shot encode. Prefer a [`Session`] when encoding many texts.
    pub fn tokenize(&self, text: &str) -> Vec<TokenId> {
        self.session().tokenize(text)
    }

    /// One-shot encode with special-token handling.
    pub fn tokenize_with_special(&self, text: &str) -> Vec<TokenId> {
        self.session().tokenize_with_special(text)
    }

    /// Encode a batch of texts in parallel, one scratch per worker.
    pub fn tokenize_batch(&self, texts: &[String]) -> Vec<Vec<TokenId>>
    where
        V: Sync,
    {
        texts
            .par_iter()
            .map_init(|| self.session(), |session, text| session.tokenize(text))
            .collect()
    }

    /// Encode a batch of texts in parallel with special-token handling.
    pub fn tokenize_batch_with_special(&self, texts: &[String]) -> Vec<Vec<TokenId>>
    where
        V: Sync,
    {
        texts
            .par_iter()
            .map_init(
                || self.session(),
                |session, text| session.tokenize_with_special(text),
            )
            .collect()
    }

    /// Clear the result cache.
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    /// Number of cached encode results.
    pub fn cache_len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }
}

/// A tokenize session bound to a shared [`Tokenizer`].
///
/// The session is a mutable, reusable scratch space, not a read-only value:
/// each call resets and reuses the arena, agenda, and provenance map from
/// the previous call. Calls are independent: the output never depends on
/// what was encoded before.
pub struct Session<'t, V> {
    tokenizer: &'t Tokenizer<V>,
    scratch: MergeScratch,
}

impl<V: Vocabulary> Session<'_, V> {
    /// Encode text into token ids.
    pub fn tokenize(&mut self, text: &str) -> Vec<TokenId> {
        self.tokenize_bytes(text.as_bytes())
    }

    /// Encode raw bytes into token ids.
    ///
    /// Ill-formed UTF-8 never fails: offending bytes split into one-byte
    /// symbols and end up as byte-fallback tokens.
    pub fn tokenize_bytes(&mut self, input: &[u8]) -> Vec<TokenId> {
        if input.is_empty() {
            return Vec::new();
        }

        let key = hash_bytes(input);
        if let Ok(mut cache) = self.tokenizer.cache.lock() {
            if let Some(hit) = cache.get(&key) {
                return hit.clone();
            }
        }

        let output = greedy_encode(&self.tokenizer.vocab, input, &mut self.scratch);

        if let Ok(mut cache) = self.tokenizer.cache.lock() {
            cache.put(key, output.clone());
        }

        output
    }

    /// Encode text, mapping literal special-token matches to their fixed ids.
    ///
    /// Matches act as hard boundaries: the text on either side is encoded
    /// independently, so no merge can span a special token.
    pub fn tokenize_with_special(&mut self, text: &str) -> Vec<TokenId> {
        let Some(matcher) = &self.tokenizer.special_matcher else {
            return self.tokenize(text);
        };

        let text_bytes = text.as_bytes();
        let mut output = Vec::new();
        let mut last_end = 0;

        for m in matcher.find_iter(text_bytes) {
            if m.start() > last_end {
                output.extend(self.tokenize_bytes(&text_bytes[last_end..m.start()]));
            }

            let token_str = &self.tokenizer.special_strings[m.pattern().as_usize()];
            if let Some(&id) = self.tokenizer.special_tokens.get(token_str) {
                output.push(id);
            }

            last_end = m.end();
        }

        if last_end < text_bytes.len() {
            output.extend(self.tokenize_bytes(&text_bytes[last_end..]));
        }

        output
    }
}

fn nonzero_cache_size(cache_size: usize) -> NonZeroUsize {
    NonZeroUsize::new(cache_size.max(1)).unwrap_or(NonZeroUsize::MIN)
}

fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = FxHasher::default();
    bytes.hash(&mut hasher);
    hasher.finish()
}
