//! Integration tests for special-token handling and batch encoding.

use rustc_hash::FxHashMap;
use smeltr::{ScoredVocab, Tokenizer, Vocabulary};

fn make_tokenizer() -> Tokenizer<ScoredVocab> {
    let mut builder = ScoredVocab::builder();
    builder.piece("he", 9.0);
    builder.piece("ll", 8.0);
    builder.piece("llo", 7.0);
    let vocab = builder.build();

    let mut specials = FxHashMap::default();
    specials.insert("<s>".to_string(), 500);
    specials.insert("</s>".to_string(), 501);
    specials.insert("<|endoftext|>".to_string(), 502);
    Tokenizer::with_special_tokens(vocab, specials).unwrap()
}

#[test]
fn test_specials_map_to_fixed_ids() {
    let tokenizer = make_tokenizer();

    let tokens = tokenizer.tokenize_with_special("<s>hello</s>");
    assert_eq!(tokens.first(), Some(&500));
    assert_eq!(tokens.last(), Some(&501));
    assert_eq!(&tokens[1..tokens.len() - 1], tokenizer.tokenize("hello"));
}

#[test]
fn test_adjacent_specials() {
    let tokenizer = make_tokenizer();
    let tokens = tokenizer.tokenize_with_special("<s></s><|endoftext|>");
    assert_eq!(tokens, vec![500, 501, 502]);
}

#[test]
fn test_specials_not_recognized_without_handling() {
    let tokenizer = make_tokenizer();

    // Plain tokenize treats the marker as ordinary text: all byte fallback
    // here, since no piece covers any of it.
    let tokens = tokenizer.tokenize("<s>");
    assert_eq!(tokens.len(), 3);
    assert!(!tokens.contains(&500));
}

#[test]
fn test_special_inside_word_is_boundary() {
    let tokenizer = make_tokenizer();
    let he = tokenizer.vocab().token_for_text(b"he").unwrap();

    let tokens = tokenizer.tokenize_with_special("he<s>he");
    assert_eq!(tokens, vec![he, 500, he]);
}

#[test]
fn test_batch_with_special_matches_one_shot() {
    let tokenizer = make_tokenizer();
    let texts = vec![
        "<s>hello</s>".to_string(),
        "hello".to_string(),
        "<|endoftext|>".to_string(),
        "".to_string(),
    ];

    let batch = tokenizer.tokenize_batch_with_special(&texts);
    assert_eq!(batch.len(), texts.len());
    for (tokens, text) in batch.iter().zip(&texts) {
        assert_eq!(tokens, &tokenizer.tokenize_with_special(text));
    }
}

#[test]
fn test_batch_plain() {
    let tokenizer = make_tokenizer();
    let texts: Vec<String> = ["hello", "llhe", "", "hehehe"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let batch = tokenizer.tokenize_batch(&texts);
    for (tokens, text) in batch.iter().zip(&texts) {
        assert_eq!(tokens, &tokenizer.tokenize(text));
    }
}
