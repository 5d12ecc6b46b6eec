//! A tiny in-memory word piece tokenizer.
//!
//! The vocabulary is:
//!
//! | id | token |
//! |----|-------|
//! | 0 | `[PAD]` |
//! | 1 | `[UNK]` |
//! | 2 | `[CLS]` |
//! | 3 | `[SEP]` |
//! | 4 | `questo` |
//! | 5 | `è` |
//! | 6 | `un` |
//! | 7 | `esempio` |
//! | 8 | `.` |
//! | 9 | `a` |
//! | 10 | `b` |
//!
//! The normalizer lowercases but keeps accents.

/// The serialized tokenizer in the `tokenizer.json` format.
pub const TOKENIZER: &str = r###"{
  "version": "1.0",
  "truncation": null,
  "padding": null,
  "added_tokens": [
    { "id": 0, "content": "[PAD]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true },
    { "id": 1, "content": "[UNK]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true },
    { "id": 2, "content": "[CLS]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true },
    { "id": 3, "content": "[SEP]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true }
  ],
  "normalizer": {
    "type": "BertNormalizer",
    "clean_text": true,
    "handle_chinese_chars": true,
    "strip_accents": false,
    "lowercase": true
  },
  "pre_tokenizer": { "type": "BertPreTokenizer" },
  "post_processor": {
    "type": "BertProcessing",
    "sep": ["[SEP]", 3],
    "cls": ["[CLS]", 2]
  },
  "decoder": null,
  "model": {
    "type": "WordPiece",
    "unk_token": "[UNK]",
    "continuing_subword_prefix": "##",
    "max_input_chars_per_word": 100,
    "vocab": {
      "[PAD]": 0,
      "[UNK]": 1,
      "[CLS]": 2,
      "[SEP]": 3,
      "questo": 4,
      "è": 5,
      "un": 6,
      "esempio": 7,
      ".": 8,
      "a": 9,
      "b": 10
    }
  }
}"###;

/// The number of tokens in the vocabulary.
pub const VOCAB_SIZE: usize = 11;
