use std::io::Read;

use derive_more::{Deref, From};
use displaydoc::Display;
use thiserror::Error;
use tokenizers::{
    PaddingDirection,
    PaddingParams,
    PaddingStrategy,
    Tokenizer as HfTokenizer,
    TruncationParams,
};

use crate::ndarray::Array2;

/// A wrapped, pre-configured Bert tokenizer.
///
/// Every sequence is padded and truncated to exactly `token_size` tokens, special tokens included.
pub struct Tokenizer {
    tokenizer: HfTokenizer,
    pub(crate) token_size: usize,
}

/// The potential errors of the tokenizer.
#[derive(Debug, Display, Error)]
pub enum TokenizerError {
    /// Failed to read the tokenizer: {0}
    Read(#[from] std::io::Error),
    /// Failed to load the tokenizer: {0}
    Load(String),
    /// Failed to encode the sequences: {0}
    Encode(String),
}

/// The token ids of the encoded sequences.
#[derive(Clone, Debug, Deref, From)]
pub struct TokenIds(pub Array2<i64>);

/// The attention masks of the encoded sequences.
#[derive(Clone, Debug, Deref, From)]
pub struct AttentionMasks(pub Array2<i64>);

/// The type ids of the encoded sequences.
#[derive(Clone, Debug, Deref, From)]
pub struct TypeIds(pub Array2<i64>);

/// The encoded sequences.
///
/// All parts are of shape `(sequences, token_size)`.
#[derive(Clone, Debug)]
pub struct Encodings {
    pub token_ids: TokenIds,
    pub attention_masks: AttentionMasks,
    pub type_ids: TypeIds,
}

impl Encodings {
    /// Gets the number of encoded sequences.
    pub fn len(&self) -> usize {
        self.token_ids.nrows()
    }

    /// Checks if there are no encoded sequences.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gets the number of tokens per encoded sequence.
    pub fn token_size(&self) -> usize {
        self.token_ids.ncols()
    }
}

impl Tokenizer {
    /// Creates a tokenizer from a serialized `tokenizer.json`.
    ///
    /// Any padding and truncation strategies of the serialized tokenizer are replaced by fixed
    /// ones of `token_size`. The padding token is kept if the serialized tokenizer defines one,
    /// otherwise `[PAD]` is looked up in the vocabulary.
    pub fn new(
        // `Read` instead of `AsRef<Path>` is needed for in-memory tokenizers
        mut tokenizer: impl Read,
        token_size: usize,
    ) -> Result<Self, TokenizerError> {
        let mut bytes = Vec::new();
        tokenizer.read_to_end(&mut bytes)?;
        let mut tokenizer =
            HfTokenizer::from_bytes(&bytes).map_err(|error| TokenizerError::Load(error.to_string()))?;

        let (pad_id, pad_token) = match tokenizer.get_padding() {
            Some(padding) => (padding.pad_id, padding.pad_token.clone()),
            None => (tokenizer.token_to_id("[PAD]").unwrap_or(0), "[PAD]".into()),
        };
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: token_size,
                ..TruncationParams::default()
            }))
            .map_err(|error| TokenizerError::Load(error.to_string()))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(token_size),
            direction: PaddingDirection::Right,
            pad_id,
            pad_token,
            ..PaddingParams::default()
        }));

        Ok(Tokenizer {
            tokenizer,
            token_size,
        })
    }

    /// Encodes the batch of sequences.
    ///
    /// The encodings are in correct shape for the model.
    pub fn encode_batch(
        &self,
        sequences: &[impl AsRef<str>],
    ) -> Result<Encodings, TokenizerError> {
        let sequences = sequences.iter().map(AsRef::as_ref).collect::<Vec<&str>>();
        let encodings = self
            .tokenizer
            .encode_batch(sequences, true)
            .map_err(|error| TokenizerError::Encode(error.to_string()))?;
        let shape = (encodings.len(), self.token_size);

        let token_ids = Array2::from_shape_fn(shape, |(i, j)| {
            encodings[i].get_ids().get(j).copied().map_or(0, i64::from)
        })
        .into();
        let attention_masks = Array2::from_shape_fn(shape, |(i, j)| {
            encodings[i]
                .get_attention_mask()
                .get(j)
                .copied()
                .map_or(0, i64::from)
        })
        .into();
        let type_ids = Array2::from_shape_fn(shape, |(i, j)| {
            encodings[i].get_type_ids().get(j).copied().map_or(0, i64::from)
        })
        .into();

        Ok(Encodings {
            token_ids,
            attention_masks,
            type_ids,
        })
    }

    /// Gets the token size.
    pub fn token_size(&self) -> usize {
        self.token_size
    }
}
