use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use derive_more::{Deref, From};
use displaydoc::Display;
use float_cmp::{ApproxEq, F32Margin};
use ndarray::{
    concatenate,
    s,
    Array,
    Array1,
    Array2,
    ArrayBase,
    ArrayView2,
    ArrayView3,
    ArrayView4,
    Axis,
    Data,
    Dimension,
    Ix1,
    Ix2,
    Ix4,
    ShapeError,
    Zip,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A d-dimensional sequence embedding.
#[derive(Clone, Debug, Deref, From, Serialize, Deserialize)]
pub struct Embedding<D>(Array<f32, D>)
where
    D: Dimension;

/// A 1-dimensional embedding of a batch of sequences.
pub type Embedding1 = Embedding<Ix1>;

/// A 2-dimensional embedding, e.g. the logits per sequence.
pub type Embedding2 = Embedding<Ix2>;

/// A 4-dimensional embedding, e.g. the hidden states per layer, sequence and token.
pub type Embedding4 = Embedding<Ix4>;

impl<D> Embedding<D>
where
    D: Dimension,
{
    /// Unwraps the embedding array.
    pub fn into_inner(self) -> Array<f32, D> {
        self.0
    }
}

impl<S, D> PartialEq<ArrayBase<S, D>> for Embedding<D>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    fn eq(&self, other: &ArrayBase<S, D>) -> bool {
        if self.shape() != other.shape() {
            return false;
        }

        let margin = F32Margin::default();
        Zip::from(&self.0)
            .and(other)
            .all(|this, other| (*this).approx_eq(*other, margin))
    }
}

impl<S, D> PartialEq<Embedding<D>> for ArrayBase<S, D>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    fn eq(&self, other: &Embedding<D>) -> bool {
        other.eq(self)
    }
}

impl<D> PartialEq for Embedding<D>
where
    D: Dimension,
{
    fn eq(&self, other: &Self) -> bool {
        self.eq(&other.0)
    }
}

/// The potential errors of the pooler.
#[derive(Debug, Display, Error)]
pub enum PoolerError {
    /// The pooling requires at least {required} hidden state layers, but got {actual}
    Layers { required: usize, actual: usize },
    /// The pooling requires at least one sequence
    Sequences,
    /// The pooling requires at least one token per sequence
    Tokens,
    /// The attention masks don't match the hidden states
    AttentionMasks,
    /// Invalid array shapes: {0}
    Shape(#[from] ShapeError),
}

/// The token positions which enter a token average.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TokenAveraging {
    /// Averages over all token positions, including the padding.
    #[default]
    All,
    /// Averages over the attended token positions only.
    ///
    /// Sequences without attended tokens average to zero.
    Attended,
}

/// A pooling strategy over the hidden states of a batch of sequences.
///
/// Each strategy collapses the layers, the tokens and the sequences into a single embedding.
/// The sequence axis is always averaged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pooling {
    /// Averages the tokens of the last layer.
    LastAverage,
    /// Concatenates the tokens of the last layer.
    LastConcat,
    /// Concatenates the features of the last four layers per token and averages the tokens.
    FourLastConcat,
    /// Sums the last four layers and averages the tokens.
    FourLastSum,
    /// Takes the first token (`[CLS]`) of the last layer.
    LastFirst,
}

#[derive(Debug, Display, Error, PartialEq)]
/// Unknown pooling strategy '{0}'
pub struct ParsePoolingError(String);

impl Pooling {
    /// All pooling strategies.
    pub const ALL: [Pooling; 5] = [
        Pooling::LastAverage,
        Pooling::LastConcat,
        Pooling::FourLastConcat,
        Pooling::FourLastSum,
        Pooling::LastFirst,
    ];

    /// The name of the pooling strategy.
    pub fn name(self) -> &'static str {
        match self {
            Pooling::LastAverage => "last_hidden_state_average",
            Pooling::LastConcat => "last_hidden_state_concat",
            Pooling::FourLastConcat => "four_last_hidden_state_concat",
            Pooling::FourLastSum => "four_last_hidden_state_sum",
            Pooling::LastFirst => "cls_last_hidden_state",
        }
    }

    /// The number of trailing hidden state layers the strategy pools over.
    pub fn layers(self) -> usize {
        match self {
            Pooling::LastAverage | Pooling::LastConcat | Pooling::LastFirst => 1,
            Pooling::FourLastConcat | Pooling::FourLastSum => 4,
        }
    }

    /// Computes the size of the pooled embedding.
    pub fn embedding_size(self, embedding_size: usize, token_size: usize) -> usize {
        match self {
            Pooling::LastAverage | Pooling::FourLastSum | Pooling::LastFirst => embedding_size,
            Pooling::LastConcat => embedding_size * token_size,
            Pooling::FourLastConcat => embedding_size * 4,
        }
    }

    /// Pools the hidden states.
    ///
    /// The hidden states are of shape `(layers, sequences, tokens, embedding_size)` and the
    /// attention masks are of shape `(sequences, tokens)`.
    pub fn pool(
        self,
        hidden_states: ArrayView4<f32>,
        attention_masks: ArrayView2<i64>,
        averaging: TokenAveraging,
    ) -> Result<Embedding1, PoolerError> {
        let (layers, sequences, tokens, _) = hidden_states.dim();
        if layers < self.layers() {
            return Err(PoolerError::Layers {
                required: self.layers(),
                actual: layers,
            });
        }
        if sequences == 0 {
            return Err(PoolerError::Sequences);
        }
        if tokens == 0 {
            return Err(PoolerError::Tokens);
        }
        if attention_masks.dim() != (sequences, tokens) {
            return Err(PoolerError::AttentionMasks);
        }

        let last = hidden_states.index_axis(Axis(0), layers - 1);
        let pooled = match self {
            Pooling::LastAverage => average_tokens(last, attention_masks, averaging),
            Pooling::LastConcat => last
                .to_owned()
                .into_shape((sequences, tokens * last.len_of(Axis(2))))?,
            Pooling::FourLastConcat => {
                let four_last = hidden_states.slice(s![layers - 4.., .., .., ..]);
                let concat = concatenate(Axis(2), &four_last.outer_iter().collect::<Vec<_>>())?;
                average_tokens(concat.view(), attention_masks, averaging)
            }
            Pooling::FourLastSum => {
                let sum = hidden_states
                    .slice(s![layers - 4.., .., .., ..])
                    .sum_axis(Axis(0));
                average_tokens(sum.view(), attention_masks, averaging)
            }
            Pooling::LastFirst => last.index_axis(Axis(1), 0).to_owned(),
        };

        average_sequences(pooled)
    }
}

impl Display for Pooling {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.name())
    }
}

impl FromStr for Pooling {
    type Err = ParsePoolingError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Pooling::ALL
            .iter()
            .copied()
            .find(|pooling| pooling.name() == name)
            .ok_or_else(|| ParsePoolingError(name.into()))
    }
}

/// Averages the tokens of shape `(sequences, tokens, embedding_size)` per sequence.
///
/// Requires at least one token.
fn average_tokens(
    states: ArrayView3<f32>,
    attention_masks: ArrayView2<i64>,
    averaging: TokenAveraging,
) -> Array2<f32> {
    let (sequences, tokens, embedding_size) = states.dim();
    match averaging {
        TokenAveraging::All => states.sum_axis(Axis(1)) / tokens as f32,
        TokenAveraging::Attended => {
            let mut averages = Array2::zeros((sequences, embedding_size));
            for ((mut average, states), mask) in averages
                .outer_iter_mut()
                .zip(states.outer_iter())
                .zip(attention_masks.outer_iter())
            {
                let mask: Array1<f32> = mask.mapv(|mask| (mask != 0) as u8 as f32);
                let count = mask.sum();
                if count > 0. {
                    average.assign(&(mask.dot(&states) / count));
                }
            }
            averages
        }
    }
}

/// Averages the pooled sequences of shape `(sequences, size)`.
fn average_sequences(pooled: Array2<f32>) -> Result<Embedding1, PoolerError> {
    pooled
        .mean_axis(Axis(0))
        .map(Into::into)
        .ok_or(PoolerError::Sequences)
}
