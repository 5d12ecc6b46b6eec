#![cfg_attr(doc, forbid(broken_intra_doc_links, private_intra_doc_links))]
//! The rhetorical repertoire pipeline classifies Italian sequences and computes their embeddings.
//!
//! Sequences are anything string-like, usually sentences or short snippets of an interview. Each
//! sequence is classified into one of the rhetorical repertoire [`LABELS`]. The hidden states of
//! the underlying Bert encoder can be pooled over a batch of sequences into a single embedding,
//! whose size depends on the [`Pooling`] strategy.
//!
//! ```no_run
//! use bertrep::{Config, Pipeline, Pooling};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_dir("data/bertrep_v0000")?.with_token_size(128)?;
//!     let pipeline = Pipeline::from(config)?;
//!
//!     let sequences = ["Penso che sia giusto così.", "Perché non avevo tempo."];
//!     let labels = pipeline.predict(&sequences)?;
//!     assert_eq!(labels.len(), sequences.len());
//!
//!     let embedding = pipeline.pool(&sequences, Pooling::LastAverage)?;
//!     assert_eq!(embedding.shape(), [pipeline.embedding_size()]);
//!
//!     Ok(())
//! }
//! ```

mod config;
mod labels;
mod model;
mod pipeline;
mod pooler;
mod tokenizer;

pub use ndarray;

pub use crate::{
    config::{Config, ConfigError, Device},
    labels::{Label, LabelError, LABELS},
    model::{Encoder, Model, ModelError, Prediction},
    pipeline::{Pipeline, PipelineError},
    pooler::{
        Embedding,
        Embedding1,
        Embedding2,
        Embedding4,
        ParsePoolingError,
        Pooling,
        PoolerError,
        TokenAveraging,
    },
    tokenizer::{AttentionMasks, Encodings, TokenIds, Tokenizer, TokenizerError, TypeIds},
};

#[cfg(test)]
pub(crate) mod tests;
