use std::convert::TryFrom;

use displaydoc::Display;
use log::{debug, info};
use thiserror::Error;

use crate::{
    config::{Config, ConfigError},
    labels::{Label, LabelError},
    model::{Encoder, Model, ModelError, Prediction},
    ndarray::{Array2, Array4, Axis},
    pooler::{Embedding1, Embedding2, Embedding4, Pooling, PoolerError, TokenAveraging},
    tokenizer::{Encodings, Tokenizer, TokenizerError},
};

/// A pipeline for a rhetorical repertoire Bert model.
///
/// Can be created from a [`Config`] and consists of a tokenizer, an encoder and a token averaging
/// strategy for the poolings.
pub struct Pipeline<M = Model> {
    pub(crate) tokenizer: Tokenizer,
    pub(crate) model: M,
    pub(crate) averaging: TokenAveraging,
}

/// The potential errors of the [`Pipeline`].
#[derive(Debug, Display, Error)]
pub enum PipelineError {
    /// The batch of sequences must not be empty
    EmptyBatch,
    /// The token sizes of the tokenizer {tokenizer} and the model {model} don't match
    TokenSize { tokenizer: usize, model: usize },
    /// Failed to build the pipeline: {0}
    Config(#[from] ConfigError),
    /// Failed to run the tokenizer: {0}
    Tokenizer(#[from] TokenizerError),
    /// Failed to run the model: {0}
    Model(#[from] ModelError),
    /// Failed to run the pooler: {0}
    Pooler(#[from] PoolerError),
    /// Failed to decode the labels: {0}
    Label(#[from] LabelError),
}

impl Pipeline<Model> {
    /// Creates a pipeline with an onnx model.
    pub fn from(config: Config) -> Result<Self, PipelineError> {
        let tokenizer = Tokenizer::new(config.tokenizer, config.token_size)?;
        let model = Model::new(config.model, config.token_size)?;
        info!(
            "built pipeline on {} with token size {} and {:?} token averaging",
            config.device, config.token_size, config.averaging,
        );

        Self::new(tokenizer, model, config.averaging)
    }
}

impl<M> Pipeline<M>
where
    M: Encoder,
{
    /// Creates a pipeline from its parts.
    ///
    /// # Errors
    /// Fails if the token sizes of the tokenizer and the model don't match.
    pub fn new(
        tokenizer: Tokenizer,
        model: M,
        averaging: TokenAveraging,
    ) -> Result<Self, PipelineError> {
        if tokenizer.token_size() == model.token_size() {
            Ok(Pipeline {
                tokenizer,
                model,
                averaging,
            })
        } else {
            Err(PipelineError::TokenSize {
                tokenizer: tokenizer.token_size(),
                model: model.token_size(),
            })
        }
    }

    /// Encodes the sequences and runs the model on them.
    fn encode(
        &self,
        sequences: &[impl AsRef<str>],
        hidden_states: bool,
    ) -> Result<(Encodings, Prediction), PipelineError> {
        if sequences.is_empty() {
            return Err(PipelineError::EmptyBatch);
        }

        let encodings = self.tokenizer.encode_batch(sequences)?;
        let prediction = self.model.forward(&encodings, hidden_states)?;

        Ok((encodings, prediction))
    }

    /// Runs the model and takes its hidden states.
    fn hidden_states_of(
        &self,
        sequences: &[impl AsRef<str>],
    ) -> Result<(Encodings, Array4<f32>), PipelineError> {
        let (encodings, prediction) = self.encode(sequences, true)?;
        let hidden_states = prediction.hidden_states.ok_or(ModelError::HiddenStates)?;

        Ok((encodings, hidden_states))
    }

    /// Predicts the repertoire label of each sequence.
    ///
    /// The labels are in the same order as the sequences.
    pub fn predict(&self, sequences: &[impl AsRef<str>]) -> Result<Vec<Label>, PipelineError> {
        debug!("predicting the labels of {} sequences", sequences.len());
        self.probabilities(sequences)?
            .outer_iter()
            .map(|probabilities| {
                let index = probabilities
                    .iter()
                    .enumerate()
                    .fold((0, f32::NEG_INFINITY), |(argmax, max), (index, &probability)| {
                        if probability > max {
                            (index, probability)
                        } else {
                            (argmax, max)
                        }
                    })
                    .0;
                Label::try_from(index).map_err(Into::into)
            })
            .collect()
    }

    /// Computes the label probabilities of each sequence.
    ///
    /// The probabilities are of shape `(sequences, labels)`.
    pub fn probabilities(
        &self,
        sequences: &[impl AsRef<str>],
    ) -> Result<Embedding2, PipelineError> {
        let logits = self.output_states(sequences)?.into_inner();
        Ok(softmax(logits).into())
    }

    /// Computes the raw classification logits of each sequence.
    ///
    /// The logits are of shape `(sequences, labels)`.
    pub fn output_states(
        &self,
        sequences: &[impl AsRef<str>],
    ) -> Result<Embedding2, PipelineError> {
        let (_, prediction) = self.encode(sequences, false)?;
        Ok(prediction.logits.into())
    }

    /// Computes the stacked hidden states of all layers.
    ///
    /// The hidden states are of shape `(layers, sequences, token_size, embedding_size)`, the
    /// first layer is the embedding layer.
    pub fn hidden_states(
        &self,
        sequences: &[impl AsRef<str>],
    ) -> Result<Embedding4, PipelineError> {
        debug!("computing the hidden states of {} sequences", sequences.len());
        let (_, hidden_states) = self.hidden_states_of(sequences)?;
        Ok(hidden_states.into())
    }

    /// Pools the hidden states of the sequences into a single embedding.
    pub fn pool(
        &self,
        sequences: &[impl AsRef<str>],
        pooling: Pooling,
    ) -> Result<Embedding1, PipelineError> {
        debug!("pooling {} sequences with {}", sequences.len(), pooling);
        if self.model.layers() < pooling.layers() {
            return Err(PoolerError::Layers {
                required: pooling.layers(),
                actual: self.model.layers(),
            }
            .into());
        }

        let (encodings, hidden_states) = self.hidden_states_of(sequences)?;
        pooling
            .pool(
                hidden_states.view(),
                encodings.attention_masks.view(),
                self.averaging,
            )
            .map_err(Into::into)
    }

    /// Averages the tokens of the last layer over all sequences.
    pub fn last_hidden_state_average(
        &self,
        sequences: &[impl AsRef<str>],
    ) -> Result<Embedding1, PipelineError> {
        self.pool(sequences, Pooling::LastAverage)
    }

    /// Concatenates the tokens of the last layer and averages them over all sequences.
    pub fn last_hidden_state_concat(
        &self,
        sequences: &[impl AsRef<str>],
    ) -> Result<Embedding1, PipelineError> {
        self.pool(sequences, Pooling::LastConcat)
    }

    /// Concatenates the last four layers, averages the tokens and the sequences.
    pub fn four_last_hidden_state_concat(
        &self,
        sequences: &[impl AsRef<str>],
    ) -> Result<Embedding1, PipelineError> {
        self.pool(sequences, Pooling::FourLastConcat)
    }

    /// Sums the last four layers, averages the tokens and the sequences.
    pub fn four_last_hidden_state_sum(
        &self,
        sequences: &[impl AsRef<str>],
    ) -> Result<Embedding1, PipelineError> {
        self.pool(sequences, Pooling::FourLastSum)
    }

    /// Averages the first tokens (`[CLS]`) of the last layer over all sequences.
    pub fn cls_last_hidden_state(
        &self,
        sequences: &[impl AsRef<str>],
    ) -> Result<Embedding1, PipelineError> {
        self.pool(sequences, Pooling::LastFirst)
    }

    /// Gets the token size.
    pub fn token_size(&self) -> usize {
        self.tokenizer.token_size()
    }

    /// Gets the embedding size.
    pub fn embedding_size(&self) -> usize {
        self.model.embedding_size()
    }

    /// Gets the number of hidden state layers including the embedding layer.
    pub fn layers(&self) -> usize {
        self.model.layers()
    }
}

/// Computes the softmax along the last axis of the logits.
///
/// The maximum is subtracted first to prevent an overflow, which doesn't affect the outcome.
fn softmax(logits: Array2<f32>) -> Array2<f32> {
    let max = logits
        .fold_axis(Axis(1), f32::NEG_INFINITY, |max, logit| max.max(*logit))
        .insert_axis(Axis(1));
    let mut exp = logits - max;
    exp.mapv_inplace(f32::exp);
    let sum = exp.sum_axis(Axis(1)).insert_axis(Axis(1));

    exp / sum
}

#[cfg(test)]
mod tests {
    use std::{error::Error, sync::Arc, thread};

    use test_utils::{assert_approx_eq, tokenizer::TOKENIZER};

    use super::*;
    use crate::{labels::LABELS, ndarray::arr2, tests::FakeEncoder};

    const TOKEN_SIZE: usize = 8;

    fn pipeline(averaging: TokenAveraging) -> Pipeline<FakeEncoder> {
        let tokenizer = Tokenizer::new(TOKENIZER.as_bytes(), TOKEN_SIZE).unwrap();
        Pipeline::new(tokenizer, FakeEncoder::new(TOKEN_SIZE), averaging).unwrap()
    }

    #[test]
    fn test_predict() -> Result<(), Box<dyn Error>> {
        let pipeline = pipeline(TokenAveraging::All);

        let labels = pipeline.predict(&["Questo è un esempio."])?;
        assert_eq!(labels.len(), 1);
        assert!(LABELS.contains(&labels[0].as_str()));

        let sequences = ["a", "b", "a b", "questo", "", "zzz"];
        let labels = pipeline.predict(&sequences)?;
        assert_eq!(labels.len(), sequences.len());
        for (sequence, label) in sequences.iter().zip(&labels) {
            assert_eq!(pipeline.predict(&[sequence])?, [*label]);
        }
        Ok(())
    }

    #[test]
    fn test_predict_argmax() -> Result<(), Box<dyn Error>> {
        let pipeline = pipeline(TokenAveraging::All);
        // the fake encoder peaks at the sum of the token ids modulo the number of labels
        // "a" -> [CLS] a [SEP] -> 2 + 9 + 3 = 14
        // "a b" -> [CLS] a b [SEP] -> 2 + 9 + 10 + 3 = 24 -> 1
        let labels = pipeline.predict(&["a", "a b"])?;
        assert_eq!(labels[0].as_str(), "opinione");
        assert_eq!(labels[1].as_str(), "causa");
        Ok(())
    }

    #[test]
    fn test_probabilities() -> Result<(), Box<dyn Error>> {
        let pipeline = pipeline(TokenAveraging::All);
        let probabilities = pipeline.probabilities(&["a", "b"])?;
        assert_eq!(probabilities.shape(), [2, Label::COUNT]);
        assert_approx_eq!(f32, probabilities.sum_axis(Axis(1)), [1., 1.], epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn test_output_states() -> Result<(), Box<dyn Error>> {
        let pipeline = pipeline(TokenAveraging::All);
        let logits = pipeline.output_states(&["a", "a b", "b"])?;
        assert_eq!(logits.shape(), [3, Label::COUNT]);
        assert_eq!(logits[[0, 14]], 1.);
        assert_eq!(logits[[1, 1]], 1.);
        assert_eq!(logits.sum(), 3.);
        Ok(())
    }

    #[test]
    fn test_hidden_states() -> Result<(), Box<dyn Error>> {
        let pipeline = pipeline(TokenAveraging::All);
        let hidden_states = pipeline.hidden_states(&["a", "b"])?;
        assert_eq!(
            hidden_states.shape(),
            [
                pipeline.layers(),
                2,
                pipeline.token_size(),
                pipeline.embedding_size(),
            ],
        );
        Ok(())
    }

    #[test]
    fn test_pool_sizes() -> Result<(), Box<dyn Error>> {
        let pipeline = pipeline(TokenAveraging::All);
        let size = pipeline.embedding_size();
        for sequences in [
            &["a"][..],
            &["a", "b"][..],
            &["questo è un esempio", "a", "b b b"][..],
        ] {
            assert_eq!(pipeline.last_hidden_state_average(sequences)?.len(), size);
            assert_eq!(
                pipeline.last_hidden_state_concat(sequences)?.len(),
                size * TOKEN_SIZE,
            );
            assert_eq!(
                pipeline.four_last_hidden_state_concat(sequences)?.len(),
                size * 4,
            );
            assert_eq!(pipeline.four_last_hidden_state_sum(sequences)?.len(), size);
            assert_eq!(pipeline.cls_last_hidden_state(sequences)?.len(), size);
        }
        Ok(())
    }

    #[test]
    fn test_pool_matches_hidden_states() -> Result<(), Box<dyn Error>> {
        let pipeline = pipeline(TokenAveraging::Attended);
        let sequences = ["a b", "questo è un esempio."];
        let hidden_states = pipeline.hidden_states(&sequences)?;
        let masks = arr2(&[
            [1, 1, 1, 1, 0, 0, 0, 0],
            [1, 1, 1, 1, 1, 1, 1, 0],
        ]);
        for pooling in Pooling::ALL {
            let expected =
                pooling.pool(hidden_states.view(), masks.view(), TokenAveraging::Attended)?;
            assert_eq!(pipeline.pool(&sequences, pooling)?, expected);
        }
        Ok(())
    }

    #[test]
    fn test_cls_averages_sequences() -> Result<(), Box<dyn Error>> {
        let pipeline = pipeline(TokenAveraging::All);
        let a = pipeline.cls_last_hidden_state(&["a"])?;
        let b = pipeline.cls_last_hidden_state(&["b"])?;
        let ab = pipeline.cls_last_hidden_state(&["a", "b"])?;
        assert_eq!(ab.shape(), [pipeline.embedding_size()]);
        assert_eq!(ab, (&*a + &*b) / 2.);
        Ok(())
    }

    #[test]
    fn test_padding_enters_average() -> Result<(), Box<dyn Error>> {
        let all = pipeline(TokenAveraging::All).last_hidden_state_average(&["a"])?;
        let attended = pipeline(TokenAveraging::Attended).last_hidden_state_average(&["a"])?;
        assert_ne!(all, attended);
        Ok(())
    }

    #[test]
    fn test_idempotent() -> Result<(), Box<dyn Error>> {
        let pipeline = pipeline(TokenAveraging::All);
        let sequences = ["Questo è un esempio.", "a b"];
        assert_eq!(pipeline.predict(&sequences)?, pipeline.predict(&sequences)?);
        assert_eq!(
            pipeline.output_states(&sequences)?,
            pipeline.output_states(&sequences)?,
        );
        for pooling in Pooling::ALL {
            assert_eq!(
                pipeline.pool(&sequences, pooling)?,
                pipeline.pool(&sequences, pooling)?,
            );
        }
        Ok(())
    }

    #[test]
    fn test_empty_batch() {
        let pipeline = pipeline(TokenAveraging::All);
        let sequences: [&str; 0] = [];
        assert!(matches!(
            pipeline.predict(&sequences),
            Err(PipelineError::EmptyBatch),
        ));
        assert!(matches!(
            pipeline.output_states(&sequences),
            Err(PipelineError::EmptyBatch),
        ));
        assert!(matches!(
            pipeline.hidden_states(&sequences),
            Err(PipelineError::EmptyBatch),
        ));
        for pooling in Pooling::ALL {
            assert!(matches!(
                pipeline.pool(&sequences, pooling),
                Err(PipelineError::EmptyBatch),
            ));
        }
    }

    #[test]
    fn test_too_few_layers() {
        let tokenizer = Tokenizer::new(TOKENIZER.as_bytes(), TOKEN_SIZE).unwrap();
        let model = FakeEncoder::new(TOKEN_SIZE).with_layers(3);
        let pipeline = Pipeline::new(tokenizer, model, TokenAveraging::All).unwrap();
        assert!(pipeline.last_hidden_state_average(&["a"]).is_ok());
        assert!(matches!(
            pipeline.four_last_hidden_state_sum(&["a"]),
            Err(PipelineError::Pooler(PoolerError::Layers {
                required: 4,
                actual: 3,
            })),
        ));
    }

    #[test]
    fn test_mismatched_token_size() {
        let tokenizer = Tokenizer::new(TOKENIZER.as_bytes(), TOKEN_SIZE).unwrap();
        assert!(matches!(
            Pipeline::new(tokenizer, FakeEncoder::new(16), TokenAveraging::All),
            Err(PipelineError::TokenSize {
                tokenizer: 8,
                model: 16,
            }),
        ));
    }

    #[test]
    fn test_shared_across_threads() {
        let pipeline = Arc::new(pipeline(TokenAveraging::All));
        let expected = pipeline.cls_last_hidden_state(&["a b"]).unwrap();
        let handles = (0..4)
            .map(|_| {
                let pipeline = Arc::clone(&pipeline);
                thread::spawn(move || pipeline.cls_last_hidden_state(&["a b"]).unwrap())
            })
            .collect::<Vec<_>>();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }

    #[test]
    fn test_softmax() {
        let logits = arr2(&[[-1_f32, 0., 1., 2., 3.], [1., -1., 1., -1., 1.]]);
        let probabilities = softmax(logits);
        assert_approx_eq!(
            f32,
            probabilities,
            [
                [0.011656231, 0.03168492, 0.08612854, 0.23412167, 0.6364086],
                [0.3057477, 0.04137845, 0.3057477, 0.04137845, 0.3057477],
            ],
            epsilon = 1e-6,
        );

        // no overflow
        let probabilities = softmax(arr2(&[[1000_f32, 1000.]]));
        assert_approx_eq!(f32, probabilities, [[0.5, 0.5]]);
    }

    #[test]
    fn test_hidden_states_layout() -> Result<(), Box<dyn Error>> {
        let pipeline = pipeline(TokenAveraging::All);
        let hidden_states: Array4<f32> = pipeline.hidden_states(&["a"])?.into_inner();
        // [CLS] of the embedding layer
        assert_eq!(hidden_states[[0, 0, 0, 0]], FakeEncoder::state(0, 2, 0));
        // padding of the last layer
        let last = pipeline.layers() - 1;
        assert_eq!(hidden_states[[last, 0, 4, 1]], FakeEncoder::state(last, 0, 1));
        Ok(())
    }
}
