use std::{io::Read, ops::RangeInclusive, sync::Arc};

use displaydoc::Display;
use log::info;
use thiserror::Error;
use tract_onnx::prelude::{
    tvec,
    Datum,
    Framework,
    InferenceFact,
    InferenceModelExt,
    TVec,
    Tensor,
    TractError,
    TypedModel,
    TypedSimplePlan,
};

use crate::{
    labels::Label,
    ndarray::{s, Array2, Array4, Axis, Ix2, Ix3, ShapeError},
    tokenizer::Encodings,
};

/// The potential errors of the model.
#[derive(Debug, Display, Error)]
pub enum ModelError {
    /// Failed to read the onnx model: {0}
    Read(#[from] std::io::Error),
    /// Failed to run a tract operation: {0}
    Tract(#[from] TractError),
    /// Invalid array shapes: {0}
    Shape(#[from] ShapeError),
    /// The token size must be at least two and at most 512, but is {0}
    TokenSize(usize),
    /// The onnx model must have two or three inputs, but has {0}
    Inputs(usize),
    /// Invalid onnx model output shapes
    Outputs,
    /// The classification head must have {expected} labels, but has {actual}
    Labels { expected: usize, actual: usize },
    /// The onnx model has no hidden state outputs
    HiddenStates,
}

/// The inferred outputs of the encoder for a batch of sequences.
#[derive(Clone, Debug)]
pub struct Prediction {
    /// The classification logits of shape `(sequences, labels)`.
    pub logits: Array2<f32>,
    /// The hidden states of shape `(layers, sequences, token_size, embedding_size)`.
    ///
    /// Only present if requested. The first layer is the embedding layer.
    pub hidden_states: Option<Array4<f32>>,
}

/// A pretrained encoder with a sequence classification head.
pub trait Encoder {
    /// Runs the encoder on the encoded sequences.
    ///
    /// The hidden states are only computed if requested.
    fn forward(&self, encodings: &Encodings, hidden_states: bool)
        -> Result<Prediction, ModelError>;

    /// Gets the number of tokens per sequence.
    fn token_size(&self) -> usize;

    /// Gets the size of the hidden states.
    fn embedding_size(&self) -> usize;

    /// Gets the number of hidden state layers including the embedding layer.
    fn layers(&self) -> usize;
}

/// A wrapped onnx model.
///
/// The model must take the token ids, the attention mask and optionally the type ids as inputs.
/// The first output must be the classification logits of shape `(1, labels)`, the remaining
/// outputs are the hidden states of the embedding layer and of each encoder layer, each of shape
/// `(1, token_size, embedding_size)`.
#[derive(Debug)]
pub struct Model {
    plan: TypedSimplePlan<TypedModel>,
    inputs: usize,
    token_size: usize,
    embedding_size: usize,
    layers: usize,
}

impl Model {
    /// The range of token sizes.
    pub const TOKEN_RANGE: RangeInclusive<usize> = 2..=512;

    /// Creates a model from an onnx model file.
    ///
    /// Requires the maximum number of tokens per tokenized sequence.
    pub fn new(
        // `Read` instead of `AsRef<Path>` is needed for in-memory models
        mut model: impl Read,
        token_size: usize,
    ) -> Result<Self, ModelError> {
        if !Self::TOKEN_RANGE.contains(&token_size) {
            return Err(ModelError::TokenSize(token_size));
        }

        let mut model = tract_onnx::onnx().model_for_read(&mut model)?;
        let inputs = model.input_outlets()?.len();
        if !(2..=3).contains(&inputs) {
            return Err(ModelError::Inputs(inputs));
        }
        // token ids, attention mask and optional type ids
        let input_fact = InferenceFact::dt_shape(i64::datum_type(), &[1, token_size]);
        for input in 0..inputs {
            model = model.with_input_fact(input, input_fact.clone())?;
        }
        let plan = model.into_optimized()?.into_runnable()?;

        let outputs = plan.model().output_outlets()?.len();
        let labels = match plan.model().output_fact(0)?.shape.as_concrete() {
            Some(&[1, labels]) => labels,
            _ => return Err(ModelError::Outputs),
        };
        if labels != Label::COUNT {
            return Err(ModelError::Labels {
                expected: Label::COUNT,
                actual: labels,
            });
        }

        let mut embedding_size = None;
        for output in 1..outputs {
            let size = match plan.model().output_fact(output)?.shape.as_concrete() {
                Some(&[1, tokens, size]) if tokens == token_size => size,
                _ => return Err(ModelError::Outputs),
            };
            if *embedding_size.get_or_insert(size) != size {
                return Err(ModelError::Outputs);
            }
        }
        let embedding_size = embedding_size.unwrap_or_default();
        let layers = outputs - 1;
        info!(
            "loaded onnx model with {} inputs, {} labels, {} hidden state layers of size {}",
            inputs, labels, layers, embedding_size,
        );

        Ok(Model {
            plan,
            inputs,
            token_size,
            embedding_size,
            layers,
        })
    }

    /// Runs the plan on a single encoded sequence.
    fn run(
        &self,
        encodings: &Encodings,
        sequence: usize,
    ) -> Result<TVec<Arc<Tensor>>, ModelError> {
        let row = |array: &Array2<i64>| -> Tensor {
            array.slice(s![sequence..sequence + 1, ..]).to_owned().into()
        };
        let mut inputs = tvec![
            row(&encodings.token_ids),
            row(&encodings.attention_masks),
        ];
        if self.inputs == 3 {
            inputs.push(row(&encodings.type_ids));
        }

        self.plan.run(inputs).map_err(Into::into)
    }
}

impl Encoder for Model {
    fn forward(
        &self,
        encodings: &Encodings,
        hidden_states: bool,
    ) -> Result<Prediction, ModelError> {
        debug_assert_eq!(encodings.token_size(), self.token_size);
        if hidden_states && self.layers == 0 {
            return Err(ModelError::HiddenStates);
        }

        let sequences = encodings.len();
        let mut logits = Array2::zeros((sequences, Label::COUNT));
        let mut states = hidden_states.then(|| {
            Array4::zeros((
                self.layers,
                sequences,
                self.token_size,
                self.embedding_size,
            ))
        });

        for sequence in 0..sequences {
            let outputs = self.run(encodings, sequence)?;
            logits.row_mut(sequence).assign(
                &outputs[0]
                    .to_array_view::<f32>()?
                    .into_dimensionality::<Ix2>()?
                    .index_axis(Axis(0), 0),
            );
            if let Some(states) = states.as_mut() {
                for (layer, output) in outputs[1..].iter().enumerate() {
                    states.slice_mut(s![layer, sequence, .., ..]).assign(
                        &output
                            .to_array_view::<f32>()?
                            .into_dimensionality::<Ix3>()?
                            .index_axis(Axis(0), 0),
                    );
                }
            }
        }

        Ok(Prediction {
            logits,
            hidden_states: states,
        })
    }

    fn token_size(&self) -> usize {
        self.token_size
    }

    fn embedding_size(&self) -> usize {
        self.embedding_size
    }

    fn layers(&self) -> usize {
        self.layers
    }
}
