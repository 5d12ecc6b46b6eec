
use crate::{
    labels::Label,
    model::{Encoder, ModelError, Prediction},
    ndarray::{Array2, Array4},
    tokenizer::Encodings,
};

/// A deterministic encoder without any weights.
///
/// The logits are one-hot at the sum of the token ids modulo the number of labels and the
/// hidden states only depend on the layer, the token id and the embedding position.
pub(crate) struct FakeEncoder {
    token_size: usize,
    embedding_size: usize,
    layers: usize,
}

impl FakeEncoder {
    pub(crate) fn new(token_size: usize) -> Self {
        Self {
            token_size,
            embedding_size: 3,
            layers: 5,
        }
    }

    pub(crate) fn with_layers(mut self, layers: usize) -> Self {
        self.layers = layers;
        self
    }

    pub(crate) fn state(layer: usize, token_id: i64, position: usize) -> f32 {
        layer as f32 + token_id as f32 / 10. + position as f32 / 100.
    }
}

impl Encoder for FakeEncoder {
    fn forward(
        &self,
        encodings: &Encodings,
        hidden_states: bool,
    ) -> Result<Prediction, ModelError> {
        let token_ids = &encodings.token_ids.0;
        let mut logits = Array2::zeros((encodings.len(), Label::COUNT));
        for (sequence, ids) in token_ids.outer_iter().enumerate() {
            logits[[sequence, ids.sum() as usize % Label::COUNT]] = 1.;
        }
        let hidden_states = hidden_states.then(|| {
            Array4::from_shape_fn(
                (
                    self.layers,
                    encodings.len(),
                    self.token_size,
                    self.embedding_size,
                ),
                |(layer, sequence, token, position)| {
                    Self::state(layer, token_ids[[sequence, token]], position)
                },
            )
        });

        Ok(Prediction {
            logits,
            hidden_states,
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
