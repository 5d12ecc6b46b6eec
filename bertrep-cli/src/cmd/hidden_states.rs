use anyhow::{Context, Error};
use structopt::StructOpt;

use crate::{
    args::{ModelArgs, OutputArgs, SpanArgs},
    exit_code::NO_ERROR,
};

/// Computes the hidden states of all layers.
///
/// Prints a JSON array of shape `(layers, spans, tokens, embedding)`, the first layer is the
/// embedding layer.
#[derive(StructOpt, Debug)]
pub struct HiddenStatesCmd {
    #[structopt(flatten)]
    model: ModelArgs,

    #[structopt(flatten)]
    output: OutputArgs,

    #[structopt(flatten)]
    spans: SpanArgs,
}

impl HiddenStatesCmd {
    pub fn run(self) -> Result<i32, Error> {
        let pipeline = self.model.load()?;
        let spans = self.spans.load()?;

        let hidden_states = pipeline
            .hidden_states(&spans)
            .context("Computing the hidden states failed")?;
        let hidden_states = hidden_states
            .outer_iter()
            .map(|layer| {
                layer
                    .outer_iter()
                    .map(|span| {
                        span.outer_iter()
                            .map(|token| token.to_vec())
                            .collect::<Vec<_>>()
                    })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        self.output.print(&hidden_states)?;

        Ok(NO_ERROR)
    }
}
