use anyhow::{Context, Error};
use structopt::StructOpt;

use crate::{
    args::{ModelArgs, OutputArgs, SpanArgs},
    exit_code::NO_ERROR,
};

/// Computes the raw classification logits of each span.
///
/// Prints a JSON array of shape `(spans, labels)`, the labels are in the order of the `labels`
/// command.
#[derive(StructOpt, Debug)]
pub struct LogitsCmd {
    #[structopt(flatten)]
    model: ModelArgs,

    #[structopt(flatten)]
    output: OutputArgs,

    #[structopt(flatten)]
    spans: SpanArgs,
}

impl LogitsCmd {
    pub fn run(self) -> Result<i32, Error> {
        let pipeline = self.model.load()?;
        let spans = self.spans.load()?;

        let logits = pipeline
            .output_states(&spans)
            .context("Computing the logits failed")?;
        let logits = logits
            .outer_iter()
            .map(|logits| logits.to_vec())
            .collect::<Vec<_>>();
        self.output.print(&logits)?;

        Ok(NO_ERROR)
    }
}
