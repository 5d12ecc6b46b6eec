use anyhow::{Context, Error};
use bertrep::Pooling;
use structopt::StructOpt;

use crate::{
    args::{ModelArgs, OutputArgs, SpanArgs},
    exit_code::NO_ERROR,
};

/// Pools the hidden states of all spans into a single embedding.
///
/// Prints a JSON array of floats.
#[derive(StructOpt, Debug)]
pub struct PoolCmd {
    /// The pooling strategy, one of `last_hidden_state_average`, `last_hidden_state_concat`,
    /// `four_last_hidden_state_concat`, `four_last_hidden_state_sum` or `cls_last_hidden_state`.
    #[structopt(long)]
    strategy: Pooling,

    #[structopt(flatten)]
    model: ModelArgs,

    #[structopt(flatten)]
    output: OutputArgs,

    #[structopt(flatten)]
    spans: SpanArgs,
}

impl PoolCmd {
    pub fn run(self) -> Result<i32, Error> {
        let strategy = self.strategy;
        let pipeline = self.model.load()?;
        let spans = self.spans.load()?;

        let embedding = pipeline
            .pool(&spans, strategy)
            .with_context(|| format!("Pooling with {} failed", strategy))?;
        self.output.print(&embedding.to_vec())?;

        Ok(NO_ERROR)
    }
}
