use anyhow::{Context, Error};
use structopt::StructOpt;

use crate::{
    args::{ModelArgs, OutputArgs, SpanArgs},
    exit_code::NO_ERROR,
};

/// Predicts the rhetorical repertoire of each span.
///
/// Prints a JSON array with one label per span.
#[derive(StructOpt, Debug)]
pub struct PredictCmd {
    #[structopt(flatten)]
    model: ModelArgs,

    #[structopt(flatten)]
    output: OutputArgs,

    #[structopt(flatten)]
    spans: SpanArgs,
}

impl PredictCmd {
    pub fn run(self) -> Result<i32, Error> {
        let pipeline = self.model.load()?;
        let spans = self.spans.load()?;

        let labels = pipeline.predict(&spans).context("Predicting the labels failed")?;
        self.output.print(&labels)?;

        Ok(NO_ERROR)
    }
}
