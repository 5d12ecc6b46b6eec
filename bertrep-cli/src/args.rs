use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::PathBuf,
};

use anyhow::{Context, Error};
use bertrep::{Config, Device, Pipeline, TokenAveraging};
use log::info;
use serde::Serialize;
use structopt::StructOpt;

/// The arguments to load a model.
#[derive(StructOpt, Debug)]
pub struct ModelArgs {
    /// The directory with the `tokenizer.json` and the `model.onnx`.
    #[structopt(long, default_value = "data/bertrep_v0000")]
    pub model_dir: PathBuf,

    /// The number of tokens per span, including the special tokens.
    #[structopt(long, default_value = "512")]
    pub token_size: usize,

    /// The compute device, one of `cpu`, `cuda` or `cuda:<index>`.
    #[structopt(long, default_value = "cpu")]
    pub device: Device,

    /// Only average over the attended tokens instead of all tokens including the padding.
    #[structopt(long)]
    pub attended_only: bool,
}

impl ModelArgs {
    pub fn load(&self) -> Result<Pipeline, Error> {
        let averaging = if self.attended_only {
            TokenAveraging::Attended
        } else {
            TokenAveraging::All
        };
        let config = Config::from_dir(&self.model_dir)
            .with_context(|| format!("Loading the model from {:?} failed", self.model_dir))?
            .with_token_size(self.token_size)?
            .with_token_averaging(averaging)
            .with_device(self.device)?;
        let pipeline = Pipeline::from(config).context("Building the pipeline failed")?;
        info!("loaded model from {:?}", self.model_dir);

        Ok(pipeline)
    }
}

/// The arguments to collect the spans.
#[derive(StructOpt, Debug)]
pub struct SpanArgs {
    /// A file with one span per line, blank lines are skipped.
    #[structopt(long)]
    pub input: Option<PathBuf>,

    /// The spans, appended after the spans of the input file.
    pub spans: Vec<String>,
}

impl SpanArgs {
    pub fn load(self) -> Result<Vec<String>, Error> {
        let mut spans = match self.input {
            Some(path) => {
                let file = File::open(&path)
                    .with_context(|| format!("Opening the input file {:?} failed", path))?;
                read_spans(BufReader::new(file))?
            }
            None => Vec::new(),
        };
        spans.extend(self.spans);

        Ok(spans)
    }
}

fn read_spans(reader: impl BufRead) -> Result<Vec<String>, Error> {
    reader
        .lines()
        .filter(|line| !matches!(line, Ok(line) if line.trim().is_empty()))
        .map(|line| line.context("Reading the input file failed"))
        .collect()
}

/// The arguments to format the output.
#[derive(StructOpt, Debug)]
pub struct OutputArgs {
    /// Pretty prints the JSON output.
    #[structopt(long)]
    pub pretty: bool,
}

impl OutputArgs {
    pub fn print(&self, output: &impl Serialize) -> Result<(), Error> {
        let serialized = if self.pretty {
            serde_json::to_string_pretty(output)?
        } else {
            serde_json::to_string(output)?
        };
        println!("{}", serialized);

        Ok(())
    }
}
