use std::process::exit;

use anyhow::Error;
use log::debug;
use structopt::StructOpt;

use crate::exit_code::FATAL_ERROR;

mod args;
mod cmd;
mod exit_code;

/// Classifies and embeds Italian spans with a rhetorical repertoire model.
#[derive(StructOpt, Debug)]
#[structopt(name = "bertrep")]
enum CommandArgs {
    Predict(cmd::PredictCmd),
    Pool(cmd::PoolCmd),
    Logits(cmd::LogitsCmd),
    HiddenStates(cmd::HiddenStatesCmd),
    Labels(cmd::LabelsCmd),
}

impl CommandArgs {
    fn run(self) -> Result<i32, Error> {
        debug!("running {:?}", self);
        match self {
            CommandArgs::Predict(cmd) => cmd.run(),
            CommandArgs::Pool(cmd) => cmd.run(),
            CommandArgs::Logits(cmd) => cmd.run(),
            CommandArgs::HiddenStates(cmd) => cmd.run(),
            CommandArgs::Labels(cmd) => cmd.run(),
        }
    }
}

fn main() {
    env_logger::init();

    let exit_code = match CommandArgs::from_args().run() {
        Ok(exit_code) => exit_code,
        Err(error) => {
            eprintln!("{:?}", error);
            FATAL_ERROR
        }
    };

    exit(exit_code);
}
