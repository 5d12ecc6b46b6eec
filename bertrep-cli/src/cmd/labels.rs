use anyhow::Error;
use bertrep::Label;
use structopt::StructOpt;

use crate::exit_code::NO_ERROR;

/// Prints the rhetorical repertoires with the indices of the classification head.
#[derive(StructOpt, Debug)]
pub struct LabelsCmd {}

impl LabelsCmd {
    pub fn run(self) -> Result<i32, Error> {
        for label in Label::all() {
            println!("{}\t{}", label.index(), label);
        }

        Ok(NO_ERROR)
    }
}
