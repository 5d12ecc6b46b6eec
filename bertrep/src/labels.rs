use std::{
    convert::TryFrom,
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use displaydoc::Display;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// The rhetorical repertoires in the order of the classification head.
///
/// The table is sorted, which is the order in which the labels were encoded for training.
pub const LABELS: [&str; 23] = [
    "anticipazione",
    "causa",
    "commento",
    "conferma",
    "considerazione",
    "contrapposizione",
    "deresponsabilizzazione",
    "descrizione",
    "dichiarazione di intenti",
    "generalizzazione",
    "giudizio",
    "giustificazione",
    "implicazione",
    "non risposta",
    "opinione",
    "possibilità",
    "prescrizione",
    "previsione",
    "proposta",
    "ridimensionamento",
    "sancire",
    "specificazione",
    "valutazione",
];

/// A rhetorical repertoire label.
///
/// The label is guaranteed to be an index into [`LABELS`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(usize);

/// The potential errors of the label decoding.
#[derive(Debug, Display, Error, PartialEq)]
pub enum LabelError {
    /// Invalid label index {0}, must be less than 23
    Index(usize),
    /// Unknown label '{0}'
    Unknown(String),
}

impl Label {
    /// The number of labels.
    pub const COUNT: usize = LABELS.len();

    /// Iterates over all labels in index order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..Self::COUNT).map(Label)
    }

    /// Gets the index of the label in the classification head.
    pub fn index(self) -> usize {
        self.0
    }

    /// Gets the label string.
    pub fn as_str(self) -> &'static str {
        LABELS[self.0]
    }
}

impl TryFrom<usize> for Label {
    type Error = LabelError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        if index < Self::COUNT {
            Ok(Label(index))
        } else {
            Err(LabelError::Index(index))
        }
    }
}

impl FromStr for Label {
    type Err = LabelError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        LABELS
            .binary_search(&label)
            .map(Label)
            .map_err(|_| LabelError::Unknown(label.into()))
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl Serialize for Label {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}
