use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::File,
    io::{BufReader, Read},
    path::Path,
    str::FromStr,
};

use displaydoc::Display;
use thiserror::Error;

use crate::{model::Model, pooler::TokenAveraging};

/// The potential errors of the configuration.
#[derive(Debug, Display, Error)]
pub enum ConfigError {
    /// The token size must be at least two to allow for special tokens and at most 512
    TokenSize,
    /// The device {0} is not available, only the cpu is supported
    Device(Device),
    /// Unknown device '{0}', expected 'cpu', 'cuda' or 'cuda:<index>'
    ParseDevice(String),
    /// Failed to load a data file: {0}
    DataFile(#[from] std::io::Error),
}

/// The compute device to run the model on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Device {
    #[default]
    Cpu,
    Cuda(usize),
}

impl FromStr for Device {
    type Err = ConfigError;

    fn from_str(device: &str) -> Result<Self, Self::Err> {
        match device.trim().to_lowercase().as_str() {
            "cpu" => Ok(Device::Cpu),
            "cuda" => Ok(Device::Cuda(0)),
            other => other
                .strip_prefix("cuda:")
                .and_then(|index| index.parse().ok())
                .map(Device::Cuda)
                .ok_or_else(|| ConfigError::ParseDevice(device.into())),
        }
    }
}

impl Display for Device {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Device::Cpu => f.write_str("cpu"),
            Device::Cuda(index) => write!(f, "cuda:{}", index),
        }
    }
}

/// The configuration of a [`Pipeline`].
///
/// [`Pipeline`]: crate::Pipeline
pub struct Config<'a> {
    pub(crate) tokenizer: Box<dyn Read + Send + 'a>,
    pub(crate) model: Box<dyn Read + Send + 'a>,
    pub(crate) token_size: usize,
    pub(crate) averaging: TokenAveraging,
    pub(crate) device: Device,
}

impl<'a> Config<'a> {
    /// The name of the serialized tokenizer in a model directory.
    pub const TOKENIZER_FILE: &'static str = "tokenizer.json";

    /// The name of the onnx model in a model directory.
    pub const MODEL_FILE: &'static str = "model.onnx";

    /// Creates a configuration from a serialized tokenizer and an onnx model.
    pub fn from_readers(
        tokenizer: Box<dyn Read + Send + 'a>,
        model: Box<dyn Read + Send + 'a>,
    ) -> Self {
        Config {
            tokenizer,
            model,
            token_size: *Model::TOKEN_RANGE.end(),
            averaging: TokenAveraging::default(),
            device: Device::default(),
        }
    }

    /// Creates a configuration from a `tokenizer.json` file and an onnx model file.
    pub fn from_files(
        tokenizer: impl AsRef<Path>,
        model: impl AsRef<Path>,
    ) -> Result<Self, ConfigError> {
        let tokenizer = Box::new(BufReader::new(File::open(tokenizer)?));
        let model = Box::new(BufReader::new(File::open(model)?));
        Ok(Self::from_readers(tokenizer, model))
    }

    /// Creates a configuration from a model directory.
    ///
    /// The directory must contain a [`TOKENIZER_FILE`] and a [`MODEL_FILE`].
    ///
    /// [`TOKENIZER_FILE`]: Self::TOKENIZER_FILE
    /// [`MODEL_FILE`]: Self::MODEL_FILE
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        Self::from_files(dir.join(Self::TOKENIZER_FILE), dir.join(Self::MODEL_FILE))
    }

    /// Sets the token size for the tokenizer and the model.
    ///
    /// Defaults to `512`, the maximum of [`Model::TOKEN_RANGE`].
    ///
    /// # Errors
    /// Fails if `size` is less than two or greater than 512.
    pub fn with_token_size(mut self, size: usize) -> Result<Self, ConfigError> {
        if Model::TOKEN_RANGE.contains(&size) {
            self.token_size = size;
            Ok(self)
        } else {
            Err(ConfigError::TokenSize)
        }
    }

    /// Sets which token positions enter the token averages.
    ///
    /// Defaults to [`TokenAveraging::All`].
    pub fn with_token_averaging(mut self, averaging: TokenAveraging) -> Self {
        self.averaging = averaging;
        self
    }

    /// Sets the compute device.
    ///
    /// Defaults to [`Device::Cpu`].
    ///
    /// # Errors
    /// Fails if the device is not available.
    pub fn with_device(mut self, device: Device) -> Result<Self, ConfigError> {
        match device {
            Device::Cpu => {
                self.device = device;
                Ok(self)
            }
            Device::Cuda(_) => Err(ConfigError::Device(device)),
        }
    }
}
