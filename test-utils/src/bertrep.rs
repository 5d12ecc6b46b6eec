use std::{io::Result, path::PathBuf};

use crate::asset::{resolve_path, DATA_DIR};

const ASSET: &str = "bertrep_v0000";

/// Resolves the path to the model directory.
pub fn model_dir() -> Result<PathBuf> {
    resolve_path(&[DATA_DIR, ASSET])
}

/// Resolves the path to the serialized tokenizer.
pub fn tokenizer() -> Result<PathBuf> {
    resolve_path(&[DATA_DIR, ASSET, "tokenizer.json"])
}

/// Resolves the path to the onnx model.
pub fn model() -> Result<PathBuf> {
    resolve_path(&[DATA_DIR, ASSET, "model.onnx"])
}
