//! Shared utilities for the tests of the workspace.
//!
//! The model assets are expected under `data/bertrep_v0000/` in the workspace directory.

mod approx_eq;
mod asset;
pub mod bertrep;
pub mod tokenizer;

pub use crate::approx_eq::Flatten;
pub use float_cmp::approx_eq;
