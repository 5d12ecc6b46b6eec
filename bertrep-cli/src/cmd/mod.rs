pub use self::{
    hidden_states::HiddenStatesCmd,
    labels::LabelsCmd,
    logits::LogitsCmd,
    pool::PoolCmd,
    predict::PredictCmd,
};

mod hidden_states;
mod labels;
mod logits;
mod pool;
mod predict;
