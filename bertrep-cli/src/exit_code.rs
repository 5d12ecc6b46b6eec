/// The command finished successfully.
pub const NO_ERROR: i32 = 0;

/// The command failed and produced no output.
pub const FATAL_ERROR: i32 = 1;
