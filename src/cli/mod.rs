pub mod args;
pub mod commands;

pub use args::{AnalysisArgs, Cli, Commands, DataArgs};
pub use commands::{analyze, run, AnalysisOutput};
