pub mod cancel;
pub mod config;
pub mod orchestrator;

pub use cancel::CancellationToken;
pub use config::{AnalysisConfig, Settings};
pub use orchestrator::{
    AnalysisOrchestrator, AnalysisReport, AnalysisTask, FailedTask, Progress, SkipReason,
    SkippedTask, TaskId, TaskOutcome,
};
