pub mod constants;
pub mod filename;
pub mod progress;

pub use constants::*;
pub use filename::{field_output_path, generate_default_run_dir, manifest_path};
pub use progress::ProgressReporter;
