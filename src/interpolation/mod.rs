pub mod diffusion;
pub mod smoothing;

pub use diffusion::{DenseDiffusionInterpolator, DiffusionParams};
pub use smoothing::GaussianSmoother;
