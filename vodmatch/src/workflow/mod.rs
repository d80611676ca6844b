//! Pipeline orchestration

pub mod pipeline;

pub use pipeline::{DeductionContext, DeductionPipeline};
