//! Deduction services
//!
//! Each service handles one phase of the reconstruction; the pipeline
//! in `workflow` wires them together.

pub mod match_grouper;
pub mod name_resolver;
pub mod normalizer;
pub mod player_resolver;
pub mod round_segmenter;
pub mod set_grouper;

pub use match_grouper::MatchGrouper;
pub use name_resolver::{NameContinuity, NameResolver};
pub use player_resolver::PlayerResolver;
pub use round_segmenter::RoundSegmenter;
pub use set_grouper::SetGrouper;
