//! vodmatch library interface
//!
//! Reconstructs the match / set / round structure of a fighting-game
//! VOD from noisy per-frame OCR observations. The library surface is
//! the [`DeductionPipeline`] plus the types it consumes and produces;
//! the binary in `main.rs` is a thin CLI over it.

pub mod config;
pub mod report;
pub mod roster;
pub mod services;
pub mod types;
pub mod workflow;

pub use config::DeductionConfig;
pub use roster::Roster;
pub use types::{
    AnalysisResult, AnalysisStats, InputDocument, Match, NameSource, Observation, RawRecord,
    ResolvedName, Round, RoundTrigger, Set,
};
pub use workflow::{DeductionContext, DeductionPipeline};
