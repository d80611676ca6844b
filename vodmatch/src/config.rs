//! Deduction thresholds and configuration loading
//!
//! All thresholds the pipeline consults live in one struct so a single
//! TOML file (or CLI overrides) can tune a whole run. Defaults are
//! calibrated for Street Fighter 6 footage sampled at a few frames per
//! second with noisy OCR.

use std::path::Path;

use serde::{Deserialize, Serialize};
use vodmatch_common::{Error, Result};

/// Tunable thresholds for the deduction pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeductionConfig {
    /// Minimum Jaro-Winkler similarity for a fuzzy roster hit
    pub similarity_cutoff: f64,
    /// How long a confident name resolution keeps filling gaps (seconds)
    pub continuity_timeout_secs: u32,
    /// Confidence multiplier applied to propagated resolutions
    pub propagation_decay: f64,

    /// Timer value that opens a candidate round
    pub round_open_timer: u8,
    /// Floor for the first timer sample of a validated round
    pub round_start_floor: u8,
    /// Upward timer jump (points) that ends the current round
    pub timer_jump_threshold: u8,
    /// "Low" side of the low-to-high round boundary
    pub timer_low_threshold: u8,
    /// Minimum spacing between consecutive accepted round starts (seconds)
    pub round_min_duration_secs: u32,
    /// Minimum fraction of the sampled span covered by timer samples
    pub min_timer_coverage: f64,
    /// Minimum composite confidence for an accepted round
    pub round_min_confidence: f64,
    /// Sampling dropout tolerated inside a round (seconds)
    pub round_gap_tolerance_secs: u32,
    /// Detection silence that marks an inter-match gap (seconds)
    pub detection_timeout_secs: u32,

    /// Minimum rounds for a valid set
    pub set_min_rounds: usize,
    /// Maximum gap between consecutive round starts within a set (seconds)
    pub set_max_round_gap_secs: u32,

    /// Maximum gap between consecutive sets within a match (seconds)
    pub match_max_set_gap_secs: u32,
    /// Minimum sets for a valid match
    pub match_min_sets: usize,
    /// Round floor that lets a single-set match through when
    /// match_min_sets is raised above 1
    pub match_min_single_set_rounds: usize,
}

impl Default for DeductionConfig {
    fn default() -> Self {
        Self {
            similarity_cutoff: 0.6,
            continuity_timeout_secs: 60,
            propagation_decay: 0.8,
            round_open_timer: 85,
            round_start_floor: 80,
            timer_jump_threshold: 20,
            timer_low_threshold: 50,
            round_min_duration_secs: 120,
            min_timer_coverage: 0.7,
            round_min_confidence: 0.5,
            round_gap_tolerance_secs: 30,
            detection_timeout_secs: 60,
            set_min_rounds: 2,
            set_max_round_gap_secs: 300,
            match_max_set_gap_secs: 180,
            match_min_sets: 1,
            match_min_single_set_rounds: 3,
        }
    }
}

impl DeductionConfig {
    /// Load configuration from a TOML file. Missing keys take defaults.
    pub fn load_toml(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text).map_err(|e| {
            Error::Config(format!("invalid config file {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject threshold combinations the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.similarity_cutoff) {
            return Err(Error::Config(format!(
                "similarity_cutoff must be within 0..=1, got {}",
                self.similarity_cutoff
            )));
        }
        if !(0.0..=1.0).contains(&self.min_timer_coverage) {
            return Err(Error::Config(format!(
                "min_timer_coverage must be within 0..=1, got {}",
                self.min_timer_coverage
            )));
        }
        if !(0.0..=1.0).contains(&self.round_min_confidence) {
            return Err(Error::Config(format!(
                "round_min_confidence must be within 0..=1, got {}",
                self.round_min_confidence
            )));
        }
        if !(0.0..=1.0).contains(&self.propagation_decay) {
            return Err(Error::Config(format!(
                "propagation_decay must be within 0..=1, got {}",
                self.propagation_decay
            )));
        }
        if self.round_open_timer > 99 || self.round_start_floor > 99 {
            return Err(Error::Config(
                "timer thresholds cannot exceed 99".to_string(),
            ));
        }
        if self.timer_low_threshold >= self.round_start_floor {
            return Err(Error::Config(format!(
                "timer_low_threshold ({}) must be below round_start_floor ({})",
                self.timer_low_threshold, self.round_start_floor
            )));
        }
        if self.set_min_rounds == 0 || self.match_min_sets == 0 {
            return Err(Error::Config(
                "set_min_rounds and match_min_sets must be at least 1".to_string(),
            ));
        }
        if self.round_gap_tolerance_secs > self.detection_timeout_secs {
            return Err(Error::Config(format!(
                "round_gap_tolerance_secs ({}) cannot exceed detection_timeout_secs ({})",
                self.round_gap_tolerance_secs, self.detection_timeout_secs
            )));
        }
        Ok(())
    }
}
