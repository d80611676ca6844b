//! Domain model for match-structure deduction
//!
//! The types follow the reconstruction hierarchy bottom-up: raw frame
//! records from the extraction stage, normalized observations on the
//! video timeline, then rounds, sets and matches with their rejection
//! counterparts.

use serde::Deserialize;
use vodmatch_common::VideoTime;

/// Raw per-frame record as written by the OCR extraction stage.
///
/// Every field is optional: a frame may carry any subset of detections,
/// and malformed exports routinely omit keys entirely.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub timer_value: Option<String>,
    #[serde(default)]
    pub character1: Option<String>,
    #[serde(default)]
    pub character2: Option<String>,
    #[serde(default)]
    pub player1: Option<String>,
    #[serde(default)]
    pub player2: Option<String>,
}

/// Top-level shape of an analysis export.
///
/// Exports are either a bare array of frame records or an object with
/// the records under a `frames` key (newer extractors add run metadata
/// next to it, which we ignore).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum InputDocument {
    Wrapped { frames: Vec<RawRecord> },
    Bare(Vec<RawRecord>),
}

impl InputDocument {
    pub fn into_frames(self) -> Vec<RawRecord> {
        match self {
            InputDocument::Wrapped { frames } => frames,
            InputDocument::Bare(frames) => frames,
        }
    }
}

/// One normalized observation, placed on the video timeline.
///
/// `index` is the position in the timestamp-sorted observation list and
/// is what `ResolvedName::source_span` ranges refer to.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub index: usize,
    pub timestamp: VideoTime,
    /// Round timer reading, coerced into 0..=99
    pub timer_value: Option<u8>,
    pub character1_raw: Option<String>,
    pub character2_raw: Option<String>,
    pub player1_raw: Option<String>,
    pub player2_raw: Option<String>,
}

/// How a resolved name was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameSource {
    /// Exact roster hit after normalization
    Exact,
    /// Best fuzzy roster hit above the similarity cutoff
    Fuzzy,
    /// Carried forward from an earlier confident resolution
    Propagated,
    /// No resolution available
    Unknown,
}

/// A character or player name after fuzzy resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedName {
    /// Canonical roster spelling; empty iff `source` is `Unknown`
    pub canonical: String,
    pub confidence: f64,
    pub source: NameSource,
    /// Half-open range of observation indices the resolution came from
    pub source_span: (usize, usize),
}

impl ResolvedName {
    pub fn unknown() -> Self {
        ResolvedName {
            canonical: String::new(),
            confidence: 0.0,
            source: NameSource::Unknown,
            source_span: (0, 0),
        }
    }

    pub fn is_known(&self) -> bool {
        self.source != NameSource::Unknown
    }

    /// Name for reports, with a fixed placeholder for unresolved slots
    pub fn display_name(&self) -> &str {
        if self.is_known() {
            &self.canonical
        } else {
            "Unknown"
        }
    }
}

/// Which timer pattern opened a round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundTrigger {
    /// Timer recovered from a low value to a fresh high value
    LowToHigh,
    /// Timer jumped upward by more than the jump threshold
    TimerJump,
    /// High timer value appeared after a quiet stretch
    FreshStart,
}

/// One reconstructed round of play.
#[derive(Debug, Clone, PartialEq)]
pub struct Round {
    /// Back-dated start of the round (before the first detection)
    pub start_time: VideoTime,
    /// Timestamp of the last timer sample attributed to the round
    pub end_time: Option<VideoTime>,
    /// Timer samples in timeline order
    pub timer_samples: Vec<(VideoTime, u8)>,
    pub confidence: f64,
    pub valid: bool,
    pub character1: ResolvedName,
    pub character2: ResolvedName,
    pub trigger: RoundTrigger,
}

impl Round {
    pub fn first_sample_time(&self) -> Option<VideoTime> {
        self.timer_samples.first().map(|(t, _)| *t)
    }

    pub fn last_sample_time(&self) -> Option<VideoTime> {
        self.timer_samples.last().map(|(t, _)| *t)
    }
}

/// Why a candidate round failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundRejection {
    /// Timer samples cover too little of the sampled span
    InsufficientCoverage,
    /// Timer values do not mostly decrease
    NoDecreasingTrend,
    /// First sample below the start-value floor
    LowStartTimer,
    /// Starts too soon after the previously accepted round
    TooCloseToPrevious,
    /// Composite confidence below the acceptance threshold
    LowConfidence,
}

#[derive(Debug, Clone)]
pub struct RejectedRound {
    pub round: Round,
    pub reason: RoundRejection,
}

/// A set: consecutive rounds played by one character pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Set {
    /// 1-based position within the whole video
    pub set_number: usize,
    pub character1: ResolvedName,
    pub character2: ResolvedName,
    pub rounds: Vec<Round>,
    pub start_time: VideoTime,
    pub end_time: VideoTime,
    pub confidence: f64,
    pub player1: Option<ResolvedName>,
    pub player2: Option<ResolvedName>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetRejection {
    TooFewRounds,
}

#[derive(Debug, Clone)]
pub struct RejectedSet {
    pub rounds: Vec<Round>,
    pub reason: SetRejection,
}

/// A match: consecutive sets between one player pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub start_time: VideoTime,
    pub end_time: VideoTime,
    pub sets: Vec<Set>,
    pub player1: ResolvedName,
    pub player2: ResolvedName,
    pub confidence: f64,
    /// Always `None`: win detection needs health-bar data the
    /// extraction stage does not provide.
    pub winner: Option<String>,
}

impl Match {
    pub fn round_count(&self) -> usize {
        self.sets.iter().map(|s| s.rounds.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRejection {
    TooFewSets,
}

#[derive(Debug, Clone)]
pub struct RejectedMatch {
    pub sets: Vec<Set>,
    pub reason: MatchRejection,
}

/// Detection counters reported alongside the reconstruction.
///
/// Counts are taken per level as entities pass validation, so rounds
/// inside a later-rejected set still count as detected rounds.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AnalysisStats {
    pub total_frames_analyzed: usize,
    pub total_matches_detected: usize,
    pub total_sets_detected: usize,
    pub total_rounds_detected: usize,
    /// Fraction of input frames carrying a usable timer reading
    pub timer_detection_rate: f64,
}

/// Final output of the deduction pipeline.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub matches: Vec<Match>,
    pub stats: AnalysisStats,
}
