//! Deduction pipeline orchestrator
//!
//! Runs the reconstruction phases in their fixed order:
//!
//! 1. Normalize frames and resolve characters per observation
//!    (characters are the most reliable OCR signal, so they anchor
//!    everything downstream).
//! 2. Segment rounds on the timer signal and group them into sets.
//! 3. Resolve players per set.
//! 4. Group sets into matches.
//!
//! Every phase is deterministic, so identical input bytes produce an
//! identical `AnalysisResult`.

use tracing::info;
use vodmatch_common::{Error, Result};

use crate::config::DeductionConfig;
use crate::roster::Roster;
use crate::services::name_resolver::{NameContinuity, NameResolver};
use crate::services::normalizer::normalize;
use crate::services::player_resolver::{PlayerContinuity, PlayerResolver};
use crate::services::{MatchGrouper, RoundSegmenter, SetGrouper};
use crate::types::{
    AnalysisResult, AnalysisStats, Observation, RawRecord, RejectedMatch, RejectedRound,
    RejectedSet, ResolvedName,
};
use vodmatch_common::VideoTime;

/// Shared state threaded through the pipeline phases: continuity
/// trackers plus everything rejected along the way, kept for
/// diagnostics and tests.
#[derive(Debug, Default)]
pub struct DeductionContext {
    pub char1_continuity: NameContinuity,
    pub char2_continuity: NameContinuity,
    pub player_continuity: PlayerContinuity,
    pub dropped_records: usize,
    pub rejected_rounds: Vec<RejectedRound>,
    pub rejected_sets: Vec<RejectedSet>,
    pub rejected_matches: Vec<RejectedMatch>,
    pub gap_markers: Vec<VideoTime>,
}

/// The whole deduction engine behind one entry point.
pub struct DeductionPipeline {
    config: DeductionConfig,
    characters: Roster,
    players: Roster,
}

impl DeductionPipeline {
    /// Build a pipeline, validating the configuration up front.
    ///
    /// `players` may be empty: player text then passes through cleaned
    /// instead of being matched against a roster.
    pub fn new(config: DeductionConfig, characters: Roster, players: Roster) -> Result<Self> {
        config.validate()?;
        if characters.is_empty() {
            return Err(Error::Config(
                "character roster must not be empty".to_string(),
            ));
        }
        Ok(Self {
            config,
            characters,
            players,
        })
    }

    pub fn config(&self) -> &DeductionConfig {
        &self.config
    }

    /// Analyze one export and return the reconstruction.
    pub fn analyze(&self, records: &[RawRecord]) -> Result<AnalysisResult> {
        self.analyze_detailed(records).map(|(result, _)| result)
    }

    /// Like [`analyze`](Self::analyze) but also returns the context
    /// with rejected entities and gap markers.
    pub fn analyze_detailed(
        &self,
        records: &[RawRecord],
    ) -> Result<(AnalysisResult, DeductionContext)> {
        if records.is_empty() {
            return Err(Error::InsufficientData(
                "analysis export contains no frames".to_string(),
            ));
        }

        let mut ctx = DeductionContext::default();

        // Phase 1: normalize and resolve characters
        let normalized = normalize(records);
        ctx.dropped_records = normalized.dropped_records;
        let observations = normalized.observations;
        let timer_detections = observations
            .iter()
            .filter(|o| o.timer_value.is_some())
            .count();
        info!(
            frames = records.len(),
            observations = observations.len(),
            dropped = ctx.dropped_records,
            timer_detections,
            "Normalized analysis export"
        );

        let resolved_chars = self.resolve_characters(&observations, &mut ctx);

        // Phase 2: rounds, then sets
        let segmentation =
            RoundSegmenter::new(&self.config, &resolved_chars).segment(&observations);
        let rounds_detected = segmentation.rounds.len();
        ctx.rejected_rounds = segmentation.rejected;
        ctx.gap_markers = segmentation.gap_markers;
        info!(
            rounds = rounds_detected,
            rejected = ctx.rejected_rounds.len(),
            "Segmented rounds"
        );

        let grouping = SetGrouper::new(&self.config).group(segmentation.rounds);
        let sets_detected = grouping.sets.len();
        ctx.rejected_sets = grouping.rejected;
        let mut sets = grouping.sets;
        info!(sets = sets_detected, rejected = ctx.rejected_sets.len(), "Grouped sets");

        // Phase 3: players
        PlayerResolver::new(&self.config, &self.players).annotate(
            &mut sets,
            &observations,
            &mut ctx.player_continuity,
        );

        // Phase 4: matches
        let match_grouping = MatchGrouper::new(&self.config).group(sets, &ctx.gap_markers);
        ctx.rejected_matches = match_grouping.rejected;
        let matches = match_grouping.matches;
        info!(
            matches = matches.len(),
            rejected = ctx.rejected_matches.len(),
            "Grouped matches"
        );

        let timer_detection_rate = timer_detections as f64 / records.len() as f64;
        let stats = AnalysisStats {
            total_frames_analyzed: records.len(),
            total_matches_detected: matches.len(),
            total_sets_detected: sets_detected,
            total_rounds_detected: rounds_detected,
            timer_detection_rate: (timer_detection_rate * 1000.0).round() / 1000.0,
        };

        Ok((AnalysisResult { matches, stats }, ctx))
    }

    /// Per-observation character resolution with continuity fallback.
    fn resolve_characters(
        &self,
        observations: &[Observation],
        ctx: &mut DeductionContext,
    ) -> Vec<(ResolvedName, ResolvedName)> {
        let resolver = NameResolver::new(&self.characters, &self.config);
        observations
            .iter()
            .map(|obs| {
                let c1 = resolver.resolve(
                    obs.character1_raw.as_deref(),
                    obs.timestamp,
                    obs.index,
                    &mut ctx.char1_continuity,
                );
                let c2 = resolver.resolve(
                    obs.character2_raw.as_deref(),
                    obs.timestamp,
                    obs.index,
                    &mut ctx.char2_continuity,
                );
                (c1, c2)
            })
            .collect()
    }
}
