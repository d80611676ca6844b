//! Round segmentation state machine
//!
//! Walks the observation stream and cuts it into candidate rounds by
//! following the round timer. The machine is a small explicit state
//! enum with a pure-ish transition function; the surrounding segmenter
//! drives it, validates closed candidates, and records inter-match gap
//! markers for the match grouper.
//!
//! Round boundaries come from three timer patterns:
//! - an upward jump larger than the jump threshold,
//! - a low value recovering to a fresh high value,
//! - a high value appearing after a quiet stretch.
//!
//! A round's start is back-dated from its first detection: a reading of
//! `t` means roughly `99 - t` seconds of the round already elapsed,
//! plus one second of pre-round freeze.

use tracing::debug;
use vodmatch_common::VideoTime;

use crate::config::DeductionConfig;
use crate::services::name_resolver::NameVote;
use crate::types::{
    Observation, RejectedRound, ResolvedName, Round, RoundRejection, RoundTrigger,
};

/// Segmentation machine states.
///
/// `RoundEnd` and `CharacterCheck` are transient: the driver re-feeds
/// the same observation until the machine settles in `Idle`,
/// `PotentialRound` or `RoundActive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    /// No round activity
    Idle,
    /// A single opening sample seen, awaiting confirmation
    PotentialRound,
    /// Confirmed round in progress
    RoundActive,
    /// Round boundary hit, candidate about to close
    RoundEnd,
    /// Closing bookkeeping before deciding what follows the round
    CharacterCheck,
}

/// Side effects of a single transition step.
#[derive(Debug)]
pub enum SegmentEvent {
    /// A candidate round closed and awaits validation
    RoundClosed(RoundBuilder),
    /// Detections went silent long enough to mark a likely match break
    InterMatchGap(VideoTime),
}

/// Mutable state threaded through transitions.
#[derive(Debug, Default)]
pub struct SegmenterContext {
    builder: Option<RoundBuilder>,
    /// Trigger for the round opened by the boundary that closed the
    /// previous one
    pending_trigger: Option<RoundTrigger>,
}

/// Accumulates one candidate round while the machine is in
/// `PotentialRound` or `RoundActive`.
#[derive(Debug)]
pub struct RoundBuilder {
    start_time: VideoTime,
    trigger: RoundTrigger,
    samples: Vec<(VideoTime, u8)>,
    first_index: usize,
    last_index: usize,
}

impl RoundBuilder {
    fn open(obs: &Observation, value: u8, trigger: RoundTrigger) -> Self {
        let elapsed = 99u32.saturating_sub(value as u32) + 1;
        RoundBuilder {
            start_time: obs.timestamp.saturating_sub_secs(elapsed),
            trigger,
            samples: vec![(obs.timestamp, value)],
            first_index: obs.index,
            last_index: obs.index,
        }
    }

    fn push(&mut self, obs: &Observation, value: u8) {
        self.samples.push((obs.timestamp, value));
        self.last_index = obs.index;
    }

    fn last_sample(&self) -> (VideoTime, u8) {
        // samples is never empty: open() seeds it
        *self.samples.last().unwrap_or(&(self.start_time, 99))
    }
}

struct StepOutcome {
    next: SegmenterState,
    event: Option<SegmentEvent>,
    /// Feed the same observation to the next state
    reprocess: bool,
}

impl StepOutcome {
    fn settle(next: SegmenterState) -> Self {
        StepOutcome {
            next,
            event: None,
            reprocess: false,
        }
    }
}

fn transition(
    state: SegmenterState,
    obs: &Observation,
    ctx: &mut SegmenterContext,
    cfg: &DeductionConfig,
) -> StepOutcome {
    match state {
        SegmenterState::Idle => {
            if let Some(value) = obs.timer_value {
                if value >= cfg.round_open_timer {
                    ctx.builder = Some(RoundBuilder::open(obs, value, RoundTrigger::FreshStart));
                    return StepOutcome::settle(SegmenterState::PotentialRound);
                }
            }
            StepOutcome::settle(SegmenterState::Idle)
        }

        SegmenterState::PotentialRound => {
            let Some(builder) = ctx.builder.as_mut() else {
                return StepOutcome::settle(SegmenterState::Idle);
            };
            let (last_time, last_value) = builder.last_sample();
            let gap = obs.timestamp.gap_secs(last_time);

            match obs.timer_value {
                None => {
                    if gap > cfg.detection_timeout_secs {
                        // unconfirmed candidate swallowed by a long gap
                        ctx.builder = None;
                        StepOutcome {
                            next: SegmenterState::Idle,
                            event: Some(SegmentEvent::InterMatchGap(last_time)),
                            reprocess: false,
                        }
                    } else if gap > cfg.round_gap_tolerance_secs {
                        ctx.builder = None;
                        StepOutcome::settle(SegmenterState::Idle)
                    } else {
                        StepOutcome::settle(SegmenterState::PotentialRound)
                    }
                }
                Some(value) => {
                    if gap > cfg.detection_timeout_secs {
                        ctx.builder = None;
                        return StepOutcome {
                            next: SegmenterState::Idle,
                            event: Some(SegmentEvent::InterMatchGap(last_time)),
                            reprocess: true,
                        };
                    }
                    if value <= last_value || value - last_value <= cfg.timer_jump_threshold {
                        // decreasing, or upward jitter small enough to be noise
                        builder.push(obs, value);
                        StepOutcome::settle(SegmenterState::RoundActive)
                    } else if value >= cfg.round_open_timer {
                        // the earlier sample was the noise; restart here
                        ctx.builder =
                            Some(RoundBuilder::open(obs, value, RoundTrigger::FreshStart));
                        StepOutcome::settle(SegmenterState::PotentialRound)
                    } else {
                        ctx.builder = None;
                        StepOutcome::settle(SegmenterState::Idle)
                    }
                }
            }
        }

        SegmenterState::RoundActive => {
            let Some(builder) = ctx.builder.as_mut() else {
                return StepOutcome::settle(SegmenterState::Idle);
            };
            let (last_time, last_value) = builder.last_sample();
            let gap = obs.timestamp.gap_secs(last_time);

            match obs.timer_value {
                None => {
                    if gap > cfg.detection_timeout_secs {
                        StepOutcome {
                            next: SegmenterState::RoundEnd,
                            event: Some(SegmentEvent::InterMatchGap(last_time)),
                            reprocess: true,
                        }
                    } else if gap > cfg.round_gap_tolerance_secs {
                        StepOutcome {
                            next: SegmenterState::RoundEnd,
                            event: None,
                            reprocess: true,
                        }
                    } else {
                        StepOutcome::settle(SegmenterState::RoundActive)
                    }
                }
                Some(value) => {
                    if gap > cfg.detection_timeout_secs {
                        ctx.pending_trigger = Some(RoundTrigger::FreshStart);
                        return StepOutcome {
                            next: SegmenterState::RoundEnd,
                            event: Some(SegmentEvent::InterMatchGap(last_time)),
                            reprocess: true,
                        };
                    }
                    if value > last_value && value - last_value > cfg.timer_jump_threshold {
                        ctx.pending_trigger = Some(RoundTrigger::TimerJump);
                        return StepOutcome {
                            next: SegmenterState::RoundEnd,
                            event: None,
                            reprocess: true,
                        };
                    }
                    if last_value < cfg.timer_low_threshold && value >= cfg.round_start_floor {
                        ctx.pending_trigger = Some(RoundTrigger::LowToHigh);
                        return StepOutcome {
                            next: SegmenterState::RoundEnd,
                            event: None,
                            reprocess: true,
                        };
                    }
                    builder.push(obs, value);
                    if value == 0 {
                        // time over, nothing left to collect
                        StepOutcome {
                            next: SegmenterState::RoundEnd,
                            event: None,
                            reprocess: true,
                        }
                    } else {
                        StepOutcome::settle(SegmenterState::RoundActive)
                    }
                }
            }
        }

        SegmenterState::RoundEnd => StepOutcome {
            next: SegmenterState::CharacterCheck,
            event: ctx.builder.take().map(SegmentEvent::RoundClosed),
            reprocess: true,
        },

        SegmenterState::CharacterCheck => match obs.timer_value {
            Some(value)
                if ctx.pending_trigger.is_some() || value >= cfg.round_open_timer =>
            {
                let trigger = ctx
                    .pending_trigger
                    .take()
                    .unwrap_or(RoundTrigger::FreshStart);
                ctx.builder = Some(RoundBuilder::open(obs, value, trigger));
                StepOutcome::settle(SegmenterState::PotentialRound)
            }
            _ => {
                ctx.pending_trigger = None;
                StepOutcome::settle(SegmenterState::Idle)
            }
        },
    }
}

/// Fraction of the sampled span covered by samples, counting each
/// inter-sample gap at most up to the dropout tolerance.
pub fn coverage(samples: &[(VideoTime, u8)], tolerance_secs: u32) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let span = samples[samples.len() - 1].0.gap_secs(samples[0].0);
    if span == 0 {
        return 0.0;
    }
    let covered: u32 = samples
        .windows(2)
        .map(|w| w[1].0.gap_secs(w[0].0).min(tolerance_secs))
        .sum();
    covered as f64 / span as f64
}

/// Fraction of consecutive sample pairs that are non-increasing.
pub fn trend_strength(samples: &[(VideoTime, u8)]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let non_increasing = samples.windows(2).filter(|w| w[1].1 <= w[0].1).count();
    non_increasing as f64 / (samples.len() - 1) as f64
}

/// Number of inter-sample gaps exceeding the dropout tolerance.
pub fn gap_count(samples: &[(VideoTime, u8)], tolerance_secs: u32) -> usize {
    samples
        .windows(2)
        .filter(|w| w[1].0.gap_secs(w[0].0) > tolerance_secs)
        .count()
}

/// Composite round confidence: coverage and trend dominate, sampling
/// gaps chip away at the remainder.
pub fn round_confidence(coverage: f64, trend: f64, gaps: usize) -> f64 {
    0.45 * coverage + 0.45 * trend + 0.10 / (1.0 + gaps as f64)
}

/// Result of segmenting one observation stream.
#[derive(Debug, Default)]
pub struct SegmentationOutcome {
    /// Validated rounds in timeline order
    pub rounds: Vec<Round>,
    pub rejected: Vec<RejectedRound>,
    /// Timestamps where detections went silent beyond the timeout
    pub gap_markers: Vec<VideoTime>,
}

/// Drives the state machine over an observation stream and validates
/// the candidate rounds it closes.
pub struct RoundSegmenter<'a> {
    config: &'a DeductionConfig,
    /// Per-observation character resolutions, indexed by observation index
    resolved_chars: &'a [(ResolvedName, ResolvedName)],
}

impl<'a> RoundSegmenter<'a> {
    pub fn new(
        config: &'a DeductionConfig,
        resolved_chars: &'a [(ResolvedName, ResolvedName)],
    ) -> Self {
        Self {
            config,
            resolved_chars,
        }
    }

    pub fn segment(&self, observations: &[Observation]) -> SegmentationOutcome {
        let mut state = SegmenterState::Idle;
        let mut ctx = SegmenterContext::default();
        let mut outcome = SegmentationOutcome::default();
        let mut last_accepted_start: Option<VideoTime> = None;

        for obs in observations {
            let mut reprocess = true;
            while reprocess {
                let step = transition(state, obs, &mut ctx, self.config);
                state = step.next;
                if let Some(event) = step.event {
                    self.handle_event(event, &mut last_accepted_start, &mut outcome);
                }
                reprocess = step.reprocess;
            }
        }

        // flush the trailing candidate at end of stream
        if let Some(builder) = ctx.builder.take() {
            self.finalize(builder, &mut last_accepted_start, &mut outcome);
        }

        debug!(
            accepted = outcome.rounds.len(),
            rejected = outcome.rejected.len(),
            gap_markers = outcome.gap_markers.len(),
            "Round segmentation complete"
        );
        outcome
    }

    fn handle_event(
        &self,
        event: SegmentEvent,
        last_accepted_start: &mut Option<VideoTime>,
        outcome: &mut SegmentationOutcome,
    ) {
        match event {
            SegmentEvent::RoundClosed(builder) => {
                self.finalize(builder, last_accepted_start, outcome);
            }
            SegmentEvent::InterMatchGap(at) => {
                debug!(at = %at, "Detection silence beyond timeout");
                outcome.gap_markers.push(at);
            }
        }
    }

    fn finalize(
        &self,
        builder: RoundBuilder,
        last_accepted_start: &mut Option<VideoTime>,
        outcome: &mut SegmentationOutcome,
    ) {
        let mut round = self.build_round(builder);
        match self.validate(&round, *last_accepted_start) {
            Ok(()) => {
                round.valid = true;
                *last_accepted_start = Some(round.start_time);
                debug!(
                    start = %round.start_time,
                    confidence = round.confidence,
                    samples = round.timer_samples.len(),
                    "Accepted round"
                );
                outcome.rounds.push(round);
            }
            Err(reason) => {
                debug!(start = %round.start_time, ?reason, "Rejected round candidate");
                outcome.rejected.push(RejectedRound { round, reason });
            }
        }
    }

    fn build_round(&self, builder: RoundBuilder) -> Round {
        let (character1, character2) =
            self.vote_characters(builder.first_index, builder.last_index);
        let tolerance = self.config.round_gap_tolerance_secs;
        let cov = coverage(&builder.samples, tolerance);
        let trend = trend_strength(&builder.samples);
        let gaps = gap_count(&builder.samples, tolerance);

        Round {
            start_time: builder.start_time,
            end_time: builder.samples.last().map(|(t, _)| *t),
            confidence: round_confidence(cov, trend, gaps),
            valid: false,
            character1,
            character2,
            trigger: builder.trigger,
            timer_samples: builder.samples,
        }
    }

    /// Majority vote over character resolutions within the round span.
    fn vote_characters(&self, first: usize, last: usize) -> (ResolvedName, ResolvedName) {
        let span = (first, last + 1);
        let mut vote1 = NameVote::default();
        let mut vote2 = NameVote::default();
        for (c1, c2) in self
            .resolved_chars
            .iter()
            .skip(first)
            .take(last.saturating_sub(first) + 1)
        {
            vote1.add_resolved(c1);
            vote2.add_resolved(c2);
        }
        let finish = |vote: NameVote| {
            vote.winner()
                .map(|mut name| {
                    name.source_span = span;
                    name
                })
                .unwrap_or_else(ResolvedName::unknown)
        };
        (finish(vote1), finish(vote2))
    }

    fn validate(
        &self,
        round: &Round,
        last_accepted_start: Option<VideoTime>,
    ) -> Result<(), RoundRejection> {
        let cfg = self.config;
        let samples = &round.timer_samples;

        if samples.len() < 2 || coverage(samples, cfg.round_gap_tolerance_secs) < cfg.min_timer_coverage
        {
            return Err(RoundRejection::InsufficientCoverage);
        }
        if trend_strength(samples) <= 0.5 {
            return Err(RoundRejection::NoDecreasingTrend);
        }
        if samples[0].1 < cfg.round_start_floor {
            return Err(RoundRejection::LowStartTimer);
        }
        if let Some(previous) = last_accepted_start {
            if round.start_time.gap_secs(previous) < cfg.round_min_duration_secs {
                return Err(RoundRejection::TooCloseToPrevious);
            }
        }
        if round.confidence < cfg.round_min_confidence {
            return Err(RoundRejection::LowConfidence);
        }
        Ok(())
    }
}
