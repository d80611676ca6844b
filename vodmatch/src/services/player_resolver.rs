//! Player resolution
//!
//! Player names render far less reliably than character names (small
//! font, overlays, sponsor tags), so they are resolved per set rather
//! than per frame: every reading inside a widened window around the set
//! is matched and the majority wins. Sets with no readings at all
//! inherit the previous set's players with decayed confidence, as long
//! as the sets are close enough to plausibly be the same match.

use tracing::debug;
use vodmatch_common::VideoTime;

use crate::config::DeductionConfig;
use crate::roster::Roster;
use crate::services::name_resolver::{NameContinuity, NameResolver, NameVote};
use crate::types::{NameSource, Observation, ResolvedName, Set};

/// Widening applied to a set's span when collecting player readings.
/// Name overlays often appear during pre-round intros and victory
/// screens just outside the timer activity.
const WINDOW_MARGIN_SECS: u32 = 30;

/// Continuity state carried across sets, one per slot.
#[derive(Debug, Default)]
pub struct PlayerContinuity {
    pub slot1: NameContinuity,
    pub slot2: NameContinuity,
}

pub struct PlayerResolver<'a> {
    config: &'a DeductionConfig,
    resolver: NameResolver<'a>,
}

impl<'a> PlayerResolver<'a> {
    pub fn new(config: &'a DeductionConfig, roster: &'a Roster) -> Self {
        Self {
            config,
            resolver: NameResolver::new(roster, config),
        }
    }

    /// Fill in `player1`/`player2` for each set in place.
    pub fn annotate(
        &self,
        sets: &mut [Set],
        observations: &[Observation],
        continuity: &mut PlayerContinuity,
    ) {
        for set in sets.iter_mut() {
            let lo = set.start_time.saturating_sub_secs(WINDOW_MARGIN_SECS);
            let hi = set.end_time.add_secs(WINDOW_MARGIN_SECS);

            let mut vote1 = NameVote::default();
            let mut vote2 = NameVote::default();
            for obs in observations
                .iter()
                .filter(|o| o.timestamp >= lo && o.timestamp <= hi)
            {
                self.add_reading(&mut vote1, obs.player1_raw.as_deref(), obs.index);
                self.add_reading(&mut vote2, obs.player2_raw.as_deref(), obs.index);
            }

            set.player1 = self.finish_slot(vote1, set, &mut continuity.slot1);
            set.player2 = self.finish_slot(vote2, set, &mut continuity.slot2);

            debug!(
                set_number = set.set_number,
                player1 = set.player1.as_ref().map(|p| p.display_name()),
                player2 = set.player2.as_ref().map(|p| p.display_name()),
                "Resolved players for set"
            );
        }
    }

    fn add_reading(&self, vote: &mut NameVote, raw: Option<&str>, index: usize) {
        if let Some(raw) = raw {
            if let Some((canonical, confidence, source)) = self.resolver.match_text(raw) {
                vote.add(&canonical, confidence, source, (index, index + 1));
            }
        }
    }

    fn finish_slot(
        &self,
        vote: NameVote,
        set: &Set,
        continuity: &mut NameContinuity,
    ) -> Option<ResolvedName> {
        if let Some(winner) = vote.winner() {
            continuity.record(winner.clone(), set.end_time);
            return Some(winner);
        }

        // no readings: carry the previous set's player forward if the
        // sets are close enough to belong to the same match
        if let Some((last, seen_at)) = continuity.last() {
            if set.start_time.gap_secs(seen_at) <= self.config.match_max_set_gap_secs {
                return Some(ResolvedName {
                    canonical: last.canonical.clone(),
                    confidence: last.confidence * self.config.propagation_decay,
                    source: NameSource::Propagated,
                    source_span: last.source_span,
                });
            }
        }
        None
    }
}
