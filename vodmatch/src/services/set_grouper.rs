//! Set grouping
//!
//! Folds consecutive validated rounds into sets: a run of rounds played
//! by the same character pair, with bounded gaps between them. Slots
//! are positional (left side vs right side), so a swapped pair starts a
//! new set. An unknown character slot is compatible with anything; once
//! a later round supplies a name for a slot the set adopted as unknown,
//! the set keeps that name.

use tracing::debug;
use vodmatch_common::VideoTime;

use crate::config::DeductionConfig;
use crate::types::{RejectedSet, ResolvedName, Round, Set, SetRejection};

/// Fallback round length when a round carries no end timestamp.
const DEFAULT_ROUND_LENGTH_SECS: u32 = 120;

#[derive(Debug, Default)]
pub struct SetGroupingOutcome {
    pub sets: Vec<Set>,
    pub rejected: Vec<RejectedSet>,
}

pub struct SetGrouper<'a> {
    config: &'a DeductionConfig,
}

impl<'a> SetGrouper<'a> {
    pub fn new(config: &'a DeductionConfig) -> Self {
        Self { config }
    }

    /// Group validated rounds (timeline order) into sets.
    pub fn group(&self, rounds: Vec<Round>) -> SetGroupingOutcome {
        let mut outcome = SetGroupingOutcome::default();
        let mut current: Vec<Round> = Vec::new();
        let mut pair = (ResolvedName::unknown(), ResolvedName::unknown());

        for round in rounds {
            if current.is_empty() {
                pair = (round.character1.clone(), round.character2.clone());
                current.push(round);
                continue;
            }

            let previous_start = current[current.len() - 1].start_time;
            let gap = round.start_time.gap_secs(previous_start);
            let round_pair = (&round.character1, &round.character2);

            if gap <= self.config.set_max_round_gap_secs
                && slots_compatible(&pair.0, round_pair.0)
                && slots_compatible(&pair.1, round_pair.1)
            {
                adopt_known(&mut pair.0, round_pair.0);
                adopt_known(&mut pair.1, round_pair.1);
                current.push(round);
            } else {
                self.close(std::mem::take(&mut current), pair.clone(), &mut outcome);
                pair = (round.character1.clone(), round.character2.clone());
                current.push(round);
            }
        }
        if !current.is_empty() {
            self.close(current, pair, &mut outcome);
        }

        debug!(
            sets = outcome.sets.len(),
            rejected = outcome.rejected.len(),
            "Set grouping complete"
        );
        outcome
    }

    fn close(
        &self,
        rounds: Vec<Round>,
        pair: (ResolvedName, ResolvedName),
        outcome: &mut SetGroupingOutcome,
    ) {
        if rounds.len() < self.config.set_min_rounds {
            debug!(
                rounds = rounds.len(),
                start = %rounds[0].start_time,
                "Rejected set candidate with too few rounds"
            );
            outcome.rejected.push(RejectedSet {
                rounds,
                reason: SetRejection::TooFewRounds,
            });
            return;
        }

        let start_time = rounds[0].start_time;
        let end_time = rounds[rounds.len() - 1]
            .end_time
            .unwrap_or_else(|| start_time.add_secs(DEFAULT_ROUND_LENGTH_SECS));
        let confidence =
            rounds.iter().map(|r| r.confidence).sum::<f64>() / rounds.len() as f64;

        outcome.sets.push(Set {
            set_number: outcome.sets.len() + 1,
            character1: pair.0,
            character2: pair.1,
            start_time,
            end_time,
            confidence,
            player1: None,
            player2: None,
            rounds,
        });
    }
}

/// A set slot accepts a round slot when either side is unknown or both
/// carry the same canonical name.
fn slots_compatible(a: &ResolvedName, b: &ResolvedName) -> bool {
    !a.is_known() || !b.is_known() || a.canonical == b.canonical
}

fn adopt_known(slot: &mut ResolvedName, candidate: &ResolvedName) {
    if !slot.is_known() && candidate.is_known() {
        *slot = candidate.clone();
    }
}
