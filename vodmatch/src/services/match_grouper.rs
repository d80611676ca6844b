//! Match grouping
//!
//! Folds consecutive sets into matches. A new match starts when, in
//! priority order: both characters changed at once (an immediate
//! bracket transition, regardless of gap), the gap between sets grew
//! past the match threshold, or the resolved players stopped being
//! consistent. Player slots may swap sides between sets of the same
//! match, so consistency is checked in both orientations, and it is
//! checked against every set already in the match so a set with
//! unresolved players cannot bridge two different pairs.

use tracing::debug;
use vodmatch_common::VideoTime;

use crate::config::DeductionConfig;
use crate::services::name_resolver::NameVote;
use crate::types::{Match, MatchRejection, RejectedMatch, ResolvedName, Set};

/// Confidence multiplier per detection-silence marker inside a match
const GAP_MARKER_PENALTY: f64 = 0.9;

/// Why a match boundary was drawn, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoundaryReason {
    BothCharactersChanged,
    GapExceeded,
    PlayersChanged,
}

#[derive(Debug, Default)]
pub struct MatchGroupingOutcome {
    pub matches: Vec<Match>,
    pub rejected: Vec<RejectedMatch>,
}

pub struct MatchGrouper<'a> {
    config: &'a DeductionConfig,
}

impl<'a> MatchGrouper<'a> {
    pub fn new(config: &'a DeductionConfig) -> Self {
        Self { config }
    }

    /// Group annotated sets (timeline order) into matches.
    ///
    /// `gap_markers` are the detection-silence timestamps from round
    /// segmentation; each one falling inside a match discounts that
    /// match's confidence without splitting it.
    pub fn group(&self, sets: Vec<Set>, gap_markers: &[VideoTime]) -> MatchGroupingOutcome {
        let mut outcome = MatchGroupingOutcome::default();
        let mut current: Vec<Set> = Vec::new();

        for set in sets {
            if let Some(reason) = self.boundary(&current, &set) {
                debug!(?reason, at = %set.start_time, "Match boundary");
                self.close(std::mem::take(&mut current), gap_markers, &mut outcome);
            }
            current.push(set);
        }
        if !current.is_empty() {
            self.close(current, gap_markers, &mut outcome);
        }

        debug!(
            matches = outcome.matches.len(),
            rejected = outcome.rejected.len(),
            "Match grouping complete"
        );
        outcome
    }

    fn boundary(&self, current: &[Set], next: &Set) -> Option<BoundaryReason> {
        let previous = current.last()?;
        if both_characters_changed(previous, next) {
            return Some(BoundaryReason::BothCharactersChanged);
        }
        if next.start_time.gap_secs(previous.end_time) > self.config.match_max_set_gap_secs {
            return Some(BoundaryReason::GapExceeded);
        }
        if !current.iter().all(|set| players_consistent(set, next)) {
            return Some(BoundaryReason::PlayersChanged);
        }
        None
    }

    fn close(&self, sets: Vec<Set>, gap_markers: &[VideoTime], outcome: &mut MatchGroupingOutcome) {
        let rounds: usize = sets.iter().map(|s| s.rounds.len()).sum();
        let accepted = sets.len() >= self.config.match_min_sets
            || (sets.len() == 1 && rounds >= self.config.match_min_single_set_rounds);
        if !accepted {
            debug!(
                sets = sets.len(),
                rounds,
                "Rejected match candidate with too little play"
            );
            outcome.rejected.push(RejectedMatch {
                sets,
                reason: MatchRejection::TooFewSets,
            });
            return;
        }

        let start_time = sets[0].start_time;
        let end_time = sets[sets.len() - 1].end_time;
        let (player1, player2) = vote_players(&sets);

        let mean = sets.iter().map(|s| s.confidence).sum::<f64>() / sets.len() as f64;
        let markers = gap_markers
            .iter()
            .filter(|m| **m > start_time && **m < end_time)
            .count();
        let confidence = mean * GAP_MARKER_PENALTY.powi(markers as i32);

        outcome.matches.push(Match {
            start_time,
            end_time,
            sets,
            player1,
            player2,
            confidence,
            winner: None,
        });
    }
}

/// All four character slots resolved and both differ.
fn both_characters_changed(previous: &Set, next: &Set) -> bool {
    previous.character1.is_known()
        && previous.character2.is_known()
        && next.character1.is_known()
        && next.character2.is_known()
        && previous.character1.canonical != next.character1.canonical
        && previous.character2.canonical != next.character2.canonical
}

/// Player slots match directly or side-swapped; unresolved slots are
/// compatible with anything.
fn players_consistent(previous: &Set, next: &Set) -> bool {
    let direct = slot_compatible(previous.player1.as_ref(), next.player1.as_ref())
        && slot_compatible(previous.player2.as_ref(), next.player2.as_ref());
    let swapped = slot_compatible(previous.player1.as_ref(), next.player2.as_ref())
        && slot_compatible(previous.player2.as_ref(), next.player1.as_ref());
    direct || swapped
}

fn slot_compatible(a: Option<&ResolvedName>, b: Option<&ResolvedName>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) if a.is_known() && b.is_known() => a.canonical == b.canonical,
        _ => true,
    }
}

/// Majority vote per slot across the match's sets.
fn vote_players(sets: &[Set]) -> (ResolvedName, ResolvedName) {
    let mut vote1 = NameVote::default();
    let mut vote2 = NameVote::default();
    for set in sets {
        if let Some(player) = &set.player1 {
            vote1.add_resolved(player);
        }
        if let Some(player) = &set.player2 {
            vote2.add_resolved(player);
        }
    }
    (
        vote1.winner().unwrap_or_else(ResolvedName::unknown),
        vote2.winner().unwrap_or_else(ResolvedName::unknown),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NameSource, Round, RoundTrigger};

    fn known(name: &str) -> ResolvedName {
        ResolvedName {
            canonical: name.to_string(),
            confidence: 0.9,
            source: NameSource::Fuzzy,
            source_span: (0, 1),
        }
    }

    fn round(start_secs: u32) -> Round {
        Round {
            start_time: VideoTime::from_secs(start_secs),
            end_time: Some(VideoTime::from_secs(start_secs + 90)),
            timer_samples: Vec::new(),
            confidence: 0.9,
            valid: true,
            character1: ResolvedName::unknown(),
            character2: ResolvedName::unknown(),
            trigger: RoundTrigger::FreshStart,
        }
    }

    fn set(
        number: usize,
        start_secs: u32,
        end_secs: u32,
        rounds: usize,
        c1: &str,
        c2: &str,
        p1: Option<&str>,
        p2: Option<&str>,
    ) -> Set {
        Set {
            set_number: number,
            character1: known(c1),
            character2: known(c2),
            rounds: (0..rounds).map(|i| round(start_secs + i as u32 * 130)).collect(),
            start_time: VideoTime::from_secs(start_secs),
            end_time: VideoTime::from_secs(end_secs),
            confidence: 0.9,
            player1: p1.map(known),
            player2: p2.map(known),
        }
    }

    #[test]
    fn test_groups_consecutive_sets() {
        let config = DeductionConfig::default();
        let sets = vec![
            set(1, 0, 300, 2, "RYU", "KEN", Some("PUNK"), Some("MENARD")),
            set(2, 400, 700, 2, "RYU", "BLANKA", Some("PUNK"), Some("MENARD")),
        ];
        let outcome = MatchGrouper::new(&config).group(sets, &[]);

        assert_eq!(outcome.matches.len(), 1);
        let m = &outcome.matches[0];
        assert_eq!(m.sets.len(), 2);
        assert_eq!(m.player1.canonical, "PUNK");
        assert_eq!(m.player2.canonical, "MENARD");
        assert!(m.winner.is_none());
        assert_eq!(m.start_time, VideoTime::from_secs(0));
        assert_eq!(m.end_time, VideoTime::from_secs(700));
    }

    #[test]
    fn test_both_characters_changed_splits_without_gap() {
        let config = DeductionConfig::default();
        let sets = vec![
            set(1, 0, 300, 2, "RYU", "KEN", None, None),
            set(2, 301, 600, 2, "JURI", "CAMMY", None, None),
            set(3, 601, 900, 2, "JURI", "CAMMY", None, None),
        ];
        let outcome = MatchGrouper::new(&config).group(sets, &[]);

        assert_eq!(outcome.matches.len(), 2);
        assert_eq!(outcome.matches[0].sets.len(), 1);
        assert_eq!(outcome.matches[1].sets.len(), 2);
        assert!(outcome.rejected.is_empty());
    }

    #[test]
    fn test_one_character_changed_stays_together() {
        let config = DeductionConfig::default();
        let sets = vec![
            set(1, 0, 300, 2, "RYU", "KEN", None, None),
            set(2, 360, 660, 2, "RYU", "BLANKA", None, None),
        ];
        let outcome = MatchGrouper::new(&config).group(sets, &[]);
        assert_eq!(outcome.matches.len(), 1);
    }

    #[test]
    fn test_gap_splits_matches() {
        let config = DeductionConfig::default();
        let sets = vec![
            set(1, 0, 300, 2, "RYU", "KEN", None, None),
            set(2, 350, 650, 2, "RYU", "KEN", None, None),
            // 220s after the previous set ends
            set(3, 870, 1170, 3, "RYU", "KEN", None, None),
        ];
        let outcome = MatchGrouper::new(&config).group(sets, &[]);

        assert_eq!(outcome.matches.len(), 2);
        assert_eq!(outcome.matches[0].sets.len(), 2);
        assert_eq!(outcome.matches[1].sets.len(), 1);
        assert_eq!(outcome.matches[1].round_count(), 3);
    }

    #[test]
    fn test_player_change_splits_matches() {
        let config = DeductionConfig::default();
        let sets = vec![
            set(1, 0, 300, 2, "RYU", "KEN", Some("PUNK"), Some("MENARD")),
            set(2, 360, 660, 2, "RYU", "KEN", Some("PUNK"), Some("TOKIDO")),
            set(3, 720, 1020, 2, "RYU", "KEN", Some("PUNK"), Some("TOKIDO")),
        ];
        let outcome = MatchGrouper::new(&config).group(sets, &[]);

        assert_eq!(outcome.matches.len(), 2);
        assert_eq!(outcome.matches[0].player2.canonical, "MENARD");
        assert_eq!(outcome.matches[1].player2.canonical, "TOKIDO");
    }

    #[test]
    fn test_unresolved_middle_set_cannot_bridge_player_change() {
        let config = DeductionConfig::default();
        // the middle set resolved no players; the third set still has
        // to agree with the first one
        let sets = vec![
            set(1, 0, 300, 2, "RYU", "KEN", Some("PUNK"), Some("MENARD")),
            set(2, 360, 660, 2, "RYU", "KEN", None, None),
            set(3, 720, 1020, 2, "RYU", "KEN", Some("TOKIDO"), Some("NL")),
        ];
        let outcome = MatchGrouper::new(&config).group(sets, &[]);

        assert_eq!(outcome.matches.len(), 2);
        assert_eq!(outcome.matches[0].sets.len(), 2);
        assert_eq!(outcome.matches[0].player1.canonical, "PUNK");
        assert_eq!(outcome.matches[1].sets.len(), 1);
        assert_eq!(outcome.matches[1].player1.canonical, "TOKIDO");
    }

    #[test]
    fn test_swapped_players_stay_together() {
        let config = DeductionConfig::default();
        let sets = vec![
            set(1, 0, 300, 2, "RYU", "KEN", Some("PUNK"), Some("MENARD")),
            set(2, 360, 660, 2, "KEN", "RYU", Some("MENARD"), Some("PUNK")),
        ];
        let outcome = MatchGrouper::new(&config).group(sets, &[]);
        assert_eq!(outcome.matches.len(), 1);
    }

    #[test]
    fn test_unresolved_players_are_compatible() {
        let config = DeductionConfig::default();
        let sets = vec![
            set(1, 0, 300, 2, "RYU", "KEN", Some("PUNK"), None),
            set(2, 360, 660, 2, "RYU", "KEN", None, Some("MENARD")),
        ];
        let outcome = MatchGrouper::new(&config).group(sets, &[]);

        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].player1.canonical, "PUNK");
        assert_eq!(outcome.matches[0].player2.canonical, "MENARD");
    }

    #[test]
    fn test_single_set_two_rounds_accepted_by_default() {
        // a lone first-to-two set is a match on its own
        let config = DeductionConfig::default();
        let sets = vec![set(1, 0, 300, 2, "RYU", "KEN", None, None)];
        let outcome = MatchGrouper::new(&config).group(sets, &[]);
        assert_eq!(outcome.matches.len(), 1);
        assert!(outcome.rejected.is_empty());
    }

    #[test]
    fn test_raised_set_floor_rejects_short_single_set() {
        let config = DeductionConfig {
            match_min_sets: 2,
            ..Default::default()
        };
        let sets = vec![set(1, 0, 300, 2, "RYU", "KEN", None, None)];
        let outcome = MatchGrouper::new(&config).group(sets, &[]);
        assert!(outcome.matches.is_empty());
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].reason, MatchRejection::TooFewSets);
    }

    #[test]
    fn test_raised_set_floor_keeps_round_fallback() {
        let config = DeductionConfig {
            match_min_sets: 2,
            ..Default::default()
        };
        let sets = vec![set(1, 0, 450, 3, "RYU", "KEN", None, None)];
        let outcome = MatchGrouper::new(&config).group(sets, &[]);
        assert_eq!(outcome.matches.len(), 1);
    }

    #[test]
    fn test_gap_markers_discount_confidence() {
        let config = DeductionConfig::default();
        let sets = vec![
            set(1, 0, 300, 2, "RYU", "KEN", None, None),
            set(2, 400, 700, 2, "RYU", "KEN", None, None),
        ];
        let markers = vec![VideoTime::from_secs(350)];
        let outcome = MatchGrouper::new(&config).group(sets, &markers);

        assert_eq!(outcome.matches.len(), 1);
        // one marker inside the match: mean 0.9 discounted once
        assert!((outcome.matches[0].confidence - 0.9 * 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_markers_outside_match_ignored() {
        let config = DeductionConfig::default();
        let sets = vec![
            set(1, 100, 400, 2, "RYU", "KEN", None, None),
            set(2, 500, 800, 2, "RYU", "KEN", None, None),
        ];
        let markers = vec![VideoTime::from_secs(50), VideoTime::from_secs(900)];
        let outcome = MatchGrouper::new(&config).group(sets, &markers);
        assert!((outcome.matches[0].confidence - 0.9).abs() < 1e-9);
    }
}
