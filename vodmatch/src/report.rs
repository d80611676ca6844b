//! Report rendering
//!
//! Two output forms: the JSON report with the full match/set/round
//! hierarchy, and a one-line-per-set plain text summary for skimming a
//! VOD. Rendering is pure so identical analyses serialize identically.

use serde::Serialize;
use vodmatch_common::VideoTime;

use crate::types::{AnalysisResult, AnalysisStats, Match, Round, Set};

#[derive(Debug, Serialize)]
pub struct ReportDocument {
    pub matches: Vec<MatchReport>,
    pub stats: AnalysisStats,
}

#[derive(Debug, Serialize)]
pub struct MatchReport {
    pub start_time: VideoTime,
    pub end_time: VideoTime,
    pub player1: String,
    pub player2: String,
    pub winner: Option<String>,
    pub confidence: f64,
    pub sets_count: usize,
    pub sets: Vec<SetReport>,
}

#[derive(Debug, Serialize)]
pub struct SetReport {
    pub set_number: usize,
    pub start_time: VideoTime,
    pub character1: String,
    pub character2: String,
    pub confidence: f64,
    pub rounds_count: usize,
    pub rounds: Vec<RoundReport>,
}

#[derive(Debug, Serialize)]
pub struct RoundReport {
    pub start_time: VideoTime,
    pub confidence: f64,
}

/// Build the serializable report from an analysis result.
pub fn build_report(analysis: &AnalysisResult) -> ReportDocument {
    ReportDocument {
        matches: analysis.matches.iter().map(match_report).collect(),
        stats: analysis.stats.clone(),
    }
}

fn match_report(m: &Match) -> MatchReport {
    MatchReport {
        start_time: m.start_time,
        end_time: m.end_time,
        player1: m.player1.display_name().to_string(),
        player2: m.player2.display_name().to_string(),
        winner: m.winner.clone(),
        confidence: round2(m.confidence),
        sets_count: m.sets.len(),
        sets: m.sets.iter().map(set_report).collect(),
    }
}

fn set_report(s: &Set) -> SetReport {
    SetReport {
        set_number: s.set_number,
        start_time: s.start_time,
        character1: s.character1.display_name().to_string(),
        character2: s.character2.display_name().to_string(),
        confidence: round2(s.confidence),
        rounds_count: s.rounds.len(),
        rounds: s.rounds.iter().map(round_report).collect(),
    }
}

fn round_report(r: &Round) -> RoundReport {
    RoundReport {
        start_time: r.start_time,
        confidence: round2(r.confidence),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Render the plain text summary: one line per set, showing the match
/// players. A player's character appears in parentheses only when it
/// stayed constant across the whole match.
pub fn render_summary(analysis: &AnalysisResult) -> String {
    let mut lines = Vec::new();
    for m in &analysis.matches {
        let char1 = constant_character(m, |s| &s.character1);
        let char2 = constant_character(m, |s| &s.character2);
        let left = player_label(m.player1.display_name(), char1);
        let right = player_label(m.player2.display_name(), char2);
        for set in &m.sets {
            lines.push(format!("{} {} VS {}", set.start_time, left, right));
        }
    }
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

/// Character for one side if it is known and identical across all
/// sets of the match.
fn constant_character<'a>(
    m: &'a Match,
    slot: impl Fn(&'a Set) -> &'a crate::types::ResolvedName,
) -> Option<&'a str> {
    let mut result: Option<&str> = None;
    for set in &m.sets {
        let name = slot(set);
        if !name.is_known() {
            return None;
        }
        match result {
            None => result = Some(&name.canonical),
            Some(seen) if seen == name.canonical => {}
            Some(_) => return None,
        }
    }
    result
}

fn player_label(player: &str, character: Option<&str>) -> String {
    match character {
        Some(name) => format!("{} ({})", player, format_character_name(name)),
        None => player.to_string(),
    }
}

/// Pretty-case a canonical character name for the summary.
///
/// Dotted abbreviations stay uppercase ("M. BISON" keeps "M."), other
/// words are capitalized ("DEE JAY" becomes "Dee Jay").
pub fn format_character_name(name: &str) -> String {
    if name.is_empty() {
        return "Unknown".to_string();
    }
    name.split_whitespace()
        .map(|part| {
            if part.contains('.') {
                part.to_string()
            } else {
                capitalize(part)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NameSource, ResolvedName, RoundTrigger};

    fn known(name: &str) -> ResolvedName {
        ResolvedName {
            canonical: name.to_string(),
            confidence: 0.9,
            source: NameSource::Fuzzy,
            source_span: (0, 1),
        }
    }

    fn round(start_secs: u32, confidence: f64) -> Round {
        Round {
            start_time: VideoTime::from_secs(start_secs),
            end_time: Some(VideoTime::from_secs(start_secs + 90)),
            timer_samples: Vec::new(),
            confidence,
            valid: true,
            character1: ResolvedName::unknown(),
            character2: ResolvedName::unknown(),
            trigger: RoundTrigger::FreshStart,
        }
    }

    fn sample_analysis() -> AnalysisResult {
        let set1 = Set {
            set_number: 1,
            character1: known("RYU"),
            character2: known("DEE JAY"),
            rounds: vec![round(0, 0.954), round(130, 0.9)],
            start_time: VideoTime::from_secs(0),
            end_time: VideoTime::from_secs(220),
            confidence: 0.927,
            player1: Some(known("PUNK")),
            player2: Some(known("MENARD")),
        };
        let set2 = Set {
            set_number: 2,
            character1: known("RYU"),
            character2: known("DEE JAY"),
            rounds: vec![round(300, 0.9), round(430, 0.9)],
            start_time: VideoTime::from_secs(300),
            end_time: VideoTime::from_secs(520),
            confidence: 0.9,
            player1: Some(known("PUNK")),
            player2: Some(known("MENARD")),
        };
        let m = Match {
            start_time: VideoTime::from_secs(0),
            end_time: VideoTime::from_secs(520),
            player1: known("PUNK"),
            player2: known("MENARD"),
            confidence: 0.913,
            winner: None,
            sets: vec![set1, set2],
        };
        AnalysisResult {
            matches: vec![m],
            stats: AnalysisStats {
                total_frames_analyzed: 100,
                total_matches_detected: 1,
                total_sets_detected: 2,
                total_rounds_detected: 4,
                timer_detection_rate: 0.82,
            },
        }
    }

    #[test]
    fn test_report_structure() {
        let report = build_report(&sample_analysis());
        assert_eq!(report.matches.len(), 1);
        let m = &report.matches[0];
        assert_eq!(m.player1, "PUNK");
        assert_eq!(m.sets_count, 2);
        assert_eq!(m.sets[0].rounds_count, 2);
        assert_eq!(m.sets[0].character2, "DEE JAY");
        assert!(m.winner.is_none());
        // confidence rounded to two decimals
        assert_eq!(m.confidence, 0.91);
        assert_eq!(m.sets[0].rounds[0].confidence, 0.95);
    }

    #[test]
    fn test_report_serialization_is_stable() {
        let analysis = sample_analysis();
        let a = serde_json::to_string_pretty(&build_report(&analysis)).unwrap();
        let b = serde_json::to_string_pretty(&build_report(&analysis)).unwrap();
        assert_eq!(a, b);
        assert!(a.contains("\"start_time\": \"00:00:00\""));
        assert!(a.contains("\"timer_detection_rate\": 0.82"));
    }

    #[test]
    fn test_summary_with_constant_characters() {
        let summary = render_summary(&sample_analysis());
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "00:00:00 PUNK (Ryu) VS MENARD (Dee Jay)");
        assert_eq!(lines[1], "00:05:00 PUNK (Ryu) VS MENARD (Dee Jay)");
    }

    #[test]
    fn test_summary_drops_changing_character() {
        let mut analysis = sample_analysis();
        analysis.matches[0].sets[1].character2 = known("BLANKA");
        let summary = render_summary(&analysis);
        assert!(summary.contains("PUNK (Ryu) VS MENARD\n"));
        assert!(!summary.contains("Blanka"));
    }

    #[test]
    fn test_format_character_name() {
        assert_eq!(format_character_name("RYU"), "Ryu");
        assert_eq!(format_character_name("DEE JAY"), "Dee Jay");
        assert_eq!(format_character_name("CHUN-LI"), "Chun-li");
        assert_eq!(format_character_name("M. BISON"), "M. Bison");
        assert_eq!(format_character_name("A.K.I."), "A.K.I.");
        assert_eq!(format_character_name(""), "Unknown");
    }
}
