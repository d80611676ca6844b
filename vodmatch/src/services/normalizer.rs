//! Observation normalization
//!
//! Converts raw frame records into timeline-ordered observations:
//! timestamps parsed, timer readings coerced into the 0..=99 range,
//! text fields trimmed. Records without a usable timestamp cannot be
//! placed on the timeline and are dropped.

use tracing::debug;
use vodmatch_common::VideoTime;

use crate::types::{Observation, RawRecord};

/// Outcome of normalizing one export.
#[derive(Debug, Default)]
pub struct Normalized {
    /// Observations sorted by timestamp, `index` assigned after sorting
    pub observations: Vec<Observation>,
    /// Records dropped for lacking a parseable timestamp
    pub dropped_records: usize,
}

impl Normalized {
    /// Observations carrying a usable timer reading
    pub fn timer_detections(&self) -> usize {
        self.observations
            .iter()
            .filter(|o| o.timer_value.is_some())
            .count()
    }
}

/// Normalize raw records into sorted observations.
pub fn normalize(records: &[RawRecord]) -> Normalized {
    let mut observations = Vec::with_capacity(records.len());
    let mut dropped = 0usize;

    for record in records {
        let timestamp = record.timestamp.as_deref().and_then(VideoTime::parse);
        let Some(timestamp) = timestamp else {
            dropped += 1;
            continue;
        };
        observations.push(Observation {
            index: 0,
            timestamp,
            timer_value: parse_timer(record.timer_value.as_deref()),
            character1_raw: clean_text(record.character1.as_deref()),
            character2_raw: clean_text(record.character2.as_deref()),
            player1_raw: clean_text(record.player1.as_deref()),
            player2_raw: clean_text(record.player2.as_deref()),
        });
    }

    // Stable sort keeps same-timestamp frames in export order
    observations.sort_by_key(|o| o.timestamp);
    for (index, obs) in observations.iter_mut().enumerate() {
        obs.index = index;
    }

    if dropped > 0 {
        debug!(dropped, "Dropped records without usable timestamps");
    }

    Normalized {
        observations,
        dropped_records: dropped,
    }
}

/// Coerce an OCR timer reading into 0..=99.
///
/// OCR output is dirty: readings arrive with stray glyphs ("4S", "99.")
/// or extra digits ("123" for a misread "12 3"). The first two digits
/// are what the timer display can actually hold.
fn parse_timer(raw: Option<&str>) -> Option<u8> {
    let text = raw?.trim();
    if text.is_empty() {
        return None;
    }
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).take(2).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<u8>().ok()
}

fn clean_text(raw: Option<&str>) -> Option<String> {
    let text = raw?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(timestamp: &str, timer: &str) -> RawRecord {
        RawRecord {
            timestamp: Some(timestamp.to_string()),
            timer_value: Some(timer.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_timer_coercion() {
        assert_eq!(parse_timer(Some("99")), Some(99));
        assert_eq!(parse_timer(Some(" 45 ")), Some(45));
        assert_eq!(parse_timer(Some("4S")), Some(4));
        assert_eq!(parse_timer(Some("99.")), Some(99));
        // extra digits: only the first two can come from the display
        assert_eq!(parse_timer(Some("123")), Some(12));
        assert_eq!(parse_timer(Some("abc")), None);
        assert_eq!(parse_timer(Some("")), None);
        assert_eq!(parse_timer(None), None);
    }

    #[test]
    fn test_sorting_and_indexing() {
        let records = vec![
            record("00:00:20", "90"),
            record("00:00:05", "99"),
            record("00:00:10", "95"),
        ];
        let normalized = normalize(&records);
        let times: Vec<u32> = normalized
            .observations
            .iter()
            .map(|o| o.timestamp.as_secs())
            .collect();
        assert_eq!(times, vec![5, 10, 20]);
        let indices: Vec<usize> = normalized.observations.iter().map(|o| o.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_drops_records_without_timestamp() {
        let records = vec![
            RawRecord::default(),
            RawRecord {
                timestamp: Some("junk".to_string()),
                character1: Some("RYU".to_string()),
                ..Default::default()
            },
            record("00:00:05", "99"),
        ];
        let normalized = normalize(&records);
        assert_eq!(normalized.observations.len(), 1);
        assert_eq!(normalized.dropped_records, 2);
    }

    #[test]
    fn test_text_cleaning() {
        let records = vec![RawRecord {
            timestamp: Some("00:00:05".to_string()),
            character1: Some("  RYU ".to_string()),
            character2: Some("   ".to_string()),
            ..Default::default()
        }];
        let normalized = normalize(&records);
        let obs = &normalized.observations[0];
        assert_eq!(obs.character1_raw.as_deref(), Some("RYU"));
        assert!(obs.character2_raw.is_none());
    }

    #[test]
    fn test_timer_detection_count() {
        let records = vec![
            record("00:00:05", "99"),
            record("00:00:06", ""),
            record("00:00:07", "98"),
        ];
        let normalized = normalize(&records);
        assert_eq!(normalized.timer_detections(), 2);
    }
}
