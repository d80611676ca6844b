//! Video timestamp handling
//!
//! Timestamps are offsets from the start of a video, not wall-clock times.
//! The extraction stage writes them as `HH:MM:SS` strings; `VideoTime`
//! parses that format (plus the shorter `MM:SS`) and prints it back
//! identically, so reports stay byte-stable across runs.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Offset from the start of the video, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VideoTime(u32);

impl VideoTime {
    /// Start of the video
    pub const ZERO: VideoTime = VideoTime(0);

    pub fn from_secs(secs: u32) -> Self {
        VideoTime(secs)
    }

    pub fn as_secs(self) -> u32 {
        self.0
    }

    /// Parse a `HH:MM:SS` or `MM:SS` timestamp.
    ///
    /// Returns `None` for anything else (missing fields, non-numeric
    /// components, minutes or seconds out of range).
    pub fn parse(text: &str) -> Option<Self> {
        let parts: Vec<&str> = text.trim().split(':').collect();
        let (hours, minutes, seconds) = match parts[..] {
            [h, m, s] => (
                h.parse::<u32>().ok()?,
                m.parse::<u32>().ok()?,
                s.parse::<u32>().ok()?,
            ),
            [m, s] => (0, m.parse::<u32>().ok()?, s.parse::<u32>().ok()?),
            _ => return None,
        };
        if minutes >= 60 || seconds >= 60 {
            return None;
        }
        Some(VideoTime(hours * 3600 + minutes * 60 + seconds))
    }

    /// Seconds elapsed since `earlier`, saturating at zero if `earlier`
    /// is actually later.
    pub fn gap_secs(self, earlier: VideoTime) -> u32 {
        self.0.saturating_sub(earlier.0)
    }

    pub fn add_secs(self, secs: u32) -> Self {
        VideoTime(self.0.saturating_add(secs))
    }

    pub fn saturating_sub_secs(self, secs: u32) -> Self {
        VideoTime(self.0.saturating_sub(secs))
    }
}

impl fmt::Display for VideoTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.0 / 3600;
        let minutes = (self.0 % 3600) / 60;
        let seconds = self.0 % 60;
        write!(f, "{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

impl Serialize for VideoTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VideoTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        VideoTime::parse(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_format() {
        assert_eq!(VideoTime::parse("00:00:00"), Some(VideoTime::ZERO));
        assert_eq!(VideoTime::parse("01:02:03"), Some(VideoTime::from_secs(3723)));
        assert_eq!(VideoTime::parse("10:00:00"), Some(VideoTime::from_secs(36000)));
    }

    #[test]
    fn test_parse_short_format() {
        assert_eq!(VideoTime::parse("02:03"), Some(VideoTime::from_secs(123)));
        assert_eq!(VideoTime::parse("00:59"), Some(VideoTime::from_secs(59)));
    }

    #[test]
    fn test_parse_whitespace() {
        assert_eq!(VideoTime::parse(" 00:01:05 "), Some(VideoTime::from_secs(65)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(VideoTime::parse(""), None);
        assert_eq!(VideoTime::parse("123"), None);
        assert_eq!(VideoTime::parse("aa:bb:cc"), None);
        assert_eq!(VideoTime::parse("00:61:00"), None);
        assert_eq!(VideoTime::parse("00:00:75"), None);
        assert_eq!(VideoTime::parse("1:2:3:4"), None);
    }

    #[test]
    fn test_display_round_trip() {
        for text in ["00:00:00", "00:01:39", "01:02:03", "12:59:59"] {
            let time = VideoTime::parse(text).unwrap();
            assert_eq!(time.to_string(), text);
        }
    }

    #[test]
    fn test_gap_saturates() {
        let early = VideoTime::from_secs(100);
        let late = VideoTime::from_secs(160);
        assert_eq!(late.gap_secs(early), 60);
        assert_eq!(early.gap_secs(late), 0);
    }

    #[test]
    fn test_arithmetic() {
        let t = VideoTime::from_secs(100);
        assert_eq!(t.add_secs(30), VideoTime::from_secs(130));
        assert_eq!(t.saturating_sub_secs(30), VideoTime::from_secs(70));
        assert_eq!(t.saturating_sub_secs(200), VideoTime::ZERO);
    }

    #[test]
    fn test_serde_as_string() {
        let time = VideoTime::from_secs(3723);
        assert_eq!(serde_json::to_string(&time).unwrap(), "\"01:02:03\"");

        let parsed: VideoTime = serde_json::from_str("\"00:02:15\"").unwrap();
        assert_eq!(parsed, VideoTime::from_secs(135));

        assert!(serde_json::from_str::<VideoTime>("\"nonsense\"").is_err());
    }

    #[test]
    fn test_ordering() {
        assert!(VideoTime::from_secs(10) < VideoTime::from_secs(11));
        assert!(VideoTime::ZERO <= VideoTime::from_secs(0));
    }
}
