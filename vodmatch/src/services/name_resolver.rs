//! Fuzzy name resolution with continuity fallback
//!
//! OCR text for character and player names is matched against a roster
//! of canonical spellings using Jaro-Winkler similarity. When a frame
//! carries no usable text, the last confident resolution is carried
//! forward for a bounded window with decayed confidence.

use strsim::jaro_winkler;
use vodmatch_common::VideoTime;

use crate::config::DeductionConfig;
use crate::roster::Roster;
use crate::types::{NameSource, ResolvedName};

/// Confidence assigned to cleaned text accepted without a roster
const PASSTHROUGH_CONFIDENCE: f64 = 0.75;

/// Best roster hit for one piece of OCR text.
///
/// Exact hits (after trim + uppercase) score 1.0 without running the
/// similarity metric. Returns `None` when nothing clears the cutoff.
pub fn fuzzy_best_match(text: &str, roster: &[String], cutoff: f64) -> Option<(String, f64)> {
    let needle = text.trim().to_uppercase();
    if needle.is_empty() {
        return None;
    }
    if let Some(exact) = roster.iter().find(|name| **name == needle) {
        return Some((exact.clone(), 1.0));
    }

    let mut best: Option<(&String, f64)> = None;
    for name in roster {
        let score = jaro_winkler(&needle, name);
        if best.map_or(true, |(_, b)| score > b) {
            best = Some((name, score));
        }
    }
    best.filter(|(_, score)| *score >= cutoff)
        .map(|(name, score)| (name.clone(), score))
}

/// Per-slot continuity state: the last confident resolution and when
/// it was observed.
#[derive(Debug, Clone, Default)]
pub struct NameContinuity {
    last: Option<(ResolvedName, VideoTime)>,
}

impl NameContinuity {
    pub fn record(&mut self, name: ResolvedName, at: VideoTime) {
        self.last = Some((name, at));
    }

    pub fn last(&self) -> Option<(&ResolvedName, VideoTime)> {
        self.last.as_ref().map(|(name, at)| (name, *at))
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Resolves OCR text against one roster, tracking continuity per slot.
pub struct NameResolver<'a> {
    roster: &'a Roster,
    cutoff: f64,
    continuity_timeout_secs: u32,
    propagation_decay: f64,
}

impl<'a> NameResolver<'a> {
    pub fn new(roster: &'a Roster, config: &DeductionConfig) -> Self {
        Self {
            roster,
            cutoff: config.similarity_cutoff,
            continuity_timeout_secs: config.continuity_timeout_secs,
            propagation_decay: config.propagation_decay,
        }
    }

    /// Match one piece of text without touching continuity state.
    ///
    /// With an empty roster the cleaned uppercase text passes through
    /// as its own canonical form (player names have no fixed cast).
    pub fn match_text(&self, raw: &str) -> Option<(String, f64, NameSource)> {
        let cleaned = raw.trim();
        if cleaned.is_empty() {
            return None;
        }
        if self.roster.is_empty() {
            return Some((
                cleaned.to_uppercase(),
                PASSTHROUGH_CONFIDENCE,
                NameSource::Fuzzy,
            ));
        }
        fuzzy_best_match(cleaned, self.roster.names(), self.cutoff).map(|(name, score)| {
            let source = if score >= 1.0 {
                NameSource::Exact
            } else {
                NameSource::Fuzzy
            };
            (name, score, source)
        })
    }

    /// Resolve one observation slot, falling back to continuity.
    ///
    /// A confident match refreshes the continuity state; a propagated
    /// result does not, so the decay window is anchored at the last
    /// real detection.
    pub fn resolve(
        &self,
        raw: Option<&str>,
        at: VideoTime,
        index: usize,
        continuity: &mut NameContinuity,
    ) -> ResolvedName {
        if let Some(raw) = raw {
            if let Some((canonical, confidence, source)) = self.match_text(raw) {
                let resolved = ResolvedName {
                    canonical,
                    confidence,
                    source,
                    source_span: (index, index + 1),
                };
                continuity.record(resolved.clone(), at);
                return resolved;
            }
        }

        if let Some((last, seen_at)) = continuity.last() {
            if at.gap_secs(seen_at) <= self.continuity_timeout_secs {
                return ResolvedName {
                    canonical: last.canonical.clone(),
                    confidence: last.confidence * self.propagation_decay,
                    source: NameSource::Propagated,
                    source_span: last.source_span,
                };
            }
        }
        ResolvedName::unknown()
    }
}

/// Majority vote over several resolutions of the same slot.
///
/// Tracks per-candidate vote counts, the best-scoring instance, and the
/// combined observation span. Used when a name is sampled many times
/// across a window (player names over a set, characters over a round).
#[derive(Debug, Default)]
pub struct NameVote {
    candidates: Vec<VoteEntry>,
}

#[derive(Debug)]
struct VoteEntry {
    canonical: String,
    votes: usize,
    confidence: f64,
    source: NameSource,
    span: (usize, usize),
}

impl NameVote {
    pub fn add(&mut self, canonical: &str, confidence: f64, source: NameSource, span: (usize, usize)) {
        if let Some(entry) = self
            .candidates
            .iter_mut()
            .find(|e| e.canonical == canonical)
        {
            entry.votes += 1;
            if confidence > entry.confidence {
                entry.confidence = confidence;
                entry.source = source;
            }
            entry.span = (entry.span.0.min(span.0), entry.span.1.max(span.1));
        } else {
            self.candidates.push(VoteEntry {
                canonical: canonical.to_string(),
                votes: 1,
                confidence,
                source,
                span,
            });
        }
    }

    pub fn add_resolved(&mut self, name: &ResolvedName) {
        if name.is_known() {
            self.add(&name.canonical, name.confidence, name.source, name.source_span);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Most-voted candidate; the earliest-seen one wins ties, keeping
    /// the result independent of map iteration order.
    pub fn winner(self) -> Option<ResolvedName> {
        let mut best: Option<VoteEntry> = None;
        for entry in self.candidates {
            let replace = best.as_ref().map_or(true, |current| entry.votes > current.votes);
            if replace {
                best = Some(entry);
            }
        }
        best.map(|entry| ResolvedName {
            canonical: entry.canonical,
            confidence: entry.confidence,
            source: entry.source,
            source_span: entry.span,
        })
    }
}
