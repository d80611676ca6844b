//! Reference rosters for name resolution
//!
//! A roster is the list of canonical names fuzzy matching resolves
//! against. Characters default to the built-in Street Fighter 6 cast;
//! players have no built-in roster and fall back to passthrough mode.

use std::path::Path;

use vodmatch_common::{Error, Result};

/// Street Fighter 6 roster, canonical uppercase spellings.
pub const SF6_CHARACTERS: &[&str] = &[
    "RYU", "KEN", "CHUN-LI", "LUKE", "JAMIE", "GUILE", "KIMBERLY", "JURI", "BLANKA", "DHALSIM",
    "E. HONDA", "DEE JAY", "MANON", "MARISA", "JP", "ZANGIEF", "LILY", "CAMMY", "RASHID",
    "A.K.I.", "ED", "AKUMA", "M. BISON", "TERRY", "MAI", "ELENA",
];

/// An ordered list of canonical names, normalized to trimmed uppercase.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    names: Vec<String>,
}

impl Roster {
    /// Build a roster from arbitrary strings, dropping empty entries.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_uppercase())
            .filter(|n| !n.is_empty())
            .collect();
        Roster { names }
    }

    /// Empty roster: resolution degrades to cleaned-text passthrough.
    pub fn empty() -> Self {
        Roster::default()
    }

    pub fn sf6_characters() -> Self {
        Roster::new(SF6_CHARACTERS.iter().copied())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Load a roster from a JSON file.
    ///
    /// Accepts either a bare array of strings or an object carrying the
    /// list under a `characters` or `players` key.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&text)?;

        let entries = match &value {
            serde_json::Value::Array(items) => items.as_slice(),
            serde_json::Value::Object(map) => map
                .get("characters")
                .or_else(|| map.get("players"))
                .and_then(|v| v.as_array())
                .map(|a| a.as_slice())
                .ok_or_else(|| {
                    Error::Config(format!(
                        "roster file {} has no characters or players list",
                        path.display()
                    ))
                })?,
            _ => {
                return Err(Error::Config(format!(
                    "roster file {} must be a JSON array or object",
                    path.display()
                )))
            }
        };

        let names: Vec<&str> = entries.iter().filter_map(|v| v.as_str()).collect();
        let roster = Roster::new(names);
        if roster.is_empty() {
            return Err(Error::Config(format!(
                "roster file {} contains no names",
                path.display()
            )));
        }
        Ok(roster)
    }
}
