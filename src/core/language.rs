//! Numerosity → marker lookup.
//!
//! A language names a small set of number markers and says which marker a
//! group of `n` items takes. Languages come from a plain-text table, one per
//! line:
//!
//! ```text
//! # name  marker [n ...]  marker [n ...] [*]
//! english s 1 pl *
//! slovenian sg 1 du 2 pl 3 4 gpl *
//! ```
//!
//! Numbers after a marker assign those numerosities to it; `*` makes the
//! preceding marker the default for every numerosity not assigned explicitly
//! and must be followed by a new marker or the end of the line.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::distribution::MAX_SUPPORT_POINT;
use crate::error::{SimError, SimResult};

pub type MarkerId = u32;

/// Languages compiled into the binary.
pub const BUILTIN_LANGUAGES: &str = "\
english s 1 pl *
slovenian sg 1 du 2 pl 3 4 gpl *
mandarin none *
";

/// Strategy for mapping a numerosity to its marker label.
///
/// Implementations may leave numerosities undefined by returning `None`;
/// [`resolve_markers`] turns that into a configuration error before a run
/// starts.
pub trait MarkerSource {
    fn name(&self) -> &str;

    /// Every marker the language can produce, in a fixed order.
    fn markers(&self) -> &[String];

    fn marker_for(&self, n: u32) -> Option<&str>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Language {
    name: String,
    markers: Vec<String>,
    assigned: BTreeMap<u32, usize>,
    default_marker: usize,
}

impl Language {
    pub fn default_marker(&self) -> &str {
        &self.markers[self.default_marker]
    }
}

impl MarkerSource for Language {
    fn name(&self) -> &str {
        &self.name
    }

    fn markers(&self) -> &[String] {
        &self.markers
    }

    fn marker_for(&self, n: u32) -> Option<&str> {
        if n == 0 {
            return None;
        }
        let idx = self.assigned.get(&n).copied().unwrap_or(self.default_marker);
        Some(self.markers[idx].as_str())
    }
}

/// Marker id for every numerosity `1..=max_numerosity` (index 0 is numerosity 1).
pub fn resolve_markers(source: &dyn MarkerSource, max_numerosity: u32) -> SimResult<Vec<MarkerId>> {
    let markers = source.markers();
    (1..=max_numerosity)
        .map(|n| {
            let label = source.marker_for(n).ok_or_else(|| {
                SimError::config(format!(
                    "language '{}' defines no marker for numerosity {n}",
                    source.name()
                ))
            })?;
            markers
                .iter()
                .position(|m| m == label)
                .map(|i| i as MarkerId)
                .ok_or_else(|| {
                    SimError::config(format!(
                        "language '{}' maps numerosity {n} to undeclared marker '{label}'",
                        source.name()
                    ))
                })
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct LanguageTable {
    languages: Vec<Language>,
}

impl LanguageTable {
    pub fn builtin() -> SimResult<Self> {
        Self::parse(BUILTIN_LANGUAGES)
    }

    pub fn load(path: &Path) -> SimResult<Self> {
        let text = fs::read_to_string(path)?;
        let table = Self::parse(&text).map_err(|e| match e {
            SimError::Config(msg) => SimError::config(format!("{}: {msg}", path.display())),
            other => other,
        })?;
        debug!(path = %path.display(), languages = table.len(), "language table loaded");
        Ok(table)
    }

    pub fn parse(text: &str) -> SimResult<Self> {
        let mut languages: Vec<Language> = Vec::new();
        for (line_idx, line) in text.lines().enumerate() {
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let lang = parse_line(line, line_idx + 1)?;
            if languages.iter().any(|l| l.name == lang.name) {
                return Err(SimError::config(format!(
                    "line {}: language '{}' defined twice",
                    line_idx + 1,
                    lang.name
                )));
            }
            languages.push(lang);
        }
        Ok(Self { languages })
    }

    pub fn get(&self, name: &str) -> Option<&Language> {
        self.languages.iter().find(|l| l.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Language> {
        self.languages.iter()
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}

/// Whitespace-separated tokens with their 1-based starting column.
fn tokens(line: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in line.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                out.push((s, &line[s..i]));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push((s, &line[s..]));
    }
    out.into_iter()
        .map(|(byte, tok)| (line[..byte].chars().count() + 1, tok))
        .collect()
}

fn parse_line(line: &str, line_no: usize) -> SimResult<Language> {
    let err = |col: usize, msg: String| SimError::config(format!("line {line_no} col {col}: {msg}"));

    let mut toks = tokens(line).into_iter();
    let (col, name) = toks
        .next()
        .ok_or_else(|| err(1, "missing language name".to_string()))?;
    if let Some(off) = name.chars().position(|c| !c.is_alphabetic()) {
        return Err(err(col + off, format!("unexpected character in language name '{name}'")));
    }

    let mut markers: Vec<String> = Vec::new();
    let mut assigned: BTreeMap<u32, usize> = BTreeMap::new();
    let mut default_marker: Option<usize> = None;
    let mut after_default = false;

    for (col, tok) in toks {
        if tok == "*" {
            let current = markers
                .len()
                .checked_sub(1)
                .ok_or_else(|| err(col, "'*' before any marker".to_string()))?;
            if default_marker.is_some() {
                return Err(err(col, format!("language '{name}' has two default markers")));
            }
            default_marker = Some(current);
            after_default = true;
        } else if tok.chars().all(|c| c.is_ascii_digit()) {
            if after_default {
                return Err(err(col, format!("numerosity {tok} after '*'")));
            }
            let current = markers
                .len()
                .checked_sub(1)
                .ok_or_else(|| err(col, format!("numerosity {tok} before any marker")))?;
            let n: u32 = tok
                .parse()
                .map_err(|_| err(col, format!("numerosity {tok} too big")))?;
            if n == 0 || n > MAX_SUPPORT_POINT {
                return Err(err(
                    col,
                    format!("numerosity {n} outside 1..={MAX_SUPPORT_POINT}"),
                ));
            }
            if assigned.insert(n, current).is_some() {
                return Err(err(col, format!("numerosity {n} assigned twice")));
            }
        } else if tok.chars().all(char::is_alphabetic) {
            if markers.iter().any(|m| m == tok) {
                return Err(err(col, format!("marker '{tok}' declared twice")));
            }
            markers.push(tok.to_string());
            after_default = false;
        } else {
            let off = tok
                .chars()
                .position(|c| !(c.is_alphabetic() || c.is_ascii_digit()))
                .unwrap_or(0);
            let bad = tok.chars().nth(off).unwrap_or('?');
            return Err(err(col + off, format!("unexpected character '{bad}'")));
        }
    }

    let default_marker = default_marker.ok_or_else(|| {
        SimError::config(format!(
            "line {line_no}: no default marker set for language '{name}'"
        ))
    })?;

    Ok(Language {
        name: name.to_string(),
        markers,
        assigned,
        default_marker,
    })
}
