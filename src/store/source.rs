//! External species sources attached to nodes.

use serde::{Deserialize, Serialize};

/// Source kinds. Codes follow the legacy toolkit (-1 means "no source").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceKind {
    Concentration = 0,
    Mass = 1,
    Setpoint = 2,
    FlowPaced = 3,
}

impl SourceKind {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(SourceKind::Concentration),
            1 => Some(SourceKind::Mass),
            2 => Some(SourceKind::Setpoint),
            3 => Some(SourceKind::FlowPaced),
            _ => None,
        }
    }

    pub fn code(&self) -> i32 { *self as i32 }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Source {
    pub species: usize,
    pub kind: SourceKind,
    /// Baseline strength.
    pub c0: f64,
    /// Pattern index (0 = none).
    pub pattern: usize,
}

/// Returns the record for `species`, creating one if the node has none yet.
/// At most one record exists per species.
pub fn upsert(sources: &mut Vec<Source>, species: usize, kind: SourceKind, c0: f64, pattern: usize) -> Result<(), std::collections::TryReserveError> {
    match sources.iter_mut().find(|s| s.species == species) {
        Some(existing) => {
            existing.kind = kind;
            existing.c0 = c0;
            existing.pattern = pattern;
        }
        None => {
            sources.try_reserve(1)?;
            sources.push(Source { species, kind, c0, pattern });
        }
    }
    Ok(())
}

pub fn find(sources: &[Source], species: usize) -> Option<&Source> {
    sources.iter().find(|s| s.species == species)
}
