//! Shared primitive types used across the entire crate.

use serde::{Deserialize, Serialize};

/// A stable, unique identifier for a unit (UUID v4 string).
pub type UnitId = String;

/// The canonical run identifier.
pub type RunId = String;

/// A 128-bit master seed. Wide enough to carry the seeds the
/// reference datasets were produced with.
pub type Seed = u128;

/// Treatment arm of a unit. Stored as 0 / 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Assignment {
    Control = 0,
    Treatment = 1,
}

impl Assignment {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_treatment(self) -> bool {
        matches!(self, Self::Treatment)
    }
}

impl From<Assignment> for u8 {
    fn from(a: Assignment) -> u8 {
        a.as_u8()
    }
}

impl TryFrom<u8> for Assignment {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Self::Control),
            1 => Ok(Self::Treatment),
            other => Err(format!("assignment must be 0 or 1, got {other}")),
        }
    }
}

/// Which view of a table a persisted row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Population,
    Assigned,
    Treated,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Population => "population",
            Self::Assigned => "assigned",
            Self::Treated => "treated",
        }
    }
}

/// Round to two decimals, the precision datasets are stored at.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
