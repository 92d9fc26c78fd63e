//! The unit table: one row per synthetic customer.
//!
//! Row order is significant. Sampling returns rows in draw order and every
//! later stage preserves it, so a pre-treatment clone and the treated table
//! line up row by row.

use crate::{
    error::{SimError, SimResult},
    types::{Assignment, UnitId},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Columns every input table must carry.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "avg_order_value",
    "days_since_last_activity",
    "tenure_days",
    "loyalty_flag",
    "outcome",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub unit_id: UnitId,
    pub display_name: String,
    pub avg_order_value: f64,
    pub days_since_last_activity: u32,
    pub tenure_days: u32,
    pub loyalty_flag: bool,
    pub outcome: f64,
    #[serde(default)]
    pub assignment: Option<Assignment>,
}

impl Unit {
    pub fn is_treated(&self) -> bool {
        self.assignment.is_some_and(Assignment::is_treatment)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitTable {
    units: Vec<Unit>,
}

impl UnitTable {
    pub fn new(units: Vec<Unit>) -> Self {
        Self { units }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn units_mut(&mut self) -> &mut [Unit] {
        &mut self.units
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Unit> {
        self.units.iter()
    }

    pub fn into_units(self) -> Vec<Unit> {
        self.units
    }

    pub fn outcomes(&self) -> Vec<f64> {
        self.units.iter().map(|u| u.outcome).collect()
    }

    /// True when at least one row carries an assignment.
    pub fn has_assignment(&self) -> bool {
        self.units.iter().any(|u| u.assignment.is_some())
    }

    /// Schema check: every row must be assigned. An unassigned table
    /// reports the missing column; a partially assigned one names the
    /// first unit without a value.
    pub fn require_assignment(&self) -> SimResult<()> {
        if !self.has_assignment() {
            return Err(SimError::missing_column("assignment"));
        }
        match self.units.iter().find(|u| u.assignment.is_none()) {
            Some(u) => Err(SimError::MissingValue {
                column: "assignment".into(),
                unit_id: u.unit_id.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Enforce the row invariants: unique ids, positive finite order
    /// value, finite outcome.
    pub fn validate(&self) -> SimResult<()> {
        let mut seen = HashSet::with_capacity(self.units.len());
        for u in &self.units {
            if !seen.insert(u.unit_id.as_str()) {
                return Err(SimError::invalid(format!("duplicate unit_id {}", u.unit_id)));
            }
            if !(u.avg_order_value > 0.0 && u.avg_order_value.is_finite()) {
                return Err(SimError::invalid(format!(
                    "unit {}: avg_order_value must be positive, got {}",
                    u.unit_id, u.avg_order_value
                )));
            }
            if !u.outcome.is_finite() {
                return Err(SimError::invalid(format!(
                    "unit {}: outcome is not finite",
                    u.unit_id
                )));
            }
        }
        Ok(())
    }
}

impl FromIterator<Unit> for UnitTable {
    fn from_iter<I: IntoIterator<Item = Unit>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a UnitTable {
    type Item = &'a Unit;
    type IntoIter = std::slice::Iter<'a, Unit>;

    fn into_iter(self) -> Self::IntoIter {
        self.units.iter()
    }
}
