//! Decaying treatment effect.
//!
//! Below the threshold every treated unit gets the full `treatment_effect`.
//! From the threshold on, the effect shrinks by `exp(-rate * (x - threshold))`.
//! `decay(threshold) == 1`, so the lift is continuous at the threshold.
//!
//! The same `lift` function is used to treat units and to draw the
//! theoretical curve, so realized lift must match it to float precision.

use crate::{
    config::TreatmentParams,
    error::{SimError, SimResult},
    table::UnitTable,
};
use serde::Serialize;

/// Number of points `theoretical_curve` is usually sampled at.
pub const CURVE_POINTS: usize = 500;

pub fn decay(x: f64, params: &TreatmentParams) -> f64 {
    (-params.effect_decay_rate * (x - params.effect_decay_threshold)).exp()
}

/// Fractional lift applied to a treated unit whose baseline outcome is `x`.
pub fn lift(x: f64, params: &TreatmentParams) -> f64 {
    if x >= params.effect_decay_threshold {
        params.treatment_effect * decay(x, params)
    } else {
        params.treatment_effect
    }
}

/// Outcome of a treated unit.
pub fn treated_outcome(x: f64, params: &TreatmentParams) -> f64 {
    x * (1.0 + lift(x, params))
}

/// `points` evenly spaced (x, lift(x)) pairs over [min, max], both ends included.
pub fn theoretical_curve(
    params: &TreatmentParams,
    min: f64,
    max: f64,
    points: usize,
) -> SimResult<Vec<(f64, f64)>> {
    if points < 2 {
        return Err(SimError::invalid(format!("curve needs at least 2 points, got {points}")));
    }
    if !(min.is_finite() && max.is_finite() && min <= max) {
        return Err(SimError::invalid(format!("invalid curve range [{min}, {max}]")));
    }
    let step = (max - min) / (points - 1) as f64;
    Ok((0..points)
        .map(|i| {
            let x = if i == points - 1 { max } else { min + step * i as f64 };
            (x, lift(x, params))
        })
        .collect())
}

#[derive(Debug, Clone, Serialize)]
pub struct LiftObservation {
    pub unit_id: String,
    pub outcome_before: f64,
    pub applied_lift: f64,
    pub theoretical_lift: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LiftVerification {
    pub observations: Vec<LiftObservation>,
    pub max_abs_error: f64,
    pub mean_applied_lift: Option<f64>,
    pub tolerance: f64,
}

impl LiftVerification {
    pub fn passed(&self) -> bool {
        self.max_abs_error <= self.tolerance
    }
}

/// Compare realized lift (`post / pre - 1`) of every treated row with the
/// closed-form `lift`. `assigned` is the untouched pre-treatment copy;
/// both tables must hold the same units in the same order.
pub fn verify_lift(
    assigned: &UnitTable,
    treated: &UnitTable,
    params: &TreatmentParams,
    tolerance: f64,
) -> SimResult<LiftVerification> {
    assigned.require_assignment()?;
    treated.require_assignment()?;
    if assigned.len() != treated.len() {
        return Err(SimError::invalid(format!(
            "pre-treatment table has {} rows, post-treatment table has {}",
            assigned.len(),
            treated.len()
        )));
    }

    let mut observations = Vec::new();
    let mut max_abs_error = 0.0f64;
    for (pre, post) in assigned.iter().zip(treated.iter()) {
        if pre.unit_id != post.unit_id {
            return Err(SimError::invalid(format!(
                "tables are not aligned: {} vs {}",
                pre.unit_id, post.unit_id
            )));
        }
        if !pre.is_treated() {
            continue;
        }
        if pre.outcome == 0.0 {
            return Err(SimError::invalid(format!(
                "unit {}: zero baseline outcome has no defined lift",
                pre.unit_id
            )));
        }
        let applied_lift = post.outcome / pre.outcome - 1.0;
        let theoretical_lift = lift(pre.outcome, params);
        max_abs_error = max_abs_error.max((applied_lift - theoretical_lift).abs());
        observations.push(LiftObservation {
            unit_id: pre.unit_id.clone(),
            outcome_before: pre.outcome,
            applied_lift,
            theoretical_lift,
        });
    }

    let mean_applied_lift = if observations.is_empty() {
        None
    } else {
        Some(observations.iter().map(|o| o.applied_lift).sum::<f64>() / observations.len() as f64)
    };
    log::debug!(
        "treatment: verified {} treated rows, max |applied - theoretical| = {max_abs_error:e}",
        observations.len()
    );

    Ok(LiftVerification {
        observations,
        max_abs_error,
        mean_applied_lift,
        tolerance,
    })
}
