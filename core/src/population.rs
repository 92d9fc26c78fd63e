//! Baseline population generator.
//!
//! DRAW ORDER (fixed, one seeded stream, whole column at a time):
//!   1. avg_order_value          ~ LogNormal(ln 90, 0.4)
//!   2. days_since_last_activity ~ floor(Exponential(scale 15))
//!   3. tenure_days              ~ round(LogNormal(ln 30, 1))
//!   4. loyalty_flag             ~ Bernoulli(loyalty_probability(tenure))
//!   5. noise                    ~ Normal(0, 25)
//!
//! Reordering these steps changes every generated dataset for a seed.

use crate::{
    config::PopulationConfig,
    error::{SimError, SimResult},
    name_generator::NameGenerator,
    rng::{RngBank, StreamSlot},
    table::{Unit, UnitTable},
    types::{round2, Seed},
};

// ── Covariate distributions ────────────────────────────────────────

pub const AOV_MEDIAN: f64 = 90.0;
pub const AOV_SIGMA: f64 = 0.4;
pub const DAYS_SINCE_LAST_SCALE: f64 = 15.0;
pub const TENURE_MEDIAN: f64 = 30.0;
pub const TENURE_SIGMA: f64 = 1.0;

pub const LOYALTY_BASE_PROB: f64 = 0.02;
pub const LOYALTY_TENURE_UPLIFT: f64 = 0.06;
pub const LOYALTY_TENURE_SCALE: f64 = 25.0;

pub const NOISE_SD: f64 = 25.0;

// ── Structural equation (ground truth, not tunable) ────────────────

pub const ALPHA: f64 = 10.0;
pub const BETA_AOV: f64 = 35.0;
pub const BETA_LOYALTY: f64 = 5.0;
pub const BETA_AOV_LOYALTY: f64 = 10.0;
pub const BETA_TENURE: f64 = 4.0;
pub const BETA_DAYS_SINCE_LAST: f64 = 20.0;
pub const BETA_DAYS_SINCE_LAST_LOYALTY: f64 = 10.0;
pub const OUTCOME_DIVISOR: f64 = 2.0;

/// Probability of loyalty membership: 0.02 for brand-new customers,
/// saturating towards 0.08 as tenure grows.
pub fn loyalty_probability(tenure_days: f64) -> f64 {
    LOYALTY_BASE_PROB + (1.0 - (-tenure_days / LOYALTY_TENURE_SCALE).exp()) * LOYALTY_TENURE_UPLIFT
}

/// Baseline outcome for one unit, before rounding.
pub fn structural_outcome(
    avg_order_value: f64,
    days_since_last_activity: f64,
    tenure_days: f64,
    loyalty: f64,
    noise: f64,
) -> f64 {
    (ALPHA
        + BETA_AOV * avg_order_value.ln_1p()
        + BETA_LOYALTY * loyalty
        + BETA_AOV_LOYALTY * loyalty * avg_order_value.sqrt()
        + BETA_TENURE * tenure_days.ln_1p()
        + BETA_DAYS_SINCE_LAST * days_since_last_activity.ln_1p()
        + BETA_DAYS_SINCE_LAST_LOYALTY * loyalty * days_since_last_activity.ln_1p()
        + noise)
        / OUTCOME_DIVISOR
}

/// Generate `n` units. Deterministic in (n, seed) for every column except
/// `unit_id`, which is a fresh UUID v4 per unit.
pub fn generate(n: usize, seed: Seed) -> SimResult<UnitTable> {
    if n == 0 {
        return Err(SimError::invalid("population size must be positive"));
    }
    let bank = RngBank::new(seed);
    let mut rng = bank.stream(StreamSlot::Population);

    let aov = rng.lognormal(AOV_MEDIAN.ln(), AOV_SIGMA, n)?;
    let days_since_last: Vec<u32> = rng
        .exponential(DAYS_SINCE_LAST_SCALE, n)?
        .into_iter()
        .map(|d| d.floor() as u32)
        .collect();
    let tenure: Vec<u32> = rng
        .lognormal(TENURE_MEDIAN.ln(), TENURE_SIGMA, n)?
        .into_iter()
        .map(|t| t.round() as u32)
        .collect();

    let mut loyalty = Vec::with_capacity(n);
    for &t in &tenure {
        loyalty.push(rng.chance(loyalty_probability(t as f64))?);
    }

    let noise = rng.normal(0.0, NOISE_SD, n)?;

    let names = NameGenerator::names(&mut bank.stream(StreamSlot::Names), n);

    let units: Vec<Unit> = names
        .into_iter()
        .enumerate()
        .map(|(i, display_name)| {
            let l = if loyalty[i] { 1.0 } else { 0.0 };
            let outcome = structural_outcome(
                aov[i],
                days_since_last[i] as f64,
                tenure[i] as f64,
                l,
                noise[i],
            );
            Unit {
                unit_id: uuid::Uuid::new_v4().to_string(),
                display_name,
                avg_order_value: round2(aov[i]),
                days_since_last_activity: days_since_last[i],
                tenure_days: tenure[i],
                loyalty_flag: loyalty[i],
                outcome: round2(outcome),
                assignment: None,
            }
        })
        .collect();

    let loyal = units.iter().filter(|u| u.loyalty_flag).count();
    log::info!(
        "population: generated {n} units (seed={seed:#x}, loyalty members={loyal})"
    );
    Ok(UnitTable::new(units))
}

pub fn generate_with(config: &PopulationConfig) -> SimResult<UnitTable> {
    generate(config.size, config.seed)
}
