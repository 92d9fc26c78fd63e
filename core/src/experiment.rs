//! Experiment simulator: sample → assign → treat.
//!
//! RULE: one simulator owns one stream. The stream is consumed in call
//! order, so a fixed seed reproduces the whole pipeline only if the calls
//! happen in the same order (sample, then assign). `apply_treatment` draws
//! nothing.

use crate::{
    config::{ExperimentConfig, TreatmentParams},
    error::{SimError, SimResult},
    rng::{RngBank, SimRng, StreamSlot},
    table::UnitTable,
    treatment,
    types::{Assignment, Seed},
};

/// Probability a unit lands in the treatment arm.
pub const TREATMENT_PROBABILITY: f64 = 0.5;

pub struct ExperimentSimulator {
    rng: SimRng,
}

/// Both views an experiment produces: the untouched assigned sample and
/// the same rows after treatment.
#[derive(Debug, Clone)]
pub struct ExperimentOutcome {
    pub assigned: UnitTable,
    pub treated: UnitTable,
}

impl ExperimentSimulator {
    pub fn new(seed: Seed) -> Self {
        Self {
            rng: RngBank::new(seed).stream(StreamSlot::Experiment),
        }
    }

    /// Draw `sample_size` distinct rows without replacement. Rows come back
    /// in draw order.
    pub fn sample(&mut self, table: &UnitTable, sample_size: usize) -> SimResult<UnitTable> {
        if sample_size == 0 {
            return Err(SimError::invalid("sample size must be positive"));
        }
        if sample_size > table.len() {
            return Err(SimError::invalid(format!(
                "cannot take a sample of {sample_size} rows from a table of {}",
                table.len()
            )));
        }
        let picked = rand::seq::index::sample(&mut self.rng, table.len(), sample_size);
        let units = table.units();
        let sample: UnitTable = picked.iter().map(|i| units[i].clone()).collect();
        log::debug!("experiment: sampled {sample_size} of {} units", table.len());
        Ok(sample)
    }

    /// Set `assignment` on every row from an independent Bernoulli(0.5).
    /// Overwrites any previous assignment. Mutates in place.
    pub fn assign<'t>(&mut self, table: &'t mut UnitTable) -> SimResult<&'t mut UnitTable> {
        if table.is_empty() {
            return Err(SimError::invalid("cannot assign an empty table"));
        }
        let mut treated = 0usize;
        for unit in table.units_mut() {
            let arm = if self.rng.chance(TREATMENT_PROBABILITY)? {
                treated += 1;
                Assignment::Treatment
            } else {
                Assignment::Control
            };
            unit.assignment = Some(arm);
        }
        log::debug!(
            "experiment: assigned {treated} treatment / {} control",
            table.len() - treated
        );
        Ok(table)
    }

    /// Multiply the outcome of every treated row by `1 + lift(outcome)`.
    /// All checks run before the first row is touched, so a failed call
    /// leaves the table as it was.
    pub fn apply_treatment(&self, table: &mut UnitTable, params: &TreatmentParams) -> SimResult<()> {
        params.validate()?;
        table.require_assignment()?;

        let mut treated = 0usize;
        for unit in table.units_mut().iter_mut().filter(|u| u.is_treated()) {
            unit.outcome = treatment::treated_outcome(unit.outcome, params);
            treated += 1;
        }
        log::debug!("experiment: applied treatment to {treated} units");
        Ok(())
    }

    /// Full pipeline over a population. The population itself is not modified.
    pub fn run(
        &mut self,
        population: &UnitTable,
        sample_size: usize,
        params: &TreatmentParams,
    ) -> SimResult<ExperimentOutcome> {
        params.validate()?;
        let mut assigned = self.sample(population, sample_size)?;
        self.assign(&mut assigned)?;
        let mut treated = assigned.clone();
        self.apply_treatment(&mut treated, params)?;
        log::info!(
            "experiment: ran on {sample_size} of {} units (threshold={}, rate={}, effect={})",
            population.len(),
            params.effect_decay_threshold,
            params.effect_decay_rate,
            params.treatment_effect
        );
        Ok(ExperimentOutcome { assigned, treated })
    }
}

/// Build a simulator from config and run it.
pub fn run_experiment(population: &UnitTable, config: &ExperimentConfig) -> SimResult<ExperimentOutcome> {
    ExperimentSimulator::new(config.seed).run(population, config.sample_size, &config.treatment)
}
