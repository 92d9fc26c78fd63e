//! upliftsim-core: synthetic customer populations and randomized
//! experiments with a known, decaying treatment effect.
//!
//! PIPELINE (fixed order, one owned RNG stream per stage):
//!   1. population::generate       : baseline covariates + outcome
//!   2. ExperimentSimulator::sample: seeded draw without replacement
//!   3. ExperimentSimulator::assign: Bernoulli(0.5) treatment flag
//!   4. ExperimentSimulator::apply_treatment: decaying lift on outcome
//!   5. report / treatment::verify_lift: read-only diagnostics

pub mod config;
pub mod error;
pub mod experiment;
pub mod name_generator;
pub mod population;
pub mod report;
pub mod rng;
pub mod store;
pub mod table;
pub mod treatment;
pub mod types;
