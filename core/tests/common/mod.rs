//! Shared fixtures for integration tests.
#![allow(dead_code)]

use upliftsim_core::{
    table::{Unit, UnitTable},
    types::Assignment,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A unit with fixed covariates and the given outcome / arm.
pub fn unit(id: &str, outcome: f64, assignment: Option<Assignment>) -> Unit {
    Unit {
        unit_id: id.into(),
        display_name: format!("Test {id}"),
        avg_order_value: 90.0,
        days_since_last_activity: 10,
        tenure_days: 30,
        loyalty_flag: false,
        outcome,
        assignment,
    }
}

pub fn table(rows: &[(&str, f64, Option<Assignment>)]) -> UnitTable {
    rows.iter().map(|(id, y, a)| unit(id, *y, *a)).collect()
}
