//! Baseline population generation tests.

mod common;

use std::collections::HashSet;
use upliftsim_core::{error::SimError, population, types::round2};

#[test]
fn generates_exactly_n_units_with_valid_support() {
    common::init_logging();
    for &(n, seed) in &[(1usize, 1u128), (50, 7), (2000, 0xF8B4_1CFE)] {
        let table = population::generate(n, seed).unwrap();
        assert_eq!(table.len(), n);

        let ids: HashSet<_> = table.iter().map(|u| u.unit_id.as_str()).collect();
        assert_eq!(ids.len(), n, "unit_id values must be unique");

        for u in &table {
            assert!(u.avg_order_value > 0.0, "aov must be positive: {}", u.avg_order_value);
            assert!(u.outcome.is_finite());
            assert!(u.assignment.is_none(), "fresh population must be unassigned");
            assert!(!u.display_name.is_empty());
        }
    }
}

#[test]
fn zero_units_is_invalid() {
    let err = population::generate(0, 42).unwrap_err();
    assert!(matches!(err, SimError::InvalidArgument(_)), "got {err:?}");
}

#[test]
fn stored_values_are_rounded_to_cents() {
    let table = population::generate(300, 11).unwrap();
    for u in &table {
        assert_eq!(u.outcome, round2(u.outcome));
        assert_eq!(u.avg_order_value, round2(u.avg_order_value));
    }
}

#[test]
fn covariate_distributions_have_expected_shape() {
    let table = population::generate(20_000, 0xC0FFEE).unwrap();
    let n = table.len() as f64;

    // Log-normal with median 90.
    let mut aov: Vec<f64> = table.iter().map(|u| u.avg_order_value).collect();
    aov.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let median = aov[aov.len() / 2];
    assert!((median - 90.0).abs() < 3.0, "aov median {median:.2} far from 90");

    // floor(Exp(15)) has mean just under 15.
    let days_mean = table.iter().map(|u| u.days_since_last_activity as f64).sum::<f64>() / n;
    assert!((13.5..15.5).contains(&days_mean), "days mean {days_mean:.2}");

    // Loyalty probability lives in (0.02, 0.08).
    let loyal = table.iter().filter(|u| u.loyalty_flag).count() as f64 / n;
    assert!((0.02..0.08).contains(&loyal), "loyalty share {loyal:.4}");
}

#[test]
fn loyal_units_have_higher_outcomes_on_average() {
    let table = population::generate(20_000, 5).unwrap();
    let mean = |loyal: bool| {
        let xs: Vec<f64> = table
            .iter()
            .filter(|u| u.loyalty_flag == loyal)
            .map(|u| u.outcome)
            .collect();
        xs.iter().sum::<f64>() / xs.len() as f64
    };
    // Loyalty adds 5 + 10*sqrt(aov) + 10*ln(1+days) before halving: ~ +60.
    let gap = mean(true) - mean(false);
    assert!(gap > 30.0, "loyalty gap {gap:.2} too small");
}
