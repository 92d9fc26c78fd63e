//! Read-only diagnostics: group means and column summaries.
//! No inference happens here; these are descriptive numbers only.

use crate::{
    error::{SimError, SimResult},
    table::UnitTable,
    types::Assignment,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupMeans {
    pub control_count: usize,
    pub treatment_count: usize,
    /// `None` when the group has no units.
    pub control_mean: Option<f64>,
    pub treatment_mean: Option<f64>,
}

impl GroupMeans {
    pub fn of(table: &UnitTable) -> SimResult<Self> {
        table.require_assignment()?;
        let (mut c_sum, mut c_n, mut t_sum, mut t_n) = (0.0, 0usize, 0.0, 0usize);
        for u in table {
            match u.assignment {
                Some(Assignment::Treatment) => {
                    t_sum += u.outcome;
                    t_n += 1;
                }
                Some(Assignment::Control) => {
                    c_sum += u.outcome;
                    c_n += 1;
                }
                None => unreachable!("require_assignment checked every row"),
            }
        }
        if c_n == 0 || t_n == 0 {
            log::warn!("report: one arm is empty (control={c_n}, treatment={t_n})");
        }
        Ok(Self {
            control_count: c_n,
            treatment_count: t_n,
            control_mean: (c_n > 0).then(|| c_sum / c_n as f64),
            treatment_mean: (t_n > 0).then(|| t_sum / t_n as f64),
        })
    }

    /// Treatment mean minus control mean.
    pub fn difference(&self) -> Option<f64> {
        Some(self.treatment_mean? - self.control_mean?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub sample_size: usize,
    pub pre_treatment: GroupMeans,
    pub post_treatment: GroupMeans,
    pub observed_difference: Option<f64>,
    pub pre_treatment_difference: Option<f64>,
    /// Mean of `post / pre - 1` over treated rows.
    pub mean_applied_lift: Option<f64>,
}

impl ExperimentReport {
    /// Build from the pre-treatment (assigned) and post-treatment tables.
    /// They must contain the same units in the same order.
    pub fn from_tables(assigned: &UnitTable, treated: &UnitTable) -> SimResult<Self> {
        if assigned.len() != treated.len() {
            return Err(SimError::invalid(format!(
                "pre-treatment table has {} rows, post-treatment table has {}",
                assigned.len(),
                treated.len()
            )));
        }
        let pre_treatment = GroupMeans::of(assigned)?;
        let post_treatment = GroupMeans::of(treated)?;

        let mut lift_sum = 0.0;
        let mut lift_n = 0usize;
        for (pre, post) in assigned.iter().zip(treated.iter()) {
            if pre.unit_id != post.unit_id || pre.assignment != post.assignment {
                return Err(SimError::invalid(format!(
                    "tables are not aligned at unit {}",
                    pre.unit_id
                )));
            }
            if pre.is_treated() && pre.outcome != 0.0 {
                lift_sum += post.outcome / pre.outcome - 1.0;
                lift_n += 1;
            }
        }

        Ok(Self {
            sample_size: treated.len(),
            observed_difference: post_treatment.difference(),
            pre_treatment_difference: pre_treatment.difference(),
            pre_treatment,
            post_treatment,
            mean_applied_lift: (lift_n > 0).then(|| lift_sum / lift_n as f64),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl ColumnSummary {
    /// Sample standard deviation (n - 1), 0 for a single value.
    fn of(values: impl Iterator<Item = f64>) -> Option<Self> {
        let values: Vec<f64> = values.collect();
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = if values.len() > 1 {
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)
        } else {
            0.0
        };
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Self { mean, std: var.sqrt(), min, max })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationSummary {
    pub count: usize,
    pub avg_order_value: ColumnSummary,
    pub days_since_last_activity: ColumnSummary,
    pub tenure_days: ColumnSummary,
    pub outcome: ColumnSummary,
    pub loyalty_share: f64,
}

/// Column summaries of a table. Empty tables have nothing to describe.
pub fn describe(table: &UnitTable) -> SimResult<PopulationSummary> {
    let empty = || SimError::invalid("cannot describe an empty table");
    let units = table.units();
    Ok(PopulationSummary {
        count: units.len(),
        avg_order_value: ColumnSummary::of(units.iter().map(|u| u.avg_order_value)).ok_or_else(empty)?,
        days_since_last_activity: ColumnSummary::of(units.iter().map(|u| u.days_since_last_activity as f64))
            .ok_or_else(empty)?,
        tenure_days: ColumnSummary::of(units.iter().map(|u| u.tenure_days as f64)).ok_or_else(empty)?,
        outcome: ColumnSummary::of(units.iter().map(|u| u.outcome)).ok_or_else(empty)?,
        loyalty_share: units.iter().filter(|u| u.loyalty_flag).count() as f64 / units.len().max(1) as f64,
    })
}

/// Outcome distribution of each arm, split at the effect-decay threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeByGroup {
    pub threshold: f64,
    pub control: Option<ColumnSummary>,
    pub treatment: Option<ColumnSummary>,
    pub control_above_threshold: usize,
    pub treatment_above_threshold: usize,
}

/// Summarize `outcome` per assignment arm. An empty arm has no summary.
pub fn describe_outcome_by_group(table: &UnitTable, threshold: f64) -> SimResult<OutcomeByGroup> {
    table.require_assignment()?;
    let arm = |a: Assignment| table.iter().filter(move |u| u.assignment == Some(a)).map(|u| u.outcome);
    Ok(OutcomeByGroup {
        threshold,
        control: ColumnSummary::of(arm(Assignment::Control)),
        treatment: ColumnSummary::of(arm(Assignment::Treatment)),
        control_above_threshold: arm(Assignment::Control).filter(|y| *y >= threshold).count(),
        treatment_above_threshold: arm(Assignment::Treatment).filter(|y| *y >= threshold).count(),
    })
}
