use super::SimStore;
use crate::{
    error::{SimError, SimResult},
    table::{Unit, UnitTable},
    types::{Assignment, Stage},
};
use rusqlite::params;

impl SimStore {
    // ── Units ─────────────────────────────────────────────────────

    /// Persist a whole table under (run_id, stage) in one transaction.
    pub fn insert_units(&self, run_id: &str, stage: Stage, table: &UnitTable) -> SimResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO unit (
                    run_id, stage, row_index, unit_id, display_name, avg_order_value,
                    days_since_last_activity, tenure_days, loyalty_flag, outcome, assignment
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for (i, u) in table.iter().enumerate() {
                stmt.execute(params![
                    run_id,
                    stage.name(),
                    i as i64,
                    &u.unit_id,
                    &u.display_name,
                    u.avg_order_value,
                    u.days_since_last_activity as i64,
                    u.tenure_days as i64,
                    if u.loyalty_flag { 1 } else { 0 },
                    u.outcome,
                    u.assignment.map(|a| a.as_u8() as i64),
                ])?;
            }
        }
        tx.commit()?;
        log::debug!("store: wrote {} units for run={run_id} stage={}", table.len(), stage.name());
        Ok(())
    }

    /// Load a stored table in its original row order.
    pub fn load_units(&self, run_id: &str, stage: Stage) -> SimResult<UnitTable> {
        let mut stmt = self.conn.prepare(
            "SELECT unit_id, display_name, avg_order_value, days_since_last_activity,
                    tenure_days, loyalty_flag, outcome, assignment
             FROM unit WHERE run_id = ?1 AND stage = ?2
             ORDER BY row_index ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id, stage.name()], |row| {
                Ok((
                    Unit {
                        unit_id: row.get(0)?,
                        display_name: row.get(1)?,
                        avg_order_value: row.get(2)?,
                        days_since_last_activity: row.get::<_, i64>(3)? as u32,
                        tenure_days: row.get::<_, i64>(4)? as u32,
                        loyalty_flag: row.get::<_, i64>(5)? != 0,
                        outcome: row.get(6)?,
                        assignment: None,
                    },
                    row.get::<_, Option<i64>>(7)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if rows.is_empty() {
            return Err(SimError::RunNotFound {
                run_id: run_id.to_string(),
                stage: stage.name().to_string(),
            });
        }

        let units = rows
            .into_iter()
            .map(|(mut unit, raw)| {
                unit.assignment = raw.map(|v| decode_assignment(v, &unit.unit_id)).transpose()?;
                Ok(unit)
            })
            .collect::<SimResult<Vec<_>>>()?;
        let table = UnitTable::new(units);
        table.validate()?;
        Ok(table)
    }

    pub fn unit_count(&self, run_id: &str, stage: Stage) -> SimResult<i64> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM unit WHERE run_id = ?1 AND stage = ?2",
            params![run_id, stage.name()],
            |row| row.get(0),
        )?;
        Ok(n)
    }
}

pub(super) fn decode_assignment(v: i64, unit_id: &str) -> SimResult<Assignment> {
    u8::try_from(v)
        .map_err(|e| e.to_string())
        .and_then(Assignment::try_from)
        .map_err(|e| SimError::invalid(format!("unit {unit_id}: {e}")))
}
