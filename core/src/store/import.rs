use super::{unit::decode_assignment, SimStore};
use crate::{
    error::{SimError, SimResult},
    table::{Unit, UnitTable, REQUIRED_COLUMNS},
};
use rusqlite::{params, types::Value};

const OPTIONAL_COLUMNS: [&str; 3] = ["unit_id", "display_name", "assignment"];

impl SimStore {
    // ── Foreign tables ────────────────────────────────────────────

    /// Column names of any table in the database, in declaration order.
    pub fn table_columns(&self, table: &str) -> SimResult<Vec<String>> {
        Self::check_identifier(table)?;
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
        let cols = stmt
            .query_map(params![table], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        if cols.is_empty() {
            return Err(SimError::invalid(format!("no such table: {table}")));
        }
        Ok(cols)
    }

    /// Import a unit table from any SQLite table carrying at least the
    /// required columns. Missing ids are minted as UUID v4, missing names
    /// are left empty, a missing `assignment` column leaves units unassigned.
    pub fn import_table(&self, table: &str) -> SimResult<UnitTable> {
        let columns = self.table_columns(table)?;
        let has = |c: &str| columns.iter().any(|col| col == c);

        if let Some(missing) = REQUIRED_COLUMNS.iter().find(|c| !has(**c)) {
            return Err(SimError::missing_column(*missing));
        }

        let select: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .chain(OPTIONAL_COLUMNS.iter())
            .map(|c| if has(*c) { format!("\"{c}\"") } else { format!("NULL AS \"{c}\"") })
            .collect();
        let sql = format!("SELECT {} FROM \"{table}\"", select.join(", "));

        let mut stmt = self.conn.prepare(&sql)?;
        let width = REQUIRED_COLUMNS.len() + OPTIONAL_COLUMNS.len();
        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<Result<Vec<_>, _>>()
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let units = rows
            .into_iter()
            .enumerate()
            .map(|(i, values)| RawRow::new(values).into_unit(i))
            .collect::<SimResult<Vec<_>>>()?;
        let table_out = UnitTable::new(units);
        table_out.validate()?;
        log::info!("store: imported {} units from table {table}", table_out.len());
        Ok(table_out)
    }
}

/// One foreign row as SQLite stored it, in `REQUIRED_COLUMNS` then
/// `OPTIONAL_COLUMNS` order.
struct RawRow {
    values: Vec<Value>,
}

impl RawRow {
    fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    fn take(&mut self, index: usize) -> Value {
        std::mem::replace(&mut self.values[index], Value::Null)
    }

    fn into_unit(mut self, row: usize) -> SimResult<Unit> {
        let unit_id = match self.take(5) {
            Value::Null => uuid::Uuid::new_v4().to_string(),
            Value::Text(id) => id,
            Value::Integer(id) => id.to_string(),
            other => return Err(bad_type("unit_id", &format!("row {row}"), &other)),
        };
        let display_name = match self.take(6) {
            Value::Null => String::new(),
            Value::Text(name) => name,
            other => return Err(bad_type("display_name", &unit_id, &other)),
        };

        let avg_order_value = real(self.take(0), "avg_order_value", &unit_id)?;
        let days_since_last_activity = whole_days(self.take(1), "days_since_last_activity", &unit_id)?;
        let tenure_days = whole_days(self.take(2), "tenure_days", &unit_id)?;
        let loyalty_flag = match real(self.take(3), "loyalty_flag", &unit_id)? {
            v if v == 0.0 => false,
            v if v == 1.0 => true,
            other => {
                return Err(SimError::invalid(format!(
                    "unit {unit_id}: loyalty_flag must be 0 or 1, got {other}"
                )))
            }
        };
        let outcome = real(self.take(4), "outcome", &unit_id)?;
        let assignment = match self.take(7) {
            Value::Null => None,
            Value::Integer(v) => Some(decode_assignment(v, &unit_id)?),
            Value::Real(v) if v == 0.0 || v == 1.0 => Some(decode_assignment(v as i64, &unit_id)?),
            other => return Err(bad_type("assignment", &unit_id, &other)),
        };

        Ok(Unit {
            display_name,
            avg_order_value,
            days_since_last_activity,
            tenure_days,
            loyalty_flag,
            outcome,
            assignment,
            unit_id,
        })
    }
}

/// A required numeric cell. NULL is a missing value, anything non-numeric
/// is an invalid argument naming the column.
fn real(value: Value, column: &str, unit_id: &str) -> SimResult<f64> {
    match value {
        Value::Integer(v) => Ok(v as f64),
        Value::Real(v) if v.is_finite() => Ok(v),
        Value::Null => Err(SimError::MissingValue {
            column: column.to_string(),
            unit_id: unit_id.to_string(),
        }),
        other => Err(bad_type(column, unit_id, &other)),
    }
}

fn bad_type(column: &str, unit_id: &str, value: &Value) -> SimError {
    SimError::invalid(format!("unit {unit_id}: column {column} has unusable value {value:?}"))
}

fn whole_days(value: Value, column: &str, unit_id: &str) -> SimResult<u32> {
    let v = real(value, column, unit_id)?;
    if v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 {
        Ok(v as u32)
    } else {
        Err(SimError::invalid(format!(
            "unit {unit_id}: {column} must be a non-negative whole number, got {v}"
        )))
    }
}
