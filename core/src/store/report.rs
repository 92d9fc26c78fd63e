use super::SimStore;
use crate::{error::SimResult, report::ExperimentReport};
use rusqlite::{params, OptionalExtension};

impl SimStore {
    // ── Experiment report ─────────────────────────────────────────

    pub fn save_report(
        &self,
        run_id: &str,
        source_run: Option<&str>,
        report: &ExperimentReport,
    ) -> SimResult<()> {
        let json = serde_json::to_string(report)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO experiment_report (run_id, source_run, report_json)
             VALUES (?1, ?2, ?3)",
            params![run_id, source_run, json],
        )?;
        Ok(())
    }

    pub fn load_report(&self, run_id: &str) -> SimResult<Option<ExperimentReport>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT report_json FROM experiment_report WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(j) => Ok(Some(serde_json::from_str(&j)?)),
            None => Ok(None),
        }
    }
}
