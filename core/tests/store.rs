//! SQLite persistence tests. All run against an in-memory database.

mod common;

use common::table;
use rusqlite::{Connection, OpenFlags};
use upliftsim_core::{
    config::TreatmentParams,
    error::SimError,
    experiment::ExperimentSimulator,
    population,
    report::ExperimentReport,
    store::SimStore,
    types::{
        Assignment::{Control, Treatment},
        Stage,
    },
};

fn store() -> SimStore {
    let store = SimStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

#[test]
fn population_round_trips_in_row_order() {
    let store = store();
    let t = population::generate(250, 12).unwrap();
    store.insert_run("pop-1", "population", 12, "0.1.0-test").unwrap();
    store.insert_units("pop-1", Stage::Population, &t).unwrap();

    assert_eq!(store.unit_count("pop-1", Stage::Population).unwrap(), 250);
    let loaded = store.load_units("pop-1", Stage::Population).unwrap();
    assert_eq!(loaded, t);

    let run = store.run("pop-1").unwrap().expect("run exists");
    assert_eq!(run.kind, "population");
    assert_eq!(run.seed, "0xc");
}

#[test]
fn experiment_stages_are_stored_separately() {
    let store = store();
    let population = population::generate(400, 21).unwrap();
    let out = ExperimentSimulator::new(22)
        .run(&population, 150, &TreatmentParams::default())
        .unwrap();

    store.insert_run("exp-1", "experiment", 22, "0.1.0-test").unwrap();
    store.insert_units("exp-1", Stage::Assigned, &out.assigned).unwrap();
    store.insert_units("exp-1", Stage::Treated, &out.treated).unwrap();

    assert_eq!(store.load_units("exp-1", Stage::Assigned).unwrap(), out.assigned);
    assert_eq!(store.load_units("exp-1", Stage::Treated).unwrap(), out.treated);
    assert_eq!(store.runs().unwrap().len(), 1);
}

#[test]
fn loading_an_unknown_stage_fails() {
    let store = store();
    let err = store.load_units("nope", Stage::Population).unwrap_err();
    assert!(matches!(err, SimError::RunNotFound { .. }), "got {err:?}");
}

#[test]
fn report_round_trips_as_json() {
    let store = store();
    let population = population::generate(300, 2).unwrap();
    let out = ExperimentSimulator::new(3)
        .run(&population, 200, &TreatmentParams::default())
        .unwrap();
    let report = ExperimentReport::from_tables(&out.assigned, &out.treated).unwrap();

    store.insert_run("exp-2", "experiment", 3, "0.1.0-test").unwrap();
    store.save_report("exp-2", Some("pop-x"), &report).unwrap();
    assert_eq!(store.load_report("exp-2").unwrap(), Some(report));
    assert_eq!(store.load_report("missing").unwrap(), None);
}

// ── Foreign tables ────────────────────────────────────────────────

/// A store plus a second connection to the same shared in-memory
/// database, used to create tables the store did not write itself.
fn shared_store(name: &str) -> (SimStore, Connection) {
    let uri = format!("file:{name}?mode=memory&cache=shared");
    let store = SimStore::open(&uri).expect("shared store");
    store.migrate().expect("migration");
    let conn = Connection::open_with_flags(
        &uri,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_URI,
    )
    .expect("second connection");
    (store, conn)
}

fn seed_foreign_table(conn: &Connection, ddl: &str, rows: &str) {
    conn.execute_batch(ddl).expect("create foreign table");
    conn.execute_batch(rows).expect("insert foreign rows");
}

#[test]
fn import_accepts_minimal_schema_and_mints_ids() {
    let (store, conn) = shared_store("import_minimal");
    seed_foreign_table(
        &conn,
        "CREATE TABLE experiment_data (
            avg_order_value REAL, days_since_last_activity INTEGER, tenure_days INTEGER,
            loyalty_flag INTEGER, outcome REAL, extra TEXT)",
        "INSERT INTO experiment_data VALUES
            (88.5, 3, 40, 0, 120.25, 'x'),
            (140.0, 0, 2, 1, 180.0, 'y')",
    );

    let t = store.import_table("experiment_data").unwrap();
    assert_eq!(t.len(), 2);
    assert_ne!(t.units()[0].unit_id, t.units()[1].unit_id);
    assert!(t.units()[1].loyalty_flag);
    assert!(t.iter().all(|u| u.assignment.is_none()));
}

#[test]
fn import_keeps_ids_and_assignment_when_present() {
    let (store, conn) = shared_store("import_keeps");
    seed_foreign_table(
        &conn,
        "CREATE TABLE assigned (
            unit_id TEXT, display_name TEXT, avg_order_value REAL,
            days_since_last_activity INTEGER, tenure_days INTEGER,
            loyalty_flag INTEGER, outcome REAL, assignment INTEGER)",
        "INSERT INTO assigned VALUES ('u1', 'Ada Quinn', 90.0, 1, 10, 0, 100.0, 1)",
    );
    let t = store.import_table("assigned").unwrap();
    let expected = {
        let mut e = table(&[("u1", 100.0, Some(Treatment))]);
        let u = &mut e.units_mut()[0];
        u.display_name = "Ada Quinn".into();
        u.days_since_last_activity = 1;
        u.tenure_days = 10;
        e
    };
    assert_eq!(t, expected);
}

#[test]
fn import_without_outcome_is_a_schema_error() {
    let (store, conn) = shared_store("import_no_outcome");
    seed_foreign_table(
        &conn,
        "CREATE TABLE broken (
            avg_order_value REAL, days_since_last_activity INTEGER,
            tenure_days INTEGER, loyalty_flag INTEGER)",
        "INSERT INTO broken VALUES (90.0, 1, 10, 0)",
    );
    let err = store.import_table("broken").unwrap_err();
    assert!(matches!(err, SimError::MissingColumn { ref column } if column == "outcome"), "got {err:?}");
}

#[test]
fn import_rejects_invalid_values_and_names() {
    let (store, conn) = shared_store("import_invalid");
    seed_foreign_table(
        &conn,
        "CREATE TABLE bad_flag (
            avg_order_value REAL, days_since_last_activity INTEGER, tenure_days INTEGER,
            loyalty_flag INTEGER, outcome REAL)",
        "INSERT INTO bad_flag VALUES (90.0, 1, 10, 2, 100.0)",
    );
    assert!(matches!(store.import_table("bad_flag"), Err(SimError::InvalidArgument(_))));
    assert!(matches!(store.import_table("x; DROP TABLE run"), Err(SimError::InvalidArgument(_))));
    assert!(matches!(store.import_table("does_not_exist"), Err(SimError::InvalidArgument(_))));
}

#[test]
fn import_reads_real_flags_and_reports_bad_cells_by_column() {
    let (store, conn) = shared_store("import_typed");
    let ddl = |name: &str| {
        format!(
            "CREATE TABLE {name} (
                avg_order_value REAL, days_since_last_activity REAL, tenure_days REAL,
                loyalty_flag REAL, outcome REAL, assignment REAL)"
        )
    };
    seed_foreign_table(
        &conn,
        &ddl("real_flags"),
        "INSERT INTO real_flags VALUES (90.0, 2.0, 12.0, 1.0, 100.0, 0.0)",
    );
    let t = store.import_table("real_flags").unwrap();
    let u = &t.units()[0];
    assert!(u.loyalty_flag);
    assert_eq!((u.days_since_last_activity, u.tenure_days), (2, 12));
    assert_eq!(u.assignment, Some(Control));

    seed_foreign_table(
        &conn,
        &ddl("null_outcome"),
        "INSERT INTO null_outcome VALUES (90.0, 2, 12, 0, NULL, NULL)",
    );
    let err = store.import_table("null_outcome").unwrap_err();
    assert!(matches!(err, SimError::MissingValue { ref column, .. } if column == "outcome"), "got {err:?}");

    seed_foreign_table(
        &conn,
        &ddl("text_flag"),
        "INSERT INTO text_flag VALUES (90.0, 2, 12, 'yes', 100.0, NULL)",
    );
    let err = store.import_table("text_flag").unwrap_err();
    assert!(
        matches!(err, SimError::InvalidArgument(ref msg) if msg.contains("loyalty_flag")),
        "got {err:?}"
    );
}
