//! uplift-runner: headless driver for population generation and
//! simulated experiments.
//!
//! Usage:
//!   uplift-runner generate   --size 2000 --seed 0xF8B4... --db uplift.db
//!   uplift-runner experiment --from-run pop-... --sample-size 5544 --db uplift.db
//!   uplift-runner experiment --from-table experiment_data --db uplift.db
//!   uplift-runner pipeline   --config sim.json --db uplift.db --json

use anyhow::{bail, Result};
use std::env;
use upliftsim_core::{
    config::{parse_seed, PopulationConfig, SimConfig, TreatmentParams},
    experiment::ExperimentSimulator,
    population,
    report::{describe, describe_outcome_by_group, ExperimentReport, OutcomeByGroup, PopulationSummary},
    store::SimStore,
    table::UnitTable,
    treatment::{verify_lift, LiftVerification},
    types::{Seed, Stage},
};

/// Realized and theoretical lift must agree to this absolute tolerance.
const LIFT_TOLERANCE: f64 = 1e-9;

#[derive(serde::Serialize)]
struct ExperimentSummary<'a> {
    run_id: &'a str,
    source: &'a str,
    treatment: TreatmentParams,
    report: &'a ExperimentReport,
    outcome_by_group: OutcomeByGroup,
    lift_max_abs_error: f64,
    lift_verified: bool,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mode = args
        .get(1)
        .filter(|a| !a.starts_with("--"))
        .map(String::as_str)
        .unwrap_or("pipeline");
    let json = args.iter().any(|a| a == "--json");
    let db = flag(&args, "--db").unwrap_or("uplift.db");

    let mut config = match flag(&args, "--config") {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    apply_overrides(&mut config, &args)?;

    let store = SimStore::open(db)?;
    store.migrate()?;

    if !json {
        println!("upliftsim: uplift-runner");
        println!("  mode:      {mode}");
        println!("  db:        {db}");
        println!();
    }

    match mode {
        "generate" => {
            let (run_id, table) = generate(&store, &config.population, "population")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&describe(&table)?)?);
            } else {
                print_population(&run_id, &describe(&table)?);
            }
        }
        "experiment" => {
            let (source, population) = load_population(&store, &args)?;
            run_experiment(&store, &config, &source, &population, json)?;
        }
        "pipeline" => {
            let (pre_run, pre) = generate(&store, &config.population, "pre-period")?;
            if !json {
                print_population(&pre_run, &describe(&pre)?);
            }
            let (pool_run, pool) = generate(&store, &config.experiment_pool, "experiment pool")?;
            run_experiment(&store, &config, &pool_run, &pool, json)?;
        }
        other => bail!("unknown mode {other:?} (expected generate | experiment | pipeline)"),
    }
    Ok(())
}

fn generate(store: &SimStore, cfg: &PopulationConfig, label: &str) -> Result<(String, UnitTable)> {
    let table = population::generate_with(cfg)?;
    let run_id = format!("pop-{:x}-{}", cfg.seed, run_stamp());
    store.insert_run(&run_id, "population", cfg.seed, env!("CARGO_PKG_VERSION"))?;
    store.insert_units(&run_id, Stage::Population, &table)?;
    log::info!("{label}: stored {} units as run {run_id}", table.len());
    Ok((run_id, table))
}

fn load_population(store: &SimStore, args: &[String]) -> Result<(String, UnitTable)> {
    if let Some(run_id) = flag(args, "--from-run") {
        return Ok((run_id.to_string(), store.load_units(run_id, Stage::Population)?));
    }
    if let Some(table) = flag(args, "--from-table") {
        return Ok((format!("table:{table}"), store.import_table(table)?));
    }
    bail!("experiment mode needs --from-run <run_id> or --from-table <name>")
}

fn run_experiment(
    store: &SimStore,
    config: &SimConfig,
    source: &str,
    population: &UnitTable,
    json: bool,
) -> Result<()> {
    let exp = &config.experiment;
    let mut sim = ExperimentSimulator::new(exp.seed);
    let outcome = sim.run(population, exp.sample_size, &exp.treatment)?;
    let report = ExperimentReport::from_tables(&outcome.assigned, &outcome.treated)?;
    let by_group = describe_outcome_by_group(&outcome.treated, exp.treatment.effect_decay_threshold)?;
    let verification = verify_lift(&outcome.assigned, &outcome.treated, &exp.treatment, LIFT_TOLERANCE)?;
    if !verification.passed() {
        log::warn!(
            "applied lift deviates from the theoretical curve by {:e}",
            verification.max_abs_error
        );
    }

    let run_id = format!("exp-{:x}-{}", exp.seed, run_stamp());
    store.insert_run(&run_id, "experiment", exp.seed, env!("CARGO_PKG_VERSION"))?;
    store.insert_units(&run_id, Stage::Assigned, &outcome.assigned)?;
    store.insert_units(&run_id, Stage::Treated, &outcome.treated)?;
    store.save_report(&run_id, Some(source), &report)?;

    if json {
        let summary = ExperimentSummary {
            run_id: &run_id,
            source,
            treatment: exp.treatment,
            report: &report,
            outcome_by_group: by_group,
            lift_max_abs_error: verification.max_abs_error,
            lift_verified: verification.passed(),
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_experiment(&run_id, source, &report, &verification);
        print_outcome_by_group(&by_group);
    }
    Ok(())
}

fn print_population(run_id: &str, s: &PopulationSummary) {
    println!("=== POPULATION {run_id} ===");
    println!("  units:            {}", s.count);
    println!("  loyalty share:    {:.2}%", 100.0 * s.loyalty_share);
    println!("  {:<26}{:>10}{:>10}{:>10}{:>10}", "column", "mean", "std", "min", "max");
    for (name, c) in [
        ("avg_order_value", &s.avg_order_value),
        ("days_since_last_activity", &s.days_since_last_activity),
        ("tenure_days", &s.tenure_days),
        ("outcome", &s.outcome),
    ] {
        println!("  {name:<26}{:>10.2}{:>10.2}{:>10.2}{:>10.2}", c.mean, c.std, c.min, c.max);
    }
    println!();
}

fn print_experiment(run_id: &str, source: &str, r: &ExperimentReport, v: &LiftVerification) {
    let money = |x: Option<f64>| x.map(|v| format!("${v:.2}")).unwrap_or_else(|| "n/a".into());
    println!("=== EXPERIMENT {run_id} ===");
    println!("  source:          {source}");
    println!("  sample size:     {}", r.sample_size);
    println!(
        "  arms:            {} control / {} treatment",
        r.post_treatment.control_count, r.post_treatment.treatment_count
    );
    println!("  control mean:    {}", money(r.post_treatment.control_mean));
    println!("  treatment mean:  {}", money(r.post_treatment.treatment_mean));
    println!("  observed diff:   {}", money(r.observed_difference));
    println!("  pre-period diff: {}", money(r.pre_treatment_difference));
    match r.mean_applied_lift {
        Some(l) => println!("  mean lift:       {:.2}%", 100.0 * l),
        None => println!("  mean lift:       n/a"),
    }
    println!(
        "  lift check:      {} (max |applied - theoretical| = {:e})",
        if v.passed() { "ok" } else { "MISMATCH" },
        v.max_abs_error
    );
}

fn print_outcome_by_group(g: &OutcomeByGroup) {
    println!("  outcome by arm (threshold {:.2}):", g.threshold);
    for (name, summary, above) in [
        ("control", &g.control, g.control_above_threshold),
        ("treatment", &g.treatment, g.treatment_above_threshold),
    ] {
        match summary {
            Some(c) => println!(
                "    {name:<10} mean {:>8.2}  std {:>8.2}  min {:>8.2}  max {:>8.2}  >= threshold: {above}",
                c.mean, c.std, c.min, c.max
            ),
            None => println!("    {name:<10} n/a"),
        }
    }
}

fn apply_overrides(config: &mut SimConfig, args: &[String]) -> Result<()> {
    if let Some(size) = parse_flag::<usize>(args, "--size")? {
        config.population.size = size;
    }
    if let Some(seed) = seed_flag(args, "--seed")? {
        config.population.seed = seed;
    }
    if let Some(size) = parse_flag::<usize>(args, "--pool-size")? {
        config.experiment_pool.size = size;
    }
    if let Some(seed) = seed_flag(args, "--pool-seed")? {
        config.experiment_pool.seed = seed;
    }
    if let Some(n) = parse_flag::<usize>(args, "--sample-size")? {
        config.experiment.sample_size = n;
    }
    if let Some(seed) = seed_flag(args, "--experiment-seed")? {
        config.experiment.seed = seed;
    }
    let t = &mut config.experiment.treatment;
    if let Some(v) = parse_flag::<f64>(args, "--effect-decay-threshold")? {
        t.effect_decay_threshold = v;
    }
    if let Some(v) = parse_flag::<f64>(args, "--effect-decay-rate")? {
        t.effect_decay_rate = v;
    }
    if let Some(v) = parse_flag::<f64>(args, "--treatment-effect")? {
        t.treatment_effect = v;
    }
    t.validate()?;
    Ok(())
}

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].as_str())
}

fn parse_flag<T: std::str::FromStr>(args: &[String], name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    flag(args, name)
        .map(|v| v.parse::<T>().map_err(|e| anyhow::anyhow!("{name} {v:?}: {e}")))
        .transpose()
}

fn seed_flag(args: &[String], name: &str) -> Result<Option<Seed>> {
    flag(args, name)
        .map(|v| parse_seed(v).map_err(|e| anyhow::anyhow!("{name}: {e}")))
        .transpose()
}

fn run_stamp() -> String {
    chrono::Utc::now().format("%Y%m%dT%H%M%S%3f").to_string()
}
