use linksim::{Scenario, StepOptions};
use linksim::{bench_solver, bench_step};

use clap::Parser;
use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use std::path::PathBuf;

#[derive(Parser, Debug)]
struct Args {
    /// Scenario file under `scenarios/`
    #[arg(short, default_value = "trebuchet.yaml")]
    file_name: String,

    /// Overrides the step count of the scenario
    #[arg(short, long)]
    steps: Option<usize>,

    /// Solve the first step only, without integrating
    #[arg(long)]
    dry_run: bool,

    /// Run the solver and step benchmarks instead of a scenario
    #[arg(long)]
    bench: bool,
}

// load here to keep main clean
fn load_scenario(file_name: &str) -> Result<Scenario> {
    let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(file_name);
    Scenario::from_yaml_file(&config_path).with_context(|| format!("failed to load {}", config_path.display()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    if args.bench {
        bench_solver()?;
        bench_step()?;
        return Ok(());
    }

    let mut scenario = load_scenario(&args.file_name)?;
    scenario.engine.initialize()?;
    let chain = scenario.engine.chain()?;
    info!(linked = chain.nodes.len(), loops = chain.loops.len(), "pivot chain");

    if args.dry_run {
        let report = scenario.step(StepOptions::dry_run())?;
        for s in report.solutions.iter() {
            info!(unknown = %s.unknown, value = s.value, "solution");
        }
        return Ok(());
    }

    let steps = args.steps.unwrap_or(scenario.steps);
    for _ in 0..steps {
        scenario.step(StepOptions::default())?;
    }

    for s in scenario.engine.solids() {
        info!(
            solid = %s.name,
            x = s.position.x,
            y = s.position.y,
            heading = s.rotation.z,
            vx = s.speed.x,
            vy = s.speed.y,
            "final state"
        );
    }
    for c in scenario.engine.constraints().iter().filter(|c| c.active) {
        let f = c.force_applied_to_first_object;
        info!(constraint = %c.name, fx = f.x, fy = f.y, "reaction");
    }
    info!(t = scenario.engine.time(), steps, "done");

    Ok(())
}
