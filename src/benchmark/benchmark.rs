use std::time::Instant;

use crate::simulation::engine::{Engine, EngineSettings, StepOptions};
use crate::simulation::equations::Equation;
use crate::simulation::error::Result;
use crate::simulation::geometry::{rod_inertia, vec2};
use crate::simulation::params::Parameters;
use crate::simulation::solver::Solver;
use crate::simulation::states::{Constraint, Solid, SolidId};

use crate::configuration::config::IntegratorConfig;

/// Helper to build a chain of `n` horizontal rods of length 2, the first one
/// hinged to the ground at the origin
pub fn pendulum_chain(n: usize, parameters: Parameters) -> EngineSettings {
    let mut solids = Vec::with_capacity(n);
    let mut constraints = Vec::with_capacity(n);

    for i in 0..n {
        let x = 2.0 * i as f64 + 1.0;
        solids.push(Solid::new(format!("link{i}"), 1.0, rod_inertia(1.0, 2.0, 0.1), vec2(x, 0.0)));

        let hinge = Constraint::pivot(format!("hinge{i}"), SolidId(i), vec2(-1.0, 0.0));
        // every hinge after the first ties the link to the end of the previous one
        let hinge = if i == 0 { hinge } else { hinge.with_object2(SolidId(i - 1), vec2(1.0, 0.0)) };
        constraints.push(hinge);
    }

    EngineSettings { solids, constraints, parameters }
}

fn chain_engine(n: usize, integrator: IntegratorConfig) -> Result<Engine> {
    let parameters = Parameters { integrator, ..Parameters::default() };
    let mut engine = Engine::new(pendulum_chain(n, parameters))?;
    engine.initialize()?;
    Ok(engine)
}

/// Time assembling and solving the linear system for chains of growing size
/// Paste output directly into excel to graph
pub fn bench_solver() -> Result<()> {
    println!("N,rows,assemble_ms,solve_ms");

    for n in [5, 10, 20, 40, 80, 160] {
        let engine = chain_engine(n, IntegratorConfig::Euler)?;
        let repeats = if n <= 40 { 20 } else { 3 };

        // Warm up
        let equations: Vec<Equation> = engine.assemble();
        Solver::new(&equations).solve()?;

        let t0 = Instant::now();
        for _ in 0..repeats {
            let _ = engine.assemble();
        }
        let assemble_ms = t0.elapsed().as_secs_f64() * 1000.0 / repeats as f64;

        let t1 = Instant::now();
        for _ in 0..repeats {
            Solver::new(&equations).solve()?;
        }
        let solve_ms = t1.elapsed().as_secs_f64() * 1000.0 / repeats as f64;

        println!("{},{},{:.6},{:.6}", n, equations.len(), assemble_ms, solve_ms);
    }
    Ok(())
}

/// Time a full step (solve, integrate, drift correction) with each integrator
pub fn bench_step() -> Result<()> {
    let steps = 10;

    for n in [5, 10, 20, 40, 80] {
        let mut euler = chain_engine(n, IntegratorConfig::Euler)?;
        let mut rk4 = chain_engine(n, IntegratorConfig::Rk4)?;

        let t0 = Instant::now();
        for _ in 0..steps {
            euler.run_one_step(StepOptions::default())?;
        }
        let euler_per_step = t0.elapsed().as_secs_f64() / steps as f64;

        let t1 = Instant::now();
        for _ in 0..steps {
            rk4.run_one_step(StepOptions::default())?;
        }
        let rk4_per_step = t1.elapsed().as_secs_f64() / steps as f64;

        println!("N = {:4}, euler step = {:8.6} s,   rk4 step = {:8.6} s", n, euler_per_step, rk4_per_step);
    }
    Ok(())
}
