//! Fixed-step time integrators for the constrained system
//!
//! Provides the solve step (assemble, solve, write back), a semi-implicit
//! Euler integrator and a classical 4th-order Runge–Kutta integrator, all
//! driven by an `EquationSet`

use super::assembler::EquationSet;
use super::equations::{Element, UnknownFactor};
use super::error::Result;
use super::geometry::{along_z, vec2, NVec3};
use super::solver::{Solutions, Solver};
use super::states::{SolidId, SolidState, System};

/// Time derivative of one solid's kinematic state
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Derivative {
    pub velocity: NVec3,
    pub rotational_velocity: NVec3,
    pub acceleration: NVec3,
    pub rotational_acceleration: NVec3,
}

impl Derivative {
    fn weighted_sum(ks: [&[Derivative]; 4], weights: [f64; 4]) -> Vec<Derivative> {
        let n = ks[0].len();
        (0..n)
            .map(|i| {
                let mut d = Derivative::default();
                for (k, w) in ks.iter().zip(weights.iter()) {
                    d.velocity += *w * k[i].velocity;
                    d.rotational_velocity += *w * k[i].rotational_velocity;
                    d.acceleration += *w * k[i].acceleration;
                    d.rotational_acceleration += *w * k[i].rotational_acceleration;
                }
                d
            })
            .collect()
    }
}

/// Assemble and solve for the current state without touching it
pub fn solve_system(sys: &System, equations: &EquationSet) -> Result<Solutions> {
    let rows = equations.assemble(sys);
    Solver::new(&rows).solve()
}

/// Write accelerations onto solids and loads onto constraints
pub fn apply_solutions(sys: &mut System, solutions: &Solutions) {
    for s in solutions.iter() {
        match s.unknown.element {
            Element::Solid(id) => {
                let solid = &mut sys.solids[id.0];
                match s.unknown.factor {
                    UnknownFactor::AccelX => solid.acceleration.x = s.value,
                    UnknownFactor::AccelY => solid.acceleration.y = s.value,
                    UnknownFactor::AngularAccel => solid.rotational_acceleration.z = s.value,
                    _ => {}
                }
            }
            Element::Constraint(id) => {
                let c = &mut sys.constraints[id.0];
                match s.unknown.factor {
                    UnknownFactor::ForceX => c.force_applied_to_first_object.x = s.value,
                    UnknownFactor::ForceY => c.force_applied_to_first_object.y = s.value,
                    _ => {}
                }
            }
            Element::Ground => {}
        }
    }
}

/// Solve for the current state and write the results back; nothing is
/// written when the solve fails
pub fn solve_step(sys: &mut System, equations: &EquationSet) -> Result<Solutions> {
    let solutions = solve_system(sys, equations)?;
    apply_solutions(sys, &solutions);
    Ok(solutions)
}

/// Advance every solid by `dt` from the accelerations stored on it:
/// v_n+1 = v_n + dt a_n, then x_n+1 = x_n + dt v_n+1
pub fn euler_update(sys: &mut System, dt: f64) {
    for s in sys.solids.iter_mut() {
        s.speed += dt * s.acceleration;
        s.rotational_speed += dt * s.rotational_acceleration;
    }
    for s in sys.solids.iter_mut() {
        s.position += dt * s.speed;
        s.rotation += dt * s.rotational_speed;
    }
}

/// Solve step followed by a semi-implicit Euler update over `dt`
pub fn euler_integrator(sys: &mut System, equations: &EquationSet, dt: f64) -> Result<Solutions> {
    let solutions = solve_step(sys, equations)?;
    euler_update(sys, dt);
    Ok(solutions)
}

/// State derivative of every solid from its current speeds and a solution
fn derivatives(sys: &System, solutions: &Solutions) -> Vec<Derivative> {
    sys.solid_ids()
        .map(|id: SolidId| {
            let solid = sys.solid(id);
            let e = Element::Solid(id);
            let value = |f| solutions.get(f, e).unwrap_or(0.0);
            Derivative {
                velocity: solid.speed,
                rotational_velocity: solid.rotational_speed,
                acceleration: vec2(value(UnknownFactor::AccelX), value(UnknownFactor::AccelY)),
                rotational_acceleration: along_z(value(UnknownFactor::AngularAccel)),
            }
        })
        .collect()
}

/// `base + h k`, as fresh snapshots
fn advanced(base: &[SolidState], k: &[Derivative], h: f64) -> Vec<SolidState> {
    base.iter()
        .zip(k.iter())
        .map(|(s, d)| SolidState {
            position: s.position + h * d.velocity,
            rotation: s.rotation + h * d.rotational_velocity,
            speed: s.speed + h * d.acceleration,
            rotational_speed: s.rotational_speed + h * d.rotational_acceleration,
        })
        .collect()
}

/// Solve at the state `base + h k` and return the solution and derivative
fn stage(
    sys: &mut System,
    equations: &EquationSet,
    base: &[SolidState],
    k: Option<&[Derivative]>,
    h: f64,
) -> Result<(Solutions, Vec<Derivative>)> {
    match k {
        Some(k) => sys.restore_states(&advanced(base, k, h)),
        None => sys.restore_states(base),
    }
    let solutions = solve_system(sys, equations)?;
    let d = derivatives(sys, &solutions);
    Ok((solutions, d))
}

/// The four RK4 stages from snapshot `base`: merged solution and the
/// weighted derivative sum `k1 + 2 k2 + 2 k3 + k4`
fn rk4_stages(
    sys: &mut System,
    equations: &EquationSet,
    base: &[SolidState],
    dt: f64,
) -> Result<(Solutions, Vec<Derivative>)> {
    let half_dt = 0.5 * dt;

    let (s1, k1) = stage(sys, equations, base, None, 0.0)?;
    let (s2, k2) = stage(sys, equations, base, Some(k1.as_slice()), half_dt)?;
    let (s3, k3) = stage(sys, equations, base, Some(k2.as_slice()), half_dt)?;
    let (s4, k4) = stage(sys, equations, base, Some(k3.as_slice()), dt)?;

    let merged = s1
        .add(&s2.scale(2.0))?
        .add(&s3.scale(2.0))?
        .add(&s4)?
        .scale(1.0 / 6.0);
    let k = Derivative::weighted_sum(
        [k1.as_slice(), k2.as_slice(), k3.as_slice(), k4.as_slice()],
        [1.0, 2.0, 2.0, 1.0],
    );
    Ok((merged, k))
}

/// Advance the system by `dt` with classical RK4
///
/// Four solves at `x`, `x + dt/2 k1`, `x + dt/2 k2`, `x + dt k3`; positions
/// and velocities move by `dt (k1 + 2 k2 + 2 k3 + k4) / 6`. The same weights
/// merge the four solutions, which are written back as the step's
/// accelerations and loads. On error the solids are restored to `x`.
pub fn rk4_integrator(sys: &mut System, equations: &EquationSet, dt: f64) -> Result<Solutions> {
    let base = sys.states();

    let result = rk4_stages(sys, equations, &base, dt);
    sys.restore_states(&base);
    let (merged, k) = result?;

    sys.restore_states(&advanced(&base, &k, dt / 6.0));
    apply_solutions(sys, &merged);
    Ok(merged)
}
