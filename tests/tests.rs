use linksim::benchmark::benchmark::pendulum_chain;
use linksim::simulation::assembler::slider_frame;
use linksim::simulation::geometry::{rod_inertia, uniform_inertia, vec2};
use linksim::simulation::solver::Solver;
use linksim::{Constraint, Engine, EngineSettings, IntegratorConfig, Parameters, Scenario, ScenarioConfig};
use linksim::{ConstraintKind, SimError, Solid, SolidId, StepOptions};

use approx::assert_abs_diff_eq;
use std::path::PathBuf;

/// Rod of length `2 L` hanging from the ground at its left end, held horizontal
pub fn single_pendulum(mass: f64, inertia: f64, half_length: f64) -> EngineSettings {
    EngineSettings {
        solids: vec![Solid::new("rod", mass, uniform_inertia(inertia), vec2(half_length, 0.0))],
        constraints: vec![Constraint::pivot("hinge", SolidId(0), vec2(-half_length, 0.0))],
        parameters: Parameters::default(),
    }
}

/// Block on a frictionless ground rail along `axis`, rail through its center
pub fn block_on_rail(axis: (f64, f64), parameters: Parameters) -> EngineSettings {
    EngineSettings {
        solids: vec![Solid::new("block", 2.0, uniform_inertia(0.2), vec2(0.0, 0.0))],
        constraints: vec![Constraint::slider("rail", SolidId(0), vec2(0.0, 0.0), vec2(axis.0, axis.1))],
        parameters,
    }
}

/// Build and initialize, the way every runner does
pub fn ready(settings: EngineSettings) -> Engine {
    let mut engine = Engine::new(settings).unwrap();
    engine.initialize().unwrap();
    engine
}

/// Rod pivoted to the ground at its center, with a bead sliding along it
pub fn bead_on_rod(parameters: Parameters) -> EngineSettings {
    EngineSettings {
        solids: vec![
            Solid::new("rod", 2.0, uniform_inertia(0.5), vec2(0.0, 0.0)),
            Solid::new("bead", 0.5, uniform_inertia(1e-3), vec2(0.6, 0.0)),
        ],
        constraints: vec![
            Constraint::pivot("axle", SolidId(0), vec2(0.0, 0.0)),
            Constraint::slider("groove", SolidId(1), vec2(0.0, 0.0), vec2(1.0, 0.0)).with_object2(SolidId(0), vec2(0.0, 0.0)),
        ],
        parameters,
    }
}

/// Kinetic plus potential energy of every solid
pub fn total_energy(engine: &Engine) -> f64 {
    let g = engine.parameters().gravity;
    engine
        .solids()
        .iter()
        .map(|s| {
            0.5 * s.mass * s.speed.norm_squared()
                + 0.5 * s.inertia_zz() * s.rotational_speed.z * s.rotational_speed.z
                + s.mass * g * s.position.y
        })
        .sum()
}

fn scenario_path(file_name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(file_name)
}

// ==================================================================================
// Assembly tests
// ==================================================================================

#[test]
fn equation_count_matches_unknowns() {
    // 3 solids, 3 pivots, 1 slider: 3N + 2M + 2K
    let scenario = Scenario::from_yaml_file(&scenario_path("trebuchet.yaml")).unwrap();
    let equations = scenario.engine.assemble();

    assert_eq!(equations.len(), 3 * 3 + 2 * 3 + 2 * 1);
    assert_eq!(Solver::new(&equations).unknowns().len(), equations.len());
    assert_eq!(scenario.engine.expected_equation_count(), equations.len());
}

#[test]
fn solution_satisfies_every_row() {
    let mut scenario = Scenario::from_yaml_file(&scenario_path("trebuchet.yaml")).unwrap();
    scenario.engine.initialize().unwrap();

    // move away from rest so velocity-dependent terms are non-zero
    for _ in 0..5 {
        scenario.engine.run_one_step(StepOptions::default()).unwrap();
    }

    let equations = scenario.engine.assemble();
    let solutions = Solver::new(&equations).solve().unwrap();
    let residuals = solutions.residuals(&equations);

    let worst = residuals.iter().fold(0.0_f64, |m, r| m.max(r.abs()));
    assert!(worst < 1e-8, "largest residual {worst}");
}

// ==================================================================================
// Dynamics tests
// ==================================================================================

#[test]
fn single_pendulum_angular_acceleration() {
    let (m, i, l) = (2.0, 0.5, 1.0);
    let g = Parameters::default().gravity;
    let mut engine = ready(single_pendulum(m, i, l));

    engine.run_one_step(StepOptions::dry_run()).unwrap();

    let rod = &engine.solids()[0];
    let alpha = -m * g * l / (i + m * l * l);
    assert_abs_diff_eq!(rod.rotational_acceleration.z, alpha, epsilon = 1e-9);
    // the center swings about the hinge: a_G = α ẑ × (L, 0)
    assert_abs_diff_eq!(rod.acceleration.x, 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(rod.acceleration.y, alpha * l, epsilon = 1e-9);

    // hinge carries the rest of the weight
    let hinge = &engine.constraints()[0];
    assert_abs_diff_eq!(hinge.force_applied_to_first_object.y, m * (alpha * l + g), epsilon = 1e-9);
}

#[test]
fn rk4_is_exact_for_constant_acceleration() {
    let theta: f64 = 0.3;
    let parameters = Parameters { integrator: IntegratorConfig::Rk4, time_step: 0.01, ..Parameters::default() };
    let g = parameters.gravity;
    let mut engine = ready(block_on_rail((theta.cos(), -theta.sin()), parameters));

    let steps = 50;
    for _ in 0..steps {
        engine.run_one_step(StepOptions::default()).unwrap();
    }

    // frictionless incline: a = g sin θ down the slope
    let t = engine.time();
    let travelled = 0.5 * g * theta.sin() * t * t;
    let block = &engine.solids()[0];
    assert_abs_diff_eq!(t, 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(block.position.x, travelled * theta.cos(), epsilon = 1e-9);
    assert_abs_diff_eq!(block.position.y, -travelled * theta.sin(), epsilon = 1e-9);
    assert_abs_diff_eq!(block.speed.norm(), g * theta.sin() * t, epsilon = 1e-9);
}

#[test]
fn per_call_time_step_overrides_configured_one() {
    let mut engine = ready(single_pendulum(1.0, 0.1, 0.5));
    engine.run_one_step(StepOptions::with_time_step(0.002)).unwrap();
    engine.run_one_step(StepOptions::default()).unwrap();
    assert_abs_diff_eq!(engine.time(), 0.012, epsilon = 1e-15);
}

#[test]
fn bead_stays_on_turning_rod() {
    let parameters = Parameters { integrator: IntegratorConfig::Rk4, time_step: 1e-3, ..Parameters::default() };
    let mut engine = ready(bead_on_rod(parameters));
    let start = total_energy(&engine);

    for _ in 0..500 {
        engine.run_one_step(StepOptions::default()).unwrap();

        // bead center on the line through the rod center along its axis
        let sys = engine.system();
        let groove = &engine.constraints()[1];
        let ConstraintKind::Slider { axis } = groove.kind else { panic!("groove is a slider") };
        let (_, n) = slider_frame(sys, groove, &axis);
        let d = sys.attachment_world(&groove.object1) - sys.attachment_world(&groove.object2.unwrap());
        assert!(n.dot(&d).abs() < 1e-9, "bead left the rod by {} at t = {}", n.dot(&d), engine.time());
    }

    // no friction anywhere: energy is conserved
    let end = total_energy(&engine);
    assert_abs_diff_eq!(end, start, epsilon = 1e-8);

    // the rod tipped over on the bead side and the bead slid outward
    let rod = &engine.solids()[0];
    let bead = &engine.solids()[1];
    assert!(rod.rotational_speed.z < 0.0);
    assert!(bead.position.norm() > 0.6);
    assert!(bead.position.y < 0.0);
}

// ==================================================================================
// Constraint set tests
// ==================================================================================

#[test]
fn removing_a_pivot_drops_two_rows() {
    let mut engine = ready(pendulum_chain(2, Parameters::default()));

    let report = engine.run_one_step(StepOptions::default()).unwrap();
    assert_eq!(report.equations, 3 * 2 + 2 * 2);
    assert_eq!(engine.last_equation_count(), report.equations);

    let knee = engine.find_constraint("hinge1").unwrap();
    engine.remove_constraint(knee).unwrap();
    assert_eq!(engine.assemble().len(), 3 * 2 + 2);

    let report = engine.run_one_step(StepOptions::default()).unwrap();
    assert_eq!(report.equations, 3 * 2 + 2);
    assert_eq!(report.solutions.len(), report.equations);
    assert_eq!(engine.last_equation_count(), report.equations);

    // the freed link now falls
    let g = engine.parameters().gravity;
    assert_abs_diff_eq!(engine.solids()[1].acceleration.y, -g, epsilon = 1e-9);

    // removing it twice is an error
    assert!(matches!(engine.remove_constraint(knee), Err(SimError::UnknownConstraint(_))));
}

#[test]
fn added_constraint_takes_part_in_next_step() {
    let mut engine = ready(single_pendulum(1.0, 0.1, 1.0));
    engine.run_one_step(StepOptions::default()).unwrap();
    assert_eq!(engine.last_equation_count(), 5);

    let rod = engine.find_solid("rod").unwrap();
    let stop = Constraint::slider("stop", rod, vec2(1.0, 0.0), vec2(1.0, 0.0));
    engine.add_constraint(stop).unwrap();
    engine.run_one_step(StepOptions::default()).unwrap();
    assert_eq!(engine.last_equation_count(), 7);
}

// ==================================================================================
// Drift and determinism tests
// ==================================================================================

#[test]
fn drift_correction_is_idempotent() {
    let mut engine = ready(pendulum_chain(3, Parameters::default()));
    for _ in 0..100 {
        engine.run_one_step(StepOptions::default()).unwrap();
    }

    // every step already ends with a pass, so another one has nothing to do
    let report = engine.correct_drift();
    assert!(report.max_correction < 1e-12, "moved by {}", report.max_correction);

    // pivots still coincide
    let sys = engine.system();
    for c in engine.constraints() {
        let p1 = sys.attachment_world(&c.object1);
        let p2 = match &c.object2 {
            Some(a) => sys.attachment_world(a),
            None => c.initial_position,
        };
        assert_abs_diff_eq!(p1, p2, epsilon = 1e-12);
    }
}

#[test]
fn identical_runs_are_identical() {
    let parameters = Parameters { integrator: IntegratorConfig::Rk4, ..Parameters::default() };
    let mut a = ready(pendulum_chain(4, parameters.clone()));
    let mut b = ready(pendulum_chain(4, parameters));

    for _ in 0..200 {
        a.run_one_step(StepOptions::default()).unwrap();
        b.run_one_step(StepOptions::default()).unwrap();
    }

    for (sa, sb) in a.solids().iter().zip(b.solids()) {
        assert_eq!(sa.position, sb.position);
        assert_eq!(sa.rotation, sb.rotation);
        assert_eq!(sa.speed, sb.speed);
    }
}

// ==================================================================================
// Lifecycle and error tests
// ==================================================================================

#[test]
fn stepping_before_initialize_fails() {
    let mut engine = Engine::new(single_pendulum(1.0, 0.1, 1.0)).unwrap();
    assert!(matches!(engine.run_one_step(StepOptions::default()), Err(SimError::NotInitialized)));
    assert_eq!(engine.time(), 0.0);
}

#[test]
fn unconstrained_solid_is_named() {
    let mut settings = single_pendulum(1.0, 0.1, 1.0);
    settings.solids.push(Solid::new("loose", 1.0, uniform_inertia(0.1), vec2(5.0, 5.0)));
    let mut engine = Engine::new(settings).unwrap();

    match engine.initialize() {
        Err(SimError::UnconstrainedSolid(name)) => assert_eq!(name, "loose"),
        other => panic!("expected UnconstrainedSolid, got {other:?}"),
    }
}

#[test]
fn zero_slider_axis_is_rejected() {
    let result = Engine::new(block_on_rail((0.0, 0.0), Parameters::default()));
    assert!(matches!(result, Err(SimError::InvalidSliderAxis(name)) if name == "rail"));
}

#[test]
fn redundant_pivots_are_singular() {
    let mut settings = single_pendulum(1.0, 0.1, 1.0);
    settings.constraints.push(Constraint::pivot("twin", SolidId(0), vec2(-1.0, 0.0)));
    let mut engine = ready(settings);

    let before = engine.solids()[0].state();
    assert!(matches!(engine.run_one_step(StepOptions::default()), Err(SimError::Singular { .. })));
    // nothing was written
    assert_eq!(engine.solids()[0].state(), before);
    assert_eq!(engine.time(), 0.0);
    assert_eq!(engine.last_equation_count(), 0);
}

#[test]
fn empty_scene_steps_without_solving() {
    for integrator in [IntegratorConfig::Euler, IntegratorConfig::Rk4] {
        let parameters = Parameters { integrator, ..Parameters::default() };
        let mut engine = ready(EngineSettings { parameters, ..EngineSettings::default() });

        let report = engine.run_one_step(StepOptions::dry_run()).unwrap();
        assert!(report.solutions.is_empty());

        engine.run_one_step(StepOptions::default()).unwrap();
        assert_eq!(engine.last_equation_count(), 0);
        assert_abs_diff_eq!(engine.time(), engine.parameters().time_step);
    }
}

#[test]
fn initialize_runs_only_once() {
    let mut engine = ready(single_pendulum(1.0, 0.1, 1.0));
    for _ in 0..10 {
        engine.run_one_step(StepOptions::default()).unwrap();
    }
    let moving = engine.solids()[0].state();

    assert!(matches!(engine.initialize(), Err(SimError::AlreadyInitialized)));
    // speeds are kept
    assert_eq!(engine.solids()[0].state(), moving);
    assert!(moving.rotational_speed.z < 0.0);
    engine.run_one_step(StepOptions::default()).unwrap();
}

#[test]
fn floating_structure_has_no_ground_chain() {
    let settings = EngineSettings {
        solids: vec![
            Solid::new("a", 1.0, rod_inertia(1.0, 2.0, 0.1), vec2(1.0, 0.0)),
            Solid::new("b", 1.0, rod_inertia(1.0, 2.0, 0.1), vec2(3.0, 0.0)),
        ],
        constraints: vec![Constraint::pivot("joint", SolidId(0), vec2(1.0, 0.0)).with_object2(SolidId(1), vec2(-1.0, 0.0))],
        parameters: Parameters::default(),
    };
    let engine = ready(settings);
    assert!(matches!(engine.chain(), Err(SimError::NoGroundPivot)));
}

#[test]
fn reset_restores_initial_pose() {
    let mut engine = ready(pendulum_chain(2, Parameters::default()));
    let initial: Vec<_> = engine.solids().iter().map(|s| s.position).collect();

    for _ in 0..20 {
        engine.run_one_step(StepOptions::default()).unwrap();
    }
    engine.reset();

    assert_eq!(engine.time(), 0.0);
    for (s, p) in engine.solids().iter().zip(&initial) {
        assert_eq!(s.position, *p);
        assert_eq!(s.speed.norm(), 0.0);
        assert_eq!(s.rotation.z, 0.0);
    }
    assert!(engine.constraints().iter().all(|c| c.force_applied_to_first_object.norm() == 0.0));
}

#[test]
fn dry_run_does_not_advance() {
    let mut engine = ready(single_pendulum(1.0, 0.1, 1.0));
    let before = engine.solids()[0].state();

    let report = engine.run_one_step(StepOptions::dry_run()).unwrap();

    assert_eq!(report.equations, 5);
    assert_eq!(engine.time(), 0.0);
    assert_eq!(engine.solids()[0].state(), before);
    // accelerations and loads are filled in
    assert!(engine.solids()[0].rotational_acceleration.z < 0.0);
    assert!(engine.constraints()[0].force_applied_to_first_object.y > 0.0);
}

// ==================================================================================
// Scenario tests
// ==================================================================================

#[test]
fn trebuchet_scenario_loads_and_runs() {
    let mut scenario = Scenario::from_yaml_file(&scenario_path("trebuchet.yaml")).unwrap();
    assert_eq!(scenario.engine.solids().len(), 3);
    assert_eq!(scenario.engine.constraints().len(), 4);
    assert_eq!(scenario.releases.len(), 2);
    assert!(scenario.engine.parameters().uses_runge_kutta());

    // spheres: 2/5 m r²
    let counterweight = scenario.engine.find_solid("Counterweight").unwrap();
    assert_abs_diff_eq!(scenario.engine.solid(counterweight).inertia_zz(), 0.4 * 98.0 * 0.16 * 0.16, epsilon = 1e-12);

    scenario.engine.initialize().unwrap();
    assert_eq!(scenario.engine.chain().unwrap().nodes.len(), 3);

    for _ in 0..50 {
        scenario.step(StepOptions::default()).unwrap();
    }
    assert_abs_diff_eq!(scenario.engine.time(), 0.25, epsilon = 1e-9);

    // the counterweight goes down, the arm turns clockwise
    let counterweight = scenario.engine.find_solid("Counterweight").unwrap();
    assert!(scenario.engine.solid(counterweight).speed.y < 0.0);
    let arm = scenario.engine.find_solid("Arm").unwrap();
    assert!(scenario.engine.solid(arm).rotational_speed.z < 0.0);
}

#[test]
fn pendulum_scenario_loads() {
    let scenario = Scenario::from_yaml_file(&scenario_path("pendulum.yaml")).unwrap();
    assert_eq!(scenario.steps, 200);
    assert!(!scenario.engine.parameters().uses_runge_kutta());
    assert_eq!(scenario.engine.expected_equation_count(), 3 * 2 + 2 * 2);
}

#[test]
fn unknown_solid_in_constraint_is_rejected() {
    let yaml = r#"
parameters: { time_step: 0.01, gravity: 9.81 }
solids:
  - { name: Bob, mass: 1.0, inertia: 0.1, position: [1.0, 0.0] }
constraints:
  - { name: Hinge, kind: pivot, object1: Rob, object1_position: [-1.0, 0.0] }
"#;
    let cfg: ScenarioConfig = serde_yaml::from_str(yaml).unwrap();
    assert!(matches!(Scenario::build_scenario(cfg), Err(SimError::UnknownSolid(name)) if name == "Rob"));
}

fn rail_scenario(axis: &str) -> Scenario {
    let yaml = format!(
        r#"
parameters: {{ time_step: 0.01, gravity: 9.81 }}
solids:
  - {{ name: Block, mass: 1.0, inertia: 0.1, position: [0.0, 0.0] }}
constraints:
  - {{ name: Rail, kind: slider, object1: Block, object1_position: [0.0, 0.0], axis: {axis} }}
releases:
  - {{ constraint: Rail, rule: lift_off }}
"#
    );
    let cfg: ScenarioConfig = serde_yaml::from_str(&yaml).unwrap();
    let mut scenario = Scenario::build_scenario(cfg).unwrap();
    scenario.engine.initialize().unwrap();
    scenario
}

#[test]
fn lift_off_keeps_a_resting_block() {
    // normal of a +x rail points up: the rail pushes the block
    let mut scenario = rail_scenario("[1.0, 0.0]");
    for _ in 0..10 {
        scenario.step(StepOptions::default()).unwrap();
    }
    assert!(scenario.engine.constraints()[0].active);
    assert!(!scenario.releases[0].fired);
}

#[test]
fn lift_off_releases_a_hanging_block() {
    // normal of a -x rail points down: holding the block would need a pull
    let mut scenario = rail_scenario("[-1.0, 0.0]");
    scenario.step(StepOptions::default()).unwrap();
    assert!(!scenario.engine.constraints()[0].active);
    assert!(scenario.releases[0].fired);

    // free fall afterwards
    scenario.step(StepOptions::default()).unwrap();
    assert_abs_diff_eq!(scenario.engine.solids()[0].acceleration.y, -9.81, epsilon = 1e-9);
    assert_eq!(scenario.engine.last_equation_count(), 3);
}

#[test]
fn speed_angle_release_lets_the_rod_fly() {
    let yaml = r#"
parameters: { time_step: 0.01, gravity: 9.81, integrator: rk4 }
solids:
  - { name: Rod, mass: 1.0, inertia: 0.0833, position: [0.5, 0.0] }
constraints:
  - { name: Hinge, kind: pivot, object1: Rod, object1_position: [-0.5, 0.0] }
releases:
  - { constraint: Hinge, rule: speed_angle_below, solid: Rod, angle: 2.5 }
"#;
    let cfg: ScenarioConfig = serde_yaml::from_str(yaml).unwrap();
    let mut scenario = Scenario::build_scenario(cfg).unwrap();
    scenario.engine.initialize().unwrap();

    // falls through the bottom, then rises on the far side
    let mut steps = 0;
    while !scenario.releases[0].fired && steps < 300 {
        scenario.step(StepOptions::default()).unwrap();
        steps += 1;
    }
    assert!(scenario.releases[0].fired, "no release after {steps} steps");

    let rod = &scenario.engine.solids()[0];
    assert!(rod.speed.y > 0.0);
    assert!(rod.position.x < 0.0);
    assert!(!scenario.engine.constraints()[0].active);
}
