//! Multi-step transient scenarios checked against closed-form solutions.

use approx::assert_relative_eq;
use std::f64::consts::PI;
use std::sync::Arc;
use tempo_core::entity::{LinearSpring, PointLoad, PointMass};
use tempo_core::solver::SolverType;
use tempo_core::{
    BossakScheme, ModelPart, ModelSchema, NewtonRaphsonStrategy, StrategySettings, Variable,
    VariableComponent, Vec3,
};

/// Ground node 1 and a unit mass on node 2 joined by a spring of stiffness
/// `k`, moving along x. The mass starts at `u0` with consistent acceleration.
fn oscillator(k: f64, u0: f64) -> ModelPart {
    let schema = ModelSchema::structural(2, 2).unwrap();
    let mut model = ModelPart::new("oscillator", Arc::new(schema));
    for id in 0..2 {
        let n = model.add_node(id + 1, Vec3::new(id as f64, 0.0, 0.0)).unwrap();
        model.add_displacement_dofs(n).unwrap();
        model.fix(n, VariableComponent::DISPLACEMENT_Y).unwrap();
    }
    model.fix(0, VariableComponent::DISPLACEMENT_X).unwrap();
    model
        .add_element(Box::new(LinearSpring::new(1, 0, 1, k, 2).unwrap()))
        .unwrap();
    model
        .add_element(Box::new(PointMass::new(2, 1, 1.0, 2).unwrap()))
        .unwrap();

    let node = model.node_mut(1).unwrap();
    node.set_value(Variable::Displacement, 0, Vec3::new(u0, 0.0, 0.0))
        .unwrap();
    node.set_value(Variable::Acceleration, 0, Vec3::new(-k * u0, 0.0, 0.0))
        .unwrap();
    model
}

fn state(model: &ModelPart, node: usize) -> (f64, f64, f64) {
    let n = model.node(node).unwrap();
    (
        n.value(Variable::Displacement, 0).unwrap().x,
        n.value(Variable::Velocity, 0).unwrap().x,
        n.value(Variable::Acceleration, 0).unwrap().x,
    )
}

fn energy(model: &ModelPart, k: f64) -> f64 {
    let (u, v, _) = state(model, 1);
    0.5 * v * v + 0.5 * k * u * u
}

#[test]
fn newmark_tracks_undamped_oscillator() {
    // Unit period.
    let omega = 2.0 * PI;
    let k = omega * omega;
    let dt = 0.01;
    let mut model = oscillator(k, 1.0);
    let mut strategy =
        NewtonRaphsonStrategy::new(BossakScheme::newmark(), StrategySettings::default()).unwrap();
    let e0 = energy(&model, k);

    for step in 1..=100 {
        let report = strategy.advance(&mut model, dt).unwrap();
        assert!(report.converged, "step {} did not converge", step);
        assert!(report.iterations <= 2);

        let t = step as f64 * dt;
        let (u, v, _) = state(&model, 1);
        assert!(
            (u - (omega * t).cos()).abs() < 5e-3,
            "t={} u={} exact={}",
            t,
            u,
            (omega * t).cos()
        );
        assert!((v + omega * (omega * t).sin()).abs() < 5e-2);
        // Average acceleration conserves energy on linear problems.
        assert_relative_eq!(energy(&model, k), e0, max_relative = 1e-9);
    }
}

#[test]
fn bossak_stays_accurate_for_resolved_motion() {
    let omega = 2.0 * PI;
    let k = omega * omega;
    let dt = 0.01;
    let mut model = oscillator(k, 1.0);
    let mut strategy =
        NewtonRaphsonStrategy::new(BossakScheme::new(-0.1), StrategySettings::default()).unwrap();

    for step in 1..=100 {
        assert!(strategy.advance(&mut model, dt).unwrap().converged);
        let t = step as f64 * dt;
        assert!((state(&model, 1).0 - (omega * t).cos()).abs() < 1e-2);
    }
}

#[test]
fn bossak_dissipates_unresolved_motion() {
    // Coarse step: omega * dt is close to 2.
    let omega = 2.0 * PI;
    let k = omega * omega;
    let dt = 0.3;

    let mut newmark_model = oscillator(k, 1.0);
    let mut bossak_model = oscillator(k, 1.0);
    let e0 = energy(&bossak_model, k);
    let mut newmark =
        NewtonRaphsonStrategy::new(BossakScheme::newmark(), StrategySettings::default()).unwrap();
    let mut bossak =
        NewtonRaphsonStrategy::new(BossakScheme::new(-0.3), StrategySettings::default()).unwrap();

    for _ in 0..50 {
        assert!(newmark.advance(&mut newmark_model, dt).unwrap().converged);
        assert!(bossak.advance(&mut bossak_model, dt).unwrap().converged);
    }
    assert_relative_eq!(energy(&newmark_model, k), e0, max_relative = 1e-8);
    let e = energy(&bossak_model, k);
    assert!(e < 0.5 * e0, "bossak kept {} of {}", e, e0);
}

#[test]
fn single_free_node_matches_closed_form() {
    let schema = ModelSchema::structural(3, 2).unwrap();
    let mut model = ModelPart::new("point", Arc::new(schema));
    let n = model.add_node(1, Vec3::zeros()).unwrap();
    model.add_displacement_dofs(n).unwrap();
    let (mass, force) = (2.0, 1.0);
    model
        .add_element(Box::new(PointMass::new(1, n, mass, 3).unwrap()))
        .unwrap();
    model
        .add_condition(Box::new(PointLoad::new(1, n, Vec3::new(force, 0.0, 0.0))))
        .unwrap();

    let mut strategy =
        NewtonRaphsonStrategy::new(BossakScheme::newmark(), StrategySettings::default()).unwrap();
    let report = strategy.advance(&mut model, 0.1).unwrap();
    assert!(report.converged);
    assert_eq!(report.iterations, 1);

    let (d, v, a) = state(&model, 0);
    assert_relative_eq!(d, 0.25 * 0.01 * force / mass, epsilon = 1e-15);
    assert_relative_eq!(v, 0.05 * force / mass, epsilon = 1e-13);
    assert_relative_eq!(a, force / mass, epsilon = 1e-12);
    let other = model.node(0).unwrap().value(Variable::Displacement, 0).unwrap();
    assert_eq!(other.y, 0.0);
    assert_eq!(other.z, 0.0);
}

/// Three masses hanging from a clamped node along x, under a body force.
fn chain() -> ModelPart {
    let schema = ModelSchema::structural(2, 3).unwrap();
    let mut model = ModelPart::new("chain", Arc::new(schema));
    for id in 0..4 {
        let n = model.add_node(id + 1, Vec3::new(id as f64, 0.0, 0.0)).unwrap();
        model.add_displacement_dofs(n).unwrap();
        model.fix(n, VariableComponent::DISPLACEMENT_Y).unwrap();
        model
            .node_mut(n)
            .unwrap()
            .set_value(Variable::VolumeAcceleration, 0, Vec3::new(-9.81, 0.0, 0.0))
            .unwrap();
    }
    model.fix(0, VariableComponent::DISPLACEMENT_X).unwrap();
    for i in 0..3 {
        model
            .add_element(Box::new(
                LinearSpring::new(i + 1, i, i + 1, 100.0 * (i + 1) as f64, 2).unwrap(),
            ))
            .unwrap();
        model
            .add_element(Box::new(
                PointMass::new(10 + i, i + 1, 1.0 + i as f64, 2)
                    .unwrap()
                    .with_damping(0.5)
                    .unwrap(),
            ))
            .unwrap();
    }
    model
}

#[test]
fn sparse_and_dense_solvers_agree() {
    let mut direct = chain();
    let mut dense = chain();
    let mut s1 =
        NewtonRaphsonStrategy::new(BossakScheme::new(-0.2), StrategySettings::default()).unwrap();
    let settings = StrategySettings {
        solver: SolverType::Dense,
        ..StrategySettings::default()
    };
    let mut s2 = NewtonRaphsonStrategy::new(BossakScheme::new(-0.2), settings).unwrap();

    for _ in 0..20 {
        assert!(s1.advance(&mut direct, 0.005).unwrap().converged);
        assert!(s2.advance(&mut dense, 0.005).unwrap().converged);
    }
    assert_eq!(s1.dofs().equation_system_size(), 3);
    for node in 1..4 {
        let (d1, v1, a1) = state(&direct, node);
        let (d2, v2, a2) = state(&dense, node);
        assert_relative_eq!(d1, d2, epsilon = 1e-10);
        assert_relative_eq!(v1, v2, epsilon = 1e-8);
        assert_relative_eq!(a1, a2, epsilon = 1e-6);
        // The chain falls towards -x under the body force.
        assert!(d1 < 0.0);
    }
    // The clamped node never moves.
    assert_eq!(state(&direct, 0).0, 0.0);
}
