//! Property-based tests for the muscle curves and evaluation invariants.
//!
//! Run with: cargo test -p sim-degroote-muscle -- proptest

use proptest::prelude::*;
use sim_degroote_muscle::{
    series_stiffness, ActivationDynamics, DeGrooteFregly2016Muscle, MuscleForceCurves,
    MuscleParameters,
};

/// Central-difference step.
const H: f64 = 1e-6;

fn close(actual: f64, expected: f64, tolerance: f64) -> bool {
    (actual - expected).abs() <= tolerance * expected.abs().max(1.0)
}

fn central_difference(f: impl Fn(f64) -> f64, x: f64) -> f64 {
    (f(x + H) - f(x - H)) / (2.0 * H)
}

// =============================================================================
// Strategies
// =============================================================================

fn arb_curves() -> impl Strategy<Value = MuscleForceCurves> {
    (1.0..2.0f64, 0.02..0.1f64)
        .prop_map(|(scale, strain)| MuscleForceCurves::new(scale, true, strain))
}

fn arb_parameters() -> impl Strategy<Value = MuscleParameters> {
    (
        100.0..5000.0f64,
        0.02..0.2f64,
        0.05..0.5f64,
        0.0..0.5f64,
        any::<bool>(),
    )
        .prop_map(|(force, fiber, tendon, pennation, rigid)| {
            MuscleParameters::default()
                .with_max_isometric_force(force)
                .with_optimal_fiber_length(fiber)
                .with_tendon_slack_length(tendon)
                .with_pennation_angle_at_optimal(pennation)
                .with_rigid_tendon(rigid)
        })
}

// =============================================================================
// Curves
// =============================================================================

proptest! {
    #[test]
    fn proptest_tendon_inverse_round_trip(curves in arb_curves(), length in 0.95..1.1f64) {
        let force = curves.tendon.evaluate(length);
        prop_assert!(close(curves.tendon.inverse(force), length, 1e-10));
    }

    #[test]
    fn proptest_force_velocity_inverse_round_trip(velocity in -1.0..1.0f64) {
        let curves = MuscleForceCurves::default();
        let multiplier = curves.fv.evaluate(velocity);
        prop_assert!(close(curves.fv.inverse(multiplier), velocity, 1e-9));
    }

    #[test]
    fn proptest_curve_derivatives_match_finite_differences(
        curves in arb_curves(),
        fiber in 0.3..1.8f64,
        velocity in -1.0..1.0f64,
        tendon in 0.97..1.1f64,
    ) {
        let active = central_difference(|x| curves.active_fl.evaluate(x), fiber);
        prop_assert!(close(curves.active_fl.derivative(fiber), active, 1e-6));

        let passive = central_difference(|x| curves.passive_fl.evaluate(x), fiber);
        prop_assert!(close(curves.passive_fl.derivative(fiber), passive, 1e-6));

        let fv = central_difference(|v| curves.fv.evaluate(v), velocity);
        prop_assert!(close(curves.fv.derivative(velocity), fv, 1e-6));

        let t = central_difference(|x| curves.tendon.evaluate(x), tendon);
        prop_assert!(close(curves.tendon.derivative(tendon), t, 1e-6));
    }

    #[test]
    fn proptest_integrals_differentiate_to_curves(curves in arb_curves(), x in 0.3..1.6f64) {
        let passive = central_difference(|l| curves.passive_fl.integral(l), x);
        prop_assert!(close(passive, curves.passive_fl.evaluate(x), 1e-6));

        let tendon = x.mul_add(0.1, 0.93);
        let t = central_difference(|l| curves.tendon.integral(l), tendon);
        prop_assert!(close(t, curves.tendon.evaluate(tendon), 1e-6));
    }

    #[test]
    fn proptest_disabled_passive_is_zero(x in -1.0..3.0f64) {
        let curves = MuscleForceCurves::new(1.0, false, 0.049);
        prop_assert_eq!(curves.passive_fl.evaluate(x), 0.0);
        prop_assert_eq!(curves.passive_fl.derivative(x), 0.0);
        prop_assert_eq!(curves.passive_fl.integral(x), 0.0);
    }

    #[test]
    fn proptest_series_stiffness_below_both(k1 in 1.0..1e6f64, k2 in 1.0..1e6f64) {
        let k = series_stiffness(k1, k2);
        prop_assert!(k > 0.0);
        prop_assert!(k <= k1.min(k2));
        prop_assert!(close(k, series_stiffness(k2, k1), 1e-15));
    }

    #[test]
    fn proptest_activation_moves_toward_excitation(
        excitation in 0.0..1.0f64,
        activation in 0.01..1.0f64,
    ) {
        let rate = ActivationDynamics::default().derivative(excitation, activation);
        let gap = excitation - activation;
        prop_assert!(rate * gap >= 0.0);
        prop_assert!(rate.is_finite());
    }
}

// =============================================================================
// Evaluation
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn proptest_evaluation_invariants(
        params in arb_parameters(),
        stretch in -0.3..0.3f64,
        speed in -0.5..0.5f64,
        activation in 0.0..1.0f64,
    ) {
        let muscle = DeGrooteFregly2016Muscle::new(params).unwrap();
        let mut state = muscle.default_state();
        let length = state.length() + stretch * muscle.parameters().optimal_fiber_length;
        state.set_kinematics(length, speed);
        muscle.set_activation(&mut state, activation).unwrap();

        let eval = muscle.evaluate(&state).unwrap();
        let d = eval.dynamics;

        // Geometry closes: lMT = lT + lM cos(α).
        let rebuilt = eval.length.tendon_length
            + eval.length.fiber_length * eval.length.cos_pennation_angle;
        prop_assert!(close(rebuilt, length, 1e-12));

        // Force decomposition holds after any saturation.
        let sum = d.active_fiber_force
            + d.conservative_passive_fiber_force
            + d.non_conservative_passive_fiber_force;
        prop_assert!(close(sum, d.fiber_force, 1e-9));
        prop_assert!(close(d.passive_fiber_force,
            d.conservative_passive_fiber_force + d.non_conservative_passive_fiber_force, 1e-12));

        if muscle.parameters().ignore_tendon_compliance {
            prop_assert!(d.fiber_force >= 0.0);
            prop_assert!(d.tendon_stiffness.is_infinite());
            prop_assert_eq!(muscle.equilibrium_residual(&state).unwrap(), 0.0);
        } else {
            prop_assert!(d.tendon_stiffness.is_finite());
        }

        prop_assert!(eval.potential_energy.fiber_potential_energy >= 0.0);
        prop_assert_eq!(muscle.actuation(&state).unwrap(), d.tendon_force);
    }
}
