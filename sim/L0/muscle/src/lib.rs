//! DeGroote-Fregly 2016 muscle-tendon model for optimal-control simulation.
//!
//! The model is a Hill-type muscle whose curves are smooth everywhere, so
//! gradient-based optimal-control solvers can differentiate through it:
//!
//! ```text
//!                     ┌──────────────── lMT ────────────────┐
//!                     │                                      │
//!    Excitation ──►  ┌┴──────────────┐    ┌─────────────────┴┐
//!        e           │ CE  a·fL·fV   │    │                  │
//!                    │ PE  fPE       ├────┤  Tendon  fT(l̃T)  ├──► FT
//!                    │ D   β·ṽM      │ α  │                  │
//!                    └───────────────┘    └──────────────────┘
//!                      fiber, lM            tendon, lT
//! ```
//!
//! # Curves
//!
//! | Curve           | Form                                  |
//! |-----------------|---------------------------------------|
//! | Active FL       | sum of three Gaussian-like lobes      |
//! | Passive FL      | normalized exponential, 0 at l̃M = 0.2 |
//! | Force-velocity  | scaled inverse hyperbolic sine        |
//! | Tendon FL       | shifted exponential, 0 at l̃T = 1      |
//!
//! All curves are defined on the whole real line and extrapolate outside
//! their usual range; nothing is clamped.
//!
//! # State
//!
//! The host owns a [`MuscleState`] per muscle. Activation is a state unless
//! activation dynamics are ignored; normalized tendon force is a state unless
//! the tendon is rigid. For a compliant tendon the host also supplies an
//! estimate of the tendon force derivative, and the model reports the
//! equilibrium residual that the solver drives to zero.
//!
//! # Quick Start
//!
//! ```
//! use sim_degroote_muscle::{DeGrooteFregly2016Muscle, MuscleParameters};
//!
//! let muscle = DeGrooteFregly2016Muscle::new(MuscleParameters::biceps())?
//!     .with_name("biceps_r");
//!
//! let mut state = muscle.default_state();
//! state.set_kinematics(0.38, -0.05);
//! state.set_excitation(0.8);
//!
//! let eval = muscle.evaluate(&state)?;
//! let residual = muscle.implicit_residual_normalized_tendon_force(&state)?;
//! let derivatives = muscle.state_derivatives(&state)?;
//!
//! assert!(eval.dynamics.tendon_force > 0.0);
//! assert!(residual.is_finite());
//! assert!(derivatives.activation.unwrap_or_default() > 0.0);
//! # Ok::<(), sim_degroote_muscle::MuscleError>(())
//! ```
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**. It is a pure
//! numerical kernel: no I/O, no threads, and the only interior mutability is
//! the per-muscle residual cache.
//!
//! # References
//!
//! - De Groote, F., Kinney, A.L., Rao, A.V., Fregly, B.J. (2016). Evaluation of
//!   direct collocation optimal control problem formulations for solving the
//!   muscle redundancy problem.
//! - Millard, M. et al. (2013). Flexing computational muscle.

#![doc(html_root_url = "https://docs.rs/sim-degroote-muscle/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions,
    clippy::doc_markdown,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::similar_names,
    clippy::too_many_lines,
    clippy::suboptimal_flops,
    clippy::cast_precision_loss,
    clippy::imprecise_flops
)]
#![cfg_attr(
    test,
    allow(
        clippy::float_cmp,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::let_underscore_must_use
    )
)]

pub mod activation;
pub mod curves;
pub mod error;
pub mod export;
pub mod info;
pub mod migration;
pub mod muscle;
pub mod params;
pub mod pennation;
pub mod state;

// Re-export main types at crate root
pub use activation::ActivationDynamics;
pub use curves::{
    ActiveForceLengthCurve, ForceVelocityCurve, MuscleForceCurves, PassiveForceLengthCurve,
    TendonForceLengthCurve,
};
pub use error::{MuscleError, Result};
pub use export::CurveTable;
pub use info::{
    DynamicsInfo, LengthInfo, MuscleEvaluation, PotentialEnergyInfo, StateDerivatives,
    VelocityInfo,
};
pub use migration::{replace_muscles, LegacyMuscle, LegacyMuscleCommon, MigrationReport};
pub use muscle::{series_stiffness, ActivationSource, DeGrooteFregly2016Muscle, TendonModel};
pub use params::MuscleParameters;
pub use pennation::FixedWidthPennation;
pub use state::{MuscleState, StateVersion};

/// Interface a host simulation uses to drive a muscle.
///
/// The host owns one state per muscle, writes kinematics and controls into
/// it, applies [`actuation`](Self::actuation) along the path and integrates
/// [`state_derivatives`](Self::state_derivatives).
pub trait MuscleActuator {
    /// Create a state with the slots this muscle needs.
    fn default_state(&self) -> MuscleState;

    /// Tension applied along the musculotendon path (N).
    fn actuation(&self, state: &MuscleState) -> Result<f64>;

    /// Time derivatives of the state variables.
    fn state_derivatives(&self, state: &MuscleState) -> Result<StateDerivatives>;

    /// Residuals of implicit dynamics; empty when there are none.
    fn implicit_residuals(&self, state: &MuscleState) -> Result<Vec<f64>>;
}

impl MuscleActuator for DeGrooteFregly2016Muscle {
    fn default_state(&self) -> MuscleState {
        self.default_state()
    }

    fn actuation(&self, state: &MuscleState) -> Result<f64> {
        self.actuation(state)
    }

    fn state_derivatives(&self, state: &MuscleState) -> Result<StateDerivatives> {
        self.state_derivatives(state)
    }

    fn implicit_residuals(&self, state: &MuscleState) -> Result<Vec<f64>> {
        match self.tendon_model() {
            TendonModel::Rigid => Ok(Vec::new()),
            TendonModel::Compliant => Ok(vec![
                self.implicit_residual_normalized_tendon_force(state)?,
            ]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn total_actuation<M: MuscleActuator>(muscles: &[M], states: &[MuscleState]) -> Result<f64> {
        muscles
            .iter()
            .zip(states)
            .map(|(muscle, state)| muscle.actuation(state))
            .sum()
    }

    #[test]
    fn test_muscle_actuator_trait() {
        let muscle = DeGrooteFregly2016Muscle::new(MuscleParameters::default()).unwrap();
        let state = MuscleActuator::default_state(&muscle);

        let force = MuscleActuator::actuation(&muscle, &state).unwrap();
        assert_relative_eq!(force, 500.0, epsilon = 1e-9);
        assert_eq!(muscle.implicit_residuals(&state).unwrap().len(), 1);
    }

    #[test]
    fn test_rigid_has_no_implicit_residuals() {
        let params = MuscleParameters::default().with_rigid_tendon(true);
        let muscle = DeGrooteFregly2016Muscle::new(params).unwrap();
        let state = muscle.default_state();

        assert!(muscle.implicit_residuals(&state).unwrap().is_empty());
    }

    #[test]
    fn test_actuation_sums_over_muscles() {
        let muscles = [
            DeGrooteFregly2016Muscle::new(MuscleParameters::biceps()).unwrap(),
            DeGrooteFregly2016Muscle::new(MuscleParameters::soleus()).unwrap(),
        ];
        let states: Vec<MuscleState> = muscles.iter().map(|m| m.default_state()).collect();

        // Both default states carry a normalized tendon force of 0.5.
        let total = total_actuation(&muscles, &states).unwrap();
        assert_relative_eq!(total, 0.5 * (700.0 + 3500.0), epsilon = 1e-9);
    }

    #[test]
    fn test_mismatched_state_propagates_error() {
        let rigid = DeGrooteFregly2016Muscle::new(MuscleParameters::default().with_rigid_tendon(true))
            .unwrap();
        let compliant = DeGrooteFregly2016Muscle::new(MuscleParameters::default()).unwrap();

        let states = [rigid.default_state()];
        assert!(total_actuation(&[compliant], &states).is_err());
    }
}
