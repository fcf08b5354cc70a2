//! DeGroote-Fregly 2016 muscle-tendon unit.
//!
//! The engine turns a [`MuscleState`] into the derived info bundles in a fixed
//! order: length, velocity, dynamics, potential energy. It also reports the
//! activation ODE and, for a compliant tendon, the residual of the implicit
//! muscle-tendon equilibrium.
//!
//! # Tendon models
//!
//! ```text
//!   rigid:      lT = lTs                   vT = 0
//!   compliant:  lT = lTs f_T⁻¹(F̃T)         vT = lTs d(f_T⁻¹)/dF̃T · dF̃T/dt
//! ```
//!
//! With a compliant tendon the normalized tendon force `F̃T` is a state and
//! its derivative is an unknown supplied by the solver. The model does not
//! solve the equilibrium `FT = FM cos(α)`; it reports the residual, which the
//! solver drives to zero.
//!
//! # Example
//!
//! ```
//! use sim_degroote_muscle::{DeGrooteFregly2016Muscle, MuscleParameters};
//!
//! let params = MuscleParameters::default().with_rigid_tendon(true);
//! let muscle = DeGrooteFregly2016Muscle::new(params)?;
//!
//! let mut state = muscle.default_state();
//! state.set_kinematics(0.3, 0.0);
//! state.set_activation(1.0)?;
//!
//! let eval = muscle.evaluate(&state)?;
//! assert!((eval.length.normalized_fiber_length - 1.0).abs() < 1e-12);
//! # Ok::<(), sim_degroote_muscle::MuscleError>(())
//! ```

use std::cell::Cell;

use tracing::{trace, warn};

use crate::curves::MuscleForceCurves;
use crate::error::{MuscleError, Result};
use crate::info::{
    DynamicsInfo, LengthInfo, MuscleEvaluation, PotentialEnergyInfo, StateDerivatives,
    VelocityInfo,
};
use crate::params::{DerivedConstants, MuscleParameters};
use crate::pennation::FixedWidthPennation;
use crate::state::{
    MuscleState, StateVersion, ACTIVATION_STATE_NAME, NORMALIZED_TENDON_FORCE_DERIVATIVE_NAME,
    NORMALIZED_TENDON_FORCE_STATE_NAME,
};

/// Sums of stiffness below this magnitude are treated as zero.
pub const SIGNIFICANT_REAL: f64 = 1.8e-14;

/// Which tendon model is in use, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TendonModel {
    /// Inextensible tendon; fiber absorbs all length change.
    Rigid,
    /// Elastic tendon with normalized tendon force as a state.
    Compliant,
}

/// Where activation comes from, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationSource {
    /// Activation is a state integrated by the host.
    State,
    /// Activation equals the excitation.
    Excitation,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ResidualCache {
    version: StateVersion,
    value: f64,
}

/// Stiffness of two springs in series, `k1 k2 / (k1 + k2)`.
///
/// Returns 0 when either stiffness is zero or their sum is numerically zero.
#[must_use]
pub fn series_stiffness(k1: f64, k2: f64) -> f64 {
    if (k1 * k2).abs() > 0.0 && (k1 + k2).abs() > SIGNIFICANT_REAL {
        k1 * k2 / (k1 + k2)
    } else {
        0.0
    }
}

/// DeGroote-Fregly 2016 muscle.
///
/// Holds validated parameters, the constants derived from them, the curve set
/// and a single cache slot for the implicit residual. The cache uses
/// [`Cell`], so a muscle can be sent between threads but not shared by them.
#[derive(Debug, Clone)]
pub struct DeGrooteFregly2016Muscle {
    name: String,
    params: MuscleParameters,
    derived: DerivedConstants,
    curves: MuscleForceCurves,
    tendon: TendonModel,
    activation_source: ActivationSource,
    residual_cache: Cell<Option<ResidualCache>>,
}

impl DeGrooteFregly2016Muscle {
    /// Create a muscle, validating the parameters.
    pub fn new(params: MuscleParameters) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            name: String::new(),
            derived: DerivedConstants::from_parameters(&params),
            curves: Self::curves_for(&params),
            tendon: Self::tendon_model_for(&params),
            activation_source: Self::activation_source_for(&params),
            params,
            residual_cache: Cell::new(None),
        })
    }

    fn curves_for(params: &MuscleParameters) -> MuscleForceCurves {
        MuscleForceCurves::new(
            params.active_force_width_scale,
            !params.ignore_passive_fiber_force,
            params.tendon_strain_at_one_norm_force,
        )
    }

    fn tendon_model_for(params: &MuscleParameters) -> TendonModel {
        if params.ignore_tendon_compliance {
            TendonModel::Rigid
        } else {
            TendonModel::Compliant
        }
    }

    fn activation_source_for(params: &MuscleParameters) -> ActivationSource {
        if params.ignore_activation_dynamics {
            ActivationSource::Excitation
        } else {
            ActivationSource::State
        }
    }

    /// Create a muscle with a name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Get the muscle name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the parameters.
    #[must_use]
    pub fn parameters(&self) -> &MuscleParameters {
        &self.params
    }

    /// Replace the parameters, revalidating and recomputing derived constants.
    ///
    /// On error the muscle keeps its previous parameters.
    pub fn set_parameters(&mut self, params: MuscleParameters) -> Result<()> {
        params.validate()?;
        self.derived = DerivedConstants::from_parameters(&params);
        self.curves = Self::curves_for(&params);
        self.tendon = Self::tendon_model_for(&params);
        self.activation_source = Self::activation_source_for(&params);
        self.params = params;
        self.residual_cache.set(None);
        Ok(())
    }

    /// Get the curve set.
    #[must_use]
    pub fn curves(&self) -> &MuscleForceCurves {
        &self.curves
    }

    /// Tendon model in use.
    #[must_use]
    pub fn tendon_model(&self) -> TendonModel {
        self.tendon
    }

    /// Activation source in use.
    #[must_use]
    pub fn activation_source(&self) -> ActivationSource {
        self.activation_source
    }

    /// Fixed fiber width `lopt sin(α_opt)` (m).
    #[must_use]
    pub fn fiber_width(&self) -> f64 {
        self.derived.pennation.width()
    }

    /// Maximum contraction velocity in m/s.
    #[must_use]
    pub fn max_contraction_speed(&self) -> f64 {
        self.derived.max_contraction_speed
    }

    /// Stiffness constant `kT` of the tendon curve.
    #[must_use]
    pub fn tendon_stiffness_constant(&self) -> f64 {
        self.curves.tendon.stiffness()
    }

    // ------------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------------

    /// Create the default state with exactly the slots this muscle uses.
    ///
    /// The musculotendon length is `lTs + lopt cos(α_opt)`, where a rigid
    /// tendon puts the fiber at optimal length.
    #[must_use]
    pub fn default_state(&self) -> MuscleState {
        let length = self.params.tendon_slack_length
            + self.params.optimal_fiber_length * self.params.pennation_angle_at_optimal.cos();
        let activation = match self.activation_source {
            ActivationSource::State => Some(self.params.default_activation),
            ActivationSource::Excitation => None,
        };
        let tendon_force = match self.tendon {
            TendonModel::Compliant => Some(self.params.default_normalized_tendon_force),
            TendonModel::Rigid => None,
        };
        MuscleState::with_slots(length, activation, tendon_force)
    }

    /// Copy the state variables back into the default parameters.
    pub fn set_defaults_from_state(&mut self, state: &MuscleState) -> Result<()> {
        let mut params = self.params.clone();
        if self.activation_source == ActivationSource::State {
            params.default_activation = self.activation(state)?;
        }
        if self.tendon == TendonModel::Compliant {
            params.default_normalized_tendon_force = self.normalized_tendon_force_state(state)?;
        }
        self.set_parameters(params)
    }

    /// Activation used by the model.
    ///
    /// Returns the excitation when activation dynamics are ignored.
    pub fn activation(&self, state: &MuscleState) -> Result<f64> {
        match self.activation_source {
            ActivationSource::State => state
                .activation()
                .ok_or(MuscleError::MissingState(ACTIVATION_STATE_NAME)),
            ActivationSource::Excitation => Ok(state.excitation()),
        }
    }

    /// Set the activation; sets the excitation when activation dynamics are ignored.
    pub fn set_activation(&self, state: &mut MuscleState, activation: f64) -> Result<()> {
        match self.activation_source {
            ActivationSource::State => state.set_activation(activation),
            ActivationSource::Excitation => {
                state.set_excitation(activation);
                Ok(())
            }
        }
    }

    fn normalized_tendon_force_state(&self, state: &MuscleState) -> Result<f64> {
        state
            .normalized_tendon_force()
            .ok_or(MuscleError::MissingState(NORMALIZED_TENDON_FORCE_STATE_NAME))
    }

    // ------------------------------------------------------------------------
    // Info bundles
    // ------------------------------------------------------------------------

    /// Tendon and fiber lengths, pennation and force-length multipliers.
    pub fn length_info(&self, state: &MuscleState) -> Result<LengthInfo> {
        let slack = self.params.tendon_slack_length;
        let normalized_tendon_length = match self.tendon {
            TendonModel::Rigid => 1.0,
            TendonModel::Compliant => self
                .curves
                .tendon
                .inverse(self.normalized_tendon_force_state(state)?),
        };
        let tendon_length = slack * normalized_tendon_length;

        // Warn only; the formulas below are used unchanged while buckling.
        let buckling = tendon_length < slack;
        if buckling {
            warn!(
                muscle = %self.name,
                tendon_length,
                tendon_slack_length = slack,
                "muscle is buckling (tendon length < tendon slack length)"
            );
        }

        let pennation = &self.derived.pennation;
        let fiber_length_along_tendon = state.length() - tendon_length;
        let fiber_length = pennation.fiber_length(fiber_length_along_tendon);
        let normalized_fiber_length = fiber_length / self.params.optimal_fiber_length;
        let sin_pennation_angle = pennation.sin_angle(fiber_length);

        Ok(LengthInfo {
            tendon_length,
            normalized_tendon_length,
            tendon_strain: normalized_tendon_length - 1.0,
            fiber_length_along_tendon,
            fiber_length,
            normalized_fiber_length,
            pennation_angle: sin_pennation_angle.asin(),
            sin_pennation_angle,
            cos_pennation_angle: FixedWidthPennation::cos_angle(
                fiber_length_along_tendon,
                fiber_length,
            ),
            active_force_length_multiplier: self.curves.active_fl.evaluate(normalized_fiber_length),
            passive_force_multiplier: self.curves.passive_fl.evaluate(normalized_fiber_length),
            buckling,
        })
    }

    /// Fiber and tendon velocities and the force-velocity multiplier.
    pub fn velocity_info(&self, state: &MuscleState, length: &LengthInfo) -> Result<VelocityInfo> {
        let speed = state.lengthening_speed();

        let (normalized_tendon_velocity, fiber_velocity_along_tendon) = match self.tendon {
            // lMT = lT + lM cos(α) and w = lM sin(α) with lT fixed give
            // vM = vMT cos(α).
            TendonModel::Rigid => (0.0, speed),
            TendonModel::Compliant => {
                let force_rate = state.normalized_tendon_force_derivative().ok_or(
                    MuscleError::MissingState(NORMALIZED_TENDON_FORCE_DERIVATIVE_NAME),
                )?;
                let normalized_tendon_velocity = self
                    .curves
                    .tendon
                    .inverse_derivative(force_rate, length.normalized_tendon_length);
                let tendon_velocity = self.params.tendon_slack_length * normalized_tendon_velocity;
                (normalized_tendon_velocity, speed - tendon_velocity)
            }
        };

        let tendon_velocity = self.params.tendon_slack_length * normalized_tendon_velocity;
        let fiber_velocity = fiber_velocity_along_tendon * length.cos_pennation_angle;
        let normalized_fiber_velocity = fiber_velocity / self.derived.max_contraction_speed;

        Ok(VelocityInfo {
            tendon_velocity,
            normalized_tendon_velocity,
            fiber_velocity,
            fiber_velocity_along_tendon,
            normalized_fiber_velocity,
            pennation_angular_velocity: self.derived.pennation.angular_velocity(
                fiber_velocity,
                length.fiber_length,
                length.fiber_length_along_tendon,
            ),
            force_velocity_multiplier: self.curves.fv.evaluate(normalized_fiber_velocity),
        })
    }

    /// Forces, stiffnesses and powers.
    pub fn dynamics_info(
        &self,
        state: &MuscleState,
        length: &LengthInfo,
        velocity: &VelocityInfo,
    ) -> Result<DynamicsInfo> {
        let activation = self.activation(state)?;
        let max_force = self.params.max_isometric_force;

        let active = max_force
            * activation
            * length.active_force_length_multiplier
            * velocity.force_velocity_multiplier;
        let conservative = max_force * length.passive_force_multiplier;
        let mut non_conservative =
            max_force * self.params.fiber_damping * velocity.normalized_fiber_velocity;
        let mut fiber_force = active + conservative + non_conservative;

        // A rigid tendon cannot push. Saturate the damping element so the total
        // fiber force is never compressive.
        if self.tendon == TendonModel::Rigid && fiber_force < 0.0 {
            fiber_force = 0.0;
            non_conservative = -active - conservative;
        }

        let cos = length.cos_pennation_angle;
        let normalized_fiber_force = fiber_force / max_force;
        let fiber_force_along_tendon = fiber_force * cos;

        let (normalized_tendon_force, tendon_force) = match self.tendon {
            TendonModel::Rigid => (normalized_fiber_force * cos, fiber_force_along_tendon),
            TendonModel::Compliant => {
                let normalized = self.normalized_tendon_force_state(state)?;
                (normalized, max_force * normalized)
            }
        };

        let fiber_stiffness = self.fiber_stiffness(
            activation,
            length.normalized_fiber_length,
            velocity.force_velocity_multiplier,
        );
        let fiber_stiffness_along_tendon =
            self.fiber_stiffness_along_tendon(length, fiber_force, fiber_stiffness);

        let (tendon_stiffness, muscle_stiffness) = match self.tendon {
            TendonModel::Rigid => (f64::INFINITY, fiber_stiffness_along_tendon),
            TendonModel::Compliant => {
                let tendon_stiffness = max_force / self.params.tendon_slack_length
                    * self
                        .curves
                        .tendon
                        .derivative(length.normalized_tendon_length);
                (
                    tendon_stiffness,
                    series_stiffness(fiber_stiffness_along_tendon, tendon_stiffness),
                )
            }
        };

        Ok(DynamicsInfo {
            activation,
            fiber_force,
            active_fiber_force: active,
            conservative_passive_fiber_force: conservative,
            non_conservative_passive_fiber_force: non_conservative,
            passive_fiber_force: conservative + non_conservative,
            normalized_fiber_force,
            fiber_force_along_tendon,
            normalized_tendon_force,
            tendon_force,
            fiber_stiffness,
            fiber_stiffness_along_tendon,
            tendon_stiffness,
            muscle_stiffness,
            fiber_active_power: -(active + non_conservative) * velocity.fiber_velocity,
            fiber_passive_power: -conservative * velocity.fiber_velocity,
            tendon_power: -tendon_force * velocity.tendon_velocity,
            muscle_power: -tendon_force * state.lengthening_speed(),
        })
    }

    /// d(fiber force)/d(fiber length) along the fiber (N/m).
    ///
    /// Damping does not contribute.
    #[must_use]
    pub fn fiber_stiffness(
        &self,
        activation: f64,
        normalized_fiber_length: f64,
        force_velocity_multiplier: f64,
    ) -> f64 {
        let dnorm_dlength = 1.0 / self.params.optimal_fiber_length;
        let d_active =
            dnorm_dlength * self.curves.active_fl.derivative(normalized_fiber_length);
        let d_passive =
            dnorm_dlength * self.curves.passive_fl.derivative(normalized_fiber_length);
        self.params.max_isometric_force
            * (activation * d_active * force_velocity_multiplier + d_passive)
    }

    /// d(fiber force along tendon)/d(fiber length along tendon) (N/m).
    fn fiber_stiffness_along_tendon(
        &self,
        length: &LengthInfo,
        fiber_force: f64,
        fiber_stiffness: f64,
    ) -> f64 {
        let (sin, cos) = (length.sin_pennation_angle, length.cos_pennation_angle);
        let dpenn_dlm = self
            .derived
            .pennation
            .d_angle_d_fiber_length(length.fiber_length);

        // FMAT = FM cos(α), lMAT = lM cos(α), both as functions of lM.
        let dfmat_dlm = fiber_stiffness * cos - fiber_force * sin * dpenn_dlm;
        let dlmat_dlm = cos - length.fiber_length * sin * dpenn_dlm;
        dfmat_dlm / dlmat_dlm
    }

    /// Elastic energy in the fiber and tendon.
    #[must_use]
    pub fn potential_energy_info(&self, length: &LengthInfo) -> PotentialEnergyInfo {
        let max_force = self.params.max_isometric_force;
        let fiber_potential_energy = self
            .curves
            .passive_fl
            .integral(length.normalized_fiber_length)
            * self.params.optimal_fiber_length
            * max_force;
        let tendon_potential_energy = match self.tendon {
            TendonModel::Rigid => 0.0,
            TendonModel::Compliant => {
                self.curves
                    .tendon
                    .integral(length.normalized_tendon_length)
                    * self.params.tendon_slack_length
                    * max_force
            }
        };
        PotentialEnergyInfo {
            fiber_potential_energy,
            tendon_potential_energy,
            muscle_potential_energy: fiber_potential_energy + tendon_potential_energy,
        }
    }

    /// Compute all four bundles in dependency order.
    pub fn evaluate(&self, state: &MuscleState) -> Result<MuscleEvaluation> {
        let length = self.length_info(state)?;
        let velocity = self.velocity_info(state, &length)?;
        let dynamics = self.dynamics_info(state, &length, &velocity)?;
        let potential_energy = self.potential_energy_info(&length);
        Ok(MuscleEvaluation {
            length,
            velocity,
            dynamics,
            potential_energy,
        })
    }

    // ------------------------------------------------------------------------
    // Host interface
    // ------------------------------------------------------------------------

    /// Force applied along the path: the tendon force (N).
    pub fn actuation(&self, state: &MuscleState) -> Result<f64> {
        Ok(self.evaluate(state)?.dynamics.tendon_force)
    }

    /// Time derivatives of the state variables.
    ///
    /// The tendon force derivative is the externally supplied estimate; it is
    /// not computed from the dynamics.
    pub fn state_derivatives(&self, state: &MuscleState) -> Result<StateDerivatives> {
        let activation = match self.activation_source {
            ActivationSource::State => Some(
                self.params
                    .activation_dynamics
                    .derivative(state.excitation(), self.activation(state)?),
            ),
            ActivationSource::Excitation => None,
        };
        let normalized_tendon_force = match self.tendon {
            TendonModel::Compliant => Some(state.normalized_tendon_force_derivative().ok_or(
                MuscleError::MissingState(NORMALIZED_TENDON_FORCE_DERIVATIVE_NAME),
            )?),
            TendonModel::Rigid => None,
        };
        Ok(StateDerivatives {
            activation,
            normalized_tendon_force,
        })
    }

    /// Residual of the muscle-tendon equilibrium, `FT - FM cos(α)` (N).
    ///
    /// Always recomputed. Identically zero for a rigid tendon.
    pub fn equilibrium_residual(&self, state: &MuscleState) -> Result<f64> {
        let dynamics = self.evaluate(state)?.dynamics;
        Ok(dynamics.tendon_force - dynamics.fiber_force_along_tendon)
    }

    /// Cached equilibrium residual for implicit tendon dynamics (N).
    ///
    /// Recomputed only when the state version differs from the one recorded
    /// at the last fill. Requires a compliant tendon.
    pub fn implicit_residual_normalized_tendon_force(&self, state: &MuscleState) -> Result<f64> {
        if self.tendon == TendonModel::Rigid {
            return Err(MuscleError::MissingState(NORMALIZED_TENDON_FORCE_STATE_NAME));
        }
        if let Some(cache) = self.residual_cache.get() {
            if cache.version == state.version() {
                return Ok(cache.value);
            }
        }

        let value = self.equilibrium_residual(state)?;
        trace!(
            muscle = %self.name,
            version = state.version().raw(),
            residual = value,
            "refilled implicit residual cache"
        );
        self.residual_cache.set(Some(ResidualCache {
            version: state.version(),
            value,
        }));
        Ok(value)
    }

    /// State version the cached residual was computed for, if any.
    #[must_use]
    pub fn cached_residual_version(&self) -> Option<StateVersion> {
        self.residual_cache.get().map(|cache| cache.version)
    }

    /// Drop the cached residual.
    pub fn invalidate_residual_cache(&self) {
        self.residual_cache.set(None);
    }

    /// Residual of the time derivative of the linearized equilibrium (N/s).
    ///
    /// `dFS/dlS vS - dFT/dlT (vMT - vS)` with `S` the fiber projected on the
    /// tendon. Requires a compliant tendon.
    pub fn linearized_equilibrium_derivative_residual(&self, state: &MuscleState) -> Result<f64> {
        if self.tendon == TendonModel::Rigid {
            return Err(MuscleError::MissingState(NORMALIZED_TENDON_FORCE_STATE_NAME));
        }
        let eval = self.evaluate(state)?;
        let along = eval.velocity.fiber_velocity_along_tendon;
        Ok(eval.dynamics.fiber_stiffness_along_tendon * along
            - eval.dynamics.tendon_stiffness * (state.lengthening_speed() - along))
    }

    /// Active fiber force for an inextensible tendon.
    ///
    /// Not available for this curve set; always fails.
    pub fn inextensible_tendon_active_fiber_force(
        &self,
        _state: &MuscleState,
        _activation: f64,
    ) -> Result<f64> {
        Err(MuscleError::unsupported(format!(
            "inextensible tendon active fiber force is not implemented for muscle '{}'",
            self.name
        )))
    }
}
