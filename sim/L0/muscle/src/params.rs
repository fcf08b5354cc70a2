//! Muscle parameters and their validation.
//!
//! Parameters are validated once, when a [`DeGrooteFregly2016Muscle`] is
//! built. Evaluation never re-checks them.
//!
//! [`DeGrooteFregly2016Muscle`]: crate::DeGrooteFregly2016Muscle

use std::f64::consts::FRAC_PI_2;

use crate::activation::ActivationDynamics;
use crate::error::{MuscleError, Result};
use crate::pennation::FixedWidthPennation;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Smallest margin kept between the pennation angle and π/2.
const PENNATION_MARGIN: f64 = 1e-14;

/// Configuration parameters for a DeGroote-Fregly muscle.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MuscleParameters {
    /// Maximum isometric force (N).
    pub max_isometric_force: f64,

    /// Optimal fiber length (m).
    pub optimal_fiber_length: f64,

    /// Tendon slack length (m).
    pub tendon_slack_length: f64,

    /// Pennation angle at optimal fiber length (radians), in [0, π/2).
    pub pennation_angle_at_optimal: f64,

    /// Maximum contraction velocity (optimal fiber lengths per second).
    pub max_contraction_velocity: f64,

    /// Activation and deactivation time constants.
    pub activation_dynamics: ActivationDynamics,

    /// Activation in the default state (> 0).
    pub default_activation: f64,

    /// Normalized tendon force in the default state, in [0, 5].
    pub default_normalized_tendon_force: f64,

    /// Horizontal scale of the active force-length curve (>= 1).
    pub active_force_width_scale: f64,

    /// Linear damping of the fiber (>= 0).
    pub fiber_damping: f64,

    /// Tendon strain at one normalized force (> 0).
    pub tendon_strain_at_one_norm_force: f64,

    /// Treat the tendon as rigid; no tendon force state exists.
    pub ignore_tendon_compliance: bool,

    /// Use excitation directly as activation; no activation state exists.
    pub ignore_activation_dynamics: bool,

    /// Zero the passive fiber force curve.
    pub ignore_passive_fiber_force: bool,
}

impl Default for MuscleParameters {
    fn default() -> Self {
        Self {
            max_isometric_force: 1000.0,  // 1000 N
            optimal_fiber_length: 0.10,   // 10 cm
            tendon_slack_length: 0.20,    // 20 cm
            pennation_angle_at_optimal: 0.0,
            max_contraction_velocity: 10.0, // 10 L_opt/s
            activation_dynamics: ActivationDynamics::default(),
            default_activation: 0.5,
            default_normalized_tendon_force: 0.5,
            active_force_width_scale: 1.0,
            fiber_damping: 0.01,
            tendon_strain_at_one_norm_force: 0.049,
            ignore_tendon_compliance: false,
            ignore_activation_dynamics: false,
            ignore_passive_fiber_force: false,
        }
    }
}

impl MuscleParameters {
    /// Biceps-like muscle.
    #[must_use]
    pub fn biceps() -> Self {
        Self {
            max_isometric_force: 700.0,
            optimal_fiber_length: 0.116,
            tendon_slack_length: 0.272,
            ..Default::default()
        }
    }

    /// Gastrocnemius-like muscle (pennate, long Achilles tendon).
    #[must_use]
    pub fn gastrocnemius() -> Self {
        Self {
            max_isometric_force: 1500.0,
            optimal_fiber_length: 0.055,
            tendon_slack_length: 0.400,
            pennation_angle_at_optimal: 0.297, // ~17 degrees
            max_contraction_velocity: 12.0,
            ..Default::default()
        }
    }

    /// Soleus-like muscle (strongly pennate, slow-twitch dominant).
    #[must_use]
    pub fn soleus() -> Self {
        Self {
            max_isometric_force: 3500.0,
            optimal_fiber_length: 0.030,
            tendon_slack_length: 0.268,
            pennation_angle_at_optimal: 0.436, // ~25 degrees
            max_contraction_velocity: 6.0,
            activation_dynamics: ActivationDynamics::slow_twitch(),
            ..Default::default()
        }
    }

    /// Set the maximum isometric force.
    #[must_use]
    pub fn with_max_isometric_force(mut self, force: f64) -> Self {
        self.max_isometric_force = force;
        self
    }

    /// Set the optimal fiber length.
    #[must_use]
    pub fn with_optimal_fiber_length(mut self, length: f64) -> Self {
        self.optimal_fiber_length = length;
        self
    }

    /// Set the tendon slack length.
    #[must_use]
    pub fn with_tendon_slack_length(mut self, length: f64) -> Self {
        self.tendon_slack_length = length;
        self
    }

    /// Set the pennation angle at optimal fiber length.
    #[must_use]
    pub fn with_pennation_angle_at_optimal(mut self, angle: f64) -> Self {
        self.pennation_angle_at_optimal = angle;
        self
    }

    /// Set the maximum contraction velocity.
    #[must_use]
    pub fn with_max_contraction_velocity(mut self, velocity: f64) -> Self {
        self.max_contraction_velocity = velocity;
        self
    }

    /// Set the activation dynamics.
    #[must_use]
    pub fn with_activation_dynamics(mut self, dynamics: ActivationDynamics) -> Self {
        self.activation_dynamics = dynamics;
        self
    }

    /// Set the fiber damping.
    #[must_use]
    pub fn with_fiber_damping(mut self, damping: f64) -> Self {
        self.fiber_damping = damping;
        self
    }

    /// Set the active force-length width scale.
    #[must_use]
    pub fn with_active_force_width_scale(mut self, scale: f64) -> Self {
        self.active_force_width_scale = scale;
        self
    }

    /// Set the tendon strain at one normalized force.
    #[must_use]
    pub fn with_tendon_strain_at_one_norm_force(mut self, strain: f64) -> Self {
        self.tendon_strain_at_one_norm_force = strain;
        self
    }

    /// Enable or disable the rigid tendon model.
    #[must_use]
    pub fn with_rigid_tendon(mut self, rigid: bool) -> Self {
        self.ignore_tendon_compliance = rigid;
        self
    }

    /// Enable or disable activation dynamics.
    #[must_use]
    pub fn with_ignore_activation_dynamics(mut self, ignore: bool) -> Self {
        self.ignore_activation_dynamics = ignore;
        self
    }

    /// Enable or disable the passive fiber force.
    #[must_use]
    pub fn with_ignore_passive_fiber_force(mut self, ignore: bool) -> Self {
        self.ignore_passive_fiber_force = ignore;
        self
    }

    /// Check every parameter against its validity range.
    pub fn validate(&self) -> Result<()> {
        check(
            "max_isometric_force",
            self.max_isometric_force,
            self.max_isometric_force > 0.0,
            "must be greater than zero",
        )?;
        check(
            "optimal_fiber_length",
            self.optimal_fiber_length,
            self.optimal_fiber_length > 0.0,
            "must be greater than zero",
        )?;
        check(
            "tendon_slack_length",
            self.tendon_slack_length,
            self.tendon_slack_length > 0.0,
            "must be greater than zero",
        )?;
        check(
            "pennation_angle_at_optimal",
            self.pennation_angle_at_optimal,
            (0.0..=FRAC_PI_2 - PENNATION_MARGIN).contains(&self.pennation_angle_at_optimal),
            "must be in the range [0, pi/2)",
        )?;
        check(
            "max_contraction_velocity",
            self.max_contraction_velocity,
            self.max_contraction_velocity > 0.0,
            "must be greater than zero",
        )?;
        check(
            "activation_time_constant",
            self.activation_dynamics.tau_activation,
            self.activation_dynamics.tau_activation > 0.0,
            "must be greater than zero",
        )?;
        check(
            "deactivation_time_constant",
            self.activation_dynamics.tau_deactivation,
            self.activation_dynamics.tau_deactivation > 0.0,
            "must be greater than zero",
        )?;
        check(
            "default_activation",
            self.default_activation,
            self.default_activation > 0.0,
            "must be greater than zero",
        )?;
        check(
            "default_normalized_tendon_force",
            self.default_normalized_tendon_force,
            (0.0..=5.0).contains(&self.default_normalized_tendon_force),
            "must be in the range [0, 5]",
        )?;
        check(
            "active_force_width_scale",
            self.active_force_width_scale,
            self.active_force_width_scale >= 1.0,
            "must be greater than or equal to 1",
        )?;
        check(
            "fiber_damping",
            self.fiber_damping,
            self.fiber_damping >= 0.0,
            "must be greater than or equal to zero",
        )?;
        check(
            "tendon_strain_at_one_norm_force",
            self.tendon_strain_at_one_norm_force,
            self.tendon_strain_at_one_norm_force > 0.0,
            "must be greater than zero",
        )
    }
}

/// NaN fails every comparison above, so it is rejected too.
fn check(name: &'static str, value: f64, ok: bool, reason: &'static str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(MuscleError::invalid_parameter(name, value, reason))
    }
}

/// Constants derived from parameters, recomputed only when parameters change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DerivedConstants {
    /// Fixed-width geometry; caches `w` and `w²`.
    pub pennation: FixedWidthPennation,
    /// Maximum contraction velocity in m/s.
    pub max_contraction_speed: f64,
}

impl DerivedConstants {
    pub(crate) fn from_parameters(params: &MuscleParameters) -> Self {
        Self {
            pennation: FixedWidthPennation::from_optimal(
                params.optimal_fiber_length,
                params.pennation_angle_at_optimal,
            ),
            max_contraction_speed: params.max_contraction_velocity * params.optimal_fiber_length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_is_valid() {
        assert!(MuscleParameters::default().validate().is_ok());
        assert!(MuscleParameters::biceps().validate().is_ok());
        assert!(MuscleParameters::gastrocnemius().validate().is_ok());
        assert!(MuscleParameters::soleus().validate().is_ok());
    }

    #[test]
    fn test_rejects_pennation_at_right_angle() {
        let params = MuscleParameters::default().with_pennation_angle_at_optimal(FRAC_PI_2);
        assert!(matches!(
            params.validate(),
            Err(MuscleError::InvalidParameter {
                name: "pennation_angle_at_optimal",
                ..
            })
        ));

        let negative = MuscleParameters::default().with_pennation_angle_at_optimal(-0.1);
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let cases = [
            MuscleParameters::default()
                .with_activation_dynamics(ActivationDynamics::new(0.0, 0.06)),
            MuscleParameters::default()
                .with_activation_dynamics(ActivationDynamics::new(0.015, -1.0)),
            MuscleParameters {
                default_activation: 0.0,
                ..Default::default()
            },
            MuscleParameters {
                default_normalized_tendon_force: 5.5,
                ..Default::default()
            },
            MuscleParameters {
                default_normalized_tendon_force: -0.1,
                ..Default::default()
            },
            MuscleParameters::default().with_active_force_width_scale(0.9),
            MuscleParameters::default().with_fiber_damping(-0.01),
            MuscleParameters::default().with_tendon_strain_at_one_norm_force(0.0),
            MuscleParameters::default().with_optimal_fiber_length(f64::NAN),
        ];

        for params in cases {
            assert!(params.validate().is_err(), "accepted {params:?}");
        }
    }

    #[test]
    fn test_boundary_values_accepted() {
        let params = MuscleParameters {
            default_normalized_tendon_force: 5.0,
            active_force_width_scale: 1.0,
            fiber_damping: 0.0,
            ..Default::default()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_derived_constants() {
        let params = MuscleParameters::gastrocnemius();
        let derived = DerivedConstants::from_parameters(&params);

        assert_relative_eq!(
            derived.pennation.width(),
            0.055 * 0.297_f64.sin(),
            epsilon = 1e-15
        );
        assert_relative_eq!(derived.max_contraction_speed, 12.0 * 0.055, epsilon = 1e-15);
    }
}
