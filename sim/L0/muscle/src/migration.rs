//! Replacing legacy muscles with DeGroote-Fregly muscles.
//!
//! Legacy muscle definitions arrive as a [`LegacyMuscle`] variant. Each
//! supported variant maps its activation and tendon parameters onto
//! [`MuscleParameters`]; the geometry shared by all variants lives in
//! [`LegacyMuscleCommon`].
//!
//! Legacy fiber damping is not read. Migrated muscles have zero fiber
//! damping and a default normalized tendon force of 0.5.

use tracing::{debug, warn};

use crate::activation::ActivationDynamics;
use crate::error::{MuscleError, Result};
use crate::muscle::DeGrooteFregly2016Muscle;
use crate::params::MuscleParameters;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default normalized tendon force given to migrated muscles.
pub const MIGRATED_DEFAULT_NORMALIZED_TENDON_FORCE: f64 = 0.5;

/// Parameters every legacy muscle type provides.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LegacyMuscleCommon {
    /// Muscle name, kept by the replacement.
    pub name: String,
    /// Maximum isometric force (N).
    pub max_isometric_force: f64,
    /// Optimal fiber length (m).
    pub optimal_fiber_length: f64,
    /// Tendon slack length (m).
    pub tendon_slack_length: f64,
    /// Pennation angle at optimal fiber length (radians).
    pub pennation_angle_at_optimal: f64,
    /// Maximum contraction velocity (optimal fiber lengths per second).
    pub max_contraction_velocity: f64,
    /// Rigid tendon flag.
    pub ignore_tendon_compliance: bool,
    /// Excitation-as-activation flag.
    pub ignore_activation_dynamics: bool,
}

impl Default for LegacyMuscleCommon {
    fn default() -> Self {
        let params = MuscleParameters::default();
        Self {
            name: String::new(),
            max_isometric_force: params.max_isometric_force,
            optimal_fiber_length: params.optimal_fiber_length,
            tendon_slack_length: params.tendon_slack_length,
            pennation_angle_at_optimal: params.pennation_angle_at_optimal,
            max_contraction_velocity: params.max_contraction_velocity,
            ignore_tendon_compliance: false,
            ignore_activation_dynamics: false,
        }
    }
}

/// A muscle definition from an older model.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type"))]
pub enum LegacyMuscle {
    /// Millard 2012 equilibrium muscle.
    Millard2012 {
        /// Shared parameters.
        common: LegacyMuscleCommon,
        /// Default activation.
        default_activation: f64,
        /// Activation time constant (s).
        activation_time_constant: f64,
        /// Deactivation time constant (s).
        deactivation_time_constant: f64,
        /// Strain of the tendon curve at one normalized force.
        tendon_strain_at_one_norm_force: f64,
    },

    /// Thelen 2003 muscle.
    Thelen2003 {
        /// Shared parameters.
        common: LegacyMuscleCommon,
        /// Default activation.
        default_activation: f64,
        /// Activation time constant (s).
        activation_time_constant: f64,
        /// Deactivation time constant (s).
        deactivation_time_constant: f64,
        /// Tendon strain at maximum isometric force.
        fmax_tendon_strain: f64,
    },

    /// Any other muscle type; has no mapping.
    Other {
        /// Shared parameters.
        common: LegacyMuscleCommon,
        /// Type name, used in reports.
        kind: String,
    },
}

impl LegacyMuscle {
    /// Shared parameters.
    #[must_use]
    pub fn common(&self) -> &LegacyMuscleCommon {
        match self {
            Self::Millard2012 { common, .. }
            | Self::Thelen2003 { common, .. }
            | Self::Other { common, .. } => common,
        }
    }

    /// Muscle name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.common().name
    }

    /// Type name of the legacy muscle.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Millard2012 { .. } => "Millard2012EquilibriumMuscle",
            Self::Thelen2003 { .. } => "Thelen2003Muscle",
            Self::Other { kind, .. } => kind,
        }
    }

    /// Parameters of the replacement muscle, or `None` if the type has no mapping.
    #[must_use]
    pub fn to_parameters(&self) -> Option<MuscleParameters> {
        let (default_activation, tau_act, tau_deact, strain) = match *self {
            Self::Millard2012 {
                default_activation,
                activation_time_constant,
                deactivation_time_constant,
                tendon_strain_at_one_norm_force,
                ..
            } => (
                default_activation,
                activation_time_constant,
                deactivation_time_constant,
                tendon_strain_at_one_norm_force,
            ),
            Self::Thelen2003 {
                default_activation,
                activation_time_constant,
                deactivation_time_constant,
                fmax_tendon_strain,
                ..
            } => (
                default_activation,
                activation_time_constant,
                deactivation_time_constant,
                fmax_tendon_strain,
            ),
            Self::Other { .. } => return None,
        };

        let common = self.common();
        Some(MuscleParameters {
            max_isometric_force: common.max_isometric_force,
            optimal_fiber_length: common.optimal_fiber_length,
            tendon_slack_length: common.tendon_slack_length,
            pennation_angle_at_optimal: common.pennation_angle_at_optimal,
            max_contraction_velocity: common.max_contraction_velocity,
            activation_dynamics: ActivationDynamics::new(tau_act, tau_deact),
            default_activation,
            default_normalized_tendon_force: MIGRATED_DEFAULT_NORMALIZED_TENDON_FORCE,
            fiber_damping: 0.0,
            tendon_strain_at_one_norm_force: strain,
            ignore_tendon_compliance: common.ignore_tendon_compliance,
            ignore_activation_dynamics: common.ignore_activation_dynamics,
            ..Default::default()
        })
    }
}

/// Outcome of [`replace_muscles`].
#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    /// Replacement muscles, in input order.
    pub replaced: Vec<DeGrooteFregly2016Muscle>,
    /// Names of unsupported muscles that were left out.
    pub skipped: Vec<String>,
}

impl MigrationReport {
    /// Check if every input muscle was replaced.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Replace legacy muscles with DeGroote-Fregly muscles.
///
/// Unsupported types are skipped when `allow_unsupported` is set and fail the
/// whole migration otherwise. Mapped parameters are validated; the first
/// invalid muscle fails the migration.
pub fn replace_muscles(
    muscles: &[LegacyMuscle],
    allow_unsupported: bool,
) -> Result<MigrationReport> {
    let mut report = MigrationReport::default();

    for legacy in muscles {
        let Some(params) = legacy.to_parameters() else {
            if !allow_unsupported {
                return Err(MuscleError::UnsupportedLegacyMuscle {
                    name: legacy.name().to_string(),
                    kind: legacy.kind().to_string(),
                });
            }
            warn!(
                muscle = legacy.name(),
                kind = legacy.kind(),
                "skipping unsupported muscle"
            );
            report.skipped.push(legacy.name().to_string());
            continue;
        };

        let muscle = DeGrooteFregly2016Muscle::new(params)?.with_name(legacy.name());
        debug!(
            muscle = legacy.name(),
            kind = legacy.kind(),
            "replaced muscle"
        );
        report.replaced.push(muscle);
    }

    Ok(report)
}
