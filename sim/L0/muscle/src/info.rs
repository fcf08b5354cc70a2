//! Derived quantities computed on every evaluation.
//!
//! The bundles form a strict chain; each depends only on the ones before it
//! plus the muscle parameters:
//!
//! ```text
//! LengthInfo ──► VelocityInfo ──► DynamicsInfo
//!     │
//!     └──────────► PotentialEnergyInfo
//! ```
//!
//! None of them is persisted across time steps.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Length and pennation geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LengthInfo {
    /// Tendon length (m).
    pub tendon_length: f64,
    /// Tendon length / tendon slack length.
    pub normalized_tendon_length: f64,
    /// Normalized tendon length - 1.
    pub tendon_strain: f64,
    /// Fiber length projected on the tendon (m).
    pub fiber_length_along_tendon: f64,
    /// Fiber length (m).
    pub fiber_length: f64,
    /// Fiber length / optimal fiber length.
    pub normalized_fiber_length: f64,
    /// Pennation angle (radians).
    pub pennation_angle: f64,
    /// Sine of the pennation angle.
    pub sin_pennation_angle: f64,
    /// Cosine of the pennation angle.
    pub cos_pennation_angle: f64,
    /// Active force-length multiplier.
    pub active_force_length_multiplier: f64,
    /// Passive force-length multiplier.
    pub passive_force_multiplier: f64,
    /// Tendon length is below tendon slack length.
    pub buckling: bool,
}

/// Fiber and tendon velocities.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VelocityInfo {
    /// Tendon lengthening velocity (m/s).
    pub tendon_velocity: f64,
    /// Tendon velocity / tendon slack length (1/s).
    pub normalized_tendon_velocity: f64,
    /// Fiber lengthening velocity (m/s).
    pub fiber_velocity: f64,
    /// Fiber velocity projected on the tendon (m/s).
    pub fiber_velocity_along_tendon: f64,
    /// Fiber velocity / (max contraction velocity * optimal fiber length).
    pub normalized_fiber_velocity: f64,
    /// Rate of change of the pennation angle (rad/s).
    pub pennation_angular_velocity: f64,
    /// Force-velocity multiplier.
    pub force_velocity_multiplier: f64,
}

/// Forces, stiffnesses and powers.
///
/// Powers are positive when the muscle does work on the environment.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DynamicsInfo {
    /// Activation used for this evaluation.
    pub activation: f64,

    /// Total fiber force (N).
    pub fiber_force: f64,
    /// Active fiber force (N).
    pub active_fiber_force: f64,
    /// Conservative (elastic) passive fiber force (N).
    pub conservative_passive_fiber_force: f64,
    /// Non-conservative (damping) passive fiber force (N).
    pub non_conservative_passive_fiber_force: f64,
    /// Sum of both passive components (N).
    pub passive_fiber_force: f64,
    /// Fiber force / max isometric force.
    pub normalized_fiber_force: f64,
    /// Fiber force projected on the tendon (N).
    pub fiber_force_along_tendon: f64,
    /// Tendon force / max isometric force.
    pub normalized_tendon_force: f64,
    /// Tendon force (N).
    pub tendon_force: f64,

    /// d(fiber force)/d(fiber length) (N/m).
    pub fiber_stiffness: f64,
    /// d(fiber force along tendon)/d(fiber length along tendon) (N/m).
    pub fiber_stiffness_along_tendon: f64,
    /// d(tendon force)/d(tendon length) (N/m); infinite for a rigid tendon.
    pub tendon_stiffness: f64,
    /// Stiffness of the whole musculotendon actuator (N/m).
    pub muscle_stiffness: f64,

    /// Power of the active and damping elements (W).
    pub fiber_active_power: f64,
    /// Power of the conservative passive element (W).
    pub fiber_passive_power: f64,
    /// Tendon power (W).
    pub tendon_power: f64,
    /// Power delivered at the musculotendon ends (W).
    pub muscle_power: f64,
}

/// Elastic energy stored in fiber and tendon.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PotentialEnergyInfo {
    /// Energy in the passive fiber element (J).
    pub fiber_potential_energy: f64,
    /// Energy in the tendon (J); zero for a rigid tendon.
    pub tendon_potential_energy: f64,
    /// Sum of fiber and tendon energy (J).
    pub muscle_potential_energy: f64,
}

/// All four bundles, computed once in dependency order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MuscleEvaluation {
    /// Length info.
    pub length: LengthInfo,
    /// Velocity info.
    pub velocity: VelocityInfo,
    /// Dynamics info.
    pub dynamics: DynamicsInfo,
    /// Potential energy info.
    pub potential_energy: PotentialEnergyInfo,
}

/// Time derivatives of the state variables that exist.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StateDerivatives {
    /// da/dt, if activation is a state.
    pub activation: Option<f64>,
    /// d(normalized tendon force)/dt, if tendon force is a state.
    pub normalized_tendon_force: Option<f64>,
}
