//! Per-muscle dynamic state owned by the host simulation.
//!
//! A [`MuscleState`] carries the kinematic inputs (musculotendon length and
//! lengthening speed), the control (excitation), the optional state variables
//! and the implicit-mode derivative estimate. Which optional slots exist is
//! fixed when the state is created by
//! [`DeGrooteFregly2016Muscle::default_state`](crate::DeGrooteFregly2016Muscle::default_state):
//!
//! | Slot                              | Exists when                      |
//! |-----------------------------------|----------------------------------|
//! | activation                        | activation dynamics not ignored  |
//! | normalized tendon force           | tendon compliance not ignored    |
//! | normalized tendon force derivative| tendon compliance not ignored    |
//!
//! Every mutation stamps the state with a fresh [`StateVersion`]. Caches keyed
//! on the version (the implicit residual) are therefore invalidated by any
//! setter, including setters that write the same value.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{MuscleError, Result};

/// Name of the activation state variable.
pub const ACTIVATION_STATE_NAME: &str = "activation";

/// Name of the normalized tendon force state variable.
pub const NORMALIZED_TENDON_FORCE_STATE_NAME: &str = "normalized_tendon_force";

/// Name of the implicit derivative input for the normalized tendon force.
pub const NORMALIZED_TENDON_FORCE_DERIVATIVE_NAME: &str = "implicitderiv_normalized_tendon_force";

/// Identifier of one snapshot of a [`MuscleState`].
///
/// Versions are drawn from a process-wide counter, so two states that were
/// mutated independently never share a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateVersion(u64);

impl StateVersion {
    /// Raw counter value.
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Thread-safe counter for generating state versions.
struct StateVersionGenerator {
    next: AtomicU64,
}

impl StateVersionGenerator {
    const fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
        }
    }

    fn next(&self) -> StateVersion {
        StateVersion(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

static VERSIONS: StateVersionGenerator = StateVersionGenerator::new();

/// Dynamic state and kinematic inputs of one muscle.
///
/// Equality compares values only; the version stamp is ignored.
#[derive(Debug, Clone)]
pub struct MuscleState {
    length: f64,
    lengthening_speed: f64,
    excitation: f64,
    activation: Option<f64>,
    normalized_tendon_force: Option<f64>,
    normalized_tendon_force_derivative: Option<f64>,
    version: StateVersion,
}

impl PartialEq for MuscleState {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length
            && self.lengthening_speed == other.lengthening_speed
            && self.excitation == other.excitation
            && self.activation == other.activation
            && self.normalized_tendon_force == other.normalized_tendon_force
            && self.normalized_tendon_force_derivative == other.normalized_tendon_force_derivative
    }
}

impl MuscleState {
    /// Create a state with the given optional slots.
    ///
    /// `None` means the slot does not exist. The tendon force derivative slot
    /// exists together with the tendon force slot and starts at zero.
    pub(crate) fn with_slots(
        length: f64,
        activation: Option<f64>,
        normalized_tendon_force: Option<f64>,
    ) -> Self {
        Self {
            length,
            lengthening_speed: 0.0,
            excitation: 0.0,
            activation,
            normalized_tendon_force,
            normalized_tendon_force_derivative: normalized_tendon_force.map(|_| 0.0),
            version: VERSIONS.next(),
        }
    }

    fn touch(&mut self) {
        self.version = VERSIONS.next();
    }

    /// Current version stamp.
    #[must_use]
    pub fn version(&self) -> StateVersion {
        self.version
    }

    /// Musculotendon length (m).
    #[must_use]
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Set the musculotendon length (m).
    pub fn set_length(&mut self, length: f64) {
        self.length = length;
        self.touch();
    }

    /// Musculotendon lengthening speed (m/s). Positive is lengthening.
    #[must_use]
    pub fn lengthening_speed(&self) -> f64 {
        self.lengthening_speed
    }

    /// Set the musculotendon lengthening speed (m/s).
    pub fn set_lengthening_speed(&mut self, speed: f64) {
        self.lengthening_speed = speed;
        self.touch();
    }

    /// Set length and lengthening speed together.
    pub fn set_kinematics(&mut self, length: f64, lengthening_speed: f64) {
        self.length = length;
        self.lengthening_speed = lengthening_speed;
        self.touch();
    }

    /// Neural excitation (control input).
    #[must_use]
    pub fn excitation(&self) -> f64 {
        self.excitation
    }

    /// Set the neural excitation.
    pub fn set_excitation(&mut self, excitation: f64) {
        self.excitation = excitation;
        self.touch();
    }

    /// Activation state variable, if it exists.
    #[must_use]
    pub fn activation(&self) -> Option<f64> {
        self.activation
    }

    /// Set the activation state variable.
    pub fn set_activation(&mut self, activation: f64) -> Result<()> {
        let slot = self
            .activation
            .as_mut()
            .ok_or(MuscleError::MissingState(ACTIVATION_STATE_NAME))?;
        *slot = activation;
        self.touch();
        Ok(())
    }

    /// Normalized tendon force state variable, if it exists.
    #[must_use]
    pub fn normalized_tendon_force(&self) -> Option<f64> {
        self.normalized_tendon_force
    }

    /// Set the normalized tendon force state variable.
    pub fn set_normalized_tendon_force(&mut self, force: f64) -> Result<()> {
        let slot = self
            .normalized_tendon_force
            .as_mut()
            .ok_or(MuscleError::MissingState(NORMALIZED_TENDON_FORCE_STATE_NAME))?;
        *slot = force;
        self.touch();
        Ok(())
    }

    /// Externally supplied estimate of d(normalized tendon force)/dt.
    #[must_use]
    pub fn normalized_tendon_force_derivative(&self) -> Option<f64> {
        self.normalized_tendon_force_derivative
    }

    /// Supply the estimate of d(normalized tendon force)/dt (1/s).
    ///
    /// The solver treats this as an unknown; the equilibrium residual reports
    /// how consistent it is.
    pub fn set_normalized_tendon_force_derivative(&mut self, derivative: f64) -> Result<()> {
        let slot = self
            .normalized_tendon_force_derivative
            .as_mut()
            .ok_or(MuscleError::MissingState(NORMALIZED_TENDON_FORCE_DERIVATIVE_NAME))?;
        *slot = derivative;
        self.touch();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_slots_reject_writes() {
        let mut state = MuscleState::with_slots(0.3, None, None);

        assert_eq!(
            state.set_activation(0.5),
            Err(MuscleError::MissingState(ACTIVATION_STATE_NAME))
        );
        assert_eq!(
            state.set_normalized_tendon_force(0.5),
            Err(MuscleError::MissingState(NORMALIZED_TENDON_FORCE_STATE_NAME))
        );
        assert!(state.set_normalized_tendon_force_derivative(1.0).is_err());
        assert_eq!(state.activation(), None);
        assert_eq!(state.normalized_tendon_force_derivative(), None);
    }

    #[test]
    fn test_tendon_slot_brings_derivative_slot() {
        let mut state = MuscleState::with_slots(0.3, Some(0.5), Some(0.5));

        assert_eq!(state.normalized_tendon_force_derivative(), Some(0.0));
        assert!(state.set_normalized_tendon_force_derivative(2.0).is_ok());
        assert_eq!(state.normalized_tendon_force_derivative(), Some(2.0));
    }

    #[test]
    fn test_every_setter_bumps_version() {
        let mut state = MuscleState::with_slots(0.3, Some(0.5), Some(0.5));
        let mut seen = vec![state.version()];

        state.set_length(0.3);
        seen.push(state.version());
        state.set_lengthening_speed(0.0);
        seen.push(state.version());
        state.set_kinematics(0.31, 0.1);
        seen.push(state.version());
        state.set_excitation(0.2);
        seen.push(state.version());
        assert!(state.set_activation(0.5).is_ok());
        seen.push(state.version());
        assert!(state.set_normalized_tendon_force(0.5).is_ok());
        seen.push(state.version());
        assert!(state.set_normalized_tendon_force_derivative(0.0).is_ok());
        seen.push(state.version());

        for (i, a) in seen.iter().enumerate() {
            for b in &seen[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_failed_write_keeps_version() {
        let mut state = MuscleState::with_slots(0.3, None, None);
        let before = state.version();

        assert!(state.set_activation(0.5).is_err());
        assert_eq!(state.version(), before);
    }

    #[test]
    fn test_independent_states_have_distinct_versions() {
        let a = MuscleState::with_slots(0.3, None, None);
        let b = MuscleState::with_slots(0.3, None, None);
        assert_ne!(a.version(), b.version());
    }

    #[test]
    fn test_equality_ignores_version() {
        let mut a = MuscleState::with_slots(0.3, Some(0.1), Some(0.5));
        let mut b = MuscleState::with_slots(0.3, Some(0.1), Some(0.5));
        assert_ne!(a.version(), b.version());
        assert_eq!(a, b);

        a.set_activation(0.4).unwrap();
        assert_ne!(a, b);
        b.set_activation(0.4).unwrap();
        assert_eq!(a, b);
    }
}
