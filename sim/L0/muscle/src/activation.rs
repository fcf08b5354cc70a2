//! Muscle activation dynamics.
//!
//! Activation dynamics model the delay between neural excitation (the control
//! signal) and muscle activation (the contractile state).
//!
//! # Model
//!
//! ```text
//! f     = 0.5 tanh(b (u - a))            b = 0.1
//! z     = 0.5 + 1.5 a
//! da/dt = [ (f + 0.5) / (τ_act z) + (0.5 - f) z / τ_deact ] (u - a)
//! ```
//!
//! The hyperbolic tangent blends the activation and deactivation rates
//! instead of switching on the sign of `u - a`, so the derivative is
//! continuously differentiable in both `u` and `a`. Gradient-based optimal
//! control solvers rely on that.
//!
//! The host owns integration; this module only evaluates `da/dt`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Steepness of the tanh switch between activation and deactivation.
pub const TANH_STEEPNESS: f64 = 0.1;

/// Time constants of the activation ODE.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ActivationDynamics {
    /// Time constant for activation (rising), in seconds.
    pub tau_activation: f64,

    /// Time constant for deactivation (falling), in seconds.
    pub tau_deactivation: f64,
}

impl Default for ActivationDynamics {
    fn default() -> Self {
        Self {
            tau_activation: 0.015,   // 15 ms
            tau_deactivation: 0.060, // 60 ms
        }
    }
}

impl ActivationDynamics {
    /// Create activation dynamics with custom time constants.
    ///
    /// Range checks happen in [`MuscleParameters::validate`](crate::MuscleParameters::validate).
    #[must_use]
    pub fn new(tau_activation: f64, tau_deactivation: f64) -> Self {
        Self {
            tau_activation,
            tau_deactivation,
        }
    }

    /// Slow-twitch dominant dynamics.
    #[must_use]
    pub fn slow_twitch() -> Self {
        Self {
            tau_activation: 0.020,
            tau_deactivation: 0.080,
        }
    }

    /// Effective rate (1/s) multiplying `u - a`.
    ///
    /// Tends to `1 / (τ_act z)` when `u >> a` and to `z / τ_deact` when `u << a`.
    #[must_use]
    pub fn rate(&self, excitation: f64, activation: f64) -> f64 {
        let z = 0.5 + 1.5 * activation;
        let rate_act = 1.0 / (self.tau_activation * z);
        let rate_deact = z / self.tau_deactivation;
        let f = 0.5 * (TANH_STEEPNESS * (excitation - activation)).tanh();
        rate_act * (f + 0.5) + rate_deact * (0.5 - f)
    }

    /// Compute the activation derivative `da/dt` (1/s).
    ///
    /// Neither input is clamped.
    #[must_use]
    pub fn derivative(&self, excitation: f64, activation: f64) -> f64 {
        self.rate(excitation, activation) * (excitation - activation)
    }
}
