//! Closed-form force-length, force-velocity and tendon curves.
//!
//! Every curve is a smooth analytic function of a normalized quantity, so the
//! model can be differentiated by gradient-based optimal-control solvers
//! without the kinks of piecewise curves.
//!
//! # Curves
//!
//! | Curve                      | Input                     | Extras                        |
//! |----------------------------|---------------------------|-------------------------------|
//! | [`ActiveForceLengthCurve`] | normalized fiber length   | derivative                    |
//! | [`PassiveForceLengthCurve`]| normalized fiber length   | derivative, integral          |
//! | [`ForceVelocityCurve`]     | normalized fiber velocity | derivative, inverse           |
//! | [`TendonForceLengthCurve`] | normalized tendon length  | derivative, integral, inverse |
//!
//! The coefficients are those of De Groote et al. (2016) with corrections so
//! that the curves pass through their defining points:
//!
//! - Active force-length passes through (1, 1).
//! - Force-velocity passes through (-1, 0) and (0, 1).
//! - Passive force-length passes through (0.2, 0) and is never negative above it.
//!
//! Inputs outside the nominal domains are extrapolated by the same closed form;
//! nothing is clamped.
//!
//! # References
//!
//! - De Groote, F., Kinney, A. L., Rao, A. V., & Fregly, B. J. (2016).
//!   Evaluation of direct collocation optimal control problem formulations for
//!   solving the muscle redundancy problem. Annals of Biomedical Engineering.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Lower end of the supported normalized fiber length range.
pub const MIN_NORM_FIBER_LENGTH: f64 = 0.2;

/// Upper end of the supported normalized fiber length range.
pub const MAX_NORM_FIBER_LENGTH: f64 = 1.8;

// Active force-length lobes: (b1, b2, b3, b4) for each Gaussian-like term.
// b1 of the first lobe is adjusted so the sum is exactly 1 at x = 1.
const ACTIVE_LOBES: [[f64; 4]; 3] = [
    [
        0.815_067_113_424_354_2,
        1.055_033_428_970_575,
        0.162_384_573_599_574,
        0.063_303_448_465_465,
    ],
    [
        0.433_004_984_392_647,
        0.716_775_413_397_760,
        -0.029_947_116_970_696,
        0.200_356_847_296_188,
    ],
    // b3 = 0.5 * sqrt(0.5)
    [0.1, 1.0, 0.353_553_390_593_274, 0.0],
];

// Passive force-length: exponential shape factor and strain at max isometric force.
const K_PE: f64 = 4.0;
const E0: f64 = 0.6;

// Tendon force-length. c1 == c3 and c2 == 1 put the curve through (1, 0);
// it approaches -c3 as the length goes to -inf.
const C1: f64 = 0.200;
const C2: f64 = 1.0;
const C3: f64 = 0.200;

// Force-velocity. d1 and d4 are solved so the curve hits (-1, 0) and (0, 1).
const D1: f64 = -0.321_134_612_798_980_8;
const D2: f64 = -8.149;
const D3: f64 = -0.374;
const D4: f64 = 0.882_532_773_324_991_2;

/// `b1 * exp(-0.5 * (x - b2)^2 / (b3 + b4 * x)^2)`.
///
/// Not a true Gaussian: the width depends on `x`.
fn gaussian_like(x: f64, [b1, b2, b3, b4]: [f64; 4]) -> f64 {
    let width = b3 + b4 * x;
    b1 * (-0.5 * (x - b2).powi(2) / (width * width)).exp()
}

fn gaussian_like_derivative(x: f64, [b1, b2, b3, b4]: [f64; 4]) -> f64 {
    let width = b3 + b4 * x;
    b1 * (-(b2 - x).powi(2) / (2.0 * width * width)).exp() * (b2 - x) * (b3 + b2 * b4)
        / width.powi(3)
}

/// Active force-length curve: sum of three Gaussian-like lobes.
///
/// The width of the curve can be widened with `width_scale`, which rescales
/// the curve horizontally about its peak so the peak stays at (1, 1).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ActiveForceLengthCurve {
    /// Horizontal scale factor (>= 1). Larger values make the curve wider.
    pub width_scale: f64,
}

impl Default for ActiveForceLengthCurve {
    fn default() -> Self {
        Self { width_scale: 1.0 }
    }
}

impl ActiveForceLengthCurve {
    /// Create an active force-length curve with the given width scale.
    #[must_use]
    pub fn new(width_scale: f64) -> Self {
        Self { width_scale }
    }

    /// Shift the peak to the origin, scale horizontally, shift back.
    fn scaled(&self, normalized_length: f64) -> f64 {
        (normalized_length - 1.0) / self.width_scale + 1.0
    }

    /// Evaluate the active force-length multiplier.
    ///
    /// # Arguments
    ///
    /// * `normalized_length` - Fiber length divided by optimal fiber length
    #[must_use]
    pub fn evaluate(&self, normalized_length: f64) -> f64 {
        let x = self.scaled(normalized_length);
        ACTIVE_LOBES.iter().map(|&b| gaussian_like(x, b)).sum()
    }

    /// Derivative of the multiplier with respect to normalized fiber length.
    #[must_use]
    pub fn derivative(&self, normalized_length: f64) -> f64 {
        let x = self.scaled(normalized_length);
        let d_dx: f64 = ACTIVE_LOBES
            .iter()
            .map(|&b| gaussian_like_derivative(x, b))
            .sum();
        d_dx / self.width_scale
    }
}

/// Passive force-length curve: exponential rise of the parallel elastic element.
///
/// `(exp(kPE (l - 1) / e0) - exp(kPE (0.2 - 1) / e0)) / (exp(kPE) - 1)`
///
/// The offset makes the curve pass through (0.2, 0). The curve is nonzero at
/// optimal fiber length, so optimal length is not the resting length.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PassiveForceLengthCurve {
    /// When false, the curve, its derivative and its integral are all 0.
    pub enabled: bool,
}

impl Default for PassiveForceLengthCurve {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl PassiveForceLengthCurve {
    /// Create a passive force-length curve.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn offset() -> f64 {
        (K_PE * (MIN_NORM_FIBER_LENGTH - 1.0) / E0).exp()
    }

    fn denominator() -> f64 {
        K_PE.exp() - 1.0
    }

    /// Evaluate the passive force multiplier.
    #[must_use]
    pub fn evaluate(&self, normalized_length: f64) -> f64 {
        if !self.enabled {
            return 0.0;
        }
        ((K_PE * (normalized_length - 1.0) / E0).exp() - Self::offset()) / Self::denominator()
    }

    /// Derivative of the multiplier with respect to normalized fiber length.
    #[must_use]
    pub fn derivative(&self, normalized_length: f64) -> f64 {
        if !self.enabled {
            return 0.0;
        }
        K_PE / (E0 * Self::denominator()) * (K_PE * (normalized_length - 1.0) / E0).exp()
    }

    /// Integral of the multiplier from normalized length 0.2 to `normalized_length`.
    ///
    /// Zero at the lower end of the supported range, where the curve itself is 0.
    #[must_use]
    pub fn integral(&self, normalized_length: f64) -> f64 {
        if !self.enabled {
            return 0.0;
        }
        let offset = Self::offset();
        let exp_part = E0 / K_PE * ((K_PE * (normalized_length - 1.0) / E0).exp() - offset);
        (exp_part - offset * (normalized_length - MIN_NORM_FIBER_LENGTH)) / Self::denominator()
    }
}

/// Force-velocity curve: scaled inverse hyperbolic sine.
///
/// `d1 * ln(d2 v + d3 + sqrt((d2 v + d3)^2 + 1)) + d4`
///
/// Nominal domain is [-1, 1] (max shortening to max lengthening), range is
/// [0, ~1.794]. The shape is fixed; the curve has no parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ForceVelocityCurve;

impl ForceVelocityCurve {
    /// Evaluate the force-velocity multiplier.
    ///
    /// # Arguments
    ///
    /// * `normalized_velocity` - Fiber velocity / (max contraction velocity * optimal length).
    ///   Negative is shortening.
    #[must_use]
    pub fn evaluate(&self, normalized_velocity: f64) -> f64 {
        let t = D2 * normalized_velocity + D3;
        D1 * (t + (t * t + 1.0).sqrt()).ln() + D4
    }

    /// Derivative of the multiplier with respect to normalized fiber velocity.
    #[must_use]
    pub fn derivative(&self, normalized_velocity: f64) -> f64 {
        let t = D2 * normalized_velocity + D3;
        D1 * D2 / (t * t + 1.0).sqrt()
    }

    /// Normalized fiber velocity that produces the given multiplier.
    ///
    /// `d3` is subtracted before dividing by `d2`; the published supplement
    /// omits that term.
    #[must_use]
    pub fn inverse(&self, multiplier: f64) -> f64 {
        (((multiplier - D4) / D1).sinh() - D3) / D2
    }
}

/// Tendon force-length curve: shifted exponential.
///
/// `c1 * exp(kT (l - c2)) - c3`
///
/// `kT` is derived from the tendon strain at one normalized force so the curve
/// reaches 1 at normalized length `1 + strain`.
///
/// Only the strain is serialized; `kT` is rebuilt on load.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "TendonStrain"))]
pub struct TendonForceLengthCurve {
    strain_at_one_norm_force: f64,
    #[cfg_attr(feature = "serde", serde(skip))]
    stiffness: f64,
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct TendonStrain {
    strain_at_one_norm_force: f64,
}

#[cfg(feature = "serde")]
impl From<TendonStrain> for TendonForceLengthCurve {
    fn from(repr: TendonStrain) -> Self {
        Self::new(repr.strain_at_one_norm_force)
    }
}

impl Default for TendonForceLengthCurve {
    fn default() -> Self {
        Self::new(0.049)
    }
}

impl TendonForceLengthCurve {
    /// Create a tendon curve from the strain reached at one normalized force.
    #[must_use]
    pub fn new(strain_at_one_norm_force: f64) -> Self {
        Self {
            strain_at_one_norm_force,
            stiffness: ((1.0 + C3) / C1).ln() / (1.0 + strain_at_one_norm_force - C2),
        }
    }

    /// Tendon strain at one normalized force.
    #[must_use]
    pub fn strain_at_one_norm_force(&self) -> f64 {
        self.strain_at_one_norm_force
    }

    /// The stiffness constant `kT` derived from the strain.
    #[must_use]
    pub fn stiffness(&self) -> f64 {
        self.stiffness
    }

    /// Evaluate the normalized tendon force.
    #[must_use]
    pub fn evaluate(&self, normalized_length: f64) -> f64 {
        C1 * (self.stiffness * (normalized_length - C2)).exp() - C3
    }

    /// Derivative with respect to normalized tendon length.
    #[must_use]
    pub fn derivative(&self, normalized_length: f64) -> f64 {
        C1 * self.stiffness * (self.stiffness * (normalized_length - C2)).exp()
    }

    /// Integral from normalized length 1 (slack) to `normalized_length`.
    #[must_use]
    pub fn integral(&self, normalized_length: f64) -> f64 {
        let k = self.stiffness;
        C1 / k * ((k * (normalized_length - C2)).exp() - (k * (1.0 - C2)).exp())
            - C3 * (normalized_length - 1.0)
    }

    /// Normalized tendon length that produces the given normalized force.
    ///
    /// Defined for forces above `-c3`; returns NaN or -inf below that.
    #[must_use]
    pub fn inverse(&self, normalized_force: f64) -> f64 {
        ((normalized_force + C3) / C1).ln() / self.stiffness + C2
    }

    /// Map a normalized tendon force rate to a normalized tendon velocity.
    ///
    /// This is the derivative of [`inverse`](Self::inverse) applied through
    /// the chain rule at the given normalized tendon length.
    #[must_use]
    pub fn inverse_derivative(&self, normalized_force_rate: f64, normalized_length: f64) -> f64 {
        normalized_force_rate / self.derivative(normalized_length)
    }
}

/// The four curves of one muscle, built from its parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MuscleForceCurves {
    /// Active force-length relationship.
    pub active_fl: ActiveForceLengthCurve,

    /// Passive force-length relationship.
    pub passive_fl: PassiveForceLengthCurve,

    /// Force-velocity relationship.
    pub fv: ForceVelocityCurve,

    /// Tendon force-length relationship.
    pub tendon: TendonForceLengthCurve,
}

impl MuscleForceCurves {
    /// Create the curve set.
    #[must_use]
    pub fn new(
        active_force_width_scale: f64,
        passive_enabled: bool,
        tendon_strain_at_one_norm_force: f64,
    ) -> Self {
        Self {
            active_fl: ActiveForceLengthCurve::new(active_force_width_scale),
            passive_fl: PassiveForceLengthCurve::new(passive_enabled),
            fv: ForceVelocityCurve,
            tendon: TendonForceLengthCurve::new(tendon_strain_at_one_norm_force),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const H: f64 = 1e-6;

    fn central_difference(f: impl Fn(f64) -> f64, x: f64) -> f64 {
        (f(x + H) - f(x - H)) / (2.0 * H)
    }

    fn samples(start: f64, end: f64, n: usize) -> impl Iterator<Item = f64> {
        (0..n).map(move |i| start + (end - start) * i as f64 / (n - 1) as f64)
    }

    #[test]
    fn test_active_fl_peak_at_optimal() {
        let curve = ActiveForceLengthCurve::default();
        assert_relative_eq!(curve.evaluate(1.0), 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_active_fl_width_scale_keeps_peak() {
        let narrow = ActiveForceLengthCurve::default();
        let wide = ActiveForceLengthCurve::new(1.5);

        assert_relative_eq!(wide.evaluate(1.0), narrow.evaluate(1.0), epsilon = 1e-15);
        assert!(wide.evaluate(0.6) > narrow.evaluate(0.6));
        assert!(wide.evaluate(1.5) > narrow.evaluate(1.5));
    }

    #[test]
    fn test_active_fl_small_at_range_ends() {
        let curve = ActiveForceLengthCurve::default();
        assert!(curve.evaluate(MIN_NORM_FIBER_LENGTH) < 0.05);
        assert!(curve.evaluate(MAX_NORM_FIBER_LENGTH) < 0.05);
        assert!(curve.evaluate(0.7) < 1.0);
        assert!(curve.evaluate(1.3) < 1.0);
    }

    #[test]
    fn test_active_fl_derivative_matches_finite_difference() {
        for scale in [1.0, 1.7] {
            let curve = ActiveForceLengthCurve::new(scale);
            for x in samples(0.2, 1.8, 33) {
                let numeric = central_difference(|l| curve.evaluate(l), x);
                assert_relative_eq!(
                    curve.derivative(x),
                    numeric,
                    epsilon = 1e-7,
                    max_relative = 1e-6
                );
            }
        }
    }

    #[test]
    fn test_passive_fl_passes_through_lower_bound() {
        let curve = PassiveForceLengthCurve::default();
        assert_relative_eq!(curve.evaluate(MIN_NORM_FIBER_LENGTH), 0.0, epsilon = 1e-15);
        assert!(curve.evaluate(0.5) > 0.0);
        assert!(curve.evaluate(1.0) > 0.0);
        assert!(curve.evaluate(1.5) > curve.evaluate(1.2));
    }

    #[test]
    fn test_passive_fl_derivative_and_integral() {
        let curve = PassiveForceLengthCurve::default();
        for x in samples(0.2, 1.8, 33) {
            let numeric = central_difference(|l| curve.evaluate(l), x);
            assert_relative_eq!(curve.derivative(x), numeric, epsilon = 1e-7, max_relative = 1e-6);

            let numeric_integrand = central_difference(|l| curve.integral(l), x);
            assert_relative_eq!(
                curve.evaluate(x),
                numeric_integrand,
                epsilon = 1e-7,
                max_relative = 1e-6
            );
        }
        assert_relative_eq!(curve.integral(MIN_NORM_FIBER_LENGTH), 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_passive_fl_disabled_is_zero() {
        let curve = PassiveForceLengthCurve::new(false);
        for x in samples(-1.0, 3.0, 17) {
            assert_eq!(curve.evaluate(x), 0.0);
            assert_eq!(curve.derivative(x), 0.0);
            assert_eq!(curve.integral(x), 0.0);
        }
    }

    #[test]
    fn test_fv_key_points() {
        let curve = ForceVelocityCurve;
        assert_relative_eq!(curve.evaluate(-1.0), 0.0, epsilon = 1e-14);
        assert_relative_eq!(curve.evaluate(0.0), 1.0, epsilon = 1e-14);
        assert_relative_eq!(curve.evaluate(1.0), 1.794, epsilon = 1e-3);
    }

    #[test]
    fn test_fv_extrapolates_outside_domain() {
        let curve = ForceVelocityCurve;
        assert!(curve.evaluate(-1.1) < 0.0);
        assert!(curve.evaluate(1.1) > curve.evaluate(1.0));
    }

    #[test]
    fn test_fv_inverse_round_trip() {
        let curve = ForceVelocityCurve;
        for v in samples(-1.0, 1.0, 41) {
            assert_relative_eq!(curve.inverse(curve.evaluate(v)), v, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_fv_derivative_matches_finite_difference() {
        let curve = ForceVelocityCurve;
        for v in samples(-1.0, 1.0, 41) {
            let numeric = central_difference(|x| curve.evaluate(x), v);
            assert_relative_eq!(curve.derivative(v), numeric, epsilon = 1e-7, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_tendon_stiffness_from_strain() {
        let curve = TendonForceLengthCurve::new(0.049);
        assert_relative_eq!(curve.stiffness(), (6.0_f64).ln() / 0.049, epsilon = 1e-12);
        assert_relative_eq!(curve.evaluate(1.049), 1.0, epsilon = 1e-12);
        assert_relative_eq!(curve.evaluate(1.0), 0.0, epsilon = 1e-15);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_tendon_stiffness_rebuilt_on_deserialize() {
        let json = serde_json::to_string(&TendonForceLengthCurve::new(0.06)).unwrap();
        assert!(!json.contains("stiffness"));

        // A stale stiffness in the payload is ignored.
        let curve: TendonForceLengthCurve =
            serde_json::from_str(r#"{"strain_at_one_norm_force":0.049,"stiffness":5.0}"#)
                .unwrap();
        assert_relative_eq!(curve.stiffness(), (6.0_f64).ln() / 0.049, epsilon = 1e-12);
        assert_relative_eq!(curve.evaluate(1.049), 1.0, epsilon = 1e-12);

        let curves = MuscleForceCurves::new(1.2, true, 0.06);
        let json = serde_json::to_string(&curves).unwrap();
        let loaded: MuscleForceCurves = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, curves);
    }

    #[test]
    fn test_tendon_inverse_round_trip() {
        let curve = TendonForceLengthCurve::default();
        for x in samples(0.98, 1.08, 21) {
            assert_relative_eq!(curve.inverse(curve.evaluate(x)), x, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_tendon_derivative_and_integral() {
        let curve = TendonForceLengthCurve::new(0.06);
        for x in samples(0.95, 1.08, 27) {
            let numeric = central_difference(|l| curve.evaluate(l), x);
            assert_relative_eq!(curve.derivative(x), numeric, epsilon = 1e-7, max_relative = 1e-6);

            let numeric_integrand = central_difference(|l| curve.integral(l), x);
            assert_relative_eq!(
                curve.evaluate(x),
                numeric_integrand,
                epsilon = 1e-7,
                max_relative = 1e-6
            );
        }
        assert_relative_eq!(curve.integral(1.0), 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_tendon_inverse_derivative_is_reciprocal_slope() {
        let curve = TendonForceLengthCurve::default();
        let force = 0.5;
        let length = curve.inverse(force);

        let numeric = central_difference(|f| curve.inverse(f), force);
        assert_relative_eq!(
            curve.inverse_derivative(1.0, length),
            numeric,
            max_relative = 1e-6
        );
        assert_relative_eq!(
            curve.inverse_derivative(2.5, length),
            2.5 * numeric,
            max_relative = 1e-6
        );
    }
}
